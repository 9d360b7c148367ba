use profiling::puffin;

use super::{log_write, LogLevel};

pub fn enable_profiling() {
    puffin::set_scopes_on(true);
    let server_addr = format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT);
    match puffin_http::Server::new(&server_addr) {
        Ok(server) => {
            log_write(format!("Profiling server up, view it with `puffin_viewer --url {server_addr}`"), LogLevel::Log);
            // Server stops when dropped, and the CLI exits right after the command anyway
            std::mem::forget(server);
        },
        Err(err) => {
            log_write(format!("Failed to start profiling server: '{err}'"), LogLevel::Error);
        },
    }
}

/// Call once per unit of work so puffin has a frame to attach scopes to
pub fn finish_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
