use colored::Colorize;
use egui::Color32;
use log::LevelFilter;

pub mod profile;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum LogLevel {
    Debug,
    Log,
    Warn,
    Error
}

pub fn log_write(msg: impl Into<String>, level: LogLevel) {
    let msg = msg.into();
    match level {
        LogLevel::Debug => {
            if log::max_level() < LevelFilter::Debug {
                return;
            }
            println!("[DEBUG] {msg}");
            log::debug!("{msg}");
        }
        LogLevel::Log => {
            println!("[{}] {msg}","INFO".green());
            log::info!("{msg}");
        }
        LogLevel::Warn => {
            println!("[{}] {msg}","WARN".yellow());
            log::warn!("{msg}");
        }
        LogLevel::Error => {
            println!("[{}] {msg}","ERROR".red());
            log::error!("{msg}");
        }
    }
}

/// Hex dump, 16 bytes per line, prefixed with the address of the first byte
pub fn print_vector_u8(byte_vector: &[u8], base_address: usize) {
    if byte_vector.is_empty() {
        log_write("print_vector_u8: vector is empty", LogLevel::Log);
        return;
    }
    for (line_index, line) in byte_vector.chunks(0x10).enumerate() {
        let hex_line: String = line.iter().map(|b| format!("{:02X} ",b)).collect();
        let starting_string = format!("0x{:07X}",base_address + line_index * 0x10);
        println!("{starting_string} | {}",hex_line.trim_end());
    }
}

/// Accepts `0x`-prefixed hex or plain decimal
pub fn parse_address(text: &str) -> Result<usize,String> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => text.parse::<usize>(),
    };
    parsed.map_err(|error| format!("'{text}' is not a valid address: {error}"))
}

/// GBA BGR555 word to an opaque color. Channels are shifted, not scaled,
/// so full intensity is 0xF8 rather than 0xFF
pub fn color_from_u16(val: u16) -> Color32 {
    let red = (val & 0x1F) << 3;
    let green = (val & 0x3E0) >> 2;
    let blue = (val & 0x7C00) >> 7;
    Color32::from_rgb(red as u8, green as u8, blue as u8)
}
