use crate::{engine::rombuffer::RomBuffer, error::RomError};

pub mod types;
pub mod charset;
pub mod palette;
pub mod pixels;
pub mod bitmap;
pub mod header;

/// Anything loaded from the ROM that can be written back to where it came from
pub trait Persist {
    /// Writes the current state into `rom`. Nothing is saved to disk here,
    /// that is `RomBuffer::save`
    fn persist(&self, rom: &mut RomBuffer) -> Result<(), RomError>;
}
