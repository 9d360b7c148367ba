use std::path::PathBuf;

/// Everything that can go wrong while reading, decoding or writing ROM data.
/// None of these are retried; they abort the call in progress.
#[derive(Debug, thiserror::Error)]
pub enum RomError {
    #[error("Access of {width} byte(s) at 0x{address:X} is outside the buffer (length 0x{len:X})")]
    OutOfBounds { address: usize, width: usize, len: usize },
    #[error("Invalid LZ77 opcode at 0x{address:X}: expected 0x10, found 0x{found:02X}")]
    InvalidOpcode { address: usize, found: u8 },
    #[error("LZ77 back-reference with offset 0x{offset:X} at output position 0x{position:X} reaches before the start of output")]
    InvalidBackReference { offset: usize, position: usize },
    #[error("Character '{0}' has no byte in the character table")]
    UnmappableCharacter(String),
    #[error("Image dimensions {width}x{height} are not divisible by 8")]
    InvalidDimensions { width: usize, height: usize },
    #[error("Reached end of buffer while looking for a text terminator starting at 0x{address:X}")]
    EndOfBuffer { address: usize },
    #[error("Character table line {line}: {reason}")]
    CharsetParse { line: usize, reason: String },
    #[error("IO error on '{}': {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Image export failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}
