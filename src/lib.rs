//! Read/write access to GBA ROM images: little-endian and Poketext accessors,
//! LZ77 decompression, palettes and tiled indexed-color images.

pub mod error;
pub mod utils;
pub mod load;
pub mod engine;
pub mod data;

pub use data::{Persist, bitmap::{Bitmap, PixelSink, TiledImage}, charset::CharacterTable, header::RomHeader,
    palette::PaletteTable, pixels::PixelPlane, types::PixelDepth};
pub use engine::{compression::decompress, rombuffer::RomBuffer};
pub use error::RomError;
