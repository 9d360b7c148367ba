use std::fmt;

use strum::EnumIter;

/// Tiles are always 8x8 pixels
pub const TILE_SIZE: usize = 8;

/// Red, green, blue, alpha
pub type Rgba = [u8; 4];

/// Bits used to store one pixel's palette index
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumIter)]
pub enum PixelDepth {
    Bpp1 = 1,
    Bpp2 = 2,
    Bpp4 = 4,
    Bpp8 = 8
}
impl fmt::Display for PixelDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bpp", self.bits())
    }
}
impl TryFrom<u8> for PixelDepth {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(Self::Bpp1),
            2 => Ok(Self::Bpp2),
            4 => Ok(Self::Bpp4),
            8 => Ok(Self::Bpp8),
            _ => Err(format!("{bits} is not a supported pixel depth (1, 2, 4 or 8)")),
        }
    }
}
impl PixelDepth {
    pub fn bits(self) -> usize {
        self as usize
    }

    pub fn pixels_per_byte(self) -> usize {
        8 / self.bits()
    }

    pub fn mask(self) -> u8 {
        ((1u16 << self.bits()) - 1) as u8
    }
}
