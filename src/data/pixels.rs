use std::fmt;

use crate::{engine::{compression, rombuffer::RomBuffer}, error::RomError, utils::{log_write, LogLevel}};

use super::types::PixelDepth;

/// Packed palette indexes, lowest bits first within each byte
#[derive(Debug, Clone, PartialEq)]
pub struct PixelPlane {
    bytes: Vec<u8>,
    depth: PixelDepth,
}

impl fmt::Display for PixelPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PixelPlane [ bytes=0x{:X}, depth={}, pixels={} ]", self.bytes.len(), self.depth, self.pixel_count())
    }
}

impl PixelPlane {
    pub fn new(bytes: Vec<u8>, depth: PixelDepth) -> Self {
        Self { bytes, depth }
    }

    /// `length` is in bytes and only used when the data is not compressed
    pub fn from_rom(rom: &mut RomBuffer, address: usize, depth: PixelDepth, length: usize) -> Result<Self, RomError> {
        let bytes: Vec<u8> = if compression::is_compressed(rom, address)? {
            compression::decompress(rom, address)?
        } else {
            rom.read_u8s(address, length)?
        };
        let plane = Self::new(bytes, depth);
        log_write(format!("Loaded {plane} from 0x{address:X}"), LogLevel::Debug);
        Ok(plane)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn depth(&self) -> PixelDepth {
        self.depth
    }

    pub fn pixel_count(&self) -> usize {
        self.bytes.len() * self.depth.pixels_per_byte()
    }

    pub fn pixel(&self, index: usize) -> Result<u8, RomError> {
        let per_byte = self.depth.pixels_per_byte();
        let raw = *self.bytes.get(index / per_byte).ok_or(RomError::OutOfBounds {
            address: index,
            width: 1,
            len: self.pixel_count(),
        })?;
        let shift = (index % per_byte) * self.depth.bits();
        Ok((raw >> shift) & self.depth.mask())
    }
}

#[cfg(test)]
mod tests_pixels {
    use super::*;
    use crate::load::DEFAULT_CHARACTER_TABLE;

    /// Plain nibble split, low nibble first
    fn nibble_pixel(bytes: &[u8], index: usize) -> u8 {
        let pixel = bytes[index / (8 / 4)];
        if (index & 1) == 0 {
            pixel & 0x0F
        } else {
            (pixel & 0xF0) >> 4
        }
    }

    #[test]
    fn test_4bpp_matches_nibble_split() {
        let bytes: Vec<u8> = (0..=255u8).collect();
        let plane = PixelPlane::new(bytes.clone(), PixelDepth::Bpp4);
        assert_eq!(plane.pixel_count(),512);
        for index in 0..plane.pixel_count() {
            assert_eq!(plane.pixel(index).unwrap(),nibble_pixel(&bytes,index));
        }
        assert!(plane.pixel(512).is_err());
    }

    #[test]
    fn test_other_depths() {
        let plane = PixelPlane::new(vec![0b1011_0001], PixelDepth::Bpp1);
        let bits: Vec<u8> = (0..8).map(|i| plane.pixel(i).unwrap()).collect();
        assert_eq!(bits,vec![1,0,0,0,1,1,0,1]);

        let plane = PixelPlane::new(vec![0b1110_0100], PixelDepth::Bpp2);
        let pairs: Vec<u8> = (0..4).map(|i| plane.pixel(i).unwrap()).collect();
        assert_eq!(pairs,vec![0,1,2,3]);

        let plane = PixelPlane::new(vec![0xAB,0xCD], PixelDepth::Bpp8);
        assert_eq!(plane.pixel_count(),2);
        assert_eq!(plane.pixel(1).unwrap(),0xCD);
        assert!(plane.pixel(2).is_err());
    }

    #[test]
    fn test_from_rom() {
        let mut rom = RomBuffer::new(vec![0x21,0x43,0x65], DEFAULT_CHARACTER_TABLE.clone());
        let plane = PixelPlane::from_rom(&mut rom,0,PixelDepth::Bpp4,2).unwrap();
        assert_eq!(plane.bytes(),&[0x21,0x43]);
        assert_eq!(plane.pixel(3).unwrap(),4);

        let mut rom = RomBuffer::new(vec![0x10,0x02,0x00,0x00,0x00,0x21,0x43], DEFAULT_CHARACTER_TABLE.clone());
        let plane = PixelPlane::from_rom(&mut rom,0,PixelDepth::Bpp4,0x100).unwrap();
        assert_eq!(plane.bytes(),&[0x21,0x43]);
    }
}
