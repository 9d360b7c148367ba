// Palettes are runs of BGR555 words, sometimes stored LZ77 compressed

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use egui::Color32;

use crate::{engine::{compression, rombuffer::{bulk_width, RomBuffer}}, error::RomError, utils::{self, log_write, LogLevel}};

use super::Persist;

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteTable {
    address: usize,
    compressed: bool,
    words: Vec<u16>,
    colors: Vec<Color32>,
}

impl fmt::Display for PaletteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaletteTable [ address=0x{:X}, colors={}, compressed={} ]", self.address, self.colors.len(), self.compressed)
    }
}

impl PaletteTable {
    /// `count` is only used for uncompressed palettes, a compressed block
    /// declares its own length
    pub fn from_rom(rom: &mut RomBuffer, address: usize, count: usize) -> Result<Self, RomError> {
        let compressed = compression::is_compressed(rom, address)?;
        let raw: Vec<u8> = if compressed {
            compression::decompress(rom, address)?
        } else {
            rom.read_u8s(address, bulk_width(count, 2, address, rom.len())?)?
        };
        let table = Self::from_bytes(address, compressed, &raw);
        log_write(format!("Loaded {table}"), LogLevel::Debug);
        Ok(table)
    }

    fn from_bytes(address: usize, compressed: bool, raw: &[u8]) -> Self {
        if raw.len() % 2 != 0 {
            log_write(format!("Palette at 0x{address:X} has an odd byte count, dropping the last byte"), LogLevel::Warn);
        }
        let words: Vec<u16> = raw.chunks_exact(2).map(LittleEndian::read_u16).collect();
        let colors: Vec<Color32> = words.iter().map(|w| utils::color_from_u16(*w)).collect();
        Self { address, compressed, words, colors }
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    pub fn colors(&self) -> &[Color32] {
        &self.colors
    }

    pub fn color(&self, index: usize) -> Result<Color32, RomError> {
        self.colors.get(index).copied().ok_or(RomError::OutOfBounds {
            address: index,
            width: 1,
            len: self.colors.len(),
        })
    }

    pub fn set_word(&mut self, index: usize, word: u16) -> Result<(), RomError> {
        if index >= self.words.len() {
            return Err(RomError::OutOfBounds { address: index, width: 1, len: self.words.len() });
        }
        self.words[index] = word;
        self.colors[index] = utils::color_from_u16(word);
        Ok(())
    }
}

impl Persist for PaletteTable {
    fn persist(&self, rom: &mut RomBuffer) -> Result<(), RomError> {
        if self.compressed {
            // Words go back uncompressed and may run past the compressed block
            log_write(format!("Palette at 0x{:X} was compressed, writing 0x{:X} raw bytes over it",
                self.address, self.words.len() * 2), LogLevel::Warn);
        }
        rom.write_u16s(self.address, &self.words)
    }
}
