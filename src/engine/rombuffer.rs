// The ROM image, fully loaded into memory
//
// Every access is bounds checked before the cursor moves. A failed access
// leaves the cursor where it was, a successful one leaves it just past the
// bytes it touched

use std::{fmt, fs, io::Cursor, path::Path};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{data::charset::CharacterTable, error::RomError, utils::{log_write, LogLevel}};

/// Stored pointers carry a bank selector in the top byte
pub const POINTER_MASK: u32 = 0x01FF_FFFF;

pub struct RomBuffer {
    data: Cursor<Vec<u8>>,
    characters: CharacterTable,
}

impl fmt::Display for RomBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RomBuffer [ len=0x{:X}, position=0x{:X} ]", self.len(), self.position())
    }
}

impl RomBuffer {
    pub fn new(bytes: Vec<u8>, characters: CharacterTable) -> Self {
        Self {
            data: Cursor::new(bytes),
            characters,
        }
    }

    pub fn from_file(path: &Path, characters: CharacterTable) -> Result<Self, RomError> {
        let bytes = fs::read(path).map_err(|source| RomError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log_write(format!("Loaded ROM '{}' (0x{:X} bytes)", path.display(), bytes.len()), LogLevel::Log);
        Ok(Self::new(bytes, characters))
    }

    pub fn save(&self, path: &Path) -> Result<(), RomError> {
        fs::write(path, self.bytes()).map_err(|source| RomError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log_write(format!("Saved ROM to '{}'", path.display()), LogLevel::Log);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self) -> &[u8] {
        self.data.get_ref()
    }

    pub fn characters(&self) -> &CharacterTable {
        &self.characters
    }

    pub fn position(&self) -> usize {
        self.data.position() as usize
    }

    /// Moving to `len()` is allowed, nothing can be read from there though
    pub fn seek(&mut self, address: usize) -> Result<(), RomError> {
        self.seek_for(address, 0)
    }

    fn check(&self, address: usize, width: usize) -> Result<(), RomError> {
        match address.checked_add(width) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(RomError::OutOfBounds { address, width, len: self.len() }),
        }
    }

    fn seek_for(&mut self, address: usize, width: usize) -> Result<(), RomError> {
        self.check(address, width)?;
        self.data.set_position(address as u64);
        Ok(())
    }

    fn claim(&self, width: usize) -> Result<(), RomError> {
        self.check(self.position(), width)
    }

    fn out_of_bounds(&self, width: usize) -> RomError {
        RomError::OutOfBounds { address: self.position(), width, len: self.len() }
    }

    // Reading //

    pub fn read_u8(&mut self) -> Result<u8, RomError> {
        self.claim(1)?;
        self.data.read_u8().map_err(|_| self.out_of_bounds(1))
    }

    pub fn read_u8_at(&mut self, address: usize) -> Result<u8, RomError> {
        self.seek_for(address, 1)?;
        self.read_u8()
    }

    pub fn read_u16(&mut self) -> Result<u16, RomError> {
        self.claim(2)?;
        self.data.read_u16::<LittleEndian>().map_err(|_| self.out_of_bounds(2))
    }

    pub fn read_u16_at(&mut self, address: usize) -> Result<u16, RomError> {
        self.seek_for(address, 2)?;
        self.read_u16()
    }

    pub fn read_u32(&mut self) -> Result<u32, RomError> {
        self.claim(4)?;
        self.data.read_u32::<LittleEndian>().map_err(|_| self.out_of_bounds(4))
    }

    pub fn read_u32_at(&mut self, address: usize) -> Result<u32, RomError> {
        self.seek_for(address, 4)?;
        self.read_u32()
    }

    pub fn read_pointer(&mut self) -> Result<u32, RomError> {
        Ok(self.read_u32()? & POINTER_MASK)
    }

    pub fn read_pointer_at(&mut self, address: usize) -> Result<u32, RomError> {
        Ok(self.read_u32_at(address)? & POINTER_MASK)
    }

    pub fn read_u8s(&mut self, address: usize, count: usize) -> Result<Vec<u8>, RomError> {
        self.seek_for(address, count)?;
        (0..count).map(|_| self.read_u8()).collect()
    }

    pub fn read_u16s(&mut self, address: usize, count: usize) -> Result<Vec<u16>, RomError> {
        self.seek_for(address, bulk_width(count, 2, address, self.len())?)?;
        (0..count).map(|_| self.read_u16()).collect()
    }

    pub fn read_u32s(&mut self, address: usize, count: usize) -> Result<Vec<u32>, RomError> {
        self.seek_for(address, bulk_width(count, 4, address, self.len())?)?;
        (0..count).map(|_| self.read_u32()).collect()
    }

    pub fn read_pointers(&mut self, address: usize, count: usize) -> Result<Vec<u32>, RomError> {
        self.seek_for(address, bulk_width(count, 4, address, self.len())?)?;
        (0..count).map(|_| self.read_pointer()).collect()
    }

    // Writing //

    pub fn write_u8(&mut self, value: u8) -> Result<(), RomError> {
        self.claim(1)?;
        self.data.write_u8(value).map_err(|_| self.out_of_bounds(1))
    }

    pub fn write_u8_at(&mut self, address: usize, value: u8) -> Result<(), RomError> {
        self.seek_for(address, 1)?;
        self.write_u8(value)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), RomError> {
        self.claim(2)?;
        self.data.write_u16::<LittleEndian>(value).map_err(|_| self.out_of_bounds(2))
    }

    pub fn write_u16_at(&mut self, address: usize, value: u16) -> Result<(), RomError> {
        self.seek_for(address, 2)?;
        self.write_u16(value)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), RomError> {
        self.claim(4)?;
        self.data.write_u32::<LittleEndian>(value).map_err(|_| self.out_of_bounds(4))
    }

    pub fn write_u32_at(&mut self, address: usize, value: u32) -> Result<(), RomError> {
        self.seek_for(address, 4)?;
        self.write_u32(value)
    }

    pub fn write_u8s(&mut self, address: usize, values: &[u8]) -> Result<(), RomError> {
        self.seek_for(address, values.len())?;
        values.iter().try_for_each(|v| self.write_u8(*v))
    }

    /// Full-width words, one after another
    pub fn write_u16s(&mut self, address: usize, values: &[u16]) -> Result<(), RomError> {
        self.seek_for(address, bulk_width(values.len(), 2, address, self.len())?)?;
        values.iter().try_for_each(|v| self.write_u16(*v))
    }

    pub fn write_u32s(&mut self, address: usize, values: &[u32]) -> Result<(), RomError> {
        self.seek_for(address, bulk_width(values.len(), 4, address, self.len())?)?;
        values.iter().try_for_each(|v| self.write_u32(*v))
    }

    // Text //

    pub fn read_text(&mut self, length: usize) -> Result<String, RomError> {
        self.claim(length)?;
        let mut text = String::with_capacity(length);
        for _ in 0..length {
            let byte = self.read_u8()?;
            self.characters.decode_into(byte, &mut text);
        }
        Ok(text)
    }

    pub fn read_text_at(&mut self, address: usize, length: usize) -> Result<String, RomError> {
        self.seek_for(address, length)?;
        self.read_text(length)
    }

    /// Reads up to and including the terminator byte. Trailing whitespace is trimmed
    pub fn read_text_until_terminator(&mut self) -> Result<String, RomError> {
        let start = self.position();
        let mut text = String::new();
        loop {
            if self.position() >= self.len() {
                self.data.set_position(start as u64);
                return Err(RomError::EndOfBuffer { address: start });
            }
            let byte = self.read_u8()?;
            if self.characters.is_terminator(byte) {
                break;
            }
            self.characters.decode_into(byte, &mut text);
        }
        text.truncate(text.trim_end().len());
        Ok(text)
    }

    pub fn read_text_until_terminator_at(&mut self, address: usize) -> Result<String, RomError> {
        self.seek(address)?;
        self.read_text_until_terminator()
    }

    /// `count` terminated strings stored back to back
    pub fn read_text_list(&mut self, address: usize, count: usize) -> Result<Vec<String>, RomError> {
        self.seek(address)?;
        (0..count).map(|_| self.read_text_until_terminator()).collect()
    }

    /// No terminator is appended; include `|end|` in `text` for one.
    /// Returns the number of bytes written
    pub fn write_text(&mut self, address: usize, text: &str) -> Result<usize, RomError> {
        let encoded = self.characters.encode(text)?;
        self.write_u8s(address, &encoded)?;
        Ok(encoded.len())
    }
}

/// Byte width of `count` elements of `stride`, failing on overflow
pub(crate) fn bulk_width(count: usize, stride: usize, address: usize, len: usize) -> Result<usize, RomError> {
    count.checked_mul(stride).ok_or(RomError::OutOfBounds { address, width: usize::MAX, len })
}

#[cfg(test)]
mod tests_rombuffer {
    use super::*;
    use crate::load::DEFAULT_CHARACTER_TABLE;

    fn rom_with(bytes: Vec<u8>) -> RomBuffer {
        RomBuffer::new(bytes, DEFAULT_CHARACTER_TABLE.clone())
    }

    #[test]
    fn test_little_endian_reads() {
        let mut rom = rom_with(vec![0x78,0x56,0x34,0x12,0xFF,0xEE]);
        assert_eq!(rom.read_u32_at(0).unwrap(),0x12345678);
        assert_eq!(rom.position(),4);
        assert_eq!(rom.read_u16().unwrap(),0xEEFF);
        assert_eq!(rom.position(),6);
        assert_eq!(rom.read_u8_at(1).unwrap(),0x56);
        assert_eq!(rom.position(),2);
        assert_eq!(rom.read_u16_at(0).unwrap(),0x5678);
    }

    #[test]
    fn test_pointer_mask() {
        let mut rom = rom_with(vec![0x34,0x12,0x7A,0x08]);
        assert_eq!(rom.read_pointer_at(0).unwrap(),0x007A1234);
        let mut rom = rom_with(vec![0xFF,0xFF,0xFF,0xFF]);
        assert_eq!(rom.read_pointer_at(0).unwrap(),POINTER_MASK);
    }

    #[test]
    fn test_bulk_reads() {
        let mut rom = rom_with(vec![1,0,2,0,3,0,0,0]);
        assert_eq!(rom.read_u16s(0,3).unwrap(),vec![1,2,3]);
        assert_eq!(rom.position(),6);
        assert_eq!(rom.read_u32s(0,2).unwrap(),vec![0x00020001,0x00000003]);
        assert_eq!(rom.read_u8s(2,3).unwrap(),vec![2,0,3]);
        assert_eq!(rom.position(),5);
        let mut rom = rom_with(vec![0,0,0,0x08,1,0,0,0x09]);
        assert_eq!(rom.read_pointers(0,2).unwrap(),vec![0,1 | 0x0100_0000]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut rom = rom_with(vec![0;4]);
        rom.seek(1).unwrap();
        assert!(matches!(rom.read_u32_at(1),Err(RomError::OutOfBounds { address: 1, width: 4, len: 4 })));
        // Failed access does not move the cursor
        assert_eq!(rom.position(),1);
        assert!(rom.read_u8_at(4).is_err());
        assert!(rom.read_u16s(2,2).is_err());
        assert!(rom.write_u16_at(3,0xFFFF).is_err());
        assert_eq!(rom.bytes(),&[0,0,0,0]);
        assert!(rom.read_u8_at(usize::MAX).is_err());
        rom.seek(4).unwrap();
        assert!(rom.read_u8().is_err());
        assert!(rom.seek(5).is_err());
    }

    #[test]
    fn test_writes() {
        let mut rom = rom_with(vec![0;8]);
        rom.write_u32_at(0,0xDEADBEEF).unwrap();
        assert_eq!(rom.position(),4);
        rom.write_u16(0x1234).unwrap();
        rom.write_u8(0x56).unwrap();
        assert_eq!(rom.bytes(),&[0xEF,0xBE,0xAD,0xDE,0x34,0x12,0x56,0x00]);
        rom.write_u8_at(7,0x99).unwrap();
        assert_eq!(rom.read_u8_at(7).unwrap(),0x99);
        assert_eq!(rom.len(),8);
    }

    #[test]
    fn test_bulk_writes_are_full_width() {
        let mut rom = rom_with(vec![0;12]);
        rom.write_u16s(0,&[0x1122,0x3344]).unwrap();
        assert_eq!(&rom.bytes()[0..4],&[0x22,0x11,0x44,0x33]);
        rom.write_u32s(4,&[0xAABBCCDD,0x01020304]).unwrap();
        assert_eq!(&rom.bytes()[4..12],&[0xDD,0xCC,0xBB,0xAA,0x04,0x03,0x02,0x01]);
        assert_eq!(rom.position(),12);
        // All or nothing
        assert!(rom.write_u8s(10,&[7,7,7]).is_err());
        assert_eq!(&rom.bytes()[10..12],&[0x02,0x01]);
    }

    #[test]
    fn test_read_text() {
        // "Hi!" then terminator
        let mut rom = rom_with(vec![0xC2,0xDD,0xAB,0xFF]);
        assert_eq!(rom.read_text_at(0,3).unwrap(),"Hi!");
        assert_eq!(rom.position(),3);
        assert_eq!(rom.read_text_at(0,4).unwrap(),"Hi!|end|");
        assert!(rom.read_text_at(2,3).is_err());
    }

    #[test]
    fn test_read_text_until_terminator() {
        // "AB  " terminated, then "C" terminated
        let mut rom = rom_with(vec![0xBB,0xBC,0x00,0x00,0xFF,0xBD,0xFF]);
        assert_eq!(rom.read_text_until_terminator_at(0).unwrap(),"AB");
        assert_eq!(rom.position(),5);
        assert_eq!(rom.read_text_until_terminator().unwrap(),"C");
        assert_eq!(rom.position(),7);
    }

    #[test]
    fn test_unterminated_text() {
        let mut rom = rom_with(vec![0xBB,0xBC,0xBD]);
        assert!(matches!(rom.read_text_until_terminator_at(1),Err(RomError::EndOfBuffer { address: 1 })));
        assert_eq!(rom.position(),1);
    }

    #[test]
    fn test_read_text_list() {
        let mut rom = rom_with(vec![0xBB,0xFF,0xBC,0xBC,0xFF,0xFF]);
        let list = rom.read_text_list(0,3).unwrap();
        assert_eq!(list,vec!["A".to_owned(),"BB".to_owned(),String::new()]);
        assert!(rom.read_text_list(0,4).is_err());
    }

    #[test]
    fn test_write_text() {
        let mut rom = rom_with(vec![0;8]);
        let written = rom.write_text(1,"Ok 9|end|").unwrap();
        assert_eq!(written,5);
        assert_eq!(rom.bytes(),&[0x00,0xC9,0xDF,0x00,0xAA,0xFF,0x00,0x00]);
        assert_eq!(rom.read_text_until_terminator_at(1).unwrap(),"Ok 9");
    }

    #[test]
    fn test_write_text_unmappable() {
        let mut rom = rom_with(vec![0;4]);
        assert!(matches!(rom.write_text(0,"A\u{263A}"),Err(RomError::UnmappableCharacter(_))));
        // Nothing written on failure
        assert_eq!(rom.bytes(),&[0,0,0,0]);
        assert!(rom.write_text(2,"ABC").is_err());
        assert_eq!(rom.bytes(),&[0,0,0,0]);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let path = dir.path().join("test.gba");
        std::fs::write(&path,[1u8,2,3,4]).unwrap();
        let mut rom = RomBuffer::from_file(&path, DEFAULT_CHARACTER_TABLE.clone()).expect("ROM should load");
        rom.write_u8_at(0,0x10).unwrap();
        rom.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(),vec![0x10,2,3,4]);
    }
}
