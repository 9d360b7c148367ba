// LZ77 (the BIOS "LZ10" variant) decompression straight out of the ROM
//
// Block layout: 0x10, 24-bit length (0 means a 32-bit length follows),
// then groups of one flag byte and eight literal/back-reference tokens

use crate::{engine::rombuffer::RomBuffer, error::RomError, utils::{log_write, LogLevel}};

pub const LZ77_OPCODE: u8 = 0x10;

pub fn is_compressed(rom: &mut RomBuffer, address: usize) -> Result<bool, RomError> {
    Ok(rom.read_u8_at(address)? == LZ77_OPCODE)
}

/// Validates the opcode and reads the declared length, leaving the cursor
/// on the first flag byte
pub fn decompressed_len(rom: &mut RomBuffer, address: usize) -> Result<usize, RomError> {
    let opcode = rom.read_u8_at(address)?;
    if opcode != LZ77_OPCODE {
        return Err(RomError::InvalidOpcode { address, found: opcode });
    }
    let mut length: usize = 0;
    for i in 0..3 {
        length |= (rom.read_u8()? as usize) << (i * 8);
    }
    if length == 0 {
        // Extended header, for blocks of 16 MiB or more
        length = rom.read_u32()? as usize;
    }
    Ok(length)
}

pub fn decompress(rom: &mut RomBuffer, address: usize) -> Result<Vec<u8>, RomError> {
    puffin::profile_function!();
    let length = decompressed_len(rom, address)?;
    log_write(format!("Decompressing LZ77 block at 0x{address:X}, 0x{length:X} bytes"), LogLevel::Debug);
    let mut data: Vec<u8> = vec![0; length];
    let mut position: usize = 0;
    while position < length {
        let flags = rom.read_u8()?;
        for bit in 0..8 {
            if position >= length && rom.position() >= rom.len() {
                // Block ends flush with the image, there is no padding to consume
                break;
            }
            if flags & (0x80 >> bit) != 0 {
                let value = rom.read_u8()? as usize;
                let copy_len = (value >> 4) + 3;
                let offset = ((value & 0x0F) << 8) | rom.read_u8()? as usize;
                // Source starts at position - offset - 1
                if offset >= position {
                    return Err(RomError::InvalidBackReference { offset, position });
                }
                let source = position - offset - 1;
                // Byte by byte, the ranges overlap when offset < copy_len
                for j in 0..copy_len {
                    if position + j < length {
                        data[position + j] = data[source + j];
                    }
                }
                position += copy_len;
            } else {
                let value = rom.read_u8()?;
                if position < length {
                    data[position] = value;
                    position += 1;
                } else if value == 0 {
                    break;
                }
            }
            if position > length {
                break;
            }
        }
    }
    if position > length {
        log_write(format!("LZ77 block at 0x{address:X} overran its length by 0x{:X} bytes", position - length), LogLevel::Debug);
    }
    Ok(data)
}

#[cfg(test)]
mod tests_compression {
    use super::*;
    use crate::load::DEFAULT_CHARACTER_TABLE;
    use lamezip77::nintendo_lz::Compress;

    fn rom_with(bytes: Vec<u8>) -> RomBuffer {
        RomBuffer::new(bytes, DEFAULT_CHARACTER_TABLE.clone())
    }

    /// Header plus compressed body, the same way the level saver builds it
    fn lz10_compress(data: &Vec<u8>) -> Vec<u8> {
        let mut compressor = Compress::new();
        let mut output: Vec<u8> = Vec::new();
        let og_data_len = data.len();
        output.push(0x10);
        output.push((og_data_len % 0x100) as u8);
        output.push(((og_data_len >> 8) % 0x100) as u8);
        output.push(((og_data_len >> 16) % 0x100) as u8);
        compressor.compress(true, data, true, |val| {
            output.push(val);
        });
        output
    }

    #[test]
    fn test_literals_only() {
        let mut rom = rom_with(vec![0x10,0x04,0x00,0x00,0x00,0x41,0x42,0x43,0x44]);
        assert_eq!(decompress(&mut rom,0).unwrap(),vec![0x41,0x42,0x43,0x44]);
        assert_eq!(rom.position(),9);
    }

    #[test]
    fn test_overlapping_back_reference() {
        // 'A' then copy 5 from distance 1: run of A
        let mut rom = rom_with(vec![0x10,0x06,0x00,0x00,0b0100_0000,0x41,0x20,0x00]);
        assert_eq!(decompress(&mut rom,0).unwrap(),vec![0x41;6]);
    }

    #[test]
    fn test_back_reference_pattern() {
        // "AB" then copy 4 from distance 2
        let mut rom = rom_with(vec![0x10,0x06,0x00,0x00,0b0010_0000,0x41,0x42,0x10,0x01]);
        assert_eq!(decompress(&mut rom,0).unwrap(),b"ABABAB".to_vec());
    }

    #[test]
    fn test_invalid_opcode() {
        let mut rom = rom_with(vec![0x11,0x04,0x00,0x00]);
        assert!(matches!(decompress(&mut rom,0),Err(RomError::InvalidOpcode { address: 0, found: 0x11 })));
        assert!(!is_compressed(&mut rom,0).unwrap());
    }

    #[test]
    fn test_invalid_back_reference() {
        // Back-reference as the very first token
        let mut rom = rom_with(vec![0x10,0x04,0x00,0x00,0x80,0x00,0x00]);
        assert!(matches!(decompress(&mut rom,0),Err(RomError::InvalidBackReference { offset: 0, position: 0 })));
        // One byte written, distance 3 requested
        let mut rom = rom_with(vec![0x10,0x04,0x00,0x00,0x40,0x41,0x00,0x02]);
        assert!(matches!(decompress(&mut rom,0),Err(RomError::InvalidBackReference { offset: 2, position: 1 })));
    }

    #[test]
    fn test_extended_length() {
        let mut block = vec![0x10,0x00,0x00,0x00,0x02,0x00,0x00,0x00,0x00,0x7A,0x7B];
        block.extend([0xEE;4]);
        let mut rom = rom_with(block);
        assert_eq!(decompressed_len(&mut rom,0).unwrap(),2);
        assert_eq!(decompress(&mut rom,0).unwrap(),vec![0x7A,0x7B]);
    }

    #[test]
    fn test_zero_padding_ends_flag_byte() {
        // Two literals fill the block, the zero pad stops the remaining bits
        let mut rom = rom_with(vec![0x10,0x02,0x00,0x00,0x00,0x01,0x02,0x00,0xAA,0xAA]);
        assert_eq!(decompress(&mut rom,0).unwrap(),vec![1,2]);
        assert_eq!(rom.position(),8);
    }

    #[test]
    fn test_copy_clamped_to_length() {
        // Copy of 3 into a block with only 2 bytes left
        let mut rom = rom_with(vec![0x10,0x03,0x00,0x00,0x40,0x41,0x00,0x00]);
        assert_eq!(decompress(&mut rom,0).unwrap(),vec![0x41;3]);
    }

    #[test]
    fn test_truncated_block() {
        let mut rom = rom_with(vec![0x10,0x08,0x00,0x00,0x00,0x41]);
        assert!(matches!(decompress(&mut rom,0),Err(RomError::OutOfBounds { .. })));
    }

    #[test]
    fn test_empty_block() {
        let mut rom = rom_with(vec![0x10,0x00,0x00,0x00,0x00,0x00,0x00,0x00]);
        assert!(decompress(&mut rom,0).unwrap().is_empty());
    }

    #[test]
    fn test_decompress_is_pure() {
        let mut rom = rom_with(vec![0xFF,0x10,0x06,0x00,0x00,0b0010_0000,0x41,0x42,0x10,0x01]);
        let first = decompress(&mut rom,1).unwrap();
        let second = decompress(&mut rom,1).unwrap();
        assert_eq!(first,second);
        assert_eq!(rom.bytes()[0],0xFF);
    }

    #[test]
    fn test_lamezip77_blocks() {
        let mut data: Vec<u8> = Vec::new();
        for i in 0..0x600u32 {
            data.push((i % 7) as u8);
            data.push((i / 13) as u8);
        }
        data.extend(vec![0x55;0x300]);
        let mut block = vec![0xAA;5];
        block.extend(lz10_compress(&data));
        let mut rom = rom_with(block);
        let out = decompress(&mut rom,5).unwrap();
        assert_eq!(out.len(),data.len());
        assert_eq!(out,data);
    }
}
