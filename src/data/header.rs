// Cartridge header fields at their fixed offsets. Each byte is one Latin-1
// character, not Poketext

use std::fmt;

use serde::Serialize;

use crate::{engine::rombuffer::RomBuffer, error::RomError};

use super::Persist;

const GAME_TITLE_ADDRESS: usize = 0xA0;
const GAME_TITLE_LENGTH: usize = 12;
const GAME_CODE_ADDRESS: usize = 0xAC;
const GAME_CODE_LENGTH: usize = 4;
const GAME_VERSION_ADDRESS: usize = 0xBC;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RomHeader {
    pub title: String,
    pub game_code: String,
    /// Revision byte, shown as "1.<version>"
    pub version: u8,
}

impl fmt::Display for RomHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] v{}", self.title, self.game_code, self.version_string())
    }
}

impl RomHeader {
    pub fn from_rom(rom: &mut RomBuffer) -> Result<Self, RomError> {
        let title = latin1_field(&rom.read_u8s(GAME_TITLE_ADDRESS, GAME_TITLE_LENGTH)?);
        let game_code = latin1_field(&rom.read_u8s(GAME_CODE_ADDRESS, GAME_CODE_LENGTH)?);
        let version = rom.read_u8_at(GAME_VERSION_ADDRESS)?;
        Ok(Self { title, game_code, version })
    }

    pub fn version_string(&self) -> String {
        format!("1.{}", self.version)
    }
}

impl Persist for RomHeader {
    fn persist(&self, rom: &mut RomBuffer) -> Result<(), RomError> {
        let title = field_bytes(&self.title, GAME_TITLE_LENGTH)?;
        let game_code = field_bytes(&self.game_code, GAME_CODE_LENGTH)?;
        rom.write_u8s(GAME_TITLE_ADDRESS, &title)?;
        rom.write_u8s(GAME_CODE_ADDRESS, &game_code)?;
        rom.write_u8_at(GAME_VERSION_ADDRESS, self.version)
    }
}

/// Unused trailing bytes are zero
fn latin1_field(bytes: &[u8]) -> String {
    let text: String = bytes.iter().map(|b| char::from(*b)).collect();
    text.trim_end_matches('\0').to_owned()
}

/// Inverse of `latin1_field`, zero padded or cut to `length`
fn field_bytes(text: &str, length: usize) -> Result<Vec<u8>, RomError> {
    let mut bytes: Vec<u8> = text.chars()
        .map(|c| u8::try_from(c).map_err(|_| RomError::UnmappableCharacter(c.to_string())))
        .collect::<Result<_, _>>()?;
    bytes.truncate(length);
    bytes.resize(length, 0x00);
    Ok(bytes)
}
