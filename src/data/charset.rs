// Poketext: the single-byte character encoding used by in-game strings
//
// Loaded from HH=glyph lines. A glyph may be longer than one character
// ("PK", "Lv", the "|end|" terminator marker)

use std::{collections::HashMap, fmt, fs, path::Path};

use crate::{error::RomError, utils::{log_write, LogLevel}};

pub const TERMINATOR_GLYPH: &str = "|end|";

#[derive(Clone, PartialEq)]
pub struct CharacterTable {
    /// Indexed by byte value
    glyphs: Vec<Option<String>>,
    bytes: HashMap<String, u8>,
    terminator: Option<u8>,
    longest_glyph: usize,
}

impl fmt::Debug for CharacterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharacterTable [ glyphs={}, terminator={:?} ]", self.bytes.len(), self.terminator)
    }
}

impl CharacterTable {
    pub fn parse(source: &str) -> Result<Self, RomError> {
        let mut glyphs: Vec<Option<String>> = vec![None; 0x100];
        let mut bytes: HashMap<String, u8> = HashMap::new();
        let mut terminator: Option<u8> = None;
        for (line_index, line) in source.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.starts_with('#') {
                continue;
            }
            let Some((key, glyph)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let byte = u8::from_str_radix(key, 16).map_err(|error| RomError::CharsetParse {
                line: line_index + 1,
                reason: format!("key '{key}' is not a hex byte: {error}"),
            })?;
            if glyph.is_empty() {
                return Err(RomError::CharsetParse {
                    line: line_index + 1,
                    reason: format!("byte 0x{byte:02X} has an empty glyph"),
                });
            }
            if glyph.eq_ignore_ascii_case(TERMINATOR_GLYPH) {
                terminator = Some(byte);
            }
            if glyphs[byte as usize].is_some() {
                log_write(format!("Character table redefines byte 0x{byte:02X} on line {}", line_index + 1), LogLevel::Warn);
            }
            glyphs[byte as usize] = Some(glyph.to_owned());
            // First byte wins when two bytes share a glyph
            bytes.entry(glyph.to_owned()).or_insert(byte);
        }
        if terminator.is_none() {
            log_write("Character table has no terminator glyph, terminated reads will fail", LogLevel::Warn);
        }
        let longest_glyph = bytes.keys().map(|g| g.chars().count()).max().unwrap_or(1);
        Ok(Self { glyphs, bytes, terminator, longest_glyph })
    }

    pub fn load(path: &Path) -> Result<Self, RomError> {
        let source = fs::read_to_string(path).map_err(|source| RomError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&source)?;
        log_write(format!("Loaded character table '{}' with {} glyphs", path.display(), table.len()), LogLevel::Debug);
        Ok(table)
    }

    pub fn glyph(&self, byte: u8) -> Option<&str> {
        self.glyphs[byte as usize].as_deref()
    }

    pub fn byte(&self, glyph: &str) -> Option<u8> {
        self.bytes.get(glyph).copied()
    }

    pub fn terminator(&self) -> Option<u8> {
        self.terminator
    }

    pub fn is_terminator(&self, byte: u8) -> bool {
        self.terminator == Some(byte)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends the glyph for `byte`, or a `[XX]` escape when it has none
    pub fn decode_into(&self, byte: u8, out: &mut String) {
        match self.glyph(byte) {
            Some(glyph) => out.push_str(glyph),
            None => out.push_str(&format!("[{byte:02X}]")),
        }
    }

    /// Longest glyph match first, so "PK" beats "P"
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, RomError> {
        let chars: Vec<char> = text.chars().collect();
        let mut encoded: Vec<u8> = Vec::with_capacity(chars.len());
        let mut index = 0;
        'outer: while index < chars.len() {
            if let Some(byte) = parse_escape(&chars[index..]) {
                encoded.push(byte);
                index += 4;
                continue;
            }
            let max_len = self.longest_glyph.min(chars.len() - index);
            for len in (1..=max_len).rev() {
                let candidate: String = chars[index..index + len].iter().collect();
                if let Some(byte) = self.byte(&candidate) {
                    encoded.push(byte);
                    index += len;
                    continue 'outer;
                }
            }
            return Err(RomError::UnmappableCharacter(chars[index].to_string()));
        }
        Ok(encoded)
    }
}

/// `[XX]` with two hex digits
fn parse_escape(chars: &[char]) -> Option<u8> {
    if chars.len() < 4 || chars[0] != '[' || chars[3] != ']' {
        return None;
    }
    let hex: String = chars[1..3].iter().collect();
    u8::from_str_radix(&hex, 16).ok()
}
