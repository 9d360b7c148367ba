use std::{path::Path, sync::LazyLock, time::Instant};

use crate::{data::charset::CharacterTable, error::RomError, utils::{log_write, LogLevel}};

const CHARACTER_SET_INI: &str = include_str!("../assets/character-set.ini");

pub static DEFAULT_CHARACTER_TABLE: LazyLock<CharacterTable> = LazyLock::new(|| {
    CharacterTable::parse(CHARACTER_SET_INI).expect("Embedded character-set.ini should parse")
});

/// The table from `path` if given, otherwise the embedded English one
pub fn load_character_table(path: Option<&Path>) -> Result<CharacterTable, RomError> {
    let loading_time = Instant::now();
    let table = match path {
        Some(path) => CharacterTable::load(path)?,
        None => {
            log_write("Using embedded character table", LogLevel::Debug);
            DEFAULT_CHARACTER_TABLE.clone()
        }
    };
    log_write(format!("Took {:#?} for the character table load", loading_time.elapsed()), LogLevel::Debug);
    Ok(table)
}
