use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Seek, SeekFrom};

use anyhow::{Result, bail};

use super::idstring::Idstring;

/// Language table record - 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageRecord {
    pub name: Idstring,
    pub representation: u32,
}

impl LanguageRecord {
    pub const SIZE: usize = 16;
}

/// Header database entry - 24 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseEntryRecord {
    pub extension: Option<Idstring>,
    pub path: Idstring,
    /// Language representation, 0 when the entry has no language
    pub language: u32,
    pub file_id: u32,
}

impl DatabaseEntryRecord {
    pub const SIZE: usize = 24;
}

/// The header database (`bundle_db.blb`).
///
/// Layout: two table descriptors (`u32 count, u32 reserved, u64 offset`),
/// one for languages and one for entries, each pointing at a packed array.
#[derive(Debug, Clone, Default)]
pub struct DatabaseFile {
    pub languages: Vec<LanguageRecord>,
    pub entries: Vec<DatabaseEntryRecord>,
}

impl DatabaseFile {
    pub const FILE_NAME: &'static str = "bundle_db.blb";
    pub const PREAMBLE_SIZE: usize = 32;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::PREAMBLE_SIZE {
            bail!("file is {} bytes, shorter than its preamble", data.len());
        }

        let mut cursor = Cursor::new(data);
        let language_count = cursor.read_u32::<LittleEndian>()?;
        let _ = cursor.read_u32::<LittleEndian>()?;
        let language_offset = cursor.read_u64::<LittleEndian>()?;
        let entry_count = cursor.read_u32::<LittleEndian>()?;
        let _ = cursor.read_u32::<LittleEndian>()?;
        let entry_offset = cursor.read_u64::<LittleEndian>()?;

        check_table(data.len(), "language", language_offset, language_count, LanguageRecord::SIZE)?;
        check_table(data.len(), "entry", entry_offset, entry_count, DatabaseEntryRecord::SIZE)?;

        cursor.seek(SeekFrom::Start(language_offset))?;
        let mut languages = Vec::with_capacity(language_count as usize);
        for _ in 0..language_count {
            let name = Idstring(cursor.read_u64::<LittleEndian>()?);
            let representation = cursor.read_u32::<LittleEndian>()?;
            let _ = cursor.read_u32::<LittleEndian>()?;
            if representation == 0 {
                bail!("language {name} uses reserved representation 0");
            }
            languages.push(LanguageRecord { name, representation });
        }

        cursor.seek(SeekFrom::Start(entry_offset))?;
        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let extension = cursor.read_u64::<LittleEndian>()?;
            let path = Idstring(cursor.read_u64::<LittleEndian>()?);
            let language = cursor.read_u32::<LittleEndian>()?;
            let file_id = cursor.read_u32::<LittleEndian>()?;
            entries.push(DatabaseEntryRecord {
                extension: (extension != 0).then_some(Idstring(extension)),
                path,
                language,
                file_id,
            });
        }

        Ok(Self { languages, entries })
    }

    /// Encode with the language table directly after the preamble and the
    /// entry table after that.
    pub fn to_bytes(&self) -> Vec<u8> {
        let language_offset = Self::PREAMBLE_SIZE as u64;
        let entry_offset = language_offset + (self.languages.len() * LanguageRecord::SIZE) as u64;
        let mut out = Vec::with_capacity(
            entry_offset as usize + self.entries.len() * DatabaseEntryRecord::SIZE,
        );

        // Writes into a Vec cannot fail
        let _ = out.write_u32::<LittleEndian>(self.languages.len() as u32);
        let _ = out.write_u32::<LittleEndian>(0);
        let _ = out.write_u64::<LittleEndian>(language_offset);
        let _ = out.write_u32::<LittleEndian>(self.entries.len() as u32);
        let _ = out.write_u32::<LittleEndian>(0);
        let _ = out.write_u64::<LittleEndian>(entry_offset);
        for language in &self.languages {
            let _ = out.write_u64::<LittleEndian>(language.name.0);
            let _ = out.write_u32::<LittleEndian>(language.representation);
            let _ = out.write_u32::<LittleEndian>(0);
        }
        for entry in &self.entries {
            let _ = out.write_u64::<LittleEndian>(entry.extension.map_or(0, Idstring::raw));
            let _ = out.write_u64::<LittleEndian>(entry.path.0);
            let _ = out.write_u32::<LittleEndian>(entry.language);
            let _ = out.write_u32::<LittleEndian>(entry.file_id);
        }
        out
    }

    /// Map from language representation to language name.
    pub fn language_map(&self) -> HashMap<u32, Idstring> {
        self.languages
            .iter()
            .map(|l| (l.representation, l.name))
            .collect()
    }
}

/// Package header entry - 12 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageEntryRecord {
    pub file_id: u32,
    pub address: u32,
    pub length: u32,
}

impl PackageEntryRecord {
    pub const SIZE: usize = 12;

    pub fn end(&self) -> u64 {
        self.address as u64 + self.length as u64
    }
}

/// A package header file (`<name>_h.bundle`).
#[derive(Debug, Clone, Default)]
pub struct PackageHeader {
    pub entries: Vec<PackageEntryRecord>,
}

impl PackageHeader {
    pub const HEADER_SUFFIX: &'static str = "_h";
    pub const EXTENSION: &'static str = "bundle";
    pub const PREAMBLE_SIZE: usize = 16;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::PREAMBLE_SIZE {
            bail!("header is {} bytes, shorter than its preamble", data.len());
        }

        let mut cursor = Cursor::new(data);
        let _header_size = cursor.read_u32::<LittleEndian>()?;
        let count = cursor.read_u32::<LittleEndian>()?;
        let count_repeat = cursor.read_u32::<LittleEndian>()?;
        let offset = cursor.read_u32::<LittleEndian>()? as u64 + 4;

        if count != count_repeat {
            bail!("entry counts disagree ({count} vs {count_repeat})");
        }
        check_table(data.len(), "entry", offset, count, PackageEntryRecord::SIZE)?;

        cursor.seek(SeekFrom::Start(offset))?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(PackageEntryRecord {
                file_id: cursor.read_u32::<LittleEndian>()?,
                address: cursor.read_u32::<LittleEndian>()?,
                length: cursor.read_u32::<LittleEndian>()?,
            });
        }

        Ok(Self { entries })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(Self::PREAMBLE_SIZE + self.entries.len() * PackageEntryRecord::SIZE);
        let count = self.entries.len() as u32;
        let _ = out.write_u32::<LittleEndian>(Self::PREAMBLE_SIZE as u32);
        let _ = out.write_u32::<LittleEndian>(count);
        let _ = out.write_u32::<LittleEndian>(count);
        // Relative to the end of the first field
        let _ = out.write_u32::<LittleEndian>(Self::PREAMBLE_SIZE as u32 - 4);
        for entry in &self.entries {
            let _ = out.write_u32::<LittleEndian>(entry.file_id);
            let _ = out.write_u32::<LittleEndian>(entry.address);
            let _ = out.write_u32::<LittleEndian>(entry.length);
        }
        out
    }
}

/// Fail unless `count` records of `record` bytes at `offset` fit in the file.
fn check_table(file_len: usize, what: &str, offset: u64, count: u32, record: usize) -> Result<()> {
    let Some(end) = offset.checked_add(count as u64 * record as u64) else {
        bail!("{what} table offset overflows");
    };
    if end > file_len as u64 {
        bail!("{what} table ({count} records at {offset}) runs past end of file ({file_len} bytes)");
    }
    Ok(())
}
