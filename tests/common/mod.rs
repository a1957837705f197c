#![allow(dead_code)]

//! Synthetic archive directories for integration tests.

use std::fs;
use std::path::Path;

use bundledav::bundle::structures::{
    DatabaseEntryRecord, DatabaseFile, LanguageRecord, PackageEntryRecord, PackageHeader,
};
use bundledav::bundle::{HashList, Idstring};
use bundledav::transformers::StringTable;
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
    /// Every name used by the archive except the deliberately unknown ones
    pub hashlist: HashList,
}

impl Fixture {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[derive(Default)]
pub struct ArchiveBuilder {
    languages: Vec<(String, u32)>,
    entries: Vec<DatabaseEntryRecord>,
    packages: Vec<(String, Vec<(u32, Vec<u8>)>)>,
    known: Vec<String>,
    next_id: u32,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    pub fn language(mut self, name: &str, representation: u32) -> Self {
        self.languages.push((name.to_string(), representation));
        self.known.push(name.to_string());
        self
    }

    /// Add a database entry named in the hash list; returns its file id.
    pub fn file(&mut self, path: &str, language: Option<&str>, extension: Option<&str>) -> u32 {
        self.known.push(path.to_string());
        self.known.extend(extension.map(str::to_string));
        self.entry(path, language, extension)
    }

    /// Add a database entry whose path is left out of the hash list.
    pub fn unnamed_file(&mut self, path: &str, extension: Option<&str>) -> u32 {
        self.known.extend(extension.map(str::to_string));
        self.entry(path, None, extension)
    }

    fn entry(&mut self, path: &str, language: Option<&str>, extension: Option<&str>) -> u32 {
        let file_id = self.next_id;
        self.next_id += 1;
        let language = language.map_or(0, |name| {
            self.languages
                .iter()
                .find(|(known, _)| known == name)
                .map(|(_, representation)| *representation)
                .expect("language registered before use")
        });
        self.entries.push(DatabaseEntryRecord {
            extension: extension.map(Idstring::hash),
            path: Idstring::hash(path),
            language,
            file_id,
        });
        file_id
    }

    /// Add a package holding `contents`, laid out back to back.
    pub fn package(&mut self, name: &str, contents: Vec<(u32, Vec<u8>)>) {
        self.known.push(name.to_string());
        self.packages.push((name.to_string(), contents));
    }

    pub fn write(self) -> Fixture {
        let dir = tempfile::tempdir().unwrap();

        let database = DatabaseFile {
            languages: self
                .languages
                .iter()
                .map(|(name, representation)| LanguageRecord {
                    name: Idstring::hash(name),
                    representation: *representation,
                })
                .collect(),
            entries: self.entries,
        };
        fs::write(dir.path().join(DatabaseFile::FILE_NAME), database.to_bytes()).unwrap();

        for (name, contents) in &self.packages {
            let mut data = Vec::new();
            let mut header = PackageHeader { entries: Vec::new() };
            for (file_id, bytes) in contents {
                header.entries.push(PackageEntryRecord {
                    file_id: *file_id,
                    address: data.len() as u32,
                    length: bytes.len() as u32,
                });
                data.extend_from_slice(bytes);
            }
            fs::write(dir.path().join(format!("{name}.bundle")), data).unwrap();
            fs::write(dir.path().join(format!("{name}_h.bundle")), header.to_bytes()).unwrap();
        }

        let hashlist = HashList::from_lines(self.known.iter().map(String::as_str));
        Fixture { dir, hashlist }
    }
}

pub const AK_TEXTURE: &[u8] = b"AKTEX";
pub const AK_MODEL_SMALL: &[u8] = b"MOD0";
pub const AK_MODEL_LARGE: &[u8] = b"MODEL_V2";
pub const SETTINGS: &[u8] = b"<settings/>";

/// Paths of the standard archive
pub mod paths {
    pub const AK_DIR: &str = "units/payday2/weapons/ak";
    pub const AK_TEXTURE: &str = "units/payday2/weapons/ak/ak.texture";
    pub const AK_MODEL: &str = "units/payday2/weapons/ak/ak.model";
    pub const MENU_ENGLISH: &str = "strings/menu.english.strings";
    pub const MENU_GERMAN: &str = "strings/menu.german.strings";
    pub const SETTINGS: &str = "core/settings.xml";
    pub const ORPHAN: &str = "orphan/never.bin";
    /// Name missing from the hash list
    pub const SECRET: &str = "secret/thing";
}

pub fn menu_table(title: &str) -> StringTable {
    StringTable {
        entries: vec![
            (Idstring::hash("menu_title"), title.to_string()),
            (Idstring::hash("menu_quit"), "Quit".to_string()),
        ],
    }
}

/// Two good packages, one broken one, and a file no package stores:
///
/// ```text
/// all_0: ak.texture, ak.model (4 bytes), menu.english.strings, secret/thing.bin
/// all_1: ak.model (8 bytes), menu.german.strings, core/settings.xml
/// all_2: header that does not parse
/// ```
pub fn standard_archive() -> Fixture {
    let mut builder = ArchiveBuilder::new()
        .language("english", 1)
        .language("german", 2);

    let texture = builder.file("units/payday2/weapons/ak/ak", None, Some("texture"));
    let model = builder.file("units/payday2/weapons/ak/ak", None, Some("model"));
    let english = builder.file("strings/menu", Some("english"), Some("strings"));
    let german = builder.file("strings/menu", Some("german"), Some("strings"));
    let settings = builder.file("core/settings", None, Some("xml"));
    builder.file("orphan/never", None, Some("bin"));
    let secret = builder.unnamed_file(paths::SECRET, Some("bin"));

    builder.package(
        "all_0",
        vec![
            (texture, AK_TEXTURE.to_vec()),
            (model, AK_MODEL_SMALL.to_vec()),
            (english, menu_table("PAYDAY 2").to_bytes()),
            (secret, b"??".to_vec()),
        ],
    );
    builder.package(
        "all_1",
        vec![
            (model, AK_MODEL_LARGE.to_vec()),
            (german, menu_table("Zahltag 2").to_bytes()),
            (settings, SETTINGS.to_vec()),
        ],
    );

    let fixture = builder.write();
    fs::write(fixture.path().join("all_2.bundle"), b"data").unwrap();
    fs::write(fixture.path().join("all_2_h.bundle"), b"short").unwrap();

    let mut hashlist = fixture.hashlist;
    hashlist.insert("menu_title");
    Fixture {
        dir: fixture.dir,
        hashlist,
    }
}
