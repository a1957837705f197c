//! Reading bundle files from disk.
//!
//! An archive directory holds one header database (`bundle_db.blb`) and any
//! number of package pairs. Each pair is a data file `<name>.bundle` and a
//! header file `<name>_h.bundle` listing which database entries live at which
//! byte ranges of the data file.
//!
//! The database is all-or-nothing: if it is missing or malformed, nothing can
//! be served. Packages are independent of each other, so a broken pair is
//! reported back to the caller to be skipped.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IndexError, Result};

use super::idstring::Idstring;
use super::structures::{DatabaseFile, PackageEntryRecord, PackageHeader};

/// Read and decode the header database of an archive directory.
pub fn load_database(dir: &Path) -> Result<DatabaseFile> {
    let path = dir.join(DatabaseFile::FILE_NAME);
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IndexError::DatabaseMissing(path));
        }
        Err(e) => return Err(e.into()),
    };
    DatabaseFile::from_bytes(&data).map_err(|e| IndexError::DatabaseCorrupt(format!("{e:#}")))
}

/// The two files that make up one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    pub name: Idstring,
    /// File stem of the data file
    pub stem: String,
    pub data_path: PathBuf,
    pub header_path: PathBuf,
}

impl PackageSource {
    pub fn new(dir: &Path, stem: &str) -> Self {
        let name = if stem.len() == 16 {
            u64::from_str_radix(stem, 16)
                .map(Idstring)
                .unwrap_or_else(|_| Idstring::hash(stem))
        } else {
            Idstring::hash(stem)
        };

        Self {
            name,
            stem: stem.to_string(),
            data_path: dir.join(format!("{stem}.{}", PackageHeader::EXTENSION)),
            header_path: dir.join(format!(
                "{stem}{}.{}",
                PackageHeader::HEADER_SUFFIX,
                PackageHeader::EXTENSION
            )),
        }
    }
}

/// List the packages of an archive directory, ordered by file name.
///
/// Header files are not packages in their own right and are left out.
pub fn discover_packages(dir: &Path) -> Result<Vec<PackageSource>> {
    let mut stems = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(PackageHeader::EXTENSION) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.ends_with(PackageHeader::HEADER_SUFFIX) {
            continue;
        }
        stems.push(stem.to_string());
    }
    stems.sort();

    Ok(stems.iter().map(|stem| PackageSource::new(dir, stem)).collect())
}

/// A package whose header has been read and checked against its data file.
#[derive(Debug, Clone)]
pub struct LoadedPackage {
    pub source: PackageSource,
    pub last_modified: DateTime<Utc>,
    pub entries: Vec<PackageEntryRecord>,
}

/// Read one package header.
///
/// Any problem with the pair comes back as [`IndexError::PackageCorrupt`].
pub fn load_package(source: &PackageSource) -> Result<LoadedPackage> {
    let corrupt = |reason: String| IndexError::package(&source.data_path, reason);

    let data_meta = fs::metadata(&source.data_path)
        .map_err(|e| corrupt(format!("cannot stat data file: {e}")))?;
    let header_meta = fs::metadata(&source.header_path)
        .map_err(|e| corrupt(format!("cannot stat header file: {e}")))?;
    let header_bytes = fs::read(&source.header_path)
        .map_err(|e| corrupt(format!("cannot read header file: {e}")))?;

    let header = PackageHeader::from_bytes(&header_bytes).map_err(|e| corrupt(format!("{e:#}")))?;

    let data_len = data_meta.len();
    if let Some(entry) = header.entries.iter().find(|e| e.end() > data_len) {
        return Err(corrupt(format!(
            "entry {} ends at {} but the data file is {} bytes",
            entry.file_id,
            entry.end(),
            data_len
        )));
    }

    let last_modified = modified(&data_meta).max(modified(&header_meta));

    Ok(LoadedPackage {
        source: source.clone(),
        last_modified,
        entries: header.entries,
    })
}

/// Modification time at whole-second precision, which is all HTTP dates carry.
fn modified(meta: &fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .ok()
        .map(DateTime::<Utc>::from)
        .and_then(|t| DateTime::from_timestamp(t.timestamp(), 0))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
