//! Bundle archive indexing.
//!
//! ## Architecture
//!
//! - [`idstring`]: the engine's string hash and the hash list used to turn
//!   hashes back into names
//! - [`structures`]: binary layouts of the header database and package headers
//! - [`parser`]: reading those files from an archive directory
//! - [`database`]: the directory tree built from them
//!
//! ## Archive Layout
//!
//! ```text
//! assets/
//!   bundle_db.blb         every logical file: id, path, language, extension
//!   all_0.bundle          package data
//!   all_0_h.bundle        (file id, offset, length) for each file in all_0
//!   ...
//! ```
//!
//! A file may be stored in several packages (for instance once per language
//! pack). The index keeps every copy and prefers the largest.

pub mod database;
pub mod idstring;
pub mod parser;
pub mod structures;

pub use database::{
    BundleDatabase, FileRef, Item, ItemId, ItemKey, ItemKind, Package, PackageId, Placement,
    Walk,
};
pub use idstring::{HashList, Idstring};
