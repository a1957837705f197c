//! # bundledav
//!
//! Read-only WebDAV access to Diesel engine bundle archives.
//!
//! A game directory stores thousands of assets inside a few large package
//! files, named only by hashes. This crate indexes the header database and
//! the package headers, rebuilds the directory tree, and serves it over
//! WebDAV so any file manager can browse and copy assets without extracting
//! the archive first.
//!
//! ## Features
//!
//! - Directory tree from `bundle_db.blb`, with names from an optional hash list
//! - Files served straight out of the packages, one byte range each
//! - PROPFIND at any depth, GET with conditional requests and HTML listings
//! - Textures offered as `.dds`, string tables as `.strings.json`
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use bundledav::bundle::{BundleDatabase, HashList};
//! use bundledav::dav::DavHandler;
//! use bundledav::provider::ExtractProvider;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = BundleDatabase::open(Path::new("assets"), HashList::new())?;
//!     let provider = ExtractProvider::new(Arc::new(db));
//!     let handler = Arc::new(DavHandler::new(Arc::new(provider), ""));
//!     bundledav::server::bind_and_serve("127.0.0.1:8800".parse()?, handler).await
//! }
//! ```

pub mod bundle;
pub mod cli;
pub mod dav;
pub mod error;
pub mod io;
pub mod provider;
pub mod server;
pub mod transformers;

pub use cli::Cli;
pub use error::IndexError;
