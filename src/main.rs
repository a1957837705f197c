//! Main entry point for the bundledav server.
//!
//! Indexes an archive directory once, then serves it over WebDAV until
//! interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bundledav::bundle::{BundleDatabase, HashList};
use bundledav::dav::DavHandler;
use bundledav::provider::{ExtractProvider, ReadableFilesystem, TransformProvider};
use bundledav::{Cli, server, transformers};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .init();

    let hashlist = match cli.hashlist_path() {
        Some(path) => {
            let list = HashList::load(&path)?;
            info!("Loaded {} strings from {}", list.len(), path.display());
            list
        }
        None => HashList::new(),
    };

    let db = BundleDatabase::open(&cli.bundles, hashlist)
        .with_context(|| format!("Failed to index {}", cli.bundles.display()))?;
    let db = Arc::new(db);

    let extract = ExtractProvider::new(db.clone());
    let fs: Arc<dyn ReadableFilesystem> = if cli.raw {
        Arc::new(extract)
    } else {
        let rules = transformers::default_rules(db.hashlist().clone());
        Arc::new(TransformProvider::new(extract, rules))
    };

    let handler = Arc::new(DavHandler::new(fs, &cli.prefix));
    server::bind_and_serve(cli.listen, handler)
        .await
        .with_context(|| format!("Failed to serve on {}", cli.listen))
}
