use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bundledav")]
#[command(version)]
#[command(about = "Serve Diesel engine bundle archives read-only over WebDAV", long_about = None)]
#[command(after_help = "Examples:\n  \
  bundledav --bundles ~/PAYDAY\\ 2/assets                  serve on 127.0.0.1:8800\n  \
  bundledav --bundles assets --prefix /pd2 --listen 0.0.0.0:8800\n  \
  bundledav --bundles assets --raw -v                     untransformed files, debug log")]
pub struct Cli {
    /// Archive directory holding bundle_db.blb and the .bundle files
    #[arg(long, value_name = "DIR", env = "BUNDLEDAV_BUNDLES")]
    pub bundles: PathBuf,

    /// Newline-separated known strings (default: <DIR>/hashlist if present)
    #[arg(long, value_name = "FILE", env = "BUNDLEDAV_HASHLIST")]
    pub hashlist: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, value_name = "ADDR", env = "BUNDLEDAV_LISTEN", default_value = "127.0.0.1:8800")]
    pub listen: SocketAddr,

    /// Path the archive is served under
    #[arg(long, value_name = "PATH", env = "BUNDLEDAV_PREFIX", default_value = "")]
    pub prefix: String,

    /// Serve files as stored, without renaming or converting them
    #[arg(long, env = "BUNDLEDAV_RAW")]
    pub raw: bool,

    /// More logging (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The hash list to load, if any.
    pub fn hashlist_path(&self) -> Option<PathBuf> {
        match &self.hashlist {
            Some(path) => Some(path.clone()),
            None => {
                let default = self.bundles.join("hashlist");
                default.is_file().then_some(default)
            }
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
