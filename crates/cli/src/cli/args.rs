pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "termfs")]
#[command(about = "Shell over a virtual folder tree, synced to a remote content store")]
pub struct Args {
    /// Content store URL (defaults to the configured remote)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the termfs config directory (defaults to ~/.termfs)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (defaults to the configured level)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
