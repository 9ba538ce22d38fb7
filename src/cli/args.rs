//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// cache-pull - Restore a build cache archive
///
/// Resolves a short-lived download URL from the cache API, downloads the
/// archive and restores its contents relative to the target directory.
#[derive(Parser, Debug)]
#[command(name = "cache-pull")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Cache API endpoint that issues the download URL (empty = no cache)
    #[arg(long, env = "cache_api_url")]
    pub api_url: Option<String>,

    /// Enable debug mode ("true" enables it when read from the environment)
    #[arg(
        long,
        env = "is_debug_mode",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_debug_flag
    )]
    pub debug: bool,

    /// Local staging file for the downloaded archive
    #[arg(long, env = "CACHE_PULL_ARCHIVE_PATH")]
    pub archive_path: Option<PathBuf>,

    /// Directory the archive is restored into (defaults to current directory)
    #[arg(long, env = "CACHE_PULL_TARGET_DIR")]
    pub target_dir: Option<PathBuf>,

    /// Abort the archive download after this many seconds
    #[arg(long, env = "CACHE_PULL_DOWNLOAD_TIMEOUT", value_parser = parse_seconds)]
    pub download_timeout: Option<Duration>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Only the exact string "true" turns debug mode on
fn parse_debug_flag(s: &str) -> Result<bool, String> {
    Ok(s == "true")
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: u64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid number of seconds: '{s}'"))?;
    if secs == 0 {
        return Err("timeout must be at least one second".to_string());
    }
    Ok(Duration::from_secs(secs))
}
