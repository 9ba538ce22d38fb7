//! Run configuration for cache-pull
//!
//! `PullConfig` is built once from the parsed CLI and passed explicitly to
//! every component that needs it.

use crate::cli::Cli;
use crate::error::{PullError, PullResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File name of the staging archive inside the system temp directory
pub const DEFAULT_ARCHIVE_NAME: &str = "cache-archive.tar";

/// Timeout for the download URL request
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(20);

/// Resolved configuration for a single run
#[derive(Debug, Clone)]
pub struct PullConfig {
    /// Cache API endpoint; `None` means there is no cache to pull
    pub api_url: Option<String>,
    /// Debug mode: logs the resolved configuration and download URL
    pub debug: bool,
    /// Staging file the archive is downloaded to
    pub archive_path: PathBuf,
    /// Root the archive entries are restored under
    pub target_dir: PathBuf,
    /// Timeout for the download URL request
    pub resolve_timeout: Duration,
    /// Optional timeout for the whole archive download
    pub download_timeout: Option<Duration>,
}

impl PullConfig {
    /// Create a config for an endpoint, with default paths and timeouts
    pub fn new(api_url: impl Into<String>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_url: normalize_endpoint(Some(api_url.into())),
            debug: false,
            archive_path: Self::default_archive_path(),
            target_dir: target_dir.into(),
            resolve_timeout: RESOLVE_TIMEOUT,
            download_timeout: None,
        }
    }

    /// Build the config from parsed CLI arguments
    ///
    /// The target directory defaults to the current working directory.
    pub fn from_cli(cli: &Cli) -> PullResult<Self> {
        let target_dir = match &cli.target_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .map_err(|e| PullError::io("getting current directory", e))?,
        };

        if target_dir.exists() && !target_dir.is_dir() {
            return Err(PullError::Config(format!(
                "target {} is not a directory",
                target_dir.display()
            )));
        }

        let config = Self {
            api_url: normalize_endpoint(cli.api_url.clone()),
            debug: cli.debug,
            archive_path: cli
                .archive_path
                .clone()
                .unwrap_or_else(Self::default_archive_path),
            target_dir,
            resolve_timeout: RESOLVE_TIMEOUT,
            download_timeout: cli.download_timeout,
        };

        if config.debug {
            debug!("=> config: {:#?}", config);
        }

        Ok(config)
    }

    /// Get the default staging file path
    pub fn default_archive_path() -> PathBuf {
        std::env::temp_dir().join(DEFAULT_ARCHIVE_NAME)
    }

    /// Set the staging file path
    pub fn with_archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = path.into();
        self
    }

    /// Set debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The endpoint, if a cache is configured
    pub fn endpoint(&self) -> Option<&str> {
        self.api_url.as_deref()
    }

    /// Get the target directory
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }
}

/// Blank endpoints mean "no cache configured"
fn normalize_endpoint(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}
