//! Network seam of the pipeline
//!
//! The pipeline only talks to the network through [`CacheTransport`], so
//! tests can substitute a transport that fails on demand.

use crate::config::PullConfig;
use crate::error::PullResult;
use crate::ui::UiContext;
use crate::{fetch, http, resolve};
use std::path::Path;
use ureq::Agent;

/// Resolves and downloads cache archives
pub trait CacheTransport {
    /// Obtain the direct download URL from the cache API (one request)
    fn resolve_download_url(&self, endpoint: &str) -> PullResult<String>;

    /// Download `url` into `dest`, one attempt, returning bytes written
    fn fetch_archive(&self, url: &str, dest: &Path) -> PullResult<u64>;
}

/// HTTP transport backed by blocking ureq agents
pub struct HttpTransport {
    resolver: Agent,
    downloader: Agent,
    ui: UiContext,
}

impl HttpTransport {
    /// Create agents with the configured timeouts
    pub fn new(config: &PullConfig, ui: UiContext) -> Self {
        Self {
            resolver: http::resolver_agent(config.resolve_timeout),
            downloader: http::download_agent(config.download_timeout),
            ui,
        }
    }
}

impl CacheTransport for HttpTransport {
    fn resolve_download_url(&self, endpoint: &str) -> PullResult<String> {
        resolve::resolve_download_url(&self.resolver, endpoint)
    }

    fn fetch_archive(&self, url: &str, dest: &Path) -> PullResult<u64> {
        fetch::fetch_archive(&self.downloader, url, dest, &self.ui)
    }
}
