//! Pull pipeline: resolve, fetch, restore
//!
//! ```text
//! Resolving -> Fetching (x2) -> Restoring (uncompressed, then gzip) -> Done
//! ```
//!
//! Resolution runs once. Fetching is retried once with the same URL.
//! Restoring first assumes a plain tar and retries assuming gzip. A failure
//! of the last attempt of any stage ends the run.

use crate::archive::{restore_archive, Compression, RestoreSummary};
use crate::config::PullConfig;
use crate::error::PullResult;
use crate::retry::{with_retry, RetryPolicy};
use crate::transport::{CacheTransport, HttpTransport};
use crate::ui::{self, StageSpinner, UiContext};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Envelopes tried by the restore stage, in order
const RESTORE_ORDER: [Compression; 2] = [Compression::None, Compression::Gzip];

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Fetching,
    Restoring,
}

impl Stage {
    fn start_message(&self) -> &'static str {
        match self {
            Self::Resolving => "Resolving cache download URL...",
            Self::Fetching => "Downloading cache archive...",
            Self::Restoring => "Restoring cache archive...",
        }
    }

    fn done_message(&self) -> &'static str {
        match self {
            Self::Resolving => "Download URL resolved",
            Self::Fetching => "Cache archive downloaded",
            Self::Restoring => "Cache archive restored",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolve",
            Self::Fetching => "download",
            Self::Restoring => "restore",
        };
        write!(f, "{}", name)
    }
}

/// Wall-clock time spent per stage
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub resolve: Duration,
    pub fetch: Duration,
    pub restore: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.resolve + self.fetch + self.restore
    }
}

/// Result of a completed pull
#[derive(Debug, Clone)]
pub struct PullReport {
    pub download_url: String,
    /// Size of the staged archive
    pub archive_bytes: u64,
    pub fetch_attempts: u32,
    /// Envelope the archive was decoded with
    pub compression: Compression,
    pub summary: RestoreSummary,
    pub timings: StageTimings,
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum PullOutcome {
    /// No endpoint configured, nothing was done
    Skipped,
    /// The archive was restored
    Restored(PullReport),
}

/// Runs a pull with a given transport
pub struct Pipeline<T: CacheTransport> {
    transport: T,
    config: PullConfig,
    ui: UiContext,
}

impl Pipeline<HttpTransport> {
    /// Pipeline talking HTTP with the configured timeouts
    pub fn http(config: PullConfig, ui: UiContext) -> Self {
        let transport = HttpTransport::new(&config, ui);
        Self::new(transport, config, ui)
    }
}

impl<T: CacheTransport> Pipeline<T> {
    pub fn new(transport: T, config: PullConfig, ui: UiContext) -> Self {
        Self {
            transport,
            config,
            ui,
        }
    }

    /// Run the pipeline to completion or to the first terminal failure
    pub fn run(&self) -> PullResult<PullOutcome> {
        let Some(endpoint) = self.config.endpoint() else {
            info!("No cache API URL specified, there's no cache to use");
            return Ok(PullOutcome::Skipped);
        };

        let mut timings = StageTimings::default();

        let (download_url, elapsed) = self.run_stage(Stage::Resolving, || {
            self.transport.resolve_download_url(endpoint)
        })?;
        timings.resolve = elapsed;

        if self.config.debug {
            debug!("download URL: {}", download_url);
            ui::key_value(&self.ui, "download_url", &download_url);
        }

        let archive = self.config.archive_path.as_path();
        let mut fetch_attempts = 0;
        let (archive_bytes, elapsed) = self.run_stage(Stage::Fetching, || {
            with_retry(RetryPolicy::ONCE, "Download", |attempt| {
                fetch_attempts = attempt;
                self.transport
                    .fetch_archive(&download_url, archive)
                    .inspect_err(|e| {
                        if attempt == 1 {
                            ui::step_warn_detail(
                                &self.ui,
                                "Download failed, retrying",
                                &e.to_string(),
                            );
                        }
                    })
            })
        })?;
        timings.fetch = elapsed;

        let target = self.config.target_dir();
        let policy = RetryPolicy::new(RESTORE_ORDER.len() as u32);
        let ((compression, summary), elapsed) = self.run_stage(Stage::Restoring, || {
            with_retry(policy, "Restore", |attempt| {
                let compression = RESTORE_ORDER[(attempt - 1) as usize];
                restore_archive(archive, compression, target)
                    .map(|summary| (compression, summary))
            })
        })?;
        timings.restore = elapsed;

        info!(
            "Restored {} entries from {} archive in {:.2?}",
            summary.entries(),
            compression,
            timings.total()
        );

        Ok(PullOutcome::Restored(PullReport {
            download_url,
            archive_bytes,
            fetch_attempts,
            compression,
            summary,
            timings,
        }))
    }

    /// Run one stage behind a spinner and measure it
    fn run_stage<R>(
        &self,
        stage: Stage,
        op: impl FnOnce() -> PullResult<R>,
    ) -> PullResult<(R, Duration)> {
        let spinner = StageSpinner::start(&self.ui, stage.start_message());
        let started = Instant::now();

        match op() {
            Ok(value) => {
                let elapsed = started.elapsed();
                info!("{} took {:.2?}", stage, elapsed);
                spinner.stop(stage.done_message(), elapsed);
                Ok((value, elapsed))
            }
            Err(e) => {
                spinner.stop_error(&format!("{} failed", stage));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::fixtures::{ArchiveBuilder, MTIME};
    use crate::error::{ErrorKind, PullError};
    use filetime::FileTime;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Workspace {
        _temp: TempDir,
        target: PathBuf,
        archive: PathBuf,
    }

    fn workspace() -> Workspace {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("project");
        fs::create_dir(&target).unwrap();
        let archive = temp.path().join("cache-archive.tar");
        Workspace {
            _temp: temp,
            target,
            archive,
        }
    }

    fn config_for(endpoint: &str, ws: &Workspace) -> PullConfig {
        PullConfig::new(endpoint, &ws.target).with_archive_path(&ws.archive)
    }

    fn sample_archive() -> ArchiveBuilder {
        ArchiveBuilder::new().dir("d/").file("d/f.txt", b"hi")
    }

    /// Serves the resolve endpoint and the archive, returns the endpoint URL
    fn serve(server: &MockServer, archive: Vec<u8>) -> String {
        let archive_url = server.url("/a.tar");
        server.mock(|when, then| {
            when.method(GET).path("/api/cache");
            then.status(200)
                .json_body(json!({ "download_url": archive_url }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/a.tar");
            then.status(200).body(archive);
        });
        server.url("/api/cache")
    }

    fn assert_sample_restored(target: &Path) {
        assert!(target.join("d").is_dir());
        let file = target.join("d/f.txt");
        assert_eq!(fs::read_to_string(&file).unwrap(), "hi");
        let meta = fs::metadata(&file).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&meta).unix_seconds(),
            MTIME as i64
        );
    }

    fn expect_restored(outcome: PullOutcome) -> PullReport {
        match outcome {
            PullOutcome::Restored(report) => report,
            PullOutcome::Skipped => panic!("expected a restore"),
        }
    }

    /// Wraps the HTTP transport and fails the first `fail_fetches` downloads
    /// after leaving partial bytes in the staging file
    struct FlakyTransport {
        inner: HttpTransport,
        fail_fetches: u32,
        fetches: Cell<u32>,
    }

    impl CacheTransport for FlakyTransport {
        fn resolve_download_url(&self, endpoint: &str) -> PullResult<String> {
            self.inner.resolve_download_url(endpoint)
        }

        fn fetch_archive(&self, url: &str, dest: &Path) -> PullResult<u64> {
            let call = self.fetches.get() + 1;
            self.fetches.set(call);
            if call <= self.fail_fetches {
                fs::write(dest, b"partial garbage").unwrap();
                return Err(PullError::FetchTransport {
                    source: ureq::Error::Io(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset by peer",
                    )),
                });
            }
            self.inner.fetch_archive(url, dest)
        }
    }

    /// Counts calls and never succeeds
    #[derive(Default)]
    struct CountingTransport {
        calls: Cell<u32>,
    }

    impl CacheTransport for CountingTransport {
        fn resolve_download_url(&self, _endpoint: &str) -> PullResult<String> {
            self.calls.set(self.calls.get() + 1);
            Err(PullError::Config("unexpected network call".to_string()))
        }

        fn fetch_archive(&self, _url: &str, _dest: &Path) -> PullResult<u64> {
            self.calls.set(self.calls.get() + 1);
            Err(PullError::Config("unexpected network call".to_string()))
        }
    }

    #[test]
    fn restores_uncompressed_archive() {
        let server = MockServer::start();
        let endpoint = serve(&server, sample_archive().into_tar());
        let ws = workspace();

        let outcome = Pipeline::http(config_for(&endpoint, &ws), UiContext::non_interactive())
            .run()
            .unwrap();

        let report = expect_restored(outcome);
        assert_eq!(report.compression, Compression::None);
        assert_eq!(report.fetch_attempts, 1);
        assert_eq!(report.download_url, server.url("/a.tar"));
        assert_eq!(report.archive_bytes, fs::metadata(&ws.archive).unwrap().len());
        assert_sample_restored(&ws.target);
    }

    #[test]
    fn falls_back_to_gzip() {
        let server = MockServer::start();
        let endpoint = serve(&server, sample_archive().into_gzip());
        let ws = workspace();

        let outcome = Pipeline::http(config_for(&endpoint, &ws), UiContext::non_interactive())
            .run()
            .unwrap();

        let report = expect_restored(outcome);
        assert_eq!(report.compression, Compression::Gzip);
        assert_eq!(report.summary.files, 1);
        assert_sample_restored(&ws.target);
    }

    #[test]
    fn retries_failed_fetch_with_same_url() {
        let server = MockServer::start();
        let endpoint = serve(&server, sample_archive().into_tar());
        let ws = workspace();
        let config = config_for(&endpoint, &ws);
        let transport = FlakyTransport {
            inner: HttpTransport::new(&config, UiContext::non_interactive()),
            fail_fetches: 1,
            fetches: Cell::new(0),
        };

        let pipeline = Pipeline::new(transport, config, UiContext::non_interactive());
        let report = expect_restored(pipeline.run().unwrap());

        assert_eq!(report.fetch_attempts, 2);
        assert_eq!(pipeline.transport.fetches.get(), 2);
        assert_sample_restored(&ws.target);
    }

    #[test]
    fn second_fetch_failure_is_terminal() {
        let server = MockServer::start();
        let archive_url = server.url("/a.tar");
        let api = server.mock(|when, then| {
            when.method(GET).path("/api/cache");
            then.status(200)
                .json_body(json!({ "download_url": archive_url }));
        });
        let download = server.mock(|when, then| {
            when.method(GET).path("/a.tar");
            then.status(500).body("backend unavailable");
        });
        let ws = workspace();

        let err = Pipeline::http(
            config_for(&server.url("/api/cache"), &ws),
            UiContext::non_interactive(),
        )
        .run()
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Fetch);
        api.assert_hits(1);
        download.assert_hits(2);
        assert!(!ws.target.join("d").exists());
    }

    #[test]
    fn resolution_failure_is_not_retried() {
        let server = MockServer::start();
        let api = server.mock(|when, then| {
            when.method(GET).path("/api/cache");
            then.status(404).body("not found");
        });
        let ws = workspace();

        let err = Pipeline::http(
            config_for(&server.url("/api/cache"), &ws),
            UiContext::non_interactive(),
        )
        .run()
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Resolution);
        api.assert_hits(1);
        assert!(!ws.archive.exists());
    }

    #[test]
    fn undecodable_archive_fails_after_both_attempts() {
        let server = MockServer::start();
        let endpoint = serve(&server, b"this is neither tar nor gzip".to_vec());
        let ws = workspace();

        let err = Pipeline::http(config_for(&endpoint, &ws), UiContext::non_interactive())
            .run()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Restore);
    }

    #[test]
    fn empty_endpoint_is_a_no_op() {
        let ws = workspace();
        let config = PullConfig::new("", &ws.target).with_archive_path(&ws.archive);

        let pipeline = Pipeline::new(
            CountingTransport::default(),
            config,
            UiContext::non_interactive(),
        );
        let outcome = pipeline.run().unwrap();

        assert!(matches!(outcome, PullOutcome::Skipped));
        assert_eq!(pipeline.transport.calls.get(), 0);
        assert!(!ws.archive.exists());
        assert_eq!(fs::read_dir(&ws.target).unwrap().count(), 0);
    }

    #[test]
    fn debug_mode_still_restores() {
        let server = MockServer::start();
        let endpoint = serve(&server, sample_archive().into_tar());
        let ws = workspace();
        let config = config_for(&endpoint, &ws).with_debug(true);

        let outcome = Pipeline::http(config, UiContext::non_interactive())
            .run()
            .unwrap();

        expect_restored(outcome);
        assert_sample_restored(&ws.target);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Resolving.to_string(), "resolve");
        assert_eq!(Stage::Fetching.to_string(), "download");
        assert_eq!(Stage::Restoring.to_string(), "restore");
    }
}
