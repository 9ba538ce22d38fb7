//! Error types for cache-pull
//!
//! All modules use `PullResult<T>` as their return type. Variants are
//! grouped by the pipeline stage that produced them, see [`ErrorKind`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cache-pull operations
pub type PullResult<T> = Result<T, PullError>;

/// The pipeline stage an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Obtaining the direct download URL failed
    Resolution,
    /// Streaming the archive to the staging file failed
    Fetch,
    /// Decoding the archive or writing an entry failed
    Restore,
    /// Anything outside the three pipeline stages
    Other,
}

/// All errors that can occur while pulling a cache archive
#[derive(Error, Debug)]
pub enum PullError {
    // Resolution errors
    #[error("Failed to send request to {endpoint}: {source}")]
    ResolveTransport {
        endpoint: String,
        #[source]
        source: ureq::Error,
    },

    #[error("Build cache not found (http-code: {status}). Probably cache not initialised yet")]
    ResolveStatus { status: u16, body: String },

    #[error("Request sent, but failed to parse JSON response (http-code: {status}): {body}")]
    ResolvePayload {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request sent, but download URL is empty (http-code: {status}): {body}")]
    EmptyDownloadUrl { status: u16, body: String },

    // Fetch errors
    #[error("Failed to download archive: {source}")]
    FetchTransport {
        #[source]
        source: ureq::Error,
    },

    #[error("Failed to download archive - non success response code: {status}, body: {body}")]
    FetchStatus { status: u16, body: String },

    #[error("Failed to stage archive at {path}: {source}")]
    FetchIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Restore errors
    #[error("Failed to read archive {path}: {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to restore {entry}: {source}")]
    RestoreEntry {
        entry: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{entry}: unknown type flag: {}", display_type_flag(*.code))]
    UnknownEntryKind { entry: PathBuf, code: u8 },

    // General errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn display_type_flag(code: u8) -> String {
    if code.is_ascii_graphic() {
        format!("'{}'", code as char)
    } else {
        format!("0x{:02x}", code)
    }
}

impl PullError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a per-entry restore error
    pub fn restore(entry: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RestoreEntry {
            entry: entry.into(),
            source,
        }
    }

    /// Create a staging I/O error
    pub fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FetchIo {
            path: path.into(),
            source,
        }
    }

    /// Stage this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ResolveTransport { .. }
            | Self::ResolveStatus { .. }
            | Self::ResolvePayload { .. }
            | Self::EmptyDownloadUrl { .. } => ErrorKind::Resolution,
            Self::FetchTransport { .. } | Self::FetchStatus { .. } | Self::FetchIo { .. } => {
                ErrorKind::Fetch
            }
            Self::ArchiveRead { .. }
            | Self::RestoreEntry { .. }
            | Self::UnknownEntryKind { .. } => ErrorKind::Restore,
            Self::Io { .. } | Self::Config(_) => ErrorKind::Other,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ResolveStatus { status: 404, .. } => {
                Some("The first cache push creates the cache, a first build has none yet")
            }
            Self::ResolveStatus { status: 401 | 403, .. } => {
                Some("The cache API URL is signed and may have expired, re-run the build")
            }
            Self::FetchStatus { status: 403, .. } => {
                Some("The download URL is time-limited; re-run to resolve a fresh one")
            }
            Self::UnknownEntryKind { .. } => {
                Some("The archive was produced by an incompatible cache push step")
            }
            _ => None,
        }
    }
}
