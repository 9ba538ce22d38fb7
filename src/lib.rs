//! cache-pull - Build cache restore step
//!
//! Resolves a short-lived download URL for a cache archive, downloads it to
//! a staging file and restores its entries onto the local filesystem.

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod pipeline;
pub mod resolve;
pub mod retry;
pub mod transport;
pub mod ui;

pub use error::{ErrorKind, PullError, PullResult};
pub use pipeline::{Pipeline, PullOutcome, PullReport};
