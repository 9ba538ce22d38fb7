//! User-facing step output
//!
//! Uses `cliclack` spinners and an `indicatif` download bar on a terminal,
//! with automatic fallback to plain lines in CI/non-interactive environments.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{intro, key_value, outro_error, outro_info, outro_success, step_warn_detail};
pub use progress::{DownloadProgress, StageSpinner};
