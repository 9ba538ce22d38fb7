//! Blocking HTTP agents
//!
//! Non-2xx statuses are returned as ordinary responses so callers can read
//! the body for diagnostics.

use std::io::Read;
use std::time::Duration;
use tracing::debug;
use ureq::http::Response;
use ureq::{Agent, Body};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("cache-pull/", env!("CARGO_PKG_VERSION"));

/// Agent for the download URL request, bounded by `timeout`
pub fn resolver_agent(timeout: Duration) -> Agent {
    build_agent(Some(timeout))
}

/// Agent for the archive download; `None` keeps transport defaults
pub fn download_agent(timeout: Option<Duration>) -> Agent {
    build_agent(timeout)
}

fn build_agent(timeout: Option<Duration>) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(timeout)
        .http_status_as_error(false)
        .build();
    Agent::new_with_config(config)
}

/// Longest response body kept in an error message
pub const BODY_EXCERPT_CHARS: usize = 1024;

/// Largest JSON body accepted from the cache API
pub const MAX_JSON_BYTES: u64 = 1024 * 1024;

/// Bytes of an error response read for diagnostics
const ERROR_BODY_BYTES: u64 = 64 * 1024;

/// Read the start of an error response as text.
///
/// Never fails: invalid UTF-8 is replaced and a read error keeps whatever
/// arrived before it, so the status code always reaches the caller.
pub fn error_body(response: &mut Response<Body>) -> String {
    let mut bytes = Vec::new();
    if let Err(e) = response
        .body_mut()
        .as_reader()
        .take(ERROR_BODY_BYTES)
        .read_to_end(&mut bytes)
    {
        debug!("Failed to read error response body: {}", e);
    }
    excerpt(&String::from_utf8_lossy(&bytes), BODY_EXCERPT_CHARS)
}

/// Truncate a response body for inclusion in an error message
pub fn excerpt(body: &str, max_chars: usize) -> String {
    let body = body.trim();
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
