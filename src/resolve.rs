//! Download URL resolution
//!
//! The cache API answers a GET with `{"download_url": "..."}`, a short-lived
//! direct link to the archive.

use crate::error::{PullError, PullResult};
use crate::http::{error_body, excerpt, BODY_EXCERPT_CHARS, MAX_JSON_BYTES, USER_AGENT};
use serde::Deserialize;
use tracing::debug;
use ureq::Agent;

/// Response body of the cache API
#[derive(Debug, Deserialize)]
struct DownloadUrlResponse {
    #[serde(default)]
    download_url: String,
}

/// Ask the cache API for the archive's direct download URL.
///
/// Performs exactly one request. Any status outside 200..=202, a body that is
/// not JSON, or an empty `download_url` is an error.
pub fn resolve_download_url(agent: &Agent, endpoint: &str) -> PullResult<String> {
    debug!("Requesting download URL from {}", endpoint);

    let mut response = agent
        .get(endpoint)
        .header("User-Agent", USER_AGENT)
        .call()
        .map_err(|source| PullError::ResolveTransport {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let status = response.status().as_u16();
    if !(200..=202).contains(&status) {
        return Err(PullError::ResolveStatus {
            status,
            body: error_body(&mut response),
        });
    }

    let bytes = response
        .body_mut()
        .with_config()
        .limit(MAX_JSON_BYTES)
        .read_to_vec()
        .map_err(|source| PullError::ResolveTransport {
            endpoint: endpoint.to_string(),
            source,
        })?;
    let body = || excerpt(&String::from_utf8_lossy(&bytes), BODY_EXCERPT_CHARS);

    let parsed: DownloadUrlResponse =
        serde_json::from_slice(&bytes).map_err(|source| PullError::ResolvePayload {
            status,
            body: body(),
            source,
        })?;

    if parsed.download_url.is_empty() {
        return Err(PullError::EmptyDownloadUrl {
            status,
            body: body(),
        });
    }

    Ok(parsed.download_url)
}
