//! Archive download into the staging file

use crate::error::{PullError, PullResult};
use crate::http::{error_body, USER_AGENT};
use crate::ui::{DownloadProgress, UiContext};
use fs_err::File;
use std::io;
use std::path::Path;
use tracing::{debug, info};
use ureq::http::header::CONTENT_LENGTH;
use ureq::Agent;

/// Download `url` into `dest`, replacing any previous contents.
///
/// Performs exactly one attempt. The staging file is only created once the
/// server has answered 200, and is fully written when this returns `Ok`.
/// Returns the number of bytes written.
pub fn fetch_archive(agent: &Agent, url: &str, dest: &Path, ui: &UiContext) -> PullResult<u64> {
    let mut response = agent
        .get(url)
        .header("User-Agent", USER_AGENT)
        .call()
        .map_err(|source| PullError::FetchTransport { source })?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(PullError::FetchStatus {
            status,
            body: error_body(&mut response),
        });
    }

    let content_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    debug!(
        "Archive response: status {}, content-length {:?}",
        status, content_length
    );

    let mut file = File::create(dest).map_err(|e| PullError::staging(dest, e))?;
    let progress = DownloadProgress::new(ui, content_length);
    let mut reader = progress.wrap_read(response.body_mut().as_reader());

    let written = io::copy(&mut reader, &mut file).map_err(|e| PullError::staging(dest, e))?;
    progress.finish();

    info!("Staged {} bytes at {}", written, dest.display());
    Ok(written)
}
