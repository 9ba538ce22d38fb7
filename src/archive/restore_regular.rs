use std::io::{self, Read};
use std::path::Path;

use filetime::FileTime;
use fs_err::File;
use tracing::warn;

use super::restore_directory::mkdir_parent;
use crate::error::{PullError, PullResult};

/// Write a data-bearing entry to `anchor/name`, returning payload bytes written.
///
/// The file is created or truncated. A failure to apply `mode` is logged and
/// ignored on every platform, Unix included. Every other failure is an error.
pub fn restore_regular(
    anchor: &Path,
    name: &Path,
    mode: u32,
    mtime: u64,
    reader: &mut impl Read,
) -> PullResult<u64> {
    let path = anchor.join(name);
    mkdir_parent(&path).map_err(|e| PullError::restore(name, e))?;

    let written = {
        let mut file = File::create(&path).map_err(|e| PullError::restore(name, e))?;
        let written = io::copy(reader, &mut file).map_err(|e| PullError::restore(name, e))?;

        if let Err(e) = apply_mode(&file, mode) {
            warn!("Could not set mode {:o} on {}: {}", mode, name.display(), e);
        }
        written
    };

    let time = FileTime::from_unix_time(i64::try_from(mtime).unwrap_or(i64::MAX), 0);
    filetime::set_file_times(&path, time, time).map_err(|e| PullError::restore(name, e))?;

    Ok(written)
}

#[cfg(unix)]
fn apply_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn apply_mode(file: &File, mode: u32) -> io::Result<()> {
    // Only the write bits map onto the read-only attribute
    let mut permissions = file.metadata()?.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    file.set_permissions(permissions)
}
