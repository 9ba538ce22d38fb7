use std::fs::DirBuilder;
use std::io;
use std::path::Path;

use crate::error::{PullError, PullResult};

/// Mode for directories created during restore
const DIR_MODE: u32 = 0o755;

pub fn restore_directory(anchor: &Path, name: &Path) -> PullResult<()> {
    mkdir_all(&anchor.join(name)).map_err(|e| PullError::restore(name, e))
}

/// Create `path` and any missing ancestors; an existing directory is fine.
pub fn mkdir_all(path: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }

    builder.create(path)
}

/// Create the parent directories of a resolved entry path
pub fn mkdir_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => mkdir_all(parent),
        _ => Ok(()),
    }
}
