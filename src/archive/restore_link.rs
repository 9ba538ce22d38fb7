use std::io;
use std::path::{Component, Path, PathBuf};

use path_clean::PathClean;

use super::restore_directory::mkdir_parent;
use crate::error::{PullError, PullResult};

pub fn restore_symlink(anchor: &Path, name: &Path, target: &Path) -> PullResult<()> {
    let path = anchor.join(name);
    mkdir_parent(&path).map_err(|e| PullError::restore(name, e))?;
    remove_non_directory(&path).map_err(|e| PullError::restore(name, e))?;
    symlink(target, &path).map_err(|e| PullError::restore(name, e))
}

/// Hard links point at `name` joined with the recorded target, which is how
/// the archive producer addresses them. `"d/g.txt"` with target `"../f.txt"`
/// links to `"d/f.txt"`.
pub fn restore_hard_link(anchor: &Path, name: &Path, target: &Path) -> PullResult<()> {
    let path = anchor.join(name);
    let source = anchor.join(hard_link_source(name, target));

    let link_error = |e: io::Error| {
        PullError::restore(
            name,
            io::Error::new(e.kind(), format!("linking to {}: {}", source.display(), e)),
        )
    };

    std::fs::symlink_metadata(&source).map_err(link_error)?;
    mkdir_parent(&path).map_err(|e| PullError::restore(name, e))?;
    if source != path {
        remove_non_directory(&path).map_err(|e| PullError::restore(name, e))?;
    }
    std::fs::hard_link(&source, &path).map_err(link_error)
}

/// Lexically join `target` onto `name` and clean the result.
///
/// Root and prefix components of `target` are dropped so an absolute target
/// still nests under `name`.
pub fn hard_link_source(name: &Path, target: &Path) -> PathBuf {
    let mut joined = name.to_path_buf();
    for component in target.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {}
            Component::CurDir | Component::ParentDir | Component::Normal(_) => {
                joined.push(component)
            }
        }
    }
    joined.clean()
}

/// Clear a file or link left by a previous restore so the link can be created
fn remove_non_directory(path: &Path) -> io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.is_dir() => std::fs::remove_file(path),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn symlink(target: &Path, path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, path)
}

#[cfg(windows)]
fn symlink(target: &Path, path: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, path)
}
