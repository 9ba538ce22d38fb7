//! Cache archive restoration
//!
//! Decodes a tar stream, optionally wrapped in gzip, entry by entry and
//! recreates each entry under an anchor directory.
//!
//! # Trust model
//!
//! Archives are trusted. Entry names and link targets are not sanitised, so
//! an entry containing `..` or an absolute link target is restored as-is.
//!
//! # Entry kinds
//!
//! | Kind | Restored as |
//! |------|-------------|
//! | Directory | directory (0755), ancestors created |
//! | Regular, Char, Block, Fifo | regular file with payload, mode and mtime |
//! | Symlink | symbolic link to the recorded target |
//! | HardLink | hard link to `name` joined with the recorded target |

mod restore_directory;
mod restore_link;
mod restore_regular;

use crate::error::{PullError, PullResult};
use flate2::read::MultiGzDecoder;
use fs_err::File;
use std::fmt;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tar::EntryType;
use tracing::{debug, trace};


/// Read buffer for the staged archive
const READ_BUFFER_SIZE: usize = 1 << 20;

/// The entry kinds that can be restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    Regular,
    CharDevice,
    BlockDevice,
    Fifo,
    Symlink,
    HardLink,
}

impl EntryKind {
    /// Map a tar type flag to a restorable kind, `None` for anything else
    pub fn from_entry_type(entry_type: EntryType) -> Option<Self> {
        match entry_type {
            EntryType::Directory => Some(Self::Directory),
            EntryType::Regular => Some(Self::Regular),
            EntryType::Char => Some(Self::CharDevice),
            EntryType::Block => Some(Self::BlockDevice),
            EntryType::Fifo => Some(Self::Fifo),
            EntryType::Symlink => Some(Self::Symlink),
            EntryType::Link => Some(Self::HardLink),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Directory => "directory",
            Self::Regular => "file",
            Self::CharDevice => "char device",
            Self::BlockDevice => "block device",
            Self::Fifo => "fifo",
            Self::Symlink => "symlink",
            Self::HardLink => "hard link",
        };
        write!(f, "{}", name)
    }
}

/// Stream envelope around the tar data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "uncompressed"),
            Self::Gzip => write!(f, "gzip"),
        }
    }
}

/// What a restore wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub directories: usize,
    pub files: usize,
    pub symlinks: usize,
    pub hard_links: usize,
    /// Payload bytes written to data entries
    pub bytes: u64,
}

impl RestoreSummary {
    fn record(&mut self, kind: EntryKind, bytes: u64) {
        match kind {
            EntryKind::Directory => self.directories += 1,
            EntryKind::Symlink => self.symlinks += 1,
            EntryKind::HardLink => self.hard_links += 1,
            _ => self.files += 1,
        }
        self.bytes += bytes;
    }

    /// Total number of restored entries
    pub fn entries(&self) -> usize {
        self.directories + self.files + self.symlinks + self.hard_links
    }
}

/// Restore every entry of the archive at `archive` under `anchor`.
///
/// Stops at the first failing entry; entries restored before it stay on disk.
pub fn restore_archive(
    archive: &Path,
    compression: Compression,
    anchor: &Path,
) -> PullResult<RestoreSummary> {
    debug!(
        "Restoring {} archive {} into {}",
        compression,
        archive.display(),
        anchor.display()
    );

    let file = File::open(archive).map_err(|source| PullError::ArchiveRead {
        path: archive.to_path_buf(),
        source,
    })?;
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

    match compression {
        Compression::None => restore_entries(tar::Archive::new(reader), archive, anchor),
        Compression::Gzip => {
            restore_entries(tar::Archive::new(MultiGzDecoder::new(reader)), archive, anchor)
        }
    }
}

fn restore_entries<R: Read>(
    mut tr: tar::Archive<R>,
    archive: &Path,
    anchor: &Path,
) -> PullResult<RestoreSummary> {
    let read_error = |source: io::Error| PullError::ArchiveRead {
        path: archive.to_path_buf(),
        source,
    };

    let mut summary = RestoreSummary::default();
    for entry in tr.entries().map_err(read_error)? {
        let mut entry = entry.map_err(read_error)?;
        let (kind, bytes) = restore_entry(anchor, &mut entry)?;
        summary.record(kind, bytes);
    }

    debug!(
        "Restored {} entries ({} bytes)",
        summary.entries(),
        summary.bytes
    );
    Ok(summary)
}

/// Restore a single entry, returning its kind and payload bytes written
fn restore_entry<R: Read>(
    anchor: &Path,
    entry: &mut tar::Entry<'_, R>,
) -> PullResult<(EntryKind, u64)> {
    let name: PathBuf = entry
        .path()
        .map_err(|e| PullError::restore("<unreadable entry name>", e))?
        .into_owned();
    let entry_type = entry.header().entry_type();

    let kind =
        EntryKind::from_entry_type(entry_type).ok_or_else(|| PullError::UnknownEntryKind {
            entry: name.clone(),
            code: entry_type.as_byte(),
        })?;
    trace!("{} {}", kind, name.display());

    match kind {
        EntryKind::Directory => {
            restore_directory::restore_directory(anchor, &name)?;
            Ok((kind, 0))
        }
        EntryKind::Symlink => {
            let target = link_target(entry, &name)?;
            restore_link::restore_symlink(anchor, &name, &target)?;
            Ok((kind, 0))
        }
        EntryKind::HardLink => {
            let target = link_target(entry, &name)?;
            restore_link::restore_hard_link(anchor, &name, &target)?;
            Ok((kind, 0))
        }
        EntryKind::Regular | EntryKind::CharDevice | EntryKind::BlockDevice | EntryKind::Fifo => {
            let header = entry.header();
            let mode = header.mode().map_err(|e| PullError::restore(&name, e))?;
            let mtime = header.mtime().map_err(|e| PullError::restore(&name, e))?;
            let written = restore_regular::restore_regular(anchor, &name, mode, mtime, entry)?;
            Ok((kind, written))
        }
    }
}

fn link_target<R: Read>(entry: &tar::Entry<'_, R>, name: &Path) -> PullResult<PathBuf> {
    match entry.link_name() {
        Ok(Some(target)) => Ok(target.into_owned()),
        Ok(None) => Err(PullError::restore(
            name,
            io::Error::new(io::ErrorKind::InvalidData, "link entry has no target"),
        )),
        Err(e) => Err(PullError::restore(name, e)),
    }
}
