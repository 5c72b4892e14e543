//! `getattr` — reports inode attributes without performing network I/O.

use std::time::{Duration, SystemTime};

use fuser::{FileAttr, FileType};

use crate::error::{Result, YtfsError};
use crate::frontend::read::CONTROL_PAYLOAD;

use super::inode::NodeKind;
use super::Frontend;

pub(crate) const ATTR_TTL: Duration = Duration::from_secs(1);

pub(crate) async fn getattr(frontend: &Frontend, ino: u64) -> Result<FileAttr> {
    let kind = frontend.inodes.get(ino).ok_or(YtfsError::NotFound)?;
    let attr = match kind {
        NodeKind::Root | NodeKind::SearchDir { .. } => dir_attr(ino),
        NodeKind::ResultFile { query, name } => {
            let result_set = frontend.mount.get(&query).ok_or(YtfsError::NotFound)?;
            let store = result_set.lookup(&name).await.ok_or(YtfsError::NotFound)?;
            file_attr(ino, store.cached_filesize())
        }
        NodeKind::ControlFile { .. } => file_attr_with_mode(ino, CONTROL_PAYLOAD.len() as u64, 0o555),
    };
    Ok(attr)
}

fn dir_attr(ino: u64) -> FileAttr {
    base_attr(ino, FileType::Directory, 0o555, 0)
}

fn file_attr(ino: u64, size: u64) -> FileAttr {
    base_attr(ino, FileType::RegularFile, 0o444, size)
}

fn file_attr_with_mode(ino: u64, size: u64, perm: u16) -> FileAttr {
    base_attr(ino, FileType::RegularFile, perm, size)
}

fn base_attr(ino: u64, kind: FileType, perm: u16, size: u64) -> FileAttr {
    let now = SystemTime::now();
    FileAttr {
        ino,
        size,
        blocks: size.div_ceil(512),
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind,
        perm,
        nlink: if kind == FileType::Directory { 2 } else { 1 },
        uid: 0,
        gid: 0,
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}
