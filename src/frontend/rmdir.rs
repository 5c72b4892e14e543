//! `rmdir` — tears down a query's `ResultSet` and every store it owns.

use std::ffi::OsStr;

use crate::error::{Result, YtfsError};

use super::inode::{NodeKind, ROOT_INO};
use super::Frontend;

pub(crate) async fn rmdir(frontend: &Frontend, parent: u64, name: &OsStr) -> Result<()> {
    if parent != ROOT_INO {
        // Nothing nests under a query directory, so its children are never
        // directories themselves.
        return Err(YtfsError::NotADirectory);
    }

    let query = name.to_str().ok_or(YtfsError::InvalidArgument)?;
    if query.is_empty() {
        return Err(YtfsError::InvalidArgument);
    }

    let parent_kind = frontend.inodes.get(parent).ok_or(YtfsError::NotFound)?;
    if !matches!(parent_kind, NodeKind::Root) {
        return Err(YtfsError::NotADirectory);
    }

    frontend.mount.remove(query).await
}
