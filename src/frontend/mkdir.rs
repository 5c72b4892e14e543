//! `mkdir` — creates and initializes a new query directory.

use std::ffi::OsStr;

use crate::error::{Result, YtfsError};

use super::inode::NodeKind;
use super::Frontend;

pub(crate) async fn mkdir(frontend: &Frontend, parent: u64, name: &OsStr) -> Result<u64> {
    let parent_kind = frontend.inodes.get(parent).ok_or(YtfsError::NotFound)?;
    if !matches!(parent_kind, NodeKind::Root) {
        return Err(YtfsError::PermissionDenied);
    }

    let query = name.to_str().ok_or(YtfsError::InvalidArgument)?.to_string();
    if query.is_empty() || query.starts_with(' ') {
        return Err(YtfsError::PermissionDenied);
    }

    frontend.mount.create(query.clone()).await?;
    Ok(frontend.inodes.intern(NodeKind::SearchDir { query }))
}
