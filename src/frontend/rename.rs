//! `rename` — atomically replaces one query directory with a freshly
//! initialized one under the new name. Only permitted between two
//! search-dir paths.

use std::ffi::OsStr;

use crate::error::{Result, YtfsError};

use super::inode::{NodeKind, ROOT_INO};
use super::Frontend;

pub(crate) async fn rename(
    frontend: &Frontend,
    parent: u64,
    name: &OsStr,
    newparent: u64,
    newname: &OsStr,
) -> Result<()> {
    if parent != ROOT_INO || newparent != ROOT_INO {
        return Err(YtfsError::NotADirectory);
    }
    let parent_kind = frontend.inodes.get(parent).ok_or(YtfsError::NotFound)?;
    if !matches!(parent_kind, NodeKind::Root) {
        return Err(YtfsError::NotADirectory);
    }

    let old_query = name.to_str().ok_or(YtfsError::InvalidArgument)?;
    let new_query = newname.to_str().ok_or(YtfsError::InvalidArgument)?.to_string();

    frontend.mount.rename(old_query, new_query.clone()).await?;
    frontend.inodes.intern(NodeKind::SearchDir { query: new_query });
    Ok(())
}
