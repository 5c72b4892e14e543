//! `open` — resolves a path's inode to a store or control binding and
//! allocates a file handle for it. A result file is fully resolved (remote
//! URL lookup and size probe) before the handle is handed back, so a
//! resolver failure surfaces here rather than silently on first `read`, and
//! a `getattr` racing a fresh `open` observes the real size rather than `0`.

use crate::error::{Result, YtfsError};
use crate::handles::HandleBinding;

use super::inode::NodeKind;
use super::Frontend;

/// Returns the newly allocated file handle id.
pub(crate) async fn open(frontend: &Frontend, ino: u64, flags: i32) -> Result<u64> {
    if flags & libc::O_ACCMODE != libc::O_RDONLY {
        return Err(YtfsError::ReadOnly);
    }

    let kind = frontend.inodes.get(ino).ok_or(YtfsError::NotFound)?;
    match kind {
        NodeKind::ResultFile { query, name } => {
            let result_set = frontend.mount.get(&query).ok_or(YtfsError::NotFound)?;
            let store = result_set.lookup(&name).await.ok_or(YtfsError::NotFound)?;
            tracing::debug!(%query, %name, "resolving store on open");
            store.obtain_info().await?;
            store.register_handle();
            Ok(frontend.handles.allocate(HandleBinding::Store(store)))
        }
        NodeKind::ControlFile { query, direction } => {
            Ok(frontend.handles.allocate(HandleBinding::Control { query, direction }))
        }
        NodeKind::Root | NodeKind::SearchDir { .. } => Err(YtfsError::IsADirectory),
    }
}
