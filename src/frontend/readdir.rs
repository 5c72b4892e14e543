//! `readdir` — lists search-query directories at the root, or the current
//! page's names plus the two control files inside a query directory.

use crate::error::{Result, YtfsError};

use super::inode::NodeKind;
use super::Frontend;

/// One directory entry: its inode, FUSE file type, and display name.
pub(crate) struct Entry {
    pub ino: u64,
    pub kind: fuser::FileType,
    pub name: String,
}

pub(crate) async fn readdir(frontend: &Frontend, ino: u64) -> Result<Vec<Entry>> {
    let kind = frontend.inodes.get(ino).ok_or(YtfsError::NotFound)?;
    match kind {
        NodeKind::Root => {
            let mut entries = Vec::new();
            for query in frontend.mount.query_names() {
                let child_ino =
                    frontend.inodes.intern(NodeKind::SearchDir { query: query.clone() });
                entries.push(Entry { ino: child_ino, kind: fuser::FileType::Directory, name: query });
            }
            Ok(entries)
        }
        NodeKind::SearchDir { query } => {
            let result_set = frontend.mount.get(&query).ok_or(YtfsError::NotFound)?;
            let mut entries = Vec::new();
            for name in result_set.list().await {
                let is_control = name.starts_with(' ');
                let child_ino = if is_control {
                    let direction = if name == crate::path::CONTROL_NEXT {
                        crate::path::ControlDirection::Next
                    } else {
                        crate::path::ControlDirection::Prev
                    };
                    frontend.inodes.intern(NodeKind::ControlFile { query: query.clone(), direction })
                } else {
                    frontend.inodes.intern(NodeKind::ResultFile {
                        query: query.clone(),
                        name: crate::path::strip_extension(&name).to_string(),
                    })
                };
                entries.push(Entry { ino: child_ino, kind: fuser::FileType::RegularFile, name });
            }
            Ok(entries)
        }
        NodeKind::ResultFile { .. } | NodeKind::ControlFile { .. } => Err(YtfsError::NotADirectory),
    }
}
