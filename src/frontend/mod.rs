//! FilesystemFrontend — implements `fuser::Filesystem` by composing the
//! rest of the crate, one submodule per FUSE operation.
//!
//! `fuser::Filesystem` methods are synchronous (each FUSE request arrives
//! on a dispatch thread owned by the kernel bridge); every handler here
//! spawns its async body onto the shared `tokio` runtime and replies from
//! there, so one slow request never blocks the next dispatch.

mod getattr;
mod inode;
mod mkdir;
mod open;
mod read;
mod readdir;
mod release;
mod rename;
mod rmdir;
mod unlink;

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use fuser::{
    FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen,
    Request,
};

use crate::handles::FileHandleTable;
use crate::mount::Mount;

use getattr::ATTR_TTL;
use inode::{InodeTable, NodeKind, ROOT_INO};

const ENTRY_TTL: Duration = Duration::from_secs(1);

/// Everything a FUSE operation handler needs, held behind cheaply
/// cloneable `Arc`s so each dispatched request can own its own copy.
#[derive(Clone)]
pub struct Frontend {
    mount: Arc<Mount>,
    handles: Arc<FileHandleTable>,
    inodes: Arc<InodeTable>,
    runtime: tokio::runtime::Handle,
}

impl Frontend {
    pub fn new(mount: Arc<Mount>, runtime: tokio::runtime::Handle) -> Self {
        Self { mount, handles: Arc::new(FileHandleTable::new()), inodes: Arc::new(InodeTable::new()), runtime }
    }

    fn spawn(&self, future: impl std::future::Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(future);
    }
}

impl Filesystem for Frontend {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let frontend = self.clone();
        let name = name.to_os_string();
        self.spawn(async move {
            let parent_kind = match frontend.inodes.get(parent) {
                Some(kind) => kind,
                None => return reply.error(libc::ENOENT),
            };
            let query = match &parent_kind {
                NodeKind::Root => None,
                NodeKind::SearchDir { query } => Some(query.clone()),
                _ => return reply.error(libc::ENOTDIR),
            };
            let name = match name.to_str() {
                Some(name) => name,
                None => return reply.error(libc::EINVAL),
            };

            let (child, is_dir) = match query {
                None => {
                    if !frontend.mount.contains(name) {
                        return reply.error(libc::ENOENT);
                    }
                    (frontend.inodes.intern(NodeKind::SearchDir { query: name.to_string() }), true)
                }
                Some(query) => match crate::path::classify_entry(&query, name) {
                    crate::path::PathKind::ControlFile { direction, .. } => (
                        frontend.inodes.intern(NodeKind::ControlFile { query, direction }),
                        false,
                    ),
                    crate::path::PathKind::ResultFile { name: base, .. } => {
                        let result_set = match frontend.mount.get(&query) {
                            Some(result_set) => result_set,
                            None => return reply.error(libc::ENOENT),
                        };
                        if result_set.lookup(&base).await.is_none() {
                            return reply.error(libc::ENOENT);
                        }
                        (frontend.inodes.intern(NodeKind::ResultFile { query, name: base }), false)
                    }
                    _ => return reply.error(libc::ENOENT),
                },
            };

            match getattr::getattr(&frontend, child).await {
                Ok(attr) => {
                    let _ = is_dir;
                    reply.entry(&ENTRY_TTL, &attr, 0)
                }
                Err(err) => reply.error(err.to_errno()),
            }
        });
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let frontend = self.clone();
        self.spawn(async move {
            match getattr::getattr(&frontend, ino).await {
                Ok(attr) => reply.attr(&ATTR_TTL, &attr),
                Err(err) => reply.error(err.to_errno()),
            }
        });
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let frontend = self.clone();
        let name = name.to_os_string();
        self.spawn(async move {
            match mkdir::mkdir(&frontend, parent, &name).await {
                Ok(ino) => match getattr::getattr(&frontend, ino).await {
                    Ok(attr) => reply.entry(&ENTRY_TTL, &attr, 0),
                    Err(err) => reply.error(err.to_errno()),
                },
                Err(err) => reply.error(err.to_errno()),
            }
        });
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let frontend = self.clone();
        let name = name.to_os_string();
        self.spawn(async move {
            match rmdir::rmdir(&frontend, parent, &name).await {
                Ok(()) => reply.ok(),
                Err(err) => reply.error(err.to_errno()),
            }
        });
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let frontend = self.clone();
        let name = name.to_os_string();
        let newname = newname.to_os_string();
        self.spawn(async move {
            match rename::rename(&frontend, parent, &name, newparent, &newname).await {
                Ok(()) => reply.ok(),
                Err(err) => reply.error(err.to_errno()),
            }
        });
    }

    fn unlink(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        unlink::unlink();
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let frontend = self.clone();
        self.spawn(async move {
            match open::open(&frontend, ino, flags).await {
                Ok(fh) => reply.opened(fh, 0),
                Err(err) => reply.error(err.to_errno()),
            }
        });
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let frontend = self.clone();
        self.spawn(async move {
            match read::read(&frontend, fh, offset, size).await {
                Ok(bytes) => reply.data(&bytes),
                Err(err) => reply.error(err.to_errno()),
            }
        });
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let frontend = self.clone();
        self.spawn(async move {
            release::release(&frontend, fh).await;
            reply.ok();
        });
    }

    fn opendir(&mut self, _req: &Request<'_>, _ino: u64, _flags: i32, reply: ReplyOpen) {
        reply.opened(0, 0);
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let frontend = self.clone();
        self.spawn(async move {
            let mut entries = vec![
                (ino, FileType::Directory, ".".to_string()),
                (ROOT_INO, FileType::Directory, "..".to_string()),
            ];
            match readdir::readdir(&frontend, ino).await {
                Ok(children) => {
                    for child in children {
                        entries.push((child.ino, child.kind, child.name));
                    }
                }
                Err(err) => return reply.error(err.to_errno()),
            }

            for (index, (child_ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize)
            {
                if reply.add(child_ino, (index + 1) as i64, kind, &name) {
                    break;
                }
            }
            reply.ok();
        });
    }
}
