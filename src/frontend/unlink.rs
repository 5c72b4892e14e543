//! `unlink` — always succeeds without doing anything, so that recursive
//! directory removal from userspace (`rm -r`) works. Individual result
//! files are never independently deletable.

pub(crate) fn unlink() {}
