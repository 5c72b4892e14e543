//! FileHandleTable — allocates the lowest unused non-negative integer
//! handle and binds it to a [`HandleBinding`].

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::path::ControlDirection;
use crate::store::StreamingStoreHandle;

/// What a file handle is bound to.
#[derive(Clone)]
pub enum HandleBinding {
    /// A result file: reads are delegated to the store.
    Store(StreamingStoreHandle),
    /// A control file: reads trigger pagination on the named query.
    Control { query: String, direction: ControlDirection },
}

/// Allocates and releases integer file handles.
///
/// `allocate`/`release` are atomic with respect to each other: both take
/// the same lock for their whole body.
pub struct FileHandleTable {
    inner: Mutex<Inner>,
}

struct Inner {
    bindings: Vec<Option<HandleBinding>>,
    free: BTreeSet<u64>,
}

impl Default for FileHandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHandleTable {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { bindings: Vec::new(), free: BTreeSet::new() }) }
    }

    /// Allocates the smallest non-negative integer not currently in use and
    /// binds it to `binding`.
    pub fn allocate(&self, binding: HandleBinding) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&id) = inner.free.iter().next() {
            inner.free.remove(&id);
            inner.bindings[id as usize] = Some(binding);
            return id;
        }
        let id = inner.bindings.len() as u64;
        inner.bindings.push(Some(binding));
        id
    }

    /// Looks up the binding for `id`, if any.
    pub fn lookup(&self, id: u64) -> Option<HandleBinding> {
        let inner = self.inner.lock().unwrap();
        inner.bindings.get(id as usize).and_then(Clone::clone)
    }

    /// Frees `id`, making it available for reuse by a future `allocate`.
    pub fn release(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.bindings.get_mut(id as usize) {
            if slot.take().is_some() {
                inner.free.insert(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ControlDirection;

    fn control(query: &str) -> HandleBinding {
        HandleBinding::Control { query: query.to_string(), direction: ControlDirection::Next }
    }

    #[test]
    fn allocates_lowest_free_id() {
        let table = FileHandleTable::new();
        let a = table.allocate(control("a"));
        let b = table.allocate(control("b"));
        assert_eq!(a, 0);
        assert_eq!(b, 1);

        table.release(a);
        let c = table.allocate(control("c"));
        assert_eq!(c, 0);

        let d = table.allocate(control("d"));
        assert_eq!(d, 2);
        let _ = b;
        let _ = d;
    }

    #[test]
    fn release_then_lookup_is_absent() {
        let table = FileHandleTable::new();
        let id = table.allocate(control("a"));
        table.release(id);
        assert!(table.lookup(id).is_none());
    }

    #[test]
    fn lookup_unknown_handle_is_absent() {
        let table = FileHandleTable::new();
        assert!(table.lookup(42).is_none());
    }
}
