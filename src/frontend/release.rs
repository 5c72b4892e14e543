//! `release` — frees a file handle, unregistering it from its store if
//! store-bound.

use crate::handles::HandleBinding;

use super::Frontend;

pub(crate) async fn release(frontend: &Frontend, fh: u64) {
    if let Some(HandleBinding::Store(store)) = frontend.handles.lookup(fh) {
        store.unregister_handle();
    }
    frontend.handles.release(fh);
}
