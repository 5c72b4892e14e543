//! `read` — serves result-file bytes from the store, or triggers
//! pagination and returns the fixed payload for a control file.

use crate::error::{Result, YtfsError};
use crate::handles::HandleBinding;
use crate::resultset::PageDirection;

use super::Frontend;

/// Fixed payload every control file reads as, regardless of offset.
pub(crate) const CONTROL_PAYLOAD: &[u8] = b"#!/bin/sh\n";

pub(crate) async fn read(frontend: &Frontend, fh: u64, offset: i64, size: u32) -> Result<Vec<u8>> {
    let binding = frontend.handles.lookup(fh).ok_or(YtfsError::BadHandle)?;
    let offset = u64::try_from(offset).map_err(|_| YtfsError::InvalidArgument)?;

    match binding {
        HandleBinding::Store(store) => store.read(offset, size).await,
        HandleBinding::Control { query, direction } => {
            let result_set = frontend.mount.get(&query).ok_or(YtfsError::NotFound)?;
            result_set.page(PageDirection::from(direction)).await?;

            let start = (offset as usize).min(CONTROL_PAYLOAD.len());
            let end = start.saturating_add(size as usize).min(CONTROL_PAYLOAD.len());
            Ok(CONTROL_PAYLOAD[start..end].to_vec())
        }
    }
}
