//! Byte-addressed cache backing a [`super::StreamingStore`]: a seekable
//! spooled temp file plus the [`IntervalSet`] recording which byte ranges
//! are currently valid.

use std::io;
use std::os::unix::fs::FileExt;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::interval_set::IntervalSet;

/// Cache storage plus bookkeeping. Fetches happen with no lock held; only
/// the interval-set/handle-set bookkeeping is ever held under `intervals`.
pub struct Cache {
    file: Mutex<std::fs::File>,
    intervals: Mutex<IntervalSet>,
    /// Signalled every time `intervals` changes, standing in for an
    /// "interval set changed" condition variable.
    changed: Notify,
}

impl Cache {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            file: Mutex::new(tempfile::tempfile()?),
            intervals: Mutex::new(IntervalSet::new()),
            changed: Notify::new(),
        })
    }

    /// Writes `data` at `offset`, marks the range downloaded, and wakes any
    /// readers waiting on coverage changes.
    pub fn insert(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        {
            let file = self.file.lock();
            file.write_at(data, offset)?;
        }
        {
            let mut intervals = self.intervals.lock();
            intervals.mark(offset, offset + data.len() as u64);
        }
        self.changed.notify_waiters();
        Ok(())
    }

    /// Reads exactly `len` bytes starting at `offset`. Caller must have
    /// already ensured `[offset, offset+len)` is covered.
    pub fn read(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let file = self.file.lock();
        file.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }

    /// Sub-ranges of `[offset, offset+len)` not yet covered.
    pub fn missing_within(&self, offset: u64, len: u64) -> Vec<std::ops::Range<u64>> {
        self.intervals.lock().missing_within(offset, offset + len)
    }

    pub fn covers(&self, offset: u64, len: u64) -> bool {
        self.intervals.lock().covers(offset, offset + len)
    }

    /// Blocks until `condition` returns true, re-evaluating it each time the
    /// interval set changes. Arms the notification (via `enable()`) before
    /// the first check so a `wake_all()` fired between the check and the
    /// wait is never missed: `Notify::notify_waiters` does not store a
    /// permit the way `notify_one` does, so a naive check-then-await could
    /// otherwise block forever on a notification that already happened.
    pub async fn wait_until(&self, mut condition: impl FnMut() -> bool) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if condition() {
                return;
            }
            notified.await;
        }
    }

    /// Wakes anyone waiting in [`Self::wait_until`] without changing
    /// coverage — used to unblock readers when a fetch fails or the store
    /// is cleaned up.
    pub fn wake_all(&self) {
        self.changed.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn insert_then_read_round_trips() {
        let cache = Cache::new().unwrap();
        cache.insert(10, b"hello").unwrap();
        assert!(cache.covers(10, 5));
        assert_eq!(cache.read(10, 5).unwrap(), b"hello");
    }

    #[test]
    fn missing_within_reports_uncovered_ranges() {
        let cache = Cache::new().unwrap();
        cache.insert(0, b"abc").unwrap();
        let missing = cache.missing_within(0, 10);
        assert_eq!(missing, vec![3..10]);
    }

    #[tokio::test]
    async fn wait_until_does_not_miss_a_wake_fired_before_the_await() {
        let cache = Arc::new(Cache::new().unwrap());
        // Arms the notification, then yields so the writer below runs and
        // calls wake_all() before this task ever reaches its `.await`.
        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache.wait_until(|| cache.covers(0, 5)).await;
            })
        };
        tokio::task::yield_now().await;
        cache.insert(0, b"hello").unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("wait_until should observe the write and return")
            .unwrap();
    }
}
