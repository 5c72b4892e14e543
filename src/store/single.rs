//! Single-source ranged-fetch engine backing audio-only and video-only
//! [`super::StreamingStore`]s.

use std::ops::Range;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::RANGE;

use crate::error::{Result, YtfsError};

use super::cache::Cache;

/// Drives ranged HTTP fetches against one remote URL, coalescing
/// concurrent requests for overlapping byte ranges.
pub struct SingleEngine {
    url: String,
    client: reqwest::Client,
    read_ahead: u64,
    retry_limit: u32,
    retry_base_delay: Duration,
    /// Ranges currently being fetched; used to coalesce overlapping reads
    /// so at most one fetch is in flight per byte offset.
    in_flight: Mutex<Vec<Range<u64>>>,
}

impl SingleEngine {
    pub fn new(
        url: String,
        client: reqwest::Client,
        read_ahead: u64,
        retry_limit: u32,
        retry_base_delay: Duration,
    ) -> Self {
        Self { url, client, read_ahead, retry_limit, retry_base_delay, in_flight: Mutex::new(Vec::new()) }
    }

    /// Drives fetches until `[offset, offset+len)` (clipped to `filesize`)
    /// is fully covered by `cache`.
    pub async fn ensure_covered(&self, cache: &Cache, offset: u64, len: u64, filesize: u64) -> Result<()> {
        let clipped_end = offset.saturating_add(len).min(filesize);
        if offset >= clipped_end {
            return Ok(());
        }

        loop {
            let missing = cache.missing_within(offset, clipped_end - offset);
            let want = match missing.first() {
                Some(range) => range.clone(),
                None => return Ok(()),
            };

            let expanded_end = (want.end + self.read_ahead).min(filesize);

            let overlaps_in_flight = {
                let in_flight = self.in_flight.lock();
                in_flight.iter().any(|r| r.start < expanded_end && want.start < r.end)
            };
            if overlaps_in_flight {
                cache
                    .wait_until(|| {
                        let in_flight = self.in_flight.lock();
                        !in_flight.iter().any(|r| r.start < expanded_end && want.start < r.end)
                    })
                    .await;
                continue;
            }

            self.in_flight.lock().push(want.start..expanded_end);
            let result = self.fetch_with_retry(want.start, expanded_end).await;
            self.in_flight.lock().retain(|r| r.start != want.start || r.end != expanded_end);

            match result {
                Ok(bytes) => {
                    cache.insert(want.start, &bytes)?;
                    cache.wake_all();
                }
                Err(err) => {
                    cache.wake_all();
                    return Err(err);
                }
            }
        }
    }

    async fn fetch_with_retry(&self, start: u64, end: u64) -> Result<bytes::Bytes> {
        let mut delay = self.retry_base_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(start, end).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) if attempt < self.retry_limit => {
                    tracing::debug!(attempt, %start, %end, error = %err, "range fetch failed, retrying");
                    tokio::time::sleep(jittered(delay)).await;
                    delay *= 2;
                }
                Err(err) => {
                    tracing::warn!(attempt, %start, %end, error = %err, "range fetch exhausted retries");
                    return Err(err);
                }
            }
        }
    }

    async fn fetch_once(&self, start: u64, end: u64) -> Result<bytes::Bytes> {
        let range_header = format!("bytes={}-{}", start, end.saturating_sub(1));
        let response =
            self.client.get(&self.url).header(RANGE, range_header).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::PARTIAL_CONTENT && status != reqwest::StatusCode::OK {
            return Err(YtfsError::Io(format!("unexpected HTTP status {status} for range fetch")));
        }

        Ok(response.bytes().await?)
    }
}

/// Adds up to 20% random jitter to a backoff delay, so concurrent readers
/// hitting the same dead range don't retry in lockstep.
fn jittered(delay: Duration) -> Duration {
    use rand::Rng;
    let factor = rand::thread_rng().gen_range(1.0..1.2);
    delay.mul_f64(factor)
}
