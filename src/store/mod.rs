//! StreamingStore — caches and serves one result's media bytes over a
//! state machine `new -> resolving -> ready{single|muxed} -> closed`.

pub mod cache;
pub mod interval_set;
mod muxed;
mod single;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cache::Cache;
use muxed::MuxedEngine;
use single::SingleEngine;

use crate::config::Config;
use crate::error::{Result, YtfsError};
use crate::resolver::{MediaMode, MediaResolver, ResolvedMedia};

/// Cheap, cloneable reference to a store; this is what `FileHandleTable`
/// binds a file handle to.
pub type StreamingStoreHandle = Arc<StreamingStore>;

enum Engine {
    Single(SingleEngine),
    Muxed(MuxedEngine),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    New,
    Resolving,
    Ready,
    Closed,
}

/// Backs one query-result's file: resolves the remote media URL(s) on
/// first access, then streams/caches bytes for every subsequent read.
pub struct StreamingStore {
    item_id: String,
    mode: MediaMode,
    resolver: Arc<dyn MediaResolver>,
    client: reqwest::Client,
    muxer_path: PathBuf,
    read_ahead_bytes: u64,
    retry_limit: u32,
    retry_base_delay: std::time::Duration,

    cache: Arc<Cache>,
    filesize: Arc<AtomicU64>,
    state: tokio::sync::Mutex<State>,
    /// Wrapped in an `Arc` so `read` only holds `engine`'s lock long enough
    /// to clone the handle, never across the fetch itself. Without this,
    /// concurrent reads on the same store would serialize on this lock
    /// instead of coalescing inside the engine's own per-range tracking.
    engine: tokio::sync::Mutex<Option<Arc<Engine>>>,
    open_handles: parking_lot::Mutex<u64>,
}

impl StreamingStore {
    pub fn new(
        item_id: String,
        mode: MediaMode,
        resolver: Arc<dyn MediaResolver>,
        client: reqwest::Client,
        config: &Config,
    ) -> Result<StreamingStoreHandle> {
        Ok(Arc::new(Self {
            item_id,
            mode,
            resolver,
            client,
            muxer_path: config.muxer_path.clone(),
            read_ahead_bytes: config.read_ahead_bytes,
            retry_limit: config.retry_limit,
            retry_base_delay: config.retry_base_delay,
            cache: Arc::new(Cache::new()?),
            filesize: Arc::new(AtomicU64::new(0)),
            state: tokio::sync::Mutex::new(State::New),
            engine: tokio::sync::Mutex::new(None),
            open_handles: parking_lot::Mutex::new(0),
        }))
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn mode(&self) -> MediaMode {
        self.mode
    }

    /// Registers a newly allocated file handle against this store.
    pub fn register_handle(&self) {
        *self.open_handles.lock() += 1;
    }

    /// Releases a file handle. Returns the number of handles still open.
    pub fn unregister_handle(&self) -> u64 {
        let mut count = self.open_handles.lock();
        *count = count.saturating_sub(1);
        *count
    }

    pub fn open_handle_count(&self) -> u64 {
        *self.open_handles.lock()
    }

    /// The last published size without blocking or triggering resolution —
    /// `0` if the store has never been opened yet. Used by `getattr`, which
    /// must not perform network I/O.
    pub fn cached_filesize(&self) -> u64 {
        self.filesize.load(Ordering::Acquire)
    }

    /// Resolves the remote media on first call; a no-op afterwards. Returns
    /// the file's current authoritative or hinted size.
    pub async fn obtain_info(&self) -> Result<u64> {
        self.ensure_resolved().await?;
        Ok(self.filesize.load(Ordering::Acquire))
    }

    pub async fn filesize(&self) -> Result<u64> {
        self.obtain_info().await
    }

    async fn ensure_resolved(&self) -> Result<()> {
        {
            let state = self.state.lock().await;
            match *state {
                State::Ready => return Ok(()),
                State::Closed => return Err(YtfsError::BadHandle),
                _ => {}
            }
        }

        let mut state = self.state.lock().await;
        if *state == State::Ready {
            return Ok(());
        }
        if *state == State::Closed {
            return Err(YtfsError::BadHandle);
        }
        tracing::debug!(item_id = %self.item_id, mode = ?self.mode, "new -> resolving");
        *state = State::Resolving;

        let resolved = match self.resolver.resolve(&self.item_id, self.mode).await {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::debug!(item_id = %self.item_id, error = %err, "resolving -> new (resolver failed)");
                *state = State::New;
                return Err(err);
            }
        };

        self.filesize.store(resolved.content_length_hint, Ordering::Release);

        let engine = match self.build_engine(&resolved) {
            Ok(engine) => engine,
            Err(err) => {
                tracing::debug!(item_id = %self.item_id, error = %err, "resolving -> new (engine build failed)");
                *state = State::New;
                return Err(err);
            }
        };
        *self.engine.lock().await = Some(Arc::new(engine));
        *state = State::Ready;
        tracing::debug!(item_id = %self.item_id, "resolving -> ready");
        Ok(())
    }

    fn build_engine(&self, resolved: &ResolvedMedia) -> Result<Engine> {
        match self.mode {
            MediaMode::AudioOnly | MediaMode::VideoOnly => {
                let source = resolved.sources.first().ok_or(YtfsError::ItemUnavailable)?;
                Ok(Engine::Single(SingleEngine::new(
                    source.url.clone(),
                    self.client.clone(),
                    self.read_ahead_bytes,
                    self.retry_limit,
                    self.retry_base_delay,
                )))
            }
            MediaMode::Muxed => {
                let audio = resolved.sources.first().ok_or(YtfsError::ItemUnavailable)?;
                let video = resolved.sources.get(1).ok_or(YtfsError::ItemUnavailable)?;
                Ok(Engine::Muxed(MuxedEngine::new(
                    audio.url.clone(),
                    video.url.clone(),
                    self.client.clone(),
                    self.muxer_path.clone(),
                    self.retry_limit,
                    self.retry_base_delay,
                    Arc::clone(&self.cache),
                    Arc::clone(&self.filesize),
                )))
            }
        }
    }

    /// Serves up to `len` bytes starting at `offset`, fetching/muxing and
    /// caching as needed. Returns fewer than `len` bytes only at EOF.
    pub async fn read(&self, offset: u64, len: u32) -> Result<Vec<u8>> {
        self.ensure_resolved().await?;

        // Clone the `Arc<Engine>` out and drop the lock immediately: the
        // fetch itself must not hold any store-level lock, so concurrent
        // readers of the same store reach the engine's own (per-range)
        // coordination instead of queuing behind each other here.
        let engine = self.engine.lock().await.clone().ok_or(YtfsError::BadHandle)?;
        let want = match engine.as_ref() {
            Engine::Single(engine) => {
                // `filesize` here is the resolver's real `Content-Length`,
                // so it is an authoritative EOF boundary from the start.
                let filesize = self.filesize.load(Ordering::Acquire);
                if offset >= filesize {
                    return Ok(Vec::new());
                }
                let want = (len as u64).min(filesize - offset);
                engine.ensure_covered(&self.cache, offset, want, filesize).await?;
                want
            }
            Engine::Muxed(engine) => {
                // `filesize` is only the bitrate hint until the pipeline
                // finishes, so it must not be treated as EOF here; the
                // engine itself waits for real coverage or completion and
                // reports back how much is actually available.
                let available = engine.ensure_covered(offset, len as u64).await?;
                if available == 0 {
                    return Ok(Vec::new());
                }
                available
            }
        };

        Ok(self.cache.read(offset, want as usize)?)
    }

    /// Tears the store down: no further reads should be issued afterward.
    /// Idempotent. Terminates any child muxer and cancels in-flight mux
    /// feeder/tailer tasks before releasing the engine.
    pub async fn cleanup(&self) {
        let mut state = self.state.lock().await;
        tracing::debug!(item_id = %self.item_id, prev = ?*state, "-> closed");
        *state = State::Closed;
        drop(state);
        if let Some(Engine::Muxed(engine)) = self.engine.lock().await.as_deref() {
            engine.shutdown().await;
        }
        self.engine.lock().await.take();
        self.cache.wake_all();
    }
}
