//! Muxed-mode engine: feeds two remote sources through an external muxer
//! subprocess via named FIFOs, tailing its output into the shared cache.

use std::ffi::CString;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Result, YtfsError};

use super::cache::Cache;

/// Handles needed to cancel an in-flight mux pipeline: the child's pid
/// (killed directly, since `Child::kill` is only reachable from whichever
/// task owns the `Child` value) and the supervisor/feeder tasks' abort
/// handles.
#[derive(Default)]
struct Cancellation {
    child_pid: Option<u32>,
    task_handles: Vec<tokio::task::AbortHandle>,
}

/// Drives the two-source mux pipeline for one [`super::StreamingStore`].
/// The pipeline is started at most once, on first demand; subsequent
/// callers wait on the same in-flight mux.
pub struct MuxedEngine {
    audio_url: String,
    video_url: String,
    client: reqwest::Client,
    muxer_path: PathBuf,
    retry_limit: u32,
    retry_base_delay: Duration,
    cache: Arc<Cache>,
    filesize: Arc<AtomicU64>,
    /// Set once the muxer has exited and the final drain has run, whether
    /// it succeeded or failed. Until then `filesize` is only the bitrate
    /// hint from the resolver, not the real length of the muxed output.
    finished: Arc<AtomicBool>,
    started: tokio::sync::Mutex<bool>,
    failure: Arc<Mutex<Option<String>>>,
    cancellation: Arc<Mutex<Cancellation>>,
}

impl MuxedEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        audio_url: String,
        video_url: String,
        client: reqwest::Client,
        muxer_path: PathBuf,
        retry_limit: u32,
        retry_base_delay: Duration,
        cache: Arc<Cache>,
        filesize: Arc<AtomicU64>,
    ) -> Self {
        Self {
            audio_url,
            video_url,
            client,
            muxer_path,
            retry_limit,
            retry_base_delay,
            cache,
            filesize,
            finished: Arc::new(AtomicBool::new(false)),
            started: tokio::sync::Mutex::new(false),
            failure: Arc::new(Mutex::new(None)),
            cancellation: Arc::new(Mutex::new(Cancellation::default())),
        }
    }

    /// Terminates the muxer subprocess and cancels the feeder/tailer tasks
    /// for an in-flight pipeline, then wakes any reader blocked on
    /// `ensure_covered` so it observes the failure immediately. A no-op if
    /// the pipeline was never started.
    pub async fn shutdown(&self) {
        let cancellation = std::mem::take(&mut *self.cancellation.lock());
        for handle in &cancellation.task_handles {
            handle.abort();
        }
        if let Some(pid) = cancellation.child_pid {
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGKILL);
            }
        }
        if cancellation.child_pid.is_some() || !cancellation.task_handles.is_empty() {
            let mut failure = self.failure.lock();
            if failure.is_none() {
                *failure = Some("store closed".to_string());
            }
        }
        self.finished.store(true, Ordering::Release);
        self.cache.wake_all();
    }

    /// Starts the mux pipeline on first call, then blocks until enough
    /// bytes to satisfy `[offset, offset+want)` have been muxed, or the
    /// pipeline finishes and the real output turns out shorter, or the
    /// pipeline fails.
    ///
    /// `filesize` is only the bitrate hint until the pipeline finishes, so
    /// an `offset` past it does not mean EOF while muxing is still running:
    /// this waits for more muxer output rather than trusting the hint,
    /// recomputing the true available length only once [`Self::finished`]
    /// is set. Returns the number of bytes actually available to read,
    /// which is less than `want` only once real EOF is known.
    pub async fn ensure_covered(&self, offset: u64, want: u64) -> Result<u64> {
        self.start_once().await?;

        loop {
            if let Some(reason) = self.failure.lock().clone() {
                return Err(YtfsError::Io(reason));
            }

            let finished = self.finished.load(Ordering::Acquire);
            let target = if finished {
                let filesize = self.filesize.load(Ordering::Acquire);
                if offset >= filesize {
                    return Ok(0);
                }
                want.min(filesize - offset)
            } else {
                want
            };

            if self.cache.covers(offset, target) {
                return Ok(target);
            }

            self.cache
                .wait_until(|| {
                    self.failure.lock().is_some()
                        || self.finished.load(Ordering::Acquire)
                        || self.cache.covers(offset, target)
                })
                .await;
        }
    }

    async fn start_once(&self) -> Result<()> {
        let mut started = self.started.lock().await;
        if *started {
            return Ok(());
        }
        *started = true;
        drop(started);

        let workdir = tempfile::Builder::new()
            .prefix("ytfs-mux-")
            .tempdir()
            .map_err(|err| YtfsError::Io(err.to_string()))?;

        let audio_fifo = workdir.path().join("audio.fifo");
        let video_fifo = workdir.path().join("video.fifo");
        let output_path = workdir.path().join("out");

        make_fifo(&audio_fifo)?;
        make_fifo(&video_fifo)?;
        // The muxer creates/truncates this path itself; it only needs to exist
        // as a path the tailer can watch for growth.
        std::fs::File::create(&output_path)?;

        let mut child = Command::new(&self.muxer_path)
            .arg(&audio_fifo)
            .arg(&video_fifo)
            .arg(&output_path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|err| YtfsError::Io(format!("failed to spawn muxer: {err}")))?;
        let child_pid = child.id();

        let stderr = child.stderr.take();
        if let Some(mut stderr) = stderr {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = tokio::io::AsyncReadExt::read_to_end(&mut stderr, &mut buf).await;
                if !buf.is_empty() {
                    tracing::debug!(output = %String::from_utf8_lossy(&buf), "muxer stderr");
                }
            });
        }

        let audio_feeder = spawn_feeder(
            self.client.clone(),
            self.audio_url.clone(),
            audio_fifo.clone(),
            self.retry_limit,
            self.retry_base_delay,
        );
        let video_feeder = spawn_feeder(
            self.client.clone(),
            self.video_url.clone(),
            video_fifo.clone(),
            self.retry_limit,
            self.retry_base_delay,
        );

        let cache = Arc::clone(&self.cache);
        let filesize = Arc::clone(&self.filesize);
        let finished = Arc::clone(&self.finished);
        let failure = Arc::clone(&self.failure);
        let output_for_tailer = output_path.clone();

        let mut abort_handles = vec![audio_feeder.abort_handle(), video_feeder.abort_handle()];

        let supervisor = tokio::spawn(async move {
            // Keep the FIFOs and output file alive on disk for the whole
            // pipeline lifetime; dropped (and removed) when this task ends.
            let _workdir = workdir;

            let tailer_handle =
                tokio::spawn(tail_into_cache(output_for_tailer.clone(), Arc::clone(&cache)));

            let status = child.wait().await;
            let audio_result = audio_feeder.await;
            let video_result = video_feeder.await;
            tailer_handle.abort();

            let mut failed = None;
            match status {
                Ok(status) if !status.success() => {
                    failed = Some(format!("muxer exited with {status}"));
                }
                Err(err) => failed = Some(format!("muxer wait failed: {err}")),
                _ => {}
            }
            if let Err(err) = audio_result.unwrap_or(Ok(())) {
                failed.get_or_insert_with(|| format!("audio feeder failed: {err}"));
            }
            if let Err(err) = video_result.unwrap_or(Ok(())) {
                failed.get_or_insert_with(|| format!("video feeder failed: {err}"));
            }

            // Final drain in case the muxer wrote its last bytes after the
            // tailer observed its last poll.
            if let Ok(final_len) = drain_new_bytes(&output_for_tailer, &cache).await {
                if failed.is_none() {
                    filesize.store(final_len, Ordering::Release);
                    tracing::debug!(final_len, "mux pipeline finished, real size known");
                }
            }

            if let Some(reason) = &failed {
                tracing::warn!(error = %reason, "mux pipeline failed");
                *failure.lock() = Some(reason.clone());
            }
            // Order matters: the real size (or failure) must be visible
            // before `finished` is, so a waiter that wakes on `finished`
            // never reads a stale hint.
            finished.store(true, Ordering::Release);
            cache.wake_all();
        });

        abort_handles.push(supervisor.abort_handle());
        *self.cancellation.lock() = Cancellation { child_pid, task_handles: abort_handles };

        Ok(())
    }
}

fn make_fifo(path: &Path) -> Result<()> {
    let c_path = CString::new(path.as_os_str().as_encoded_bytes())
        .map_err(|_| YtfsError::Io("fifo path contains NUL byte".to_string()))?;
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    if rc != 0 {
        return Err(YtfsError::Io(std::io::Error::last_os_error().to_string()));
    }
    Ok(())
}

fn spawn_feeder(
    client: reqwest::Client,
    url: String,
    fifo_path: PathBuf,
    retry_limit: u32,
    retry_base_delay: Duration,
) -> tokio::task::JoinHandle<std::result::Result<(), YtfsError>> {
    tokio::spawn(async move {
        let mut delay = retry_base_delay;
        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => break response,
                Ok(response) => {
                    let err = YtfsError::Io(format!("unexpected HTTP status {}", response.status()));
                    if attempt >= retry_limit {
                        return Err(err);
                    }
                }
                Err(err) if attempt < retry_limit => {
                    tracing::debug!(%url, attempt, %err, "feeder fetch failed, retrying");
                }
                Err(err) => return Err(YtfsError::from(err)),
            }
            tokio::time::sleep(jittered(delay)).await;
            delay *= 2;
        };

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&fifo_path)
            .await
            .map_err(YtfsError::from)?;

        let mut stream = response.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(YtfsError::from)?;
            file.write_all(&chunk).await.map_err(YtfsError::from)?;
        }
        file.flush().await.map_err(YtfsError::from)?;
        Ok(())
    })
}

/// Polls `output_path` for growth and copies newly written bytes into
/// `cache`. Runs until the caller aborts its `JoinHandle`.
async fn tail_into_cache(output_path: PathBuf, cache: Arc<Cache>) {
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    loop {
        interval.tick().await;
        let _ = drain_new_bytes(&output_path, &cache).await;
    }
}

/// Reads any bytes appended to `output_path` since the last drain and
/// inserts them into `cache`. Returns the file's current length.
async fn drain_new_bytes(output_path: &Path, cache: &Cache) -> std::io::Result<u64> {
    let path = output_path.to_path_buf();
    // Coverage starts at 0 for the mux output, so the first gap's start is
    // exactly how many bytes have already been drained.
    let drained_so_far = cache
        .missing_within(0, u64::MAX)
        .first()
        .map(|r| r.start)
        .unwrap_or(u64::MAX);

    let (len, new_bytes) = tokio::task::spawn_blocking(move || -> std::io::Result<(u64, Vec<u8>)> {
        let file = std::fs::File::open(&path)?;
        let len = file.metadata()?.len();
        if drained_so_far == u64::MAX || drained_so_far >= len {
            return Ok((len, Vec::new()));
        }
        let mut buf = vec![0u8; (len - drained_so_far) as usize];
        file.read_at(&mut buf, drained_so_far)?;
        Ok((len, buf))
    })
    .await
    .map_err(|err| std::io::Error::other(err.to_string()))??;

    if !new_bytes.is_empty() {
        cache.insert(drained_so_far, &new_bytes)?;
    }
    Ok(len)
}

/// Adds up to 20% random jitter to a backoff delay, so concurrent feeders
/// hitting the same flaky upstream don't retry in lockstep.
fn jittered(delay: Duration) -> Duration {
    use rand::Rng;
    let factor = rand::thread_rng().gen_range(1.0..1.2);
    delay.mul_f64(factor)
}
