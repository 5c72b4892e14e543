//! MediaResolver — the only component permitted to talk to the remote
//! service. Resolves an item identifier plus a requested [`MediaMode`] into
//! fetchable stream URLs, duration, and a size hint.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Result, YtfsError};

/// Which stream(s) a [`crate::store::StreamingStore`] was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaMode {
    AudioOnly,
    VideoOnly,
    Muxed,
}

impl MediaMode {
    /// The extension `readdir` decorates display names with.
    pub fn extension(self) -> &'static str {
        match self {
            MediaMode::AudioOnly => ".m4a",
            MediaMode::VideoOnly => ".webm",
            MediaMode::Muxed => ".mp4",
        }
    }
}

/// A single resolvable remote stream.
#[derive(Debug, Clone)]
pub struct StreamSource {
    pub url: String,
    pub content_length_hint: Option<u64>,
    pub bitrate_bps: Option<u64>,
}

/// Result of resolving one item for one mode.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    /// One URL for audio-only/video-only; two for muxed (audio, then video).
    pub sources: Vec<StreamSource>,
    pub duration_seconds: f64,
    /// Authoritative remote `Content-Length` for single-source modes;
    /// `audioBitrate * duration + videoBitrate * duration` for muxed mode
    /// until the real trailer arrives.
    pub content_length_hint: u64,
}

/// The only component permitted to talk to the remote search/media service.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resolves `item_id` for `mode`. Transient network errors should be
    /// returned as [`YtfsError::Io`] (retryable by the caller); permanent
    /// failures as [`YtfsError::ItemUnavailable`] or
    /// [`YtfsError::ParseError`] (not retried).
    async fn resolve(&self, item_id: &str, mode: MediaMode) -> Result<ResolvedMedia>;
}

/// Minimal shape of the remote search backend's per-item response. The
/// actual search API is an external collaborator; this struct is the
/// subset of its JSON response this crate depends on.
#[derive(Debug, Deserialize)]
struct BackendStream {
    url: String,
    content_length: Option<u64>,
    bitrate_bps: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BackendMediaResponse {
    duration_seconds: f64,
    audio: Option<BackendStream>,
    video: Option<BackendStream>,
}

/// HTTP-backed default [`MediaResolver`]. Talks to a `search_base_url` that
/// serves `GET {base}/items/{id}/media?mode={audio|video|muxed}` and
/// returns a [`BackendMediaResponse`]-shaped JSON body.
pub struct HttpMediaResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMediaResolver {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn mode_param(mode: MediaMode) -> &'static str {
        match mode {
            MediaMode::AudioOnly => "audio",
            MediaMode::VideoOnly => "video",
            MediaMode::Muxed => "muxed",
        }
    }
}

#[async_trait]
impl MediaResolver for HttpMediaResolver {
    async fn resolve(&self, item_id: &str, mode: MediaMode) -> Result<ResolvedMedia> {
        let url = format!(
            "{}/items/{}/media?mode={}",
            self.base_url.trim_end_matches('/'),
            item_id,
            Self::mode_param(mode)
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(YtfsError::ItemUnavailable);
        }
        if !response.status().is_success() {
            return Err(YtfsError::Io(format!("resolver HTTP {}", response.status())));
        }

        let body: BackendMediaResponse =
            response.json().await.map_err(|err| YtfsError::ParseError(err.to_string()))?;

        let duration = body.duration_seconds;
        let to_source = |stream: BackendStream| StreamSource {
            url: stream.url,
            content_length_hint: stream.content_length,
            bitrate_bps: stream.bitrate_bps,
        };

        match mode {
            MediaMode::AudioOnly => {
                let audio = body.audio.ok_or(YtfsError::ItemUnavailable)?;
                let hint = audio.content_length.unwrap_or(0);
                Ok(ResolvedMedia {
                    sources: vec![to_source(audio)],
                    duration_seconds: duration,
                    content_length_hint: hint,
                })
            }
            MediaMode::VideoOnly => {
                let video = body.video.ok_or(YtfsError::ItemUnavailable)?;
                let hint = video.content_length.unwrap_or(0);
                Ok(ResolvedMedia {
                    sources: vec![to_source(video)],
                    duration_seconds: duration,
                    content_length_hint: hint,
                })
            }
            MediaMode::Muxed => {
                let audio = body.audio.ok_or(YtfsError::ItemUnavailable)?;
                let video = body.video.ok_or(YtfsError::ItemUnavailable)?;
                let audio_bps = audio.bitrate_bps.unwrap_or(0) as f64;
                let video_bps = video.bitrate_bps.unwrap_or(0) as f64;
                let hint = ((audio_bps * duration + video_bps * duration) / 8.0) as u64;
                Ok(ResolvedMedia {
                    sources: vec![to_source(audio), to_source(video)],
                    duration_seconds: duration,
                    content_length_hint: hint,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_extensions_are_distinct() {
        assert_eq!(MediaMode::AudioOnly.extension(), ".m4a");
        assert_eq!(MediaMode::VideoOnly.extension(), ".webm");
        assert_eq!(MediaMode::Muxed.extension(), ".mp4");
    }
}
