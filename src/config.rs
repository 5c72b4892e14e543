//! Mount-time configuration: CLI flags merged over an optional TOML file
//! merged over built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::resolver::MediaMode;

/// Default read-ahead window applied to single-source range fetches.
pub const DEFAULT_READ_AHEAD_BYTES: u64 = 512 * 1024;
/// Default maximum fetch attempts before a range fetch surfaces as I/O error.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;
/// Default base delay for the retry backoff (doubles each attempt).
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(200);
/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Fully resolved runtime configuration for a mount.
#[derive(Debug, Clone)]
pub struct Config {
    pub mountpoint: PathBuf,
    pub media_mode: MediaMode,
    pub search_base_url: String,
    pub read_ahead_bytes: u64,
    pub retry_limit: u32,
    pub retry_base_delay: Duration,
    pub http_timeout: Duration,
    pub muxer_path: PathBuf,
}

/// On-disk TOML shape; every field optional so a partial file only
/// overrides what it mentions.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub search_base_url: Option<String>,
    pub read_ahead_bytes: Option<u64>,
    pub retry_limit: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub http_timeout_secs: Option<u64>,
    pub muxer_path: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

impl Config {
    pub fn from_parts(
        mountpoint: PathBuf,
        media_mode: MediaMode,
        search_base_url: String,
        file: Option<FileConfig>,
        overrides: ConfigOverrides,
    ) -> Self {
        let file = file.unwrap_or_default();
        Config {
            mountpoint,
            media_mode,
            search_base_url: overrides
                .search_base_url
                .or(file.search_base_url)
                .unwrap_or(search_base_url),
            read_ahead_bytes: overrides
                .read_ahead_bytes
                .or(file.read_ahead_bytes)
                .unwrap_or(DEFAULT_READ_AHEAD_BYTES),
            retry_limit: overrides.retry_limit.or(file.retry_limit).unwrap_or(DEFAULT_RETRY_LIMIT),
            retry_base_delay: overrides
                .retry_base_delay_ms
                .or(file.retry_base_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RETRY_BASE_DELAY),
            http_timeout: overrides
                .http_timeout_secs
                .or(file.http_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT),
            muxer_path: overrides
                .muxer_path
                .or(file.muxer_path)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
        }
    }
}

/// CLI-sourced overrides, each left `None` when the flag wasn't given.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub search_base_url: Option<String>,
    pub read_ahead_bytes: Option<u64>,
    pub retry_limit: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub http_timeout_secs: Option<u64>,
    pub muxer_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_overrides() {
        let cfg = Config::from_parts(
            PathBuf::from("/mnt"),
            MediaMode::AudioOnly,
            "https://example.test".to_string(),
            None,
            ConfigOverrides::default(),
        );
        assert_eq!(cfg.read_ahead_bytes, DEFAULT_READ_AHEAD_BYTES);
        assert_eq!(cfg.retry_limit, DEFAULT_RETRY_LIMIT);
        assert_eq!(cfg.muxer_path, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn cli_overrides_beat_file_config() {
        let file = FileConfig { read_ahead_bytes: Some(1024), ..Default::default() };
        let overrides = ConfigOverrides { read_ahead_bytes: Some(2048), ..Default::default() };
        let cfg = Config::from_parts(
            PathBuf::from("/mnt"),
            MediaMode::AudioOnly,
            "https://example.test".to_string(),
            Some(file),
            overrides,
        );
        assert_eq!(cfg.read_ahead_bytes, 2048);
    }

    #[test]
    fn file_config_overrides_defaults_when_no_cli_flag() {
        let file = FileConfig { retry_limit: Some(7), ..Default::default() };
        let cfg = Config::from_parts(
            PathBuf::from("/mnt"),
            MediaMode::AudioOnly,
            "https://example.test".to_string(),
            Some(file),
            ConfigOverrides::default(),
        );
        assert_eq!(cfg.retry_limit, 7);
    }
}
