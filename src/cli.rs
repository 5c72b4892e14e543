//! Command-line surface.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::resolver::MediaMode;

#[derive(Debug, Parser)]
#[command(name = "ytfs", version, about = "Mount a remote video search service as a filesystem")]
#[command(group(ArgGroup::new("mode").args(["audio_only", "video_only", "both"])))]
pub struct Cli {
    /// Directory to mount the filesystem at.
    pub mountpoint: PathBuf,

    /// Expose only the audio stream of each result (default).
    #[arg(short = 'a', long = "audio-only")]
    pub audio_only: bool,

    /// Expose only the video stream of each result.
    #[arg(short = 'v', long = "video-only")]
    pub video_only: bool,

    /// Mux audio and video together for each result.
    #[arg(long = "both")]
    pub both: bool,

    /// Base URL of the remote search/media service.
    #[arg(long = "search-base-url")]
    pub search_base_url: Option<String>,

    /// Path to a TOML config file, merged under CLI flags.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Read-ahead window, in bytes, for single-source range fetches.
    #[arg(long = "read-ahead")]
    pub read_ahead: Option<u64>,

    /// Maximum fetch attempts before a range fetch surfaces as an I/O error.
    #[arg(long = "retry-limit")]
    pub retry_limit: Option<u32>,

    /// Path to the external muxer binary used in `--both` mode.
    #[arg(long = "muxer-path")]
    pub muxer_path: Option<PathBuf>,
}

impl Cli {
    /// Resolves the mutually exclusive mode flags into a [`MediaMode`],
    /// defaulting to audio-only when none are given.
    pub fn media_mode(&self) -> MediaMode {
        if self.video_only {
            MediaMode::VideoOnly
        } else if self.both {
            MediaMode::Muxed
        } else {
            MediaMode::AudioOnly
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_audio_only() {
        let cli = Cli::parse_from(["ytfs", "/mnt"]);
        assert_eq!(cli.media_mode(), MediaMode::AudioOnly);
    }

    #[test]
    fn both_selects_muxed_mode() {
        let cli = Cli::parse_from(["ytfs", "/mnt", "--both"]);
        assert_eq!(cli.media_mode(), MediaMode::Muxed);
    }

    #[test]
    fn mode_flags_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["ytfs", "/mnt", "--audio-only", "--video-only"]);
        assert!(result.is_err());
    }
}
