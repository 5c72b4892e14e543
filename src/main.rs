//! ytfs — mounts a remote video search service as a FUSE filesystem.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ytfs::cli::Cli;
use ytfs::config::{Config, ConfigOverrides, FileConfig};
use ytfs::frontend::Frontend;
use ytfs::mount::Mount;
use ytfs::resolver::HttpMediaResolver;
use ytfs::resultset::HttpSearchBackend;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => match FileConfig::load(path) {
            Ok(file_config) => Some(file_config),
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to load config file");
                return ExitCode::from(2);
            }
        },
        None => None,
    };

    let search_base_url = match cli.search_base_url.clone().or_else(|| {
        file_config.as_ref().and_then(|file_config| file_config.search_base_url.clone())
    }) {
        Some(url) => url,
        None => {
            tracing::error!("--search-base-url is required (directly or via --config)");
            return ExitCode::from(2);
        }
    };

    let config = Config::from_parts(
        cli.mountpoint.clone(),
        cli.media_mode(),
        search_base_url,
        file_config,
        ConfigOverrides {
            search_base_url: cli.search_base_url.clone(),
            read_ahead_bytes: cli.read_ahead,
            retry_limit: cli.retry_limit,
            retry_base_delay_ms: None,
            http_timeout_secs: None,
            muxer_path: cli.muxer_path.clone(),
        },
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start async runtime");
            return ExitCode::from(2);
        }
    };

    let client = match reqwest::Client::builder().timeout(config.http_timeout).build() {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "failed to build HTTP client");
            return ExitCode::from(2);
        }
    };

    let config = Arc::new(config);
    let backend = Arc::new(HttpSearchBackend::new(client.clone(), config.search_base_url.clone()));
    let resolver = Arc::new(HttpMediaResolver::new(client.clone(), config.search_base_url.clone()));
    let mount = Arc::new(Mount::new(backend, resolver, client, Arc::clone(&config)));

    let frontend = Frontend::new(mount, runtime.handle().clone());

    let mount_options = [
        fuser::MountOption::RO,
        fuser::MountOption::FSName("ytfs".to_string()),
        fuser::MountOption::AutoUnmount,
    ];

    tracing::info!(mountpoint = %config.mountpoint.display(), mode = ?config.media_mode, "mounting");
    match fuser::mount2(frontend, &config.mountpoint, &mount_options) {
        Ok(()) => {
            tracing::info!("unmounted cleanly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "mount failed");
            ExitCode::from(2)
        }
    }
}
