//! bunkrdl-rs: album downloader for Bunkr and Cyberdrop.
//!
//! Resolves an album or file page into direct media links (decrypting Bunkr's
//! time-keyed link envelopes), then downloads each file with a wget-first,
//! HTTP-fallback strategy, size verification and fixed-interval retries. A
//! per-directory ledger makes reruns skip completed files.

#![warn(clippy::all)]

mod album;
mod cli;
mod config;
mod crypto;
mod download;
mod http;
pub mod retry;
mod shutdown;
mod site;
mod state;
mod types;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use album::AlbumDownloader;
use download::external::ExternalDownloader;
use download::DownloadEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::debug!(?config, "Configuration");

    if config.batch {
        tracing::info!("Found {} URLs in file.", config.urls.len());
    }
    if config.urls.is_empty() {
        return Ok(());
    }

    let shutdown_token = shutdown::install_signal_handler();

    let external = if config.use_external_downloader {
        ExternalDownloader::detect().await
    } else {
        None
    };
    match &external {
        Some(tool) => tracing::debug!("Using external downloader: {}", tool.version()),
        None => tracing::debug!("External downloader unavailable, using HTTP only"),
    }

    let session = Arc::new(http::Session::new(config.timeout, config.insecure)?);
    let engine = DownloadEngine::new(session, external, config.retry_delay_secs);
    let downloader = AlbumDownloader::new(engine, config.no_progress_bar, shutdown_token.clone());

    for url in &config.urls {
        if shutdown_token.is_cancelled() {
            break;
        }
        let request = config.album_request(url);
        match downloader.run(&request).await {
            Ok(result) => {
                tracing::debug!(
                    album = %result.album_name,
                    downloaded = result.downloaded,
                    failed = result.failed,
                    "Album finished"
                );
                if result.interrupted {
                    break;
                }
            }
            // Album-level failures never stop the batch
            Err(e) => tracing::error!("{}", e),
        }
    }

    Ok(())
}
