//! Album orchestration: fetch a page, resolve each item, filter, then export
//! or download one item at a time.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::download::{self, paths, DownloadEngine};
use crate::http::NetworkError;
use crate::site::{self, AlbumEntry, ResolveError, ResolvedItem};
use crate::state::{Ledger, StateError, UrlList};

/// Attempts per item when the caller does not choose.
pub const DEFAULT_RETRY_LIMIT: u32 = 10;
pub const MAX_RETRY_LIMIT: u32 = 50;

/// Successful downloads between checkpoint log lines.
const CHECKPOINT_INTERVAL: usize = 10;

#[derive(Debug, Error)]
pub enum AlbumError {
    #[error("Failed to fetch the album page {url}: {source}")]
    PageFetch {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error("No items found in {0}")]
    NoItemsFound(String),

    #[error("Download directory is not writable: {path}: {source}")]
    DirectoryNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ledger(#[from] StateError),
}

/// One album to process. Immutable once built.
#[derive(Debug, Clone)]
pub struct AlbumRequest {
    source_url: String,
    retry_limit: u32,
    extension_filter: BTreeSet<String>,
    destination_root: PathBuf,
    export_only: bool,
}

impl AlbumRequest {
    pub fn new(source_url: impl Into<String>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            retry_limit: DEFAULT_RETRY_LIMIT,
            extension_filter: BTreeSet::new(),
            destination_root: destination_root.into(),
            export_only: false,
        }
    }

    /// Clamped to `1..=MAX_RETRY_LIMIT`.
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit.clamp(1, MAX_RETRY_LIMIT);
        self
    }

    /// Lowercase extensions without the dot; empty allows everything.
    pub fn with_extension_filter(mut self, filter: BTreeSet<String>) -> Self {
        self.extension_filter = filter;
        self
    }

    pub fn with_export_only(mut self, export_only: bool) -> Self {
        self.export_only = export_only;
        self
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn extension_filter(&self) -> &BTreeSet<String> {
        &self.extension_filter
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    pub fn export_only(&self) -> bool {
        self.export_only
    }
}

/// Outcome of one album run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub album_name: String,
    pub downloaded: usize,
    pub failed: usize,
    pub destination: PathBuf,
    /// Stopped early by a shutdown signal.
    pub interrupted: bool,
}

/// Page URLs without a scheme are fetched over https.
fn with_scheme(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

pub struct AlbumDownloader {
    engine: DownloadEngine,
    no_progress_bar: bool,
    shutdown_token: CancellationToken,
}

impl AlbumDownloader {
    pub fn new(
        engine: DownloadEngine,
        no_progress_bar: bool,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            engine,
            no_progress_bar,
            shutdown_token,
        }
    }

    pub async fn run(&self, request: &AlbumRequest) -> Result<RunResult, AlbumError> {
        let started = Instant::now();
        let page_url = with_scheme(request.source_url());
        tracing::info!("Processing URL: {}", page_url);

        let album = site::load_album(self.engine.client(), &page_url)
            .await
            .map_err(|source| AlbumError::PageFetch {
                url: page_url.clone(),
                source,
            })?;
        if album.entries.is_empty() {
            return Err(AlbumError::NoItemsFound(page_url));
        }

        let destination = request
            .destination_root()
            .join(album.name.replace('\n', ""));
        tokio::fs::create_dir_all(&destination)
            .await
            .map_err(|source| AlbumError::DirectoryNotWritable {
                path: destination.clone(),
                source,
            })?;
        let ledger = Ledger::open(&destination).await.map_err(|e| match e {
            StateError::Io { path, source } => AlbumError::DirectoryNotWritable { path, source },
        })?;
        let url_list = UrlList::new(&destination);

        tracing::info!(
            "Found {} items in album \"{}\"",
            album.entries.len(),
            album.name
        );
        tracing::info!("Saving to: {}", destination.display());
        tracing::debug!(entries = ledger.entry_count(), "Ledger loaded");

        let pb = download::create_progress_bar(self.no_progress_bar, album.entries.len() as u64);
        let verify_size = album.layout.is_primary();
        let mut downloaded = 0usize;
        let mut failed = 0usize;
        let mut interrupted = false;
        let mut last_checkpoint = 0usize;

        for entry in album.entries {
            if self.shutdown_token.is_cancelled() {
                pb.suspend(|| tracing::info!("Shutdown requested, stopping before next item"));
                interrupted = true;
                break;
            }
            if downloaded > 0
                && downloaded % CHECKPOINT_INTERVAL == 0
                && downloaded != last_checkpoint
            {
                last_checkpoint = downloaded;
                tracing::debug!(downloaded, failed, "Checkpoint");
            }

            let item = match self.resolve_entry(album.layout, entry).await {
                Ok(item) => item,
                Err(e) => {
                    pb.suspend(|| tracing::warn!("Unable to find a download link: {}", e));
                    failed += 1;
                    pb.inc(1);
                    continue;
                }
            };
            pb.set_message(item.file_name.clone());

            if ledger.contains(&item.direct_url)
                || !paths::extension_allowed(request.extension_filter(), &item.extension)
            {
                tracing::debug!(url = %item.direct_url, "Skipping");
                pb.inc(1);
                continue;
            }

            if request.export_only() {
                url_list.append(&item.direct_url).await?;
                downloaded += 1;
                pb.inc(1);
                continue;
            }

            let dest = destination.join(&item.file_name);
            let result = self
                .engine
                .download(&item, &dest, &page_url, verify_size, request.retry_limit())
                .await;
            match result {
                Ok(report) => {
                    ledger.append(&item.direct_url).await?;
                    downloaded += 1;
                    pb.suspend(|| {
                        tracing::info!(
                            "Success! {} ({} bytes, using {})",
                            item.file_name,
                            report.size,
                            report.method
                        )
                    });
                }
                Err(e) => {
                    failed += 1;
                    pb.suspend(|| tracing::warn!("Failed: {}: {}", item.file_name, e));
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        let elapsed = download::format_duration(started.elapsed());
        if request.export_only() {
            tracing::info!("URL list exported to {}", url_list.path().display());
        } else {
            tracing::info!("── Summary ──");
            tracing::info!("  {} downloaded, {} failed in {}", downloaded, failed, elapsed);
            tracing::info!("  Files saved to: {}", destination.display());
        }

        Ok(RunResult {
            album_name: album.name,
            downloaded,
            failed,
            destination,
            interrupted,
        })
    }

    async fn resolve_entry(
        &self,
        layout: site::PageLayout,
        entry: AlbumEntry,
    ) -> Result<ResolvedItem, ResolveError> {
        match entry {
            AlbumEntry::Resolved(item) => Ok(item),
            AlbumEntry::Pending(item_ref) => layout.resolve(self.engine.client(), &item_ref).await,
        }
    }
}
