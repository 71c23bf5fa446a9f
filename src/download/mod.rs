//! Download engine: fetches one resolved item to disk with tool fallback,
//! size verification and fixed-interval retries.
//!
//! Each attempt tries the external downloader first (it streams straight to
//! disk) and falls back to a manual HEAD + GET through the shared
//! [`HttpClient`]. The engine never touches the ledger; recording a success
//! is the caller's job.

pub mod error;
pub mod external;
pub mod file;
pub mod paths;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use self::error::DownloadError;
use self::external::ExternalDownloader;
use crate::http::HttpClient;
use crate::retry::{self, RetryAction, RetryConfig};
use crate::site::{bunkr, ResolvedItem};

/// Placeholder video served while the CDN is down.
pub const MAINTENANCE_MARKER: &str = "bnkr.b-cdn.net/maintenance.mp4";

/// How a successful download was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMethod {
    /// The destination already existed; nothing was fetched.
    AlreadyPresent,
    External,
    Manual,
}

impl std::fmt::Display for DownloadMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DownloadMethod::AlreadyPresent => "already present",
            DownloadMethod::External => "wget",
            DownloadMethod::Manual => "http",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    pub size: u64,
    pub method: DownloadMethod,
}

pub struct DownloadEngine {
    client: Arc<dyn HttpClient>,
    external: Option<ExternalDownloader>,
    retry_delay_secs: u64,
}

impl DownloadEngine {
    pub fn new(
        client: Arc<dyn HttpClient>,
        external: Option<ExternalDownloader>,
        retry_delay_secs: u64,
    ) -> Self {
        Self {
            client,
            external,
            retry_delay_secs,
        }
    }

    pub fn client(&self) -> &dyn HttpClient {
        self.client.as_ref()
    }

    /// Download `item` to `dest`, making up to `retry_limit` attempts.
    ///
    /// A destination that exists before the first attempt counts as done.
    /// `verify_size` enables the declared-length check on manual fetches.
    /// Disk errors end the loop at once instead of using the remaining
    /// attempts.
    pub async fn download(
        &self,
        item: &ResolvedItem,
        dest: &Path,
        referer: &str,
        verify_size: bool,
        retry_limit: u32,
    ) -> Result<DownloadReport, DownloadError> {
        if let Ok(meta) = tokio::fs::metadata(dest).await {
            tracing::debug!(path = %dest.display(), "File already exists, skipped download");
            return Ok(DownloadReport {
                size: meta.len(),
                method: DownloadMethod::AlreadyPresent,
            });
        }

        let config = RetryConfig::new(retry_limit, self.retry_delay_secs);
        let max_attempts = config.max_attempts;
        retry::retry_with_backoff(
            &config,
            |e: &DownloadError| {
                if e.is_retryable() {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
            |attempt| async move {
                tracing::info!(
                    "Downloading {} (try {}/{})... {}",
                    item.file_name,
                    attempt,
                    max_attempts,
                    item.direct_url
                );
                self.attempt(item, dest, referer, verify_size).await
            },
        )
        .await
    }

    async fn attempt(
        &self,
        item: &ResolvedItem,
        dest: &Path,
        referer: &str,
        verify_size: bool,
    ) -> Result<DownloadReport, DownloadError> {
        let url = item.direct_url.as_str();
        let referer = if referer.is_empty() {
            bunkr::DEFAULT_REFERER
        } else {
            referer
        };
        if url.contains(MAINTENANCE_MARKER) {
            return Err(DownloadError::Maintenance(url.to_string()));
        }

        if let Some(external) = &self.external {
            match external.fetch(url, referer, dest).await {
                Ok(size) => {
                    return Ok(DownloadReport {
                        size,
                        method: DownloadMethod::External,
                    })
                }
                Err(e) => {
                    tracing::debug!("{}, falling back to HTTP", e);
                    // Whatever the failed run left behind is incomplete.
                    if tokio::fs::metadata(dest).await.is_ok() {
                        tokio::fs::remove_file(dest).await?;
                    }
                }
            }
        }

        let size =
            file::fetch_with_size_check(self.client.as_ref(), url, referer, dest, verify_size)
                .await?;
        Ok(DownloadReport {
            size,
            method: DownloadMethod::Manual,
        })
    }
}

/// Create a progress bar with a consistent template.
///
/// Returns `ProgressBar::hidden()` when the user passed `--no-progress-bar` or
/// stdout is not a TTY.
pub(crate) fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .expect("valid template")
        .progress_chars("=> "),
    );
    pb
}

pub(crate) fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
