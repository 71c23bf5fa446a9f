use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::album::{AlbumRequest, MAX_RETRY_LIMIT};
use crate::types::LogLevel;

const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Either --url or --file is required")]
    MissingSource,

    #[error("Invalid URL provided: {0}")]
    InvalidUrl(String),

    #[error("File not found: {path}: {source}")]
    InputFileNotFound {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Albums to process in order; more than one only with `--file`.
    pub urls: Vec<String>,
    pub destination_root: PathBuf,
    pub extension_filter: BTreeSet<String>,
    pub timeout: Duration,
    pub retry_delay_secs: u64,
    pub retries: u32,
    pub log_level: LogLevel,
    pub batch: bool,
    pub export_only: bool,
    pub use_external_downloader: bool,
    pub insecure: bool,
    pub no_progress_bar: bool,
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Trim, default the scheme to https, and accept only http(s) URLs with a
/// host.
pub(crate) fn sanitize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = url::Url::parse(&candidate).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return None;
    }
    Some(parsed.into())
}

/// `".MP4, jpg,,png"` → `{"jpg", "mp4", "png"}`
pub(crate) fn parse_extensions(raw: &str) -> BTreeSet<String> {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ',')
        .collect::<String>()
        .split(',')
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Directory holding the running executable.
fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Destination root for downloads. A custom path is accepted only when it
/// exists and lies under `base`; anything else falls back to
/// `<base>/downloads`.
pub(crate) fn resolve_destination_root(custom: Option<&str>, base: &Path) -> PathBuf {
    let base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let default = base.join(DEFAULT_DOWNLOAD_DIR);

    let Some(custom) = custom.map(str::trim).filter(|c| !c.is_empty()) else {
        return default;
    };
    match expand_tilde(custom).canonicalize() {
        Ok(resolved) if resolved.starts_with(&base) => resolved,
        Ok(resolved) => {
            tracing::warn!(
                "Custom path {} is outside {}, using {}",
                resolved.display(),
                base.display(),
                default.display()
            );
            default
        }
        Err(e) => {
            tracing::warn!(
                "Custom path {} is not usable ({}), using {}",
                custom,
                e,
                default.display()
            );
            default
        }
    }
}

/// Album URLs from a newline-delimited file. Blank and invalid lines are
/// dropped.
pub(crate) fn read_url_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| ConfigError::InputFileNotFound {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(content.lines().filter_map(sanitize_url).collect())
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> Result<Self, ConfigError> {
        let (urls, batch) = match (&cli.url, &cli.file) {
            (Some(url), _) => {
                let url =
                    sanitize_url(url).ok_or_else(|| ConfigError::InvalidUrl(url.to_string()))?;
                (vec![url], false)
            }
            (None, Some(file)) => (read_url_list(&expand_tilde(file))?, true),
            (None, None) => return Err(ConfigError::MissingSource),
        };

        let base = cli
            .base_dir
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(executable_dir);
        let destination_root = resolve_destination_root(cli.path.as_deref(), &base);

        Ok(Self {
            urls,
            destination_root,
            extension_filter: cli
                .extensions
                .as_deref()
                .map(parse_extensions)
                .unwrap_or_default(),
            timeout: Duration::from_secs(cli.timeout),
            retry_delay_secs: cli.retry_delay,
            retries: cli.retries.clamp(1, MAX_RETRY_LIMIT),
            log_level: cli.log_level,
            batch,
            export_only: cli.export_only,
            use_external_downloader: !cli.no_external_downloader,
            insecure: cli.insecure,
            no_progress_bar: cli.no_progress_bar,
        })
    }

    pub fn album_request(&self, url: &str) -> AlbumRequest {
        AlbumRequest::new(url, &self.destination_root)
            .with_retry_limit(self.retries)
            .with_extension_filter(self.extension_filter.clone())
            .with_export_only(self.export_only)
    }
}
