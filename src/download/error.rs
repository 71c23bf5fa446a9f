use thiserror::Error;

use crate::http::NetworkError;

/// Typed download errors enabling retry classification.
///
/// Every remote failure is worth another attempt; only local disk errors
/// abort the retry loop early.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Size mismatch for {path}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: String,
        expected: i64,
        actual: u64,
    },

    #[error("Server is under maintenance: {0}")]
    Maintenance(String),

    #[error(transparent)]
    Network(NetworkError),

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error("External downloader failed: {0}")]
    ExternalTool(String),
}

impl From<NetworkError> for DownloadError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::Io(io) => DownloadError::Disk(io),
            NetworkError::Status { status, url } => DownloadError::HttpStatus { status, url },
            other => DownloadError::Network(other),
        }
    }
}

impl DownloadError {
    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DownloadError::Disk(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_retryable() {
        for status in [403, 404, 429, 500, 503] {
            let e = DownloadError::HttpStatus {
                status,
                url: "x".into(),
            };
            assert!(e.is_retryable(), "status {status}");
        }
    }

    #[test]
    fn test_size_mismatch_retryable() {
        let e = DownloadError::SizeMismatch {
            path: "x".into(),
            expected: 10,
            actual: 4,
        };
        assert!(e.is_retryable());
    }

    #[test]
    fn test_maintenance_retryable() {
        assert!(DownloadError::Maintenance("x".into()).is_retryable());
    }

    #[test]
    fn test_external_tool_retryable() {
        assert!(DownloadError::ExternalTool("exit 4".into()).is_retryable());
    }

    #[test]
    fn test_disk_not_retryable() {
        let e = DownloadError::Disk(std::io::Error::other("disk full"));
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_network_io_maps_to_disk() {
        let e: DownloadError = NetworkError::Io(std::io::Error::other("read-only")).into();
        assert!(matches!(e, DownloadError::Disk(_)));
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_network_status_maps_to_http_status() {
        let e: DownloadError = NetworkError::Status {
            status: 502,
            url: "u".into(),
        }
        .into();
        assert!(matches!(e, DownloadError::HttpStatus { status: 502, .. }));
    }

    #[test]
    fn test_empty_body_is_network() {
        let e: DownloadError = NetworkError::EmptyBody("u".into()).into();
        assert!(matches!(e, DownloadError::Network(_)));
        assert!(e.is_retryable());
    }
}
