use thiserror::Error;

use crate::crypto::DecryptError;
use crate::http::NetworkError;

/// Failure to turn an item reference into a direct link.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error("malformed API response from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("decryption failed: {0}")]
    Decrypt(#[from] DecryptError),

    #[error("no download link found for {0}")]
    NoDownloadLink(String),
}

impl ResolveError {
    pub(crate) fn fetch(url: &str, source: NetworkError) -> Self {
        Self::Fetch {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn json(url: &str, source: serde_json::Error) -> Self {
        Self::Json {
            url: url.to_string(),
            source,
        }
    }
}
