use std::path::Path;

use super::error::DownloadError;
use crate::http::HttpClient;

/// Manual download: HEAD probe for status and declared length, then a full
/// GET streamed to `path`.
///
/// With `verify_size` set and a declared length known, the written size must
/// match it. A mismatched file is left on disk.
pub async fn fetch_with_size_check(
    client: &dyn HttpClient,
    url: &str,
    referer: &str,
    path: &Path,
    verify_size: bool,
) -> Result<u64, DownloadError> {
    let (status, declared) = client.head_length(url, referer).await?;
    if status != 200 {
        return Err(DownloadError::HttpStatus {
            status,
            url: url.to_string(),
        });
    }

    let written = client.fetch_to_file(url, referer, path).await?;

    if verify_size && declared >= 0 {
        let actual = tokio::fs::metadata(path).await?.len();
        if actual != declared as u64 {
            return Err(DownloadError::SizeMismatch {
                path: path.display().to_string(),
                expected: declared,
                actual,
            });
        }
    }

    tracing::debug!(url, written, declared, "Fetched");
    Ok(written)
}
