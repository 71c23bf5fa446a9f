//! Streaming download through an external `wget` process.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use super::error::DownloadError;
use crate::http::DEFAULT_USER_AGENT;

const WGET: &str = "wget";

/// A probed external downloader. Only constructed through [`detect`], so
/// holding one means the program answered `--version` at start-up.
///
/// [`detect`]: ExternalDownloader::detect
#[derive(Debug, Clone)]
pub struct ExternalDownloader {
    program: OsString,
    version: String,
}

impl ExternalDownloader {
    /// Probe `wget` on `PATH`.
    pub async fn detect() -> Option<Self> {
        Self::detect_program(WGET).await
    }

    pub(crate) async fn detect_program(program: impl Into<OsString>) -> Option<Self> {
        let program = program.into();
        let output = Command::new(&program)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let version = text.lines().next()?.trim().to_string();
        if version.is_empty() {
            return None;
        }
        Some(Self { program, version })
    }

    /// First line of `--version` output.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn args(url: &str, referer: &str, path: &Path) -> Vec<OsString> {
        vec![
            "--quiet".into(),
            "--no-check-certificate".into(),
            format!("--user-agent={DEFAULT_USER_AGENT}").into(),
            format!("--referer={referer}").into(),
            url.into(),
            "-O".into(),
            path.as_os_str().to_owned(),
        ]
    }

    /// Download `url` into `path`. Succeeds only when the process exits
    /// cleanly and left a non-empty file; returns the file size.
    pub async fn fetch(&self, url: &str, referer: &str, path: &Path) -> Result<u64, DownloadError> {
        tracing::debug!("{} {} -> {}", self.program.to_string_lossy(), url, path.display());
        let status = Command::new(&self.program)
            .args(Self::args(url, referer, path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| DownloadError::ExternalTool(format!("failed to spawn: {e}")))?;

        if !status.success() {
            return Err(DownloadError::ExternalTool(format!("exited with {status}")));
        }
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => Ok(meta.len()),
            Ok(_) => Err(DownloadError::ExternalTool("produced an empty file".into())),
            Err(e) => Err(DownloadError::ExternalTool(format!("no output file: {e}"))),
        }
    }
}
