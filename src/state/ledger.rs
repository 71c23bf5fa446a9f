use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::StateError;

pub const LEDGER_FILE_NAME: &str = "already_downloaded.txt";
pub const URL_LIST_FILE_NAME: &str = "url_list.txt";

/// Append `line` plus a newline to `path`, creating the file if needed.
async fn append_line(path: &Path, line: &str) -> Result<(), StateError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StateError::io(path, e))?;
    file.write_all(format!("{line}\n").as_bytes())
        .await
        .map_err(|e| StateError::io(path, e))?;
    file.flush().await.map_err(|e| StateError::io(path, e))
}

/// Durable set of direct URLs already downloaded into one directory.
///
/// The in-memory set is a snapshot taken at [`Ledger::open`]; appends go to
/// disk only, so an item repeated within one album is downloaded again and a
/// second line is recorded.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: HashSet<String>,
}

impl Ledger {
    /// Open (creating if absent) the ledger in `dir`. Opening for append
    /// doubles as the writability check for the directory.
    pub async fn open(dir: &Path) -> Result<Self, StateError> {
        let path = dir.join(LEDGER_FILE_NAME);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StateError::io(&path, e))?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| StateError::io(&path, e))?;
        let entries: HashSet<String> = content
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self { path, entries })
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains(url)
    }

    /// Record a completed download.
    pub async fn append(&self, url: &str) -> Result<(), StateError> {
        append_line(&self.path, url).await
    }

    /// Entries loaded at open time.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Export-only output: every direct URL, one per line, appended.
#[derive(Debug, Clone)]
pub struct UrlList {
    path: PathBuf,
}

impl UrlList {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(URL_LIST_FILE_NAME),
        }
    }

    pub async fn append(&self, url: &str) -> Result<(), StateError> {
        append_line(&self.path, url).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
