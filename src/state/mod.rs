//! Per-directory run state.
//!
//! Each album directory carries two plain-text files:
//! - `already_downloaded.txt`: the ledger of direct URLs that completed, one
//!   per line. A rerun skips everything listed here.
//! - `url_list.txt`: direct URLs written in export-only mode.

pub mod error;
pub mod ledger;

pub use error::StateError;
pub use ledger::{Ledger, UrlList, LEDGER_FILE_NAME, URL_LIST_FILE_NAME};
