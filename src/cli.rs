use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "bunkrdl-rs",
    version,
    about = "Download Bunkr and Cyberdrop albums",
    after_help = "Either --url or --file is required."
)]
pub struct Cli {
    /// Album or file page URL
    #[arg(short = 'u', long, conflicts_with = "file")]
    pub url: Option<String>,

    /// File with one album URL per line
    #[arg(short = 'f', long)]
    pub file: Option<String>,

    /// Download attempts per file (1-50)
    #[arg(short = 'r', long, default_value_t = 2)]
    pub retries: u32,

    /// Only download these extensions (comma separated, e.g. mp4,jpg)
    #[arg(short = 'e', long)]
    pub extensions: Option<String>,

    /// Destination root; must lie under the base directory
    #[arg(short = 'p', long)]
    pub path: Option<String>,

    /// Permitted root for --path [default: directory of the executable]
    #[arg(long)]
    pub base_dir: Option<String>,

    /// Write direct URLs to url_list.txt instead of downloading
    #[arg(short = 'w', long)]
    pub export_only: bool,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = 2)]
    pub retry_delay: u64,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Never use wget, even when it is installed
    #[arg(long)]
    pub no_external_downloader: bool,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}
