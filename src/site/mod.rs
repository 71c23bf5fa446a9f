//! Page classification, album parsing and per-item link resolution.
//!
//! Two page layouts are supported and each gets its own strategy module:
//! Bunkr ([`bunkr`]) and Cyberdrop ([`cyberdrop`]). The layout is decided
//! once from the page `<title>`; everything after that dispatches through
//! [`PageLayout`].

pub mod bunkr;
pub mod cyberdrop;
pub mod error;

use chrono::Local;
use scraper::{Html, Selector};

use crate::download::paths;
use crate::http::{HttpClient, NetworkError};

pub use error::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// Bunkr: per-item pages that need an API call and decryption.
    Bunkr,
    /// Cyberdrop: per-item JSON API with plain direct links.
    Cyberdrop,
}

impl PageLayout {
    /// Classify a parsed document by its `<title>`.
    fn classify(doc: &Html) -> Self {
        let title = Selector::parse("title").expect("valid selector");
        let is_bunkr = doc
            .select(&title)
            .next()
            .map(|t| t.text().collect::<String>().contains(bunkr::TITLE_MARKER))
            .unwrap_or(false);
        if is_bunkr {
            PageLayout::Bunkr
        } else {
            PageLayout::Cyberdrop
        }
    }

    /// Only the primary site declares reliable content lengths, so only its
    /// downloads are size-checked.
    pub fn is_primary(self) -> bool {
        self == PageLayout::Bunkr
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageLayout::Bunkr => "bunkr",
            PageLayout::Cyberdrop => "cyberdrop",
        }
    }

    /// Turn an item reference into a direct download link.
    pub async fn resolve(
        self,
        client: &dyn HttpClient,
        item: &ItemRef,
    ) -> Result<ResolvedItem, ResolveError> {
        match self {
            PageLayout::Bunkr => bunkr::resolve(client, item).await,
            PageLayout::Cyberdrop => cyberdrop::resolve(client, item).await,
        }
    }
}

/// One media entry of an album before its direct URL is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub raw_url: String,
    pub declared_name: Option<String>,
    /// `-1` when unknown.
    pub declared_size: i64,
}

impl ItemRef {
    pub fn new(raw_url: impl Into<String>) -> Self {
        Self {
            raw_url: raw_url.into(),
            declared_name: None,
            declared_size: -1,
        }
    }
}

/// A direct link plus the local file name and extension derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub direct_url: String,
    pub file_name: String,
    /// Without the leading dot, as it appears in the URL.
    pub extension: String,
    pub declared_size: i64,
}

impl ResolvedItem {
    pub fn new(direct_url: String, declared_name: Option<&str>, declared_size: i64) -> Self {
        let (_, extension) = paths::url_file_parts(&direct_url);
        let file_name = paths::item_file_name(&direct_url, declared_name);
        Self {
            direct_url,
            file_name,
            extension,
            declared_size,
        }
    }
}

/// Result of parsing an album or file page.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub layout: PageLayout,
    pub album_name: String,
    pub items: Vec<ItemRef>,
    /// The page itself is a single-file page; `items` holds just the page URL.
    pub direct: bool,
}

/// Parse page markup. Pure: no network access.
pub fn parse_page(html: &[u8], page_url: &str) -> ParsedPage {
    let doc = Html::parse_document(&String::from_utf8_lossy(html));
    let layout = PageLayout::classify(&doc);

    match layout {
        PageLayout::Bunkr => {
            let direct = bunkr::is_direct_item_page(&doc);
            let album_name = bunkr::album_name(&doc, direct);
            let items = if direct {
                vec![ItemRef::new(page_url)]
            } else {
                bunkr::item_refs(&doc)
            };
            ParsedPage {
                layout,
                album_name,
                items,
                direct,
            }
        }
        PageLayout::Cyberdrop => ParsedPage {
            layout,
            album_name: cyberdrop::album_name(&doc),
            items: cyberdrop::item_refs(&doc),
            direct: false,
        },
    }
}

/// Album entry: either already resolved (direct file pages) or still a
/// reference that needs [`PageLayout::resolve`].
#[derive(Debug, Clone)]
pub enum AlbumEntry {
    Resolved(ResolvedItem),
    Pending(ItemRef),
}

#[derive(Debug, Clone)]
pub struct Album {
    pub layout: PageLayout,
    pub name: String,
    pub entries: Vec<AlbumEntry>,
}

/// Fetch and parse a page. A single-file page is resolved right away, while
/// its timestamped envelope is fresh; if that fails the album comes back
/// empty.
pub async fn load_album(client: &dyn HttpClient, page_url: &str) -> Result<Album, NetworkError> {
    let html = client.get_text(page_url, &[], None).await?;
    let page = parse_page(&html, page_url);
    tracing::debug!(
        layout = page.layout.as_str(),
        direct = page.direct,
        items = page.items.len(),
        "Parsed page"
    );

    let entries = if page.direct {
        let mut entries = Vec::with_capacity(1);
        for item in &page.items {
            match page.layout.resolve(client, item).await {
                Ok(resolved) => entries.push(AlbumEntry::Resolved(resolved)),
                Err(e) => tracing::warn!("Failed to get download URL for direct link: {}", e),
            }
        }
        entries
    } else {
        page.items.into_iter().map(AlbumEntry::Pending).collect()
    };

    Ok(Album {
        layout: page.layout,
        name: page.album_name,
        entries,
    })
}

/// `<prefix>_<local timestamp>`, used when a page has no usable title.
pub(crate) fn generated_name(prefix: &str) -> String {
    format!("{}_{}", prefix, Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// Text of the first element matching `selector`, trimmed and stripped of
/// characters that cannot appear in a directory name. Blank, `.` and `..`
/// headings count as missing.
pub(crate) fn heading_text(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = doc.select(&selector).next()?;
    let text = element.text().collect::<String>();
    let name = paths::remove_illegal_chars(text.trim());
    if paths::is_unsafe_component(&name) {
        None
    } else {
        Some(name)
    }
}

/// Prefix site-relative links with `base`; absolute links pass through.
pub(crate) fn absolute_url(base: &str, url: &str) -> String {
    if url.contains("https://") || url.contains("http://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}
