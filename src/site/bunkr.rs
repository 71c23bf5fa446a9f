//! Bunkr pages: album grids, single-file pages and the `/api/vs` link
//! envelope.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::json;

use super::{generated_name, heading_text, ItemRef, ResolveError, ResolvedItem};
use crate::crypto::{self, EncryptionEnvelope};
use crate::http::HttpClient;

pub const BASE_URL: &str = "https://bunkr.sk";
pub const DEFAULT_REFERER: &str = "https://bunkr.sk/";
pub const ENCRYPTION_API_URL: &str = "https://bunkr.cr/api/vs";
pub(crate) const TITLE_MARKER: &str = "| Bunkr";

static DOWNLOAD_BUTTON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a[^>]*href="([^"]*)"[^>]*class="[^"]*btn-main[^"]*"[^>]*>Download</a>"#)
        .expect("valid download button pattern")
});

static DOWNLOAD_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a[^>]*href="([^"]*)"[^>]*download"#).expect("valid download anchor pattern")
});

/// A page with a video or image viewer is a single-file page, not an album.
pub(crate) fn is_direct_item_page(doc: &Html) -> bool {
    let viewer = Selector::parse(r#"span[class*="ic-videos"], div[class*="lightgallery"]"#)
        .expect("valid viewer selector");
    doc.select(&viewer).next().is_some()
}

pub(crate) fn album_name(doc: &Html, direct: bool) -> String {
    let selector = if direct {
        r#"h1[class*="text-[20px]"], h1[class*="truncate"]"#
    } else {
        r#"h1[class*="truncate"]"#
    };
    heading_text(doc, selector).unwrap_or_else(|| {
        generated_name(if direct {
            "bunkr_download"
        } else {
            "bunkr_album"
        })
    })
}

/// Item links from an album grid. Hrefs are kept as found; relative ones are
/// made absolute at resolution time.
pub(crate) fn item_refs(doc: &Html) -> Vec<ItemRef> {
    let anchors = Selector::parse(r#"a[class*="after:absolute"]"#).expect("valid item selector");
    doc.select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(ItemRef::new)
        .collect()
}

/// Prefix site-relative links with [`BASE_URL`].
pub fn absolute_url(url: &str) -> String {
    super::absolute_url(BASE_URL, url)
}

/// Everything after the first `/f/`, if any.
pub fn slug_from_url(url: &str) -> Option<&str> {
    url.find("/f/")
        .map(|idx| &url[idx + 3..])
        .filter(|slug| !slug.is_empty())
}

/// Direct link from page markup, for pages the API cannot serve.
pub fn link_from_markup(html: &str) -> Option<String> {
    DOWNLOAD_BUTTON_RE
        .captures(html)
        .or_else(|| DOWNLOAD_ATTR_RE.captures(html))
        .map(|caps| caps[1].to_string())
}

async fn link_from_api(client: &dyn HttpClient, slug: &str) -> Result<String, ResolveError> {
    let body = client
        .post_json(ENCRYPTION_API_URL, &json!({ "slug": slug }))
        .await
        .map_err(|e| ResolveError::fetch(ENCRYPTION_API_URL, e))?;
    let envelope: EncryptionEnvelope =
        serde_json::from_slice(&body).map_err(|e| ResolveError::json(ENCRYPTION_API_URL, e))?;
    Ok(crypto::decrypt(&envelope)?)
}

/// Resolve a Bunkr item page: the encrypted API link first, then the
/// download anchors in the page itself.
pub async fn resolve(
    client: &dyn HttpClient,
    item: &ItemRef,
) -> Result<ResolvedItem, ResolveError> {
    let page_url = absolute_url(&item.raw_url);
    let html = client
        .get_text(&page_url, &[], None)
        .await
        .map_err(|e| ResolveError::fetch(&page_url, e))?;

    let mut api_error = None;
    if let Some(slug) = slug_from_url(&page_url) {
        match link_from_api(client, slug).await {
            Ok(url) if !url.is_empty() => {
                return Ok(ResolvedItem::new(url, None, -1));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(slug, "Encrypted link unavailable: {}", e);
                api_error = Some(e);
            }
        }
    }

    let html = String::from_utf8_lossy(&html);
    if let Some(url) = link_from_markup(&html) {
        return Ok(ResolvedItem::new(url, None, -1));
    }

    Err(match api_error {
        Some(e @ ResolveError::Decrypt(_)) => e,
        _ => ResolveError::NoDownloadLink(page_url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeClient;
    use crate::site::{parse_page, PageLayout};

    const TS: i64 = 1_700_000_000;

    fn envelope_json(url: &str) -> serde_json::Value {
        let envelope = crypto::encrypt(url, TS);
        json!({ "url": envelope.url, "timestamp": TS })
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url("/f/abc"), "https://bunkr.sk/f/abc");
        assert_eq!(absolute_url("f/abc"), "https://bunkr.sk/f/abc");
        assert_eq!(absolute_url("https://bunkr.cr/f/abc"), "https://bunkr.cr/f/abc");
    }

    #[test]
    fn test_slug_from_url() {
        assert_eq!(slug_from_url("https://bunkr.sk/f/AbC-123"), Some("AbC-123"));
        assert_eq!(slug_from_url("https://bunkr.sk/f/a/f/b"), Some("a/f/b"));
        assert_eq!(slug_from_url("https://bunkr.sk/v/abc"), None);
        assert_eq!(slug_from_url("https://bunkr.sk/f/"), None);
    }

    #[test]
    fn test_link_from_markup_prefers_download_button() {
        let html = r#"<a href="https://cdn.test/other.jpg" download>x</a>
            <a href="https://cdn.test/main.jpg" class="btn btn-main">Download</a>"#;
        assert_eq!(
            link_from_markup(html).as_deref(),
            Some("https://cdn.test/main.jpg")
        );
    }

    #[test]
    fn test_link_from_markup_download_attribute() {
        let html = r#"<p><a href="https://cdn.test/file.zip" download="file.zip">Get</a></p>"#;
        assert_eq!(
            link_from_markup(html).as_deref(),
            Some("https://cdn.test/file.zip")
        );
        assert_eq!(link_from_markup("<a href=\"/x\">plain</a>"), None);
    }

    #[test]
    fn test_parse_album_page() {
        let html = br#"<html><head><title>Trip | Bunkr</title></head><body>
            <h1 class="text-2xl truncate">  Trip: Day/Night  </h1>
            <div class="grid">
              <a class="after:absolute after:inset-0" href="/f/one">1</a>
              <a class="after:absolute after:inset-0" href="https://bunkr.cr/f/two">2</a>
              <a class="after:absolute" href="">empty</a>
              <a class="plain" href="/f/ignored">3</a>
            </div></body></html>"#;
        let page = parse_page(html, "https://bunkr.cr/a/trip");
        assert_eq!(page.layout, PageLayout::Bunkr);
        assert!(!page.direct);
        assert_eq!(page.album_name, "Trip- Day-Night");
        let urls: Vec<_> = page.items.iter().map(|i| i.raw_url.as_str()).collect();
        assert_eq!(urls, vec!["/f/one", "https://bunkr.cr/f/two"]);
        assert!(page.items.iter().all(|i| i.declared_size == -1));
    }

    #[test]
    fn test_parse_album_without_heading_gets_generated_name() {
        let html = br#"<html><head><title>x | Bunkr</title></head><body>
            <a class="after:absolute" href="/f/one">1</a></body></html>"#;
        let page = parse_page(html, "https://bunkr.cr/a/x");
        assert!(page.album_name.starts_with("bunkr_album_"));
    }

    #[test]
    fn test_parse_direct_page() {
        let html = br#"<html><head><title>clip.mp4 | Bunkr</title></head><body>
            <span class="ic-videos"></span></body></html>"#;
        let page = parse_page(html, "https://bunkr.cr/f/clip");
        assert!(page.direct);
        assert!(page.album_name.starts_with("bunkr_download_"));
        assert_eq!(page.items, vec![ItemRef::new("https://bunkr.cr/f/clip")]);
    }

    #[tokio::test]
    async fn test_resolve_via_encrypted_api() {
        let client = FakeClient::new()
            .with_page("https://bunkr.sk/f/xyz", "<html>item page</html>")
            .with_post(
                ENCRYPTION_API_URL,
                json!({ "slug": "xyz" }),
                envelope_json("https://media.test/files/Photo 1.JPG"),
            );

        let item = resolve(&client, &ItemRef::new("/f/xyz")).await.unwrap();
        assert_eq!(item.direct_url, "https://media.test/files/Photo 1.JPG");
        assert_eq!(item.file_name, "Photo_1.JPG");
        assert_eq!(item.extension, "JPG");
        assert_eq!(item.declared_size, -1);
        assert_eq!(client.count("POST "), 1);
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_markup() {
        let page = r#"<html><body>
            <a href="https://cdn.test/fallback.png" class="btn btn-main">Download</a>
            </body></html>"#;
        // No POST scripted: the API answers 404.
        let client = FakeClient::new().with_page("https://bunkr.sk/f/abc", page);

        let item = resolve(&client, &ItemRef::new("https://bunkr.sk/f/abc"))
            .await
            .unwrap();
        assert_eq!(item.direct_url, "https://cdn.test/fallback.png");
        assert_eq!(client.count("POST "), 1);
    }

    #[tokio::test]
    async fn test_resolve_without_slug_skips_api() {
        let page = r#"<a href="https://cdn.test/v.mp4" download>get</a>"#;
        let client = FakeClient::new().with_page("https://bunkr.sk/v/abc", page);
        let item = resolve(&client, &ItemRef::new("/v/abc")).await.unwrap();
        assert_eq!(item.direct_url, "https://cdn.test/v.mp4");
        assert_eq!(client.count("POST "), 0);
    }

    #[tokio::test]
    async fn test_resolve_nothing_found() {
        let client = FakeClient::new().with_page("https://bunkr.sk/f/abc", "<p>gone</p>");
        let err = resolve(&client, &ItemRef::new("/f/abc")).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoDownloadLink(_)));
    }

    #[tokio::test]
    async fn test_resolve_reports_decrypt_failure() {
        let client = FakeClient::new()
            .with_page("https://bunkr.sk/f/abc", "<p>gone</p>")
            .with_post(
                ENCRYPTION_API_URL,
                json!({ "slug": "abc" }),
                json!({ "timestamp": TS }),
            );
        let err = resolve(&client, &ItemRef::new("/f/abc")).await.unwrap_err();
        assert!(matches!(err, ResolveError::Decrypt(_)));
    }

    #[tokio::test]
    async fn test_resolve_page_fetch_failure() {
        let client = FakeClient::new();
        let err = resolve(&client, &ItemRef::new("/f/abc")).await.unwrap_err();
        assert!(matches!(err, ResolveError::Fetch { .. }));
    }
}
