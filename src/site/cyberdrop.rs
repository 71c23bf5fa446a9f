//! Cyberdrop pages. Item links point at `/f/<id>` pages whose JSON twin under
//! `/api/f/<id>` carries the direct link and the original file name.

use scraper::{Html, Selector};
use serde::Deserialize;

use super::{absolute_url, generated_name, heading_text, ItemRef, ResolveError, ResolvedItem};
use crate::http::HttpClient;

pub const BASE_URL: &str = "https://cyberdrop.me";

#[derive(Debug, Deserialize)]
struct ItemInfo {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

pub(crate) fn album_name(doc: &Html) -> String {
    heading_text(doc, "h1#title").unwrap_or_else(|| generated_name("cyberdrop_album"))
}

pub(crate) fn item_refs(doc: &Html) -> Vec<ItemRef> {
    let anchors = Selector::parse(r#"a[class*="image"]"#).expect("valid item selector");
    doc.select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .map(|href| ItemRef::new(absolute_url(BASE_URL, href)))
        .collect()
}

/// `https://cyberdrop.me/f/abc` → `https://cyberdrop.me/api/f/abc`
pub fn api_url(item_url: &str) -> String {
    item_url.replace("/f/", "/api/f/")
}

pub async fn resolve(
    client: &dyn HttpClient,
    item: &ItemRef,
) -> Result<ResolvedItem, ResolveError> {
    let api = api_url(&item.raw_url);
    let body = client
        .get_text(&api, &[], None)
        .await
        .map_err(|e| ResolveError::fetch(&api, e))?;
    let info: ItemInfo = serde_json::from_slice(&body).map_err(|e| ResolveError::json(&api, e))?;

    match info.url.filter(|u| !u.is_empty()) {
        Some(url) => Ok(ResolvedItem::new(
            url,
            info.name.as_deref().or(item.declared_name.as_deref()),
            item.declared_size,
        )),
        None => Err(ResolveError::NoDownloadLink(item.raw_url.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeClient;
    use crate::site::{parse_page, PageLayout};

    #[test]
    fn test_api_url() {
        assert_eq!(
            api_url("https://cyberdrop.me/f/Xy12"),
            "https://cyberdrop.me/api/f/Xy12"
        );
        assert_eq!(api_url("https://cyberdrop.me/a/x"), "https://cyberdrop.me/a/x");
    }

    #[test]
    fn test_parse_album_page() {
        let html = br#"<html><head><title>Cyberdrop</title></head><body>
            <h1 id="title"> Beach | 2024 </h1>
            <a class="image" href="/f/aaa">a</a>
            <a class="image-container" href="/f/bbb">b</a>
            <a class="other" href="/f/ccc">c</a>
            </body></html>"#;
        let page = parse_page(html, "https://cyberdrop.me/a/beach");
        assert_eq!(page.layout, PageLayout::Cyberdrop);
        assert_eq!(page.album_name, "Beach - 2024");
        let urls: Vec<_> = page.items.iter().map(|i| i.raw_url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://cyberdrop.me/f/aaa", "https://cyberdrop.me/f/bbb"]
        );
    }

    #[test]
    fn test_item_refs_keep_absolute_links_and_skip_missing_href() {
        let html = br#"<html><head><title>Cyberdrop</title></head><body>
            <a class="image" href="https://cyberdrop.me/f/abs">a</a>
            <a class="image" href="f/rel">b</a>
            <a class="image">no link</a>
            <a class="image" href="">empty</a>
            </body></html>"#;
        let page = parse_page(html, "https://cyberdrop.me/a/mixed");
        let urls: Vec<_> = page.items.iter().map(|i| i.raw_url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://cyberdrop.me/f/abs", "https://cyberdrop.me/f/rel"]
        );
    }

    #[tokio::test]
    async fn test_resolve_prefers_api_name() {
        let client = FakeClient::new().with_page(
            "https://cyberdrop.me/api/f/aaa",
            r#"{"url":"https://fs-01.cyberdrop.test/aaa-XyZ.jpg","name":"sunset on the pier.jpg"}"#,
        );
        let item = resolve(&client, &ItemRef::new("https://cyberdrop.me/f/aaa"))
            .await
            .unwrap();
        assert_eq!(item.direct_url, "https://fs-01.cyberdrop.test/aaa-XyZ.jpg");
        assert_eq!(item.file_name, "sunset_on_the_pier.jpg");
        assert_eq!(item.extension, "jpg");
    }

    #[tokio::test]
    async fn test_resolve_without_name_uses_url() {
        let client = FakeClient::new().with_page(
            "https://cyberdrop.me/api/f/aaa",
            r#"{"url":"https://fs-01.cyberdrop.test/aaa-XyZ.mp4"}"#,
        );
        let item = resolve(&client, &ItemRef::new("https://cyberdrop.me/f/aaa"))
            .await
            .unwrap();
        assert_eq!(item.file_name, "aaa-XyZ.mp4");
    }

    #[tokio::test]
    async fn test_resolve_missing_url() {
        let client =
            FakeClient::new().with_page("https://cyberdrop.me/api/f/aaa", r#"{"name":"x.jpg"}"#);
        let err = resolve(&client, &ItemRef::new("https://cyberdrop.me/f/aaa"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoDownloadLink(_)));
    }

    #[tokio::test]
    async fn test_resolve_malformed_json() {
        let client = FakeClient::new().with_page("https://cyberdrop.me/api/f/aaa", "<html>");
        let err = resolve(&client, &ItemRef::new("https://cyberdrop.me/f/aaa"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Json { .. }));
    }
}
