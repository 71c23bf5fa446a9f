use std::collections::BTreeSet;

/// Replace characters that are illegal in directory names (`<>:"/\|?*'` and
/// ASCII control characters) with `-`. Used for album names.
pub fn remove_illegal_chars(name: &str) -> String {
    name.chars()
        .map(|c| {
            if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '\'')
                || ('\u{0}'..='\u{1f}').contains(&c)
            {
                '-'
            } else {
                c
            }
        })
        .collect()
}

/// Names that would not stay inside the directory they are joined onto.
pub fn is_unsafe_component(name: &str) -> bool {
    matches!(name.trim(), "" | "." | "..")
}

/// Restrict a file name to `[A-Za-z0-9._-]`, replacing everything else with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Path component of a URL, without query or fragment. Falls back to plain
/// string slicing when the URL does not parse (e.g. a garbled decrypted link).
fn url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => {
            let without_query = url.split(['?', '#']).next().unwrap_or("");
            match without_query.find("://") {
                Some(idx) => {
                    let rest = &without_query[idx + 3..];
                    rest.find('/').map(|i| rest[i..].to_string()).unwrap_or_default()
                }
                None => without_query.to_string(),
            }
        }
    }
}

/// Split a URL into its percent-decoded basename and extension (without the
/// dot; empty when there is none).
///
/// `https://host/a/b/clip.final.MP4?x=1` → `("clip.final.MP4", "MP4")`
pub fn url_file_parts(url: &str) -> (String, String) {
    let path = url_path(url);
    let raw_name = path.rsplit('/').next().unwrap_or("");
    let file_name = urlencoding::decode(raw_name)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw_name.to_string());
    let extension = match file_name.rfind('.') {
        Some(dot) => file_name[dot + 1..].to_string(),
        None => String::new(),
    };
    (file_name, extension)
}

/// Name used when sanitizing leaves nothing: `file_<md5(url)>.<ext>`.
pub fn fallback_file_name(url: &str, extension: &str) -> String {
    let digest = md5::compute(url.as_bytes());
    if extension.is_empty() {
        format!("file_{:x}", digest)
    } else {
        format!("file_{:x}.{}", digest, extension)
    }
}

/// Local file name for a resolved link. An API-declared name wins over the
/// URL basename; either way the result is sanitized.
pub fn item_file_name(url: &str, declared_name: Option<&str>) -> String {
    let (basename, extension) = url_file_parts(url);
    let name = declared_name.filter(|n| !n.is_empty()).unwrap_or(&basename);
    let clean = sanitize_file_name(name);
    if is_unsafe_component(&clean) {
        fallback_file_name(url, &extension)
    } else {
        clean
    }
}

/// Whether an extension passes the allow-list. An empty filter allows all.
pub fn extension_allowed(filter: &BTreeSet<String>, extension: &str) -> bool {
    filter.is_empty() || filter.contains(&extension.to_ascii_lowercase())
}
