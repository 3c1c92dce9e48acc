//! Resource locator resolution
//!
//! A locator is a URI-like value whose path component names the resource,
//! e.g. `file:///greeting.txt`. The canonical name drops the leading
//! separators and the `.txt` convention suffix: `greeting`.

use url::Url;

/// Suffix stripped from a locator path to form the canonical name
pub const TEXT_SUFFIX: &str = ".txt";

/// Path component of `locator` without leading `/`.
///
/// Values that are not absolute URLs (`greeting`, `/greeting.txt`) are
/// treated as a bare path, minus any query or fragment.
pub fn resource_path(locator: &str) -> String {
    let path = match Url::parse(locator) {
        Ok(url) => url.path().to_string(),
        Err(_) => locator
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    path.trim_start_matches('/').to_string()
}

/// Canonical resource name for `locator`
pub fn canonical_name(locator: &str) -> String {
    let path = resource_path(locator);

    match path.strip_suffix(TEXT_SUFFIX) {
        Some(name) => name.to_string(),
        None => path,
    }
}
