// src/utils/url.rs

//! URL manipulation utilities.

use url::form_urlencoded;

/// Expand a source URL template.
///
/// `{keyword}` is replaced by the form-encoded keyword and `{page}` by the
/// zero-based page number.
///
/// # Examples
/// ```
/// use harvester::utils::url::expand_template;
///
/// assert_eq!(
///     expand_template("https://example.com/search?q={keyword}&page={page}", "tick borne", 2),
///     "https://example.com/search?q=tick+borne&page=2"
/// );
/// ```
pub fn expand_template(template: &str, keyword: &str, page: usize) -> String {
    let encoded: String = form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
    template
        .replace("{keyword}", &encoded)
        .replace("{page}", &page.to_string())
}

/// Whether a template paginates through `{page}`.
pub fn is_paginated(template: &str) -> bool {
    template.contains("{page}")
}

/// Whether an href is an absolute http(s) link.
pub fn is_absolute(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

/// Make sure a base URL ends with a slash so relative endpoints append cleanly.
pub fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}
