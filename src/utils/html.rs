// src/utils/html.rs

//! Markup helpers built on `scraper`.

use scraper::{Html, Selector};

use crate::error::{AppError, Result};

/// Upper bound on decode passes; each pass removes one level of escaping.
const MAX_STRIP_PASSES: usize = 8;

/// Strip markup from a text field, keeping its text content.
///
/// Text without `<` or `&` is returned untouched. Malformed markup never
/// fails; the HTML parser recovers and whatever text it finds is kept.
///
/// Escaped markup (`&lt;i&gt;`) decodes into markup, so passes repeat until
/// the text stops changing. The result is a fixed point: stripping it again
/// returns it unchanged.
///
/// # Examples
/// ```
/// use harvester::utils::html::strip_markup;
///
/// assert_eq!(strip_markup("<b>Bold</b> text"), "Bold text");
/// assert_eq!(strip_markup("&lt;i&gt;Ixodes&lt;/i&gt; survey"), "Ixodes survey");
/// assert_eq!(strip_markup("plain text"), "plain text");
/// ```
pub fn strip_markup(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_STRIP_PASSES {
        if !current.contains(['<', '&']) {
            break;
        }
        let next = strip_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn strip_once(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    fragment.root_element().text().collect()
}

/// An anchor found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Collect every anchor carrying an `href`, in document order.
pub fn anchors(html: &str) -> Result<Vec<Anchor>> {
    let selector =
        Selector::parse("a[href]").map_err(|e| AppError::parse(format!("selector: {e:?}")))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim().to_string();
            let text: String = el.text().collect();
            Some(Anchor {
                href,
                text: normalize_whitespace(&text),
            })
        })
        .collect())
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bold() {
        assert_eq!(strip_markup("<b>Bold</b> text"), "Bold text");
    }

    #[test]
    fn test_strip_is_noop_on_plain_text() {
        let plain = "Ticks (Ixodes scapularis) in 2021: a survey";
        assert_eq!(strip_markup(plain), plain);
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn test_strip_malformed_markup() {
        assert_eq!(strip_markup("<i>unclosed italic"), "unclosed italic");
        assert_eq!(strip_markup("<p>one</p><p>two"), "onetwo");
    }

    #[test]
    fn test_strip_decodes_entities() {
        assert_eq!(strip_markup("Lyme &amp; ticks"), "Lyme & ticks");
    }

    #[test]
    fn test_strip_escaped_markup() {
        assert_eq!(
            strip_markup("&lt;i&gt;Ixodes&lt;/i&gt; survey"),
            "Ixodes survey"
        );
        assert_eq!(strip_markup("a &lt; b"), "a < b");
    }

    #[test]
    fn test_strip_is_idempotent() {
        for raw in [
            "&lt;i&gt;Ixodes&lt;/i&gt; survey",
            "&amp;lt;b&amp;gt;double&amp;lt;/b&amp;gt;",
            "Lyme &amp; ticks",
            "a &lt; b &amp;&amp; c",
            "<p>one</p><p>two",
            "plain",
        ] {
            let once = strip_markup(raw);
            assert_eq!(strip_markup(&once), once, "not stable for {raw:?}");
        }
    }

    #[test]
    fn test_anchors_in_document_order() {
        let html = r#"<html><body>
            <a href="https://a.org/1">First
               link</a>
            <a>no href</a>
            <a href="/local">Local</a>
        </body></html>"#;
        let found = anchors(html).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].href, "https://a.org/1");
        assert_eq!(found[0].text, "First link");
        assert_eq!(found[1].href, "/local");
    }
}
