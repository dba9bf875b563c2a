//! Page title extraction.
//!
//! Candidates are tried in order, and the first non-empty one wins:
//!
//! 1. `<meta property="og:title" content="…">`
//! 2. `<title>` text
//! 3. first `<h1>` text, descendant text nodes joined by spaces
//! 4. `<meta name="title" content="…">`
//!
//! The chosen text is trimmed with internal whitespace runs collapsed.

use crate::error::ExtractFailure;
use crate::utils::squash_whitespace;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static META_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="title"]"#).unwrap());

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(squash_whitespace)
        .find(|t| !t.is_empty())
}

fn element_text(el: ElementRef<'_>, separator: &str) -> Option<String> {
    non_empty(squash_whitespace(&el.text().collect::<Vec<_>>().join(separator)))
}

/// Whether the body looks like markup at all.
fn looks_like_markup(body: &str) -> bool {
    !body.trim().is_empty() && !body.contains('\0') && body.contains('<')
}

/// Extract the title of an HTML page.
///
/// # Errors
///
/// - [`ExtractFailure::MalformedMarkup`] if the body is empty, binary, or
///   contains no tags
/// - [`ExtractFailure::NoTitleFound`] if no candidate yields any text
#[instrument(level = "debug", skip_all, fields(bytes = body.len()))]
pub fn extract_title(body: &str) -> Result<String, ExtractFailure> {
    if !looks_like_markup(body) {
        return Err(ExtractFailure::MalformedMarkup);
    }
    let document = Html::parse_document(body);

    let title = meta_content(&document, &OG_TITLE)
        .or_else(|| document.select(&TITLE).next().and_then(|el| element_text(el, "")))
        .or_else(|| document.select(&H1).next().and_then(|el| element_text(el, " ")))
        .or_else(|| meta_content(&document, &META_TITLE));

    match title {
        Some(t) => {
            debug!(title = %t, "Extracted title");
            Ok(t)
        }
        None => Err(ExtractFailure::NoTitleFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title_variants() {
        let cases: &[(&str, Result<&str, ExtractFailure>)] = &[
            (
                r#"<meta property="og:title" content="OG Title"><title>Ignored</title>"#,
                Ok("OG Title"),
            ),
            ("<title>  Hello   World </title>", Ok("Hello World")),
            ("<h1> Foo\nBar </h1>", Ok("Foo Bar")),
            (r#"<meta name="title" content="Meta Title">"#, Ok("Meta Title")),
            ("<p>No title here</p>", Err(ExtractFailure::NoTitleFound)),
        ];
        for (html, expected) in cases {
            assert_eq!(extract_title(html).as_deref(), expected.as_deref(), "{html}");
        }
    }

    #[test]
    fn test_h1_joins_nested_text() {
        let html = "<html><body><h1>Breaking:<span>Markets</span> rally</h1></body></html>";
        assert_eq!(extract_title(html).unwrap(), "Breaking: Markets rally");
    }

    #[test]
    fn test_empty_candidates_fall_through() {
        let html = r#"<meta property="og:title" content="   "><title>  </title><h1>Real</h1>"#;
        assert_eq!(extract_title(html).unwrap(), "Real");
    }

    #[test]
    fn test_full_document() {
        let html = r#"<!doctype html>
            <html lang="ja"><head><meta charset="utf-8">
            <title>
                速報  ニュース
            </title></head><body><h1>Other</h1></body></html>"#;
        assert_eq!(extract_title(html).unwrap(), "速報 ニュース");
    }

    #[test]
    fn test_malformed_markup() {
        assert_eq!(extract_title(""), Err(ExtractFailure::MalformedMarkup));
        assert_eq!(extract_title("   \n"), Err(ExtractFailure::MalformedMarkup));
        assert_eq!(extract_title("just plain text"), Err(ExtractFailure::MalformedMarkup));
        assert_eq!(extract_title("<title>x</title>\0\0"), Err(ExtractFailure::MalformedMarkup));
    }

    #[test]
    fn test_deterministic() {
        let html = "<title>Same</title>";
        assert_eq!(extract_title(html), extract_title(html));
    }
}
