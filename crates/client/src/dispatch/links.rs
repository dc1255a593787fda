//! Absolute link rewriting for archived text documents.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// MIME types whose absolute links may be rewritten.
pub const REWRITABLE_TYPES: [&str; 20] = [
    "text/css",
    "text/html",
    "application/xml",
    "application/xhtml+xml",
    "text/javascript",
    "application/javascript",
    "application/ecmascript",
    "application/x-ecmascript",
    "application/x-javascript",
    "text/ecmascript",
    "text/javascript1.0",
    "text/javascript1.1",
    "text/javascript1.2",
    "text/javascript1.3",
    "text/javascript1.4",
    "text/javascript1.5",
    "text/jscript",
    "text/livescript",
    "text/x-ecmascript",
    "text/x-javascript",
];

/// An absolute http(s) URL running up to a closing quote. The quote is
/// captured separately and written back unchanged.
static ABSOLUTE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(https?://[^\s'"]+)(['"])"#).expect("absolute link pattern is valid"));

pub fn is_rewritable(mime: &str) -> bool {
    REWRITABLE_TYPES.contains(&mime)
}

/// Prefix every quoted absolute URL in `document` with `origin`.
///
/// `mime` must already be stripped of parameters. Documents of other types
/// come back untouched.
pub fn rewrite_absolute_links<'a>(origin: &str, mime: &str, document: &'a str) -> Cow<'a, str> {
    if !is_rewritable(mime) {
        return Cow::Borrowed(document);
    }

    let origin = origin.trim_end_matches('/');
    ABSOLUTE_LINK.replace_all(document, |caps: &Captures| format!("{origin}/{}{}", &caps[1], &caps[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "http://localhost:8080";

    #[test]
    fn test_rewrite_double_quoted() {
        let html = r#"<a href="http://example.com/x">x</a>"#;
        let result = rewrite_absolute_links(ORIGIN, "text/html", html);
        assert_eq!(result, r#"<a href="http://localhost:8080/http://example.com/x">x</a>"#);
    }

    #[test]
    fn test_rewrite_single_quoted_https() {
        let js = "location.href = 'https://example.com/page?a=1&b=2';";
        let result = rewrite_absolute_links(ORIGIN, "application/javascript", js);
        assert_eq!(result, "location.href = 'http://localhost:8080/https://example.com/page?a=1&b=2';");
    }

    #[test]
    fn test_rewrite_multiple_links() {
        let css = r#"a { background: url("http://a.example/1.png") } b { background: url('http://b.example/2.png') }"#;
        let result = rewrite_absolute_links(ORIGIN, "text/css", css);
        assert!(result.contains(r#"url("http://localhost:8080/http://a.example/1.png")"#));
        assert!(result.contains("url('http://localhost:8080/http://b.example/2.png')"));
    }

    #[test]
    fn test_unquoted_links_left_alone() {
        let text = "see http://example.com/x for details";
        let result = rewrite_absolute_links(ORIGIN, "text/html", text);
        assert_eq!(result, text);
    }

    #[test]
    fn test_link_followed_by_space_then_quote_left_alone() {
        let text = r#"title="http://example.com/x and more""#;
        let result = rewrite_absolute_links(ORIGIN, "text/html", text);
        assert_eq!(result, text);
    }

    #[test]
    fn test_adjacent_links() {
        let text = r#""http://a.example/""http://b.example/""#;
        let result = rewrite_absolute_links(ORIGIN, "text/html", text);
        assert_eq!(result, r#""http://localhost:8080/http://a.example/""http://localhost:8080/http://b.example/""#);
    }

    #[test]
    fn test_plain_text_not_rewritten() {
        let text = r#"link: "http://example.com/x""#;
        let result = rewrite_absolute_links(ORIGIN, "text/plain", text);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_origin_trailing_slash() {
        let html = r#"<img src="http://example.com/a.gif">"#;
        let result = rewrite_absolute_links("http://gw.local/", "text/html", html);
        assert_eq!(result, r#"<img src="http://gw.local/http://example.com/a.gif">"#);
    }

    #[test]
    fn test_allow_list() {
        assert!(is_rewritable("text/javascript1.3"));
        assert!(is_rewritable("application/xhtml+xml"));
        assert!(!is_rewritable("text/plain"));
        assert!(!is_rewritable("image/png"));
    }
}
