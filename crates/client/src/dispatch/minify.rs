//! Whitespace collapsing for HTML documents.
//!
//! Text runs of whitespace shrink to a single space and the document is
//! trimmed. Tags and comments are copied as written, and the contents of
//! `pre`, `textarea`, `script` and `style` are left untouched.

/// Elements whose contents are whitespace-sensitive.
const PRESERVED_ELEMENTS: [&str; 4] = ["pre", "textarea", "script", "style"];

pub fn is_html(mime: &str) -> bool {
    matches!(mime, "text/html" | "application/xhtml+xml")
}

/// Collapse insignificant whitespace in `html`.
pub fn collapse_whitespace(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut pending_space = false;
    let mut pos = 0;

    while pos < html.len() {
        let rest = &html[pos..];

        if let Some(markup_len) = markup_len(rest) {
            flush_space(&mut out, &mut pending_space);
            let markup = &rest[..markup_len];
            out.push_str(markup);
            pos += markup_len;

            if let Some(name) = preserved_element(markup) {
                let body_len = raw_body_len(&html[pos..], name);
                out.push_str(&html[pos..pos + body_len]);
                pos += body_len;
            }
            continue;
        }

        let text_len = next_markup(rest).unwrap_or(rest.len());
        for ch in rest[..text_len].chars() {
            if ch.is_ascii_whitespace() {
                pending_space = true;
            } else {
                flush_space(&mut out, &mut pending_space);
                out.push(ch);
            }
        }
        pos += text_len;
    }

    out
}

fn flush_space(out: &mut String, pending_space: &mut bool) {
    if *pending_space && !out.is_empty() {
        out.push(' ');
    }
    *pending_space = false;
}

/// Length of the tag, comment or declaration at the start of `s`, if any.
/// A `<` that does not open markup (e.g. `a < b`) is text.
fn markup_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }

    if s.starts_with("<!--") {
        return Some(s.find("-->").map_or(s.len(), |end| end + 3));
    }

    match bytes.get(1) {
        Some(&b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?') => {}
        _ => return None,
    }

    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if q == b => quote = None,
            (None, b'>') => return Some(i + 1),
            _ => {}
        }
    }
    Some(s.len())
}

/// Offset of the next `<` in `s` that opens markup, skipping position 0.
fn next_markup(s: &str) -> Option<usize> {
    s.char_indices().skip(1).find(|&(i, ch)| ch == '<' && markup_len(&s[i..]).is_some()).map(|(i, _)| i)
}

/// If `tag` opens a whitespace-sensitive element, its name.
fn preserved_element(tag: &str) -> Option<&'static str> {
    let inner = tag.strip_prefix('<')?;
    if tag.ends_with("/>") {
        return None;
    }
    let name_len = inner.bytes().take_while(u8::is_ascii_alphanumeric).count();
    let name = &inner[..name_len];
    PRESERVED_ELEMENTS.into_iter().find(|element| element.eq_ignore_ascii_case(name))
}

/// Bytes up to (not including) the closing tag of `name`, or all of `s`.
fn raw_body_len(s: &str, name: &str) -> usize {
    let closing = format!("</{name}");
    s.to_ascii_lowercase().find(&closing).unwrap_or(s.len())
}
