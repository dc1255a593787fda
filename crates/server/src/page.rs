//! HTML pages served by the gateway itself.

use waygate_core::ClientPreferences;
use waygate_core::preferences::{
    FALLBACK_TO_CURRENT, MINIMIZE_HTML, REPLACE_ABS_LINKS, TARGET_DAY, TARGET_MONTH, TARGET_YEAR,
};

const STYLE: &str = "body{font-family:sans-serif;max-width:40em;margin:2em auto;padding:0 1em}\
label{display:block;margin:.5em 0}code{background:#eee;padding:0 .2em}";

/// Settings form and usage hint.
pub fn index(origin: &str, prefs: &ClientPreferences) -> String {
    let origin = escape_html(origin);
    let date = &prefs.target_date;

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>wayback-gateway</title><style>{STYLE}</style></head>
<body>
<h1>wayback-gateway</h1>
<p>Browse the web as it was archived. Prefix any address with the gateway, e.g.
<code>{origin}/http://example.com/</code>.</p>
<form method="post" action="/configure">
<fieldset>
<legend>Target date</legend>
<label>Day <input type="number" name="{TARGET_DAY}" min="1" max="31" value="{day}"></label>
<label>Month <input type="number" name="{TARGET_MONTH}" min="1" max="12" value="{month}"></label>
<label>Year <input type="number" name="{TARGET_YEAR}" min="1996" value="{year}"></label>
</fieldset>
<fieldset>
<legend>Options</legend>
{replace}
{fallback}
{minimize}
</fieldset>
<p><button type="submit">Save</button></p>
</form>
</body>
</html>
"#,
        day = date.day,
        month = date.month,
        year = date.year,
        replace = flag_select(REPLACE_ABS_LINKS, "Route absolute links through the gateway", prefs.replace_abs_links),
        fallback = flag_select(
            FALLBACK_TO_CURRENT,
            "Fall back to the live site when not archived",
            prefs.fallback_to_current,
        ),
        minimize = flag_select(MINIMIZE_HTML, "Minimize HTML", prefs.minimize_html),
    )
}

/// Shown for paths that are neither archive URLs nor resolvable through the referer.
pub fn not_an_archive_url(origin: &str) -> String {
    let origin = escape_html(origin);

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>400 Bad Request</title><style>{STYLE}</style></head>
<body>
<h1>HTTP error 400</h1>
<p>This is not an archive URL. Request archived pages as
<code>{origin}/http://example.com/</code>, or change settings on the <a href="/">start page</a>.</p>
</body>
</html>
"#
    )
}

// A select always submits a value, so unsetting a flag reaches the cookie.
fn flag_select(name: &str, label: &str, enabled: bool) -> String {
    let (on, off) = if enabled { (" selected", "") } else { ("", " selected") };
    format!(
        concat!(
            r#"<label>{label} <select name="{name}">"#,
            r#"<option value="true"{on}>yes</option><option value="false"{off}>no</option></select></label>"#,
        ),
        label = label,
        name = name,
        on = on,
        off = off,
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
