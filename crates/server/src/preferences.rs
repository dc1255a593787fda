//! Client preferences stored in cookies.

use std::collections::HashMap;

use axum_extra::extract::cookie::{Cookie, CookieJar};
use waygate_core::ClientPreferences;
use waygate_core::preferences::PREFERENCE_KEYS;

/// Rebuild the preferences of the requesting client.
pub fn from_cookies(jar: &CookieJar) -> ClientPreferences {
    ClientPreferences::from_lookup(|key| jar.get(key).map(|c| c.value().to_string()))
}

/// Store every preference present in `form` as a cookie of the same name.
pub fn apply_form(mut jar: CookieJar, form: &HashMap<String, String>) -> CookieJar {
    for key in PREFERENCE_KEYS {
        let Some(value) = form.get(key) else { continue };
        let value = value.trim();

        if !is_cookie_safe(value) {
            tracing::debug!(key, "ignoring preference value that cannot be stored in a cookie");
            continue;
        }

        jar = jar.add(Cookie::build((key, value.to_string())).path("/"));
    }
    jar
}

fn is_cookie_safe(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_graphic() && !matches!(b, b';' | b',' | b'"' | b'\\'))
}
