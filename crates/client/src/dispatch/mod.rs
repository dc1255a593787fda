//! Response dispatch: pass-through or post-processing by content type.
//!
//! Binary payloads are returned as stored. Text payloads go through a
//! [`PostProcessor`] when the client asked for any post-processing; the
//! default one rewrites absolute links, then collapses HTML whitespace.

pub mod links;
pub mod minify;

use std::borrow::Cow;
use std::sync::Arc;

use bytes::Bytes;

use waygate_core::{ArchivedResponse, ClientPreferences};

pub use links::{is_rewritable, rewrite_absolute_links};
pub use minify::collapse_whitespace;

/// Facts about the incoming request that post-processing may need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// `{scheme}://{host}` of the gateway as the client addressed it.
    pub origin: String,
}

impl RequestContext {
    pub fn new(origin: impl Into<String>) -> Self {
        Self { origin: origin.into() }
    }
}

/// Transformation hook for text documents.
pub trait PostProcessor: Send + Sync {
    /// `mime` is lowercase and stripped of parameters.
    fn process(&self, ctx: &RequestContext, text: &str, mime: &str, prefs: &ClientPreferences) -> String;
}

/// Link rewriting (`replaceAbsLinks`) followed by minification (`minimizeHtml`).
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPostProcessor;

impl PostProcessor for DefaultPostProcessor {
    fn process(&self, ctx: &RequestContext, text: &str, mime: &str, prefs: &ClientPreferences) -> String {
        let mut document = Cow::Borrowed(text);

        if prefs.replace_abs_links {
            document = Cow::Owned(rewrite_absolute_links(&ctx.origin, mime, &document).into_owned());
        }

        if prefs.minimize_html && minify::is_html(mime) {
            document = Cow::Owned(collapse_whitespace(&document));
        }

        document.into_owned()
    }
}

/// The MIME type of a `Content-Type` value, without parameters.
pub fn mime_essence(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// `text/*` or one of the rewritable script/markup types.
pub fn is_text_like(mime: &str) -> bool {
    mime.starts_with("text/") || is_rewritable(mime)
}

/// Picks pass-through or post-processing for archived responses.
#[derive(Clone)]
pub struct ResponseDispatcher {
    processor: Arc<dyn PostProcessor>,
}

impl Default for ResponseDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(DefaultPostProcessor))
    }
}

impl ResponseDispatcher {
    pub fn new(processor: Arc<dyn PostProcessor>) -> Self {
        Self { processor }
    }

    /// Body to send for `response`.
    ///
    /// The payload is decoded as UTF-8 (lossily) only when it is text-like
    /// and the client asked for post-processing; otherwise it is returned
    /// byte for byte.
    pub fn dispatch(&self, response: &ArchivedResponse, prefs: &ClientPreferences, ctx: &RequestContext) -> Bytes {
        let mime = mime_essence(&response.content_type);
        if !is_text_like(&mime) || !prefs.wants_post_processing() {
            return response.payload.clone();
        }

        let text = String::from_utf8_lossy(&response.payload);
        Bytes::from(self.processor.process(ctx, &text, &mime, prefs))
    }
}
