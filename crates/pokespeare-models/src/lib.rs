#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Domain payloads shared by the Pokespeare gateway.
//!
//! Upstream responses arrive as untyped JSON; the decoders here are the only
//! place their shape is checked. Everything past a decoder works with
//! [`Subject`] and [`TranslatedText`].

pub mod error;
pub mod subject;
pub mod translation;

pub use error::PayloadError;
pub use subject::{DEFAULT_LANGUAGE, Subject, decode_subject};
pub use translation::{DEFAULT_TRANSLATION, TranslatedText, decode_translation};

/// Parse a raw upstream body into JSON.
///
/// # Errors
///
/// Returns [`PayloadError::NotJson`] when the body is not valid JSON.
pub fn parse_body(body: &[u8]) -> Result<serde_json::Value, PayloadError> {
    serde_json::from_slice(body).map_err(|source| PayloadError::NotJson { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_body_rejects_html() {
        let err = parse_body(b"<html>busy</html>").err();
        assert!(matches!(err, Some(PayloadError::NotJson { .. })));
        assert!(parse_body(br#"{"ok":true}"#).is_ok());
    }
}
