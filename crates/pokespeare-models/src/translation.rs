//! Translator response decoder.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadError;

/// Translation tag expected when none is configured.
pub const DEFAULT_TRANSLATION: &str = "shakespeare";

/// Text returned by the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedText {
    /// Translated text, verbatim.
    pub translated: String,
}

impl TranslatedText {
    /// Wrap an already translated string.
    #[must_use]
    pub fn new(translated: impl Into<String>) -> Self {
        Self {
            translated: translated.into(),
        }
    }

    /// Decode a translator payload expecting the `shakespeare` tag.
    ///
    /// # Errors
    ///
    /// See [`decode_translation`].
    pub fn decode(raw: &Value) -> Result<Self, PayloadError> {
        decode_translation(raw, DEFAULT_TRANSLATION)
    }
}

/// Decode a translator payload.
///
/// `contents.translation`, when present, must equal `tag`.
///
/// # Errors
///
/// Returns a [`PayloadError`] when `contents` is absent, the tag differs, or
/// `contents.translated` is missing.
pub fn decode_translation(raw: &Value, tag: &str) -> Result<TranslatedText, PayloadError> {
    let contents = raw
        .get("contents")
        .and_then(Value::as_object)
        .ok_or(PayloadError::MissingContents)?;

    if let Some(actual) = contents.get("translation")
        && actual.as_str() != Some(tag)
    {
        return Err(PayloadError::UnexpectedTranslation {
            expected: tag.to_string(),
            actual: actual
                .as_str()
                .map_or_else(|| actual.to_string(), str::to_string),
        });
    }

    let translated = contents
        .get("translated")
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingField {
            field: "contents.translated",
        })?;
    Ok(TranslatedText::new(translated))
}
