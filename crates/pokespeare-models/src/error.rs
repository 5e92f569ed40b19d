//! Decode failures for upstream payloads.
//!
//! The `Display` text is what clients see in the `{error}` body, so messages
//! stay short and free of upstream detail.

use thiserror::Error;

/// Upstream payload did not have the expected shape.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Body could not be parsed as JSON.
    #[error("malformed response payload")]
    NotJson {
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
    /// Subject payload lacks the per-language description list.
    #[error("no flavor text entries for this item")]
    MissingEntries,
    /// A description entry did not have the expected structure.
    #[error("no flavor text entries for this item")]
    MalformedEntries {
        /// Underlying shape mismatch.
        #[source]
        source: serde_json::Error,
    },
    /// No description entry matched the target language.
    #[error("no flavor text entries for this item")]
    LanguageNotFound {
        /// Language code that was requested.
        language: String,
    },
    /// A required field was absent or not a string.
    #[error("missing required field '{field}'")]
    MissingField {
        /// Dotted path of the field.
        field: &'static str,
    },
    /// Translator response lacks the `contents` object.
    #[error("unable to translate the text")]
    MissingContents,
    /// Translator applied a different translation than requested.
    #[error("unable to translate the text")]
    UnexpectedTranslation {
        /// Tag that was requested.
        expected: String,
        /// Tag the translator reported.
        actual: String,
    },
}
