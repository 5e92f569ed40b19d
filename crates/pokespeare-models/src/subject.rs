//! Subject payload and the species decoder.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadError;
use crate::translation::TranslatedText;

/// Language selected when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Creature looked up by the gateway, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Lookup key.
    pub name: String,
    /// Source-language text until [`Subject::apply_translation`] replaces it.
    pub description: String,
}

impl Subject {
    /// Build a subject directly.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Decode a species payload selecting the English description.
    ///
    /// # Errors
    ///
    /// See [`decode_subject`].
    pub fn decode(raw: &Value) -> Result<Self, PayloadError> {
        decode_subject(raw, DEFAULT_LANGUAGE)
    }

    /// Replace the description with its translation.
    pub fn apply_translation(&mut self, text: TranslatedText) {
        self.description = text.translated;
    }
}

#[derive(Deserialize)]
struct FlavorTextEntry {
    language: NamedResource,
    flavor_text: Option<String>,
}

#[derive(Deserialize)]
struct NamedResource {
    name: String,
}

/// Decode a species payload, taking the first description whose language
/// matches `language`.
///
/// Unknown fields are ignored; every entry must carry `language.name`.
///
/// # Errors
///
/// Returns a [`PayloadError`] when `flavor_text_entries` is absent or
/// malformed, when no entry matches `language`, or when `name` or the selected
/// `flavor_text` is missing.
pub fn decode_subject(raw: &Value, language: &str) -> Result<Subject, PayloadError> {
    let entries = raw
        .get("flavor_text_entries")
        .ok_or(PayloadError::MissingEntries)?;
    let entries = Vec::<FlavorTextEntry>::deserialize(entries)
        .map_err(|source| PayloadError::MalformedEntries { source })?;

    let entry = entries
        .into_iter()
        .find(|entry| entry.language.name == language)
        .ok_or_else(|| PayloadError::LanguageNotFound {
            language: language.to_string(),
        })?;
    let description = entry.flavor_text.ok_or(PayloadError::MissingField {
        field: "flavor_text_entries.flavor_text",
    })?;

    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingField { field: "name" })?;

    Ok(Subject::new(name, description))
}
