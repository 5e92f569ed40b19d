//! Upstream payloads shaped like the real species and translator APIs.

use serde_json::{Value, json};

/// Name used by the end-to-end scenarios.
pub const HAUNTER: &str = "haunter";
/// English description returned for [`HAUNTER`].
pub const HAUNTER_DESCRIPTION: &str = "The best one.";
/// Translation returned for [`HAUNTER_DESCRIPTION`].
pub const HAUNTER_TRANSLATION: &str = "'t The best one.'";

/// Species payload with `(language, flavor_text)` entries in order, plus some
/// of the noise the real API sends.
#[must_use]
pub fn species(name: &str, entries: &[(&str, &str)]) -> Value {
    let entries: Vec<Value> = entries
        .iter()
        .map(|(language, text)| {
            json!({
                "flavor_text": text,
                "language": {"name": language, "url": format!("https://pokeapi.co/api/v2/language/{language}/")},
                "version": {"name": "red"},
            })
        })
        .collect();
    json!({
        "id": 93,
        "name": name,
        "color": {"name": "purple"},
        "flavor_text_entries": entries,
    })
}

/// Species payload lacking `flavor_text_entries`.
#[must_use]
pub fn species_without_entries(name: &str) -> Value {
    json!({"id": 93, "name": name, "color": {"name": "purple"}})
}

/// Translator payload echoing `tag` as the applied translation.
#[must_use]
pub fn translation(translated: &str, tag: &str) -> Value {
    json!({
        "success": {"total": 1},
        "contents": {
            "translated": translated,
            "text": "source text",
            "translation": tag,
        },
    })
}

/// Body the translator sends with a `429`.
#[must_use]
pub fn rate_limited() -> Value {
    json!({
        "error": {
            "code": 429,
            "message": "Too Many Requests: Rate limit of 5 requests per hour exceeded.",
        }
    })
}
