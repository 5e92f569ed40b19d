//! Fallback values applied when a setting is absent from the environment.

/// Species endpoint queried for descriptions.
pub const POKEMON_API_URL: &str = "https://pokeapi.co/api/v2/pokemon-species/";
/// Translator endpoint receiving the description.
pub const TRANSLATOR_API_URL: &str = "https://api.funtranslations.com/translate/shakespeare.json";
/// Name used to namespace cached responses.
pub const CACHE_NAME: &str = "pokespeare_cache";
/// Cache storage backend.
pub const CACHE_BACKEND: &str = "memory";
/// Cache entry lifetime in seconds.
pub const CACHE_EXPIRATION_SECS: u64 = 3_600;
/// Methods eligible for caching.
pub const CACHE_METHODS: &[&str] = &["GET", "POST"];
/// Directory holding the file-backed cache.
pub const CACHE_DIR: &str = ".cache";
/// Connection string for the redis cache backend.
pub const REDIS_URL: &str = "redis://127.0.0.1:6379";
/// Language code selected from the flavor text entries.
pub const LANGUAGE: &str = "en";
/// Translation tag the translator must echo back.
pub const TRANSLATION: &str = "shakespeare";
/// Outbound request timeout in milliseconds.
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Bind host for the HTTP listener.
pub const HOST: &str = "127.0.0.1";
/// Bind port for the HTTP listener.
pub const PORT: u16 = 5_000;
/// Default `EnvFilter` directive.
pub const LOG_LEVEL: &str = "info";

/// Worker threads used when none are configured: `2 * cpus + 1`.
#[must_use]
pub fn workers() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    cpus.saturating_mul(2).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_workers_is_odd_and_positive() {
        let count = workers();
        assert!(count >= 3);
        assert_eq!(count % 2, 1);
    }
}
