//! Parsing helpers that turn raw environment strings into typed settings.

use std::net::IpAddr;

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::CacheBackendKind;

const CACHEABLE_METHODS: &[&str] = &["GET", "POST"];

/// Parse an absolute `http`/`https` URL.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is empty, unparseable,
/// or uses another scheme.
pub fn parse_url(field: &'static str, raw: &str) -> ConfigResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(field, raw, "must not be empty"));
    }
    let url = Url::parse(trimmed)
        .map_err(|_| ConfigError::invalid(field, raw, "must be an absolute URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(field, raw, "scheme must be http or https"));
    }
    Ok(url)
}

/// Parse an integer that must be strictly positive.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric or zero values.
pub fn parse_positive_u64(field: &'static str, raw: &str) -> ConfigResult<u64> {
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(field, raw, "must be a non-negative integer"))?;
    if value == 0 {
        return Err(ConfigError::invalid(field, raw, "must be greater than zero"));
    }
    Ok(value)
}

/// Parse a TCP port in `1..=65535`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for values outside the range.
pub fn parse_port(field: &'static str, raw: &str) -> ConfigResult<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::invalid(
            field,
            raw,
            "must be between 1 and 65535",
        )),
        Ok(port) => Ok(port),
    }
}

/// Parse a bind host; `localhost` maps to the IPv4 loopback.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an IP address.
pub fn parse_host(field: &'static str, raw: &str) -> ConfigResult<IpAddr> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::from([127, 0, 0, 1]));
    }
    trimmed
        .parse()
        .map_err(|_| ConfigError::invalid(field, raw, "must be an IP address"))
}

/// Parse a cache backend selector.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for unknown backends.
pub fn parse_backend(field: &'static str, raw: &str) -> ConfigResult<CacheBackendKind> {
    raw.parse().map_err(|()| {
        ConfigError::invalid(field, raw, "must be one of memory, file, redis, none")
    })
}

/// Parse a comma separated list of cacheable HTTP methods.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the list is empty or names a
/// method the gateway never issues.
pub fn parse_methods(field: &'static str, raw: &str) -> ConfigResult<Vec<String>> {
    let mut methods = Vec::new();
    for part in raw.split(',') {
        let method = part.trim().to_ascii_uppercase();
        if method.is_empty() {
            continue;
        }
        if !CACHEABLE_METHODS.contains(&method.as_str()) {
            return Err(ConfigError::invalid(field, raw, "methods must be GET or POST"));
        }
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        return Err(ConfigError::invalid(field, raw, "must list at least one method"));
    }
    Ok(methods)
}

/// Parse a log format override.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for anything other than `json` or `pretty`.
pub fn parse_log_format(field: &'static str, raw: &str) -> ConfigResult<String> {
    let format = raw.trim().to_ascii_lowercase();
    match format.as_str() {
        "json" | "pretty" => Ok(format),
        _ => Err(ConfigError::invalid(field, raw, "must be json or pretty")),
    }
}

/// Require a non-blank string.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for blank values.
pub fn parse_non_empty(field: &'static str, raw: &str) -> ConfigResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(field, raw, "must not be empty"));
    }
    Ok(trimmed.to_string())
}
