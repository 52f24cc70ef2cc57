//! Configuration utilities

use std::str::FromStr;

/// Load configuration from a `.env` file, if one exists
pub fn load_env() {
    dotenvy::dotenv().ok();
}

/// Read a non-empty environment variable
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable, falling back to `default` when unset.
///
/// Returns `Err(name)` when the variable is set but does not parse.
pub fn env_parse<T: FromStr>(name: &'static str, default: T) -> Result<T, &'static str> {
    match env_opt(name) {
        Some(raw) => raw.trim().parse().map_err(|_| name),
        None => Ok(default),
    }
}

/// Parse a boolean flag the way operators tend to write them
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma separated list, dropping empty items
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
