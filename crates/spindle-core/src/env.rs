//! Environment variable helpers
//!
//! Configuration knobs read the environment through these; flags parsed by
//! `Config::apply_args` take precedence over them.

use std::str::FromStr;

/// Parse an environment variable as `T`, falling back to `default` when the
/// variable is unset or unparsable.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Boolean environment variable: "1", "true", "yes", "on" (case-insensitive)
/// are true; any other set value is false; unset returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
