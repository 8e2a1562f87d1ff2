//! Typed environment lookups shared by the `from_env` constructors.

use std::str::FromStr;

use crate::error::CoreError;

/// Read and parse `key`, falling back to `default` when it is unset.
pub fn var_or<T: FromStr>(key: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} has an invalid value: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

/// Read a variable that has no default.
pub fn required(key: &str) -> Result<String, CoreError> {
    std::env::var(key).map_err(|_| CoreError::Validation(format!("{key} must be set")))
}
