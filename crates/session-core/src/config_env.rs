use std::env;
use std::str::FromStr;

use crate::config::ConfigError;

pub(crate) type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

pub(crate) fn optional_trimmed_env(lookup: EnvLookup<'_>, key: &str) -> Option<String> {
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(crate) fn parse_u64_env(
    lookup: EnvLookup<'_>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match optional_trimmed_env(lookup, key) {
        Some(value) => value.parse::<u64>().map_err(|_| ConfigError::ParseInt {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

pub(crate) fn parse_enum_env<T>(lookup: EnvLookup<'_>, key: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = String> + Default,
{
    match optional_trimmed_env(lookup, key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|err| ConfigError::InvalidConfiguration(format!("{key}: {err}"))),
        None => Ok(T::default()),
    }
}
