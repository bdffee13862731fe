use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::constants::DEFAULT_PAGE_SIZE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub cache_ttl_seconds: u64,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub media_root: PathBuf,
    pub page_size: i64,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let page_size: i64 = try_load(&lookup, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size < 1 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                reason: String::from("must be positive"),
            });
        }

        Ok(Self {
            port: try_load(&lookup, "FOODGRAM_PORT", 8000)?,
            database_url: required(&lookup, "DATABASE_URL")?,
            redis_url: lookup("REDIS_URL").filter(|url| !url.is_empty()),
            cache_ttl_seconds: try_load(&lookup, "CACHE_TTL_SECONDS", 300)?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            jwt_ttl_hours: try_load(&lookup, "JWT_TTL_HOURS", 24)?,
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            page_size,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            log::warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
