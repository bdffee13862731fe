use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, CacheError};

// Caching - keys

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheKey {
    Tags,
    Tag(i32),
    Ingredients(String),
    Ingredient(i32),
}

impl CacheKey {
    pub fn to_string(&self) -> String {
        self.into()
    }
}

impl From<&CacheKey> for String {
    fn from(key: &CacheKey) -> Self {
        match key {
            CacheKey::Tags => String::from("tags"),
            CacheKey::Tag(id) => format!("tag-{id}"),
            CacheKey::Ingredients(prefix) => format!("ingredients-{}", prefix.to_lowercase()),
            CacheKey::Ingredient(id) => format!("ingredient-{id}"),
        }
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: Serialize + Send + Sync + Clone> {
    pub value: T,
}

/// Read-through cache for catalog data. Without a connection every lookup
/// goes straight to the callback.
#[derive(Clone)]
pub struct Cache {
    connection: Option<MultiplexedConnection>,
    ttl_seconds: u64,
}

impl Cache {
    pub fn disabled() -> Self {
        Self {
            connection: None,
            ttl_seconds: 0,
        }
    }

    pub async fn connect(url: &str, ttl_seconds: u64) -> Result<Self, ApiError> {
        let client = redis::Client::open(url).map_err(CacheError::from)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::from)?;

        Ok(Self {
            connection: Some(connection),
            ttl_seconds,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.connection.is_some()
    }

    pub async fn get_or<T, F, Fut>(&self, key: CacheKey, callback: F) -> Result<T, ApiError>
    where
        T: Serialize + for<'a> Deserialize<'a> + Send + Sync + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut cache = match &self.connection {
            Some(connection) => connection.clone(),
            None => return callback().await,
        };
        let k = key.to_string();

        // A value that no longer deserializes is dropped and refetched.
        let cached = match get_cache_value::<&str, RedisValue<T>>(&k, &mut cache).await {
            Ok(value) => value,
            Err(_) => {
                log::error!("> Failed to read cached value. Deleting {}", &k);
                if let Err(e) = delete_cache_value(&k, &mut cache).await {
                    log::error!("> Failed to delete cached value! {e}");
                }
                None
            }
        };

        if let Some(cached) = cached {
            log::trace!("> Found {:?}", k);
            return Ok(cached.value);
        }

        log::trace!("> Fetching {:?}", k);
        let value = callback().await?;

        let cached = RedisValue {
            value: value.clone(),
        };
        if let Err(e) = set_cache_value(&k, cached, self.ttl_seconds, &mut cache).await {
            log::error!("{e:?}");
        }

        Ok(value)
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    ttl_seconds: u64,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache
        .set_ex(key, value, ttl_seconds)
        .await
        .map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, ApiError> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(CacheKey::Tags.to_string(), "tags");
        assert_eq!(CacheKey::Tag(3).to_string(), "tag-3");
        assert_eq!(
            CacheKey::Ingredients(String::from("Sa")).to_string(),
            "ingredients-sa"
        );
        assert_eq!(CacheKey::Ingredient(9).to_string(), "ingredient-9");
    }

    #[tokio::test]
    async fn disabled_cache_calls_through() {
        let cache = Cache::disabled();
        assert!(!cache.is_enabled());

        let value = cache
            .get_or(CacheKey::Tags, || async { Ok::<_, ApiError>(vec![1, 2, 3]) })
            .await
            .unwrap();

        assert_eq!(value, vec![1, 2, 3]);
    }
}
