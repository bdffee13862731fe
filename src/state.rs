use std::sync::Arc;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{cache::cache::Cache, config::Config, error::ApiError, jwt::SessionKeys};

pub struct State {
    pub pool: Pool<Postgres>,
    pub cache: Cache,
    pub keys: SessionKeys,
    pub config: Config,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, ApiError> {
        log::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        log::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ApiError::Internal(format!("Migration failed: {e}")))?;

        let cache = match &config.redis_url {
            Some(url) => {
                log::info!("Connecting to cache...");
                Cache::connect(url, config.cache_ttl_seconds).await?
            }
            None => {
                log::warn!("REDIS_URL not set, catalog cache disabled");
                Cache::disabled()
            }
        };

        Self::with_pool(pool, cache, config)
    }

    /// Builds state around an existing pool without touching the database.
    pub fn with_pool(pool: Pool<Postgres>, cache: Cache, config: Config) -> Result<Arc<Self>, ApiError> {
        let keys = SessionKeys::new(config.jwt_secret.as_bytes(), config.jwt_ttl_hours)?;
        log::info!("Catalog cache enabled: {}", cache.is_enabled());

        Ok(Arc::new(Self {
            pool,
            cache,
            keys,
            config,
        }))
    }
}
