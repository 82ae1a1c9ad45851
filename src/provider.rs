//! The optional key/value store backing the service.

use crate::config::StoreConfig;
use anyhow::Context;
use redis::Client;
use redis::aio::ConnectionManager;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// Upper bound for establishing and verifying the store connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A verified, pooled Redis connection.
///
/// Cloning is cheap and all clones share the underlying connection, which reconnects on its own.
#[derive(Clone)]
pub struct RedisProvider {
    // Kept open so every clone shares one reconnecting connection.
    _connection: ConnectionManager,
    url: String,
}

impl Debug for RedisProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisProvider").field("url", &self.url).finish()
    }
}

impl RedisProvider {
    /// Connects to the configured store and verifies it answers a `PING`.
    pub async fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        let url = redis_url(&config.address);
        let client = Client::open(url.as_str())
            .with_context(|| format!("Failed to create Redis client for {}", url))?;

        let connection = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let mut connection = ConnectionManager::new(client).await?;
            let _: String = redis::cmd("PING").query_async(&mut connection).await?;
            Ok::<_, redis::RedisError>(connection)
        })
        .await
        .with_context(|| format!("Timed out connecting to Redis at {}", url))?
        .with_context(|| format!("Failed to connect to Redis at {}", url))?;

        Ok(RedisProvider {
            _connection: connection,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Accepts `host:port` as well as complete `redis://` or `rediss://` URLs.
pub fn redis_url(address: &str) -> String {
    if address.starts_with("redis://") || address.starts_with("rediss://") {
        address.to_string()
    } else {
        format!("redis://{}", address)
    }
}

/// Constructs the store provider during startup.
pub trait ProviderFactory {
    fn connect(
        &self,
        config: &StoreConfig,
    ) -> impl Future<Output = anyhow::Result<RedisProvider>> + Send;
}

/// Connects to a real Redis server.
#[derive(Clone, Copy, Debug, Default)]
pub struct RedisConnector;

impl ProviderFactory for RedisConnector {
    fn connect(
        &self,
        config: &StoreConfig,
    ) -> impl Future<Output = anyhow::Result<RedisProvider>> + Send {
        let config = config.clone();
        async move { RedisProvider::connect(&config).await }
    }
}
