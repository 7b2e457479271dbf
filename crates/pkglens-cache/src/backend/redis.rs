//! Redis backend.

use std::time::{Duration, Instant};

use ::redis::aio::ConnectionManager;
use ::redis::{Client, RedisError};
use async_trait::async_trait;
use parking_lot::Mutex;
use pkglens_core::{Error, Result};
use tracing::{debug, warn};

use super::CacheBackend;

/// Shared Redis store addressed by connection URL.
///
/// The connection is opened on first use, so an unreachable server at startup
/// only degrades lookups to cache misses. Every command is bounded by
/// `operation_timeout`.
///
/// Only one caller at a time attempts to connect. Callers arriving while that
/// attempt runs, or within `operation_timeout` of a failed attempt, fail
/// immediately instead of queueing behind it.
pub struct RedisBackend {
    client: Client,
    connection: Mutex<ConnectionState>,
    operation_timeout: Duration,
}

enum ConnectionState {
    Idle,
    Connecting { since: Instant },
    Connected(ConnectionManager),
    Failed { at: Instant },
}

impl RedisBackend {
    /// Create a backend for `url` without connecting yet
    pub fn open(url: &str, operation_timeout: Duration) -> Result<Self> {
        let client = Client::open(url).map_err(|e| Error::ConfigValidation {
            field: "cache.redis_url".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            connection: Mutex::new(ConnectionState::Idle),
            operation_timeout,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        {
            let mut state = self.connection.lock();
            match &*state {
                ConnectionState::Connected(manager) => return Ok(manager.clone()),
                // A stale attempt belongs to a caller that was cancelled mid-connect
                ConnectionState::Connecting { since }
                    if since.elapsed() < self.operation_timeout =>
                {
                    return Err(unavailable("Redis connection attempt in progress"));
                },
                ConnectionState::Failed { at } if at.elapsed() < self.operation_timeout => {
                    return Err(unavailable("Redis connection recently failed"));
                },
                _ => {},
            }
            *state = ConnectionState::Connecting {
                since: Instant::now(),
            };
        }

        debug!("Connecting to Redis");
        let result = self
            .bounded("CONNECT", ConnectionManager::new(self.client.clone()))
            .await;

        let mut state = self.connection.lock();
        match result {
            Ok(manager) => {
                *state = ConnectionState::Connected(manager.clone());
                Ok(manager)
            },
            Err(e) => {
                warn!("Redis connection failed: {}", e);
                *state = ConnectionState::Failed { at: Instant::now() };
                Err(e)
            },
        }
    }

    async fn bounded<T, F>(&self, command: &str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = std::result::Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::cache(format!("Redis {command} failed"), e)),
            Err(elapsed) => Err(Error::cache(format!("Redis {command} timed out"), elapsed)),
        }
    }
}

fn unavailable(message: &str) -> Error {
    Error::CacheUnavailable {
        message: message.to_string(),
        source: None,
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connected = matches!(*self.connection.lock(), ConnectionState::Connected(_));
        f.debug_struct("RedisBackend")
            .field("connected", &connected)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let cmd = ::redis::cmd("GET").arg(key).clone();
        self.bounded("GET", cmd.query_async::<_, Option<Vec<u8>>>(&mut conn))
            .await
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        let cmd = ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .clone();
        self.bounded("SET", cmd.query_async::<_, ()>(&mut conn)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let cmd = ::redis::cmd("DEL").arg(key).clone();
        self.bounded("DEL", cmd.query_async::<_, ()>(&mut conn)).await
    }
}
