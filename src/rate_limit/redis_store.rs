use redis::aio::ConnectionManager;
use redis::Client;
use rocket::tokio::time::timeout;
use tracing::info;

use std::time::Duration;

use super::store::{CounterStore, StoreError, WindowCount};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Counters shared between instances through Redis.
///
/// A key's first hit in a window sets its expiry; the counter and its
/// remaining lifetime are read back in the same atomic pipeline.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<RedisStore, StoreError> {
        let client = Client::open(redis_url)?;
        let connection = match timeout(CONNECT_TIMEOUT, client.get_connection_manager()).await {
            Ok(connection) => connection?,
            Err(_) => {
                return Err(redis::RedisError::from((
                    redis::ErrorKind::IoError,
                    "timed out connecting to redis",
                ))
                .into())
            }
        };

        info!("connected to redis rate limit store");

        Ok(RedisStore { connection })
    }
}

#[rocket::async_trait]
impl CounterStore for RedisStore {
    async fn hit(&self, key: &str, length: Duration) -> Result<WindowCount, StoreError> {
        let mut connection = self.connection.clone();
        let key = format!("rl:{}", key);
        let window_ms = length.as_millis() as i64;

        let (count, ttl_ms): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&key)
            .cmd("PTTL")
            .arg(&key)
            .query_async(&mut connection)
            .await?;

        let ttl_ms = if ttl_ms < 0 {
            redis::cmd("PEXPIRE")
                .arg(&key)
                .arg(window_ms)
                .query_async::<_, ()>(&mut connection)
                .await?;
            window_ms
        } else {
            ttl_ms
        };

        Ok(WindowCount {
            count,
            reset_after: Duration::from_millis(ttl_ms as u64),
        })
    }
}
