use super::{CacheError, CacheStore, CachedWeather};
use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client as RedisClient};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

const KEY_PREFIX: &str = "weather:";
const SCAN_BATCH: usize = 200;

/// External store for deployments with several proxy instances.
///
/// Connection setup and each command are bounded by `timeout`; entries are
/// written with a Redis expiry matching the cache TTL.
pub struct RedisStore {
    client: RedisClient,
    ttl: Duration,
    timeout: Duration,
}

impl RedisStore {
    pub fn new(redis_url: &str, ttl: Duration, timeout: Duration) -> Result<Self, CacheError> {
        let client = RedisClient::open(redis_url)?;
        Ok(Self {
            client,
            ttl,
            timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        self.bounded("connect", self.client.get_multiplexed_async_connection())
            .await
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, ::redis::RedisError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout(op)),
        }
    }

    fn expiry_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

fn redis_key(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

/// One incremental `SCAN` step over this store's keys.
fn scan_batch(cursor: u64) -> ::redis::Cmd {
    let mut cmd = ::redis::cmd("SCAN");
    cmd.arg(cursor)
        .arg("MATCH")
        .arg(format!("{}*", KEY_PREFIX))
        .arg("COUNT")
        .arg(SCAN_BATCH);
    cmd
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CachedWeather>, CacheError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = self.bounded("get", conn.get(redis_key(key))).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, entry: CachedWeather) -> Result<(), CacheError> {
        let json = serde_json::to_string(&entry)?;
        let mut conn = self.connection().await?;
        let _: () = self
            .bounded("set", conn.set_ex(redis_key(key), json, self.expiry_secs()))
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = self.bounded("del", conn.del(redis_key(key))).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let mut cursor = 0u64;

        loop {
            let (next, keys): (u64, Vec<String>) = self
                .bounded("scan", scan_batch(cursor).query_async(&mut conn))
                .await?;

            if !keys.is_empty() {
                let _: () = self.bounded("del", conn.del(keys)).await?;
            }
            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_prefixed() {
        assert_eq!(redis_key("city:Paris:metric"), "weather:city:Paris:metric");
    }

    #[test]
    fn test_clear_scans_incrementally() {
        let packed = String::from_utf8(scan_batch(42).get_packed_command()).unwrap();

        assert!(packed.contains("SCAN"));
        assert!(packed.contains("\r\n42\r\n"));
        assert!(packed.contains("MATCH"));
        assert!(packed.contains("weather:*"));
        assert!(packed.contains("COUNT"));
        assert!(!packed.contains("KEYS"));
    }

    #[test]
    fn test_rejects_malformed_url() {
        let result = RedisStore::new(
            "not a url",
            Duration::from_secs(600),
            Duration::from_millis(100),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // Nothing listens on port 1; the call must fail instead of hanging.
        let store = RedisStore::new(
            "redis://127.0.0.1:1/",
            Duration::from_secs(600),
            Duration::from_millis(200),
        )
        .unwrap();

        assert!(store.get("city:Paris:metric").await.is_err());
    }

    #[test]
    fn test_expiry_never_zero() {
        let store = RedisStore::new(
            "redis://127.0.0.1/",
            Duration::from_millis(10),
            Duration::from_millis(100),
        )
        .unwrap();
        assert_eq!(store.expiry_secs(), 1);
    }
}
