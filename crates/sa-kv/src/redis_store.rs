//! Redis backend
//!
//! Uses a multiplexed [`ConnectionManager`] which reconnects on its own; the
//! handle is cloned per call. `take` needs GETDEL (Redis 6.2+).

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;

use crate::store::{KvResult, KvStore};

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the given `redis://` URL
    pub async fn connect(url: &str) -> KvResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to redis");
        Ok(Self { conn })
    }

    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

fn millis(ttl: Duration) -> u64 {
    ttl.as_millis().min(u64::MAX as u128) as u64
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> KvResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) if ttl.is_zero() => {
                let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            }
            Some(ttl) => {
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(millis(ttl))
                    .query_async(&mut conn)
                    .await?;
            }
            None => {
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .query_async(&mut conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn take(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GETDEL").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn incr(&self, key: &str) -> KvResult<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> KvResult<bool> {
        let mut conn = self.conn.clone();
        let applied: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(applied == 1)
    }

    async fn set_add(&self, key: &str, member: &str) -> KvResult<bool> {
        let mut conn = self.conn.clone();
        let added: i64 = redis::cmd("SADD").arg(key).arg(member).query_async(&mut conn).await?;
        Ok(added > 0)
    }

    async fn set_remove(&self, key: &str, member: &str) -> KvResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("SREM").arg(key).arg(member).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> KvResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
