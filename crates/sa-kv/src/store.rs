//! Store trait and JSON helpers

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Key-value store errors
#[derive(Debug, Error)]
pub enum KvError {
    #[error("store unavailable: {0}")]
    Backend(String),
    #[error("wrong value type at key {0}")]
    WrongType(String),
    #[error("value at key {0} is not an integer")]
    NotAnInteger(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for KvError {
    fn from(err: redis::RedisError) -> Self {
        KvError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for KvError {
    fn from(err: serde_json::Error) -> Self {
        KvError::Serialization(err.to_string())
    }
}

pub type KvResult<T> = Result<T, KvError>;

/// String keys to string values or string sets, each with an optional TTL.
///
/// `take`, `incr` and `set_remove` are atomic: two concurrent callers can
/// never both observe the same value being removed or the same counter value.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a string value
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Set a string value; a zero TTL removes the key
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> KvResult<()>;

    /// Atomically get and delete a string value
    async fn take(&self, key: &str) -> KvResult<Option<String>>;

    /// Delete a key, returns whether it existed
    async fn delete(&self, key: &str) -> KvResult<bool>;

    /// Atomically increment an integer counter, creating it at 1
    async fn incr(&self, key: &str) -> KvResult<i64>;

    /// Set the TTL of an existing key, returns whether the key exists
    async fn expire(&self, key: &str, ttl: Duration) -> KvResult<bool>;

    /// Add a member to a set, returns whether it was newly added
    async fn set_add(&self, key: &str, member: &str) -> KvResult<bool>;

    /// Remove a member from a set, returns whether it was present
    async fn set_remove(&self, key: &str, member: &str) -> KvResult<bool>;

    /// Check connectivity
    async fn ping(&self) -> KvResult<()>;
}

/// Read and deserialize a JSON value
pub async fn get_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> KvResult<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and store a JSON value
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> KvResult<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw, ttl).await
}
