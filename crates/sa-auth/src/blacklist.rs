//! Revoked token list
//!
//! The token string itself is the key, so a lookup costs one GET.

use sa_core::{AuthError, AuthResult};
use sa_kv::KvStore;
use std::sync::Arc;
use std::time::Duration;

const BLACKLISTED: &str = "blacklisted";

#[derive(Clone)]
pub struct TokenBlacklist {
    store: Arc<dyn KvStore>,
}

impl TokenBlacklist {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Revoke a token for the rest of its lifetime
    pub async fn add(&self, token: &str, remaining: Duration) -> AuthResult<()> {
        if remaining.is_zero() {
            return Ok(());
        }
        self.store
            .set(token, BLACKLISTED, Some(remaining))
            .await
            .map_err(AuthError::internal)
    }

    pub async fn contains(&self, token: &str) -> AuthResult<bool> {
        let value = self.store.get(token).await.map_err(AuthError::internal)?;
        Ok(value.as_deref() == Some(BLACKLISTED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_kv::MemoryStore;

    #[tokio::test]
    async fn test_add_and_contains() {
        let store = Arc::new(MemoryStore::new());
        let blacklist = TokenBlacklist::new(store.clone());

        assert!(!blacklist.contains("tok").await.unwrap());
        blacklist.add("tok", Duration::from_secs(120)).await.unwrap();
        assert!(blacklist.contains("tok").await.unwrap());

        let ttl = store.ttl("tok").unwrap();
        assert!(ttl <= Duration::from_secs(120) && ttl > Duration::from_secs(115));
    }

    #[tokio::test]
    async fn test_expired_token_is_not_stored() {
        let store = Arc::new(MemoryStore::new());
        let blacklist = TokenBlacklist::new(store.clone());
        blacklist.add("tok", Duration::ZERO).await.unwrap();
        assert!(!store.contains("tok"));
    }
}
