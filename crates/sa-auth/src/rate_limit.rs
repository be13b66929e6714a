//! Fixed-window login rate limiting per client address
//!
//! Counter key: `rl:login:<ip>:<window slot>`. The counter outlives its
//! window by two seconds so a slow INCR at the boundary still finds it.
//! Store errors and timeouts let the request through.

use sa_core::{AuthError, AuthResult};
use sa_kv::KvStore;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const STORE_TIMEOUT: Duration = Duration::from_secs(1);
const EXPIRY_GRACE_SECONDS: u64 = 2;

#[derive(Clone)]
pub struct LoginRateLimiter {
    store: Arc<dyn KvStore>,
    max_requests: u64,
    window_seconds: u64,
    timeout: Duration,
}

impl LoginRateLimiter {
    pub fn new(store: Arc<dyn KvStore>, max_requests: u64, window_seconds: u64) -> Self {
        Self {
            store,
            max_requests,
            window_seconds: window_seconds.max(1),
            timeout: STORE_TIMEOUT,
        }
    }

    pub fn from_config(store: Arc<dyn KvStore>, config: &sa_core::config::AppConfig) -> Self {
        let limits = &config.auth.rate_limit;
        Self::new(store, limits.max_requests, limits.window_seconds)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn check(&self, ip: &str) -> AuthResult<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.check_at(ip, now).await
    }

    /// Count one attempt at `now` (Unix seconds)
    pub async fn check_at(&self, ip: &str, now: u64) -> AuthResult<()> {
        let slot = now / self.window_seconds;
        let key = format!("rl:login:{}:{}", ip, slot);

        let count = match tokio::time::timeout(self.timeout, self.count(&key)).await {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, ip = %ip, "Rate limiter store error, allowing request");
                return Ok(());
            }
            Err(_) => {
                tracing::warn!(ip = %ip, "Rate limiter timed out, allowing request");
                return Ok(());
            }
        };

        if count > self.max_requests as i64 {
            let retry_after_seconds = (self.window_seconds - now % self.window_seconds).max(1);
            tracing::info!(ip = %ip, count, "Login rate limit exceeded");
            return Err(AuthError::RateLimited { retry_after_seconds });
        }
        Ok(())
    }

    async fn count(&self, key: &str) -> sa_kv::KvResult<i64> {
        let count = self.store.incr(key).await?;
        if count == 1 {
            self.store
                .expire(key, Duration::from_secs(self.window_seconds + EXPIRY_GRACE_SECONDS))
                .await?;
        }
        Ok(count)
    }
}
