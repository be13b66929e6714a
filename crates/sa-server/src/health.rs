//! Liveness and readiness
//!
//! `/health` and `/health/live` only prove the process answers. Readiness
//! pings every backing service the auth flows need; a single failure makes
//! the gateway not ready, since login cannot work without either store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use sa_db::Database;
use sa_kv::KvStore;
use serde::Serialize;
use tokio::sync::Mutex;

/// A backing service that can be pinged
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;
    async fn ping(&self) -> Result<(), String>;
}

pub struct PostgresProbe(pub Database);

#[async_trait]
impl Probe for PostgresProbe {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), String> {
        self.0.ping().await.map_err(|e| e.to_string())
    }
}

pub struct RedisProbe(pub Arc<dyn KvStore>);

#[async_trait]
impl Probe for RedisProbe {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<(), String> {
        self.0.ping().await.map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub name: &'static str,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub version: &'static str,
    pub checks: Vec<ProbeOutcome>,
    pub checked_at: DateTime<Utc>,
}

impl Readiness {
    pub fn http_status(&self) -> StatusCode {
        if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Runs the probes, reusing the last result for `reuse_for`
pub struct ReadinessCheck {
    probes: Vec<Box<dyn Probe>>,
    timeout: Duration,
    reuse_for: Duration,
    last: Mutex<Option<(Instant, Readiness)>>,
}

impl ReadinessCheck {
    pub fn new(timeout: Duration, reuse_for: Duration) -> Self {
        Self {
            probes: Vec::new(),
            timeout,
            reuse_for,
            last: Mutex::new(None),
        }
    }

    pub fn with_probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub async fn run(&self) -> Readiness {
        // held across the probes so concurrent callers share one round
        let mut last = self.last.lock().await;
        if let Some((at, readiness)) = last.as_ref() {
            if at.elapsed() < self.reuse_for {
                return readiness.clone();
            }
        }

        let mut checks = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            checks.push(self.ping(probe.as_ref()).await);
        }
        let readiness = Readiness {
            ready: checks.iter().all(|c| c.status == Status::Up),
            version: env!("CARGO_PKG_VERSION"),
            checks,
            checked_at: Utc::now(),
        };

        *last = Some((Instant::now(), readiness.clone()));
        readiness
    }

    async fn ping(&self, probe: &dyn Probe) -> ProbeOutcome {
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, probe.ping())
            .await
            .unwrap_or_else(|_| Err(format!("no answer within {:?}", self.timeout)));
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => ProbeOutcome {
                name: probe.name(),
                status: Status::Up,
                error: None,
                latency_ms,
            },
            Err(error) => {
                tracing::warn!(service = probe.name(), error = %error, "Readiness probe failed");
                ProbeOutcome {
                    name: probe.name(),
                    status: Status::Down,
                    error: Some(error),
                    latency_ms,
                }
            }
        }
    }
}

impl Default for ReadinessCheck {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(5))
    }
}

#[derive(Clone)]
pub struct HealthState {
    pub readiness: Arc<ReadinessCheck>,
}

/// GET /health, GET /health/live
pub async fn liveness() -> &'static str {
    "OK"
}

/// GET /health/ready
pub async fn readiness(State(state): State<HealthState>) -> (StatusCode, Json<Readiness>) {
    let readiness = state.readiness.run().await;
    (readiness.http_status(), Json(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_kv::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Refused;

    #[async_trait]
    impl Probe for Refused {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn ping(&self) -> Result<(), String> {
            Err("connection refused".to_string())
        }
    }

    struct Hangs;

    #[async_trait]
    impl Probe for Hangs {
        fn name(&self) -> &'static str {
            "postgres"
        }

        async fn ping(&self) -> Result<(), String> {
            std::future::pending().await
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Probe for Counting {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn ping(&self) -> Result<(), String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ready_with_reachable_store() {
        let check = ReadinessCheck::default().with_probe(RedisProbe(Arc::new(MemoryStore::new())));
        let readiness = check.run().await;

        assert!(readiness.ready);
        assert_eq!(readiness.checks.len(), 1);
        assert_eq!(readiness.checks[0].name, "redis");
        assert_eq!(readiness.http_status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_one_failed_probe_means_not_ready() {
        let check = ReadinessCheck::default()
            .with_probe(RedisProbe(Arc::new(MemoryStore::new())))
            .with_probe(Refused);
        let readiness = check.run().await;

        assert!(!readiness.ready);
        assert_eq!(readiness.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(readiness.checks[1].status, Status::Down);
        assert_eq!(readiness.checks[1].error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_hanging_probe_times_out() {
        let check = ReadinessCheck::new(Duration::from_millis(20), Duration::ZERO).with_probe(Hangs);
        let readiness = check.run().await;

        assert!(!readiness.ready);
        assert!(readiness.checks[0].error.as_deref().unwrap().starts_with("no answer within"));
    }

    #[tokio::test]
    async fn test_result_is_reused() {
        let pings = Arc::new(AtomicUsize::new(0));
        let check = ReadinessCheck::new(Duration::from_secs(1), Duration::from_secs(60))
            .with_probe(Counting(pings.clone()));

        let first = check.run().await;
        let second = check.run().await;
        assert_eq!(first.checked_at, second.checked_at);
        assert_eq!(pings.load(Ordering::SeqCst), 1);

        let fresh = ReadinessCheck::new(Duration::from_secs(1), Duration::ZERO)
            .with_probe(Counting(pings.clone()));
        fresh.run().await;
        fresh.run().await;
        assert_eq!(pings.load(Ordering::SeqCst), 3);
    }
}
