//! In-memory backend (for development/testing)
//!
//! Expired keys are dropped lazily when touched, matching what a caller can
//! observe from Redis.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::store::{KvError, KvResult, KvStore};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining TTL of a live key, `None` when missing or persistent
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock();
        let entry = entries.get(key).filter(|e| e.is_live(now))?;
        entry.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Whether a live key exists
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|e| e.is_live(now))
    }

    /// Live keys starting with `prefix`
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    fn live_entry<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let mut entries = self.entries.lock();
        match Self::live_entry(&mut entries, key, Instant::now()) {
            None => Ok(None),
            Some(Entry { value: Value::Text(v), .. }) => Ok(Some(v.clone())),
            Some(_) => Err(KvError::WrongType(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> KvResult<()> {
        let mut entries = self.entries.lock();
        if ttl.is_some_and(|t| t.is_zero()) {
            entries.remove(key);
            return Ok(());
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );
        Ok(())
    }

    async fn take(&self, key: &str) -> KvResult<Option<String>> {
        let mut entries = self.entries.lock();
        let is_text = match Self::live_entry(&mut entries, key, Instant::now()) {
            None => return Ok(None),
            Some(entry) => matches!(entry.value, Value::Text(_)),
        };
        if !is_text {
            return Err(KvError::WrongType(key.to_string()));
        }
        match entries.remove(key) {
            Some(Entry { value: Value::Text(v), .. }) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        let mut entries = self.entries.lock();
        let existed = Self::live_entry(&mut entries, key, Instant::now()).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn incr(&self, key: &str) -> KvResult<i64> {
        let mut entries = self.entries.lock();
        if let Some(entry) = Self::live_entry(&mut entries, key, Instant::now()) {
            let Value::Text(v) = &mut entry.value else {
                return Err(KvError::WrongType(key.to_string()));
            };
            let next = v
                .parse::<i64>()
                .map_err(|_| KvError::NotAnInteger(key.to_string()))?
                + 1;
            *v = next.to_string();
            return Ok(next);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text("1".to_string()),
                expires_at: None,
            },
        );
        Ok(1)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> KvResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match Self::live_entry(&mut entries, key, now) {
            None => Ok(false),
            Some(entry) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> KvResult<bool> {
        let mut entries = self.entries.lock();
        if let Some(entry) = Self::live_entry(&mut entries, key, Instant::now()) {
            let Value::Set(set) = &mut entry.value else {
                return Err(KvError::WrongType(key.to_string()));
            };
            return Ok(set.insert(member.to_string()));
        }
        let mut set = HashSet::new();
        set.insert(member.to_string());
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Set(set),
                expires_at: None,
            },
        );
        Ok(true)
    }

    async fn set_remove(&self, key: &str, member: &str) -> KvResult<bool> {
        let mut entries = self.entries.lock();
        let (removed, now_empty) = match Self::live_entry(&mut entries, key, Instant::now()) {
            None => return Ok(false),
            Some(entry) => {
                let Value::Set(set) = &mut entry.value else {
                    return Err(KvError::WrongType(key.to_string()));
                };
                let removed = set.remove(member);
                (removed, set.is_empty())
            }
        };
        // Redis drops a set once its last member is removed
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }

    async fn ping(&self) -> KvResult<()> {
        Ok(())
    }
}
