//! # sa-kv
//!
//! Key-value session store used by the authentication core.
//!
//! Everything that has to survive across requests lives here: the token
//! blacklist, CSRF token sets, SSO sessions, authorization codes, email
//! verification tokens, rate limit counters and the `/me` cache.
//!
//! ## Backends
//!
//! - [`RedisStore`]: production backend on a multiplexed connection manager
//! - [`MemoryStore`]: in-process backend with the same TTL semantics

pub mod memory;
pub mod redis_store;
pub mod store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{get_json, set_json, KvError, KvResult, KvStore};
