//! # sa-db
//!
//! Database layer for SuperApp RS.
//!
//! This crate provides PostgreSQL access using SQLx for the records the
//! authentication core reads and writes:
//!
//! - Connection pool management
//! - Repository traits the core depends on
//! - Postgres repositories for users, password resets, OAuth clients and
//!   employee/student profiles
//! - In-memory repositories with the same behavior, for tests and local runs
//!
//! ## Example
//!
//! ```ignore
//! use sa_db::{Database, PgUserRepository, PoolSettings, UserDirectory};
//!
//! let db = Database::connect(&PoolSettings::from_app(&config.database)).await?;
//! let users = PgUserRepository::new(db.pool().clone());
//! let alice = users.find_by_email("alice@example.com").await?;
//! ```

pub mod memory;
pub mod oauth_clients;
pub mod password_resets;
pub mod pool;
pub mod profiles;
pub mod repository;
pub mod users;

pub use memory::{MemoryOAuthClients, MemoryPasswordResets, MemoryProfiles, MemoryUserDirectory};
pub use oauth_clients::PgOAuthClientRepository;
pub use password_resets::PgPasswordResetRepository;
pub use pool::{Database, PoolSettings};
pub use profiles::PgProfileRepository;
pub use repository::{
    OAuthClientStore, PasswordResetStore, ProfileDirectory, RepositoryError, RepositoryResult,
    UserDirectory,
};
pub use users::PgUserRepository;
