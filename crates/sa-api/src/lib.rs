//! # sa-api
//!
//! HTTP surface of the SuperApp RS auth gateway.
//!
//! JSON endpoints for first-party frontends under `/api/v1/auth`, the
//! authorization-code provider and server-rendered login under
//! `/api/v1/oauth`, and Google sign-in.

pub mod error;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod redirects;
pub mod response;
pub mod routes;
pub mod views;

pub use extractors::{AppState, Backends};
pub use routes::router;
