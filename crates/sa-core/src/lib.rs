//! # sa-core
//!
//! Core types shared by every SuperApp RS crate.
//!
//! This crate provides:
//! - The authentication error taxonomy and its HTTP mapping
//! - Field validation errors
//! - Result type aliases
//! - Configuration types loaded from the environment
//! - HTML escaping for rendered pages

pub mod config;
pub mod error;
pub mod html;
pub mod result;

pub use error::*;
pub use result::*;
