//! API request handlers

pub mod auth;
pub mod google;
pub mod oauth;
