//! # sa-notifications
//!
//! Email delivery for SuperApp RS.
//!
//! ## Features
//!
//! - `EmailSender` trait with a logging sender for development
//! - Recording sender for tests
//! - Password reset and email verification templates

pub mod email;
pub mod templates;

pub use email::{
    ConsoleEmailSender, EmailAddress, EmailError, EmailMessage, EmailResult, EmailSender,
    RecordingEmailSender,
};
pub use templates::AuthMailer;
