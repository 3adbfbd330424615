//! Shared leaf types for the pairing workspace.
//!
//! This crate holds the small pieces every other crate leans on: error
//! location tracking and credential handling. It has no protocol logic.
//!
//! ## Architecture
//!
//! - **common** (this crate): Error location, redacted credentials
//! - **pairing-core**: Wire protocol and pairing clients
//! - **pairing-agent**: Application wiring everything together

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_token::RedactedToken;

#[cfg(test)]
mod tests;
