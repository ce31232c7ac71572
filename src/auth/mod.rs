//! Authentication module
//!
//! Supports: no auth, Basic, API key (header or query) and Bearer token.
//! Used by the REST API connector, whose resources pick a strategy per
//! configuration.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{Authentication, Location};
