//! Authenticator implementation
//!
//! Applies an [`Authentication`] strategy to outgoing requests.

use super::types::{Authentication, Location};
use crate::error::Result;
use reqwest::RequestBuilder;

/// Authenticator handles applying authentication to HTTP requests
#[derive(Debug, Clone)]
pub struct Authenticator {
    config: Authentication,
}

impl Authenticator {
    /// Create a new authenticator with the given strategy
    pub fn new(config: Authentication) -> Self {
        Self { config }
    }

    /// The configured strategy
    pub fn config(&self) -> &Authentication {
        &self.config
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let Some((key, value)) = self.config.to_header_or_query()? else {
            return Ok(req);
        };

        Ok(match self.config.location() {
            Location::Header => req.header(key, value),
            Location::Query => req.query(&[(key, value)]),
        })
    }
}
