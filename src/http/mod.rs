//! HTTP client module
//!
//! Every vendor talks HTTP through [`HttpClient`], which turns vendor error
//! envelopes and transport failures into end-user messages.

mod client;

pub use client::{
    Body, ErrorBody, ErrorExtractor, HttpClient, HttpClientConfig, HttpClientConfigBuilder,
    HttpResponse, RequestConfig, DEFAULT_TIMEOUT, MIME_TYPE_JSON,
};
