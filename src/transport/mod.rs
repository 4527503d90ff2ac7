//! Transport layer
//!
//! The lifecycle engine never talks HTTP directly. It hands a
//! [`TransportRequest`] to a [`Transport`] and gets back a status code and
//! the raw response body; interpreting the outcome is the error translator's
//! job.
//!
//! # Module Structure
//!
//! - [`http`] - `reqwest` transport against configured service endpoints
//! - [`fake`] - scripted transport that replays registered request/response pairs
//! - [`memory`] - stateful in-memory cloud simulating the service wire format

pub mod fake;
pub mod http;
pub mod memory;

use crate::error::TransportError;
use async_trait::async_trait;
pub use reqwest::Method;
use serde_json::Value;

/// Interface used when the caller does not pick one.
pub const DEFAULT_INTERFACE: &str = "public";

/// One call against a service endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    /// Target service, e.g. `network`
    pub service_type: String,
    /// Endpoint interface, e.g. `public`
    pub interface: String,
    /// Path relative to the service endpoint, with a leading slash
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn new(method: Method, service_type: &str, interface: &str, path: impl Into<String>) -> Self {
        Self {
            method,
            service_type: service_type.to_string(),
            interface: interface.to_string(),
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and undecoded body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues calls to a named service endpoint.
///
/// Implementations return `Ok` for every response that carries a status,
/// successful or not, and `Err` only when no response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
