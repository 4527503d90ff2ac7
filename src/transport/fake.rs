//! Scripted transport
//!
//! [`FakeTransport`] replays a queue of registered [`Expectation`]s in
//! order. Each incoming request must match the next expectation (method,
//! service, interface, path, query set and, when given, body); the
//! expectation's reply is returned and the call is recorded. Tests finish
//! with [`FakeTransport::assert_calls`] to check nothing registered was left
//! unconsumed.

use super::{Method, Transport, TransportRequest, TransportResponse, DEFAULT_INTERFACE};
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// What the fake answers with
#[derive(Debug, Clone)]
pub enum Reply {
    Json { status: u16, body: Value },
    Raw { status: u16, body: String },
    ConnectionError(String),
}

/// One expected request and its scripted reply
#[derive(Debug, Clone)]
pub struct Expectation {
    method: Method,
    service_type: String,
    interface: String,
    path: String,
    query: BTreeSet<(String, String)>,
    body: Option<Value>,
    reply: Reply,
}

impl Expectation {
    pub fn new(method: Method, service_type: &str, path: &str) -> Self {
        Self {
            method,
            service_type: service_type.to_string(),
            interface: DEFAULT_INTERFACE.to_string(),
            path: path.to_string(),
            query: BTreeSet::new(),
            body: None,
            reply: Reply::Raw {
                status: 200,
                body: String::new(),
            },
        }
    }

    pub fn get(service_type: &str, path: &str) -> Self {
        Self::new(Method::GET, service_type, path)
    }

    pub fn post(service_type: &str, path: &str) -> Self {
        Self::new(Method::POST, service_type, path)
    }

    pub fn put(service_type: &str, path: &str) -> Self {
        Self::new(Method::PUT, service_type, path)
    }

    pub fn delete(service_type: &str, path: &str) -> Self {
        Self::new(Method::DELETE, service_type, path)
    }

    pub fn interface(mut self, interface: &str) -> Self {
        self.interface = interface.to_string();
        self
    }

    /// Query pairs the request must carry, in any order
    pub fn query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// JSON body the request must carry
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn reply_json(mut self, status: u16, body: Value) -> Self {
        self.reply = Reply::Json { status, body };
        self
    }

    pub fn reply_raw(mut self, status: u16, body: impl Into<String>) -> Self {
        self.reply = Reply::Raw {
            status,
            body: body.into(),
        };
        self
    }

    /// Empty body with the given status
    pub fn reply_status(self, status: u16) -> Self {
        self.reply_raw(status, "")
    }

    pub fn reply_connection_error(mut self, message: &str) -> Self {
        self.reply = Reply::ConnectionError(message.to_string());
        self
    }

    fn mismatch(&self, request: &TransportRequest) -> Option<String> {
        let query: BTreeSet<(String, String)> = request.query.iter().cloned().collect();

        if request.method != self.method
            || request.service_type != self.service_type
            || request.interface != self.interface
            || request.path != self.path
        {
            return Some(format!(
                "expected {} {}:{} {}, got {} {}:{} {}",
                self.method,
                self.service_type,
                self.interface,
                self.path,
                request.method,
                request.service_type,
                request.interface,
                request.path
            ));
        }
        if query != self.query {
            return Some(format!(
                "query mismatch on {}: expected {:?}, got {:?}",
                self.path, self.query, query
            ));
        }
        if let Some(expected) = &self.body {
            if request.body.as_ref() != Some(expected) {
                return Some(format!(
                    "body mismatch on {}: expected {}, got {}",
                    self.path,
                    expected,
                    request.body.as_ref().map(Value::to_string).unwrap_or_default()
                ));
            }
        }
        None
    }
}

/// Transport that answers from a queue of expectations
#[derive(Debug, Default)]
pub struct FakeTransport {
    expected: Mutex<VecDeque<Expectation>>,
    calls: Mutex<Vec<TransportRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append expectations to the queue
    pub fn register(&self, expectations: impl IntoIterator<Item = Expectation>) {
        lock(&self.expected).extend(expectations);
    }

    /// Every request received so far, matched or not
    pub fn calls(&self) -> Vec<TransportRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of registered expectations not yet consumed
    pub fn pending(&self) -> usize {
        lock(&self.expected).len()
    }

    /// Panics if any registered expectation was not consumed.
    pub fn assert_calls(&self) {
        let pending = lock(&self.expected);
        assert!(
            pending.is_empty(),
            "{} expected request(s) never made, next: {} {}",
            pending.len(),
            pending[0].method,
            pending[0].path
        );
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        lock(&self.calls).push(request.clone());

        let next = lock(&self.expected).pop_front();
        let Some(expectation) = next else {
            return Err(TransportError::Unexpected(format!(
                "{} {} (no more expectations)",
                request.method, request.path
            )));
        };

        if let Some(reason) = expectation.mismatch(&request) {
            return Err(TransportError::Unexpected(reason));
        }

        match expectation.reply {
            Reply::Json { status, body } => Ok(TransportResponse::json(status, &body)),
            Reply::Raw { status, body } => Ok(TransportResponse::new(status, body)),
            Reply::ConnectionError(message) => Err(TransportError::Connection(message)),
        }
    }
}
