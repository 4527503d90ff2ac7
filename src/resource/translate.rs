//! Error translator
//!
//! Turns the outcome of a transport call into either a decoded body or a
//! [`CloudError`] carrying the operation context. Nothing here retries.

use crate::error::{CloudError, TransportError};
use crate::transport::http::sanitize_for_log;
use crate::transport::TransportResponse;
use serde_json::Value;
use std::fmt;

/// Lifecycle step a transport call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Get => "get",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// What was being attempted, for error messages
#[derive(Debug, Clone)]
pub struct OpContext {
    pub action: Action,
    /// Singular resource name for single-item actions, plural for lists
    pub resource: String,
    pub target: Option<String>,
}

impl OpContext {
    pub fn new(action: Action, resource: &str, target: Option<&str>) -> Self {
        Self {
            action,
            resource: resource.to_string(),
            target: target.map(str::to_string),
        }
    }
}

impl fmt::Display for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "during {} of {}", self.action.as_str(), self.resource)?;
        if let Some(target) = &self.target {
            write!(f, " {}", target)?;
        }
        Ok(())
    }
}

/// Translate a transport outcome.
///
/// Returns `Ok(None)` for a 2xx response with an empty body and
/// `Ok(Some(body))` for a 2xx response with a JSON body.
pub fn translate(
    outcome: Result<TransportResponse, TransportError>,
    ctx: &OpContext,
) -> Result<Option<Value>, CloudError> {
    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            tracing::error!("transport failure {}: {}", ctx, err);
            return Err(CloudError::connection(
                format!("Request failed {}: {}", ctx, err),
                err,
            ));
        }
    };

    if !response.is_success() {
        let detail = remote_detail(&response.body);
        tracing::error!("remote rejected request {}: HTTP {}", ctx, response.status);
        let message = match detail {
            Some(detail) => format!(
                "Remote rejected request {} (HTTP {}): {}",
                ctx, response.status, detail
            ),
            None => format!("Remote rejected request {} (HTTP {})", ctx, response.status),
        };
        return Err(CloudError::remote(response.status, message));
    }

    if response.body.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&response.body).map(Some).map_err(|e| {
        CloudError::bad_response(format!(
            "Bad response {}: body is not valid JSON ({}): {}",
            ctx,
            e,
            sanitize_for_log(&response.body)
        ))
    })
}

/// Translate an outcome that must carry a body
pub fn translate_body(
    outcome: Result<TransportResponse, TransportError>,
    ctx: &OpContext,
) -> Result<Value, CloudError> {
    translate(outcome, ctx)?
        .ok_or_else(|| CloudError::bad_response(format!("Bad response {}: empty body", ctx)))
}

/// Pull a human-readable reason out of an error body.
///
/// Understands `{"NeutronError": {"message": ..}}`, `{"message": ..}`,
/// `{"error": {"message": ..}}` and `{"<fault>": {"message": ..}}`; falls
/// back to the sanitized raw body.
fn remote_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Some(sanitize_for_log(body));
    };

    let message = value
        .get("NeutronError")
        .and_then(|e| e.get("message"))
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error").and_then(|e| e.get("message")))
        .or_else(|| {
            value
                .as_object()
                .filter(|obj| obj.len() == 1)
                .and_then(|obj| obj.values().next())
                .and_then(|fault| fault.get("message"))
        })
        .and_then(Value::as_str);

    match message {
        Some(message) => Some(sanitize_for_log(message)),
        None => Some(sanitize_for_log(body)),
    }
}
