//! HTTP transport for service REST API calls

use super::{Transport, TransportRequest, TransportResponse};
use crate::config::CloudProfile;
use crate::error::TransportError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the pre-issued auth token
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

const DEFAULT_USER_AGENT: &str = concat!("cloudlayer/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Transport over `reqwest` against a fixed endpoint catalog
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    /// service type -> interface -> base URL
    endpoints: HashMap<String, HashMap<String, Url>>,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a transport with no endpoints registered
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_client_options(token, DEFAULT_USER_AGENT, None)
    }

    fn with_client_options(
        token: Option<String>,
        user_agent: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoints: HashMap::new(),
            token,
        })
    }

    /// Build a transport from a cloud profile's endpoint catalog
    pub fn from_profile(profile: &CloudProfile) -> Result<Self> {
        let user_agent = profile.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let timeout = profile.timeout_secs.map(Duration::from_secs);
        let mut transport = Self::with_client_options(profile.token.clone(), user_agent, timeout)?;

        for (service_type, interfaces) in &profile.endpoints {
            for (interface, url) in interfaces {
                transport = transport
                    .with_endpoint(service_type, interface, url)
                    .with_context(|| format!("Invalid {} endpoint for {}", interface, service_type))?;
            }
        }

        Ok(transport)
    }

    /// Register the base URL of a service interface
    pub fn with_endpoint(mut self, service_type: &str, interface: &str, url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Failed to parse URL '{}'", url))?;
        self.endpoints
            .entry(service_type.to_string())
            .or_default()
            .insert(interface.to_string(), url);
        Ok(self)
    }

    fn resolve_url(&self, request: &TransportRequest) -> Result<Url, TransportError> {
        let base = self
            .endpoints
            .get(&request.service_type)
            .and_then(|interfaces| interfaces.get(&request.interface))
            .ok_or_else(|| TransportError::EndpointNotFound {
                service_type: request.service_type.clone(),
                interface: request.interface.clone(),
            })?;

        let mut url = Url::parse(&format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            request.path.trim_start_matches('/')
        ))?;

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.resolve_url(&request)?;
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(token) = &self.token {
            builder = builder.header(AUTH_TOKEN_HEADER, token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::warn!("API error: {} - {}", status, sanitize_for_log(&body));
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}
