//! The seam between the client and the network.
//!
//! # Design
//! `Transport` performs exactly one round trip. The default implementation
//! wraps a `ureq::Agent`; callers can hand in their own agent (timeouts,
//! proxies, connection pool sizes) or implement the trait over any other HTTP
//! library.

use std::time::Duration;

use ureq::http;
use ureq::{Agent, AsSendBody};

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes a single HTTP round trip.
///
/// Implementations must return 4xx/5xx responses as `Ok`; only failures to
/// obtain a response are errors. The returned body must be fully read.
pub trait Transport: Send + Sync {
    fn round_trip(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, TransportError>;
}

/// `Transport` backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_agent(
            Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent(),
        )
    }

    /// Use a pre-configured agent. Its settings are kept, except that status
    /// codes are never turned into errors.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    fn send<S: AsSendBody>(
        &self,
        request: http::Request<S>,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, TransportError> {
        let mut config = self
            .agent
            .configure_request(request)
            .http_status_as_error(false);
        // Never loosen a limit the agent was configured with.
        let agent_limit = self.agent.config().timeouts().global;
        match (timeout, agent_limit) {
            (Some(requested), Some(limit)) if limit <= requested => {}
            (Some(requested), _) => config = config.timeout_global(Some(requested)),
            (None, _) => {}
        }

        let mut response = self.agent.run(config.build())?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn round_trip(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, TransportError> {
        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match &request.body {
            Some(body) => {
                let req = builder.body(body.clone()).map_err(ureq::Error::Http)?;
                self.send(req, timeout)
            }
            None => {
                let req = builder.body(()).map_err(ureq::Error::Http)?;
                self.send(req, timeout)
            }
        }
    }
}
