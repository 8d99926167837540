//! Error types for the Backstage API client.
//!
//! # Design
//! Every failure is returned to the caller; nothing is retried. A non-2xx
//! status is not an error at this layer. `Decode` keeps the response it
//! failed on so status and headers stay inspectable.

use thiserror::Error;

use crate::http::HttpResponse;

/// Errors returned by `BackstageClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The base URL or a request path could not be parsed.
    #[error("invalid URL {input:?}: {reason}")]
    InvalidUrl { input: String, reason: String },

    /// The request body could not be encoded as JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The round trip did not complete.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A non-empty response body is not valid JSON for the destination type.
    #[error("failed to decode response body (HTTP {status}): {source}", status = .response.status)]
    Decode {
        #[source]
        source: serde_json::Error,
        response: Box<HttpResponse>,
    },

    /// Client configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn invalid_url(input: &str, reason: impl ToString) -> Self {
        ApiError::InvalidUrl {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The response attached to a decode failure, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::Decode { response, .. } => Some(&**response),
            _ => None,
        }
    }
}

/// Reasons a request never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Http(#[from] ureq::Error),

    /// Failure reported by a caller-supplied transport.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
