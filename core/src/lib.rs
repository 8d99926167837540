//! Synchronous HTTP client for the Backstage API.
//!
//! # Overview
//! Builds authenticated JSON requests against a configurable base URL,
//! sends them through a pluggable transport and decodes JSON responses into
//! caller-supplied types.
//!
//! # Design
//! - `BackstageClient` is immutable after construction and safe to share.
//! - Building (`new_request`, `new_json_request`) and executing (`execute`,
//!   `execute_into`) are separate steps so callers can inspect or adjust a
//!   request before sending it.
//! - An empty response body decodes to nothing; a malformed one is an
//!   `ApiError::Decode` that still carries the response.
//! - The catalog handle only scopes paths. Entity modeling is left to callers.

pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod transport;

pub use auth::Auth;
pub use catalog::CatalogService;
pub use client::{BackstageClient, ClientBuilder, API_PATH, DEFAULT_NAMESPACE, DEFAULT_USER_AGENT};
pub use config::ClientConfig;
pub use context::Context;
pub use error::{ApiError, Result, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, CONTENT_TYPE_JSON};
pub use transport::{Transport, UreqTransport};
