//! Request builder and executor for the Backstage API.
//!
//! # Design
//! `BackstageClient` is immutable once built: base URL, default namespace,
//! user agent, credentials and transport are fixed at construction, and all
//! per-call state lives in the `HttpRequest` / `HttpResponse` values. A client
//! can therefore be shared across threads without locking.
//!
//! Building and executing are separate steps. `new_request` and
//! `new_json_request` resolve the target URL and set the standard headers;
//! `execute` and `execute_into` perform the round trip and decode the body.

use std::fmt;
use std::pin::pin;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures::channel::oneshot;
use futures::executor::block_on;
use futures::future::{self, Either};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Auth;
use crate::catalog::CatalogService;
use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::{ApiError, Result, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, CONTENT_TYPE_JSON};
use crate::transport::{Transport, UreqTransport};

/// Path segment every base URL ends with.
pub const API_PATH: &str = "/api";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_USER_AGENT: &str = "backstage-client";

/// Synchronous client for the Backstage API.
#[derive(Clone)]
pub struct BackstageClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
    user_agent: String,
    default_namespace: String,
    auth: Auth,
    timeout: Option<Duration>,
}

impl BackstageClient {
    /// Create a client for `base_url`.
    ///
    /// A trailing slash is trimmed and `/api` appended when missing. `None`
    /// or an empty namespace falls back to [`DEFAULT_NAMESPACE`]; `None` or an
    /// empty token leaves requests unauthenticated. Without an `agent` a
    /// default `ureq::Agent` is created.
    pub fn new(
        base_url: &str,
        namespace: Option<&str>,
        agent: Option<ureq::Agent>,
        token: Option<&str>,
    ) -> Result<Self> {
        let mut builder = Self::builder(base_url).auth(Auth::from_token(token));
        if let Some(ns) = namespace {
            builder = builder.namespace(ns);
        }
        if let Some(agent) = agent {
            builder = builder.agent(agent);
        }
        builder.build()
    }

    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Self::builder(config.base_url.clone())
            .auth(Auth::from_token(config.token.as_deref()));
        if let Some(ns) = &config.namespace {
            builder = builder.namespace(ns.clone());
        }
        if let Some(ua) = &config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Handle for the catalog API.
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self)
    }

    /// Build a request without a body.
    ///
    /// `path` is either an absolute URL, used as-is, or a reference relative
    /// to the base URL whose path is appended to the base path.
    pub fn new_request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest> {
        let url = self.resolve(path)?;
        let mut request = HttpRequest::new(method, url);

        request.set_header("Accept", CONTENT_TYPE_JSON);
        if !self.user_agent.is_empty() {
            request.set_header("User-Agent", self.user_agent.clone());
        }
        self.auth.apply(&mut request);

        Ok(request)
    }

    /// Build a request carrying `body` encoded as JSON, newline-terminated.
    pub fn new_json_request<B>(&self, method: HttpMethod, path: &str, body: &B) -> Result<HttpRequest>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.new_request(method, path)?;
        let mut payload = serde_json::to_vec(body).map_err(ApiError::Serialization)?;
        payload.push(b'\n');
        request.body = Some(payload);
        request.set_header("Content-Type", CONTENT_TYPE_JSON);
        Ok(request)
    }

    /// Send `request` and return the response without decoding it.
    ///
    /// Any status code is a successful round trip.
    pub fn execute(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse> {
        let budget = ctx.check()?;
        let timeout = match (budget, self.timeout) {
            (Some(left), Some(limit)) => Some(left.min(limit)),
            (left, limit) => left.or(limit),
        };

        debug!(method = %request.method, url = %request.url, ?timeout, "sending request");
        let response = match self.round_trip(ctx, request, timeout) {
            Err(TransportError::Http(ureq::Error::Timeout(_))) if ctx.is_expired() => {
                return Err(TransportError::DeadlineExceeded.into());
            }
            result => result?,
        };
        debug!(
            status = response.status,
            bytes = response.body.len(),
            "received response"
        );

        Ok(response)
    }

    /// Send `request` and decode a JSON body into `dest`.
    ///
    /// An empty body leaves `dest` untouched. On a malformed body the returned
    /// [`ApiError::Decode`] still carries the response.
    pub fn execute_into<T>(&self, ctx: &Context, request: HttpRequest, dest: &mut T) -> Result<HttpResponse>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(ctx, request)?;
        if let Some(value) = decode(&response)? {
            *dest = value;
        }
        Ok(response)
    }

    /// Send `request` and decode the body, `None` when it is empty.
    pub fn execute_json<T>(&self, ctx: &Context, request: HttpRequest) -> Result<(HttpResponse, Option<T>)>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(ctx, request)?;
        let value = decode(&response)?;
        Ok((response, value))
    }

    /// Run the transport on a worker thread and wait for its result or for
    /// `ctx` to be cancelled, whichever comes first. An abandoned worker
    /// finishes on its own and its result is dropped.
    fn round_trip(
        &self,
        ctx: &Context,
        request: HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, TransportError> {
        let (tx, rx) = oneshot::channel();
        let transport = Arc::clone(&self.transport);
        thread::Builder::new()
            .name("backstage-http".to_string())
            .spawn(move || {
                let _ = tx.send(transport.round_trip(&request, timeout));
            })
            .map_err(|e| TransportError::Other(Box::new(e)))?;

        let cancelled = pin!(ctx.token().cancelled());
        match block_on(future::select(rx, cancelled)) {
            Either::Left((Ok(result), _)) => result,
            Either::Left((Err(_), _)) => Err(TransportError::Other(
                "transport worker exited without a result".into(),
            )),
            Either::Right(((), _)) => {
                debug!("request cancelled while in flight");
                Err(TransportError::Cancelled)
            }
        }
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        match Url::parse(path) {
            Ok(url) if is_http(&url) => return Ok(url),
            Ok(url) => {
                return Err(ApiError::invalid_url(
                    path,
                    format!("unsupported scheme {:?}", url.scheme()),
                ))
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {}
            Err(e) => return Err(ApiError::invalid_url(path, e)),
        }

        check_relative(path)?;

        let (rest, fragment) = match path.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (path, None),
        };
        let (rel_path, query) = match rest.split_once('?') {
            Some((rel_path, query)) => (rel_path, Some(query)),
            None => (rest, None),
        };

        let mut url = self.base_url.clone();
        let rel_path = rel_path.trim_start_matches('/');
        if !rel_path.is_empty() {
            let joined = format!("{}/{}", url.path().trim_end_matches('/'), rel_path);
            url.set_path(&joined);
        }
        url.set_query(query);
        url.set_fragment(fragment);
        Ok(url)
    }
}

impl fmt::Debug for BackstageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackstageClient")
            .field("base_url", &self.base_url.as_str())
            .field("default_namespace", &self.default_namespace)
            .field("user_agent", &self.user_agent)
            .field("auth", &self.auth)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BackstageClient`].
pub struct ClientBuilder {
    base_url: String,
    namespace: Option<String>,
    user_agent: Option<String>,
    auth: Auth,
    timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            namespace: None,
            user_agent: None,
            auth: Auth::None,
            timeout: None,
            transport: None,
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// An empty user agent suppresses the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn token(self, token: &str) -> Self {
        self.auth(Auth::from_token(Some(token)))
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Upper bound for every call, combined with the context deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn agent(self, agent: ureq::Agent) -> Self {
        self.transport(UreqTransport::with_agent(agent))
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<BackstageClient> {
        let base_url = parse_base_url(&self.base_url)?;
        let default_namespace = self
            .namespace
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new()));

        debug!(base_url = %base_url, namespace = %default_namespace, "created Backstage client");

        Ok(BackstageClient {
            transport,
            base_url,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            default_namespace,
            auth: self.auth,
            timeout: self.timeout,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut normalized = raw.trim().trim_end_matches('/').to_string();
    if !normalized.ends_with(API_PATH) {
        normalized.push_str(API_PATH);
    }

    let url = Url::parse(&normalized).map_err(|e| ApiError::invalid_url(raw, e))?;
    if !is_http(&url) {
        return Err(ApiError::invalid_url(
            raw,
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }
    Ok(url)
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.has_host()
}

/// Reject relative references that could not be resolved unambiguously.
fn check_relative(path: &str) -> Result<()> {
    if path.starts_with("//") {
        return Err(ApiError::invalid_url(path, "scheme-relative references are not supported"));
    }
    if let Some(c) = path
        .chars()
        .find(|c| *c == '\\' || c.is_control())
    {
        return Err(ApiError::invalid_url(path, format!("invalid character {c:?}")));
    }
    let first_segment = path
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if first_segment.contains(':') {
        return Err(ApiError::invalid_url(path, "first path segment cannot contain a colon"));
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<Option<T>> {
    if response.is_body_empty() {
        return Ok(None);
    }
    match serde_json::from_slice(&response.body) {
        Ok(value) => Ok(Some(value)),
        Err(source) => {
            warn!(status = response.status, error = %source, "response body is not valid JSON");
            Err(ApiError::Decode {
                source,
                response: Box::new(response.clone()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use serde::Deserialize;

    use super::*;

    /// Records every request and answers with a canned response.
    #[derive(Clone)]
    struct FakeTransport {
        seen: Arc<Mutex<Vec<(HttpRequest, Option<Duration>)>>>,
        status: u16,
        body: &'static str,
    }

    impl FakeTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                seen: Arc::new(Mutex::new(Vec::new())),
                status,
                body,
            }
        }

        fn calls(&self) -> Vec<(HttpRequest, Option<Duration>)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        fn round_trip(
            &self,
            request: &HttpRequest,
            timeout: Option<Duration>,
        ) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push((request.clone(), timeout));
            Ok(HttpResponse {
                status: self.status,
                headers: vec![("content-type".to_string(), CONTENT_TYPE_JSON.to_string())],
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    /// Blocks for `delay`, then fails the way ureq does when its timeout fires.
    struct StallingTransport {
        delay: Duration,
    }

    impl Transport for StallingTransport {
        fn round_trip(
            &self,
            _request: &HttpRequest,
            _timeout: Option<Duration>,
        ) -> Result<HttpResponse, TransportError> {
            std::thread::sleep(self.delay);
            Err(TransportError::Http(ureq::Error::Timeout(ureq::Timeout::Global)))
        }
    }

    fn client_with(transport: FakeTransport) -> BackstageClient {
        BackstageClient::builder("http://localhost:7007/api")
            .transport(transport)
            .build()
            .unwrap()
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Foo {
        foo: String,
    }

    // --- construction ---

    #[test]
    fn new_client_keeps_base_url_and_namespace() {
        let client = BackstageClient::new("http://localhost:7007/api", Some("custom"), None, None).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:7007/api");
        assert_eq!(client.default_namespace(), "custom");
        assert_eq!(client.user_agent(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn base_url_is_normalized() {
        for raw in [
            "http://localhost:7007",
            "http://localhost:7007/",
            "http://localhost:7007/api",
            "http://localhost:7007/api/",
        ] {
            let client = BackstageClient::new(raw, None, None, None).unwrap();
            let base = client.base_url().as_str();
            assert_eq!(base, "http://localhost:7007/api", "{raw}");
            assert!(!base.ends_with('/'));
        }
    }

    #[test]
    fn base_url_keeps_prefix_path() {
        let client = BackstageClient::new("https://portal.example.com/backstage/", None, None, None).unwrap();
        assert_eq!(client.base_url().as_str(), "https://portal.example.com/backstage/api");
    }

    #[test]
    fn empty_namespace_falls_back_to_default() {
        let client = BackstageClient::new("http://localhost:7007/api/", Some(""), None, None).unwrap();
        assert_eq!(client.default_namespace(), DEFAULT_NAMESPACE);

        let client = BackstageClient::new("http://localhost:7007/api/", None, None, None).unwrap();
        assert_eq!(client.default_namespace(), DEFAULT_NAMESPACE);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = BackstageClient::new("\\foo:bar", None, None, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));

        let err = BackstageClient::new("ftp://localhost", None, None, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));
    }

    #[test]
    fn custom_agent_is_accepted() {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(1)))
            .build()
            .into();
        let client = BackstageClient::new("http://localhost:7007", None, Some(agent), None).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:7007/api");
    }

    #[test]
    fn from_config_applies_every_field() {
        let config = ClientConfig {
            base_url: "http://localhost:7007".to_string(),
            namespace: Some("team-a".to_string()),
            token: Some("tok".to_string()),
            user_agent: Some("catalog-sync".to_string()),
            timeout_secs: Some(5),
        };
        let client = BackstageClient::from_config(&config).unwrap();
        assert_eq!(client.default_namespace(), "team-a");
        assert_eq!(client.user_agent(), "catalog-sync");
        assert_eq!(client.timeout(), Some(Duration::from_secs(5)));

        let req = client.new_request(HttpMethod::Get, "/catalog/entities").unwrap();
        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
    }

    // --- request building ---

    #[test]
    fn get_request_resolves_against_base_url() {
        let client = BackstageClient::builder("http://localhost:7007/api")
            .user_agent("foo")
            .build()
            .unwrap();
        let req = client.new_request(HttpMethod::Get, "/catalog/entities").unwrap();

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url.as_str(), "http://localhost:7007/api/catalog/entities");
        assert_eq!(req.header("Accept"), Some(CONTENT_TYPE_JSON));
        assert_eq!(req.header("User-Agent"), Some("foo"));
        assert_eq!(req.header("Content-Type"), None);
        assert_eq!(req.header("Authorization"), None);
        assert!(req.body.is_none());
    }

    #[test]
    fn relative_path_without_leading_slash_keeps_query() {
        let client = BackstageClient::new("http://localhost:7007", None, None, None).unwrap();
        let req = client
            .new_request(HttpMethod::Get, "catalog/entities?filter=kind=component#top")
            .unwrap();
        assert_eq!(
            req.url.as_str(),
            "http://localhost:7007/api/catalog/entities?filter=kind=component#top"
        );
    }

    #[test]
    fn absolute_url_is_used_as_is() {
        let client = BackstageClient::new("http://localhost:7007", None, None, None).unwrap();
        let req = client
            .new_request(HttpMethod::Get, "http://other:9000/api/catalog/entities")
            .unwrap();
        assert_eq!(req.url.as_str(), "http://other:9000/api/catalog/entities");
    }

    #[test]
    fn post_request_encodes_body() {
        #[derive(Serialize)]
        struct Payload {
            #[serde(rename = "Foo")]
            foo: String,
        }

        let client = BackstageClient::new("http://localhost:7007", None, None, None).unwrap();
        let url = "http://localhost:7007/api/catalog/entities";
        let req = client
            .new_json_request(HttpMethod::Post, url, &Payload { foo: "Bar".to_string() })
            .unwrap();

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url.as_str(), url);
        assert_eq!(req.header("Accept"), Some(CONTENT_TYPE_JSON));
        assert_eq!(req.header("Content-Type"), Some(CONTENT_TYPE_JSON));
        assert_eq!(req.body.as_deref(), Some(b"{\"Foo\":\"Bar\"}\n".as_slice()));
    }

    #[test]
    fn invalid_path_is_rejected() {
        let client = BackstageClient::new("http://localhost:7007", None, None, None).unwrap();
        for path in ["\\foo:bar", "foo:bar/baz", "tab\there", "//evil.example/api"] {
            let err = client.new_request(HttpMethod::Get, path).unwrap_err();
            assert!(matches!(err, ApiError::InvalidUrl { .. }), "{path}");
        }
    }

    #[test]
    fn spaces_in_path_are_percent_encoded() {
        let client = BackstageClient::new("http://localhost:7007", None, None, None).unwrap();
        let req = client
            .new_request(HttpMethod::Get, "/catalog/entities/by-name/component/default/my service")
            .unwrap();
        assert_eq!(
            req.url.as_str(),
            "http://localhost:7007/api/catalog/entities/by-name/component/default/my%20service"
        );
    }

    #[test]
    fn unserializable_body_is_rejected() {
        let mut body = BTreeMap::new();
        body.insert((1u8, 2u8), 3u8);

        let client = BackstageClient::new("http://localhost:7007", None, None, None).unwrap();
        let err = client
            .new_json_request(HttpMethod::Post, "/catalog/entities", &body)
            .unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }

    #[test]
    fn token_adds_bearer_header() {
        let client = BackstageClient::new("http://localhost:7007", None, None, Some("jwt")).unwrap();
        let req = client.new_request(HttpMethod::Delete, "/catalog/entities/by-uid/1").unwrap();
        assert_eq!(req.header("Authorization"), Some("Bearer jwt"));
    }

    #[test]
    fn empty_user_agent_omits_header() {
        let client = BackstageClient::builder("http://localhost:7007")
            .user_agent("")
            .build()
            .unwrap();
        let req = client.new_request(HttpMethod::Get, "/").unwrap();
        assert_eq!(req.header("User-Agent"), None);
        assert_eq!(req.url.as_str(), "http://localhost:7007/api");
    }

    // --- execution ---

    #[test]
    fn execute_into_decodes_json() {
        let transport = FakeTransport::new(200, r#"{"foo":"bar"}"#);
        let client = client_with(transport.clone());

        let req = client.new_request(HttpMethod::Get, "/foo/bar").unwrap();
        let mut data = serde_json::Value::Null;
        let resp = client.execute_into(&Context::background(), req, &mut data).unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("Content-Type"), Some(CONTENT_TYPE_JSON));
        assert_eq!(data, serde_json::json!({"foo": "bar"}));
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(transport.calls()[0].1, None);
    }

    #[test]
    fn empty_body_leaves_destination_untouched() {
        let client = client_with(FakeTransport::new(200, ""));

        let req = client.new_request(HttpMethod::Get, "/foo/bar").unwrap();
        let mut data = Foo {
            foo: "unchanged".to_string(),
        };
        let resp = client.execute_into(&Context::background(), req, &mut data).unwrap();

        assert!(resp.body.is_empty());
        assert_eq!(data.foo, "unchanged");
    }

    #[test]
    fn execute_json_returns_none_for_empty_body() {
        let client = client_with(FakeTransport::new(204, ""));
        let req = client.new_request(HttpMethod::Delete, "/foo").unwrap();
        let (resp, value) = client
            .execute_json::<Foo>(&Context::background(), req)
            .unwrap();
        assert_eq!(resp.status, 204);
        assert!(value.is_none());
    }

    #[test]
    fn malformed_body_keeps_response() {
        let client = client_with(FakeTransport::new(502, "<html>bad gateway</html>"));

        let req = client.new_request(HttpMethod::Get, "/foo/bar").unwrap();
        let mut data = Foo::default();
        let err = client
            .execute_into(&Context::background(), req, &mut data)
            .unwrap_err();

        assert!(matches!(err, ApiError::Decode { .. }));
        assert_eq!(err.response().map(|r| r.status), Some(502));
        assert_eq!(data, Foo::default());
    }

    #[test]
    fn wrong_shape_is_decode_error() {
        let client = client_with(FakeTransport::new(200, r#"{"foo":1}"#));
        let req = client.new_request(HttpMethod::Get, "/foo").unwrap();
        let mut data = Foo::default();
        let err = client
            .execute_into(&Context::background(), req, &mut data)
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn cancelled_context_skips_transport() {
        let transport = FakeTransport::new(200, "{}");
        let client = client_with(transport.clone());

        let ctx = Context::background();
        ctx.cancel();
        let req = client.new_request(HttpMethod::Get, "/foo").unwrap();
        let err = client.execute(&ctx, req).unwrap_err();

        assert!(matches!(err, ApiError::Transport(TransportError::Cancelled)));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn timeout_is_min_of_context_and_client() {
        let transport = FakeTransport::new(200, "");
        let client = BackstageClient::builder("http://localhost:7007")
            .timeout(Duration::from_millis(200))
            .transport(transport.clone())
            .build()
            .unwrap();

        let req = client.new_request(HttpMethod::Get, "/foo").unwrap();
        client
            .execute(&Context::with_timeout(Duration::from_secs(60)), req.clone())
            .unwrap();
        client.execute(&Context::background(), req).unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].1, Some(Duration::from_millis(200)));
        assert_eq!(calls[1].1, Some(Duration::from_millis(200)));
    }

    #[test]
    fn trailing_data_after_json_is_decode_error() {
        let client = client_with(FakeTransport::new(200, "{\"foo\":\"bar\"} {\"foo\":\"baz\"}"));
        let req = client.new_request(HttpMethod::Get, "/foo").unwrap();
        let mut data = Foo::default();
        let err = client
            .execute_into(&Context::background(), req, &mut data)
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
        assert_eq!(data, Foo::default());
    }

    #[test]
    fn cancel_interrupts_in_flight_call() {
        let client = BackstageClient::builder("http://localhost:7007")
            .transport(StallingTransport {
                delay: Duration::from_secs(2),
            })
            .build()
            .unwrap();

        let ctx = Context::background();
        let canceller = ctx.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let req = client.new_request(HttpMethod::Get, "/foo").unwrap();
        let err = client.execute(&ctx, req).unwrap_err();

        assert!(matches!(err, ApiError::Transport(TransportError::Cancelled)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn client_timeout_is_not_reported_as_deadline() {
        let client = BackstageClient::builder("http://localhost:7007")
            .timeout(Duration::from_millis(10))
            .transport(StallingTransport {
                delay: Duration::from_millis(10),
            })
            .build()
            .unwrap();

        let req = client.new_request(HttpMethod::Get, "/foo").unwrap();
        let err = client
            .execute(&Context::with_timeout(Duration::from_secs(60)), req)
            .unwrap_err();

        assert!(
            matches!(err, ApiError::Transport(TransportError::Http(ureq::Error::Timeout(_)))),
            "{err}"
        );
    }

    #[test]
    fn expired_context_is_reported_as_deadline() {
        let client = BackstageClient::builder("http://localhost:7007")
            .transport(StallingTransport {
                delay: Duration::from_millis(100),
            })
            .build()
            .unwrap();

        let req = client.new_request(HttpMethod::Get, "/foo").unwrap();
        let err = client
            .execute(&Context::with_timeout(Duration::from_millis(20)), req)
            .unwrap_err();

        assert!(matches!(err, ApiError::Transport(TransportError::DeadlineExceeded)), "{err}");
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackstageClient>();
    }
}
