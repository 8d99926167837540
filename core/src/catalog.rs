//! Handle for the Backstage catalog API.
//!
//! `CatalogService` borrows its client and only scopes paths under
//! `/catalog`; it defines no entity types of its own. Callers bring their own
//! `Deserialize` types (or `serde_json::Value`).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::BackstageClient;
use crate::context::Context;
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub const CATALOG_PATH: &str = "/catalog";

#[derive(Debug, Clone, Copy)]
pub struct CatalogService<'a> {
    client: &'a BackstageClient,
}

impl<'a> CatalogService<'a> {
    pub(crate) fn new(client: &'a BackstageClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &'a BackstageClient {
        self.client
    }

    pub fn default_namespace(&self) -> &'a str {
        self.client.default_namespace()
    }

    /// Build a request for `path` relative to the catalog API.
    pub fn new_request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest> {
        self.client.new_request(method, &catalog_path(path))
    }

    pub fn new_json_request<B>(&self, method: HttpMethod, path: &str, body: &B) -> Result<HttpRequest>
    where
        B: Serialize + ?Sized,
    {
        self.client.new_json_request(method, &catalog_path(path), body)
    }

    pub fn execute(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse> {
        self.client.execute(ctx, request)
    }

    pub fn execute_into<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        request: HttpRequest,
        dest: &mut T,
    ) -> Result<HttpResponse> {
        self.client.execute_into(ctx, request, dest)
    }

    /// GET `path` and decode the body, `None` when it is empty.
    pub fn get<T: DeserializeOwned>(&self, ctx: &Context, path: &str) -> Result<(HttpResponse, Option<T>)> {
        let request = self.new_request(HttpMethod::Get, path)?;
        self.client.execute_json(ctx, request)
    }

    /// POST `body` to `path` and decode the reply, `None` when it is empty.
    pub fn post<B, T>(&self, ctx: &Context, path: &str, body: &B) -> Result<(HttpResponse, Option<T>)>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.new_json_request(HttpMethod::Post, path, body)?;
        self.client.execute_json(ctx, request)
    }

    pub fn delete(&self, ctx: &Context, path: &str) -> Result<HttpResponse> {
        let request = self.new_request(HttpMethod::Delete, path)?;
        self.client.execute(ctx, request)
    }
}

fn catalog_path(path: &str) -> String {
    let rest = path.trim_start_matches('/');
    if rest.is_empty() {
        CATALOG_PATH.to_string()
    } else {
        format!("{CATALOG_PATH}/{rest}")
    }
}
