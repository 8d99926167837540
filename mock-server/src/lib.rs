use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_NAMESPACE: &str = "default";

/// How long `/api/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

/// Length of the `blob` string served by `/api/large`.
pub const LARGE_BLOB_BYTES: usize = 11 * 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EntityMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

pub type Db = Arc<RwLock<HashMap<Uuid, Entity>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/api/catalog/entities", get(list_entities).post(create_entity))
        .route(
            "/api/catalog/entities/by-uid/{uid}",
            get(get_entity).delete(delete_entity),
        )
        .route(
            "/api/catalog/entities/by-name/{kind}/{namespace}/{name}",
            get(get_entity_by_name),
        )
        .route("/api/foo/bar", get(foo_bar))
        .route("/api/echo", any(echo))
        .route("/api/empty", get(empty))
        .route("/api/malformed", get(malformed))
        .route("/api/slow", get(slow))
        .route("/api/large", get(large))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock Backstage API listening");
    }
    axum::serve(listener, app()).await
}

async fn list_entities(State(db): State<Db>) -> Json<Vec<Entity>> {
    let entities = db.read().await;
    Json(entities.values().cloned().collect())
}

async fn create_entity(
    State(db): State<Db>,
    Json(mut entity): Json<Entity>,
) -> Result<(StatusCode, Json<Entity>), StatusCode> {
    let mut entities = db.write().await;
    let duplicate = entities.values().any(|e| {
        e.kind.eq_ignore_ascii_case(&entity.kind)
            && e.metadata.namespace == entity.metadata.namespace
            && e.metadata.name == entity.metadata.name
    });
    if duplicate {
        return Err(StatusCode::CONFLICT);
    }

    let uid = Uuid::new_v4();
    entity.metadata.uid = Some(uid);
    entities.insert(uid, entity.clone());
    Ok((StatusCode::CREATED, Json(entity)))
}

async fn get_entity(
    State(db): State<Db>,
    Path(uid): Path<Uuid>,
) -> Result<Json<Entity>, StatusCode> {
    let entities = db.read().await;
    entities.get(&uid).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn get_entity_by_name(
    State(db): State<Db>,
    Path((kind, namespace, name)): Path<(String, String, String)>,
) -> Result<Json<Entity>, StatusCode> {
    let entities = db.read().await;
    entities
        .values()
        .find(|e| {
            e.kind.eq_ignore_ascii_case(&kind)
                && e.metadata.namespace == namespace
                && e.metadata.name == name
        })
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_entity(
    State(db): State<Db>,
    Path(uid): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut entities = db.write().await;
    entities
        .remove(&uid)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Reflect the request back as JSON.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Value> {
    let headers: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or_default().to_string();
            (name.as_str().to_string(), Value::String(value))
        })
        .collect();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap_or_else(|_| Value::String(body))
    };

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": headers,
        "body": body,
    }))
}

async fn foo_bar() -> Json<Value> {
    Json(json!({"foo": "bar"}))
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], r#"{"foo":"#)
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({}))
}

async fn large() -> Json<Value> {
    Json(json!({"blob": "x".repeat(LARGE_BLOB_BYTES)}))
}
