use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_kind() -> String {
    "ConfigMap".to_string()
}

/// One JSON-Patch operation. Only the subset the console sends is supported.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

/// Config maps keyed by `(namespace, name)`.
pub type Db = Arc<RwLock<HashMap<(String, String), ConfigMap>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/version", get(version))
        .route("/slow", get(slow))
        .route("/malformed", get(malformed))
        .route("/echo", any(echo))
        .route(
            "/api/v1/namespaces/{namespace}/configmaps",
            get(list_config_maps).post(create_config_map),
        )
        .route(
            "/api/v1/namespaces/{namespace}/configmaps/{name}",
            get(get_config_map)
                .put(replace_config_map)
                .patch(patch_config_map)
                .delete(delete_config_map),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A Kubernetes-style `Status` failure body.
fn failure(code: StatusCode, reason: &str, message: String) -> Response {
    let body = json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code.as_u16(),
    });
    (code, Json(body)).into_response()
}

fn not_found(name: &str) -> Response {
    failure(
        StatusCode::NOT_FOUND,
        "NotFound",
        format!("configmaps \"{name}\" not found"),
    )
}

async fn healthz() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain")], "ok")
}

async fn readyz() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain")], "")
}

async fn version() -> Json<Value> {
    Json(json!({ "major": "1", "minor": "29", "gitVersion": "v1.29.0" }))
}

#[derive(Deserialize)]
struct SlowParams {
    #[serde(default)]
    ms: u64,
}

async fn slow(Query(params): Query<SlowParams>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(json!({ "slept_ms": params.ms }))
}

async fn malformed() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/json")], "{\"items\": [")
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    let headers: BTreeMap<&str, &str> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();
    let body = if body.is_empty() { None } else { Some(body) };
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "body": body,
    }))
}

async fn list_config_maps(State(db): State<Db>, Path(namespace): Path<String>) -> Json<Value> {
    let maps = db.read().await;
    let mut items: Vec<&ConfigMap> = maps
        .iter()
        .filter(|((ns, _), _)| *ns == namespace)
        .map(|(_, map)| map)
        .collect();
    items.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
    Json(json!({ "kind": "ConfigMapList", "apiVersion": "v1", "items": items }))
}

async fn create_config_map(
    State(db): State<Db>,
    Path(namespace): Path<String>,
    Json(mut input): Json<ConfigMap>,
) -> Response {
    let key = (namespace.clone(), input.metadata.name.clone());
    let mut maps = db.write().await;
    if maps.contains_key(&key) {
        return failure(
            StatusCode::CONFLICT,
            "AlreadyExists",
            format!("configmaps \"{}\" already exists", key.1),
        );
    }
    input.metadata.namespace = Some(namespace);
    input.metadata.uid = Some(Uuid::new_v4());
    tracing::debug!(name = %key.1, namespace = %key.0, "config map created");
    maps.insert(key, input.clone());
    (StatusCode::CREATED, Json(input)).into_response()
}

async fn get_config_map(
    State(db): State<Db>,
    Path((namespace, name)): Path<(String, String)>,
) -> Response {
    let maps = db.read().await;
    match maps.get(&(namespace, name.clone())) {
        Some(map) => Json(map.clone()).into_response(),
        None => not_found(&name),
    }
}

async fn replace_config_map(
    State(db): State<Db>,
    Path((namespace, name)): Path<(String, String)>,
    Json(mut input): Json<ConfigMap>,
) -> Response {
    let mut maps = db.write().await;
    let Some(existing) = maps.get_mut(&(namespace.clone(), name.clone())) else {
        return not_found(&name);
    };
    input.metadata.name = name;
    input.metadata.namespace = Some(namespace);
    input.metadata.uid = existing.metadata.uid;
    *existing = input.clone();
    Json(input).into_response()
}

async fn patch_config_map(
    State(db): State<Db>,
    Path((namespace, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("application/json-patch+json") {
        return failure(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "UnsupportedMediaType",
            format!("the body of the request was in an unknown format - accepted media types include: application/json-patch+json (got {content_type:?})"),
        );
    }
    let ops: Vec<PatchOp> = match serde_json::from_str(&body) {
        Ok(ops) => ops,
        Err(e) => return failure(StatusCode::BAD_REQUEST, "BadRequest", e.to_string()),
    };

    let mut maps = db.write().await;
    let Some(existing) = maps.get_mut(&(namespace, name.clone())) else {
        return not_found(&name);
    };

    let patched = serde_json::to_value(&*existing)
        .map_err(|e| e.to_string())
        .and_then(|mut doc| apply_patch(&mut doc, &ops).map(|()| doc))
        .and_then(|doc| serde_json::from_value::<ConfigMap>(doc).map_err(|e| e.to_string()));
    match patched {
        Ok(map) => {
            *existing = map.clone();
            Json(map).into_response()
        }
        Err(message) => failure(StatusCode::UNPROCESSABLE_ENTITY, "Invalid", message),
    }
}

async fn delete_config_map(
    State(db): State<Db>,
    Path((namespace, name)): Path<(String, String)>,
    body: String,
) -> Response {
    let options: Option<Value> = if body.is_empty() {
        None
    } else {
        match serde_json::from_str(&body) {
            Ok(options) => Some(options),
            Err(e) => return failure(StatusCode::BAD_REQUEST, "BadRequest", e.to_string()),
        }
    };

    let mut maps = db.write().await;
    if maps.remove(&(namespace, name.clone())).is_none() {
        return not_found(&name);
    }
    tracing::debug!(%name, "config map deleted");

    let propagation = options
        .as_ref()
        .and_then(|o| o.get("propagationPolicy"))
        .cloned();
    Json(json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Success",
        "details": {
            "name": name,
            "kind": "configmaps",
            "propagationPolicy": propagation,
        },
    }))
    .into_response()
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Apply `ops` to `doc` in order. The document is left partially patched on
/// error; callers discard it.
pub fn apply_patch(doc: &mut Value, ops: &[PatchOp]) -> Result<(), String> {
    for op in ops {
        let path = match op {
            PatchOp::Add { path, .. } | PatchOp::Replace { path, .. } | PatchOp::Remove { path } => {
                path
            }
        };
        let (parent, last) = path
            .rsplit_once('/')
            .ok_or_else(|| format!("invalid path {path:?}"))?;
        let key = unescape(last);
        let target = doc
            .pointer_mut(parent)
            .ok_or_else(|| format!("path {parent:?} does not exist"))?;

        match (op, target) {
            (PatchOp::Add { value, .. }, Value::Object(map)) => {
                map.insert(key, value.clone());
            }
            (PatchOp::Replace { value, .. }, Value::Object(map)) => {
                let slot = map
                    .get_mut(&key)
                    .ok_or_else(|| format!("path {path:?} does not exist"))?;
                *slot = value.clone();
            }
            (PatchOp::Remove { .. }, Value::Object(map)) => {
                map.remove(&key)
                    .ok_or_else(|| format!("path {path:?} does not exist"))?;
            }
            (PatchOp::Add { value, .. }, Value::Array(items)) => {
                let index = if key == "-" {
                    items.len()
                } else {
                    array_index(&key, items.len() + 1, path)?
                };
                items.insert(index, value.clone());
            }
            (PatchOp::Replace { value, .. }, Value::Array(items)) => {
                let index = array_index(&key, items.len(), path)?;
                items[index] = value.clone();
            }
            (PatchOp::Remove { .. }, Value::Array(items)) => {
                let index = array_index(&key, items.len(), path)?;
                items.remove(index);
            }
            (_, _) => return Err(format!("path {parent:?} is not a container")),
        }
    }
    Ok(())
}

fn array_index(key: &str, bound: usize, path: &str) -> Result<usize, String> {
    key.parse::<usize>()
        .ok()
        .filter(|index| *index < bound)
        .ok_or_else(|| format!("index in path {path:?} is out of range"))
}
