//! In-process stand-in for the platform backend.
//!
//! Serves every catalogue collection in the conventional layout, the two
//! role-scoped collections, the location tree and uploads. Tests steer it
//! through [`MockState`]: seed records, switch envelope styles, queue
//! failures or delays, and inspect the requests it received.

pub mod auth;
pub mod error;
mod handlers;
pub mod response;
mod seed;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::header::{HeaderName, AUTHORIZATION, CACHE_CONTROL},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Extension, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::MockConfig;
use error::MockError;
pub use response::EnvelopeStyle;

/// Collections served under `/api/{parent}/:owner/{child}`
const SCOPED: &[(&str, &str, &str)] = &[
    ("restaurant-orders", "restaurant", "orders"),
    ("dealer-restaurants", "dealer", "restaurants"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    List,
    Create,
    Update,
    Delete,
    Any,
}

#[derive(Debug, Clone)]
enum FaultKind {
    Fail { status: u16, body: Value },
    Delay(Duration),
}

#[derive(Debug, Clone)]
struct Fault {
    collection: String,
    op: Op,
    kind: FaultKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub cache_control: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Upload {
    pub id: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    owner: Option<String>,
    body: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
struct Collection {
    style: EnvelopeStyle,
    required: Vec<String>,
    records: Vec<StoredRecord>,
}

struct Inner {
    jwt_secret: Option<String>,
    collections: Mutex<BTreeMap<String, Collection>>,
    faults: Mutex<Vec<Fault>>,
    requests: Mutex<Vec<RecordedRequest>>,
    uploads: Mutex<Vec<Upload>>,
    next_id: AtomicU64,
    geo: seed::GeoData,
}

#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn id_of(record: &Map<String, Value>) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    /// Open backend with every catalogue collection registered and empty
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_jwt_secret(secret: &str) -> Self {
        Self::build(Some(secret.to_string()))
    }

    pub fn from_config(config: &MockConfig) -> Self {
        let secret = config.jwt_secret.trim();
        Self::build((!secret.is_empty()).then(|| secret.to_string()))
    }

    fn build(jwt_secret: Option<String>) -> Self {
        let collections = crate::resources::names()
            .iter()
            .map(|name| (name.to_string(), Collection::default()))
            .collect();
        Self {
            inner: Arc::new(Inner {
                jwt_secret,
                collections: Mutex::new(collections),
                faults: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
                uploads: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                geo: seed::geo(),
            }),
        }
    }

    /// Fills the catalogue collections with demo records
    pub fn with_demo_data(self) -> Self {
        for (name, records) in seed::demo_records() {
            self.seed(name, records);
        }
        for (name, owner, records) in seed::demo_owned_records() {
            self.seed_owned(name, owner, records);
        }
        self
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        self.inner.jwt_secret.as_deref()
    }

    pub fn collection_names(&self) -> Vec<String> {
        lock(&self.inner.collections).keys().cloned().collect()
    }

    /// Adds a collection; only collections registered before [`router`] get routes
    pub fn register(&self, name: &str, style: EnvelopeStyle) -> &Self {
        lock(&self.inner.collections)
            .entry(name.to_string())
            .or_default()
            .style = style;
        self
    }

    /// Creates in `name` are rejected with 422 unless these fields are present
    pub fn require_fields(&self, name: &str, fields: &[&str]) -> &Self {
        if let Some(col) = lock(&self.inner.collections).get_mut(name) {
            col.required = fields.iter().map(|f| f.to_string()).collect();
        }
        self
    }

    /// Replaces the contents of a collection; records keep their ids verbatim
    pub fn seed(&self, name: &str, records: Vec<Value>) -> &Self {
        self.store(name, None, records)
    }

    pub fn seed_owned(&self, name: &str, owner: &str, records: Vec<Value>) -> &Self {
        self.store(name, Some(owner), records)
    }

    fn store(&self, name: &str, owner: Option<&str>, records: Vec<Value>) -> &Self {
        let mut cols = lock(&self.inner.collections);
        let col = cols.entry(name.to_string()).or_default();
        col.records.retain(|r| r.owner.as_deref() != owner);
        col.records.extend(records.into_iter().filter_map(|r| match r {
            Value::Object(body) => Some(StoredRecord { owner: owner.map(str::to_string), body }),
            _ => None,
        }));
        self
    }

    pub fn records(&self, name: &str) -> Vec<Value> {
        lock(&self.inner.collections)
            .get(name)
            .map(|c| c.records.iter().map(|r| Value::Object(r.body.clone())).collect())
            .unwrap_or_default()
    }

    /// The next matching request answers `status` with `body` verbatim
    pub fn fail_next(&self, collection: &str, op: Op, status: u16, body: Value) -> &Self {
        self.push_fault(collection, op, FaultKind::Fail { status, body })
    }

    /// The next matching request is answered only after `delay`
    pub fn delay_next(&self, collection: &str, op: Op, delay: Duration) -> &Self {
        self.push_fault(collection, op, FaultKind::Delay(delay))
    }

    fn push_fault(&self, collection: &str, op: Op, kind: FaultKind) -> &Self {
        lock(&self.inner.faults).push(Fault { collection: collection.to_string(), op, kind });
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.inner.requests).clone()
    }

    pub fn clear_requests(&self) {
        lock(&self.inner.requests).clear();
    }

    pub fn uploads(&self) -> Vec<Upload> {
        lock(&self.inner.uploads).clone()
    }

    fn record_request(&self, request: RecordedRequest) {
        lock(&self.inner.requests).push(request);
    }

    fn take_fault(&self, collection: &str, op: Op) -> Option<FaultKind> {
        let mut faults = lock(&self.inner.faults);
        let pos = faults
            .iter()
            .position(|f| f.collection == collection && (f.op == op || f.op == Op::Any))?;
        Some(faults.remove(pos).kind)
    }

    async fn apply_fault(&self, collection: &str, op: Op) -> Result<(), MockError> {
        match self.take_fault(collection, op) {
            Some(FaultKind::Fail { status, body }) => {
                tracing::debug!(collection, ?op, status, "answering with injected failure");
                Err(MockError::Injected { status, body })
            }
            Some(FaultKind::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn next_id(&self) -> String {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }

    fn list(&self, name: &str, owner: Option<&str>) -> Result<(EnvelopeStyle, Vec<Value>), MockError> {
        let cols = lock(&self.inner.collections);
        let col = cols
            .get(name)
            .ok_or_else(|| MockError::not_found(format!("unknown collection {}", name)))?;
        let records = col
            .records
            .iter()
            .filter(|r| r.owner.as_deref() == owner)
            .map(|r| Value::Object(r.body.clone()))
            .collect();
        Ok((col.style, records))
    }

    fn insert(&self, name: &str, owner: Option<&str>, body: Value) -> Result<(EnvelopeStyle, Value), MockError> {
        let Value::Object(mut record) = body else {
            return Err(MockError::bad_request("expected a JSON object"));
        };
        let generated = self.next_id();

        let mut cols = lock(&self.inner.collections);
        let col = cols
            .get_mut(name)
            .ok_or_else(|| MockError::not_found(format!("unknown collection {}", name)))?;

        let missing: Vec<(String, String)> = col
            .required
            .iter()
            .filter(|f| record.get(f.as_str()).map_or(true, is_blank))
            .map(|f| (f.clone(), "field required".to_string()))
            .collect();
        if !missing.is_empty() {
            return Err(MockError::Validation(missing));
        }

        let id = id_of(&record).unwrap_or(generated);
        if col.records.iter().any(|r| r.owner.as_deref() == owner && id_of(&r.body).as_deref() == Some(id.as_str())) {
            return Err(MockError::bad_request(format!("record {} already exists", id)));
        }
        record.insert("id".to_string(), Value::String(id));
        record
            .entry("created_at")
            .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));

        col.records.push(StoredRecord { owner: owner.map(str::to_string), body: record.clone() });
        Ok((col.style, Value::Object(record)))
    }

    fn patch(&self, name: &str, owner: Option<&str>, id: &str, body: Value) -> Result<(EnvelopeStyle, Value), MockError> {
        let Value::Object(changes) = body else {
            return Err(MockError::bad_request("expected a JSON object"));
        };
        let mut cols = lock(&self.inner.collections);
        let col = cols
            .get_mut(name)
            .ok_or_else(|| MockError::not_found(format!("unknown collection {}", name)))?;
        let style = col.style;
        let record = col
            .records
            .iter_mut()
            .find(|r| r.owner.as_deref() == owner && id_of(&r.body).as_deref() == Some(id))
            .ok_or_else(|| MockError::not_found(format!("{} {} not found", name, id)))?;

        for (key, value) in changes.into_iter().filter(|(k, _)| k != "id") {
            record.body.insert(key, value);
        }
        record
            .body
            .insert("updated_at".to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
        Ok((style, Value::Object(record.body.clone())))
    }

    fn remove(&self, name: &str, owner: Option<&str>, id: &str) -> Result<(), MockError> {
        let mut cols = lock(&self.inner.collections);
        let col = cols
            .get_mut(name)
            .ok_or_else(|| MockError::not_found(format!("unknown collection {}", name)))?;
        let pos = col
            .records
            .iter()
            .position(|r| r.owner.as_deref() == owner && id_of(&r.body).as_deref() == Some(id))
            .ok_or_else(|| MockError::not_found(format!("{} {} not found", name, id)))?;
        col.records.remove(pos);
        Ok(())
    }

    fn store_upload(&self, content_type: &str, size: usize) -> Upload {
        let upload = Upload {
            id: uuid::Uuid::new_v4().to_string(),
            content_type: content_type.to_string(),
            size,
        };
        lock(&self.inner.uploads).push(upload.clone());
        upload
    }
}

/// Name of the collection a route group serves
#[derive(Debug, Clone)]
pub(crate) struct CollectionName(pub String);

pub fn router(state: MockState) -> Router {
    let mut api = Router::new()
        .route("/api/location/countries", get(handlers::countries))
        .route("/api/location/states/:country_id", get(handlers::states))
        .route("/api/location/cities/:state_id", get(handlers::cities))
        .route("/api/uploads", post(handlers::upload));

    for name in state.collection_names() {
        api = match SCOPED.iter().find(|(n, _, _)| *n == name) {
            Some((_, parent, child)) => api.merge(scoped_routes(&name, parent, child)),
            None => api.merge(collection_routes(&name)),
        };
    }

    let api = api.route_layer(middleware::from_fn_with_state(state.clone(), auth::jwt_auth_middleware));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .layer(middleware::from_fn_with_state(state.clone(), record_requests))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn collection_routes(name: &str) -> Router<MockState> {
    Router::new()
        .route(&format!("/api/{}/list", name), get(handlers::list_records))
        .route(&format!("/api/{}/create", name), post(handlers::create_record))
        .route(
            &format!("/api/{}/update/:id", name),
            axum::routing::patch(handlers::update_record).put(handlers::update_record),
        )
        .route(&format!("/api/{}/delete/:id", name), delete(handlers::delete_record))
        .layer(Extension(CollectionName(name.to_string())))
}

fn scoped_routes(name: &str, parent: &str, child: &str) -> Router<MockState> {
    Router::new()
        .route(
            &format!("/api/{}/:owner/{}", parent, child),
            get(handlers::list_owned).post(handlers::create_owned),
        )
        .route(
            &format!("/api/{}/:owner/{}/:id", parent, child),
            axum::routing::put(handlers::update_owned)
                .patch(handlers::update_owned)
                .delete(handlers::delete_owned),
        )
        .layer(Extension(CollectionName(name.to_string())))
}

async fn record_requests(State(state): State<MockState>, request: Request, next: Next) -> Response {
    // Scoped so no borrow of the request is held across the await
    let recorded = {
        let header = |name: HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        RecordedRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            authorization: header(AUTHORIZATION),
            cache_control: header(CACHE_CONTROL),
        }
    };
    state.record_request(recorded);
    next.run(request).await
}

/// Binds and serves until the process is stopped
pub async fn serve(config: &MockConfig, state: MockState) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;
    tracing::info!(%bind_addr, auth = state.jwt_secret().is_some(), "mock backend listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
