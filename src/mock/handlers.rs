use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    Extension, Json,
};
use serde_json::{json, Value};

use super::auth::{check_owner, AuthUser};
use super::error::MockError;
use super::response::{EnvelopeStyle, MockResponse, MockResult};
use super::{CollectionName, MockState, Op};

pub async fn health() -> MockResponse {
    MockResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_records(State(state): State<MockState>, Extension(CollectionName(name)): Extension<CollectionName>) -> MockResult {
    // Snapshot first so a delayed answer carries the data as of arrival
    let (style, records) = state.list(&name, None)?;
    state.apply_fault(&name, Op::List).await?;
    Ok(MockResponse::styled(style, records))
}

pub async fn create_record(
    State(state): State<MockState>,
    Extension(CollectionName(name)): Extension<CollectionName>,
    Json(body): Json<Value>,
) -> MockResult {
    state.apply_fault(&name, Op::Create).await?;
    let (style, record) = state.insert(&name, None, body)?;
    tracing::debug!(collection = %name, "record created");
    Ok(MockResponse::styled(style, record))
}

pub async fn update_record(
    State(state): State<MockState>,
    Extension(CollectionName(name)): Extension<CollectionName>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> MockResult {
    state.apply_fault(&name, Op::Update).await?;
    let (style, record) = state.patch(&name, None, &id, body)?;
    Ok(MockResponse::styled(style, record))
}

pub async fn delete_record(
    State(state): State<MockState>,
    Extension(CollectionName(name)): Extension<CollectionName>,
    Path(id): Path<String>,
) -> MockResult {
    state.apply_fault(&name, Op::Delete).await?;
    state.remove(&name, None, &id)?;
    Ok(MockResponse::success(json!({ "id": id, "deleted": true })))
}

pub async fn list_owned(
    State(state): State<MockState>,
    Extension(CollectionName(name)): Extension<CollectionName>,
    user: Option<Extension<AuthUser>>,
    Path(owner): Path<String>,
) -> MockResult {
    check_owner(user.as_ref().map(|u| &u.0), &owner)?;
    let (style, records) = state.list(&name, Some(&owner))?;
    state.apply_fault(&name, Op::List).await?;
    Ok(MockResponse::styled(style, records))
}

pub async fn create_owned(
    State(state): State<MockState>,
    Extension(CollectionName(name)): Extension<CollectionName>,
    user: Option<Extension<AuthUser>>,
    Path(owner): Path<String>,
    Json(body): Json<Value>,
) -> MockResult {
    check_owner(user.as_ref().map(|u| &u.0), &owner)?;
    state.apply_fault(&name, Op::Create).await?;
    let (style, record) = state.insert(&name, Some(&owner), body)?;
    Ok(MockResponse::styled(style, record).created())
}

pub async fn update_owned(
    State(state): State<MockState>,
    Extension(CollectionName(name)): Extension<CollectionName>,
    user: Option<Extension<AuthUser>>,
    Path((owner, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> MockResult {
    check_owner(user.as_ref().map(|u| &u.0), &owner)?;
    state.apply_fault(&name, Op::Update).await?;
    let (style, record) = state.patch(&name, Some(&owner), &id, body)?;
    Ok(MockResponse::styled(style, record))
}

pub async fn delete_owned(
    State(state): State<MockState>,
    Extension(CollectionName(name)): Extension<CollectionName>,
    user: Option<Extension<AuthUser>>,
    Path((owner, id)): Path<(String, String)>,
) -> MockResult {
    check_owner(user.as_ref().map(|u| &u.0), &owner)?;
    state.apply_fault(&name, Op::Delete).await?;
    state.remove(&name, Some(&owner), &id)?;
    Ok(MockResponse::no_content())
}

// Each level answers in a different envelope, as the location service does
pub async fn countries(State(state): State<MockState>) -> MockResult {
    state.apply_fault("countries", Op::List).await?;
    Ok(MockResponse::styled(EnvelopeStyle::BareArray, &state.inner.geo.countries))
}

pub async fn states(State(state): State<MockState>, Path(country_id): Path<String>) -> MockResult {
    state.apply_fault("states", Op::List).await?;
    let states = state.inner.geo.children(&state.inner.geo.states, "country_id", &country_id);
    Ok(MockResponse::styled(EnvelopeStyle::Data, states))
}

pub async fn cities(State(state): State<MockState>, Path(state_id): Path<String>) -> MockResult {
    state.apply_fault("cities", Op::List).await?;
    let cities = state.inner.geo.children(&state.inner.geo.cities, "state_id", &state_id);
    Ok(MockResponse::styled(EnvelopeStyle::Success, cities))
}

pub async fn upload(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> MockResult {
    state.apply_fault("uploads", Op::Create).await?;
    if body.is_empty() {
        return Err(MockError::bad_request("upload body is empty"));
    }
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let stored = state.store_upload(content_type, body.len());
    tracing::debug!(id = %stored.id, size = stored.size, content_type, "upload stored");
    Ok(MockResponse::success(json!({
        "id": stored.id,
        "url": format!("/uploads/{}", stored.id),
        "size": stored.size,
    }))
    .created())
}
