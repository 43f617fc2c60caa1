use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use muster_core::{QueryOptions, RequestContext, ServiceError, SortOrder};

use crate::service::access::Feed;
use crate::service::OrgService;

type ServiceState = Arc<OrgService>;

pub fn router(service: ServiceState) -> Router {
    Router::new()
        .route("/r/{resource}", get(read).post(create))
        .route("/r/{resource}/feed", get(feed))
        .route("/r/{resource}/count", get(count))
        .route("/r/{resource}/options", get(options))
        .route("/r/{resource}/{id}", patch(update).delete(remove))
        .with_state(service)
}

/// Query-string shape shared by the list endpoints. `filter` carries a
/// URL-encoded JSON object.
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    skip: Option<usize>,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    order: Option<SortOrder>,
}

impl ListQuery {
    fn filter_value(&self) -> Result<Value, ServiceError> {
        match &self.filter {
            None => Ok(Value::Null),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| ServiceError::Validation(format!("invalid filter: {}", e))),
        }
    }

    fn query_options(&self) -> QueryOptions {
        QueryOptions {
            limit: self.limit,
            skip: self.skip,
            sort: self.sort.clone(),
            order: self.order.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// GET /r/:resource
// ---------------------------------------------------------------------------

async fn read(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
    Path(resource): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Value>>, ServiceError> {
    let filter = query.filter_value()?;
    let docs = service.read(&ctx, &resource, &filter, &query.query_options())?;
    Ok(Json(docs))
}

// ---------------------------------------------------------------------------
// POST /r/:resource
// ---------------------------------------------------------------------------

async fn create(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
    Path(resource): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    let id = service.insert(&ctx, &resource, &payload)?;
    Ok(Json(serde_json::json!({"id": id})))
}

// ---------------------------------------------------------------------------
// GET /r/:resource/feed
// ---------------------------------------------------------------------------

async fn feed(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
    Path(resource): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Feed>, ServiceError> {
    let filter = query.filter_value()?;
    let feed = service.live_feed(&ctx, &resource, &filter, &query.query_options())?;
    Ok(Json(feed))
}

// ---------------------------------------------------------------------------
// GET /r/:resource/count
// ---------------------------------------------------------------------------

async fn count(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
    Path(resource): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ServiceError> {
    let filter = query.filter_value()?;
    let count = service.count(&ctx, &resource, &filter)?;
    Ok(Json(serde_json::json!({"count": count})))
}

// ---------------------------------------------------------------------------
// GET /r/:resource/options
// ---------------------------------------------------------------------------

async fn options(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
    Path(resource): Path<String>,
) -> Result<Json<Vec<Value>>, ServiceError> {
    let rows = service.options(&ctx, &resource)?;
    Ok(Json(rows))
}

// ---------------------------------------------------------------------------
// PATCH /r/:resource/:id
// ---------------------------------------------------------------------------

async fn update(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
    Path((resource, id)): Path<(String, String)>,
    Json(data): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    service.update(&ctx, &resource, &id, &data)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ---------------------------------------------------------------------------
// DELETE /r/:resource/:id
// ---------------------------------------------------------------------------

async fn remove(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Value>, ServiceError> {
    service.remove(&ctx, &resource, &id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
