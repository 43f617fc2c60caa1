use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use muster_core::{RequestContext, ServiceError};

use crate::model::{RestoreReport, Snapshot, SnapshotCheck};
use crate::service::backup::RestoreOptions;
use crate::service::OrgService;

type ServiceState = Arc<OrgService>;

pub fn router(service: ServiceState) -> Router {
    Router::new()
        .route("/backup", post(create))
        .route("/backup/quick", post(create_quick))
        .route("/backup/validate", post(validate))
        .route("/backup/restore", post(restore))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct RestoreRequest {
    snapshot: Value,

    /// Take a safety backup before mutating anything (default true).
    #[serde(default = "default_true", rename = "safetyBackup")]
    safety_backup: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// POST /backup
// ---------------------------------------------------------------------------

async fn create(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Snapshot>, ServiceError> {
    let snapshot = service.create_backup(&ctx)?;
    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// POST /backup/quick
// ---------------------------------------------------------------------------

async fn create_quick(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Snapshot>, ServiceError> {
    let snapshot = service.create_quick_backup(&ctx)?;
    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// POST /backup/validate
// ---------------------------------------------------------------------------

async fn validate(
    State(service): State<ServiceState>,
    Json(raw): Json<Value>,
) -> Result<Json<SnapshotCheck>, ServiceError> {
    Ok(Json(service.validate_backup(&raw)))
}

// ---------------------------------------------------------------------------
// POST /backup/restore
// ---------------------------------------------------------------------------

async fn restore(
    State(service): State<ServiceState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<RestoreRequest>,
) -> Result<Json<RestoreReport>, ServiceError> {
    let options = RestoreOptions {
        create_safety_backup: req.safety_backup,
    };
    let report = service.restore_backup(&ctx, req.snapshot, &options)?;
    Ok(Json(report))
}
