mod backup;
mod middleware;
mod resources;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::service::OrgService;

/// Build the complete org module router.
///
/// Routes (nested under `/org` by the server binary):
/// - `GET    /r/:resource`          — list documents
/// - `POST   /r/:resource`          — create document
/// - `GET    /r/:resource/feed`     — live-feed registration
/// - `GET    /r/:resource/count`    — count documents
/// - `GET    /r/:resource/options`  — selection-widget projection
/// - `PATCH  /r/:resource/:id`      — merge-update document
/// - `DELETE /r/:resource/:id`      — delete document
/// - `POST   /backup`               — full snapshot export
/// - `POST   /backup/quick`         — safety snapshot export
/// - `POST   /backup/validate`      — structural snapshot check
/// - `POST   /backup/restore`       — restore a snapshot
pub fn router(service: Arc<OrgService>) -> Router {
    Router::new()
        .merge(resources::router(Arc::clone(&service)))
        .merge(backup::router(Arc::clone(&service)))
        .layer(from_fn_with_state(service, middleware::identity_middleware))
}
