pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use muster_core::Module;
use muster_store::DocStore;

use service::{OrgConfig, OrgService};

/// The Org module — permission-aware resource access and the
/// backup/restore engine.
///
/// Embed this in a server binary to get the generic CRUD surface over
/// every registered resource, role-based permission checks with a TTL
/// cache, the audit trail, and snapshot backup/restore.
pub struct OrgModule {
    service: Arc<OrgService>,
}

impl OrgModule {
    pub fn new(store: Arc<DocStore>, config: OrgConfig) -> Self {
        Self {
            service: OrgService::new(store, config),
        }
    }

    /// Get a reference to the service for programmatic access.
    pub fn service(&self) -> &Arc<OrgService> {
        &self.service
    }
}

impl Module for OrgModule {
    fn name(&self) -> &str {
        "org"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
