pub mod access;
pub mod audit;
pub mod backup;
pub mod permissions;
pub mod registry;
pub mod role_cache;
pub mod throttle;

use std::sync::Arc;

use thiserror::Error;

use muster_store::{Collection, DocStore, StoreError};

/// Account documents live outside the generic registry; backup and
/// restore handle them specially (see `backup.rs`).
pub const USERS_COLLECTION: &str = "users";

/// Application settings, also outside the generic registry.
pub const SETTINGS_COLLECTION: &str = "settings";

/// The audit trail. Registered as a normal resource, but mutations on
/// it are never themselves audit-logged.
pub const AUDIT_COLLECTION: &str = "audit_log";

/// Org service error type.
#[derive(Debug, Error)]
pub enum OrgError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<StoreError> for OrgError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(m) => OrgError::Conflict(m),
            other => OrgError::Storage(other.to_string()),
        }
    }
}

impl From<OrgError> for muster_core::ServiceError {
    fn from(e: OrgError) -> Self {
        match e {
            OrgError::NotFound(m) => muster_core::ServiceError::NotFound(m),
            OrgError::Conflict(m) => muster_core::ServiceError::Conflict(m),
            OrgError::Validation(m) => muster_core::ServiceError::Validation(m),
            OrgError::Unauthorized(m) => muster_core::ServiceError::Unauthorized(m),
            OrgError::Forbidden(m) => muster_core::ServiceError::PermissionDenied(m),
            OrgError::RateLimited(m) => muster_core::ServiceError::RateLimited(m),
            OrgError::Storage(m) => muster_core::ServiceError::Storage(m),
            OrgError::Internal(m) => muster_core::ServiceError::Internal(m),
        }
    }
}

/// Configuration for the org service.
#[derive(Debug, Clone)]
pub struct OrgConfig {
    /// Resolved-role cache lifetime in seconds (default: 60).
    pub role_cache_ttl_secs: u64,

    /// Full backup exports allowed per caller per window.
    pub backup_create_limit: u32,
    pub backup_create_window_secs: u64,

    /// Safety-backup exports allowed per caller per window.
    pub backup_quick_limit: u32,
    pub backup_quick_window_secs: u64,

    /// Restores allowed per caller per window.
    pub restore_limit: u32,
    pub restore_window_secs: u64,

    /// Toggle for squad-scoped permission narrowing. Carried in
    /// configuration only; nothing in this core branches on it yet.
    pub squad_scoped_permissions: bool,
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self {
            role_cache_ttl_secs: 60,
            backup_create_limit: 2,
            backup_create_window_secs: 60,
            backup_quick_limit: 5,
            backup_quick_window_secs: 60,
            restore_limit: 2,
            restore_window_secs: 300,
            squad_scoped_permissions: false,
        }
    }
}

/// The org service: permission-aware generic resource access plus the
/// backup/restore engine, over a shared document store.
///
/// The role cache is the only cross-request mutable state; everything
/// else is read-only after construction.
pub struct OrgService {
    pub(crate) store: Arc<DocStore>,
    pub(crate) config: OrgConfig,
    pub(crate) registry: registry::ResourceRegistry,
    pub(crate) role_cache: role_cache::RoleCache,
    pub(crate) create_limiter: throttle::RateLimiter,
    pub(crate) quick_limiter: throttle::RateLimiter,
    pub(crate) restore_limiter: throttle::RateLimiter,
}

impl OrgService {
    pub fn new(store: Arc<DocStore>, config: OrgConfig) -> Arc<Self> {
        use std::time::Duration;

        let role_cache = role_cache::RoleCache::new(config.role_cache_ttl_secs);
        let create_limiter = throttle::RateLimiter::new(
            config.backup_create_limit,
            Duration::from_secs(config.backup_create_window_secs),
        );
        let quick_limiter = throttle::RateLimiter::new(
            config.backup_quick_limit,
            Duration::from_secs(config.backup_quick_window_secs),
        );
        let restore_limiter = throttle::RateLimiter::new(
            config.restore_limit,
            Duration::from_secs(config.restore_window_secs),
        );

        Arc::new(Self {
            store,
            config,
            registry: registry::ResourceRegistry::standard(),
            role_cache,
            create_limiter,
            quick_limiter,
            restore_limiter,
        })
    }

    pub fn config(&self) -> &OrgConfig {
        &self.config
    }

    pub fn registry(&self) -> &registry::ResourceRegistry {
        &self.registry
    }

    pub(crate) fn collection(&self, name: &str) -> Collection {
        self.store.collection(name)
    }
}
