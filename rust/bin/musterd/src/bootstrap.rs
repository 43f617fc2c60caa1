//! Bootstrap — first-start checks and administrator account creation.
//!
//! When musterd starts:
//! 1. Verify the config carries an admin token — if not, refuse to start.
//! 2. Ensure the administrator role and account exist in the database.

use std::sync::Arc;

use muster_core::now_rfc3339;
use muster_store::DocStore;
use tracing::info;

use crate::config::ServerConfig;

/// The well-known role id for the bootstrap administrator.
pub const ADMIN_ROLE_ID: &str = "org:admin";

/// The well-known account id for the bootstrap administrator.
pub const ADMIN_USER_ID: &str = "admin";

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    if config.admin.token.is_empty() {
        anyhow::bail!(
            "No admin token found in configuration.\n\
             Set `[admin] token` before starting the server."
        );
    }
    Ok(())
}

/// Ensure the administrator role and account exist. Creates them if
/// missing; never overwrites an existing account or its token.
pub fn ensure_admin_account(store: &Arc<DocStore>, token: &str) -> anyhow::Result<()> {
    let roles = store.collection("roles");
    if roles.get(ADMIN_ROLE_ID)?.is_none() {
        roles.insert(&serde_json::json!({
            "id": ADMIN_ROLE_ID,
            "name": "Administrator",
            "roles": true,
            "created_at": now_rfc3339(),
        }))?;
        info!("Created administrator role");
    }

    let users = store.collection("users");
    if users.get(ADMIN_USER_ID)?.is_none() {
        users.insert(&serde_json::json!({
            "id": ADMIN_USER_ID,
            "name": "Administrator",
            "role_id": ADMIN_ROLE_ID,
            "token": token,
            "created_at": now_rfc3339(),
        }))?;
        info!("Created administrator account");
    } else {
        info!("Administrator account already exists");
    }

    Ok(())
}
