//! Server configuration loading.
//!
//! Configuration lives in a TOML file. The `-c` argument takes either
//! a context name (resolved to `/etc/muster/<name>.toml`) or a direct
//! path.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use org::service::OrgConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    pub admin: AdminConfig,

    #[serde(default)]
    pub org: OrgSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Bearer token for the bootstrap administrator account.
    pub token: String,
}

/// Optional `[org]` overrides; anything omitted keeps the module
/// default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrgSection {
    pub role_cache_ttl_secs: Option<u64>,
    pub backup_create_limit: Option<u32>,
    pub backup_create_window_secs: Option<u64>,
    pub backup_quick_limit: Option<u32>,
    pub backup_quick_window_secs: Option<u64>,
    pub restore_limit: Option<u32>,
    pub restore_window_secs: Option<u64>,
    pub squad_scoped_permissions: Option<bool>,
}

impl OrgSection {
    pub fn to_org_config(&self) -> OrgConfig {
        let mut config = OrgConfig::default();
        if let Some(v) = self.role_cache_ttl_secs {
            config.role_cache_ttl_secs = v;
        }
        if let Some(v) = self.backup_create_limit {
            config.backup_create_limit = v;
        }
        if let Some(v) = self.backup_create_window_secs {
            config.backup_create_window_secs = v;
        }
        if let Some(v) = self.backup_quick_limit {
            config.backup_quick_limit = v;
        }
        if let Some(v) = self.backup_quick_window_secs {
            config.backup_quick_window_secs = v;
        }
        if let Some(v) = self.restore_limit {
            config.restore_limit = v;
        }
        if let Some(v) = self.restore_window_secs {
            config.restore_window_secs = v;
        }
        if let Some(v) = self.squad_scoped_permissions {
            config.squad_scoped_permissions = v;
        }
        config
    }
}

impl ServerConfig {
    /// Resolve a context name or path to a config file path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/muster/{}.toml", name_or_path))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("cannot parse {}: {}", path.display(), e))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/muster/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ServerConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/muster"

            [admin]
            token = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.data_dir, "/var/lib/muster");
        assert_eq!(config.org.to_org_config().role_cache_ttl_secs, 60);
    }

    #[test]
    fn test_org_overrides() {
        let config: ServerConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/tmp"

            [admin]
            token = "secret"

            [org]
            role_cache_ttl_secs = 5
            restore_limit = 1
            "#,
        )
        .unwrap();
        let org = config.org.to_org_config();
        assert_eq!(org.role_cache_ttl_secs, 5);
        assert_eq!(org.restore_limit, 1);
        assert_eq!(org.backup_create_limit, 2);
    }
}
