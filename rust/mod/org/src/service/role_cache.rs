use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde_json::Value;

/// A resolved, normalized role for one identity.
#[derive(Debug, Clone)]
pub struct ResolvedRole {
    /// Id of the underlying role document.
    pub role_id: String,

    /// The normalized role document.
    pub role: Value,
}

struct CacheEntry {
    resolved: ResolvedRole,
    inserted_at: Instant,
}

/// In-memory cache of identity → resolved role, with TTL.
///
/// The only cross-request mutable state in the subsystem; the RwLock
/// keeps concurrent resolution and invalidation safe.
pub struct RoleCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl RoleCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cached role for an identity. Returns None if expired or missing.
    pub fn get(&self, identity: &str) -> Option<ResolvedRole> {
        let entries = self.entries.read().unwrap();
        entries.get(identity).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(entry.resolved.clone())
            } else {
                None
            }
        })
    }

    /// Store a resolved role for an identity.
    pub fn set(&self, identity: &str, resolved: ResolvedRole) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            identity.to_string(),
            CacheEntry {
                resolved,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop entries keyed by this identity, and entries whose cached
    /// role document has this id (so invalidating by role id evicts
    /// every identity holding that role).
    pub fn invalidate(&self, role_id_or_identity: &str) {
        let mut entries = self.entries.write().unwrap();
        entries.retain(|identity, entry| {
            identity != role_id_or_identity && entry.resolved.role_id != role_id_or_identity
        });
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write().unwrap();
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolved(role_id: &str) -> ResolvedRole {
        ResolvedRole {
            role_id: role_id.to_string(),
            role: json!({"id": role_id}),
        }
    }

    #[test]
    fn test_get_set() {
        let cache = RoleCache::new(60);
        assert!(cache.get("u1").is_none());

        cache.set("u1", resolved("r1"));
        let hit = cache.get("u1").unwrap();
        assert_eq!(hit.role_id, "r1");
    }

    #[test]
    fn test_expiry() {
        let cache = RoleCache::new(0);
        cache.set("u1", resolved("r1"));
        assert!(cache.get("u1").is_none());
    }

    #[test]
    fn test_invalidate_by_identity() {
        let cache = RoleCache::new(60);
        cache.set("u1", resolved("r1"));
        cache.set("u2", resolved("r2"));

        cache.invalidate("u1");
        assert!(cache.get("u1").is_none());
        assert!(cache.get("u2").is_some());
    }

    #[test]
    fn test_invalidate_by_role_id_evicts_all_holders() {
        let cache = RoleCache::new(60);
        cache.set("u1", resolved("r1"));
        cache.set("u2", resolved("r1"));
        cache.set("u3", resolved("r2"));

        cache.invalidate("r1");
        assert!(cache.get("u1").is_none());
        assert!(cache.get("u2").is_none());
        assert!(cache.get("u3").is_some());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = RoleCache::new(60);
        cache.set("u1", resolved("r1"));
        cache.set("u2", resolved("r2"));
        cache.invalidate_all();
        assert!(cache.get("u1").is_none());
        assert!(cache.get("u2").is_none());
    }
}
