//! Audit trail writes.
//!
//! Every mutating operation on a resource appends one entry, except
//! mutations of the audit trail itself (which would recurse without
//! bound). Backup and restore append their own summary entries.

use serde_json::Value;

use crate::model::AuditEntry;
use crate::service::{OrgError, OrgService, AUDIT_COLLECTION};

impl OrgService {
    /// Append an audit entry. Failures propagate to the caller.
    pub(crate) fn audit(&self, action: &str, payload: Value) -> Result<(), OrgError> {
        let entry = AuditEntry::new(action, payload);
        let doc = serde_json::to_value(&entry)
            .map_err(|e| OrgError::Internal(e.to_string()))?;
        self.collection(AUDIT_COLLECTION).insert(&doc)?;
        Ok(())
    }

    /// Append an audit entry on a path that must keep going even when
    /// the trail itself cannot be written (degraded exports, restore
    /// summaries). Failures are logged, not surfaced.
    pub(crate) fn audit_best_effort(&self, action: &str, payload: Value) {
        if let Err(e) = self.audit(action, payload) {
            tracing::warn!("audit write failed for {}: {}", action, e);
        }
    }

    /// Read back the audit trail, newest entries last.
    pub fn audit_entries(&self) -> Result<Vec<Value>, OrgError> {
        Ok(self.collection(AUDIT_COLLECTION).all()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::service::{OrgConfig, OrgService};
    use muster_store::DocStore;

    #[test]
    fn test_audit_appends_entry() {
        let svc = OrgService::new(DocStore::open_in_memory().unwrap(), OrgConfig::default());
        svc.audit("members.created", serde_json::json!({"id": "m1"})).unwrap();

        let entries = svc.audit_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["action"], "members.created");
        assert_eq!(entries[0]["payload"]["id"], "m1");
        assert!(entries[0].get("createdAt").is_some());
    }
}
