use serde::{Deserialize, Serialize};
use serde_json::Value;

use muster_core::now_rfc3339;

/// One append-only audit trail record.
///
/// Written by the access layer for every mutating operation (and by a
/// few bespoke operations such as backup). Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// What happened, e.g. `"members.created"` or `"backup.restored"`.
    pub action: String,

    /// RFC 3339 time of the action.
    pub timestamp: String,

    /// Operation-specific detail (inserted payload, restore summary, ...).
    pub payload: Value,

    /// RFC 3339 record creation time.
    pub created_at: String,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, payload: Value) -> Self {
        let now = now_rfc3339();
        Self {
            action: action.into(),
            timestamp: now.clone(),
            payload,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let entry = AuditEntry::new("members.created", serde_json::json!({"id": "m1"}));
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["action"], "members.created");
        assert_eq!(value["payload"]["id"], "m1");
    }
}
