use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A full point-in-time export of every registered resource.
///
/// The wire field names are stable — snapshots written by one build
/// must validate and restore under any later build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Snapshot format version, e.g. `"1.0"`.
    pub version: String,

    /// RFC 3339 export time.
    pub timestamp: String,

    /// Identifies the owning application; restore and validate reject
    /// snapshots taken by a different one.
    pub app_tag: String,

    /// Resource name → raw documents.
    pub collections: BTreeMap<String, Vec<Value>>,

    pub meta: SnapshotMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub total_documents: usize,

    /// Resource name → document count at export time.
    pub collection_counts: BTreeMap<String, usize>,

    /// Set on snapshots taken automatically right before a restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_safety_backup: Option<bool>,
}

/// Result of the pure structural snapshot check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCheck {
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl SnapshotCheck {
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            version: None,
            timestamp: None,
            meta: None,
        }
    }

    pub fn valid_for(raw: &Value) -> Self {
        Self {
            valid: true,
            error: None,
            version: raw
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string),
            timestamp: raw
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_string),
            meta: raw.get("meta").cloned(),
        }
    }
}

/// A single resource's failure during restore or export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceError {
    pub resource: String,
    pub error: String,
}

/// What a restore actually did.
///
/// `success` is true only when no resource failed; partial failures
/// leave the successful resources restored (restore is intentionally
/// not atomic across resources).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub success: bool,

    /// Resource name → documents written.
    pub restored: BTreeMap<String, usize>,

    pub errors: Vec<ResourceError>,

    /// The safety backup taken before mutating, if one was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_backup: Option<Snapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_wire_field_names() {
        let snapshot = Snapshot {
            version: "1.0".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            app_tag: "muster".into(),
            collections: BTreeMap::from([("members".to_string(), vec![json!({"id": "m1"})])]),
            meta: SnapshotMeta {
                total_documents: 1,
                collection_counts: BTreeMap::from([("members".to_string(), 1)]),
                is_safety_backup: None,
            },
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["appTag"], "muster");
        assert_eq!(value["meta"]["totalDocuments"], 1);
        assert_eq!(value["meta"]["collectionCounts"]["members"], 1);
        assert!(value["meta"].get("isSafetyBackup").is_none());
    }

    #[test]
    fn test_safety_flag_serializes_when_set() {
        let meta = SnapshotMeta {
            total_documents: 0,
            collection_counts: BTreeMap::new(),
            is_safety_backup: Some(true),
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["isSafetyBackup"], true);
    }

    #[test]
    fn test_check_constructors() {
        let bad = SnapshotCheck::invalid("missing version");
        assert!(!bad.valid);
        assert_eq!(bad.error.as_deref(), Some("missing version"));

        let raw = json!({"version": "1.0", "timestamp": "t", "meta": {"totalDocuments": 3}});
        let good = SnapshotCheck::valid_for(&raw);
        assert!(good.valid);
        assert_eq!(good.version.as_deref(), Some("1.0"));
        assert_eq!(good.meta.unwrap()["totalDocuments"], 3);
    }
}
