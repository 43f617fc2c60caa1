//! The backup/restore engine.
//!
//! Rides on the resource registry so "every resource" is iterated in
//! one place instead of being hard-coded twice. Export degrades
//! gracefully (a failed resource becomes an empty list); restore is
//! deliberately not atomic across resources — the one fully fatal
//! precondition is a failed safety backup, because proceeding without
//! a safety net is unacceptable.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};

use muster_core::{now_rfc3339, RequestContext};

use crate::model::{Action, ResourceError, RestoreReport, Snapshot, SnapshotCheck, SnapshotMeta};
use crate::service::{OrgError, OrgService, SETTINGS_COLLECTION, USERS_COLLECTION};

/// Identifies snapshots taken by this application; validate and
/// restore reject snapshots carrying any other tag.
pub const APP_TAG: &str = "muster";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Options for [`OrgService::restore_backup`].
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Take a safety backup before mutating anything. On by default;
    /// a failure of this step aborts the whole restore.
    pub create_safety_backup: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            create_safety_backup: true,
        }
    }
}

/// Pure structural snapshot check. Never mutates state.
pub fn validate_snapshot(raw: &Value) -> SnapshotCheck {
    if !raw.is_object() {
        return SnapshotCheck::invalid("snapshot must be a JSON object");
    }
    if raw.get("version").is_none() {
        return SnapshotCheck::invalid("snapshot is missing 'version'");
    }
    if raw.get("collections").is_none() {
        return SnapshotCheck::invalid("snapshot is missing 'collections'");
    }
    match raw.get("appTag").and_then(Value::as_str) {
        Some(tag) if tag == APP_TAG => SnapshotCheck::valid_for(raw),
        Some(tag) => SnapshotCheck::invalid(format!(
            "snapshot belongs to application '{}', expected '{}'",
            tag, APP_TAG
        )),
        None => SnapshotCheck::invalid("snapshot is missing 'appTag'"),
    }
}

impl OrgService {
    /// Export a full snapshot of every registered resource plus the
    /// settings and account collections. Requires administrator-level
    /// access and writes one summarizing audit entry.
    pub fn create_backup(&self, ctx: &RequestContext) -> Result<Snapshot, OrgError> {
        if !self.create_limiter.allow(&caller_key(ctx)) {
            return Err(OrgError::RateLimited("backup.create".into()));
        }
        self.require_backup_permission(ctx)?;

        let snapshot = self.export_snapshot(false);
        self.audit(
            "backup.created",
            serde_json::json!({
                "totalDocuments": snapshot.meta.total_documents,
                "collectionCounts": snapshot.meta.collection_counts,
            }),
        )?;
        info!(
            "backup created: {} documents across {} collections",
            snapshot.meta.total_documents,
            snapshot.collections.len()
        );
        Ok(snapshot)
    }

    /// Export a safety backup: identical export logic, tagged
    /// `isSafetyBackup`, and no audit entry (this runs internally,
    /// potentially at high frequency, right before a restore).
    pub fn create_quick_backup(&self, ctx: &RequestContext) -> Result<Snapshot, OrgError> {
        if !self.quick_limiter.allow(&caller_key(ctx)) {
            return Err(OrgError::RateLimited("backup.createQuick".into()));
        }
        self.require_backup_permission(ctx)?;
        Ok(self.export_snapshot(true))
    }

    /// Structural snapshot check (see [`validate_snapshot`]).
    pub fn validate_backup(&self, raw: &Value) -> SnapshotCheck {
        validate_snapshot(raw)
    }

    /// Restore a snapshot.
    ///
    /// Validation failure and safety-backup failure abort with zero
    /// mutation. After that point each resource is restored
    /// independently: one resource's failure is recorded in the
    /// report's `errors` and the loop continues, leaving the other
    /// resources restored. The account of the identity performing the
    /// restore is never deleted and never reinserted.
    pub fn restore_backup(
        &self,
        ctx: &RequestContext,
        raw: Value,
        options: &RestoreOptions,
    ) -> Result<RestoreReport, OrgError> {
        if !self.restore_limiter.allow(&caller_key(ctx)) {
            return Err(OrgError::RateLimited("backup.restore".into()));
        }
        self.require_backup_permission(ctx)?;

        let check = validate_snapshot(&raw);
        if !check.valid {
            return Err(OrgError::Validation(
                check.error.unwrap_or_else(|| "invalid snapshot".into()),
            ));
        }
        let snapshot: Snapshot = serde_json::from_value(raw)
            .map_err(|e| OrgError::Validation(format!("malformed snapshot: {}", e)))?;

        // The one fully fatal step: no safety net, no restore.
        let safety_backup = if options.create_safety_backup {
            Some(self.create_quick_backup(ctx)?)
        } else {
            None
        };

        // Identity is present: require_backup_permission rejected
        // anonymous callers above.
        let identity = ctx.identity().unwrap_or_default().to_string();

        let mut restored: BTreeMap<String, usize> = BTreeMap::new();
        let mut errors: Vec<ResourceError> = Vec::new();

        for (resource, docs) in &snapshot.collections {
            if resource == SETTINGS_COLLECTION || resource == USERS_COLLECTION {
                continue;
            }
            let Some(entry) = self.registry.get(resource) else {
                continue;
            };
            match self.restore_collection(entry.name, docs) {
                Ok(count) => {
                    restored.insert(resource.clone(), count);
                }
                Err((count, e)) => {
                    restored.insert(resource.clone(), count);
                    self.record_restore_failure(&mut errors, resource, e);
                }
            }
        }

        if let Some(docs) = snapshot.collections.get(SETTINGS_COLLECTION) {
            match self.restore_collection(SETTINGS_COLLECTION, docs) {
                Ok(count) => {
                    restored.insert(SETTINGS_COLLECTION.to_string(), count);
                }
                Err((count, e)) => {
                    restored.insert(SETTINGS_COLLECTION.to_string(), count);
                    self.record_restore_failure(&mut errors, SETTINGS_COLLECTION, e);
                }
            }
        }

        if let Some(docs) = snapshot.collections.get(USERS_COLLECTION) {
            let (count, err) = self.restore_users(&identity, docs);
            restored.insert(USERS_COLLECTION.to_string(), count);
            if let Some(e) = err {
                self.record_restore_failure(&mut errors, USERS_COLLECTION, e);
            }
        }

        // Role documents may have been rewritten wholesale; cached
        // resolutions are stale now.
        self.role_cache.invalidate_all();

        // The audit trail must reflect what actually happened, even
        // when partially failed.
        self.audit_best_effort(
            "backup.restored",
            serde_json::json!({
                "restored": restored,
                "errors": errors,
            }),
        );
        info!(
            "restore finished: {} collections restored, {} failed",
            restored.len(),
            errors.len()
        );

        Ok(RestoreReport {
            success: errors.is_empty(),
            restored,
            errors,
            safety_backup,
        })
    }

    /// Export every registered resource plus settings and accounts.
    ///
    /// A per-resource fetch failure becomes an empty list instead of
    /// aborting — a partial backup is still better than none. For
    /// regular backups the failure is logged to the audit trail;
    /// safety backups stay write-free.
    fn export_snapshot(&self, safety: bool) -> Snapshot {
        let mut collections: BTreeMap<String, Vec<Value>> = BTreeMap::new();

        let names: Vec<&str> = self
            .registry
            .names()
            .chain([SETTINGS_COLLECTION, USERS_COLLECTION])
            .collect();

        for name in names {
            let docs = match self.collection(name).all() {
                Ok(docs) => docs,
                Err(e) => {
                    warn!("backup export of '{}' failed: {}", name, e);
                    if !safety {
                        self.audit_best_effort(
                            "backup.export_failed",
                            serde_json::json!({"resource": name, "error": e.to_string()}),
                        );
                    }
                    Vec::new()
                }
            };
            collections.insert(name.to_string(), docs);
        }

        let collection_counts: BTreeMap<String, usize> = collections
            .iter()
            .map(|(name, docs)| (name.clone(), docs.len()))
            .collect();
        let total_documents = collection_counts.values().sum();

        Snapshot {
            version: SNAPSHOT_VERSION.to_string(),
            timestamp: now_rfc3339(),
            app_tag: APP_TAG.to_string(),
            collections,
            meta: SnapshotMeta {
                total_documents,
                collection_counts,
                is_safety_backup: safety.then_some(true),
            },
        }
    }

    /// Delete-then-bulk-insert one collection. On failure returns the
    /// number of documents written before the error.
    fn restore_collection(
        &self,
        name: &str,
        docs: &[Value],
    ) -> Result<usize, (usize, OrgError)> {
        let collection = self.collection(name);
        collection.clear().map_err(|e| (0, OrgError::from(e)))?;

        let mut count = 0;
        for doc in docs {
            collection
                .insert(doc)
                .map_err(|e| (count, OrgError::from(e)))?;
            count += 1;
        }
        Ok(count)
    }

    /// Restore account documents, preserving the restoring identity.
    ///
    /// That account is excluded from the delete and skipped during
    /// insert so an administrator cannot lock themselves out mid
    /// restore; a duplicate-key conflict on that one id is swallowed,
    /// any other failure is reported.
    fn restore_users(&self, identity: &str, docs: &[Value]) -> (usize, Option<OrgError>) {
        let collection = self.collection(USERS_COLLECTION);
        if let Err(e) = collection.clear_except(identity) {
            return (0, Some(OrgError::from(e)));
        }

        let mut count = 0;
        for doc in docs {
            let doc_id = doc.get("id").and_then(Value::as_str);
            if doc_id == Some(identity) {
                // The kept account stands in for the snapshot's copy.
                count += 1;
                continue;
            }
            match collection.insert(doc) {
                Ok(_) => count += 1,
                Err(e) if e.is_conflict() && doc_id == Some(identity) => continue,
                Err(e) => return (count, Some(OrgError::from(e))),
            }
        }
        (count, None)
    }

    fn record_restore_failure(
        &self,
        errors: &mut Vec<ResourceError>,
        resource: &str,
        e: OrgError,
    ) {
        warn!("restore of '{}' failed: {}", resource, e);
        self.audit_best_effort(
            "backup.restore_failed",
            serde_json::json!({"resource": resource, "error": e.to_string()}),
        );
        errors.push(ResourceError {
            resource: resource.to_string(),
            error: e.to_string(),
        });
    }

    /// Backups and restores require administrator-level access; the
    /// settings page flag stands in for that.
    fn require_backup_permission(&self, ctx: &RequestContext) -> Result<(), OrgError> {
        if ctx.is_anonymous() {
            return Err(OrgError::Unauthorized("authentication required".into()));
        }
        if !self.check_permission(ctx, "settings", Action::Read)? {
            return Err(OrgError::Forbidden("settings access required".into()));
        }
        Ok(())
    }
}

fn caller_key(ctx: &RequestContext) -> String {
    ctx.identity().unwrap_or("anonymous").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use muster_store::DocStore;
    use serde_json::json;

    use crate::service::OrgConfig;

    fn service_with(config: OrgConfig) -> Arc<OrgService> {
        let svc = OrgService::new(DocStore::open_in_memory().unwrap(), config);
        svc.collection("roles")
            .insert(&json!({"id": "r_admin", "name": "Admin", "roles": true}))
            .unwrap();
        svc.collection("users")
            .insert(&json!({"id": "admin", "name": "Root", "role_id": "r_admin"}))
            .unwrap();
        svc
    }

    fn test_service() -> Arc<OrgService> {
        service_with(OrgConfig::default())
    }

    fn admin() -> RequestContext {
        RequestContext::authenticated("admin")
    }

    fn seed_documents(svc: &OrgService) {
        svc.collection("members").insert(&json!({"id": "m1", "name": "Ada"})).unwrap();
        svc.collection("members").insert(&json!({"id": "m2", "name": "Grace"})).unwrap();
        svc.collection("events").insert(&json!({"id": "e1", "name": "Camp"})).unwrap();
        svc.collection("settings").insert(&json!({"id": "main", "motto": "be prepared"})).unwrap();
    }

    #[test]
    fn test_create_exports_everything_and_audits() {
        let svc = test_service();
        seed_documents(&svc);

        let snapshot = svc.create_backup(&admin()).unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.app_tag, APP_TAG);
        assert_eq!(snapshot.meta.is_safety_backup, None);
        assert_eq!(snapshot.collections["members"].len(), 2);
        assert_eq!(snapshot.collections["events"].len(), 1);
        assert_eq!(snapshot.collections["settings"].len(), 1);
        assert_eq!(snapshot.collections["users"].len(), 1);
        assert_eq!(snapshot.meta.collection_counts["members"], 2);
        assert_eq!(
            snapshot.meta.total_documents,
            snapshot.meta.collection_counts.values().sum::<usize>()
        );

        let entries = svc.audit_entries().unwrap();
        assert!(entries.iter().any(|e| e["action"] == "backup.created"));
    }

    #[test]
    fn test_quick_backup_is_tagged_and_silent() {
        let svc = test_service();
        seed_documents(&svc);

        let snapshot = svc.create_quick_backup(&admin()).unwrap();
        assert_eq!(snapshot.meta.is_safety_backup, Some(true));
        assert!(svc.audit_entries().unwrap().is_empty());
    }

    #[test]
    fn test_backup_requires_elevated_permission() {
        let svc = test_service();
        svc.collection("roles")
            .insert(&json!({"id": "r_plain", "members": true}))
            .unwrap();
        svc.collection("users")
            .insert(&json!({"id": "plain", "role_id": "r_plain"}))
            .unwrap();

        let err = svc.create_backup(&RequestContext::authenticated("plain"));
        assert!(matches!(err, Err(OrgError::Forbidden(_))));
        let err = svc.create_backup(&RequestContext::anonymous());
        assert!(matches!(err, Err(OrgError::Unauthorized(_))));
    }

    #[test]
    fn test_validate() {
        let good = json!({"version": "1.0", "appTag": APP_TAG, "collections": {}});
        assert!(validate_snapshot(&good).valid);

        let check = validate_snapshot(&json!("nope"));
        assert!(!check.valid);

        let check = validate_snapshot(&json!({"appTag": APP_TAG, "collections": {}}));
        assert!(!check.valid);
        assert!(check.error.unwrap().contains("version"));

        let check = validate_snapshot(&json!({"version": "1.0", "appTag": APP_TAG}));
        assert!(!check.valid);
        assert!(check.error.unwrap().contains("collections"));

        let check = validate_snapshot(&json!({
            "version": "1.0", "appTag": "wrong-app", "collections": {}
        }));
        assert!(!check.valid);
        assert!(!check.error.unwrap().is_empty());
    }

    #[test]
    fn test_restore_round_trip() {
        let svc = test_service();
        seed_documents(&svc);
        let snapshot = svc.create_backup(&admin()).unwrap();
        let expected_counts = snapshot.meta.collection_counts.clone();

        // A fresh, empty deployment with only the restoring admin.
        let target = test_service();
        let raw = serde_json::to_value(&snapshot).unwrap();
        let report = target
            .restore_backup(&admin(), raw, &RestoreOptions::default())
            .unwrap();

        assert!(report.success);
        assert!(report.errors.is_empty());
        assert!(report.safety_backup.is_some());

        for (resource, count) in &expected_counts {
            // audit_log grows by restore's own trail entries.
            if resource == "audit_log" {
                continue;
            }
            let actual = target
                .collection(resource)
                .count(&serde_json::Map::new())
                .unwrap();
            assert_eq!(actual, *count, "{}", resource);
        }
        assert_eq!(
            target.collection("members").get("m1").unwrap().unwrap()["name"],
            "Ada"
        );
    }

    #[test]
    fn test_restore_rejects_wrong_app_tag_with_zero_mutation() {
        let svc = test_service();
        seed_documents(&svc);

        let raw = json!({"version": "1.0", "appTag": "wrong-app", "collections": {}});
        let err = svc.restore_backup(&admin(), raw, &RestoreOptions::default());
        assert!(matches!(err, Err(OrgError::Validation(_))));
        assert_eq!(svc.collection("members").count(&serde_json::Map::new()).unwrap(), 2);
    }

    #[test]
    fn test_failed_safety_backup_aborts_with_zero_mutation() {
        let svc = service_with(OrgConfig {
            backup_quick_limit: 0,
            ..OrgConfig::default()
        });
        seed_documents(&svc);

        let raw = json!({
            "version": "1.0",
            "appTag": APP_TAG,
            "collections": {"members": []},
        });
        let err = svc.restore_backup(&admin(), raw, &RestoreOptions::default());
        assert!(matches!(err, Err(OrgError::RateLimited(_))));

        // Nothing was deleted: the members collection is untouched.
        assert_eq!(svc.collection("members").count(&serde_json::Map::new()).unwrap(), 2);
    }

    #[test]
    fn test_restore_without_safety_backup_when_disabled() {
        let svc = service_with(OrgConfig {
            backup_quick_limit: 0,
            ..OrgConfig::default()
        });
        seed_documents(&svc);

        let raw = json!({
            "version": "1.0",
            "appTag": APP_TAG,
            "collections": {"members": [{"id": "m9", "name": "Solo"}]},
        });
        let report = svc
            .restore_backup(
                &admin(),
                raw,
                &RestoreOptions {
                    create_safety_backup: false,
                },
            )
            .unwrap();
        assert!(report.success);
        assert!(report.safety_backup.is_none());
        assert_eq!(svc.collection("members").count(&serde_json::Map::new()).unwrap(), 1);
    }

    #[test]
    fn test_partial_failure_restores_other_resources() {
        let svc = test_service();
        seed_documents(&svc);

        // A non-object document in one collection forces that
        // resource to fail mid-insert.
        let raw = json!({
            "version": "1.0",
            "appTag": APP_TAG,
            "collections": {
                "events": [[1, 2, 3]],
                "members": [{"id": "m7", "name": "New"}],
                "squads": [{"id": "s1", "name": "Falcons"}],
            },
        });
        let report = svc
            .restore_backup(&admin(), raw, &RestoreOptions::default())
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].resource, "events");
        assert!(!report.errors[0].error.is_empty());

        // Siblings were still restored.
        assert_eq!(report.restored["members"], 1);
        assert_eq!(report.restored["squads"], 1);
        assert_eq!(svc.collection("squads").count(&serde_json::Map::new()).unwrap(), 1);

        // The audit trail reflects both the failure and the summary.
        let actions: Vec<String> = svc
            .audit_entries()
            .unwrap()
            .iter()
            .map(|e| e["action"].as_str().unwrap().to_string())
            .collect();
        assert!(actions.contains(&"backup.restore_failed".to_string()));
        assert!(actions.contains(&"backup.restored".to_string()));
    }

    #[test]
    fn test_restore_preserves_restoring_account() {
        let svc = test_service();

        let raw = json!({
            "version": "1.0",
            "appTag": APP_TAG,
            "collections": {
                "users": [
                    {"id": "admin", "name": "Impostor", "role_id": "r_none"},
                    {"id": "other", "name": "Other"},
                ],
            },
        });
        let report = svc
            .restore_backup(&admin(), raw, &RestoreOptions::default())
            .unwrap();
        assert!(report.success);
        assert_eq!(report.restored["users"], 2);

        // The restoring admin's document is untouched; the snapshot's
        // copy of it was skipped.
        let doc = svc.collection("users").get("admin").unwrap().unwrap();
        assert_eq!(doc["name"], "Root");
        assert_eq!(doc["role_id"], "r_admin");
        assert!(svc.collection("users").get("other").unwrap().is_some());
    }

    #[test]
    fn test_restore_skips_unregistered_collections() {
        let svc = test_service();
        let raw = json!({
            "version": "1.0",
            "appTag": APP_TAG,
            "collections": {"payroll": [{"id": "x"}]},
        });
        let report = svc
            .restore_backup(&admin(), raw, &RestoreOptions::default())
            .unwrap();
        assert!(report.success);
        assert!(!report.restored.contains_key("payroll"));
        assert_eq!(svc.collection("payroll").count(&serde_json::Map::new()).unwrap(), 0);
    }

    #[test]
    fn test_create_is_rate_limited_per_caller() {
        let svc = service_with(OrgConfig {
            backup_create_limit: 1,
            ..OrgConfig::default()
        });

        svc.create_backup(&admin()).unwrap();
        let err = svc.create_backup(&admin());
        assert!(matches!(err, Err(OrgError::RateLimited(_))));
    }
}
