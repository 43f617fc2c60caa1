//! The role permission model.
//!
//! Role documents arrive in a heterogeneous legacy shape: a CRUD
//! module's value may be a plain boolean or a four-flag object, and
//! may be missing entirely. [`normalize_role_permissions`] converts a
//! role into the canonical shape once; every authorization question is
//! answered against the normalized form.

use serde_json::Value;

use muster_core::RequestContext;

use crate::model::{Action, CrudPermissions, BOOL_MODULES, CRUD_MODULES};
use crate::service::role_cache::ResolvedRole;
use crate::service::{OrgError, OrgService};

/// The logical permission module governing a resource, or `None` for
/// "no permission gate" — callers must treat `None` as "skip the
/// check", never as "deny".
///
/// Several physical resources share one module: attendance tracking is
/// billed against `events`, profile pictures and accounts against
/// `members`, questionnaire responses against `questionnaires`, and
/// the audit trail against the `activity_log` page flag.
pub fn permission_module(resource: &str) -> Option<&'static str> {
    match resource {
        "members" => Some("members"),
        "events" => Some("events"),
        "tasks" => Some("tasks"),
        "squads" => Some("squads"),
        "ranks" => Some("ranks"),
        "specializations" => Some("specializations"),
        "medals" => Some("medals"),
        "registrations" => Some("registrations"),
        "discovery_types" => Some("discovery_types"),
        "event_types" => Some("event_types"),
        "task_statuses" => Some("task_statuses"),
        "roles" => Some("roles"),
        "positions" => Some("positions"),
        "questionnaires" => Some("questionnaires"),
        "questionnaire_responses" => Some("questionnaires"),
        "attendances" => Some("events"),
        "profile_pictures" => Some("members"),
        "users" => Some("members"),
        "audit_log" => Some("activity_log"),
        _ => None,
    }
}

/// Normalize a role document into the canonical permission shape.
///
/// For every CRUD module: a boolean expands to four identical flags,
/// an object passes through unchanged, and an absent or malformed
/// value becomes all-denied. The one exception is `"roles": true` —
/// the admin marker — which is preserved as the literal boolean.
/// Boolean modules and non-permission fields pass through untouched.
pub fn normalize_role_permissions(role: Option<Value>) -> Option<Value> {
    let mut role = role?;
    let obj = role.as_object_mut()?;

    for module in CRUD_MODULES {
        let normalized = match obj.get(*module) {
            Some(Value::Bool(true)) if *module == "roles" => Value::Bool(true),
            Some(Value::Bool(b)) => to_value(CrudPermissions::all(*b)),
            Some(Value::Object(_)) => continue,
            _ => to_value(CrudPermissions::all(false)),
        };
        obj.insert(module.to_string(), normalized);
    }

    Some(role)
}

fn to_value(perms: CrudPermissions) -> Value {
    // CrudPermissions serializes to a plain four-key object.
    serde_json::to_value(perms).unwrap_or(Value::Null)
}

/// Whether a role is the administrator role: `roles` must be the
/// literal boolean `true`. A CRUD-object value for `roles` is a normal
/// permission on the roles resource, not the admin marker.
pub fn is_officer_or_admin(role: &Value) -> bool {
    role.get("roles") == Some(&Value::Bool(true))
}

impl OrgService {
    /// Answer an authorization question for the calling identity.
    ///
    /// Resolves the caller's role through the cache, then:
    /// administrators pass everything; boolean modules answer with
    /// their raw flag; CRUD modules answer with the flag for `action`,
    /// defaulting to denied when the module or action key is missing.
    /// An anonymous caller or one without a resolvable role is denied.
    pub fn check_permission(
        &self,
        ctx: &RequestContext,
        module: &str,
        action: Action,
    ) -> Result<bool, OrgError> {
        let Some(identity) = ctx.identity() else {
            return Ok(false);
        };

        let Some(resolved) = self.resolve_role(identity)? else {
            return Ok(false);
        };

        if is_officer_or_admin(&resolved.role) {
            return Ok(true);
        }

        if BOOL_MODULES.contains(&module) {
            return Ok(resolved
                .role
                .get(module)
                .and_then(Value::as_bool)
                .unwrap_or(false));
        }

        Ok(resolved
            .role
            .get(module)
            .and_then(|m| m.get(action.as_str()))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Drop cached role resolutions for a role id or identity.
    ///
    /// Must be called after any successful update or delete of a role
    /// document so that live permission edits take effect immediately
    /// instead of after the cache TTL.
    pub fn clear_role_cache(&self, role_id_or_identity: &str) {
        self.role_cache.invalidate(role_id_or_identity);
    }

    /// Resolve an identity to its normalized role, caching the result.
    ///
    /// A miss walks identity → account document → `role_id` → role
    /// document → normalization. No negative caching: an identity
    /// without a role is re-resolved on every call.
    fn resolve_role(&self, identity: &str) -> Result<Option<ResolvedRole>, OrgError> {
        if let Some(cached) = self.role_cache.get(identity) {
            return Ok(Some(cached));
        }

        let Some(user) = self.collection(super::USERS_COLLECTION).get(identity)? else {
            return Ok(None);
        };
        let Some(role_id) = user.get("role_id").and_then(Value::as_str) else {
            return Ok(None);
        };

        let raw = self.collection("roles").get(role_id)?;
        let Some(role) = normalize_role_permissions(raw) else {
            return Ok(None);
        };

        let resolved = ResolvedRole {
            role_id: role_id.to_string(),
            role,
        };
        self.role_cache.set(identity, resolved.clone());
        Ok(Some(resolved))
    }
}
