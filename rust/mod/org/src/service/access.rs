//! The generic resource access layer.
//!
//! One set of operations — read, insert, update, remove, count,
//! options, live feed — instantiated for every registered resource.
//! Structural validation runs before any permission check so malformed
//! requests never reach authorization logic; permission and validation
//! failures are guaranteed to leave zero side effects.

use serde::Serialize;
use serde_json::Value;

use muster_core::{merge_patch, QueryOptions, RequestContext};

use crate::model::Action;
use crate::service::registry::ResourceEntry;
use crate::service::{OrgError, OrgService, AUDIT_COLLECTION};

/// A live-feed registration result.
///
/// `open` is false when the gate refused the caller; a closed feed is
/// indistinguishable from an empty resource, so unauthenticated probes
/// learn nothing about what exists. The push transport that keeps the
/// feed updated lives outside this core.
#[derive(Debug, Clone, Serialize)]
pub struct Feed {
    pub open: bool,
    pub items: Vec<Value>,
}

impl Feed {
    fn closed() -> Self {
        Self {
            open: false,
            items: Vec::new(),
        }
    }
}

impl OrgService {
    /// Return documents of `resource` matching the filter.
    pub fn read(
        &self,
        ctx: &RequestContext,
        resource: &str,
        filter: &Value,
        options: &QueryOptions,
    ) -> Result<Vec<Value>, OrgError> {
        let entry = self.entry(resource)?;
        let filter = parse_filter(filter)?;
        self.require_identity(ctx)?;
        self.require_module(ctx, &entry, Action::Read)?;

        Ok(self.collection(entry.name).find(&filter, options)?)
    }

    /// Register a live feed over `resource`.
    ///
    /// Anonymous callers (and authenticated callers the module denies)
    /// get a closed feed rather than an error.
    pub fn live_feed(
        &self,
        ctx: &RequestContext,
        resource: &str,
        filter: &Value,
        options: &QueryOptions,
    ) -> Result<Feed, OrgError> {
        let entry = self.entry(resource)?;
        let filter = parse_filter(filter)?;

        if ctx.is_anonymous() {
            return Ok(Feed::closed());
        }
        if let Some(module) = entry.permission_module {
            if !self.check_permission(ctx, module, Action::Read)? {
                return Ok(Feed::closed());
            }
        }

        let items = self.collection(entry.name).find(&filter, options)?;
        Ok(Feed { open: true, items })
    }

    /// Insert one document, returning its id.
    ///
    /// Anonymous callers are allowed only on unsafe resources (public
    /// intake); for them the permission check is skipped entirely.
    pub fn insert(
        &self,
        ctx: &RequestContext,
        resource: &str,
        payload: &Value,
    ) -> Result<String, OrgError> {
        let entry = self.entry(resource)?;
        if !payload.is_object() {
            return Err(OrgError::Validation("payload must be a JSON object".into()));
        }

        if ctx.is_anonymous() {
            if !entry.unsafe_create {
                return Err(OrgError::Unauthorized(format!(
                    "authentication required to create {}",
                    resource
                )));
            }
        } else {
            self.require_module(ctx, &entry, Action::Create)?;
        }

        let id = self.collection(entry.name).insert(payload)?;

        if entry.name != AUDIT_COLLECTION {
            let mut logged = payload.clone();
            logged["id"] = Value::String(id.clone());
            self.audit(&format!("{}.created", entry.name), logged)?;
        }

        Ok(id)
    }

    /// Merge `data` into the document identified by `id`.
    pub fn update(
        &self,
        ctx: &RequestContext,
        resource: &str,
        id: &str,
        data: &Value,
    ) -> Result<(), OrgError> {
        let entry = self.entry(resource)?;
        validate_id(id)?;
        if !data.is_object() {
            return Err(OrgError::Validation("update data must be a JSON object".into()));
        }
        self.require_identity(ctx)?;
        self.require_module(ctx, &entry, Action::Update)?;

        let collection = self.collection(entry.name);
        let Some(mut doc) = collection.get(id)? else {
            return Err(OrgError::NotFound(format!("{}/{}", entry.name, id)));
        };
        merge_patch(&mut doc, data);
        collection.replace(id, &doc)?;

        if entry.name != AUDIT_COLLECTION {
            self.audit(
                &format!("{}.updated", entry.name),
                serde_json::json!({"id": id, "data": data}),
            )?;
        }

        if entry.name == "roles" {
            self.clear_role_cache(id);
        }

        Ok(())
    }

    /// Delete the document identified by `id`. Fails with NotFound
    /// when the document does not exist.
    pub fn remove(
        &self,
        ctx: &RequestContext,
        resource: &str,
        id: &str,
    ) -> Result<(), OrgError> {
        let entry = self.entry(resource)?;
        validate_id(id)?;
        self.require_identity(ctx)?;
        self.require_module(ctx, &entry, Action::Delete)?;

        let collection = self.collection(entry.name);
        if collection.get(id)?.is_none() {
            return Err(OrgError::NotFound(format!("{}/{}", entry.name, id)));
        }
        collection.remove(id)?;

        if entry.name != AUDIT_COLLECTION {
            self.audit(
                &format!("{}.deleted", entry.name),
                serde_json::json!({"id": id}),
            )?;
        }

        if entry.name == "roles" {
            self.clear_role_cache(id);
        }

        Ok(())
    }

    /// Count documents of `resource` matching the filter.
    pub fn count(
        &self,
        ctx: &RequestContext,
        resource: &str,
        filter: &Value,
    ) -> Result<usize, OrgError> {
        let entry = self.entry(resource)?;
        let filter = parse_filter(filter)?;
        self.require_identity(ctx)?;
        self.require_module(ctx, &entry, Action::Read)?;

        Ok(self.collection(entry.name).count(&filter)?)
    }

    /// Compact projection of every document, for selection widgets.
    pub fn options(
        &self,
        ctx: &RequestContext,
        resource: &str,
    ) -> Result<Vec<Value>, OrgError> {
        let entry = self.entry(resource)?;
        self.require_identity(ctx)?;
        self.require_module(ctx, &entry, Action::Read)?;

        let docs = self.collection(entry.name).all()?;
        Ok(docs.into_iter().map(option_row).collect())
    }

    fn entry(&self, resource: &str) -> Result<ResourceEntry, OrgError> {
        self.registry
            .get(resource)
            .copied()
            .ok_or_else(|| OrgError::NotFound(format!("unknown resource '{}'", resource)))
    }

    fn require_identity(&self, ctx: &RequestContext) -> Result<(), OrgError> {
        if ctx.is_anonymous() {
            return Err(OrgError::Unauthorized("authentication required".into()));
        }
        Ok(())
    }

    /// Enforce the resource's permission module, if it has one. A
    /// resource without a module is open to any authenticated caller —
    /// an absent module means "skip the check", never "deny".
    fn require_module(
        &self,
        ctx: &RequestContext,
        entry: &ResourceEntry,
        action: Action,
    ) -> Result<(), OrgError> {
        let Some(module) = entry.permission_module else {
            return Ok(());
        };
        if !self.check_permission(ctx, module, action)? {
            return Err(OrgError::Forbidden(format!(
                "missing {}.{} permission",
                module,
                action.as_str()
            )));
        }
        Ok(())
    }
}

fn parse_filter(filter: &Value) -> Result<serde_json::Map<String, Value>, OrgError> {
    match filter {
        Value::Null => Ok(serde_json::Map::new()),
        Value::Object(map) => Ok(map.clone()),
        _ => Err(OrgError::Validation("filter must be a JSON object".into())),
    }
}

fn validate_id(id: &str) -> Result<(), OrgError> {
    if id.is_empty() {
        return Err(OrgError::Validation("id must be a non-empty string".into()));
    }
    Ok(())
}

fn option_row(doc: Value) -> Value {
    let id = doc.get("id").and_then(Value::as_str).unwrap_or_default();
    let name = doc.get("name").and_then(Value::as_str);
    let title = doc.get("title").and_then(Value::as_str);
    let label = name.or(title).unwrap_or(id);
    let title = title.or(name).unwrap_or(id);
    serde_json::json!({
        "key": id,
        "label": label,
        "title": title,
        "value": id,
        "raw": doc,
    })
}
