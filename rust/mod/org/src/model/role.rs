//! Permission shapes on role documents.
//!
//! A role document is free-form JSON: a handful of descriptive fields
//! (`id`, `name`, `color`, ...) plus one entry per permission module.
//! A CRUD module's value is either a legacy boolean (full access or
//! none) or a four-flag object; a boolean module's value is a single
//! on/off flag. Normalization (see `service::permissions`) expands
//! every CRUD value into the four-flag form, with one exception: the
//! literal `"roles": true` is the admin marker and stays a boolean.

use serde::{Deserialize, Serialize};

/// Permission modules whose access is four independent booleans.
pub const CRUD_MODULES: &[&str] = &[
    "members",
    "events",
    "tasks",
    "squads",
    "ranks",
    "specializations",
    "medals",
    "registrations",
    "discovery_types",
    "event_types",
    "task_statuses",
    "roles",
    "positions",
    "questionnaires",
];

/// Permission modules whose access is a single on/off flag
/// (whole pages, not data resources).
pub const BOOL_MODULES: &[&str] = &[
    "dashboard",
    "activity_log",
    "settings",
    "org_chart",
];

/// One of the four CRUD actions a permission module can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// The canonical four-flag permission value for a CRUD module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudPermissions {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
}

impl CrudPermissions {
    /// All four flags set to the same value (legacy-boolean expansion).
    pub fn all(value: bool) -> Self {
        Self {
            read: value,
            create: value,
            update: value,
            delete: value,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.read,
            Action::Create => self.create,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_expansion() {
        let p = CrudPermissions::all(true);
        assert!(p.read && p.create && p.update && p.delete);
        let p = CrudPermissions::all(false);
        assert!(!p.read && !p.create && !p.update && !p.delete);
    }

    #[test]
    fn test_allows() {
        let p = CrudPermissions {
            read: true,
            create: false,
            update: true,
            delete: false,
        };
        assert!(p.allows(Action::Read));
        assert!(!p.allows(Action::Create));
        assert!(p.allows(Action::Update));
        assert!(!p.allows(Action::Delete));
    }

    #[test]
    fn test_partial_object_deserializes_with_defaults() {
        let p: CrudPermissions = serde_json::from_value(serde_json::json!({"read": true})).unwrap();
        assert!(p.read);
        assert!(!p.delete);
    }

    #[test]
    fn test_module_lists_are_disjoint() {
        for m in CRUD_MODULES {
            assert!(!BOOL_MODULES.contains(m));
        }
    }
}
