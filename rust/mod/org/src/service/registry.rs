//! The resource registry.
//!
//! Maps every logical resource name to its storage collection, the
//! permission module that governs it, and the unsafe-create flag.
//! Built once at startup; read-only afterwards. Unknown names are an
//! explicit NotFound at the access layer, never a panic.

use std::collections::BTreeMap;

use crate::service::permissions::permission_module;

/// One registered resource.
#[derive(Debug, Clone, Copy)]
pub struct ResourceEntry {
    /// Resource name; also the storage collection name.
    pub name: &'static str,

    /// The permission module billed for access, or `None` for "no
    /// permission gate" (open to any authenticated caller).
    pub permission_module: Option<&'static str>,

    /// Whether anonymous callers may create documents (public intake).
    pub unsafe_create: bool,
}

/// All resources exposed through the generic access layer.
pub struct ResourceRegistry {
    entries: BTreeMap<&'static str, ResourceEntry>,
}

/// Resource names served by the generic access layer. Registrations
/// accept anonymous creation (public intake form).
const RESOURCES: &[(&str, bool)] = &[
    ("members", false),
    ("events", false),
    ("tasks", false),
    ("squads", false),
    ("ranks", false),
    ("specializations", false),
    ("medals", false),
    ("registrations", true),
    ("discovery_types", false),
    ("event_types", false),
    ("task_statuses", false),
    ("roles", false),
    ("positions", false),
    ("questionnaires", false),
    ("questionnaire_responses", false),
    ("attendances", false),
    ("profile_pictures", false),
    ("audit_log", false),
];

impl ResourceRegistry {
    /// The full registration table.
    pub fn standard() -> Self {
        let mut entries = BTreeMap::new();
        for &(name, unsafe_create) in RESOURCES {
            entries.insert(
                name,
                ResourceEntry {
                    name,
                    permission_module: permission_module(name),
                    unsafe_create,
                },
            );
        }
        Self { entries }
    }

    /// Look up a resource by name.
    pub fn get(&self, name: &str) -> Option<&ResourceEntry> {
        self.entries.get(name)
    }

    /// All registered resource names, in stable order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_resource_is_none() {
        let registry = ResourceRegistry::standard();
        assert!(registry.get("payroll").is_none());
    }

    #[test]
    fn test_shared_permission_modules() {
        let registry = ResourceRegistry::standard();
        assert_eq!(
            registry.get("attendances").unwrap().permission_module,
            Some("events")
        );
        assert_eq!(
            registry.get("profile_pictures").unwrap().permission_module,
            Some("members")
        );
        assert_eq!(
            registry.get("questionnaire_responses").unwrap().permission_module,
            Some("questionnaires")
        );
        assert_eq!(
            registry.get("audit_log").unwrap().permission_module,
            Some("activity_log")
        );
    }

    #[test]
    fn test_only_registrations_allow_anonymous_create() {
        let registry = ResourceRegistry::standard();
        for name in registry.names() {
            let entry = registry.get(name).unwrap();
            assert_eq!(entry.unsafe_create, name == "registrations", "{}", name);
        }
    }

    #[test]
    fn test_every_crud_module_resource_is_registered() {
        let registry = ResourceRegistry::standard();
        for module in crate::model::CRUD_MODULES {
            let entry = registry.get(module).unwrap();
            assert_eq!(entry.permission_module, Some(*module));
        }
    }
}
