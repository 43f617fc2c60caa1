pub mod audit;
pub mod role;
pub mod snapshot;

pub use audit::AuditEntry;
pub use role::{Action, CrudPermissions, BOOL_MODULES, CRUD_MODULES};
pub use snapshot::{ResourceError, RestoreReport, Snapshot, SnapshotCheck, SnapshotMeta};
