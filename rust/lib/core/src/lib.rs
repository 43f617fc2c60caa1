pub mod config;
pub mod context;
pub mod error;
pub mod module;
pub mod types;

pub use config::ServiceConfig;
pub use context::RequestContext;
pub use error::ServiceError;
pub use module::Module;
pub use types::{ListResult, QueryOptions, SortOrder, merge_patch, new_id, now_rfc3339};
