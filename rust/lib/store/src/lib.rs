pub mod error;
pub mod query;
pub mod sqlite;

pub use error::StoreError;
pub use sqlite::{Collection, DocStore};
