//! Users, teams and their persisted analysis state.

mod sqlite_store;
mod store;
mod types;
mod validate;

pub use sqlite_store::SqliteSubjectStore;
pub use store::{StoreError, SubjectStore};
pub use types::*;
pub use validate::*;
