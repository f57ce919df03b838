pub mod error;
pub mod file_store;
pub mod kv;
pub mod settings;
pub mod sqlite_store;
pub mod task_store;

pub use error::StoreError;
pub use file_store::JsonFileStore;
pub use kv::{InMemoryStore, KeyValueStore};
pub use settings::Settings;
pub use sqlite_store::SqliteStore;
pub use task_store::{TaskStore, TASK_SCHEMA_VERSION};
