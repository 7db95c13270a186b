//! Persisted level data: the canonical record, its migrations and stores

pub mod migration;
pub mod record;
pub mod store;

pub use migration::{apply_migration, read_version, MigrationError, MigrationRegistry};
pub use record::{difficulty_rating, LevelRecord, LevelSettings, CURRENT_SCHEMA_VERSION};
pub use store::{JsonFileStore, LevelRepository, LevelStore, MemoryStore};
