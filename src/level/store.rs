//! Persistence adapters for level records
//!
//! Stores move raw JSON values; the repository migrates on the way in and
//! always writes the current schema on the way out.

use crate::level::{LevelRecord, MigrationRegistry};
use crate::logger::GenerationLogger;
use crate::solver::SolvabilityValidator;
use crate::{PuzzleError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Raw record storage keyed by level id
#[allow(async_fn_in_trait)]
pub trait LevelStore {
    async fn read(&self, id: &str) -> Result<Option<Value>>;
    async fn write(&self, id: &str, value: Value) -> Result<()>;
    async fn list(&self) -> Result<Vec<String>>;
}

/// In-memory store; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    levels: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LevelStore for MemoryStore {
    async fn read(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.levels.read().await.get(id).cloned())
    }

    async fn write(&self, id: &str, value: Value) -> Result<()> {
        self.levels.write().await.insert(id.to_string(), value);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.levels.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// One pretty-printed JSON file per level under a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !valid {
            return Err(PuzzleError::ParseError(format!("invalid level id '{}'", id)));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl LevelStore for JsonFileStore {
    async fn read(&self, id: &str) -> Result<Option<Value>> {
        let path = self.path_for(id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, id: &str, value: Value) -> Result<()> {
        let path = self.path_for(id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(&value)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Typed access to a store, migrating old records as they are loaded
pub struct LevelRepository<S> {
    store: S,
    registry: MigrationRegistry,
    logger: Option<Arc<GenerationLogger>>,
    persist_upgrades: bool,
}

impl<S: LevelStore> LevelRepository<S> {
    pub fn new(store: S) -> Self {
        LevelRepository {
            store,
            registry: MigrationRegistry::standard(),
            logger: None,
            persist_upgrades: true,
        }
    }

    pub fn with_logger(mut self, logger: Arc<GenerationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Whether migrated records are written back at the current version (default on)
    pub fn persist_upgrades(mut self, enabled: bool) -> Self {
        self.persist_upgrades = enabled;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn log(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.event("migration", message);
        }
    }

    /// Load a record, migrating it forward if it is behind
    pub async fn load(&self, id: &str) -> Result<Option<LevelRecord>> {
        let Some(value) = self.store.read(id).await? else {
            return Ok(None);
        };
        let (record, steps) = self.registry.upgrade(value)?;
        if steps > 0 {
            self.log(&format!(
                "level '{}' migrated through {} step(s) to v{}",
                id,
                steps,
                self.registry.target()
            ));
            if self.persist_upgrades {
                self.store.write(id, serde_json::to_value(&record)?).await?;
            }
        }
        Ok(Some(record))
    }

    /// Like [`LevelRepository::load`], but an unmigratable record reads as absent
    ///
    /// Storage and I/O failures still propagate.
    pub async fn load_or_recover(&self, id: &str) -> Result<Option<LevelRecord>> {
        match self.load(id).await {
            Err(PuzzleError::Migration(e)) => {
                self.log(&format!("level '{}' could not be migrated: {}", id, e));
                Ok(None)
            }
            other => other,
        }
    }

    /// Load and re-solve, failing with `StateInconsistency` if the par drifted
    pub async fn load_verified(
        &self,
        id: &str,
        validator: &SolvabilityValidator,
    ) -> Result<Option<LevelRecord>> {
        let Some(record) = self.load(id).await? else {
            return Ok(None);
        };
        record.verify_against(validator)?;
        Ok(Some(record))
    }

    /// Save at the current schema version
    pub async fn save(&self, record: &LevelRecord) -> Result<()> {
        record.validate()?;
        self.store
            .write(&record.level_id, serde_json::to_value(record)?)
            .await
    }

    pub async fn ids(&self) -> Result<Vec<String>> {
        self.store.list().await
    }
}
