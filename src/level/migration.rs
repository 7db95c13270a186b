//! Forward migration of persisted level records
//!
//! Scripts are registered explicitly by source version and run in
//! ascending order, each one editing the JSON object in place and stamping
//! the next version. A record already at the current version passes through
//! untouched.

use crate::core::{Grid, Move, Symbol, TileState, MAX_SYMBOLS};
use crate::level::record::{difficulty_rating, LevelRecord, CURRENT_SCHEMA_VERSION};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("Schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Version {version} record is missing required field '{field}'")]
    MissingField { version: u32, field: String },

    #[error("Version {version} record has invalid field '{field}': {reason}")]
    InvalidField {
        version: u32,
        field: String,
        reason: String,
    },

    #[error("No migration registered from version {0}")]
    MissingScript(u32),

    #[error("Migrated record is invalid: {0}")]
    InvalidRecord(String),
}

type Object = Map<String, Value>;

/// One step `v -> v + 1`
pub type MigrationScript = fn(&mut Object) -> Result<(), MigrationError>;

fn missing(version: u32, field: &str) -> MigrationError {
    MigrationError::MissingField {
        version,
        field: field.to_string(),
    }
}

fn invalid(version: u32, field: &str, reason: impl Into<String>) -> MigrationError {
    MigrationError::InvalidField {
        version,
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Embedded schema version: `schemaVersion`, else legacy `version`, else 1
pub fn read_version(value: &Value) -> Result<u32, MigrationError> {
    let (field, raw) = match (value.get("schemaVersion"), value.get("version")) {
        (Some(v), _) => ("schemaVersion", v),
        (None, Some(v)) => ("version", v),
        (None, None) => return Ok(1),
    };
    raw.as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v >= 1)
        .ok_or_else(|| invalid(0, field, format!("expected a positive integer, got {}", raw)))
}

pub struct MigrationRegistry {
    scripts: BTreeMap<u32, MigrationScript>,
    target: u32,
}

impl MigrationRegistry {
    pub fn new(target: u32) -> Self {
        MigrationRegistry {
            scripts: BTreeMap::new(),
            target,
        }
    }

    /// The scripts that bring any known record to the current version
    pub fn standard() -> Self {
        let mut registry = Self::new(CURRENT_SCHEMA_VERSION);
        registry.register(1, v1_to_v2);
        registry.register(2, v2_to_v3);
        registry
    }

    pub fn register(&mut self, source_version: u32, script: MigrationScript) {
        self.scripts.insert(source_version, script);
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// Migrate `value` in place; returns how many scripts ran
    ///
    /// On error `value` is left exactly as it was passed in.
    pub fn migrate_value(&self, value: &mut Value) -> Result<usize, MigrationError> {
        let mut version = read_version(value)?;
        if version > self.target {
            return Err(MigrationError::UnsupportedVersion {
                found: version,
                supported: self.target,
            });
        }
        let mut working = value.clone();
        let object = working.as_object_mut().ok_or_else(|| {
            MigrationError::InvalidRecord("record is not a JSON object".to_string())
        })?;

        let mut steps = 0;
        while version < self.target {
            let script = self
                .scripts
                .get(&version)
                .ok_or(MigrationError::MissingScript(version))?;
            script(object)?;

            let stamped = object
                .get("schemaVersion")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            if stamped != u64::from(version) + 1 {
                return Err(MigrationError::InvalidRecord(format!(
                    "script from version {} stamped {}",
                    version, stamped
                )));
            }
            version += 1;
            steps += 1;
        }
        *value = working;
        Ok(steps)
    }

    /// Migrate, deserialize and validate
    pub fn apply(&self, value: Value) -> Result<LevelRecord, MigrationError> {
        self.upgrade(value).map(|(record, _)| record)
    }

    /// Like [`MigrationRegistry::apply`], also reporting how many scripts ran
    pub fn upgrade(&self, mut value: Value) -> Result<(LevelRecord, usize), MigrationError> {
        let steps = self.migrate_value(&mut value)?;
        let record: LevelRecord = serde_json::from_value(value)
            .map_err(|e| MigrationError::InvalidRecord(e.to_string()))?;
        record.validate()?;
        Ok((record, steps))
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Bring any supported record to the current schema
pub fn apply_migration(value: Value) -> Result<LevelRecord, MigrationError> {
    MigrationRegistry::standard().apply(value)
}

fn take_string(object: &mut Object, version: u32, field: &str) -> Result<String, MigrationError> {
    match object.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(invalid(version, field, format!("expected a string, got {}", other))),
        None => Err(missing(version, field)),
    }
}

fn read_u32(object: &Object, version: u32, field: &str) -> Result<Option<u32>, MigrationError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                invalid(version, field, format!("expected an unsigned integer, got {}", v))
            }),
    }
}

/// Fill in missing settings; legacy `sound`/`haptics` keys carry over
fn migrate_settings(object: &mut Object, version: u32) -> Result<(), MigrationError> {
    let mut settings = match object.remove("settings") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(invalid(
                version,
                "settings",
                format!("expected an object, got {}", other),
            ))
        }
    };
    for (legacy, current) in [("sound", "soundEnabled"), ("haptics", "hapticsEnabled")] {
        if let Some(value) = settings.remove(legacy) {
            settings.entry(current).or_insert(value);
        }
        let entry = settings.entry(current).or_insert(Value::Bool(true));
        if !entry.is_boolean() {
            return Err(invalid(
                version,
                &format!("settings.{}", current),
                "expected a boolean",
            ));
        }
    }
    object.insert("settings".to_string(), Value::Object(settings));
    Ok(())
}

/// v1 (free-form text rows) to v2 (layout bytes, move list)
fn v1_to_v2(object: &mut Object) -> Result<(), MigrationError> {
    const V: u32 = 1;

    let name = take_string(object, V, "name")?;
    let rows = match object.remove("rows") {
        Some(Value::Array(rows)) => rows
            .into_iter()
            .map(|r| match r {
                Value::String(s) => Ok(s),
                other => Err(invalid(V, "rows", format!("expected strings, got {}", other))),
            })
            .collect::<Result<Vec<String>, _>>()?,
        Some(other) => return Err(invalid(V, "rows", format!("expected an array, got {}", other))),
        None => return Err(missing(V, "rows")),
    };
    let grid = Grid::from_rows(&rows).map_err(|e| invalid(V, "rows", e.to_string()))?;

    // v2 layouts carry no alphabet byte
    let mut layout = vec![grid.width(), grid.height()];
    for tile in grid.tiles() {
        layout.push(tile.symbol.index());
        layout.push(tile.state.as_byte());
    }

    let moves = take_string(object, V, "moves")?;
    let moves: Vec<Value> = moves
        .split(';')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| {
            Move::parse(m)
                .map(|mv| Value::String(mv.encode()))
                .map_err(|e| invalid(V, "moves", e.to_string()))
        })
        .collect::<Result<_, _>>()?;

    let par = match read_u32(object, V, "par")? {
        Some(par) => par,
        None => moves.len() as u32,
    };

    migrate_settings(object, V)?;
    object.remove("version");
    object.insert("levelId".to_string(), Value::String(name));
    object.insert("layout".to_string(), json!(layout));
    object.insert("solution".to_string(), Value::Array(moves));
    object.insert("par".to_string(), json!(par));
    object.insert("schemaVersion".to_string(), json!(2));
    Ok(())
}

/// v2 (move list) to v3 (canonical solution string, rating, type, move set)
fn v2_to_v3(object: &mut Object) -> Result<(), MigrationError> {
    const V: u32 = 2;

    if !matches!(object.get("levelId"), Some(Value::String(_))) {
        return Err(missing(V, "levelId"));
    }

    let layout: Vec<u8> = match object.get("layout") {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| invalid(V, "layout", e.to_string()))?,
        None => return Err(missing(V, "layout")),
    };
    let (dims, cells) = match layout.as_slice() {
        [w, h, rest @ ..] => ([*w, *h], rest),
        _ => return Err(invalid(V, "layout", "shorter than its header")),
    };
    if cells.len() % 2 != 0 {
        return Err(invalid(V, "layout", "odd number of tile bytes"));
    }
    let highest = cells
        .chunks_exact(2)
        .filter(|pair| TileState::from_byte(pair[1]).is_some_and(|s| s != TileState::Obstacle))
        .map(|pair| pair[0])
        .max()
        .unwrap_or(0);
    let alphabet = match read_u32(object, V, "symbolCount")? {
        Some(n) => u8::try_from(n).unwrap_or(u8::MAX),
        None => highest.saturating_add(1),
    };
    if alphabet == 0 || alphabet > MAX_SYMBOLS || highest >= alphabet {
        return Err(invalid(
            V,
            "layout",
            format!("alphabet of {} cannot hold symbol {}", alphabet, Symbol::new(highest)),
        ));
    }
    let mut canonical = Vec::with_capacity(layout.len() + 1);
    canonical.extend(dims);
    canonical.push(alphabet);
    canonical.extend_from_slice(cells);

    let moves = match object.remove("solution") {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => {
                    Move::parse(&s).map_err(|e| invalid(V, "solution", e.to_string()))
                }
                other => Err(invalid(V, "solution", format!("expected strings, got {}", other))),
            })
            .collect::<Result<Vec<Move>, _>>()?,
        Some(other) => {
            return Err(invalid(V, "solution", format!("expected an array, got {}", other)))
        }
        None => return Err(missing(V, "solution")),
    };

    let par = read_u32(object, V, "par")?.ok_or_else(|| missing(V, "par"))?;
    if read_u32(object, V, "difficultyRating")?.is_none() {
        object.insert("difficultyRating".to_string(), json!(difficulty_rating(par)));
    }
    if !object.contains_key("puzzleType") {
        object.insert("puzzleType".to_string(), json!("DirectMatch"));
    }
    if !object.contains_key("moveSet") {
        let cycles = moves.iter().any(|mv| matches!(mv, Move::Cycle { .. }));
        object.insert("moveSet".to_string(), json!({ "swaps": true, "cycles": cycles }));
    }
    migrate_settings(object, V)?;

    let solution = moves.iter().map(Move::encode).collect::<Vec<_>>().join(";");
    object.remove("symbolCount");
    object.insert("layout".to_string(), json!(canonical));
    object.insert("solution".to_string(), Value::String(solution));
    object.insert("schemaVersion".to_string(), json!(3));
    Ok(())
}
