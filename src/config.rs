//! Remote-style configuration with typed defaults
//!
//! Values arrive as strings from whatever the host app fetched. Lookups
//! never fail: a missing or unparsable key yields the caller's default.

use crate::core::{DifficultyProfile, PuzzleType};
use crate::orchestrator::OrchestratorConfig;
use crate::{PuzzleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

pub trait ConfigSource {
    /// Raw string value for `key`, if present
    fn get_raw(&self, key: &str) -> Option<String>;

    fn get_str(&self, key: &str, default: &str) -> String {
        self.get_raw(key).unwrap_or_else(|| default.to_string())
    }

    fn get_u32(&self, key: &str, default: u32) -> u32 {
        parse_raw(self.get_raw(key)).unwrap_or(default)
    }

    fn get_u64(&self, key: &str, default: u64) -> u64 {
        parse_raw(self.get_raw(key)).unwrap_or(default)
    }

    fn get_i32(&self, key: &str, default: i32) -> i32 {
        parse_raw(self.get_raw(key)).unwrap_or(default)
    }

    fn get_f64(&self, key: &str, default: f64) -> f64 {
        parse_raw::<f64>(self.get_raw(key))
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_raw(key).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => true,
            Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => false,
            _ => default,
        }
    }
}

fn parse_raw<T: FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|v| v.trim().parse().ok())
}

/// In-memory configuration, mostly for tests and CLI overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }
}

impl ConfigSource for MapConfig {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// A flat JSON object of key/value pairs
///
/// Non-string scalars are rendered to text so typed lookups can parse them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonConfig {
    values: serde_json::Map<String, serde_json::Value>,
}

impl JsonConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        text.parse()
    }
}

impl FromStr for JsonConfig {
    type Err = PuzzleError;

    fn from_str(json: &str) -> Result<Self> {
        let values = serde_json::from_str(json)?;
        Ok(JsonConfig { values })
    }
}

impl ConfigSource for JsonConfig {
    fn get_raw(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Everything a generation request needs, resolved from a config source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub profile: DifficultyProfile,
    pub orchestrator: OrchestratorConfig,
}

impl GenerationSettings {
    pub fn from_source(source: &impl ConfigSource) -> Self {
        let profile_defaults = DifficultyProfile::default();
        let puzzle_type = source
            .get_raw("generation.puzzle_type")
            .and_then(|v| v.parse::<PuzzleType>().ok())
            .unwrap_or(profile_defaults.puzzle_type);
        let profile = DifficultyProfile {
            grid_width: source.get_i32("generation.grid_width", profile_defaults.grid_width),
            grid_height: source.get_i32("generation.grid_height", profile_defaults.grid_height),
            unique_symbol_count: source.get_i32(
                "generation.unique_symbol_count",
                profile_defaults.unique_symbol_count,
            ),
            puzzle_type,
            minimum_solution_moves: source.get_i32(
                "generation.minimum_solution_moves",
                profile_defaults.minimum_solution_moves,
            ),
        };

        let mut orchestrator = OrchestratorConfig::default();
        orchestrator.max_retry_attempts = source.get_u32(
            "generation.max_retry_attempts",
            orchestrator.max_retry_attempts as u32,
        ) as usize;
        orchestrator.max_generation_time_seconds = source.get_f64(
            "generation.max_generation_time_seconds",
            orchestrator.max_generation_time_seconds,
        );
        orchestrator.absolute_ceiling_seconds = source.get_f64(
            "generation.absolute_ceiling_seconds",
            orchestrator.absolute_ceiling_seconds,
        );
        orchestrator.base_seed = source
            .get_raw("generation.seed")
            .and_then(|v| v.trim().parse().ok());
        orchestrator.parallel_candidates = source.get_u32(
            "generation.parallel_candidates",
            orchestrator.parallel_candidates as u32,
        ) as usize;

        let generator = &mut orchestrator.generator;
        generator.max_candidates =
            source.get_u32("generation.max_candidates", generator.max_candidates as u32) as usize;
        generator.scramble_slack =
            source.get_u32("generation.scramble_slack", generator.scramble_slack as u32) as usize;
        generator.locked_tiles =
            source.get_u32("generation.locked_tiles", generator.locked_tiles as u32) as usize;
        generator.obstacle_tiles =
            source.get_u32("generation.obstacle_tiles", generator.obstacle_tiles as u32) as usize;
        generator.wildcard_tiles =
            source.get_u32("generation.wildcard_tiles", generator.wildcard_tiles as u32) as usize;
        generator.allow_cycles = source.get_bool("generation.allow_cycles", generator.allow_cycles);

        let search = &mut generator.search;
        search.max_depth = source.get_u32("search.max_depth", search.max_depth as u32) as usize;
        search.max_nodes = source.get_u64("search.max_nodes", search.max_nodes as u64) as usize;
        search.time_budget_ms = source
            .get_raw("search.time_budget_ms")
            .and_then(|v| v.trim().parse().ok())
            .or(search.time_budget_ms);

        GenerationSettings {
            profile,
            orchestrator,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_source(&MapConfig::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_defaults() {
        let config = MapConfig::new()
            .with("a", 7)
            .with("flag", "yes")
            .with("junk", "seven");

        assert_eq!(config.get_u32("a", 1), 7);
        assert_eq!(config.get_u32("junk", 1), 1);
        assert_eq!(config.get_u32("missing", 9), 9);
        assert!(config.get_bool("flag", false));
        assert!(config.get_bool("junk", true));
        assert_eq!(config.get_str("missing", "x"), "x");
    }

    #[test]
    fn test_json_config_scalars() {
        let json = r#"{
            "generation.grid_width": 6,
            "generation.allow_cycles": true,
            "search.max_depth": "12"
        }"#;
        let config: JsonConfig = json.parse().unwrap();
        assert_eq!(config.get_i32("generation.grid_width", 4), 6);
        assert!(config.get_bool("generation.allow_cycles", false));
        assert_eq!(config.get_u32("search.max_depth", 0), 12);
    }

    #[test]
    fn test_generation_settings() {
        let config = MapConfig::new()
            .with("generation.grid_width", 5)
            .with("generation.puzzle_type", "rules")
            .with("generation.max_retry_attempts", 6)
            .with("generation.max_generation_time_seconds", 0)
            .with("generation.seed", 1234)
            .with("search.max_depth", 10);
        let settings = GenerationSettings::from_source(&config);

        assert_eq!(settings.profile.grid_width, 5);
        assert_eq!(settings.profile.grid_height, 4);
        assert_eq!(settings.profile.puzzle_type, PuzzleType::RuleBased);
        assert_eq!(settings.orchestrator.max_retry_attempts, 6);
        assert_eq!(settings.orchestrator.max_generation_time_seconds, 0.0);
        assert_eq!(settings.orchestrator.base_seed, Some(1234));
        assert_eq!(settings.orchestrator.generator.search.max_depth, 10);
    }

    #[test]
    fn test_defaults_match_components() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.profile, DifficultyProfile::default());
        assert_eq!(settings.orchestrator, OrchestratorConfig::default());
    }
}
