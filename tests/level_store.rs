//! File-backed level repository tests

use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tile_forge_rs::{
    level::{JsonFileStore, LevelRepository, LevelStore, CURRENT_SCHEMA_VERSION},
    logger::{GenerationLogger, VerbosityLevel},
    solver::SolvabilityValidator,
    PuzzleError, Result,
};

/// Fresh scratch directory per test
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tileforge-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[tokio::test]
async fn test_legacy_file_is_upgraded_on_disk() -> Result<()> {
    let dir = scratch_dir("upgrade");
    std::fs::create_dir_all(&dir)?;
    std::fs::copy("test_levels/v1_swap_pair.json", dir.join("swap-pair.json"))?;

    let logger = Arc::new(GenerationLogger::capturing(VerbosityLevel::Normal));
    let repo = LevelRepository::new(JsonFileStore::new(&dir)).with_logger(Arc::clone(&logger));

    let record = repo.load("swap-pair").await?.expect("fixture was copied");
    assert_eq!(record.par, 1);
    assert_eq!(logger.logs_in("migration").len(), 1);

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("swap-pair.json"))?)?;
    assert_eq!(on_disk["schemaVersion"], CURRENT_SCHEMA_VERSION);

    // Second load finds nothing left to migrate
    repo.load("swap-pair").await?;
    assert_eq!(logger.logs_in("migration").len(), 1);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[tokio::test]
async fn test_read_only_repository_leaves_file_alone() -> Result<()> {
    let dir = scratch_dir("readonly");
    let store = JsonFileStore::new(&dir);
    store
        .write(
            "legacy",
            json!({ "name": "legacy", "rows": ["BA"], "moves": "S 0,0 0,1" }),
        )
        .await?;

    let repo = LevelRepository::new(store.clone()).persist_upgrades(false);
    let record = repo.load("legacy").await?.expect("written above");
    assert_eq!(record.schema_version, CURRENT_SCHEMA_VERSION);

    let raw = store.read("legacy").await?.expect("written above");
    assert!(raw.get("schemaVersion").is_none());

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[tokio::test]
async fn test_corrupt_level_recovers_as_absent() -> Result<()> {
    let dir = scratch_dir("corrupt");
    let store = JsonFileStore::new(&dir);
    store
        .write("broken", json!({ "schemaVersion": 2, "levelId": "broken" }))
        .await?;
    let repo = LevelRepository::new(store);

    assert!(matches!(
        repo.load("broken").await,
        Err(PuzzleError::Migration(_))
    ));
    assert!(repo.load_or_recover("broken").await?.is_none());

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[tokio::test]
async fn test_listing_and_verified_load() -> Result<()> {
    let dir = scratch_dir("listing");
    let repo = LevelRepository::new(JsonFileStore::new(&dir));
    assert!(repo.ids().await?.is_empty());

    for name in ["v3_direct_match", "v2_obstacle"] {
        let text = std::fs::read_to_string(format!("test_levels/{}.json", name))?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        let id = value["levelId"].as_str().unwrap_or(name).to_string();
        repo.store().write(&id, value).await?;
    }
    assert_eq!(repo.ids().await?, vec!["direct-match", "obstacle"]);

    let validator = SolvabilityValidator::default();
    let level = repo.load_verified("obstacle", &validator).await?;
    assert_eq!(level.map(|l| l.par), Some(1));
    assert!(repo.load_verified("missing", &validator).await?.is_none());

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
