//! Tile Forge - Main Binary
//!
//! Generate, solve and migrate tile-puzzle levels from the command line

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tile_forge_rs::{
    config::{GenerationSettings, JsonConfig},
    core::PuzzleType,
    level::{apply_migration, JsonFileStore, LevelRecord, LevelRepository},
    logger::{GenerationLogger, OutputFormat, VerbosityLevel},
    orchestrator::GenerationOrchestrator,
    solver::{calculate_par, SearchLimits, SolvabilityValidator},
};

#[derive(Parser)]
#[command(name = "tileforge")]
#[command(about = "Tile Forge - solvable tile-puzzle generator", long_about = None)]
struct Cli {
    /// Verbosity level (0=silent, 1=minimal, 2=normal, 3=verbose)
    #[arg(long, short = 'v', global = true, default_value = "normal")]
    verbosity: VerbosityLevel,

    /// Emit log lines as JSON objects
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a validated puzzle
    Generate {
        /// Flat JSON file of `generation.*` / `search.*` keys
        #[arg(long, value_name = "CONFIG_FILE")]
        config: Option<PathBuf>,

        #[arg(long)]
        width: Option<i32>,

        #[arg(long)]
        height: Option<i32>,

        /// Number of distinct symbols
        #[arg(long)]
        symbols: Option<i32>,

        /// Minimum optimal solution length
        #[arg(long)]
        min_moves: Option<i32>,

        /// direct-match or rule-based
        #[arg(long)]
        puzzle_type: Option<PuzzleType>,

        /// Set random seed for deterministic generation
        #[arg(long)]
        seed: Option<u64>,

        /// Total generation attempts
        #[arg(long)]
        retries: Option<usize>,

        /// Per-attempt time budget in seconds
        #[arg(long)]
        time_budget: Option<f64>,

        /// Candidates evaluated in parallel per attempt
        #[arg(long)]
        parallel: Option<usize>,

        /// Allow symbol cycling moves
        #[arg(long)]
        cycles: bool,

        /// Save the level into this directory
        #[arg(long, value_name = "LEVELS_DIR")]
        out: Option<PathBuf>,

        /// Level id used when saving
        #[arg(long, default_value = "generated")]
        id: String,
    },

    /// Solve a level file (any schema version) and check its par
    Solve {
        #[arg(value_name = "LEVEL_FILE")]
        level: PathBuf,

        /// Maximum search depth
        #[arg(long, default_value_t = SearchLimits::default().max_depth)]
        max_depth: usize,
    },

    /// Migrate a level file to the current schema
    Migrate {
        #[arg(value_name = "LEVEL_FILE")]
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = GenerationLogger::with_verbosity(cli.verbosity);
    if cli.json_logs {
        logger.set_output_format(OutputFormat::Json);
    }
    let logger = Arc::new(logger);

    match cli.command {
        Commands::Generate {
            config,
            width,
            height,
            symbols,
            min_moves,
            puzzle_type,
            seed,
            retries,
            time_budget,
            parallel,
            cycles,
            out,
            id,
        } => {
            let mut settings = match config {
                Some(path) => {
                    let source = JsonConfig::load(&path)
                        .await
                        .with_context(|| format!("reading config {}", path.display()))?;
                    GenerationSettings::from_source(&source)
                }
                None => GenerationSettings::default(),
            };
            let profile = &mut settings.profile;
            profile.grid_width = width.unwrap_or(profile.grid_width);
            profile.grid_height = height.unwrap_or(profile.grid_height);
            profile.unique_symbol_count = symbols.unwrap_or(profile.unique_symbol_count);
            profile.minimum_solution_moves = min_moves.unwrap_or(profile.minimum_solution_moves);
            profile.puzzle_type = puzzle_type.unwrap_or(profile.puzzle_type);

            let orchestration = &mut settings.orchestrator;
            orchestration.base_seed = seed.or(orchestration.base_seed);
            orchestration.max_retry_attempts = retries.unwrap_or(orchestration.max_retry_attempts);
            orchestration.max_generation_time_seconds =
                time_budget.unwrap_or(orchestration.max_generation_time_seconds);
            orchestration.parallel_candidates =
                parallel.unwrap_or(orchestration.parallel_candidates);
            orchestration.generator.allow_cycles |= cycles;

            run_generate(settings, out, id, logger).await?
        }
        Commands::Solve { level, max_depth } => run_solve(level, max_depth, &logger).await?,
        Commands::Migrate { input, output } => run_migrate(input, output).await?,
    }

    Ok(())
}

async fn run_generate(
    settings: GenerationSettings,
    out: Option<PathBuf>,
    id: String,
    logger: Arc<GenerationLogger>,
) -> Result<()> {
    logger.minimal(&format!("Generating {}", settings.profile));

    let mut orchestrator = GenerationOrchestrator::new(settings.orchestrator, Arc::clone(&logger));
    let result = match orchestrator.generate(&settings.profile).await {
        Ok(result) => result,
        Err(e) => {
            logger.minimal(e.user_message());
            return Err(e.into());
        }
    };

    println!("{}", result.puzzle().grid());
    println!();
    if let Some(path) = result.solvability().solution_path() {
        println!("Solution: {}", path);
    }
    println!("Par: {}", result.par());

    if let Some(dir) = out {
        let record = LevelRecord::from_generation(id, &result);
        let repo = LevelRepository::new(JsonFileStore::new(&dir)).with_logger(logger);
        repo.save(&record).await?;
        println!("Saved {} to {}", record.level_id, dir.display());
    }
    Ok(())
}

async fn run_solve(level: PathBuf, max_depth: usize, logger: &GenerationLogger) -> Result<()> {
    let text = tokio::fs::read_to_string(&level)
        .await
        .with_context(|| format!("reading {}", level.display()))?;
    let value = serde_json::from_str(&text)?;
    let record = apply_migration(value).context("migrating level")?;
    let puzzle = record.to_puzzle()?;

    println!("{}", puzzle.grid());
    println!();

    let validator = SolvabilityValidator::default().with_max_depth(max_depth);
    let result = validator.try_find_solution(&puzzle)?;
    logger.verbose(&format!(
        "search expanded {} nodes ({:?})",
        result.nodes_expanded(),
        result.termination()
    ));

    let Some(path) = result.solution_path() else {
        bail!("no solution within {} moves ({:?})", max_depth, result.termination());
    };
    println!("Solution: {}", path);
    println!("Par: {} (stored {})", calculate_par(&result), record.par);
    if calculate_par(&result) != record.par {
        logger.minimal("Stored par is out of date");
    }
    Ok(())
}

async fn run_migrate(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let text = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let record = apply_migration(serde_json::from_str(&text)?)
        .with_context(|| format!("migrating {}", input.display()))?;
    let json = serde_json::to_string_pretty(&record)?;

    match output {
        Some(path) => tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
