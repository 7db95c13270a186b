//! Retry and timeout control around the generator
//!
//! Each attempt runs one generator call on a blocking worker with its own
//! cooperative deadline. An attempt that outlives its budget, remote check
//! included, fails like any other. Failed attempts are retried with fresh
//! seeds until the retry budget is spent. An absolute ceiling bounds the whole request;
//! crossing it aborts, and the abandoned worker is told to stop.

pub mod remote;

pub use remote::{RemoteError, RemoteValidator};

use crate::core::DifficultyProfile;
use crate::generator::{derive_seed, GenerationResult, GeneratorConfig, PuzzleGenerator};
use crate::logger::GenerationLogger;
use crate::solver::SearchControl;
use crate::{PuzzleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Timeout { elapsed: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Attempting { attempt: usize },
    Succeeded { attempts: usize },
    ExhaustedRetries { attempts: usize },
    Aborted(AbortReason),
}

impl OrchestratorState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestratorState::Succeeded { .. }
                | OrchestratorState::ExhaustedRetries { .. }
                | OrchestratorState::Aborted(_)
        )
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorState::Idle => write!(f, "Idle"),
            OrchestratorState::Attempting { attempt } => write!(f, "Attempting({})", attempt),
            OrchestratorState::Succeeded { attempts } => write!(f, "Succeeded({})", attempts),
            OrchestratorState::ExhaustedRetries { attempts } => {
                write!(f, "ExhaustedRetries({})", attempts)
            }
            OrchestratorState::Aborted(AbortReason::Timeout { elapsed }) => {
                write!(f, "Aborted(Timeout after {:?})", elapsed)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Total generator calls allowed per request
    pub max_retry_attempts: usize,
    /// Cooperative budget for one attempt; 0 expires immediately
    pub max_generation_time_seconds: f64,
    /// Hard bound on the whole request
    pub absolute_ceiling_seconds: f64,
    /// Fixed seed for reproducible runs; random when absent
    pub base_seed: Option<u64>,
    /// Candidates evaluated in parallel per attempt (1 = sequential)
    pub parallel_candidates: usize,
    pub generator: GeneratorConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            max_retry_attempts: 3,
            max_generation_time_seconds: 5.0,
            absolute_ceiling_seconds: 30.0,
            base_seed: None,
            parallel_candidates: 1,
            generator: GeneratorConfig::default(),
        }
    }
}

/// Seconds from configuration as a duration; negative or NaN is zero
fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    }
}

pub struct GenerationOrchestrator {
    config: OrchestratorConfig,
    logger: Arc<GenerationLogger>,
    remote: Option<Arc<dyn RemoteValidator>>,
    state: OrchestratorState,
    transitions: Vec<OrchestratorState>,
}

impl GenerationOrchestrator {
    pub fn new(config: OrchestratorConfig, logger: Arc<GenerationLogger>) -> Self {
        GenerationOrchestrator {
            config,
            logger,
            remote: None,
            state: OrchestratorState::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn with_remote_validator(mut self, remote: Arc<dyn RemoteValidator>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Every state entered during the last request, in order
    pub fn transitions(&self) -> &[OrchestratorState] {
        &self.transitions
    }

    fn transition(&mut self, next: OrchestratorState) {
        self.logger
            .event("orchestrator", &format!("{} -> {}", self.state, next));
        self.state = next;
        self.transitions.push(next);
    }

    fn abort(&mut self, elapsed: Duration) -> PuzzleError {
        self.transition(OrchestratorState::Aborted(AbortReason::Timeout { elapsed }));
        PuzzleError::GenerationTimeout { elapsed }
    }

    /// Generate a puzzle for `profile` within the retry and time budgets
    ///
    /// Returns `GenerationExhausted` when every attempt failed (the caller
    /// may broaden the profile) and `GenerationTimeout` when the absolute
    /// ceiling was crossed. An invalid profile fails before any attempt.
    pub async fn generate(&mut self, profile: &DifficultyProfile) -> Result<GenerationResult> {
        profile.validate()?;

        self.state = OrchestratorState::Idle;
        self.transitions.clear();

        let started = Instant::now();
        let ceiling = seconds(self.config.absolute_ceiling_seconds);
        let budget = seconds(self.config.max_generation_time_seconds);
        let max_attempts = self.config.max_retry_attempts.max(1);
        let base_seed = self.config.base_seed.unwrap_or_else(rand::random);

        for attempt in 1..=max_attempts {
            self.transition(OrchestratorState::Attempting { attempt });

            let remaining = ceiling.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(self.abort(started.elapsed()));
            }

            let attempt_started = Instant::now();
            let cancel = Arc::new(AtomicBool::new(false));
            let control = SearchControl {
                deadline: Instant::now().checked_add(budget),
                cancel: vec![Arc::clone(&cancel)],
            };
            let seed = derive_seed(base_seed, attempt as u64);
            let mut generator = PuzzleGenerator::new(self.config.generator.clone(), seed)
                .with_control(control)
                .with_logger(Arc::clone(&self.logger));
            let parallel = self.config.parallel_candidates;
            let request = profile.clone();
            let remote = self.remote.clone();

            let worker = tokio::task::spawn_blocking(move || {
                let result = if parallel > 1 {
                    generator.generate_parallel(&request, parallel)
                } else {
                    generator.generate(&request)
                }?;
                // Unavailable remotes degrade to the local verdict
                let confirmed = match &remote {
                    Some(remote) => remote.confirm(result.puzzle(), result.par()),
                    None => Ok(true),
                };
                Ok::<_, PuzzleError>((result, confirmed))
            });

            // The remote check runs inside the worker, so the attempt budget bounds it too
            let window = remaining.min(budget);
            let outcome = match tokio::time::timeout(window, worker).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_error)) => {
                    cancel.store(true, Ordering::Relaxed);
                    self.transition(OrchestratorState::Idle);
                    return Err(join_error.into());
                }
                Err(_) => {
                    cancel.store(true, Ordering::Relaxed);
                    if started.elapsed() >= ceiling {
                        return Err(self.abort(started.elapsed()));
                    }
                    self.logger.event(
                        "orchestrator",
                        &format!("attempt {} exceeded its {:?} budget", attempt, budget),
                    );
                    continue;
                }
            };
            if started.elapsed() >= ceiling {
                cancel.store(true, Ordering::Relaxed);
                return Err(self.abort(started.elapsed()));
            }
            if attempt_started.elapsed() > budget {
                self.logger.event(
                    "orchestrator",
                    &format!("attempt {} exceeded its {:?} budget", attempt, budget),
                );
                continue;
            }

            match outcome {
                Ok((result, Ok(true))) => {
                    self.logger.event(
                        "orchestrator",
                        &format!(
                            "attempt {} produced par {} (seed {})",
                            attempt,
                            result.par(),
                            seed
                        ),
                    );
                    self.transition(OrchestratorState::Succeeded { attempts: attempt });
                    return Ok(result);
                }
                Ok((result, Ok(false))) => {
                    self.logger.event(
                        "orchestrator",
                        &format!(
                            "attempt {} rejected by remote validator (par {})",
                            attempt,
                            result.par()
                        ),
                    );
                }
                Ok((result, Err(e))) => {
                    self.logger.event(
                        "orchestrator",
                        &format!("remote check skipped: {}; trusting local result", e),
                    );
                    self.transition(OrchestratorState::Succeeded { attempts: attempt });
                    return Ok(result);
                }
                Err(e) if e.is_retriable() => {
                    self.logger
                        .event("orchestrator", &format!("attempt {} failed: {}", attempt, e));
                }
                Err(e) => {
                    self.transition(OrchestratorState::Idle);
                    return Err(e);
                }
            }
        }

        self.transition(OrchestratorState::ExhaustedRetries {
            attempts: max_attempts,
        });
        Err(PuzzleError::GenerationExhausted {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Puzzle, PuzzleType};
    use crate::logger::VerbosityLevel;

    fn logger() -> Arc<GenerationLogger> {
        Arc::new(GenerationLogger::capturing(VerbosityLevel::Verbose))
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            base_seed: Some(2024),
            ..OrchestratorConfig::default()
        }
    }

    #[test]
    fn test_seconds() {
        assert_eq!(seconds(0.0), Duration::ZERO);
        assert_eq!(seconds(-3.0), Duration::ZERO);
        assert_eq!(seconds(f64::NAN), Duration::ZERO);
        assert_eq!(seconds(1.5), Duration::from_millis(1500));
        assert_eq!(seconds(f64::INFINITY), Duration::MAX);
    }

    #[tokio::test]
    async fn test_success_transitions() {
        let mut orchestrator = GenerationOrchestrator::new(config(), logger());
        let profile = DifficultyProfile::new(3, 3, 3, PuzzleType::DirectMatch, 2);
        let result = orchestrator.generate(&profile).await.unwrap();

        assert!(result.par() >= 2);
        assert_eq!(
            orchestrator.transitions(),
            &[
                OrchestratorState::Attempting { attempt: 1 },
                OrchestratorState::Succeeded { attempts: 1 }
            ]
        );
        assert!(orchestrator.state().is_terminal());
    }

    #[tokio::test]
    async fn test_zero_budget_exhausts_retries() {
        let config = OrchestratorConfig {
            max_generation_time_seconds: 0.0,
            ..config()
        };
        let mut orchestrator = GenerationOrchestrator::new(config, logger());
        let err = orchestrator
            .generate(&DifficultyProfile::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PuzzleError::GenerationExhausted { attempts: 3 }));
        assert_eq!(
            orchestrator.state(),
            OrchestratorState::ExhaustedRetries { attempts: 3 }
        );
    }

    #[tokio::test]
    async fn test_invalid_profile_makes_no_attempt() {
        let mut orchestrator = GenerationOrchestrator::new(config(), logger());
        let profile = DifficultyProfile::new(4, 4, 0, PuzzleType::DirectMatch, 1);
        let err = orchestrator.generate(&profile).await.unwrap_err();

        assert!(matches!(err, PuzzleError::InvalidProfile(_)));
        assert!(orchestrator.transitions().is_empty());
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn test_zero_ceiling_aborts() {
        let config = OrchestratorConfig {
            absolute_ceiling_seconds: 0.0,
            ..config()
        };
        let mut orchestrator = GenerationOrchestrator::new(config, logger());
        let err = orchestrator
            .generate(&DifficultyProfile::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PuzzleError::GenerationTimeout { .. }));
        assert!(matches!(orchestrator.state(), OrchestratorState::Aborted(_)));
    }

    #[tokio::test]
    async fn test_remote_rejection_counts_as_failure() {
        let remote: Arc<dyn RemoteValidator> =
            Arc::new(|_: &Puzzle, _: u32| -> std::result::Result<bool, RemoteError> { Ok(false) });
        let log = logger();
        let mut orchestrator =
            GenerationOrchestrator::new(config(), Arc::clone(&log)).with_remote_validator(remote);
        let profile = DifficultyProfile::new(3, 3, 3, PuzzleType::DirectMatch, 2);
        let err = orchestrator.generate(&profile).await.unwrap_err();

        assert!(matches!(err, PuzzleError::GenerationExhausted { attempts: 3 }));
        let rejections = log
            .logs_in("orchestrator")
            .iter()
            .filter(|e| e.message.contains("rejected by remote"))
            .count();
        assert_eq!(rejections, 3);
    }

    #[tokio::test]
    async fn test_unavailable_remote_trusts_local() {
        let remote: Arc<dyn RemoteValidator> =
            Arc::new(|_: &Puzzle, _: u32| -> std::result::Result<bool, RemoteError> {
                Err(RemoteError::Unavailable("offline".to_string()))
            });
        let mut orchestrator =
            GenerationOrchestrator::new(config(), logger()).with_remote_validator(remote);
        let profile = DifficultyProfile::new(3, 3, 3, PuzzleType::DirectMatch, 2);
        assert!(orchestrator.generate(&profile).await.is_ok());
        assert_eq!(
            orchestrator.state(),
            OrchestratorState::Succeeded { attempts: 1 }
        );
    }

    #[tokio::test]
    async fn test_slow_remote_fails_the_attempt() {
        let remote: Arc<dyn RemoteValidator> =
            Arc::new(|_: &Puzzle, _: u32| -> std::result::Result<bool, RemoteError> {
                std::thread::sleep(Duration::from_millis(300));
                Ok(true)
            });
        let config = OrchestratorConfig {
            max_generation_time_seconds: 0.05,
            ..config()
        };
        let log = logger();
        let mut orchestrator =
            GenerationOrchestrator::new(config, Arc::clone(&log)).with_remote_validator(remote);
        let profile = DifficultyProfile::new(3, 3, 3, PuzzleType::DirectMatch, 2);
        let err = orchestrator.generate(&profile).await.unwrap_err();

        assert!(matches!(err, PuzzleError::GenerationExhausted { attempts: 3 }));
        assert_eq!(
            orchestrator.state(),
            OrchestratorState::ExhaustedRetries { attempts: 3 }
        );
        assert!(!orchestrator
            .transitions()
            .iter()
            .any(|s| matches!(s, OrchestratorState::Succeeded { .. })));
    }

    #[tokio::test]
    async fn test_worker_panic_returns_to_idle() {
        let remote: Arc<dyn RemoteValidator> =
            Arc::new(|_: &Puzzle, _: u32| -> std::result::Result<bool, RemoteError> {
                panic!("remote validator crashed")
            });
        let mut orchestrator =
            GenerationOrchestrator::new(config(), logger()).with_remote_validator(remote);
        let profile = DifficultyProfile::new(3, 3, 3, PuzzleType::DirectMatch, 2);
        let err = orchestrator.generate(&profile).await.unwrap_err();

        assert!(matches!(err, PuzzleError::JoinError(_)));
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
        assert_eq!(
            orchestrator.transitions().last(),
            Some(&OrchestratorState::Idle)
        );
    }
}
