//! Monte-Carlo Driver
//!
//! Dispatches `num_iterations` independent trials of a shared channel model
//! to at most `num_workers` concurrent blocking workers and averages their BER.
//!
//! Trial `i` always draws from stream `i` of a ChaCha generator seeded with the
//! run seed, and per-trial results are reduced in trial order, so the average
//! depends on `(run_seed, num_iterations)` only and never on the worker count.

use crate::SimulationError;
use channel::{BerResult, ChannelError, ChannelModel};
use common::{mean, wilson_interval};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Default seed of the per-trial generators
pub const DEFAULT_RUN_SEED: u64 = 0;

/// What a failed trial does to the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialFailurePolicy {
    /// Cancel trials that have not started and surface the first failure
    #[default]
    AbortAll,
    /// Log and count the failure, average over the successful trials
    Isolate,
}

/// Driver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    pub run_seed: u64,
    pub failure_policy: TrialFailurePolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            run_seed: DEFAULT_RUN_SEED,
            failure_policy: TrialFailurePolicy::default(),
        }
    }
}

/// Aggregate outcome of one run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    /// Arithmetic mean of the per-trial BER over completed trials
    pub average_ber: f64,
    pub trials_completed: usize,
    pub trials_failed: usize,
    /// Symbol errors summed over completed trials
    pub errors: u64,
    /// Compared positions summed over completed trials
    pub total: u64,
    /// 95% Wilson interval of the pooled error rate
    pub confidence_interval: (f64, f64),
    pub elapsed: Duration,
}

/// Generator of trial `trial` in a run seeded with `run_seed`
pub fn trial_rng(run_seed: u64, trial: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(run_seed);
    rng.set_stream(trial as u64);
    rng
}

/// Run trial `trial` of a run synchronously
pub fn run_single_trial<M: ChannelModel>(model: &M, run_seed: u64, trial: usize) -> Result<BerResult, ChannelError> {
    let mut rng = trial_rng(run_seed, trial);
    Ok(model.run_trial(&mut rng)?.ber)
}

/// Monte-Carlo driver over a shared channel model
pub struct MonteCarloDriver<M> {
    model: Arc<M>,
    config: DriverConfig,
}

impl<M: ChannelModel + 'static> MonteCarloDriver<M> {
    /// Create a driver with the default seed and abort-all policy
    pub fn new(model: M) -> Self {
        Self::from_shared(Arc::new(model))
    }

    pub fn from_shared(model: Arc<M>) -> Self {
        Self {
            model,
            config: DriverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_run_seed(mut self, run_seed: u64) -> Self {
        self.config.run_seed = run_seed;
        self
    }

    pub fn with_failure_policy(mut self, policy: TrialFailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> DriverConfig {
        self.config
    }

    /// Average BER over `num_iterations` trials
    pub async fn run_simulation(&self, num_iterations: usize, num_workers: usize) -> Result<f64, SimulationError> {
        Ok(self.run(num_iterations, num_workers).await?.average_ber)
    }

    /// Run `num_iterations` trials on `num_workers` concurrent workers
    pub async fn run(&self, num_iterations: usize, num_workers: usize) -> Result<SimulationReport, SimulationError> {
        if num_iterations == 0 {
            return Err(SimulationError::InvalidParameter("num_iterations must be positive".to_string()));
        }
        if num_workers == 0 {
            return Err(SimulationError::InvalidParameter("num_workers must be positive".to_string()));
        }

        let start = Instant::now();
        info!(
            "Starting {} simulation: {} trials on {} workers (seed {}, {:?})",
            self.model.topology(),
            num_iterations,
            num_workers,
            self.config.run_seed,
            self.config.failure_policy
        );

        self.warm_up().await?;

        let permits = Arc::new(Semaphore::new(num_workers));
        let mut tasks = JoinSet::new();
        for trial in 0..num_iterations {
            let permits = Arc::clone(&permits);
            let model = Arc::clone(&self.model);
            let run_seed = self.config.run_seed;

            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        tokio::task::spawn_blocking(move || run_single_trial(model.as_ref(), run_seed, trial)).await
                    }
                    Err(e) => {
                        return (trial, Err(SimulationError::WorkerPanicked(format!("trial {}: {}", trial, e))));
                    }
                };

                let result = match outcome {
                    Ok(Ok(ber)) => Ok(ber),
                    Ok(Err(source)) => Err(SimulationError::TrialFailure { trial, source }),
                    Err(e) => Err(SimulationError::WorkerPanicked(format!("trial {}: {}", trial, e))),
                };
                (trial, result)
            });
        }

        let mut results: Vec<Option<BerResult>> = vec![None; num_iterations];
        let mut trials_failed = 0;
        while let Some(joined) = tasks.join_next().await {
            let (trial, result) = match joined {
                Ok(pair) => pair,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => return Err(SimulationError::WorkerPanicked(e.to_string())),
            };

            match result {
                Ok(ber) => results[trial] = Some(ber),
                Err(err) => match self.config.failure_policy {
                    TrialFailurePolicy::AbortAll => {
                        warn!("Aborting simulation: {}", err);
                        tasks.shutdown().await;
                        return Err(err);
                    }
                    TrialFailurePolicy::Isolate => {
                        warn!("Excluding failed trial: {}", err);
                        trials_failed += 1;
                    }
                },
            }
        }

        let completed: Vec<BerResult> = results.into_iter().flatten().collect();
        let bers: Vec<f64> = completed.iter().map(BerResult::ber).collect();
        let average_ber = mean(&bers).ok_or(SimulationError::AllTrialsFailed { failed: trials_failed })?;

        let errors: u64 = completed.iter().map(|r| r.errors as u64).sum();
        let total: u64 = completed.iter().map(|r| r.total as u64).sum();
        let report = SimulationReport {
            average_ber,
            trials_completed: completed.len(),
            trials_failed,
            errors,
            total,
            confidence_interval: wilson_interval(errors, total),
            elapsed: start.elapsed(),
        };

        info!(
            "Simulation finished: average BER {:.6} over {} trials ({} failed) in {:?}",
            report.average_ber, report.trials_completed, report.trials_failed, report.elapsed
        );
        Ok(report)
    }

    /// Materialize the shared channel matrix before any trial runs
    async fn warm_up(&self) -> Result<(), SimulationError> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let matrix = model.generate_channel_matrix();
            debug!("Channel matrix ready: {:?}", matrix.shape());
        })
        .await
        .map_err(|e| SimulationError::WorkerPanicked(format!("channel warm-up: {}", e)))
    }
}
