//! Driving loop: sweeps a kernel to completion and collects its samples.

use crate::kernel::{Kernel, Sampling};
use gridsim_core::{Result, RunId, RunParameters, ScheduleConfig, StatisticsSample};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunStatus {
    /// Ran the configured number of sweeps
    Completed,
    /// Relaxation met its convergence limit
    Converged { iterations: u64 },
    /// Relaxation exhausted its iteration budget
    ConvergenceFailure { iterations: u64, last_delta: f64 },
    /// Stopped between sweeps by a cancellation request
    Cancelled { sweeps: u64 },
}

impl RunStatus {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunStatus::Cancelled { .. })
    }
}

pub struct RunOutcome {
    pub run_id: RunId,
    pub status: RunStatus,
    pub sweeps_completed: u64,
    pub samples: Vec<StatisticsSample>,
    pub kernel: Kernel,
}

impl RunOutcome {
    /// An equilibrated run that finished without a single sample
    pub fn is_degenerate(&self) -> bool {
        self.samples.is_empty()
            && self.kernel.sampling() == Sampling::Equilibrated
            && !self.status.is_cancelled()
    }
}

pub struct Scheduler {
    run_id: RunId,
    kernel: Kernel,
    rng: ChaCha8Rng,
    sweeps: u64,
    schedule: ScheduleConfig,
    sweep_count: u64,
    samples: Vec<StatisticsSample>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Scheduler over an already built kernel; `schedule` must have been validated
    pub(crate) fn new(
        run_id: RunId,
        kernel: Kernel,
        rng: ChaCha8Rng,
        sweeps: u64,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            run_id,
            kernel,
            rng,
            sweeps,
            schedule,
            sweep_count: 0,
            samples: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Scheduler for a single run described by `params`
    pub fn from_params(run_id: RunId, params: &RunParameters) -> Result<Self> {
        params.validate()?;
        let kernel = Kernel::from_config(params)?;
        let rng = ChaCha8Rng::seed_from_u64(params.seed);
        Ok(Self::new(
            run_id,
            kernel,
            rng,
            params.sweeps,
            params.schedule.clone(),
        ))
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn should_sample(&self, sweep: u64) -> bool {
        match self.kernel.sampling() {
            Sampling::EverySweep => true,
            Sampling::Equilibrated => {
                sweep >= self.schedule.equilibration_sweeps
                    && sweep % self.schedule.sample_interval == 0
            }
        }
    }

    /// Initialise the kernel and sweep until it reports completion
    #[instrument(skip(self), fields(run_id = %self.run_id, model = self.kernel.label(), sweeps = self.sweeps))]
    pub fn run(mut self) -> Result<RunOutcome> {
        self.kernel.initialize(&mut self.rng)?;
        debug!(event = "run_initialized", "Kernel initialised");

        let mut cancelled = false;
        while !self.kernel.is_complete(self.sweep_count, self.sweeps) {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            self.kernel.advance_sweep(&mut self.rng);
            let sweep = self.sweep_count;
            self.sweep_count += 1;

            if self.should_sample(sweep) {
                self.samples.push(self.kernel.capture_statistics(sweep));
            }

            let interval = self.schedule.progress_interval;
            if interval > 0 && self.sweep_count % interval == 0 {
                info!(
                    event = "run_progress",
                    sweep = self.sweep_count,
                    samples = self.samples.len(),
                    "Sweep {}/{}",
                    self.sweep_count,
                    self.sweeps
                );
            }
        }

        let status = if cancelled {
            warn!(event = "run_cancelled", sweep = self.sweep_count, "Run cancelled between sweeps");
            RunStatus::Cancelled {
                sweeps: self.sweep_count,
            }
        } else {
            match self.kernel.as_relaxation() {
                Some(relax) if relax.converged() => RunStatus::Converged {
                    iterations: relax.iterations(),
                },
                Some(relax) if relax.iterations() > 0 => {
                    warn!(
                        event = "convergence_failure",
                        iterations = relax.iterations(),
                        last_delta = relax.last_delta(),
                        "Relaxation budget exhausted before convergence"
                    );
                    RunStatus::ConvergenceFailure {
                        iterations: relax.iterations(),
                        last_delta: relax.last_delta(),
                    }
                }
                _ => RunStatus::Completed,
            }
        };

        debug!(
            event = "run_finished",
            sweeps_completed = self.sweep_count,
            samples = self.samples.len(),
            ?status,
            "Run finished"
        );

        Ok(RunOutcome {
            run_id: self.run_id,
            status,
            sweeps_completed: self.sweep_count,
            samples: self.samples,
            kernel: self.kernel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_core::{Error, KawasakiConfig, LifeConfig, ModelConfig, PoissonConfig, SirsConfig};

    fn params(model: ModelConfig, dimension: usize, sweeps: u64) -> RunParameters {
        RunParameters {
            dimension,
            sweeps,
            seed: 42,
            model,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_sweeps_completes_after_initialisation() {
        let p = params(ModelConfig::Life(LifeConfig::default()), 10, 0);
        let outcome = Scheduler::from_params(RunId::new(), &p).unwrap().run().unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.sweeps_completed, 0);
        assert!(outcome.samples.is_empty());
    }

    #[test]
    fn test_every_sweep_sampling() {
        let p = params(ModelConfig::Life(LifeConfig::default()), 10, 5);
        let outcome = Scheduler::from_params(RunId::new(), &p).unwrap().run().unwrap();
        let sweeps: Vec<u64> = outcome.samples.iter().map(|s| s.sweep).collect();
        assert_eq!(sweeps, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_equilibrated_sampling_cadence() {
        let p = params(ModelConfig::Sirs(SirsConfig::default()), 6, 130);
        let outcome = Scheduler::from_params(RunId::new(), &p).unwrap().run().unwrap();
        let sweeps: Vec<u64> = outcome.samples.iter().map(|s| s.sweep).collect();
        assert_eq!(sweeps, vec![100, 110, 120]);
        assert_eq!(outcome.sweeps_completed, 130);
    }

    #[test]
    fn test_short_stochastic_run_has_no_samples() {
        let p = params(ModelConfig::Sirs(SirsConfig::default()), 6, 50);
        let outcome = Scheduler::from_params(RunId::new(), &p).unwrap().run().unwrap();
        assert!(outcome.samples.is_empty());
        assert!(outcome.is_degenerate());

        let life = params(ModelConfig::Life(LifeConfig::default()), 6, 0);
        let outcome = Scheduler::from_params(RunId::new(), &life).unwrap().run().unwrap();
        assert!(outcome.samples.is_empty());
        assert!(!outcome.is_degenerate());
    }

    #[test]
    fn test_cancelled_before_first_sweep() {
        let token = CancellationToken::new();
        token.cancel();
        let p = params(ModelConfig::Life(LifeConfig::default()), 10, 100);
        let outcome = Scheduler::from_params(RunId::new(), &p)
            .unwrap()
            .with_cancellation(token)
            .run()
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Cancelled { sweeps: 0 });
        assert!(outcome.status.is_cancelled());
    }

    #[test]
    fn test_relaxation_statuses() {
        let converging = params(ModelConfig::Poisson(PoissonConfig::default()), 8, 10_000);
        let outcome = Scheduler::from_params(RunId::new(), &converging)
            .unwrap()
            .run()
            .unwrap();
        assert!(matches!(outcome.status, RunStatus::Converged { .. }));
        assert_eq!(outcome.samples.len() as u64, outcome.sweeps_completed);

        let starved = params(ModelConfig::Poisson(PoissonConfig::default()), 8, 4);
        let outcome = Scheduler::from_params(RunId::new(), &starved)
            .unwrap()
            .run()
            .unwrap();
        match outcome.status {
            RunStatus::ConvergenceFailure { iterations, last_delta } => {
                assert_eq!(iterations, 4);
                assert!(last_delta > 1e-4);
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut no_interval = params(ModelConfig::Sirs(SirsConfig::default()), 6, 50);
        no_interval.schedule.sample_interval = 0;
        assert!(matches!(
            Scheduler::from_params(RunId::new(), &no_interval),
            Err(Error::Configuration(_))
        ));

        let empty = params(ModelConfig::Kawasaki(KawasakiConfig::default()), 0, 50);
        assert!(matches!(
            Scheduler::from_params(RunId::new(), &empty),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_same_seed_same_samples() {
        let p = params(ModelConfig::Sirs(SirsConfig::default()), 8, 150);
        let a = Scheduler::from_params(RunId::new(), &p).unwrap().run().unwrap();
        let b = Scheduler::from_params(RunId::new(), &p).unwrap().run().unwrap();
        let values = |o: &RunOutcome| o.samples.iter().map(|s| s.values.clone()).collect::<Vec<_>>();
        assert_eq!(values(&a), values(&b));
    }
}
