//! Outer parameter sweeps fanned out across a rayon pool.
//!
//! Every parameter point owns a private kernel, grid and random stream, so the
//! points can run in any order. Rows are keyed by point index and emitted in
//! parameter order once every point has finished.

use crate::kawasaki::KawasakiKernel;
use crate::kernel::Kernel;
use crate::scheduler::Scheduler;
use crate::sirs::SirsKernel;
use gridsim_core::{
    KawasakiConfig, KawasakiMode, ModelConfig, ParameterRange, Result, RunId, RunParameters,
    SirsMode, StatisticsAggregator,
};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const IMMUNITY_PROBABILITIES: [f64; 3] = [0.5, 0.5, 0.5];

/// Which outer parameter is swept and how each point is summarised
#[derive(Debug, Clone)]
pub enum BatchMode {
    TemperatureLadder {
        config: KawasakiConfig,
    },
    SirsPhase {
        grid: ParameterRange,
        p2: f64,
    },
    SirsVariance {
        grid: ParameterRange,
        p2: f64,
    },
    SirsImmunity {
        fractions: ParameterRange,
    },
}

impl BatchMode {
    pub fn from_config(model: &ModelConfig) -> Option<Self> {
        match model {
            ModelConfig::Kawasaki(c) if c.mode == KawasakiMode::Ladder => {
                Some(BatchMode::TemperatureLadder { config: c.clone() })
            }
            ModelConfig::Sirs(c) => match c.mode {
                SirsMode::Single => None,
                SirsMode::Phase => Some(BatchMode::SirsPhase {
                    grid: c.grid_range(),
                    p2: c.fixed_p2,
                }),
                SirsMode::Variance => Some(BatchMode::SirsVariance {
                    grid: c.grid_range(),
                    p2: c.fixed_p2,
                }),
                SirsMode::Immunity => Some(BatchMode::SirsImmunity {
                    fractions: c.immune_range,
                }),
            },
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BatchMode::TemperatureLadder { .. } => "Kawasaki",
            BatchMode::SirsPhase { .. } => "SIRS",
            BatchMode::SirsVariance { .. } => "SIRSVariance",
            BatchMode::SirsImmunity { .. } => "SIRSImmunity",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            BatchMode::TemperatureLadder { .. } => "Kawasaki",
            _ => "SIRS",
        }
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            BatchMode::TemperatureLadder { .. } => &[
                "temp",
                "avgEnergy",
                "avgMag",
                "heatCapacity",
                "susceptibility",
            ],
            BatchMode::SirsPhase { .. } => &["p1", "p3", "avgI"],
            BatchMode::SirsVariance { .. } => &["p1", "p3", "varI"],
            BatchMode::SirsImmunity { .. } => &["iProb", "avgI", "devI"],
        }
    }

    /// Parameter points in output order
    pub fn points(&self) -> Vec<Vec<f64>> {
        match self {
            BatchMode::TemperatureLadder { config } => {
                config.ladder.values().into_iter().map(|t| vec![t]).collect()
            }
            BatchMode::SirsPhase { grid, .. } | BatchMode::SirsVariance { grid, .. } => {
                let axis = grid.values();
                axis.iter()
                    .flat_map(|p1| axis.iter().map(move |p3| vec![*p1, *p3]))
                    .collect()
            }
            BatchMode::SirsImmunity { fractions } => {
                fractions.values().into_iter().map(|f| vec![f]).collect()
            }
        }
    }

    fn kernel(&self, size: usize, point: &[f64]) -> Kernel {
        match self {
            BatchMode::TemperatureLadder { config } => {
                Kernel::Kawasaki(KawasakiKernel::new(size, point[0], config))
            }
            BatchMode::SirsPhase { p2, .. } | BatchMode::SirsVariance { p2, .. } => {
                Kernel::Sirs(SirsKernel::new(size, [point[0], *p2, point[1]], 0.0))
            }
            BatchMode::SirsImmunity { .. } => {
                Kernel::Sirs(SirsKernel::new(size, IMMUNITY_PROBABILITIES, point[0]))
            }
        }
    }

    /// Summary row of one point, `None` when nothing was sampled
    fn reduce(&self, size: usize, point: &[f64], stats: &StatisticsAggregator) -> Option<Vec<f64>> {
        if stats.is_degenerate() {
            return None;
        }
        let cells = (size * size) as f64;
        match self {
            BatchMode::TemperatureLadder { .. } => {
                let t = point[0];
                Some(vec![
                    t,
                    stats.mean("energy")?,
                    stats.mean("magnetisation")?,
                    stats.variance("energy")? / (cells * t * t),
                    stats.variance("magnetisation")? / (cells * t),
                ])
            }
            BatchMode::SirsPhase { .. } => {
                Some(vec![point[0], point[1], stats.mean("infected")?])
            }
            BatchMode::SirsVariance { .. } => Some(vec![
                point[0],
                point[1],
                stats.variance("infected")? * cells,
            ]),
            BatchMode::SirsImmunity { .. } => Some(vec![
                point[0],
                stats.mean("infected")?,
                stats.std_dev("infected")?,
            ]),
        }
    }
}

/// Rows keyed by point index, safe to fill from any worker
#[derive(Default)]
pub struct ResultCollector {
    rows: Mutex<BTreeMap<usize, Vec<f64>>>,
    sweeps: Mutex<u64>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, index: usize, row: Vec<f64>) {
        self.rows.lock().insert(index, row);
    }

    fn add_sweeps(&self, sweeps: u64) {
        *self.sweeps.lock() += sweeps;
    }

    /// Rows in parameter order
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows.into_inner().into_values().collect()
    }
}

pub struct BatchOutcome {
    pub rows: Vec<Vec<f64>>,
    pub points: usize,
    pub sweeps_completed: u64,
    pub cancelled: bool,
}

/// Private random stream of one parameter point
fn point_rng(seed: u64, index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(index as u64 + 1);
    rng
}

pub fn run_batch(
    run_id: RunId,
    params: &RunParameters,
    mode: &BatchMode,
    cancel: &CancellationToken,
) -> Result<BatchOutcome> {
    params.validate()?;
    let points = mode.points();
    let size = params.dimension;
    info!(
        event = "batch_started",
        run_id = %run_id,
        mode = mode.label(),
        points = points.len(),
        sweeps = params.sweeps,
        "Starting parameter sweep"
    );

    let collector = ResultCollector::new();
    points
        .par_iter()
        .enumerate()
        .try_for_each(|(index, point)| -> Result<()> {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let scheduler = Scheduler::new(
                run_id,
                mode.kernel(size, point),
                point_rng(params.seed, index),
                params.sweeps,
                params.schedule.clone(),
            )
            .with_cancellation(cancel.clone());
            let outcome = scheduler.run()?;
            collector.add_sweeps(outcome.sweeps_completed);
            if outcome.status.is_cancelled() {
                return Ok(());
            }

            let stats = StatisticsAggregator::from_samples(&outcome.samples);
            match mode.reduce(size, point, &stats) {
                Some(row) => {
                    debug!(event = "batch_point", index, ?point, samples = stats.sample_count(), "Point finished");
                    collector.insert(index, row);
                }
                None => warn!(
                    event = "statistical_degeneracy",
                    index,
                    ?point,
                    sweeps = params.sweeps,
                    equilibration = params.schedule.equilibration_sweeps,
                    "No samples after equilibration; row omitted"
                ),
            }
            Ok(())
        })?;

    let cancelled = cancel.is_cancelled();
    let sweeps_completed = *collector.sweeps.lock();
    let rows = collector.into_rows();
    info!(
        event = "batch_finished",
        run_id = %run_id,
        rows = rows.len(),
        cancelled,
        "Parameter sweep finished"
    );

    Ok(BatchOutcome {
        rows,
        points: points.len(),
        sweeps_completed,
        cancelled,
    })
}
