//! Entry point: validate parameters, run a single simulation or a batch, build the record.

use crate::batch::{self, BatchMode};
use crate::grid::GridSnapshot;
use crate::kernel::Kernel;
use crate::poisson::CrossSection;
use crate::scheduler::{RunStatus, Scheduler};
use chrono::{DateTime, Utc};
use gridsim_core::{
    glider_speed, BoundaryIndex, Error, ModelConfig, Result, ResultSink, RunId, RunParameters,
    RunRecord, SirsRegime,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Everything a finished run hands to its collaborators
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub record: RunRecord,
    pub status: RunStatus,
    pub sweeps_completed: u64,
    /// Final grid of a single run; batches keep no grid
    pub snapshot: Option<GridSnapshot>,
    pub cross_section: Option<CrossSection>,
    pub glider_speed: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Turn a relaxation that ran out of iterations into an error
    pub fn ensure_converged(&self) -> Result<()> {
        match self.status {
            RunStatus::ConvergenceFailure {
                iterations,
                last_delta,
            } => Err(Error::ConvergenceFailure {
                iterations,
                last_delta,
            }),
            _ => Ok(()),
        }
    }
}

/// Record label; single SIRS runs with a named regime carry it, e.g. `SIRSHalf`
fn single_label(kernel: &Kernel, model: &ModelConfig) -> String {
    let regime = match model {
        ModelConfig::Sirs(c) => c
            .regime
            .as_deref()
            .and_then(|name| name.parse::<SirsRegime>().ok()),
        _ => None,
    };
    match regime {
        Some(regime) => format!("{}{:?}", kernel.label(), regime),
        None => kernel.label().to_string(),
    }
}

/// Run the simulation described by `params` until completion or cancellation
#[instrument(skip(params, cancel), fields(dimension = params.dimension, sweeps = params.sweeps))]
pub fn execute(params: &RunParameters, cancel: &CancellationToken) -> Result<RunSummary> {
    params.validate()?;
    let run_id = RunId::new();
    let started_at = Utc::now();
    let cells = params.cell_count();

    let summary = match BatchMode::from_config(&params.model) {
        Some(mode) => {
            let outcome = batch::run_batch(run_id, params, &mode, cancel)?;
            let mut record = RunRecord::new(
                mode.label(),
                mode.title(),
                params.dimension,
                cells,
                params.sweeps,
                mode.headers(),
            );
            for row in outcome.rows {
                record.push_row(row);
            }
            let status = if outcome.cancelled {
                RunStatus::Cancelled {
                    sweeps: outcome.sweeps_completed,
                }
            } else {
                RunStatus::Completed
            };
            RunSummary {
                run_id,
                record,
                status,
                sweeps_completed: outcome.sweeps_completed,
                snapshot: None,
                cross_section: None,
                glider_speed: None,
                started_at,
                finished_at: Utc::now(),
            }
        }
        None => {
            let outcome = Scheduler::from_params(run_id, params)?
                .with_cancellation(cancel.clone())
                .run()?;
            if outcome.is_degenerate() {
                warn!(
                    event = "statistical_degeneracy",
                    run_id = %run_id,
                    sweeps = params.sweeps,
                    equilibration = params.schedule.equilibration_sweeps,
                    "No samples after equilibration; record has no rows"
                );
            }
            let kernel = &outcome.kernel;

            let mut record = RunRecord::new(
                single_label(kernel, &params.model),
                kernel.title(),
                params.dimension,
                cells,
                params.sweeps,
                kernel.columns(),
            );
            for sample in &outcome.samples {
                record.push_row(sample.values.clone());
            }

            let glider_speed = if kernel.tracks_glider() {
                let centroids: Vec<(f64, f64)> = outcome
                    .samples
                    .iter()
                    .filter_map(|s| Some((s.get("comX")?, s.get("comY")?)))
                    .collect();
                glider_speed(&centroids, &BoundaryIndex::new(params.dimension))
            } else {
                None
            };

            RunSummary {
                run_id,
                record,
                status: outcome.status,
                sweeps_completed: outcome.sweeps_completed,
                snapshot: Some(kernel.snapshot()),
                cross_section: kernel.cross_section(),
                glider_speed,
                started_at,
                finished_at: Utc::now(),
            }
        }
    };

    info!(
        event = "run_complete",
        run_id = %summary.run_id,
        record = %summary.record.name(),
        rows = summary.record.rows.len(),
        sweeps_completed = summary.sweeps_completed,
        status = ?summary.status,
        elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
        "Run complete"
    );
    Ok(summary)
}

/// Run and hand the finished record to `sink`
pub fn execute_into(
    params: &RunParameters,
    sink: &mut dyn ResultSink,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let summary = execute(params, cancel)?;
    sink.accept(&summary.record)?;
    Ok(summary)
}
