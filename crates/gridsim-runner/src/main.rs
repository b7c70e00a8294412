//! Command-line runner: load parameters, run the engine, persist the results.

mod sink;
mod telemetry;

use anyhow::{Context, Result};
use gridsim_core::{ResultSink, RunParameters, RunnerConfig};
use gridsim_models::{execute, RunStatus};
use sink::FileSink;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn runner_config() -> RunnerConfig {
    let mut config = RunnerConfig::default();
    if let Ok(dir) = std::env::var("GRIDSIM_DATA_DIR") {
        config.data_dir = dir;
    }
    if let Ok(format) = std::env::var("GRIDSIM_LOG_FORMAT") {
        config.json_logs = format.eq_ignore_ascii_case("json");
    }
    config
}

async fn load_parameters(path: Option<String>) -> Result<RunParameters> {
    match path {
        Some(path) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading run parameters from {}", path))?;
            let params = RunParameters::from_json(&text)?;
            info!(path = %path, "Loaded run parameters");
            Ok(params)
        }
        None => {
            info!("No parameter file given, using defaults");
            Ok(RunParameters::default())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = runner_config();
    telemetry::init_telemetry(&config)?;

    let params = load_parameters(std::env::args().nth(1)).await?;
    info!(
        dimension = params.dimension,
        sweeps = params.sweeps,
        seed = params.seed,
        batch = params.model.is_batch(),
        "Starting gridsim run"
    );

    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let mut worker = tokio::task::spawn_blocking(move || execute(&params, &worker_cancel));

    let summary = tokio::select! {
        joined = &mut worker => joined??,
        _ = shutdown_signal() => {
            cancel.cancel();
            info!("Waiting for the current sweep to finish");
            worker.await??
        }
    };

    let mut sink = FileSink::new(&config.data_dir)?;
    sink.accept(&summary.record)?;
    if let Some(snapshot) = &summary.snapshot {
        sink.write_snapshot(&summary.record, snapshot)?;
    }
    if let Some(section) = &summary.cross_section {
        sink.write_cross_section(&summary.record, section)?;
    }
    if let Some(speed) = summary.glider_speed {
        info!(event = "glider_speed", speed, "Glider speed {:.4} cells per sweep", speed);
    }

    match summary.status {
        RunStatus::ConvergenceFailure { .. } => {
            if let Err(e) = summary.ensure_converged() {
                warn!("{}; best-effort results saved", e);
            }
        }
        RunStatus::Cancelled { sweeps } => {
            warn!(sweeps, "Run cancelled; partial results saved");
        }
        _ => {}
    }

    info!(data_dir = %sink.dir().display(), "Shutting down runner");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
