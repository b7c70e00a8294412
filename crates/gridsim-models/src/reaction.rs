//! Reaction-diffusion of a field fed by a Gaussian source and decaying linearly.

use crate::grid::{GridState, Lattice};
use gridsim_core::{ReactionDiffusionConfig, StatisticsSample};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};

pub const COLUMNS: &[&str] = &["timesteps", "avgPhi"];

pub struct ReactionDiffusionKernel {
    state: GridState<Lattice<f64>>,
    /// ρ(i, j) = exp(-r²/σ²), fixed for the run
    source: Lattice<f64>,
    config: ReactionDiffusionConfig,
}

impl ReactionDiffusionKernel {
    pub fn new(size: usize, config: &ReactionDiffusionConfig) -> Self {
        let centre = size as f64 / 2.0;
        let sigma2 = config.sigma * config.sigma;
        let source = Lattice::from_fn(size, |c| {
            let (di, dj) = (c.row as f64 - centre, c.col as f64 - centre);
            (-(di * di + dj * dj) / sigma2).exp()
        });
        Self {
            state: GridState::new(Lattice::new(size, config.baseline)),
            source,
            config: config.clone(),
        }
    }

    /// Uniform noise of half-width `noise` around `baseline`
    pub fn initialize(&mut self, rng: &mut ChaCha8Rng) {
        let size = self.source.size();
        let baseline = self.config.baseline;
        let field = if self.config.noise > 0.0 {
            let noise = Uniform::new(-self.config.noise, self.config.noise);
            Lattice::from_fn(size, |_| baseline + noise.sample(rng))
        } else {
            Lattice::new(size, baseline)
        };
        self.state.reset(field);
    }

    pub fn field(&self) -> &Lattice<f64> {
        self.state.current()
    }

    pub fn source(&self) -> &Lattice<f64> {
        &self.source
    }

    pub fn advance_sweep(&mut self) {
        let ReactionDiffusionConfig {
            dx,
            dt,
            diffusion,
            kappa,
            ..
        } = self.config;
        let size = self.source.size();
        let (current, next) = self.state.split();
        for row in 0..size {
            for col in 0..size {
                let phi = current.get(row, col);
                let rate = diffusion * current.laplacian(row, col) / (dx * dx)
                    + self.source.get(row, col)
                    - kappa * phi;
                next.set(row, col, phi + dt * rate);
            }
        }
        self.state.swap();
    }

    pub fn mean(&self) -> f64 {
        let field = self.field();
        field.sum() / field.cells().len() as f64
    }

    pub fn capture_statistics(&self, sweep: u64) -> StatisticsSample {
        StatisticsSample::new(sweep, COLUMNS, vec![sweep as f64, self.mean()])
    }
}
