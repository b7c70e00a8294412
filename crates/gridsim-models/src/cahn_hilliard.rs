//! Explicit finite-difference Cahn-Hilliard integrator.

use crate::grid::{GridState, Lattice};
use gridsim_core::{CahnHilliardConfig, Error, Result, StatisticsSample};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

pub const COLUMNS: &[&str] = &["timesteps", "energy"];

pub struct CahnHilliardKernel {
    state: GridState<Lattice<f64>>,
    mu: Lattice<f64>,
    config: CahnHilliardConfig,
    u_constant: f64,
    sig_constant: f64,
}

impl CahnHilliardKernel {
    pub fn new(size: usize, config: &CahnHilliardConfig) -> Self {
        let dx2 = config.dx * config.dx;
        Self {
            state: GridState::new(Lattice::new(size, config.phi0)),
            mu: Lattice::new(size, 0.0),
            u_constant: config.kappa / dx2,
            sig_constant: config.mobility * config.dt / dx2,
            config: config.clone(),
        }
    }

    /// Gaussian noise of width `noise` around `phi0`
    pub fn initialize(&mut self, rng: &mut ChaCha8Rng) -> Result<()> {
        let normal = Normal::new(self.config.phi0, self.config.noise)
            .map_err(|e| Error::config(format!("noise: {}", e)))?;
        let size = self.state.current().size();
        self.state.reset(Lattice::from_fn(size, |_| normal.sample(rng)));
        Ok(())
    }

    pub fn field(&self) -> &Lattice<f64> {
        self.state.current()
    }

    pub fn set_field(&mut self, field: Lattice<f64>) {
        self.state.reset(field);
    }

    /// One timestep: chemical potential, then the conserved update
    pub fn advance_sweep(&mut self) {
        let (a, b) = (self.config.a, self.config.b);
        let size = self.mu.size();
        let (current, next) = self.state.split();

        for row in 0..size {
            for col in 0..size {
                let sigma = current.get(row, col);
                let mu = -a * sigma + b * sigma.powi(3)
                    - self.u_constant * current.laplacian(row, col);
                self.mu.set(row, col, mu);
            }
        }
        for row in 0..size {
            for col in 0..size {
                let updated = current.get(row, col) + self.sig_constant * self.mu.laplacian(row, col);
                next.set(row, col, updated);
            }
        }
        self.state.swap();
    }

    /// `-(a/2)S² + (a/4)S⁴ + (k/2)G²` with S = Σσ and G = Σ|∇σ|
    pub fn free_energy(&self) -> f64 {
        let field = self.field();
        let s = field.sum();
        let g: f64 = field
            .iter()
            .map(|(c, _)| {
                let (dr, dc) = field.gradient(c.row, c.col, self.config.dx);
                (dr * dr + dc * dc).sqrt()
            })
            .sum();
        let a = self.config.a;
        -(a / 2.0) * s.powi(2) + (a / 4.0) * s.powi(4) + (self.config.kappa / 2.0) * g.powi(2)
    }

    pub fn capture_statistics(&self, sweep: u64) -> StatisticsSample {
        StatisticsSample::new(sweep, COLUMNS, vec![sweep as f64, self.free_energy()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_derived_constants() {
        let config = CahnHilliardConfig {
            dx: 2.0,
            dt: 0.5,
            ..Default::default()
        };
        let kernel = CahnHilliardKernel::new(4, &config);
        assert!((kernel.u_constant - 0.025).abs() < 1e-15);
        assert!((kernel.sig_constant - 0.0125).abs() < 1e-15);
    }

    #[test]
    fn test_uniform_field_is_stationary() {
        let config = CahnHilliardConfig {
            phi0: 0.3,
            ..Default::default()
        };
        let mut kernel = CahnHilliardKernel::new(6, &config);
        kernel.set_field(Lattice::new(6, 0.3));
        kernel.advance_sweep();
        assert!(kernel.field().cells().iter().all(|v| (v - 0.3).abs() < 1e-15));
    }

    #[test]
    fn test_sum_drift_is_small() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut kernel = CahnHilliardKernel::new(32, &CahnHilliardConfig::default());
        kernel.initialize(&mut rng).unwrap();
        let start = kernel.field().sum();

        let mut largest_update: f64 = 0.0;
        for _ in 0..50 {
            let before = kernel.field().clone();
            kernel.advance_sweep();
            let step = before
                .cells()
                .iter()
                .zip(kernel.field().cells())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            largest_update = largest_update.max(step);
        }
        let drift = (kernel.field().sum() - start).abs();
        assert!(largest_update > 0.0);
        assert!(drift < 1e-6 * largest_update.max(1.0), "drift {}", drift);
    }

    #[test]
    fn test_energy_of_flat_field() {
        let config = CahnHilliardConfig {
            a: 0.2,
            ..Default::default()
        };
        let mut kernel = CahnHilliardKernel::new(2, &config);
        kernel.set_field(Lattice::new(2, 0.5));
        // S = 2, G = 0
        assert!((kernel.free_energy() - (-0.4 + 0.8)).abs() < 1e-12);
        assert_eq!(kernel.capture_statistics(3).values[0], 3.0);
    }
}
