//! Jacobi and Gauss-Seidel relaxation of the 3D Poisson equation.

use crate::grid::{Lattice, Volume};
use gridsim_core::{PoissonConfig, RelaxationMethod, SourceKind, StatisticsSample};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const COLUMNS: &[&str] = &["iteration", "delta"];

/// Mid-plane cut of a relaxed volume, perpendicular to the third axis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossSection {
    pub source_kind: SourceKind,
    pub potential: Lattice<f64>,
    pub source: Lattice<f64>,
    /// Row-major field vectors; zero on the plane boundary
    pub field: Vec<[f64; 2]>,
}

impl CrossSection {
    fn cut(potential: &Volume, source: &Volume, kind: SourceKind, dx: f64) -> Self {
        let mid = potential.size() / 2;
        let potential = potential.plane(mid);
        let source = source.plane(mid);
        let size = potential.size();

        let mut field = vec![[0.0, 0.0]; size * size];
        for i in 1..size - 1 {
            for j in 1..size - 1 {
                let d_i = (potential.get(i + 1, j) - potential.get(i - 1, j)) / (2.0 * dx);
                let d_j = (potential.get(i, j + 1) - potential.get(i, j - 1)) / (2.0 * dx);
                field[i * size + j] = match kind {
                    // B = curl(A) for a vector potential along the third axis
                    SourceKind::CurrentPair => [d_j, -d_i],
                    SourceKind::Point | SourceKind::Line => [-d_i, -d_j],
                };
            }
        }

        Self {
            source_kind: kind,
            potential,
            source,
            field,
        }
    }

    pub fn field_at(&self, i: usize, j: usize) -> [f64; 2] {
        self.field[i * self.potential.size() + j]
    }
}

/// Relative change of the grid sum between two iterates
pub fn convergence_delta(old_sum: f64, new_sum: f64) -> f64 {
    let diff = (new_sum - old_sum).abs();
    if new_sum == 0.0 {
        diff
    } else {
        diff / new_sum.abs()
    }
}

pub struct PoissonKernel {
    potential: Volume,
    previous: Volume,
    source: Volume,
    config: PoissonConfig,
    budget: u64,
    iterations: u64,
    last_delta: f64,
    converged: bool,
}

impl PoissonKernel {
    pub fn new(size: usize, config: &PoissonConfig, budget: u64) -> Self {
        Self {
            potential: Volume::new(size),
            previous: Volume::new(size),
            source: Volume::new(size),
            config: config.clone(),
            budget,
            iterations: 0,
            last_delta: f64::INFINITY,
            converged: false,
        }
    }

    /// Zero potential and the configured fixed source
    pub fn initialize(&mut self) {
        let size = self.potential.size();
        let mid = size / 2;
        self.potential = Volume::new(size);
        self.previous = Volume::new(size);
        self.source = Volume::new(size);
        match self.config.source {
            SourceKind::Point => self.source.set(mid, mid, mid, 1.0),
            SourceKind::Line => {
                for k in 0..size {
                    self.source.set(mid, mid, k, 1.0);
                }
            }
            SourceKind::CurrentPair => {
                let offset = size / 4;
                for k in 0..size {
                    self.source.set(mid - offset, mid, k, 1.0);
                    self.source.set(mid + offset, mid, k, 1.0);
                }
            }
        }
        self.iterations = 0;
        self.last_delta = f64::INFINITY;
        self.converged = false;
        debug!(source = ?self.config.source, method = ?self.config.method, budget = self.budget, "Built source field");
    }

    /// One relaxation pass over the interior
    pub fn advance_sweep(&mut self) {
        self.previous.copy_from(&self.potential);
        let size = self.potential.size();
        let dx2 = self.config.dx * self.config.dx;

        match self.config.method {
            RelaxationMethod::Jacobi => {
                for i in 1..size - 1 {
                    for j in 1..size - 1 {
                        for k in 1..size - 1 {
                            let value = (self.previous.neighbor_sum(i, j, k)
                                + self.source.get(i, j, k) * dx2)
                                / 6.0;
                            self.potential.set(i, j, k, value);
                        }
                    }
                }
            }
            RelaxationMethod::GaussSeidel => {
                let weight = self.config.gauss_seidel_weight;
                for i in 1..size - 1 {
                    for j in 1..size - 1 {
                        for k in 1..size - 1 {
                            let value = weight
                                * (self.potential.neighbor_sum(i, j, k)
                                    + self.source.get(i, j, k) * dx2);
                            self.potential.set(i, j, k, value);
                        }
                    }
                }
            }
        }

        self.iterations += 1;
        self.last_delta = convergence_delta(self.previous.sum(), self.potential.sum());
        self.converged = self.last_delta <= self.config.limit;
    }

    pub fn is_complete(&self) -> bool {
        self.converged || self.iterations >= self.budget
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }

    pub fn potential(&self) -> &Volume {
        &self.potential
    }

    pub fn source(&self) -> &Volume {
        &self.source
    }

    pub fn cross_section(&self) -> CrossSection {
        CrossSection::cut(&self.potential, &self.source, self.config.source, self.config.dx)
    }

    pub fn capture_statistics(&self, sweep: u64) -> StatisticsSample {
        StatisticsSample::new(sweep, COLUMNS, vec![self.iterations as f64, self.last_delta])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relax(size: usize, config: PoissonConfig, budget: u64) -> (PoissonKernel, Vec<f64>) {
        let mut kernel = PoissonKernel::new(size, &config, budget);
        kernel.initialize();
        let mut deltas = Vec::new();
        while !kernel.is_complete() {
            kernel.advance_sweep();
            deltas.push(kernel.last_delta());
        }
        (kernel, deltas)
    }

    #[test]
    fn test_delta_definition() {
        assert_eq!(convergence_delta(0.0, 2.0), 1.0);
        assert_eq!(convergence_delta(1.5, 2.0), 0.25);
        assert_eq!(convergence_delta(0.5, 0.0), 0.5);
    }

    #[test]
    fn test_jacobi_delta_is_non_increasing() {
        let config = PoissonConfig {
            limit: 1e-6,
            ..Default::default()
        };
        let (kernel, deltas) = relax(10, config, 5_000);
        assert!(kernel.converged());
        for pair in deltas.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12, "{} > {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_boundaries_stay_zero() {
        let config = PoissonConfig {
            source: SourceKind::Line,
            ..Default::default()
        };
        let (kernel, _) = relax(8, config, 50);
        let potential = kernel.potential();
        for i in 0..8 {
            for j in 0..8 {
                for k in 0..8 {
                    if potential.is_boundary(i, j, k) {
                        assert_eq!(potential.get(i, j, k), 0.0);
                    }
                }
            }
        }
        assert!(potential.get(4, 4, 4) > 0.0);
    }

    #[test]
    fn test_gauss_seidel_converges_with_consistent_weight() {
        let config = PoissonConfig {
            method: RelaxationMethod::GaussSeidel,
            ..Default::default()
        };
        let (kernel, _) = relax(10, config, 5_000);
        assert!(kernel.converged());
        assert!(kernel.last_delta() <= 1e-4);
    }

    #[test]
    fn test_legacy_gauss_seidel_weight_exhausts_budget() {
        let config = PoissonConfig {
            method: RelaxationMethod::GaussSeidel,
            gauss_seidel_weight: 0.5,
            ..Default::default()
        };
        let (kernel, deltas) = relax(6, config, 100);
        assert!(!kernel.converged());
        assert_eq!(kernel.iterations(), 100);
        assert_eq!(deltas.len(), 100);
        assert!(kernel.last_delta() > 1e-4);
    }

    #[test]
    fn test_point_charge_field_points_outward() {
        let (kernel, _) = relax(11, PoissonConfig::default(), 2_000);
        let section = kernel.cross_section();
        assert_eq!(section.source.get(5, 5), 1.0);
        // E below the charge points towards larger row index
        assert!(section.field_at(7, 5)[0] > 0.0);
        assert!(section.field_at(3, 5)[0] < 0.0);
        assert_eq!(section.field_at(0, 3), [0.0, 0.0]);
    }

    #[test]
    fn test_current_pair_source() {
        let config = PoissonConfig {
            source: SourceKind::CurrentPair,
            ..Default::default()
        };
        let mut kernel = PoissonKernel::new(12, &config, 10);
        kernel.initialize();
        assert_eq!(kernel.source().sum(), 24.0);
        assert_eq!(kernel.source().get(3, 6, 0), 1.0);
        assert_eq!(kernel.source().get(9, 6, 11), 1.0);
        let section = kernel.cross_section();
        assert_eq!(section.source_kind, SourceKind::CurrentPair);
    }

    #[test]
    fn test_zero_budget_is_complete() {
        let mut kernel = PoissonKernel::new(5, &PoissonConfig::default(), 0);
        kernel.initialize();
        assert!(kernel.is_complete());
        assert!(!kernel.converged());
    }
}
