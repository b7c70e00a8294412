//! Closed set of simulation kernels selected at configuration time.

use crate::cahn_hilliard::{self, CahnHilliardKernel};
use crate::grid::GridSnapshot;
use crate::kawasaki::{self, KawasakiKernel};
use crate::life::LifeKernel;
use crate::poisson::{self, CrossSection, PoissonKernel};
use crate::reaction::{self, ReactionDiffusionKernel};
use crate::sirs::{self, SirsKernel};
use gridsim_core::{ModelConfig, Result, RunParameters, StatisticsSample};
use rand_chacha::ChaCha8Rng;

/// When the scheduler asks a kernel for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// After every sweep or timestep
    EverySweep,
    /// After the equilibration skip, every `sample_interval` sweeps
    Equilibrated,
}

pub enum Kernel {
    Life(LifeKernel),
    Kawasaki(KawasakiKernel),
    Sirs(SirsKernel),
    CahnHilliard(CahnHilliardKernel),
    Poisson(PoissonKernel),
    ReactionDiffusion(ReactionDiffusionKernel),
}

impl Kernel {
    /// Build the kernel of a single (non-batch) run from validated parameters
    pub(crate) fn from_config(params: &RunParameters) -> Result<Self> {
        let size = params.dimension;
        Ok(match &params.model {
            ModelConfig::Life(c) => Kernel::Life(LifeKernel::new(size, c)?),
            ModelConfig::Kawasaki(c) => {
                Kernel::Kawasaki(KawasakiKernel::new(size, c.temperature, c))
            }
            ModelConfig::Sirs(c) => Kernel::Sirs(SirsKernel::new(
                size,
                c.resolve_probabilities()?,
                c.immune_fraction,
            )),
            ModelConfig::CahnHilliard(c) => {
                Kernel::CahnHilliard(CahnHilliardKernel::new(size, c))
            }
            ModelConfig::Poisson(c) => {
                let budget = params.sweeps.min(params.schedule.max_iterations);
                Kernel::Poisson(PoissonKernel::new(size, c, budget))
            }
            ModelConfig::ReactionDiffusion(c) => {
                Kernel::ReactionDiffusion(ReactionDiffusionKernel::new(size, c))
            }
        })
    }

    /// Short label used in record names
    pub fn label(&self) -> &'static str {
        match self {
            Kernel::Life(_) => "GoL",
            Kernel::Kawasaki(_) => "Kawasaki",
            Kernel::Sirs(_) => "SIRS",
            Kernel::CahnHilliard(_) => "Cahn",
            Kernel::Poisson(_) => "Poisson",
            Kernel::ReactionDiffusion(_) => "Reaction",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Kernel::Life(_) => "Game Of Life",
            Kernel::Kawasaki(_) => "Kawasaki",
            Kernel::Sirs(_) => "SIRS",
            Kernel::CahnHilliard(_) => "Cahn Hilliard",
            Kernel::Poisson(_) => "Poisson",
            Kernel::ReactionDiffusion(_) => "Reaction Diffusion",
        }
    }

    pub fn initialize(&mut self, rng: &mut ChaCha8Rng) -> Result<()> {
        match self {
            Kernel::Life(k) => k.initialize(rng)?,
            Kernel::Kawasaki(k) => k.initialize(rng),
            Kernel::Sirs(k) => k.initialize(rng)?,
            Kernel::CahnHilliard(k) => k.initialize(rng)?,
            Kernel::Poisson(k) => k.initialize(),
            Kernel::ReactionDiffusion(k) => k.initialize(rng),
        }
        Ok(())
    }

    /// One sweep, timestep or relaxation iteration
    pub fn advance_sweep(&mut self, rng: &mut ChaCha8Rng) {
        match self {
            Kernel::Life(k) => k.advance_sweep(),
            Kernel::Kawasaki(k) => k.advance_sweep(rng),
            Kernel::Sirs(k) => k.advance_sweep(rng),
            Kernel::CahnHilliard(k) => k.advance_sweep(),
            Kernel::Poisson(k) => k.advance_sweep(),
            Kernel::ReactionDiffusion(k) => k.advance_sweep(),
        }
    }

    /// Relaxation stops on convergence or budget; everything else after `sweeps`
    pub fn is_complete(&self, sweeps_done: u64, sweeps: u64) -> bool {
        match self {
            Kernel::Poisson(k) => k.is_complete(),
            _ => sweeps_done >= sweeps,
        }
    }

    pub fn sampling(&self) -> Sampling {
        match self {
            Kernel::Kawasaki(_) | Kernel::Sirs(_) => Sampling::Equilibrated,
            _ => Sampling::EverySweep,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Kernel::Life(k) => k.columns(),
            Kernel::Kawasaki(_) => kawasaki::COLUMNS,
            Kernel::Sirs(_) => sirs::COLUMNS,
            Kernel::CahnHilliard(_) => cahn_hilliard::COLUMNS,
            Kernel::Poisson(_) => poisson::COLUMNS,
            Kernel::ReactionDiffusion(_) => reaction::COLUMNS,
        }
    }

    pub fn capture_statistics(&self, sweep: u64) -> StatisticsSample {
        match self {
            Kernel::Life(k) => k.capture_statistics(sweep),
            Kernel::Kawasaki(k) => k.capture_statistics(sweep),
            Kernel::Sirs(k) => k.capture_statistics(sweep),
            Kernel::CahnHilliard(k) => k.capture_statistics(sweep),
            Kernel::Poisson(k) => k.capture_statistics(sweep),
            Kernel::ReactionDiffusion(k) => k.capture_statistics(sweep),
        }
    }

    /// Copy of the current grid as floating point values
    pub fn snapshot(&self) -> GridSnapshot {
        match self {
            Kernel::Life(k) => GridSnapshot::Lattice(k.lattice().map(f64::from)),
            Kernel::Kawasaki(k) => GridSnapshot::Lattice(k.spins().map(f64::from)),
            Kernel::Sirs(k) => GridSnapshot::Lattice(k.cells().map(f64::from)),
            Kernel::CahnHilliard(k) => GridSnapshot::Lattice(k.field().clone()),
            Kernel::Poisson(k) => GridSnapshot::Volume(k.potential().clone()),
            Kernel::ReactionDiffusion(k) => GridSnapshot::Lattice(k.field().clone()),
        }
    }

    pub fn cross_section(&self) -> Option<CrossSection> {
        match self {
            Kernel::Poisson(k) => Some(k.cross_section()),
            _ => None,
        }
    }

    pub fn as_relaxation(&self) -> Option<&PoissonKernel> {
        match self {
            Kernel::Poisson(k) => Some(k),
            _ => None,
        }
    }

    pub fn tracks_glider(&self) -> bool {
        matches!(self, Kernel::Life(k) if k.tracks_glider())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_core::{LifeConfig, PoissonConfig, SirsConfig};

    #[test]
    fn test_kernel_from_config() {
        let params = RunParameters {
            dimension: 8,
            model: ModelConfig::Sirs(SirsConfig {
                regime: Some("half".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let kernel = Kernel::from_config(&params).unwrap();
        assert_eq!(kernel.label(), "SIRS");
        assert_eq!(kernel.sampling(), Sampling::Equilibrated);
        assert_eq!(kernel.columns(), &["sweep", "infected"]);
    }

    #[test]
    fn test_relaxation_budget_is_capped() {
        let mut params = RunParameters {
            dimension: 5,
            sweeps: 1_000_000,
            model: ModelConfig::Poisson(PoissonConfig::default()),
            ..Default::default()
        };
        params.schedule.max_iterations = 3;
        let mut kernel = Kernel::from_config(&params).unwrap();
        let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(0);
        kernel.initialize(&mut rng).unwrap();
        for _ in 0..3 {
            assert!(!kernel.is_complete(0, params.sweeps));
            kernel.advance_sweep(&mut rng);
        }
        assert!(kernel.is_complete(3, params.sweeps));
        assert!(kernel.cross_section().is_some());
    }

    #[test]
    fn test_life_snapshot() {
        let params = RunParameters {
            dimension: 6,
            model: ModelConfig::Life(LifeConfig {
                pattern: Some("block".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut kernel = Kernel::from_config(&params).unwrap();
        let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(0);
        kernel.initialize(&mut rng).unwrap();
        match kernel.snapshot() {
            GridSnapshot::Lattice(lattice) => assert_eq!(lattice.sum(), 4.0),
            GridSnapshot::Volume(_) => panic!("expected a lattice"),
        }
        assert!(!kernel.tracks_glider());
    }
}
