//! Lattice simulation kernels and the loop that drives them.
//!
//! Six models share the toroidal grids in [`grid`]: Game of Life, Kawasaki
//! spin exchange, SIRS, Cahn-Hilliard, Poisson relaxation and
//! reaction-diffusion. [`engine::execute`] is the single entry point.

pub mod grid;
pub mod patterns;
pub mod life;
pub mod kawasaki;
pub mod sirs;
pub mod cahn_hilliard;
pub mod poisson;
pub mod reaction;
pub mod kernel;
pub mod scheduler;
pub mod batch;
pub mod engine;

pub use grid::{GridSnapshot, GridState, Lattice, Volume};
pub use kernel::{Kernel, Sampling};
pub use poisson::CrossSection;
pub use scheduler::{RunOutcome, RunStatus, Scheduler};
pub use batch::{BatchMode, BatchOutcome};
pub use engine::{execute, execute_into, RunSummary};
