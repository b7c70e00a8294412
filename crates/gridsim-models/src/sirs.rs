//! SIRS epidemic automaton with an optional permanently immune state.

use crate::grid::Lattice;
use gridsim_core::{Error, Result, StatisticsSample};
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Distribution;

pub const SUSCEPTIBLE: i8 = 0;
pub const INFECTED: i8 = -1;
pub const RECOVERED: i8 = 1;
pub const IMMUNE: i8 = 2;

pub const COLUMNS: &[&str] = &["sweep", "infected"];

const INITIAL_STATES: [i8; 4] = [IMMUNE, RECOVERED, SUSCEPTIBLE, INFECTED];

pub struct SirsKernel {
    cells: Lattice<i8>,
    /// (p1, p2, p3): infection, recovery, loss of immunity
    probabilities: [f64; 3],
    immune_fraction: f64,
}

impl SirsKernel {
    pub fn new(size: usize, probabilities: [f64; 3], immune_fraction: f64) -> Self {
        Self {
            cells: Lattice::new(size, SUSCEPTIBLE),
            probabilities,
            immune_fraction,
        }
    }

    /// Draw every cell from {immune, R, S, I} with weights (f, (1-f)/3, (1-f)/3, (1-f)/3)
    pub fn initialize(&mut self, rng: &mut ChaCha8Rng) -> Result<()> {
        let f = self.immune_fraction;
        let rest = (1.0 - f) / 3.0;
        let weights = WeightedIndex::new([f, rest, rest, rest])
            .map_err(|e| Error::config(format!("immune fraction {}: {}", f, e)))?;
        let size = self.cells.size();
        self.cells = Lattice::from_fn(size, |_| INITIAL_STATES[weights.sample(rng)]);
        Ok(())
    }

    pub fn cells(&self) -> &Lattice<i8> {
        &self.cells
    }

    pub fn set_cells(&mut self, cells: Lattice<i8>) {
        self.cells = cells;
    }

    /// Update one uniformly chosen cell; returns its coordinates
    pub fn sub_step(&mut self, rng: &mut ChaCha8Rng) -> (usize, usize) {
        let size = self.cells.size();
        let (row, col) = (rng.gen_range(0..size), rng.gen_range(0..size));
        let u: f64 = rng.gen();
        let [p1, p2, p3] = self.probabilities;

        let next = match self.cells.get(row, col) {
            SUSCEPTIBLE
                if u < p1 && self.cells.von_neumann(row, col).contains(&INFECTED) =>
            {
                INFECTED
            }
            INFECTED if u < p2 => RECOVERED,
            RECOVERED if u < p3 => SUSCEPTIBLE,
            state => state,
        };
        self.cells.set(row, col, next);
        (row, col)
    }

    /// N² single-cell updates
    pub fn advance_sweep(&mut self, rng: &mut ChaCha8Rng) {
        let attempts = self.cells.size() * self.cells.size();
        for _ in 0..attempts {
            self.sub_step(rng);
        }
    }

    pub fn infected_count(&self) -> usize {
        self.cells.count(INFECTED)
    }

    pub fn infected_fraction(&self) -> f64 {
        self.infected_count() as f64 / self.cells.cells().len() as f64
    }

    pub fn capture_statistics(&self, sweep: u64) -> StatisticsSample {
        StatisticsSample::new(sweep, COLUMNS, vec![sweep as f64, self.infected_fraction()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_domain_closure() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut kernel = SirsKernel::new(12, [0.8, 0.1, 0.01], 0.2);
        kernel.initialize(&mut rng).unwrap();
        for _ in 0..30 {
            kernel.advance_sweep(&mut rng);
            assert!(kernel
                .cells()
                .cells()
                .iter()
                .all(|s| [SUSCEPTIBLE, INFECTED, RECOVERED, IMMUNE].contains(s)));
        }
    }

    #[test]
    fn test_without_immunity_only_three_states_appear() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut kernel = SirsKernel::new(10, [0.5, 0.5, 0.5], 0.0);
        kernel.initialize(&mut rng).unwrap();
        for _ in 0..10 {
            kernel.advance_sweep(&mut rng);
        }
        assert_eq!(kernel.cells().count(IMMUNE), 0);
    }

    #[test]
    fn test_immune_cells_never_change() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut kernel = SirsKernel::new(10, [1.0, 1.0, 1.0], 0.3);
        kernel.initialize(&mut rng).unwrap();
        let immune: Vec<usize> = kernel
            .cells()
            .cells()
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == IMMUNE)
            .map(|(i, _)| i)
            .collect();
        assert!(!immune.is_empty());
        for _ in 0..20 {
            kernel.advance_sweep(&mut rng);
        }
        for i in immune {
            assert_eq!(kernel.cells().cells()[i], IMMUNE);
        }
    }

    #[test]
    fn test_full_immunity_is_frozen() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut kernel = SirsKernel::new(6, [1.0, 1.0, 1.0], 1.0);
        kernel.initialize(&mut rng).unwrap();
        kernel.advance_sweep(&mut rng);
        assert_eq!(kernel.cells().count(IMMUNE), 36);
        assert_eq!(kernel.infected_fraction(), 0.0);
    }

    #[test]
    fn test_isolated_susceptible_stays_healthy() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut kernel = SirsKernel::new(5, [1.0, 0.0, 0.0], 0.0);
        kernel.set_cells(Lattice::new(5, SUSCEPTIBLE));
        kernel.advance_sweep(&mut rng);
        assert_eq!(kernel.infected_count(), 0);
    }

    #[test]
    fn test_infection_spreads_from_centre() {
        let neighbours = [(0, 1), (2, 1), (1, 0), (1, 2)];
        let trials = 400;
        let (mut reached_first_sweep, mut reached_all) = (0, 0);

        for seed in 0..trials {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut kernel = SirsKernel::new(3, [1.0, 1.0, 1.0], 0.0);
            let mut start = Lattice::new(3, SUSCEPTIBLE);
            start.set(1, 1, INFECTED);
            kernel.set_cells(start);

            let mut ever = [false; 4];
            for sweep in 0..3 {
                for _ in 0..9 {
                    let (row, col) = kernel.sub_step(&mut rng);
                    if let Some(i) = neighbours.iter().position(|n| *n == (row, col)) {
                        ever[i] |= kernel.cells().get(row, col) == INFECTED;
                    }
                }
                if sweep == 0 && ever.iter().any(|e| *e) {
                    reached_first_sweep += 1;
                }
            }
            if ever.iter().all(|e| *e) {
                reached_all += 1;
            }
        }

        assert!(reached_first_sweep as f64 / trials as f64 > 0.7);
        assert!(reached_all as f64 / trials as f64 > 0.3);
    }
}
