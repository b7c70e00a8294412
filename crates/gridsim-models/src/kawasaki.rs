//! Ising spins under Kawasaki (spin-exchange) dynamics.

use crate::grid::Lattice;
use gridsim_core::{KawasakiConfig, StatisticsSample};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub const UP: i8 = 1;
pub const DOWN: i8 = -1;

pub const COLUMNS: &[&str] = &["sweep", "energy", "magnetisation"];

/// Metropolis acceptance of a move costing `delta_e` at temperature `t`
#[inline]
fn metropolis(delta_e: f64, t: f64, rng: &mut ChaCha8Rng) -> bool {
    let u: f64 = rng.gen();
    delta_e < 0.0 || u <= (-delta_e / t).exp()
}

pub struct KawasakiKernel {
    spins: Lattice<i8>,
    temperature: f64,
    strict: bool,
    attempted: u64,
    exchanged: u64,
}

impl KawasakiKernel {
    pub fn new(size: usize, temperature: f64, config: &KawasakiConfig) -> Self {
        Self {
            spins: Lattice::new(size, UP),
            temperature,
            strict: config.strict_pair_selection,
            attempted: 0,
            exchanged: 0,
        }
    }

    pub fn initialize(&mut self, rng: &mut ChaCha8Rng) {
        let size = self.spins.size();
        self.spins = Lattice::from_fn(size, |_| if rng.gen_bool(0.5) { UP } else { DOWN });
        self.attempted = 0;
        self.exchanged = 0;
    }

    pub fn spins(&self) -> &Lattice<i8> {
        &self.spins
    }

    pub fn set_spins(&mut self, spins: Lattice<i8>) {
        self.spins = spins;
    }

    /// Energy change of flipping the spin at (row, col) in isolation
    #[inline]
    fn flip_cost(&self, row: usize, col: usize) -> f64 {
        let neighbors: i32 = self
            .spins
            .von_neumann(row, col)
            .iter()
            .map(|s| *s as i32)
            .sum();
        2.0 * self.spins.get(row, col) as f64 * neighbors as f64
    }

    /// One exchange attempt; returns whether the two spins were swapped
    pub fn sub_step(&mut self, rng: &mut ChaCha8Rng) -> bool {
        let size = self.spins.size();
        let (r1, c1) = (rng.gen_range(0..size), rng.gen_range(0..size));
        let (r2, c2) = (rng.gen_range(0..size), rng.gen_range(0..size));

        let eligible = if self.strict {
            r1 != r2 && c1 != c2
        } else {
            (r1, c1) != (r2, c2)
        };
        let s1 = self.spins.get(r1, c1);
        let s2 = self.spins.get(r2, c2);
        if !eligible || s1 == s2 {
            return false;
        }

        self.attempted += 1;
        let first = metropolis(self.flip_cost(r1, c1), self.temperature, rng);
        let second = metropolis(self.flip_cost(r2, c2), self.temperature, rng);
        if first && second {
            self.spins.set(r1, c1, s2);
            self.spins.set(r2, c2, s1);
            self.exchanged += 1;
            true
        } else {
            false
        }
    }

    /// N² exchange attempts
    pub fn advance_sweep(&mut self, rng: &mut ChaCha8Rng) {
        let attempts = self.spins.size() * self.spins.size();
        for _ in 0..attempts {
            self.sub_step(rng);
        }
    }

    /// Σ(-neighbour-sum · spin) over every site
    pub fn total_energy(&self) -> f64 {
        self.spins
            .iter()
            .map(|(c, s)| {
                let neighbors: i32 = self
                    .spins
                    .von_neumann(c.row, c.col)
                    .iter()
                    .map(|n| *n as i32)
                    .sum();
                -(neighbors * s as i32) as f64
            })
            .sum()
    }

    pub fn magnetisation(&self) -> f64 {
        self.spins
            .cells()
            .iter()
            .map(|s| *s as i64)
            .sum::<i64>()
            .abs() as f64
    }

    /// Fraction of eligible attempts that ended in an exchange
    pub fn acceptance_ratio(&self) -> Option<f64> {
        (self.attempted > 0).then(|| self.exchanged as f64 / self.attempted as f64)
    }

    pub fn capture_statistics(&self, sweep: u64) -> StatisticsSample {
        StatisticsSample::new(
            sweep,
            COLUMNS,
            vec![sweep as f64, self.total_energy(), self.magnetisation()],
        )
    }
}
