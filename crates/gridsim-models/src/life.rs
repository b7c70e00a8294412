//! Game of Life on a toroidal lattice.

use crate::grid::{GridState, Lattice};
use crate::patterns::{self, Pattern};
use gridsim_core::{Coord, Error, LifeConfig, Result, StatisticsSample};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Bernoulli, Distribution};
use tracing::debug;

pub const DEAD: u8 = 0;
pub const ALIVE: u8 = 1;

const CENTROID_COLUMNS: &[&str] = &["comX", "comY"];
const POPULATION_COLUMNS: &[&str] = &["sweep", "live"];

/// Conway's rule for one cell given its live Moore-neighbour count
#[inline]
pub fn next_state(cell: u8, live_neighbors: u8) -> u8 {
    match (cell, live_neighbors) {
        (ALIVE, 2) | (ALIVE, 3) => ALIVE,
        (DEAD, 3) => ALIVE,
        _ => DEAD,
    }
}

pub struct LifeKernel {
    state: GridState<Lattice<u8>>,
    live_probability: f64,
    pattern: Option<&'static Pattern>,
}

impl LifeKernel {
    pub fn new(size: usize, config: &LifeConfig) -> Result<Self> {
        let pattern = match config.pattern_name() {
            Some(name) => {
                let pattern = patterns::find(name).ok_or_else(|| {
                    Error::StructureNotFound(format!(
                        "{} (known: {})",
                        name,
                        patterns::names().collect::<Vec<_>>().join(", ")
                    ))
                })?;
                if pattern.height() > size || pattern.width() > size {
                    return Err(Error::config(format!(
                        "pattern {} ({}x{}) does not fit a {}x{} grid",
                        pattern.name,
                        pattern.height(),
                        pattern.width(),
                        size,
                        size
                    )));
                }
                Some(pattern)
            }
            None => None,
        };

        Ok(Self {
            state: GridState::new(Lattice::new(size, DEAD)),
            live_probability: config.live_probability,
            pattern,
        })
    }

    /// Random fill, or the configured pattern centred in an empty grid
    pub fn initialize(&mut self, rng: &mut ChaCha8Rng) -> Result<()> {
        let size = self.state.current().size();
        let lattice = match self.pattern {
            Some(pattern) => {
                let mut lattice = Lattice::new(size, DEAD);
                let top = (size - pattern.height()) / 2;
                let left = (size - pattern.width()) / 2;
                let origin = Coord::new(top, left);
                for (r, c) in pattern.live_cells() {
                    let cell = origin.offset(r as isize, c as isize, lattice.bounds());
                    lattice.set(cell.row, cell.col, ALIVE);
                }
                debug!(pattern = pattern.name, top, left, "Injected pattern");
                lattice
            }
            None => {
                let fill = Bernoulli::new(self.live_probability)
                    .map_err(|e| Error::config(format!("live_probability: {}", e)))?;
                Lattice::from_fn(size, |_| if fill.sample(rng) { ALIVE } else { DEAD })
            }
        };
        self.state.reset(lattice);
        Ok(())
    }

    /// One synchronous generation
    pub fn advance_sweep(&mut self) {
        let (current, next) = self.state.split();
        let size = current.size();
        for row in 0..size {
            for col in 0..size {
                let live = current.moore(row, col).iter().sum::<u8>();
                next.set(row, col, next_state(current.get(row, col), live));
            }
        }
        self.state.swap();
    }

    pub fn lattice(&self) -> &Lattice<u8> {
        self.state.current()
    }

    pub fn live_count(&self) -> usize {
        self.lattice().count(ALIVE)
    }

    pub fn tracks_glider(&self) -> bool {
        self.pattern.map_or(false, |p| p.name == "glider")
    }

    /// Mean row and mean column of the live cells, unwrapped around the first
    /// live cell so a pattern straddling the seam stays in one piece
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let lattice = self.lattice();
        let bounds = lattice.bounds();
        let mut live = lattice
            .iter()
            .filter(|(_, cell)| *cell == ALIVE)
            .map(|(coord, _)| coord);
        let anchor = live.next()?;
        let (row, col) = (anchor.row as f64, anchor.col as f64);

        let (mut rows, mut cols, mut n) = (0.0, 0.0, 1usize);
        for coord in live {
            rows += bounds.displacement(row, coord.row as f64);
            cols += bounds.displacement(col, coord.col as f64);
            n += 1;
        }
        let size = bounds.size() as f64;
        Some((
            (row + rows / n as f64).rem_euclid(size),
            (col + cols / n as f64).rem_euclid(size),
        ))
    }

    pub fn columns(&self) -> &'static [&'static str] {
        if self.tracks_glider() {
            CENTROID_COLUMNS
        } else {
            POPULATION_COLUMNS
        }
    }

    pub fn capture_statistics(&self, sweep: u64) -> StatisticsSample {
        if self.tracks_glider() {
            let (x, y) = self.centroid().unwrap_or((f64::NAN, f64::NAN));
            StatisticsSample::new(sweep, CENTROID_COLUMNS, vec![x, y])
        } else {
            StatisticsSample::new(
                sweep,
                POPULATION_COLUMNS,
                vec![sweep as f64, self.live_count() as f64],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn with_pattern(size: usize, name: &str) -> LifeKernel {
        let config = LifeConfig {
            pattern: Some(name.to_string()),
            ..Default::default()
        };
        let mut kernel = LifeKernel::new(size, &config).unwrap();
        kernel
            .initialize(&mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();
        kernel
    }

    #[test]
    fn test_rule_table() {
        assert_eq!(next_state(ALIVE, 1), DEAD);
        assert_eq!(next_state(ALIVE, 2), ALIVE);
        assert_eq!(next_state(ALIVE, 3), ALIVE);
        assert_eq!(next_state(ALIVE, 4), DEAD);
        assert_eq!(next_state(DEAD, 3), ALIVE);
        assert_eq!(next_state(DEAD, 2), DEAD);
    }

    #[test]
    fn test_blinker_period_two() {
        for size in [5, 6, 9, 20] {
            let mut kernel = with_pattern(size, "blinker");
            let start = kernel.lattice().clone();
            kernel.advance_sweep();
            assert_ne!(kernel.lattice(), &start, "blinker must change after one sweep");
            kernel.advance_sweep();
            assert_eq!(kernel.lattice(), &start, "blinker must return after two sweeps (N={})", size);
        }
    }

    #[test]
    fn test_block_is_still() {
        let mut kernel = with_pattern(8, "block");
        let start = kernel.lattice().clone();
        for _ in 0..25 {
            kernel.advance_sweep();
            assert_eq!(kernel.lattice(), &start);
        }
    }

    #[test]
    fn test_single_sweep_matches_rule() {
        let config = LifeConfig {
            live_probability: 0.5,
            pattern: None,
        };
        let mut kernel = LifeKernel::new(20, &config).unwrap();
        kernel
            .initialize(&mut ChaCha8Rng::seed_from_u64(11))
            .unwrap();
        let before = kernel.lattice().clone();
        kernel.advance_sweep();
        let after = kernel.lattice();

        for (coord, cell) in before.iter() {
            let live = before.moore(coord.row, coord.col).iter().sum::<u8>();
            assert_eq!(after.get(coord.row, coord.col), next_state(cell, live));
        }
    }

    #[test]
    fn test_glider_keeps_five_cells_and_moves() {
        let mut kernel = with_pattern(12, "glider");
        assert!(kernel.tracks_glider());
        let start = kernel.centroid().unwrap();
        for _ in 0..4 {
            kernel.advance_sweep();
            assert_eq!(kernel.live_count(), 5);
        }
        let end = kernel.centroid().unwrap();
        assert!((end.0 - start.0 - 1.0).abs() < 1e-12);
        assert!((end.1 - start.1 - 1.0).abs() < 1e-12);
        assert_eq!(kernel.capture_statistics(4).columns, &["comX", "comY"]);
    }

    #[test]
    fn test_centroid_across_seam() {
        let mut kernel = LifeKernel::new(10, &LifeConfig::default()).unwrap();
        let mut lattice = Lattice::new(10, DEAD);
        lattice.set(9, 3, ALIVE);
        lattice.set(0, 3, ALIVE);
        lattice.set(0, 4, ALIVE);
        kernel.state.reset(lattice);

        let (row, col) = kernel.centroid().unwrap();
        assert!((row - (10.0 - 1.0 / 3.0)).abs() < 1e-12, "row {}", row);
        assert!((col - (3.0 + 1.0 / 3.0)).abs() < 1e-12, "col {}", col);
    }

    #[test]
    fn test_centroid_of_empty_grid() {
        let config = LifeConfig {
            live_probability: 0.0,
            pattern: None,
        };
        let mut kernel = LifeKernel::new(6, &config).unwrap();
        kernel
            .initialize(&mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();
        assert!(kernel.centroid().is_none());
    }

    #[test]
    fn test_unknown_pattern() {
        let config = LifeConfig {
            pattern: Some("spaceship".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            LifeKernel::new(20, &config),
            Err(Error::StructureNotFound(_))
        ));
    }

    #[test]
    fn test_pattern_too_large() {
        let config = LifeConfig {
            pattern: Some("gun".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            LifeKernel::new(20, &config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_fill_probability_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut full = LifeKernel::new(
            10,
            &LifeConfig {
                live_probability: 1.0,
                pattern: None,
            },
        )
        .unwrap();
        full.initialize(&mut rng).unwrap();
        assert_eq!(full.live_count(), 100);

        let mut empty = LifeKernel::new(
            10,
            &LifeConfig {
                live_probability: 0.0,
                pattern: Some("none".to_string()),
            },
        )
        .unwrap();
        empty.initialize(&mut rng).unwrap();
        assert_eq!(empty.live_count(), 0);
        assert_eq!(empty.capture_statistics(0).values, vec![0.0, 0.0]);
    }
}
