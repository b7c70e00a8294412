//! Core type definitions for the simulation engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a single simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wraparound coordinate arithmetic on a torus of side `size`.
///
/// Every neighbour lookup in the engine goes through this type, so no cell
/// of a grid is ever treated as an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryIndex {
    size: usize,
}

impl BoundaryIndex {
    pub fn new(size: usize) -> Self {
        debug_assert!(size > 0, "torus size must be positive");
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// `c - 1`, or `size - 1` when `c` is the first index
    #[inline]
    pub fn wrap_down(&self, c: usize) -> usize {
        if c >= 1 {
            c - 1
        } else {
            self.size - 1
        }
    }

    /// `c + 1`, or `0` when `c` is the last index
    #[inline]
    pub fn wrap_up(&self, c: usize) -> usize {
        if c + 1 <= self.size - 1 {
            c + 1
        } else {
            0
        }
    }

    /// Wrap an arbitrary signed index onto the torus
    #[inline]
    pub fn wrap(&self, c: isize) -> usize {
        let n = self.size as isize;
        (((c % n) + n) % n) as usize
    }

    /// Shortest signed separation `to - from` on the torus (minimum image)
    pub fn displacement(&self, from: f64, to: f64) -> f64 {
        let n = self.size as f64;
        let mut d = to - from;
        if d > n / 2.0 {
            d -= n;
        } else if d < -n / 2.0 {
            d += n;
        }
        d
    }
}

/// 2D lattice coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Apply a signed offset with toroidal wrapping
    pub fn offset(&self, dr: isize, dc: isize, bounds: &BoundaryIndex) -> Self {
        Self {
            row: bounds.wrap(self.row as isize + dr),
            col: bounds.wrap(self.col as isize + dc),
        }
    }
}
