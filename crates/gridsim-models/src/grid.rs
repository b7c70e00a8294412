//! Toroidal grids shared by every kernel.

use gridsim_core::{BoundaryIndex, Coord, Result};
use serde::{Deserialize, Serialize};

/// A 2D toroidal lattice stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice<T> {
    bounds: BoundaryIndex,
    cells: Vec<T>,
}

impl<T: Copy> Lattice<T> {
    pub fn new(size: usize, fill: T) -> Self {
        Self {
            bounds: BoundaryIndex::new(size),
            cells: vec![fill; size * size],
        }
    }

    /// Build a lattice by evaluating `f` at every coordinate in row-major order
    pub fn from_fn(size: usize, mut f: impl FnMut(Coord) -> T) -> Self {
        let mut cells = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                cells.push(f(Coord::new(row, col)));
            }
        }
        Self {
            bounds: BoundaryIndex::new(size),
            cells,
        }
    }

    pub fn size(&self) -> usize {
        self.bounds.size()
    }

    pub fn bounds(&self) -> &BoundaryIndex {
        &self.bounds
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.bounds.size() + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.cells[self.index(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        let index = self.index(row, col);
        self.cells[index] = value;
    }

    /// Up, down, left, right
    #[inline]
    pub fn von_neumann(&self, row: usize, col: usize) -> [T; 4] {
        let b = &self.bounds;
        [
            self.get(b.wrap_down(row), col),
            self.get(b.wrap_up(row), col),
            self.get(row, b.wrap_down(col)),
            self.get(row, b.wrap_up(col)),
        ]
    }

    /// The 8 surrounding cells
    #[inline]
    pub fn moore(&self, row: usize, col: usize) -> [T; 8] {
        let b = &self.bounds;
        let (up, down) = (b.wrap_down(row), b.wrap_up(row));
        let (left, right) = (b.wrap_down(col), b.wrap_up(col));
        [
            self.get(up, col),
            self.get(down, col),
            self.get(row, left),
            self.get(row, right),
            self.get(up, left),
            self.get(up, right),
            self.get(down, left),
            self.get(down, right),
        ]
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Iterator over all cells with coordinates
    pub fn iter(&self) -> impl Iterator<Item = (Coord, T)> + '_ {
        let size = self.bounds.size();
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, v)| (Coord::new(i / size, i % size), *v))
    }

    pub fn count(&self, value: T) -> usize
    where
        T: PartialEq,
    {
        self.cells.iter().filter(|v| **v == value).count()
    }

    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Lattice<U> {
        Lattice {
            bounds: self.bounds,
            cells: self.cells.iter().map(|v| f(*v)).collect(),
        }
    }
}

impl Lattice<f64> {
    pub fn sum(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Five-point Laplacian in index units: neighbour sum minus four times self
    #[inline]
    pub fn laplacian(&self, row: usize, col: usize) -> f64 {
        self.von_neumann(row, col).iter().sum::<f64>() - 4.0 * self.get(row, col)
    }

    /// Central-difference gradient (d/drow, d/dcol) with wrapped neighbours
    #[inline]
    pub fn gradient(&self, row: usize, col: usize, dx: f64) -> (f64, f64) {
        let [up, down, left, right] = self.von_neumann(row, col);
        ((down - up) / (2.0 * dx), (right - left) / (2.0 * dx))
    }
}

/// A 3D toroidal volume stored with the last axis fastest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    bounds: BoundaryIndex,
    cells: Vec<f64>,
}

impl Volume {
    pub fn new(size: usize) -> Self {
        Self {
            bounds: BoundaryIndex::new(size),
            cells: vec![0.0; size * size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.bounds.size()
    }

    #[inline]
    fn index(&self, i: usize, j: usize, k: usize) -> usize {
        let n = self.bounds.size();
        (i * n + j) * n + k
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.cells[self.index(i, j, k)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        let index = self.index(i, j, k);
        self.cells[index] = value;
    }

    /// Sum of the six face neighbours, wrapped
    #[inline]
    pub fn neighbor_sum(&self, i: usize, j: usize, k: usize) -> f64 {
        let b = &self.bounds;
        self.get(b.wrap_up(i), j, k)
            + self.get(b.wrap_down(i), j, k)
            + self.get(i, b.wrap_up(j), k)
            + self.get(i, b.wrap_down(j), k)
            + self.get(i, j, b.wrap_up(k))
            + self.get(i, j, b.wrap_down(k))
    }

    pub fn sum(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// True when any axis index sits on the first or last plane
    pub fn is_boundary(&self, i: usize, j: usize, k: usize) -> bool {
        let last = self.bounds.size() - 1;
        [i, j, k].iter().any(|&c| c == 0 || c == last)
    }

    /// The 2D slice at third-axis index `k`, indexed by (i, j)
    pub fn plane(&self, k: usize) -> Lattice<f64> {
        Lattice::from_fn(self.size(), |c| self.get(c.row, c.col, k))
    }

    pub fn copy_from(&mut self, other: &Volume) {
        self.cells.copy_from_slice(&other.cells);
    }
}

/// Primary grid plus the secondary buffer used by synchronous updates
#[derive(Debug, Clone)]
pub struct GridState<G> {
    current: G,
    next: G,
}

impl<G: Clone> GridState<G> {
    pub fn new(grid: G) -> Self {
        Self {
            next: grid.clone(),
            current: grid,
        }
    }

    pub fn current(&self) -> &G {
        &self.current
    }

    /// Read the current grid while writing the secondary buffer
    pub fn split(&mut self) -> (&G, &mut G) {
        (&self.current, &mut self.next)
    }

    /// Publish the secondary buffer as the current grid
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Replace both buffers, e.g. after re-initialisation
    pub fn reset(&mut self, grid: G) {
        self.next = grid.clone();
        self.current = grid;
    }
}

/// Serialisable copy of a finished grid for the visualisation collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GridSnapshot {
    Lattice(Lattice<f64>),
    Volume(Volume),
}

impl GridSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
