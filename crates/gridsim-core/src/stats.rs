//! Statistics samples and their aggregation.

use crate::types::BoundaryIndex;
use serde::Serialize;
use std::collections::BTreeMap;

/// A row of derived scalars captured after one sweep
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsSample {
    /// Sweep index (zero based) after which the sample was taken
    pub sweep: u64,
    pub columns: &'static [&'static str],
    pub values: Vec<f64>,
}

impl StatisticsSample {
    pub fn new(sweep: u64, columns: &'static [&'static str], values: Vec<f64>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self {
            sweep,
            columns,
            values,
        }
    }

    /// Look up a value by column name
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .map(|i| self.values[i])
    }
}

/// Running mean and variance of one scalar series (Welford's update)
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeriesAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
}

impl SeriesAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population variance `<x²> - <x>²`
    pub fn variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

/// Accumulates named scalar series for one value of the controlling parameter
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatisticsAggregator {
    series: BTreeMap<&'static str, SeriesAccumulator>,
    samples: u64,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a StatisticsSample>) -> Self {
        let mut aggregator = Self::new();
        for sample in samples {
            aggregator.observe(sample);
        }
        aggregator
    }

    /// Fold every column of a sample into its series
    pub fn observe(&mut self, sample: &StatisticsSample) {
        for (column, value) in sample.columns.iter().zip(&sample.values) {
            self.series.entry(*column).or_default().push(*value);
        }
        self.samples += 1;
    }

    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    /// True when nothing was sampled, e.g. the run was shorter than the equilibration skip
    pub fn is_degenerate(&self) -> bool {
        self.samples == 0
    }

    pub fn series(&self, column: &str) -> Option<&SeriesAccumulator> {
        self.series.get(column)
    }

    pub fn mean(&self, column: &str) -> Option<f64> {
        self.series(column).and_then(SeriesAccumulator::mean)
    }

    pub fn variance(&self, column: &str) -> Option<f64> {
        self.series(column).and_then(SeriesAccumulator::variance)
    }

    pub fn std_dev(&self, column: &str) -> Option<f64> {
        self.series(column).and_then(SeriesAccumulator::std_dev)
    }
}

/// Mean Euclidean displacement between consecutive centroids, using the
/// minimum image so a glider crossing the seam does not register a jump
pub fn glider_speed(centroids: &[(f64, f64)], bounds: &BoundaryIndex) -> Option<f64> {
    if centroids.len() < 2 {
        return None;
    }
    let mut total = SeriesAccumulator::new();
    for pair in centroids.windows(2) {
        let dx = bounds.displacement(pair[0].0, pair[1].0);
        let dy = bounds.displacement(pair[0].1, pair[1].1);
        total.push(dx.hypot(dy));
    }
    total.mean()
}
