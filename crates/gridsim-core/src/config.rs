//! Configuration types for simulation runs.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Immutable configuration of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParameters {
    /// Side length N of the (N×N or N×N×N) grid
    pub dimension: usize,
    /// Number of sweeps or timesteps; relaxation runs treat it as an iteration budget
    pub sweeps: u64,
    /// Random seed for reproducibility
    #[serde(default)]
    pub seed: u64,
    /// Statistics cadence and loop limits
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Model selection and model constants
    pub model: ModelConfig,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            dimension: 50,
            sweeps: 1_000,
            seed: 0,
            schedule: ScheduleConfig::default(),
            model: ModelConfig::Life(LifeConfig::default()),
        }
    }
}

impl RunParameters {
    /// Parse and validate parameters from JSON
    pub fn from_json(text: &str) -> Result<Self> {
        let params: RunParameters = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("invalid run parameters: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::config("dimension must be greater than zero"));
        }
        if self.schedule.sample_interval == 0 {
            return Err(Error::config("sample_interval must be greater than zero"));
        }
        self.model.validate(self.dimension)
    }

    /// Total number of cells in the grid (N² for lattices, N³ for volumes)
    pub fn cell_count(&self) -> usize {
        match self.model {
            ModelConfig::Poisson(_) => self.dimension.pow(3),
            _ => self.dimension.pow(2),
        }
    }
}

/// Statistics cadence and loop limits shared by all models
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Sweeps discarded before stochastic models start sampling
    pub equilibration_sweeps: u64,
    /// Sample every n-th sweep after equilibration
    pub sample_interval: u64,
    /// Hard cap on relaxation iterations regardless of `sweeps`
    pub max_iterations: u64,
    /// Log progress every n sweeps (0 disables)
    pub progress_interval: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            equilibration_sweeps: 100,
            sample_interval: 10,
            max_iterations: 100_000,
            progress_interval: 100,
        }
    }
}

/// Upper bound on the number of points one batch range may expand to
pub const MAX_RANGE_POINTS: usize = 1_000;

/// Inclusive, evenly spaced range of an outer batch parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl ParameterRange {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// A range holding exactly one value
    pub fn single(value: f64) -> Self {
        Self {
            start: value,
            end: value,
            step: 1.0,
        }
    }

    /// The values of the range, computed by index to avoid accumulated drift
    pub fn values(&self) -> Vec<f64> {
        (0..self.point_count())
            .map(|i| {
                let v = self.start + i as f64 * self.step;
                (v * 1e10).round() / 1e10
            })
            .collect()
    }

    /// Number of values in the range
    pub fn point_count(&self) -> usize {
        ((self.end - self.start) / self.step + 1e-9).floor() as usize + 1
    }

    fn validate(&self, name: &str, lower: f64, upper: f64) -> Result<()> {
        if !(self.step > 0.0) || !self.start.is_finite() || !self.end.is_finite() {
            return Err(Error::config(format!("{} range needs a positive step", name)));
        }
        if self.end < self.start {
            return Err(Error::config(format!("{} range is empty", name)));
        }
        if self.start < lower || self.end > upper {
            return Err(Error::config(format!(
                "{} range must lie within [{}, {}]",
                name, lower, upper
            )));
        }
        if (self.end - self.start) / self.step >= MAX_RANGE_POINTS as f64 {
            return Err(Error::config(format!(
                "{} range expands to more than {} points",
                name, MAX_RANGE_POINTS
            )));
        }
        Ok(())
    }
}

/// Model selection with model-specific constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    Life(LifeConfig),
    Kawasaki(KawasakiConfig),
    Sirs(SirsConfig),
    CahnHilliard(CahnHilliardConfig),
    Poisson(PoissonConfig),
    ReactionDiffusion(ReactionDiffusionConfig),
}

impl ModelConfig {
    pub fn validate(&self, dimension: usize) -> Result<()> {
        match self {
            ModelConfig::Life(c) => c.validate(),
            ModelConfig::Kawasaki(c) => c.validate(),
            ModelConfig::Sirs(c) => c.validate(),
            ModelConfig::CahnHilliard(c) => c.validate(),
            ModelConfig::Poisson(c) => c.validate(dimension),
            ModelConfig::ReactionDiffusion(c) => c.validate(),
        }
    }

    /// Whether this configuration drives an outer parameter sweep
    pub fn is_batch(&self) -> bool {
        match self {
            ModelConfig::Kawasaki(c) => c.mode == KawasakiMode::Ladder,
            ModelConfig::Sirs(c) => c.mode != SirsMode::Single,
            _ => false,
        }
    }
}

fn check_probability(name: &str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(Error::config(format!(
            "{} must be a probability in [0, 1], got {}",
            name, p
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(Error::config(format!("{} must be positive, got {}", name, value)));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !(value >= 0.0) || !value.is_finite() {
        return Err(Error::config(format!(
            "{} must be non-negative, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Treats a missing name and the literal "none" the same way
fn named_option(name: &Option<String>) -> Option<&str> {
    name.as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case("none"))
}

/// Game of Life configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeConfig {
    /// Probability that a cell starts alive in a random fill
    pub live_probability: f64,
    /// Named pattern injected into an empty grid instead of a random fill
    pub pattern: Option<String>,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            live_probability: 0.5,
            pattern: None,
        }
    }
}

impl LifeConfig {
    pub fn pattern_name(&self) -> Option<&str> {
        named_option(&self.pattern)
    }

    fn validate(&self) -> Result<()> {
        check_probability("live_probability", self.live_probability)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KawasakiMode {
    /// One temperature, per-sample rows
    Single,
    /// Temperature ladder, one averaged row per temperature
    Ladder,
}

/// Kawasaki spin-exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KawasakiConfig {
    /// Temperature for single runs
    pub temperature: f64,
    pub mode: KawasakiMode,
    /// Temperatures visited in ladder mode
    pub ladder: ParameterRange,
    /// Only exchange pairs that differ in both row and column
    pub strict_pair_selection: bool,
}

impl Default for KawasakiConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            mode: KawasakiMode::Single,
            ladder: ParameterRange::new(1.0, 3.0, 0.1),
            strict_pair_selection: true,
        }
    }
}

impl KawasakiConfig {
    fn validate(&self) -> Result<()> {
        match self.mode {
            KawasakiMode::Single => check_positive("temperature", self.temperature),
            KawasakiMode::Ladder => {
                check_positive("ladder start temperature", self.ladder.start)?;
                self.ladder.validate("temperature", f64::MIN_POSITIVE, f64::MAX)
            }
        }
    }
}

/// Named SIRS regimes with fixed, empirically tuned probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SirsRegime {
    Absorbing,
    Dynamic,
    Cyclic,
    Half,
}

impl SirsRegime {
    /// (p1, p2, p3): infection, recovery, loss of immunity
    pub fn probabilities(&self) -> [f64; 3] {
        match self {
            SirsRegime::Absorbing => [0.4, 1.0, 1.0],
            SirsRegime::Dynamic => [0.0, 1.0, 0.0],
            SirsRegime::Cyclic => [0.8, 0.1, 0.01],
            SirsRegime::Half => [0.5, 0.5, 0.5],
        }
    }
}

impl FromStr for SirsRegime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absorbing" => Ok(SirsRegime::Absorbing),
            "dynamic" => Ok(SirsRegime::Dynamic),
            "cyclic" => Ok(SirsRegime::Cyclic),
            "half" => Ok(SirsRegime::Half),
            other => Err(Error::config(format!("unsupported SIRS regime: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SirsMode {
    /// One probability triple, per-sample infected fraction
    Single,
    /// p1 × p3 grid, mean infected fraction
    Phase,
    /// p1 × p3 grid, variance of the infected count
    Variance,
    /// Immune fraction sweep, mean and deviation of infected fraction
    Immunity,
}

/// SIRS epidemic configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SirsConfig {
    pub mode: SirsMode,
    /// Explicit (p1, p2, p3)
    pub probabilities: Option<[f64; 3]>,
    /// Named regime, takes precedence over explicit probabilities
    pub regime: Option<String>,
    /// Recovery probability held fixed in the grid modes
    pub fixed_p2: f64,
    /// Axis used for both p1 and p3 in the grid modes (mode default when absent)
    pub grid: Option<ParameterRange>,
    /// Immune fractions visited in immunity mode
    pub immune_range: ParameterRange,
    /// Fraction of permanently immune cells in single runs
    pub immune_fraction: f64,
}

impl Default for SirsConfig {
    fn default() -> Self {
        Self {
            mode: SirsMode::Single,
            probabilities: None,
            regime: None,
            fixed_p2: 0.5,
            grid: None,
            immune_range: ParameterRange::new(0.0, 1.0, 0.01),
            immune_fraction: 0.0,
        }
    }
}

impl SirsConfig {
    /// Resolve the (p1, p2, p3) triple for a single run
    pub fn resolve_probabilities(&self) -> Result<[f64; 3]> {
        if let Some(name) = named_option(&self.regime) {
            return Ok(name.parse::<SirsRegime>()?.probabilities());
        }
        Ok(self.probabilities.unwrap_or([1.0, 1.0, 1.0]))
    }

    /// Probability axis for the grid modes
    pub fn grid_range(&self) -> ParameterRange {
        match (self.grid, self.mode) {
            (Some(range), _) => range,
            (None, SirsMode::Variance) => ParameterRange::new(0.2, 0.5, 0.02),
            (None, _) => ParameterRange::new(0.0, 1.0, 0.05),
        }
    }

    fn validate(&self) -> Result<()> {
        let [p1, p2, p3] = self.resolve_probabilities()?;
        check_probability("p1", p1)?;
        check_probability("p2", p2)?;
        check_probability("p3", p3)?;
        check_probability("fixed_p2", self.fixed_p2)?;
        check_probability("immune_fraction", self.immune_fraction)?;
        self.grid_range().validate("probability", 0.0, 1.0)?;
        self.immune_range.validate("immune fraction", 0.0, 1.0)
    }
}

/// Cahn-Hilliard phase-field configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CahnHilliardConfig {
    pub dx: f64,
    pub dt: f64,
    /// Mobility M
    pub mobility: f64,
    pub a: f64,
    pub b: f64,
    /// Gradient energy coefficient k
    pub kappa: f64,
    /// Baseline concentration
    pub phi0: f64,
    /// Standard deviation of the initial noise
    pub noise: f64,
}

impl Default for CahnHilliardConfig {
    fn default() -> Self {
        Self {
            dx: 1.0,
            dt: 1.0,
            mobility: 0.1,
            a: 0.1,
            b: 0.1,
            kappa: 0.1,
            phi0: 0.0,
            noise: 0.1,
        }
    }
}

impl CahnHilliardConfig {
    fn validate(&self) -> Result<()> {
        check_positive("dx", self.dx)?;
        check_positive("dt", self.dt)?;
        check_non_negative("mobility", self.mobility)?;
        check_non_negative("kappa", self.kappa)?;
        check_non_negative("noise", self.noise)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxationMethod {
    Jacobi,
    GaussSeidel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Unit charge at the centre of the volume
    Point,
    /// Unit line charge through the centre along the third axis
    Line,
    /// Two parallel unit current lines along the third axis
    CurrentPair,
}

/// Poisson relaxation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoissonConfig {
    pub method: RelaxationMethod,
    pub source: SourceKind,
    pub dx: f64,
    /// Relative convergence limit on the grid sum
    pub limit: f64,
    /// Stencil weight of the in-place update (1/6 is the consistent discretisation)
    pub gauss_seidel_weight: f64,
}

impl Default for PoissonConfig {
    fn default() -> Self {
        Self {
            method: RelaxationMethod::Jacobi,
            source: SourceKind::Point,
            dx: 1.0,
            limit: 1e-4,
            gauss_seidel_weight: 1.0 / 6.0,
        }
    }
}

impl PoissonConfig {
    fn validate(&self, dimension: usize) -> Result<()> {
        if dimension < 3 {
            return Err(Error::config(
                "relaxation needs dimension >= 3 to have interior cells",
            ));
        }
        check_positive("dx", self.dx)?;
        check_positive("limit", self.limit)?;
        check_positive("gauss_seidel_weight", self.gauss_seidel_weight)?;
        if self.method == RelaxationMethod::GaussSeidel && self.gauss_seidel_weight > 1.0 / 6.0 {
            warn!(
                weight = self.gauss_seidel_weight,
                "Gauss-Seidel weight above 1/6 does not converge; expect a convergence failure"
            );
        }
        Ok(())
    }
}

/// Reaction-diffusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionDiffusionConfig {
    pub dx: f64,
    pub dt: f64,
    /// Diffusion coefficient D
    pub diffusion: f64,
    /// Linear decay rate
    pub kappa: f64,
    /// Width of the Gaussian source
    pub sigma: f64,
    /// Initial mean concentration
    pub baseline: f64,
    /// Half-width of the uniform initial noise
    pub noise: f64,
}

impl Default for ReactionDiffusionConfig {
    fn default() -> Self {
        Self {
            dx: 1.0,
            dt: 0.1,
            diffusion: 1.0,
            kappa: 0.1,
            sigma: 10.0,
            baseline: 0.5,
            noise: 0.1,
        }
    }
}

impl ReactionDiffusionConfig {
    fn validate(&self) -> Result<()> {
        check_positive("dx", self.dx)?;
        check_positive("dt", self.dt)?;
        check_positive("sigma", self.sigma)?;
        check_non_negative("diffusion", self.diffusion)?;
        check_non_negative("kappa", self.kappa)?;
        check_non_negative("noise", self.noise)?;
        if self.dt * self.diffusion / (self.dx * self.dx) > 0.25 {
            warn!(
                dt = self.dt,
                diffusion = self.diffusion,
                dx = self.dx,
                "explicit diffusion step exceeds the stability bound dt*D/dx^2 <= 1/4"
            );
        }
        Ok(())
    }
}

/// Runner configuration, filled from the environment by the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory receiving records, snapshots and cross-sections
    pub data_dir: String,
    /// Default log filter when RUST_LOG is unset
    pub log_filter: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            log_filter: "info,gridsim_models=debug".to_string(),
            json_logs: false,
        }
    }
}
