//! dcplan.toml configuration parser.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::resource::TOTAL_AREA;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub solver: SolverConfig,
    pub objective_weights: ObjectiveWeights,
    pub placement: PlacementConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget for the integer search, checked between search nodes.
    pub time_limit_secs: f64,
    /// Upper bound on explored branch-and-bound nodes.
    pub max_nodes: u64,
    /// Distance from the nearest integer below which a value counts as integral.
    pub integrality_tolerance: f64,
}

/// Default solver wall-clock limit.
pub const DEFAULT_TIME_LIMIT_SECS: f64 = 60.0;

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            max_nodes: 100_000,
            integrality_tolerance: 1e-6,
        }
    }
}

impl SolverConfig {
    /// The wall-clock budget as a [`Duration`].
    ///
    /// Negative or NaN limits give [`Duration::ZERO`]; limits too large to
    /// represent (including infinity) give [`Duration::MAX`].
    pub fn time_limit(&self) -> Duration {
        if self.time_limit_secs.is_nan() || self.time_limit_secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.time_limit_secs).unwrap_or(Duration::MAX)
    }
}

/// Relative weight of each objective term, keyed by unit.
///
/// Units missing from the table weigh 1.0. Tables read from TOML are
/// overlaid on the defaults rather than replacing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct ObjectiveWeights {
    weights: BTreeMap<String, f64>,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        let weights = [
            ("data_storage", 0.5),
            ("processing", 1.0),
            ("external_network", 1.0),
            ("price", 0.1),
            (TOTAL_AREA, 1.0),
        ]
        .into_iter()
        .map(|(unit, weight)| (unit.to_string(), weight))
        .collect();
        Self { weights }
    }
}

impl ObjectiveWeights {
    /// A table with no entries: every unit weighs 1.0.
    pub fn uniform() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    pub fn get(&self, unit: &str) -> f64 {
        self.weights.get(unit).copied().unwrap_or(1.0)
    }

    pub fn with(mut self, unit: &str, weight: f64) -> Self {
        self.weights.insert(unit.to_string(), weight);
        self
    }
}

impl From<BTreeMap<String, f64>> for ObjectiveWeights {
    fn from(overrides: BTreeMap<String, f64>) -> Self {
        let mut weights = ObjectiveWeights::default();
        weights.weights.extend(overrides);
        weights
    }
}

impl From<ObjectiveWeights> for BTreeMap<String, f64> {
    fn from(weights: ObjectiveWeights) -> Self {
        weights.weights
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub compactness_weight: f64,
    pub connectivity_weight: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            compactness_weight: 0.7,
            connectivity_weight: 0.3,
        }
    }
}

impl PlannerConfig {
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot drive a solve.
    pub fn validate(&self) -> CoreResult<()> {
        let time_limit = self.solver.time_limit_secs;
        if !time_limit.is_finite() || time_limit < 0.0 {
            return Err(CoreError::invalid(
                "solver.time_limit_secs",
                format!("must be a finite number of seconds >= 0, got {time_limit}"),
            ));
        }
        let tolerance = self.solver.integrality_tolerance;
        if !(0.0..0.5).contains(&tolerance) {
            return Err(CoreError::invalid(
                "solver.integrality_tolerance",
                format!("must lie in [0, 0.5), got {tolerance}"),
            ));
        }
        for (field, weight) in [
            ("placement.compactness_weight", self.placement.compactness_weight),
            ("placement.connectivity_weight", self.placement.connectivity_weight),
        ] {
            if !weight.is_finite() {
                return Err(CoreError::invalid(field, format!("must be finite, got {weight}")));
            }
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
