//! Optimization result types.

use std::collections::BTreeMap;
use std::fmt;

use dcplan_core::ModuleId;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    /// A limit was reached; the selection is feasible but not proven optimal.
    Feasible,
    Infeasible,
    Unbounded,
    /// A limit was reached before any feasible selection was found.
    NotSolved,
    /// The LP backend failed.
    Undefined,
    /// The specification was not solved; the reason is attached.
    Skipped(String),
}

impl SolveStatus {
    /// Whether `selected_modules_counts` carries a usable selection.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => f.write_str("Optimal"),
            SolveStatus::Feasible => f.write_str("Feasible"),
            SolveStatus::Infeasible => f.write_str("Infeasible"),
            SolveStatus::Unbounded => f.write_str("Unbounded"),
            SolveStatus::NotSolved => f.write_str("Not Solved"),
            SolveStatus::Undefined => f.write_str("Undefined"),
            SolveStatus::Skipped(reason) => write!(f, "Skipped - {reason}"),
        }
    }
}

impl Serialize for SolveStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Aggregate input/output of one unit across the selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourceTotals {
    pub input: f64,
    pub output: f64,
    /// Fixed contribution from pre-placed modules.
    pub initial: f64,
    /// `output - input + initial`.
    pub net: f64,
}

/// The optimizer's answer for one specification.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub spec_name: String,
    pub status: SolveStatus,
    /// Human-readable explanation of the status.
    pub message: String,
    pub objective_value: Option<f64>,
    /// Module id → instance count; only modules with a positive count.
    pub selected_modules_counts: BTreeMap<ModuleId, u64>,
    pub total_area_used: u64,
    pub resource_summary: BTreeMap<String, ResourceTotals>,
    pub constraint_verification: Vec<String>,
    /// Rules that were ignored or interpreted loosely while building the model.
    pub warnings: Vec<String>,
    pub area_minimized: bool,
    pub nodes_explored: u64,
    pub solve_time_seconds: f64,
}

impl OptimizationResult {
    pub(crate) fn skipped(spec_name: &str, reason: &str) -> Self {
        Self {
            spec_name: spec_name.to_string(),
            status: SolveStatus::Skipped(reason.to_string()),
            message: format!("skipped: {}", reason.to_lowercase()),
            objective_value: None,
            selected_modules_counts: BTreeMap::new(),
            total_area_used: 0,
            resource_summary: BTreeMap::new(),
            constraint_verification: Vec::new(),
            warnings: Vec::new(),
            area_minimized: false,
            nodes_explored: 0,
            solve_time_seconds: 0.0,
        }
    }

    pub fn total_instances(&self) -> u64 {
        self.selected_modules_counts.values().sum()
    }

    /// True when every verification line reports `OK`.
    pub fn all_checks_pass(&self) -> bool {
        self.constraint_verification
            .iter()
            .all(|line| !line.ends_with("(VIOLATED)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_display_string() {
        let json = serde_json::to_string(&SolveStatus::Skipped("No Rules".into())).unwrap();
        assert_eq!(json, "\"Skipped - No Rules\"");
        assert_eq!(SolveStatus::NotSolved.to_string(), "Not Solved");
    }

    #[test]
    fn skipped_result_is_empty() {
        let result = OptimizationResult::skipped("Empty", "No Modules");
        assert!(!result.status.has_solution());
        assert_eq!(result.total_instances(), 0);
        assert!(result.all_checks_pass());
        assert_eq!(result.message, "skipped: no modules");
    }
}
