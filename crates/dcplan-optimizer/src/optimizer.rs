//! Per-specification solve: formulate, search, extract and verify.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use dcplan_core::resource::INTERNAL_RESOURCES;
use dcplan_core::{
    ModuleCatalog, ModuleDefinition, ModuleId, ObjectiveWeights, PlannerConfig, ResourceKind,
    SolverConfig, Specification,
};
use tracing::{info, warn};

use crate::milp::{SearchStatus, branch_and_bound};
use crate::model::{Check, Formulation, Sense, Side, formulate};
use crate::result::{OptimizationResult, ResourceTotals, SolveStatus};

/// Absolute tolerance used when re-checking limits on the final totals.
pub const VERIFY_TOLERANCE: f64 = 1e-6;

/// Inputs to [`solve`] beyond the catalog and the specification.
#[derive(Debug, Clone, Default)]
pub struct SolveSettings {
    pub weights: ObjectiveWeights,
    pub solver: SolverConfig,
    /// Fixed per-unit net amounts from modules that are already in place.
    pub initial_resources: BTreeMap<String, f64>,
}

impl SolveSettings {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            weights: config.objective_weights.clone(),
            solver: config.solver.clone(),
            initial_resources: BTreeMap::new(),
        }
    }

    pub fn with_initial_resources(mut self, initial_resources: BTreeMap<String, f64>) -> Self {
        self.initial_resources = initial_resources;
        self
    }
}

/// Net per-unit contribution of fixed modules given as `(module, count)`
/// pairs (`Σ count·(outputs - inputs)`).
pub fn initial_resources_from_modules<'a>(
    modules: impl IntoIterator<Item = (&'a ModuleDefinition, u64)>,
) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for (module, count) in modules {
        let count = count as f64;
        for (unit, amount) in &module.outputs {
            *totals.entry(unit.clone()).or_default() += amount * count;
        }
        for (unit, amount) in &module.inputs {
            *totals.entry(unit.clone()).or_default() -= amount * count;
        }
    }
    totals
}

/// Choose instance counts for `spec` over `catalog`.
///
/// Never fails: every outcome, including skipped inputs and solver trouble,
/// is reported through the result's status and message.
pub fn solve(
    catalog: &ModuleCatalog,
    spec: &Specification,
    area_limit: Option<u64>,
    settings: &SolveSettings,
) -> OptimizationResult {
    let started = Instant::now();

    if spec.rules.is_empty() {
        warn!(spec = %spec.name, "specification has no rules, skipped");
        return OptimizationResult::skipped(&spec.name, "No Rules");
    }
    if catalog.is_empty() {
        warn!(spec = %spec.name, "module catalog is empty, skipped");
        return OptimizationResult::skipped(&spec.name, "No Modules");
    }

    let formulation = formulate(
        catalog,
        spec,
        area_limit,
        &settings.weights,
        &settings.initial_resources,
    );
    let outcome = branch_and_bound(&formulation.model, &settings.solver);

    let status = match &outcome.status {
        SearchStatus::Optimal => SolveStatus::Optimal,
        SearchStatus::Feasible => SolveStatus::Feasible,
        SearchStatus::LimitReached => SolveStatus::NotSolved,
        SearchStatus::Infeasible => SolveStatus::Infeasible,
        SearchStatus::Unbounded => SolveStatus::Unbounded,
        SearchStatus::Failed(_) => SolveStatus::Undefined,
    };

    let mut result = OptimizationResult {
        spec_name: spec.name.clone(),
        message: status_message(&outcome.status, outcome.nodes),
        status,
        objective_value: None,
        selected_modules_counts: BTreeMap::new(),
        total_area_used: 0,
        resource_summary: BTreeMap::new(),
        constraint_verification: Vec::new(),
        warnings: formulation.warnings.clone(),
        area_minimized: formulation.area_minimized,
        nodes_explored: outcome.nodes,
        solve_time_seconds: 0.0,
    };

    if result.status.has_solution() {
        if let Some(values) = &outcome.values {
            let counts = selected_counts(&formulation.model.columns, values);
            result.objective_value = Some(formulation.model.evaluate(values));
            result.total_area_used = counts
                .iter()
                .filter_map(|(id, count)| catalog.get(*id).map(|m| m.area * count))
                .sum();
            result.resource_summary =
                summarize_resources(catalog, &counts, spec, &settings.initial_resources);
            result.constraint_verification =
                verify(&formulation, &result.resource_summary, result.total_area_used);
            result.selected_modules_counts = counts;
        }
    }

    result.solve_time_seconds = started.elapsed().as_secs_f64();
    info!(
        spec = %result.spec_name,
        status = %result.status,
        objective = result.objective_value,
        instances = result.total_instances(),
        area = result.total_area_used,
        nodes = result.nodes_explored,
        "specification solved"
    );
    result
}

/// Solve every specification in order, each with its own area limit.
pub fn solve_all(
    catalog: &ModuleCatalog,
    specs: &[Specification],
    settings: &SolveSettings,
) -> Vec<OptimizationResult> {
    specs
        .iter()
        .map(|spec| solve(catalog, spec, spec.area_limit(), settings))
        .collect()
}

fn status_message(status: &SearchStatus, nodes: u64) -> String {
    match status {
        SearchStatus::Optimal => format!("optimal selection found after {nodes} search nodes"),
        SearchStatus::Feasible => format!(
            "search limit reached after {nodes} nodes; best selection found is not proven optimal"
        ),
        SearchStatus::LimitReached => {
            format!("search limit reached after {nodes} nodes before any feasible selection was found")
        }
        SearchStatus::Infeasible => "no module combination satisfies all hard constraints".to_string(),
        SearchStatus::Unbounded => {
            "objective is unbounded; add Below/Above limits on the maximized units".to_string()
        }
        SearchStatus::Failed(message) => format!("LP backend failed: {message}"),
    }
}

fn selected_counts(columns: &[ModuleId], values: &[f64]) -> BTreeMap<ModuleId, u64> {
    columns
        .iter()
        .zip(values)
        .filter(|(_, value)| **value > 0.5)
        .map(|(id, value)| (*id, value.round() as u64))
        .collect()
}

/// Totals for every unit that is selected, named by the specification,
/// internal, or seeded by initial resources. Dimension units are excluded.
fn summarize_resources(
    catalog: &ModuleCatalog,
    counts: &BTreeMap<ModuleId, u64>,
    spec: &Specification,
    initial_resources: &BTreeMap<String, f64>,
) -> BTreeMap<String, ResourceTotals> {
    let mut units: BTreeSet<String> = BTreeSet::new();
    for id in counts.keys() {
        if let Some(module) = catalog.get(*id) {
            units.extend(module.inputs.keys().cloned());
            units.extend(module.outputs.keys().cloned());
        }
    }
    units.extend(spec.rules.iter().map(|rule| rule.unit.clone()));
    units.extend(INTERNAL_RESOURCES.iter().map(|unit| unit.to_string()));
    units.extend(initial_resources.keys().cloned());
    units.retain(|unit| ResourceKind::classify(unit) != ResourceKind::Dimension);

    units
        .into_iter()
        .map(|unit| {
            let mut totals = ResourceTotals {
                initial: initial_resources.get(&unit).copied().unwrap_or(0.0),
                ..ResourceTotals::default()
            };
            for (id, count) in counts {
                if let Some(module) = catalog.get(*id) {
                    totals.input += module.input(&unit) * *count as f64;
                    totals.output += module.output(&unit) * *count as f64;
                }
            }
            totals.net = totals.output - totals.input + totals.initial;
            (unit, totals)
        })
        .collect()
}

fn verdict(ok: bool) -> &'static str {
    if ok { "OK" } else { "VIOLATED" }
}

fn verify(
    formulation: &Formulation,
    summary: &BTreeMap<String, ResourceTotals>,
    area_used: u64,
) -> Vec<String> {
    formulation
        .checks
        .iter()
        .map(|check| match check {
            Check::Area { limit } => {
                let ok = area_used <= *limit;
                format!(
                    "{:<15} {:<15}: Actual={:>10.2} <= Limit={:>10.2} ({})",
                    "Area",
                    "Total Area",
                    area_used as f64,
                    *limit as f64,
                    verdict(ok)
                )
            }
            Check::AreaMinimized { weight } => format!(
                "{:<15} {:<15}: Actual={:>10.2} (minimized in objective, weight {weight})",
                "Area", "Total Area", area_used as f64
            ),
            Check::Bound {
                kind,
                unit,
                side,
                sense,
                limit,
            } => {
                let totals = summary.get(unit).copied().unwrap_or_default();
                let actual = match side {
                    Side::Input => totals.input,
                    Side::Output => totals.output,
                };
                let ok = sense.holds(actual, *limit, VERIFY_TOLERANCE);
                let direction = match sense {
                    Sense::AtMost => "Below",
                    Sense::AtLeast => "Above",
                };
                let label = match (kind, side) {
                    (ResourceKind::Unknown, Side::Input) => format!("{direction} (UNK In)"),
                    (ResourceKind::Unknown, Side::Output) => format!("{direction} (UNK Out)"),
                    (_, Side::Input) => format!("{direction} Input"),
                    (_, Side::Output) => format!("{direction} Output"),
                };
                format!(
                    "{label:<15} {unit:<15}: Actual={actual:>10.2} {} Limit={limit:>10.2} ({})",
                    sense.symbol(),
                    verdict(ok)
                )
            }
            Check::InternalNet { unit } => {
                let net = summary.get(unit).map(|t| t.net).unwrap_or(0.0);
                let ok = net >= -VERIFY_TOLERANCE;
                format!(
                    "{:<15} {unit:<15}: Actual={net:>10.2} >= Limit={:>10.2} ({})",
                    "Internal Net",
                    0.0,
                    verdict(ok)
                )
            }
        })
        .collect()
}
