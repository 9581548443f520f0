//! Linear model construction.
//!
//! Turns a catalog, a specification and the objective weights into a
//! [`LinearModel`]: one non-negative integer column per module (its instance
//! count), a maximized objective and a list of `≤`/`≥` rows. The rules that
//! produced each row are kept as [`Check`]s so the result can be verified
//! against the same limits after solving.

use std::collections::{BTreeMap, BTreeSet};

use dcplan_core::resource::{INTERNAL_RESOURCES, TOTAL_AREA};
use dcplan_core::{
    AreaMode, ModuleCatalog, ModuleDefinition, ModuleId, ObjectiveWeights, ResourceKind,
    Specification,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    AtMost,
    AtLeast,
}

impl Sense {
    pub fn symbol(&self) -> &'static str {
        match self {
            Sense::AtMost => "<=",
            Sense::AtLeast => ">=",
        }
    }

    pub fn holds(&self, activity: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Sense::AtMost => activity <= rhs + tolerance,
            Sense::AtLeast => activity >= rhs - tolerance,
        }
    }
}

/// `Σ coefficients[j] · x[j]  (≤ | ≥)  rhs`
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub name: String,
    pub coefficients: Vec<f64>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn activity(&self, values: &[f64]) -> f64 {
        dot(&self.coefficients, values)
    }

    /// Rows whose coefficients are all zero reduce to `0 (≤|≥) rhs`.
    pub fn is_constant(&self) -> bool {
        self.coefficients.iter().all(|c| *c == 0.0)
    }
}

/// Maximize `objective · x + objective_constant` over non-negative integer `x`.
#[derive(Debug, Clone, Default)]
pub struct LinearModel {
    /// Module id of each column.
    pub columns: Vec<ModuleId>,
    pub objective: Vec<f64>,
    pub objective_constant: f64,
    pub constraints: Vec<LinearConstraint>,
}

impl LinearModel {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        dot(&self.objective, values) + self.objective_constant
    }

    /// True when the objective carries no term at all.
    pub fn has_dummy_objective(&self) -> bool {
        self.objective.iter().all(|c| *c == 0.0)
    }
}

fn dot(coefficients: &[f64], values: &[f64]) -> f64 {
    coefficients.iter().zip(values).map(|(c, v)| c * v).sum()
}

/// Which per-module totals a bound is written over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
}

/// A limit to re-check against the final totals.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Area { limit: u64 },
    AreaMinimized { weight: f64 },
    Bound {
        kind: ResourceKind,
        unit: String,
        side: Side,
        sense: Sense,
        limit: f64,
    },
    InternalNet { unit: String },
}

/// One signed, weighted net-resource term of the objective.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveTerm {
    pub unit: String,
    /// `+weight` to maximize, `-weight` to minimize.
    pub coefficient: f64,
}

/// Everything derived from one specification before solving.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub model: LinearModel,
    pub terms: Vec<ObjectiveTerm>,
    pub checks: Vec<Check>,
    pub area_minimized: bool,
    /// Rules that were ignored or interpreted loosely.
    pub warnings: Vec<String>,
}

impl Formulation {
    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Build the model for one specification.
///
/// `area_limit` of `None` leaves total area unconstrained; `Some(n)` bounds it
/// by `n` unless the specification minimizes area instead.
/// `initial_resources` are fixed per-unit net amounts (pre-placed modules);
/// they shift internal balances and objective values but add no columns.
pub fn formulate(
    catalog: &ModuleCatalog,
    spec: &Specification,
    area_limit: Option<u64>,
    weights: &ObjectiveWeights,
    initial_resources: &BTreeMap<String, f64>,
) -> Formulation {
    let columns: Vec<ModuleId> = catalog.ids().collect();
    let mut formulation = Formulation {
        model: LinearModel {
            objective: vec![0.0; columns.len()],
            columns,
            ..LinearModel::default()
        },
        terms: Vec::new(),
        checks: Vec::new(),
        area_minimized: spec.area_mode == AreaMode::Minimized,
        warnings: Vec::new(),
    };

    add_objective_terms(&mut formulation, catalog, spec, weights, initial_resources);
    add_area(&mut formulation, catalog, area_limit, weights);
    add_rule_bounds(&mut formulation, catalog, spec);
    add_internal_balances(&mut formulation, catalog, initial_resources);

    if formulation.model.has_dummy_objective() {
        info!(spec = %spec.name, "no objective terms, searching for any feasible selection");
    }
    debug!(
        spec = %spec.name,
        columns = formulation.model.width(),
        rows = formulation.model.constraints.len(),
        terms = formulation.terms.len(),
        "model formulated"
    );
    formulation
}

fn column_values(catalog: &ModuleCatalog, per_module: impl Fn(&ModuleDefinition) -> f64) -> Vec<f64> {
    catalog.iter().map(per_module).collect()
}

fn add_objective_terms(
    formulation: &mut Formulation,
    catalog: &ModuleCatalog,
    spec: &Specification,
    weights: &ObjectiveWeights,
    initial_resources: &BTreeMap<String, f64>,
) {
    for rule in &spec.rules {
        let kind = rule.kind();
        if kind == ResourceKind::Dimension {
            continue;
        }
        for (wanted, sign) in [(rule.minimize, -1.0), (rule.maximize, 1.0)] {
            if !wanted {
                continue;
            }
            let verb = if sign > 0.0 { "Maximize" } else { "Minimize" };
            match (kind, sign > 0.0) {
                (ResourceKind::Input, true) | (ResourceKind::Output, false) => {
                    formulation.warn(format!(
                        "spec '{}': {verb} on {} resource '{}' ignored",
                        spec.name,
                        kind.label(),
                        rule.unit
                    ));
                    continue;
                }
                (ResourceKind::Internal, _) => {
                    formulation.warn(format!(
                        "spec '{}': {verb} on internal resource '{}' ignored, internal resources are balanced, not optimized",
                        spec.name, rule.unit
                    ));
                    continue;
                }
                (ResourceKind::Unknown, _) => {
                    formulation.warn(format!(
                        "spec '{}': {verb} on unknown unit '{}' applied to its net amount",
                        spec.name, rule.unit
                    ));
                }
                _ => {}
            }

            // Inputs are measured by what is consumed, everything else by net output.
            let orientation = if kind == ResourceKind::Input { -1.0 } else { 1.0 };
            let coefficient = sign * weights.get(&rule.unit);
            let nets = column_values(catalog, |m| orientation * m.net(&rule.unit));
            for (slot, net) in formulation.model.objective.iter_mut().zip(nets) {
                *slot += coefficient * net;
            }
            formulation.model.objective_constant += coefficient
                * orientation
                * initial_resources.get(&rule.unit).copied().unwrap_or(0.0);
            formulation.terms.push(ObjectiveTerm {
                unit: rule.unit.clone(),
                coefficient,
            });
        }
    }
}

fn add_area(
    formulation: &mut Formulation,
    catalog: &ModuleCatalog,
    area_limit: Option<u64>,
    weights: &ObjectiveWeights,
) {
    let areas = column_values(catalog, |m| m.area as f64);

    if formulation.area_minimized {
        let weight = weights.get(TOTAL_AREA);
        for (slot, area) in formulation.model.objective.iter_mut().zip(&areas) {
            *slot -= weight * area;
        }
        formulation.terms.push(ObjectiveTerm {
            unit: TOTAL_AREA.to_string(),
            coefficient: -weight,
        });
        formulation.checks.push(Check::AreaMinimized { weight });
        if let Some(limit) = area_limit {
            debug!(limit, "area minimized in objective, dimension limit not enforced");
        }
        return;
    }

    if let Some(limit) = area_limit {
        formulation.model.constraints.push(LinearConstraint {
            name: "total_area".to_string(),
            coefficients: areas,
            sense: Sense::AtMost,
            rhs: limit as f64,
        });
        formulation.checks.push(Check::Area { limit });
    }
}

fn add_rule_bounds(formulation: &mut Formulation, catalog: &ModuleCatalog, spec: &Specification) {
    for rule in &spec.rules {
        let kind = rule.kind();
        if kind == ResourceKind::Dimension {
            continue;
        }
        if rule.unconstrained {
            debug!(spec = %spec.name, unit = %rule.unit, "unconstrained rule, no bound added");
            continue;
        }
        if !rule.is_bound() {
            continue;
        }
        if kind == ResourceKind::Internal {
            formulation.warn(format!(
                "spec '{}': Below/Above on internal resource '{}' ignored, internal balance is enforced automatically",
                spec.name, rule.unit
            ));
            continue;
        }
        let Some(limit) = rule.amount else {
            formulation.warn(format!(
                "spec '{}': Below/Above on '{}' has no amount, rule skipped",
                spec.name, rule.unit
            ));
            continue;
        };

        for (wanted, sense) in [(rule.below_amount, Sense::AtMost), (rule.above_amount, Sense::AtLeast)] {
            if !wanted {
                continue;
            }
            let side = match kind {
                ResourceKind::Input => Side::Input,
                ResourceKind::Output => Side::Output,
                _ => {
                    let side = if sense == Sense::AtMost { Side::Input } else { Side::Output };
                    formulation.warn(format!(
                        "spec '{}': unknown unit '{}' bounded on its {} totals",
                        spec.name,
                        rule.unit,
                        if side == Side::Input { "input" } else { "output" }
                    ));
                    side
                }
            };
            let coefficients = column_values(catalog, |m| match side {
                Side::Input => m.input(&rule.unit),
                Side::Output => m.output(&rule.unit),
            });
            formulation.model.constraints.push(LinearConstraint {
                name: format!("{}_{}", rule.unit, if sense == Sense::AtMost { "below" } else { "above" }),
                coefficients,
                sense,
                rhs: limit,
            });
            formulation.checks.push(Check::Bound {
                kind,
                unit: rule.unit.clone(),
                side,
                sense,
                limit,
            });
        }
    }
}

/// `Σ count·net(u) + initial(u) ≥ 0` for every internal resource in play.
fn add_internal_balances(
    formulation: &mut Formulation,
    catalog: &ModuleCatalog,
    initial_resources: &BTreeMap<String, f64>,
) {
    let catalog_units = catalog.units();
    let units: BTreeSet<&str> = INTERNAL_RESOURCES
        .iter()
        .copied()
        .filter(|unit| catalog_units.contains(*unit) || initial_resources.contains_key(*unit))
        .collect();

    for unit in units {
        let initial = initial_resources.get(unit).copied().unwrap_or(0.0);
        formulation.model.constraints.push(LinearConstraint {
            name: format!("{unit}_balance"),
            coefficients: column_values(catalog, |m| m.net(unit)),
            sense: Sense::AtLeast,
            rhs: -initial,
        });
        formulation.checks.push(Check::InternalNet {
            unit: unit.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcplan_core::SpecRule;

    fn catalog() -> ModuleCatalog {
        ModuleCatalog::new([
            ModuleDefinition::from_pairs(
                1,
                "Transformer",
                &[("price", 1000.0), ("grid_connection", 1.0), ("space_x", 2.0), ("space_y", 3.0)],
                &[("usable_power", 100.0)],
            ),
            ModuleDefinition::from_pairs(
                2,
                "Server_Rack",
                &[("price", 400.0), ("usable_power", 20.0), ("space_x", 1.0), ("space_y", 2.0)],
                &[("processing", 50.0), ("data_storage", 10.0)],
            ),
        ])
    }

    fn empty() -> BTreeMap<String, f64> {
        BTreeMap::new()
    }

    #[test]
    fn objective_combines_weighted_nets() {
        let spec = Specification::new(
            "Mixed",
            vec![SpecRule::maximize("processing"), SpecRule::minimize("price")],
        );
        let weights = ObjectiveWeights::default();
        let f = formulate(&catalog(), &spec, None, &weights, &empty());

        // processing +1.0 x 50 on the rack; price -0.1 x cost on both.
        assert!((f.model.objective[0] + 100.0).abs() < 1e-9);
        assert!((f.model.objective[1] - (50.0 - 40.0)).abs() < 1e-9);
        assert_eq!(f.terms.len(), 2);
        assert!(f.warnings.is_empty());
    }

    #[test]
    fn invalid_directions_are_ignored_with_warnings() {
        let spec = Specification::new(
            "Odd",
            vec![
                SpecRule::maximize("price"),
                SpecRule::minimize("processing"),
                SpecRule::maximize("usable_power"),
            ],
        );
        let f = formulate(&catalog(), &spec, None, &ObjectiveWeights::default(), &empty());
        assert!(f.model.has_dummy_objective());
        assert!(f.terms.is_empty());
        assert_eq!(f.warnings.len(), 3);
    }

    #[test]
    fn bounds_use_input_and_output_totals() {
        let spec = Specification::new(
            "Bounded",
            vec![SpecRule::below("price", 5000.0), SpecRule::above("processing", 100.0)],
        );
        let f = formulate(&catalog(), &spec, None, &ObjectiveWeights::default(), &empty());
        let price = &f.model.constraints[0];
        assert_eq!(price.coefficients, vec![1000.0, 400.0]);
        assert_eq!(price.sense, Sense::AtMost);
        let processing = &f.model.constraints[1];
        assert_eq!(processing.coefficients, vec![0.0, 50.0]);
        assert_eq!(processing.sense, Sense::AtLeast);
    }

    #[test]
    fn internal_bounds_are_skipped_and_balances_added() {
        let spec = Specification::new("Power", vec![SpecRule::above("usable_power", 10.0)]);
        let f = formulate(&catalog(), &spec, None, &ObjectiveWeights::default(), &empty());
        assert_eq!(f.warnings.len(), 1);
        assert_eq!(f.model.constraints.len(), 1);
        let balance = &f.model.constraints[0];
        assert_eq!(balance.name, "usable_power_balance");
        assert_eq!(balance.coefficients, vec![100.0, -20.0]);
        assert_eq!(balance.rhs, 0.0);
    }

    #[test]
    fn initial_resources_shift_balance_and_objective() {
        let initial = BTreeMap::from([("usable_power".to_string(), 40.0), ("processing".to_string(), 5.0)]);
        let spec = Specification::new("Seeded", vec![SpecRule::maximize("processing")]);
        let f = formulate(&catalog(), &spec, None, &ObjectiveWeights::uniform(), &initial);
        let balance = f
            .model
            .constraints
            .iter()
            .find(|c| c.name == "usable_power_balance")
            .unwrap();
        assert_eq!(balance.rhs, -40.0);
        assert_eq!(f.model.objective_constant, 5.0);
    }

    #[test]
    fn area_limit_becomes_a_row_unless_minimized() {
        let spec = Specification::new("Site", vec![SpecRule::maximize("processing")]);
        let f = formulate(&catalog(), &spec, Some(20), &ObjectiveWeights::default(), &empty());
        let area = &f.model.constraints[0];
        assert_eq!(area.coefficients, vec![6.0, 2.0]);
        assert_eq!(area.rhs, 20.0);

        let dense = Specification::new(
            "Dense",
            vec![SpecRule::maximize("processing"), SpecRule::minimize("space_x")],
        );
        let f = formulate(&catalog(), &dense, Some(20), &ObjectiveWeights::default(), &empty());
        assert!(f.area_minimized);
        assert!(f.model.constraints.iter().all(|c| c.name != "total_area"));
        assert_eq!(f.model.objective[0], -6.0);
        assert_eq!(f.model.objective[1], 50.0 - 2.0);
    }

    #[test]
    fn unknown_units_bound_input_below_and_output_above() {
        let spec = Specification::new(
            "Custom",
            vec![SpecRule::below("cooling_credits", 3.0), SpecRule::above("cooling_credits", 1.0)],
        );
        let f = formulate(&catalog(), &spec, None, &ObjectiveWeights::default(), &empty());
        let sides: Vec<Side> = f
            .checks
            .iter()
            .filter_map(|c| match c {
                Check::Bound { side, .. } => Some(*side),
                _ => None,
            })
            .collect();
        assert_eq!(sides, vec![Side::Input, Side::Output]);
        assert_eq!(f.warnings.len(), 2);
    }

    #[test]
    fn missing_amount_skips_the_bound() {
        let mut rule = SpecRule::below("price", 0.0);
        rule.amount = None;
        let spec = Specification::new("NoAmount", vec![rule]);
        let f = formulate(&catalog(), &spec, None, &ObjectiveWeights::default(), &empty());
        assert!(f.model.constraints.iter().all(|c| c.name != "price_below"));
        assert_eq!(f.warnings.len(), 1);
    }
}
