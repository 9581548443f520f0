//! Integer search over LP relaxations.
//!
//! Depth-first branch-and-bound: each node solves the continuous relaxation
//! of [`LinearModel`] with tightened column bounds through `good_lp`'s
//! `microlp` backend, branches on the most fractional column, and prunes
//! nodes whose relaxation cannot beat the incumbent. The wall-clock limit and
//! the node budget are checked before each node.

use std::time::Instant;

use dcplan_core::SolverConfig;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    microlp, variable,
};
use tracing::{debug, trace};

use crate::model::{LinearConstraint, LinearModel, Sense};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchStatus {
    /// Search finished; the incumbent is optimal.
    Optimal,
    /// A limit stopped the search after an integer solution was found.
    Feasible,
    /// A limit stopped the search before any integer solution was found.
    LimitReached,
    Infeasible,
    Unbounded,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    /// Integer column values of the best solution, when one exists.
    pub values: Option<Vec<f64>>,
    pub nodes: u64,
}

#[derive(Debug, Clone)]
struct NodeBounds {
    lower: Vec<f64>,
    upper: Vec<Option<f64>>,
}

impl NodeBounds {
    fn root(width: usize) -> Self {
        Self {
            lower: vec![0.0; width],
            upper: vec![None; width],
        }
    }
}

enum Relaxation {
    Solved { values: Vec<f64>, objective: f64 },
    Infeasible,
    Unbounded,
    Failed(String),
}

/// Run branch-and-bound to completion or until a limit is hit.
pub fn branch_and_bound(model: &LinearModel, config: &SolverConfig) -> SearchOutcome {
    let started = Instant::now();
    let time_limit = config.time_limit();
    let tolerance = config.integrality_tolerance.max(0.0);

    if let Some(row) = violated_constant_row(model) {
        debug!(row = %row.name, "constant row can never hold");
        return SearchOutcome {
            status: SearchStatus::Infeasible,
            values: None,
            nodes: 0,
        };
    }

    let mut stack = vec![NodeBounds::root(model.width())];
    let mut incumbent: Option<(Vec<f64>, f64)> = None;
    let mut nodes = 0u64;
    let mut limit_hit = false;

    while let Some(bounds) = stack.pop() {
        if nodes >= config.max_nodes || started.elapsed() >= time_limit {
            limit_hit = true;
            break;
        }
        nodes += 1;

        let (values, objective) = match solve_relaxation(model, &bounds) {
            Relaxation::Solved { values, objective } => (values, objective),
            Relaxation::Infeasible => continue,
            Relaxation::Unbounded => {
                return SearchOutcome {
                    status: SearchStatus::Unbounded,
                    values: None,
                    nodes,
                };
            }
            Relaxation::Failed(message) => {
                return SearchOutcome {
                    status: SearchStatus::Failed(message),
                    values: incumbent.map(|(values, _)| values),
                    nodes,
                };
            }
        };

        if let Some((_, best)) = &incumbent {
            if objective <= best + 1e-9 * (1.0 + best.abs()) {
                trace!(nodes, objective, best, "node pruned by bound");
                continue;
            }
        }

        match most_fractional(&values, tolerance) {
            None => {
                let rounded: Vec<f64> = values.iter().map(|v| v.round().max(0.0)).collect();
                let value = model.evaluate(&rounded);
                let improves = incumbent.as_ref().is_none_or(|(_, best)| value > *best);
                if improves {
                    debug!(nodes, objective = value, "new incumbent");
                    incumbent = Some((rounded, value));
                }
            }
            Some(column) => {
                let split = values[column].floor();
                let mut down = bounds.clone();
                down.upper[column] = Some(split);
                let mut up = bounds;
                up.lower[column] = split + 1.0;
                // Down branch is explored first.
                stack.push(up);
                stack.push(down);
            }
        }
    }

    let status = match (&incumbent, limit_hit) {
        (Some(_), false) => SearchStatus::Optimal,
        (Some(_), true) => SearchStatus::Feasible,
        (None, false) => SearchStatus::Infeasible,
        (None, true) => SearchStatus::LimitReached,
    };
    debug!(
        nodes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        ?status,
        "branch-and-bound finished"
    );
    SearchOutcome {
        status,
        values: incumbent.map(|(values, _)| values),
        nodes,
    }
}

/// A row without coefficients is `0 (≤|≥) rhs`; it never reaches the LP.
fn violated_constant_row(model: &LinearModel) -> Option<&LinearConstraint> {
    model
        .constraints
        .iter()
        .find(|row| row.is_constant() && !row.sense.holds(0.0, row.rhs, 1e-9))
}

/// Column whose value is furthest from an integer, if any exceeds `tolerance`.
fn most_fractional(values: &[f64], tolerance: f64) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .map(|(column, value)| (column, (value - value.round()).abs()))
        .filter(|(_, distance)| *distance > tolerance)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(column, _)| column)
}

fn solve_relaxation(model: &LinearModel, bounds: &NodeBounds) -> Relaxation {
    let mut problem_vars = ProblemVariables::new();
    let columns: Vec<Variable> = bounds
        .lower
        .iter()
        .zip(&bounds.upper)
        .map(|(lower, upper)| {
            let mut definition = variable().min(*lower);
            if let Some(upper) = upper {
                definition = definition.max(*upper);
            }
            problem_vars.add(definition)
        })
        .collect();

    let objective = scaled_expression(&model.objective, 1.0, &columns);
    let mut problem = problem_vars.maximise(objective).using(microlp);
    for row in model.constraints.iter().filter(|row| !row.is_constant()) {
        // `≥` rows are negated into `≤` form.
        let scale = match row.sense {
            Sense::AtMost => 1.0,
            Sense::AtLeast => -1.0,
        };
        let lhs = scaled_expression(&row.coefficients, scale, &columns);
        problem.add_constraint(constraint::leq(lhs, scale * row.rhs));
    }

    match problem.solve() {
        Ok(solution) => {
            let values: Vec<f64> = columns.iter().map(|column| solution.value(*column)).collect();
            let objective = model.evaluate(&values);
            Relaxation::Solved { values, objective }
        }
        Err(ResolutionError::Infeasible) => Relaxation::Infeasible,
        Err(ResolutionError::Unbounded) => Relaxation::Unbounded,
        Err(e) => Relaxation::Failed(e.to_string()),
    }
}

fn scaled_expression(coefficients: &[f64], scale: f64, columns: &[Variable]) -> Expression {
    let mut expression = Expression::with_capacity(columns.len());
    for (coefficient, column) in coefficients.iter().zip(columns) {
        if *coefficient != 0.0 {
            expression.add_mul(scale * coefficient, *column);
        }
    }
    expression
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(coefficients: Vec<f64>, sense: Sense, rhs: f64) -> LinearConstraint {
        LinearConstraint {
            name: "row".to_string(),
            coefficients,
            sense,
            rhs,
        }
    }

    fn model(objective: Vec<f64>, constraints: Vec<LinearConstraint>) -> LinearModel {
        LinearModel {
            columns: (1..=objective.len() as u32).collect(),
            objective,
            objective_constant: 0.0,
            constraints,
        }
    }

    #[test]
    fn rounds_down_to_the_best_integer_point() {
        // max 100x  s.t. 1000x <= 4500
        let m = model(vec![100.0], vec![row(vec![1000.0], Sense::AtMost, 4500.0)]);
        let outcome = branch_and_bound(&m, &SolverConfig::default());
        assert_eq!(outcome.status, SearchStatus::Optimal);
        assert_eq!(outcome.values, Some(vec![4.0]));
    }

    #[test]
    fn knapsack_prefers_the_integer_optimum_over_rounding() {
        // max 5a + 4b  s.t. 6a + 4b <= 24, a + 2b <= 6
        let m = model(
            vec![5.0, 4.0],
            vec![
                row(vec![6.0, 4.0], Sense::AtMost, 24.0),
                row(vec![1.0, 2.0], Sense::AtMost, 6.0),
            ],
        );
        let outcome = branch_and_bound(&m, &SolverConfig::default());
        assert_eq!(outcome.status, SearchStatus::Optimal);
        let values = outcome.values.unwrap();
        assert_eq!(m.evaluate(&values), 20.0);
    }

    #[test]
    fn infeasible_rows_report_infeasible() {
        let m = model(
            vec![1.0],
            vec![
                row(vec![1.0], Sense::AtMost, 2.0),
                row(vec![1.0], Sense::AtLeast, 3.0),
            ],
        );
        let outcome = branch_and_bound(&m, &SolverConfig::default());
        assert_eq!(outcome.status, SearchStatus::Infeasible);
        assert!(outcome.values.is_none());
    }

    #[test]
    fn no_integer_in_a_fractional_window_is_infeasible() {
        let m = model(
            vec![1.0],
            vec![
                row(vec![2.0], Sense::AtLeast, 1.0),
                row(vec![2.0], Sense::AtMost, 1.5),
            ],
        );
        let outcome = branch_and_bound(&m, &SolverConfig::default());
        assert_eq!(outcome.status, SearchStatus::Infeasible);
    }

    #[test]
    fn unbounded_relaxation_is_reported() {
        let m = model(vec![1.0], vec![]);
        let outcome = branch_and_bound(&m, &SolverConfig::default());
        assert_eq!(outcome.status, SearchStatus::Unbounded);
    }

    #[test]
    fn violated_constant_row_short_circuits() {
        let m = model(vec![1.0], vec![row(vec![0.0], Sense::AtLeast, 10.0)]);
        let outcome = branch_and_bound(&m, &SolverConfig::default());
        assert_eq!(outcome.status, SearchStatus::Infeasible);
        assert_eq!(outcome.nodes, 0);
    }

    #[test]
    fn zero_node_budget_stops_before_any_solution() {
        let m = model(vec![1.0], vec![row(vec![1.0], Sense::AtMost, 3.0)]);
        let config = SolverConfig {
            max_nodes: 0,
            ..SolverConfig::default()
        };
        let outcome = branch_and_bound(&m, &config);
        assert_eq!(outcome.status, SearchStatus::LimitReached);
        assert!(outcome.values.is_none());
    }

    #[test]
    fn most_fractional_ignores_near_integers() {
        assert_eq!(most_fractional(&[1.0, 2.0000001, 3.0], 1e-6), None);
        assert_eq!(most_fractional(&[1.2, 2.5, 3.9], 1e-6), Some(1));
    }
}
