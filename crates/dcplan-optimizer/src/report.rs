//! Human-readable optimization report.

use dcplan_core::ModuleCatalog;

use crate::result::OptimizationResult;

pub fn format_result(result: &OptimizationResult, catalog: &ModuleCatalog) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Specification: {} ===\n", result.spec_name));
    out.push_str(&format!("Status:     {}\n", result.status));
    out.push_str(&format!("Details:    {}\n", result.message));
    out.push_str(&format!("Solve time: {:.3}s\n", result.solve_time_seconds));

    if !result.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &result.warnings {
            out.push_str(&format!("  ! {warning}\n"));
        }
    }

    if !result.status.has_solution() {
        out.push('\n');
        return out;
    }

    if let Some(objective) = result.objective_value {
        out.push_str(&format!("Objective:  {objective:.4}\n"));
    }
    let area_note = if result.area_minimized { " (minimized)" } else { "" };
    out.push_str(&format!("Total area: {}{area_note}\n", result.total_area_used));

    out.push_str(&format!(
        "\nSelected modules ({} instances):\n",
        result.total_instances()
    ));
    for (id, count) in &result.selected_modules_counts {
        let name = catalog.get(*id).map(|m| m.name.as_str()).unwrap_or("?");
        out.push_str(&format!("  {count:>4} x {name} (id {id})\n"));
    }

    out.push_str("\nResources:\n");
    out.push_str(&format!(
        "  {:<20} {:>12} {:>12} {:>12}\n",
        "unit", "input", "output", "net"
    ));
    for (unit, totals) in &result.resource_summary {
        out.push_str(&format!(
            "  {unit:<20} {:>12.2} {:>12.2} {:>12.2}\n",
            totals.input, totals.output, totals.net
        ));
    }

    if !result.constraint_verification.is_empty() {
        out.push_str("\nConstraint verification:\n");
        for line in &result.constraint_verification {
            out.push_str(&format!("  {line}\n"));
        }
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::{SolveSettings, solve};
    use dcplan_core::{ModuleDefinition, SpecRule, Specification};

    #[test]
    fn report_lists_selection_and_checks() {
        let catalog = ModuleCatalog::new([ModuleDefinition::from_pairs(
            3,
            "Storage_Rack",
            &[("price", 500.0), ("space_x", 1.0), ("space_y", 1.0)],
            &[("data_storage", 40.0)],
        )]);
        let spec = Specification::new(
            "Archive",
            vec![SpecRule::maximize("data_storage"), SpecRule::below("price", 1500.0)],
        );
        let result = solve(&catalog, &spec, None, &SolveSettings::default());
        let text = format_result(&result, &catalog);

        assert!(text.contains("=== Specification: Archive ==="));
        assert!(text.contains("Status:     Optimal"));
        assert!(text.contains("3 x Storage_Rack (id 3)"));
        assert!(text.contains("Below Input"));
    }

    #[test]
    fn unsolved_report_has_no_selection_block() {
        let catalog = ModuleCatalog::new([ModuleDefinition::from_pairs(
            3,
            "Storage_Rack",
            &[("price", 500.0)],
            &[("data_storage", 40.0)],
        )]);
        let spec = Specification::new(
            "Impossible",
            vec![SpecRule::above("data_storage", 50.0), SpecRule::below("price", 100.0)],
        );
        let result = solve(&catalog, &spec, None, &SolveSettings::default());
        let text = format_result(&result, &catalog);
        assert!(text.contains("Status:     Infeasible"));
        assert!(!text.contains("Selected modules"));
    }
}
