use anyhow::Result;
use dcplan_core::PlannerConfig;
use dcplan_optimizer::{format_result, solve_all};
use tracing::info;

use super::SolveRequest;
use crate::OutputFormat;

pub fn optimize(request: &SolveRequest<'_>, config: &PlannerConfig, format: OutputFormat) -> Result<()> {
    println!("{}", render(request, config, format)?);
    Ok(())
}

fn render(request: &SolveRequest<'_>, config: &PlannerConfig, format: OutputFormat) -> Result<String> {
    let catalog = super::load_catalog(request.modules)?;
    let specs = super::load_specs(request.specs, request.only)?;
    let settings = super::solve_settings(config, &catalog, request.fixed)?;

    info!(modules = catalog.len(), specs = specs.len(), "solving specifications");
    let results = solve_all(&catalog, &specs, &settings);

    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&results)?,
        OutputFormat::Text => results
            .iter()
            .map(|result| format_result(result, &catalog))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{CATALOG, SPECS};
    use std::fs;

    #[test]
    fn json_output_lists_every_specification() {
        let dir = tempfile::tempdir().unwrap();
        let modules = dir.path().join("modules.json");
        let specs = dir.path().join("specs.json");
        fs::write(&modules, CATALOG).unwrap();
        fs::write(&specs, SPECS).unwrap();

        let request = SolveRequest {
            modules: &modules,
            specs: &specs,
            only: None,
            fixed: None,
        };
        let output = render(&request, &PlannerConfig::default(), OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json[0]["spec_name"], "Small");
        assert_eq!(json[0]["status"], "Optimal");
        assert_eq!(json[0]["selected_modules_counts"]["1"], 1);
        assert_eq!(json[0]["selected_modules_counts"]["2"], 2);
        assert_eq!(json[1]["spec_name"], "Tiny");
        assert_eq!(json[1]["status"], "Optimal");
    }

    #[test]
    fn text_output_uses_the_result_report() {
        let dir = tempfile::tempdir().unwrap();
        let modules = dir.path().join("modules.json");
        let specs = dir.path().join("specs.json");
        fs::write(&modules, CATALOG).unwrap();
        fs::write(&specs, SPECS).unwrap();

        let request = SolveRequest {
            modules: &modules,
            specs: &specs,
            only: Some("Small"),
            fixed: None,
        };
        let output = render(&request, &PlannerConfig::default(), OutputFormat::Text).unwrap();
        assert!(output.contains("=== Specification: Small ==="));
        assert!(!output.contains("Tiny"));
    }

    #[test]
    fn missing_catalog_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let specs = dir.path().join("specs.json");
        fs::write(&specs, SPECS).unwrap();
        let modules = dir.path().join("absent.json");

        let request = SolveRequest {
            modules: &modules,
            specs: &specs,
            only: None,
            fixed: None,
        };
        assert!(render(&request, &PlannerConfig::default(), OutputFormat::Text).is_err());
    }
}
