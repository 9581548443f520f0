use std::path::Path;

use anyhow::Result;
use dcplan_core::PlannerConfig;
use dcplan_placement::{PlacementOutcome, format_placement_report};

use crate::OutputFormat;

pub struct PlaceRequest<'a> {
    pub modules: &'a Path,
    pub counts: &'a Path,
    pub width: u32,
    pub height: u32,
    pub locks: &'a [String],
    pub positions: Option<&'a Path>,
    pub ascii: bool,
}

pub fn place(request: &PlaceRequest<'_>, config: &PlannerConfig, format: OutputFormat) -> Result<()> {
    println!("{}", render(request, config, format)?);
    Ok(())
}

fn render(request: &PlaceRequest<'_>, config: &PlannerConfig, format: OutputFormat) -> Result<String> {
    let catalog = super::load_catalog(request.modules)?;
    let counts = super::load_counts(request.counts)?;
    let locker = super::build_locker(request.width, request.height, request.locks)?;
    let fixed = match request.positions {
        Some(path) => super::load_positions(path)?,
        None => Vec::new(),
    };

    let outcome = dcplan_placement::place(
        &catalog,
        &counts,
        request.width,
        request.height,
        Some(locker.mask()),
        &fixed,
        &config.placement,
    )?;

    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&outcome)?,
        OutputFormat::Text => text_report(&outcome, request.ascii),
    })
}

/// Placement report, optionally followed by the grid drawing.
pub(crate) fn text_report(outcome: &PlacementOutcome, ascii: bool) -> String {
    let mut out = format_placement_report(outcome);
    if ascii {
        out.push('\n');
        out.push_str(&outcome.grid.render_ascii());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::CATALOG;
    use std::fs;

    fn write_inputs(dir: &Path, counts: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let modules = dir.join("modules.json");
        let counts_path = dir.join("counts.json");
        fs::write(&modules, CATALOG).unwrap();
        fs::write(&counts_path, counts).unwrap();
        (modules, counts_path)
    }

    #[test]
    fn locks_keep_instances_off_the_region() {
        let dir = tempfile::tempdir().unwrap();
        let (modules, counts) = write_inputs(dir.path(), r#"{"1": 1, "2": 2}"#);
        let locks = vec!["0,0,1,4".to_string()];
        let request = PlaceRequest {
            modules: &modules,
            counts: &counts,
            width: 4,
            height: 4,
            locks: &locks,
            positions: None,
            ascii: false,
        };

        let output = render(&request, &PlannerConfig::default(), OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["placed"].as_array().unwrap().len(), 3);
        for placed in json["placed"].as_array().unwrap() {
            assert!(placed["x"].as_u64().unwrap() >= 1);
        }
    }

    #[test]
    fn text_output_can_include_the_grid() {
        let dir = tempfile::tempdir().unwrap();
        let (modules, counts) = write_inputs(dir.path(), r#"{"2": 1}"#);
        let request = PlaceRequest {
            modules: &modules,
            counts: &counts,
            width: 2,
            height: 1,
            locks: &[],
            positions: None,
            ascii: true,
        };

        let output = render(&request, &PlannerConfig::default(), OutputFormat::Text).unwrap();
        assert!(output.starts_with("=== Module Placement Report ==="));
        assert!(output.contains("Rack #0 (id 2): (0, 0) size 1x1"));
        assert!(output.contains("A = module 2"));
    }

    #[test]
    fn positions_pin_instances_and_count_against_the_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (modules, counts) = write_inputs(dir.path(), r#"{"1": 1, "2": 2}"#);
        let positions = dir.path().join("positions.json");
        fs::write(
            &positions,
            r#"[{"module_id": 1, "x": 2, "y": 2}, {"module_id": 2, "x": 9, "y": 9}]"#,
        )
        .unwrap();
        let request = PlaceRequest {
            modules: &modules,
            counts: &counts,
            width: 4,
            height: 4,
            locks: &[],
            positions: Some(&positions),
            ascii: false,
        };

        let output = render(&request, &PlannerConfig::default(), OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["fixed"], 1);
        assert_eq!(json["placed"][0]["module_id"], 1);
        assert_eq!(json["placed"][0]["x"], 2);
        assert_eq!(json["placed"][0]["y"], 2);
        assert_eq!(json["placed"].as_array().unwrap().len(), 3);
        assert_eq!(json["rejected_fixed"][0]["module_id"], 2);
        assert_eq!(json["status"], "partial");
    }

    #[test]
    fn unknown_module_in_counts_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (modules, counts) = write_inputs(dir.path(), r#"{"9": 1}"#);
        let request = PlaceRequest {
            modules: &modules,
            counts: &counts,
            width: 3,
            height: 3,
            locks: &[],
            positions: None,
            ascii: false,
        };
        assert!(render(&request, &PlannerConfig::default(), OutputFormat::Text).is_err());
    }
}
