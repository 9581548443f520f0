//! `dcplan plan`: optimize each specification, then place its selection on
//! the site the specification declares.

use std::path::Path;

use anyhow::Result;
use dcplan_core::{ModuleCatalog, PlannerConfig, Specification};
use dcplan_optimizer::{OptimizationResult, format_result, solve_all};
use dcplan_placement::{FixedPosition, PlacementOutcome};
use serde::Serialize;
use tracing::info;

use super::SolveRequest;
use super::place::text_report;
use crate::OutputFormat;

#[derive(Debug, Serialize)]
struct PlanEntry {
    optimization: OptimizationResult,
    placement: Option<PlacementOutcome>,
    /// Why no placement was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    placement_skipped: Option<String>,
}

/// Site constraints applied to every placement of a plan.
pub struct SiteOptions<'a> {
    pub locks: &'a [String],
    /// Positions of modules already on site. They are placed where listed
    /// in addition to the optimizer's selection.
    pub positions: Option<&'a Path>,
    pub ascii: bool,
}

pub fn plan(
    request: &SolveRequest<'_>,
    site: &SiteOptions<'_>,
    config: &PlannerConfig,
    format: OutputFormat,
) -> Result<()> {
    println!("{}", render(request, site, config, format)?);
    Ok(())
}

fn render(
    request: &SolveRequest<'_>,
    site: &SiteOptions<'_>,
    config: &PlannerConfig,
    format: OutputFormat,
) -> Result<String> {
    let catalog = super::load_catalog(request.modules)?;
    let specs = super::load_specs(request.specs, request.only)?;
    let settings = super::solve_settings(config, &catalog, request.fixed)?;
    let positions = match site.positions {
        Some(path) => super::load_positions(path)?,
        None => Vec::new(),
    };

    let results = solve_all(&catalog, &specs, &settings);
    let mut entries = Vec::with_capacity(specs.len());
    for (spec, optimization) in specs.iter().zip(results) {
        entries.push(place_selection(
            &catalog,
            spec,
            optimization,
            site.locks,
            &positions,
            config,
        )?);
    }

    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&entries)?,
        OutputFormat::Text => entries
            .iter()
            .map(|entry| {
                let mut out = format_result(&entry.optimization, &catalog);
                out.push('\n');
                match (&entry.placement, &entry.placement_skipped) {
                    (Some(outcome), _) => out.push_str(&text_report(outcome, site.ascii)),
                    (None, Some(reason)) => out.push_str(&format!("Placement skipped: {reason}\n")),
                    (None, None) => {}
                }
                out
            })
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

fn place_selection(
    catalog: &ModuleCatalog,
    spec: &Specification,
    optimization: OptimizationResult,
    locks: &[String],
    positions: &[FixedPosition],
    config: &PlannerConfig,
) -> Result<PlanEntry> {
    if !optimization.status.has_solution() {
        let reason = format!("no selection to place (status {})", optimization.status);
        return Ok(skipped(spec, optimization, reason));
    }
    let Some((width, height)) = spec.grid_dimensions() else {
        let reason = "specification declares no positive space_x/space_y limits".to_string();
        return Ok(skipped(spec, optimization, reason));
    };

    let locker = super::build_locker(width, height, locks)?;
    let mut counts = optimization.selected_modules_counts.clone();
    for position in positions {
        *counts.entry(position.module_id).or_default() += 1;
    }
    let outcome = dcplan_placement::place(
        catalog,
        &counts,
        width,
        height,
        Some(locker.mask()),
        positions,
        &config.placement,
    )?;
    Ok(PlanEntry {
        optimization,
        placement: Some(outcome),
        placement_skipped: None,
    })
}

fn skipped(spec: &Specification, optimization: OptimizationResult, reason: String) -> PlanEntry {
    info!(spec = %spec.name, %reason, "placement skipped");
    PlanEntry {
        optimization,
        placement: None,
        placement_skipped: Some(reason),
    }
}
