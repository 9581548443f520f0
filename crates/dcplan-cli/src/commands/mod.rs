//! Subcommand implementations and the input loading they share.
//!
//! Unreadable files, malformed JSON documents and invalid configuration are
//! fatal here, before any solve starts. Malformed individual rows are not:
//! the core loaders drop them and we log the totals.

pub mod config;
pub mod optimize;
pub mod place;
pub mod plan;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use dcplan_core::{LoadReport, ModuleCatalog, ModuleId, PlannerConfig, Specification};
use dcplan_optimizer::{SolveSettings, initial_resources_from_modules};
use dcplan_placement::{FixedPosition, RegionLocker};
use tracing::{info, warn};

/// Inputs shared by `optimize` and `plan`.
pub struct SolveRequest<'a> {
    pub modules: &'a Path,
    pub specs: &'a Path,
    pub only: Option<&'a str>,
    pub fixed: Option<&'a Path>,
}

pub fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    match path {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(PlannerConfig::default()),
    }
}

fn log_load(what: &str, path: &Path, report: &LoadReport) {
    if report.rows_dropped > 0 {
        warn!(
            path = %path.display(),
            rows_read = report.rows_read,
            rows_dropped = report.rows_dropped,
            "some {what} rows were dropped"
        );
    } else {
        info!(path = %path.display(), rows_read = report.rows_read, "loaded {what} rows");
    }
}

pub fn load_catalog(path: &Path) -> Result<ModuleCatalog> {
    let (catalog, report) = dcplan_core::load_catalog_json(path)?;
    log_load("catalog", path, &report);
    Ok(catalog)
}

/// Load and group specifications, keeping only `only` when given.
pub fn load_specs(path: &Path, only: Option<&str>) -> Result<Vec<Specification>> {
    let (specs, report) = dcplan_core::load_specs_json(path)?;
    log_load("specification", path, &report);
    match only {
        None => Ok(specs),
        Some(name) => {
            let selected: Vec<Specification> =
                specs.into_iter().filter(|s| s.name == name).collect();
            if selected.is_empty() {
                bail!("no specification named '{name}' in {}", path.display());
            }
            Ok(selected)
        }
    }
}

/// Read a JSON object of module id → instance count.
pub fn load_counts(path: &Path) -> Result<BTreeMap<ModuleId, u64>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{}: expected a JSON object of module id → count", path.display()))
}

/// Read a JSON array of `{"module_id", "x", "y"}` fixed positions.
pub fn load_positions(path: &Path) -> Result<Vec<FixedPosition>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let positions: Vec<FixedPosition> = serde_json::from_str(&content).with_context(|| {
        format!("{}: expected a JSON array of {{module_id, x, y}} objects", path.display())
    })?;
    info!(path = %path.display(), positions = positions.len(), "loaded fixed positions");
    Ok(positions)
}

/// Solver settings from the config, plus the net resources of any fixed modules.
pub fn solve_settings(
    config: &PlannerConfig,
    catalog: &ModuleCatalog,
    fixed: Option<&Path>,
) -> Result<SolveSettings> {
    let settings = SolveSettings::from_config(config);
    let Some(path) = fixed else {
        return Ok(settings);
    };

    let counts = load_counts(path)?;
    let mut installed = Vec::with_capacity(counts.len());
    for (id, count) in &counts {
        let Some(module) = catalog.get(*id) else {
            bail!("{}: module {id} is not in the catalog", path.display());
        };
        installed.push((module, *count));
    }
    let initial = initial_resources_from_modules(installed);
    info!(modules = counts.len(), units = initial.len(), "applying fixed modules");
    Ok(settings.with_initial_resources(initial))
}

/// Parse an `x,y,width,height` lock argument.
pub fn parse_lock(arg: &str) -> Result<(i64, i64, i64, i64)> {
    let parts: Vec<&str> = arg.split(',').map(str::trim).collect();
    let &[x, y, w, h] = parts.as_slice() else {
        bail!("invalid lock '{arg}': expected x,y,width,height");
    };
    let number = |s: &str| -> Result<i64> {
        s.parse()
            .with_context(|| format!("invalid lock '{arg}': '{s}' is not an integer"))
    };
    Ok((number(x)?, number(y)?, number(w)?, number(h)?))
}

/// Build a locker for a `width × height` grid from `--lock` arguments.
pub fn build_locker(width: u32, height: u32, locks: &[String]) -> Result<RegionLocker> {
    let mut locker = RegionLocker::new(width, height);
    for arg in locks {
        let (x, y, w, h) = parse_lock(arg)?;
        if locker.add_region(x, y, w, h).is_none() {
            warn!(lock = %arg, width, height, "locked region lies outside the grid, ignored");
        }
    }
    Ok(locker)
}
