//! Module catalog: one row per (module, resource) grouped into definitions.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::resource::{SPACE_X, SPACE_Y, standardize_unit_name};
use crate::rows;

/// Catalog identifier of a module type. Ids start at 1; 0 marks an empty grid cell.
pub type ModuleId = u32;

/// One raw catalog row as supplied by the loader collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRow {
    pub id: ModuleId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "rows::flag")]
    pub is_input: bool,
    #[serde(default, deserialize_with = "rows::flag")]
    pub is_output: bool,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "rows::amount")]
    pub amount: Option<f64>,
}

impl CatalogRow {
    pub fn input(id: ModuleId, name: &str, unit: &str, amount: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            is_input: true,
            is_output: false,
            unit: Some(unit.to_string()),
            amount: Some(amount),
        }
    }

    pub fn output(id: ModuleId, name: &str, unit: &str, amount: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            is_input: false,
            is_output: true,
            unit: Some(unit.to_string()),
            amount: Some(amount),
        }
    }
}

/// A catalog entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub id: ModuleId,
    pub name: String,
    /// Consumed per instance. Dimension rows are not included.
    pub inputs: BTreeMap<String, f64>,
    /// Produced per instance.
    pub outputs: BTreeMap<String, f64>,
    /// Footprint in grid cells; 0 when the dimensions were missing or invalid.
    pub width: u32,
    pub height: u32,
    pub area: u64,
}

impl ModuleDefinition {
    /// Build a definition, deriving the footprint from `space_x`/`space_y` inputs.
    ///
    /// Dimension entries are removed from `inputs`. Non-positive dimensions
    /// clamp both sides to 0 so the module contributes no area.
    pub fn new(
        id: ModuleId,
        name: impl Into<String>,
        mut inputs: BTreeMap<String, f64>,
        outputs: BTreeMap<String, f64>,
    ) -> Self {
        let name = name.into();
        let raw_width = inputs.remove(SPACE_X).unwrap_or(0.0);
        let raw_height = inputs.remove(SPACE_Y).unwrap_or(0.0);

        let (width, height) = if raw_width >= 1.0 && raw_height >= 1.0 {
            (raw_width.trunc() as u32, raw_height.trunc() as u32)
        } else {
            warn!(
                module_id = id,
                module = %name,
                width = raw_width,
                height = raw_height,
                "non-positive module dimensions, area set to 0"
            );
            (0, 0)
        };

        Self {
            id,
            name,
            inputs,
            outputs,
            width,
            height,
            area: u64::from(width) * u64::from(height),
        }
    }

    /// Convenience constructor from `(unit, amount)` slices.
    pub fn from_pairs(
        id: ModuleId,
        name: &str,
        inputs: &[(&str, f64)],
        outputs: &[(&str, f64)],
    ) -> Self {
        let collect = |pairs: &[(&str, f64)]| {
            pairs
                .iter()
                .map(|(unit, amount)| (unit.to_string(), *amount))
                .collect::<BTreeMap<_, _>>()
        };
        Self::new(id, name, collect(inputs), collect(outputs))
    }

    pub fn input(&self, unit: &str) -> f64 {
        self.inputs.get(unit).copied().unwrap_or(0.0)
    }

    pub fn output(&self, unit: &str) -> f64 {
        self.outputs.get(unit).copied().unwrap_or(0.0)
    }

    /// Produced minus consumed, per instance.
    pub fn net(&self, unit: &str) -> f64 {
        self.output(unit) - self.input(unit)
    }

    pub fn is_placeable(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// All module definitions, keyed and iterated by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleCatalog {
    modules: BTreeMap<ModuleId, ModuleDefinition>,
}

impl ModuleCatalog {
    pub fn new(modules: impl IntoIterator<Item = ModuleDefinition>) -> Self {
        Self {
            modules: modules.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    pub fn get(&self, id: ModuleId) -> Option<&ModuleDefinition> {
        self.modules.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDefinition> {
        self.modules.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.modules.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Every unit named in any module's inputs or outputs.
    pub fn units(&self) -> BTreeSet<String> {
        self.modules
            .values()
            .flat_map(|m| m.inputs.keys().chain(m.outputs.keys()))
            .cloned()
            .collect()
    }
}

/// Outcome of a row-based load: what was read and what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub(crate) fn drop_row(&mut self, message: String) {
        warn!("{message}");
        self.rows_dropped += 1;
        self.warnings.push(message);
    }
}

#[derive(Default)]
struct PendingModule {
    name: Option<String>,
    inputs: BTreeMap<String, f64>,
    outputs: BTreeMap<String, f64>,
}

/// Group catalog rows by module id into definitions.
///
/// Rows without a unit, with id 0, or with a missing/non-numeric amount are
/// dropped and recorded in the report. Repeated unit rows are summed.
pub fn build_catalog(rows: &[CatalogRow]) -> (ModuleCatalog, LoadReport) {
    let mut report = LoadReport {
        rows_read: rows.len(),
        ..LoadReport::default()
    };
    let mut pending: BTreeMap<ModuleId, PendingModule> = BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        if row.id == 0 {
            report.drop_row(format!("catalog row {index}: module id 0 is reserved, row dropped"));
            continue;
        }
        let Some(unit) = row.unit.as_deref().and_then(standardize_unit_name) else {
            report.drop_row(format!("catalog row {index} (module {}): missing unit, row dropped", row.id));
            continue;
        };
        let Some(amount) = row.amount else {
            report.drop_row(format!(
                "catalog row {index} (module {}, unit {unit}): missing or non-numeric amount, row dropped",
                row.id
            ));
            continue;
        };

        let module = pending.entry(row.id).or_default();
        if module.name.is_none() && !row.name.trim().is_empty() {
            module.name = Some(row.name.trim().to_string());
        }
        if row.is_input {
            *module.inputs.entry(unit.clone()).or_insert(0.0) += amount;
        }
        if row.is_output {
            *module.outputs.entry(unit).or_insert(0.0) += amount;
        }
    }

    let catalog = ModuleCatalog::new(pending.into_iter().map(|(id, module)| {
        let name = module.name.unwrap_or_else(|| format!("Unknown_{id}"));
        ModuleDefinition::new(id, name, module.inputs, module.outputs)
    }));

    debug!(
        modules = catalog.len(),
        rows = report.rows_read,
        dropped = report.rows_dropped,
        "built module catalog"
    );
    (catalog, report)
}

/// Read a JSON array of catalog rows from disk and build the catalog.
///
/// Elements that do not deserialize as a [`CatalogRow`] are dropped
/// with a warning like any other malformed row.
pub fn load_catalog_json(path: &Path) -> CoreResult<(ModuleCatalog, LoadReport)> {
    let items = read_json_rows(path)?;
    let mut malformed = LoadReport::default();
    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<CatalogRow>(item) {
            Ok(row) => rows.push(row),
            Err(e) => malformed.drop_row(format!("catalog row {index}: {e}, row dropped")),
        }
    }

    let (catalog, mut report) = build_catalog(&rows);
    report.rows_read += malformed.rows_dropped;
    report.rows_dropped += malformed.rows_dropped;
    malformed.warnings.append(&mut report.warnings);
    report.warnings = malformed.warnings;
    Ok((catalog, report))
}

pub(crate) fn read_json_rows(path: &Path) -> CoreResult<Vec<serde_json::Value>> {
    let content = std::fs::read_to_string(path).map_err(|source| CoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: serde_json::Value = serde_json::from_str(&content).map_err(|source| CoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    rows::array_elements(doc).ok_or_else(|| CoreError::NotAnArray {
        path: path.to_path_buf(),
    })
}
