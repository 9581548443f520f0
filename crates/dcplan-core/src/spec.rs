//! Datacenter specifications: named sets of constraint and objective rules.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{LoadReport, read_json_rows};
use crate::error::CoreResult;
use crate::resource::{ResourceKind, SPACE_X, SPACE_Y, standardize_unit_name};
use crate::rows;

/// One raw specification row as supplied by the loader collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecRow {
    pub spec_name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "rows::flag")]
    pub below_amount: bool,
    #[serde(default, deserialize_with = "rows::flag")]
    pub above_amount: bool,
    #[serde(default, deserialize_with = "rows::flag")]
    pub minimize: bool,
    #[serde(default, deserialize_with = "rows::flag")]
    pub maximize: bool,
    #[serde(default, deserialize_with = "rows::flag")]
    pub unconstrained: bool,
    #[serde(default, deserialize_with = "rows::amount")]
    pub amount: Option<f64>,
}

/// A single rule of a specification, with a standardized unit.
///
/// Flags are not mutually exclusive; each one is interpreted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRule {
    pub unit: String,
    #[serde(default)]
    pub below_amount: bool,
    #[serde(default)]
    pub above_amount: bool,
    #[serde(default)]
    pub minimize: bool,
    #[serde(default)]
    pub maximize: bool,
    #[serde(default)]
    pub unconstrained: bool,
    /// Threshold for Below/Above rules; ignored otherwise.
    #[serde(default)]
    pub amount: Option<f64>,
}

impl SpecRule {
    fn bare(unit: &str) -> Self {
        Self {
            unit: standardize_unit_name(unit).unwrap_or_default(),
            below_amount: false,
            above_amount: false,
            minimize: false,
            maximize: false,
            unconstrained: false,
            amount: None,
        }
    }

    pub fn below(unit: &str, amount: f64) -> Self {
        Self {
            below_amount: true,
            amount: Some(amount),
            ..Self::bare(unit)
        }
    }

    pub fn above(unit: &str, amount: f64) -> Self {
        Self {
            above_amount: true,
            amount: Some(amount),
            ..Self::bare(unit)
        }
    }

    pub fn minimize(unit: &str) -> Self {
        Self {
            minimize: true,
            ..Self::bare(unit)
        }
    }

    pub fn maximize(unit: &str) -> Self {
        Self {
            maximize: true,
            ..Self::bare(unit)
        }
    }

    pub fn unconstrained(unit: &str) -> Self {
        Self {
            unconstrained: true,
            ..Self::bare(unit)
        }
    }

    pub fn kind(&self) -> ResourceKind {
        ResourceKind::classify(&self.unit)
    }

    /// Whether this rule asks for a Below/Above bound (and is not marked unconstrained).
    pub fn is_bound(&self) -> bool {
        !self.unconstrained && (self.below_amount || self.above_amount)
    }
}

/// How total module area enters the optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaMode {
    /// Hard constraint `Σ count·area ≤ limit` when a positive limit exists.
    #[default]
    Constrained,
    /// Weighted minimization term in the objective; no area constraint.
    Minimized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub rules: Vec<SpecRule>,
    pub area_mode: AreaMode,
}

impl Specification {
    /// Build a specification, deriving the area mode from the rules:
    /// any `Minimize` on `space_x`/`space_y` selects [`AreaMode::Minimized`].
    pub fn new(name: impl Into<String>, rules: Vec<SpecRule>) -> Self {
        let area_mode = if rules
            .iter()
            .any(|r| r.minimize && r.kind() == ResourceKind::Dimension)
        {
            AreaMode::Minimized
        } else {
            AreaMode::Constrained
        };
        Self {
            name: name.into(),
            rules,
            area_mode,
        }
    }

    pub fn with_area_mode(mut self, area_mode: AreaMode) -> Self {
        self.area_mode = area_mode;
        self
    }

    /// Amount of the first `Below_Amount` rule on a dimension unit, truncated.
    pub fn dimension_limit(&self, unit: &str) -> Option<i64> {
        self.rules
            .iter()
            .find(|r| r.unit == unit && r.below_amount)
            .and_then(|r| r.amount)
            .map(|amount| amount.trunc() as i64)
    }

    /// Grid size `(width, height)` when both dimension limits are positive.
    pub fn grid_dimensions(&self) -> Option<(u32, u32)> {
        let width = self.dimension_limit(SPACE_X)?;
        let height = self.dimension_limit(SPACE_Y)?;
        if width <= 0 || height <= 0 {
            return None;
        }
        Some((
            u32::try_from(width).ok()?,
            u32::try_from(height).ok()?,
        ))
    }

    /// Total area limit `width × height` from the `Below_Amount` rules on
    /// `space_x`/`space_y`.
    ///
    /// `None` when either rule is missing (no area constraint). Declared
    /// non-positive dimensions yield `Some(0)`: a site with no usable area.
    /// The product saturates at `u64::MAX`.
    pub fn area_limit(&self) -> Option<u64> {
        let width = self.dimension_limit(SPACE_X)?.max(0) as u64;
        let height = self.dimension_limit(SPACE_Y)?.max(0) as u64;
        Some(width.saturating_mul(height))
    }
}

/// Group specification rows by `spec_name` (sorted by name).
///
/// Rows without a unit are dropped.
pub fn group_spec_rows(rows: &[SpecRow]) -> (Vec<Specification>, LoadReport) {
    let mut report = LoadReport {
        rows_read: rows.len(),
        ..LoadReport::default()
    };
    let mut grouped: BTreeMap<String, Vec<SpecRule>> = BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        let Some(unit) = row.unit.as_deref().and_then(standardize_unit_name) else {
            report.drop_row(format!(
                "spec row {index} ({}): missing unit, row dropped",
                row.spec_name
            ));
            continue;
        };
        grouped.entry(row.spec_name.trim().to_string()).or_default().push(SpecRule {
            unit,
            below_amount: row.below_amount,
            above_amount: row.above_amount,
            minimize: row.minimize,
            maximize: row.maximize,
            unconstrained: row.unconstrained,
            amount: row.amount,
        });
    }

    let specs: Vec<Specification> = grouped
        .into_iter()
        .map(|(name, rules)| Specification::new(name, rules))
        .collect();
    debug!(specs = specs.len(), dropped = report.rows_dropped, "grouped spec rows");
    (specs, report)
}

/// Read a JSON array of specification rows from disk and group them.
pub fn load_specs_json(path: &Path) -> CoreResult<(Vec<Specification>, LoadReport)> {
    let items = read_json_rows(path)?;
    let mut rows = Vec::with_capacity(items.len());
    let mut malformed = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<SpecRow>(item) {
            Ok(row) => rows.push(row),
            Err(e) => malformed.push(format!("spec row {index}: {e}, row dropped")),
        }
    }

    let (specs, mut report) = group_spec_rows(&rows);
    for message in malformed {
        report.rows_read += 1;
        report.drop_row(message);
    }
    Ok((specs, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(spec: &str, unit: &str) -> SpecRow {
        SpecRow {
            spec_name: spec.to_string(),
            unit: Some(unit.to_string()),
            below_amount: false,
            above_amount: false,
            minimize: false,
            maximize: false,
            unconstrained: false,
            amount: None,
        }
    }

    #[test]
    fn groups_by_spec_name_sorted() {
        let rows = vec![
            SpecRow { maximize: true, ..row("Rack_Heavy", "Processing") },
            SpecRow { below_amount: true, amount: Some(5000.0), ..row("Budget", "Price") },
            SpecRow { minimize: true, ..row("Rack_Heavy", "Price") },
        ];
        let (specs, report) = group_spec_rows(&rows);

        assert_eq!(report.rows_dropped, 0);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "Budget");
        assert_eq!(specs[1].rules.len(), 2);
        assert_eq!(specs[1].rules[0].unit, "processing");
    }

    #[test]
    fn rows_without_unit_are_dropped() {
        let rows = vec![SpecRow { unit: None, ..row("A", "price") }, row("A", "price")];
        let (specs, report) = group_spec_rows(&rows);
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(specs[0].rules.len(), 1);
    }

    #[test]
    fn area_limit_from_dimension_rules() {
        let spec = Specification::new(
            "Small",
            vec![SpecRule::below("space_x", 100.0), SpecRule::below("space_y", 50.0)],
        );
        assert_eq!(spec.area_mode, AreaMode::Constrained);
        assert_eq!(spec.grid_dimensions(), Some((100, 50)));
        assert_eq!(spec.area_limit(), Some(5000));
    }

    #[test]
    fn zero_dimensions_give_zero_area_limit() {
        let spec = Specification::new(
            "Zero",
            vec![SpecRule::below("space_x", 0.0), SpecRule::below("space_y", -4.0)],
        );
        assert_eq!(spec.area_limit(), Some(0));
        assert_eq!(spec.grid_dimensions(), None);
    }

    #[test]
    fn huge_dimensions_saturate_area_limit() {
        let spec = Specification::new(
            "Campus",
            vec![SpecRule::below("space_x", 1e10), SpecRule::below("space_y", 1e10)],
        );
        assert_eq!(spec.area_limit(), Some(u64::MAX));

        let spec = Specification::new(
            "Wide",
            vec![SpecRule::below("space_x", 1e10), SpecRule::below("space_y", 2.0)],
        );
        assert_eq!(spec.area_limit(), Some(20_000_000_000));
    }

    #[test]
    fn missing_dimension_gives_no_area_limit() {
        let spec = Specification::new("Half", vec![SpecRule::below("space_x", 10.0)]);
        assert_eq!(spec.area_limit(), None);
    }

    #[test]
    fn minimize_on_dimension_selects_minimized_mode() {
        let spec = Specification::new(
            "Dense",
            vec![SpecRule::minimize("Space_X"), SpecRule::maximize("processing")],
        );
        assert_eq!(spec.area_mode, AreaMode::Minimized);
    }

    #[test]
    fn explicit_area_mode_overrides_detection() {
        let spec = Specification::new("Dense", vec![SpecRule::minimize("space_x")])
            .with_area_mode(AreaMode::Constrained);
        assert_eq!(spec.area_mode, AreaMode::Constrained);
    }

    #[test]
    fn unconstrained_rules_are_not_bounds() {
        let mut rule = SpecRule::below("price", 10.0);
        assert!(rule.is_bound());
        rule.unconstrained = true;
        assert!(!rule.is_bound());
    }

    #[test]
    fn loads_spec_rows_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specs.json");
        std::fs::write(
            &path,
            r#"[
                {"spec_name": "Budget", "unit": "Price", "below_amount": 1, "amount": "5000"},
                {"spec_name": "Budget", "unit": "Processing", "maximize": true},
                {"unit": "price"}
            ]"#,
        )
        .unwrap();

        let (specs, report) = load_specs_json(&path).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].rules[0].amount, Some(5000.0));
        assert!(specs[0].rules[1].maximize);
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_dropped, 1);
    }
}
