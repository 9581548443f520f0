//! Resource-unit taxonomy.
//!
//! Every unit name that appears in a catalog or a specification falls into
//! exactly one [`ResourceKind`]. The optimizer, the verifier and the placer
//! all branch on the kind instead of re-checking list membership.

use serde::{Deserialize, Serialize};

/// Externally supplied, never produced.
pub const INPUT_RESOURCES: &[&str] = &["price", "grid_connection", "water_connection"];

/// Externally consumed, useful outputs.
pub const OUTPUT_RESOURCES: &[&str] = &["external_network", "data_storage", "processing"];

/// Produced and consumed inside the datacenter; must balance.
pub const INTERNAL_RESOURCES: &[&str] = &[
    "usable_power",
    "fresh_water",
    "distilled_water",
    "chilled_water",
    "internal_network",
];

/// Footprint rows; only used to derive module area.
pub const DIMENSION_RESOURCES: &[&str] = &[SPACE_X, SPACE_Y];

pub const SPACE_X: &str = "space_x";
pub const SPACE_Y: &str = "space_y";

/// Pseudo-unit naming the total-area objective term in the weight table.
pub const TOTAL_AREA: &str = "total_area";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Input,
    Output,
    Internal,
    Dimension,
    Unknown,
}

impl ResourceKind {
    /// Classify a standardized unit name.
    pub fn classify(unit: &str) -> Self {
        if INPUT_RESOURCES.contains(&unit) {
            ResourceKind::Input
        } else if OUTPUT_RESOURCES.contains(&unit) {
            ResourceKind::Output
        } else if INTERNAL_RESOURCES.contains(&unit) {
            ResourceKind::Internal
        } else if DIMENSION_RESOURCES.contains(&unit) {
            ResourceKind::Dimension
        } else {
            ResourceKind::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Input => "input",
            ResourceKind::Output => "output",
            ResourceKind::Internal => "internal",
            ResourceKind::Dimension => "dimension",
            ResourceKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalize a unit name to `lowercase_with_underscores`.
///
/// Returns `None` for blank names.
pub fn standardize_unit_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase().replace(' ', "_"))
}
