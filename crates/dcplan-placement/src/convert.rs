//! Expansion of module counts into individual instances.

use std::collections::BTreeMap;

use dcplan_core::{ModuleCatalog, ModuleDefinition, ModuleId};
use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, PlacementResult};

/// One instance of a catalog module waiting for a position.
#[derive(Debug, Clone, Copy)]
pub struct ModuleInstance<'a> {
    pub module: &'a ModuleDefinition,
    /// 0-based counter among instances of the same module.
    pub instance_index: u32,
}

impl ModuleInstance<'_> {
    pub fn area(&self) -> u64 {
        self.module.area
    }

    pub fn into_placed(self, x: u32, y: u32) -> PlacedModuleInstance {
        PlacedModuleInstance {
            module_id: self.module.id,
            name: self.module.name.clone(),
            instance_index: self.instance_index,
            x,
            y,
            width: self.module.width,
            height: self.module.height,
        }
    }

    pub fn into_unplaced(self, reason: impl Into<String>) -> UnplacedInstance {
        UnplacedInstance {
            module_id: self.module.id,
            name: self.module.name.clone(),
            instance_index: self.instance_index,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedModuleInstance {
    pub module_id: ModuleId,
    pub name: String,
    pub instance_index: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PlacedModuleInstance {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    /// Whether the two rectangles share at least one cell.
    pub fn overlaps(&self, other: &PlacedModuleInstance) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnplacedInstance {
    pub module_id: ModuleId,
    pub name: String,
    pub instance_index: u32,
    pub reason: String,
}

/// An instance pinned at `(x, y)` before the greedy pass starts. The
/// footprint comes from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPosition {
    pub module_id: ModuleId,
    pub x: u32,
    pub y: u32,
}

/// A fixed position that could not be honored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedFixed {
    #[serde(flatten)]
    pub position: FixedPosition,
    pub reason: String,
}

/// One [`ModuleInstance`] per selected unit, in module id order.
pub fn expand_instances<'a>(
    catalog: &'a ModuleCatalog,
    counts: &BTreeMap<ModuleId, u64>,
) -> PlacementResult<Vec<ModuleInstance<'a>>> {
    let mut instances = Vec::with_capacity(counts.values().sum::<u64>() as usize);
    for (id, count) in counts {
        let module = catalog.get(*id).ok_or(PlacementError::UnknownModule(*id))?;
        instances.extend((0..*count).map(|index| ModuleInstance {
            module,
            instance_index: index as u32,
        }));
    }
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModuleCatalog {
        ModuleCatalog::new([
            ModuleDefinition::from_pairs(1, "A", &[("space_x", 2.0), ("space_y", 1.0)], &[]),
            ModuleDefinition::from_pairs(2, "B", &[("space_x", 1.0), ("space_y", 1.0)], &[]),
        ])
    }

    #[test]
    fn expands_counts_into_numbered_instances() {
        let catalog = catalog();
        let counts = BTreeMap::from([(1, 2), (2, 1)]);
        let instances = expand_instances(&catalog, &counts).unwrap();
        let ids: Vec<(ModuleId, u32)> = instances
            .iter()
            .map(|i| (i.module.id, i.instance_index))
            .collect();
        assert_eq!(ids, vec![(1, 0), (1, 1), (2, 0)]);
    }

    #[test]
    fn unknown_module_is_an_error() {
        let catalog = catalog();
        let counts = BTreeMap::from([(99, 1)]);
        assert!(matches!(
            expand_instances(&catalog, &counts),
            Err(PlacementError::UnknownModule(99))
        ));
    }

    #[test]
    fn overlap_is_cell_based() {
        let catalog = catalog();
        let a = ModuleInstance { module: catalog.get(1).unwrap(), instance_index: 0 };
        let left = a.into_placed(0, 0);
        let touching = a.into_placed(2, 0);
        let covering = a.into_placed(1, 0);
        assert!(!left.overlaps(&touching));
        assert!(left.overlaps(&covering));
        assert_eq!(left.center(), (1.0, 0.5));
    }
}
