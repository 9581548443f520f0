//! Greedy placement engine.
//!
//! Given the selected module counts and a site grid, the placer:
//! 0. Reserves the cells of any fixed positions and deducts them from the
//!    counts
//! 1. Seeds the largest instance at the first free scanline position
//! 2. Repeatedly places the instance that can sit closest (connectivity
//!    weighted) to what is already placed, trying the four positions flush
//!    against each placed anchor
//! 3. Falls back to the free position that keeps the bounding box smallest
//!    when no coupled instance has an adjacent slot
//!
//! Single pass, no backtracking. Instances that fit nowhere are reported as
//! unplaced; locked cells, grid bounds and collisions are never violated.

use std::collections::BTreeMap;
use std::time::Instant;

use dcplan_core::{ModuleCatalog, ModuleDefinition, ModuleId, PlacementConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::connectivity::{
    ConnectivityMatrix, ResourceConnection, connectivity_matrix, resource_connections,
};
use crate::convert::{
    FixedPosition, ModuleInstance, PlacedModuleInstance, RejectedFixed, UnplacedInstance,
    expand_instances,
};
use crate::error::{PlacementError, PlacementResult};
use crate::grid::{Cell, OccupancyGrid};
use crate::locker::LockMask;
use crate::scorer::{PlacementScore, bounding_box, center_distance, score_placement};

/// Added to pair connectivity before dividing distances by it.
const CONNECTIVITY_OFFSET: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    /// Every instance has a position.
    Complete,
    /// Some instances could not be placed.
    Partial,
    /// The largest instance could not be seeded; nothing was placed.
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementOutcome {
    pub status: PlacementStatus,
    /// Fixed instances first, then the rest in placement order.
    pub placed: Vec<PlacedModuleInstance>,
    /// How many leading entries of `placed` came from fixed positions.
    pub fixed: usize,
    pub rejected_fixed: Vec<RejectedFixed>,
    pub unplaced: Vec<UnplacedInstance>,
    pub grid: OccupancyGrid,
    pub score: PlacementScore,
    pub connections: Vec<ResourceConnection>,
    pub message: String,
}

/// Lay out `counts` instances of catalog modules on a `width × height` grid.
///
/// `locks` is copied into the working grid; the caller's mask is never
/// modified. Each accepted `fixed` position reserves its cells before the
/// greedy pass and counts against `counts` for its module. Fixed positions
/// that leave the grid or collide with a lock or an earlier fixed position
/// are rejected and reported in [`PlacementOutcome::rejected_fixed`].
pub fn place(
    catalog: &ModuleCatalog,
    counts: &BTreeMap<ModuleId, u64>,
    width: u32,
    height: u32,
    locks: Option<&LockMask>,
    fixed: &[FixedPosition],
    config: &PlacementConfig,
) -> PlacementResult<PlacementOutcome> {
    if width == 0 || height == 0 {
        return Err(PlacementError::EmptyGrid { width, height });
    }
    let mut grid = match locks {
        Some(mask) if mask.width() != width || mask.height() != height => {
            return Err(PlacementError::MaskSize {
                mask_width: mask.width(),
                mask_height: mask.height(),
                width,
                height,
            });
        }
        Some(mask) => OccupancyGrid::from_mask(mask),
        None => OccupancyGrid::new(width, height),
    };

    let started = Instant::now();
    let (fixed_placed, rejected_fixed) = reserve_fixed(catalog, fixed, &mut grid);
    let mut fixed_counts: BTreeMap<ModuleId, u32> = BTreeMap::new();
    for p in &fixed_placed {
        *fixed_counts.entry(p.module_id).or_default() += 1;
    }
    let remaining = remaining_counts(counts, &fixed_counts);

    let mut instances = expand_instances(catalog, &remaining)?;
    for instance in &mut instances {
        instance.instance_index += fixed_counts.get(&instance.module.id).copied().unwrap_or(0);
    }
    info!(
        instances = instances.len(),
        fixed = fixed_placed.len(),
        width,
        height,
        locked_cells = grid.locked_cells(),
        "starting placement"
    );

    let mut engine = Engine::new(&instances, grid);
    let seeded = engine.run();

    let fixed_len = fixed_placed.len();
    let mut placed = fixed_placed;
    placed.extend(
        engine
            .order_placed
            .iter()
            .filter_map(|i| engine.positions[*i].map(|(x, y)| instances[*i].into_placed(x, y))),
    );
    let unplaced: Vec<UnplacedInstance> = engine
        .unplaced
        .iter()
        .map(|(i, reason)| instances[*i].into_unplaced(reason.clone()))
        .collect();

    let placed_modules: Vec<&ModuleDefinition> =
        placed.iter().filter_map(|p| catalog.get(p.module_id)).collect();
    let score = score_placement(
        &placed,
        &connectivity_matrix(&placed_modules),
        width,
        height,
        config,
    );
    let connections = resource_connections(catalog, &placed);

    let status = if !seeded {
        PlacementStatus::Failed
    } else if unplaced.is_empty() && rejected_fixed.is_empty() {
        PlacementStatus::Complete
    } else {
        PlacementStatus::Partial
    };
    let mut message = match status {
        PlacementStatus::Complete => format!("placed all {} instances", placed.len()),
        PlacementStatus::Partial => format!(
            "placed {} of {} instances; {} could not fit",
            placed.len(),
            instances.len() + fixed_len,
            unplaced.len()
        ),
        PlacementStatus::Failed if fixed_len > 0 => {
            "the largest instance fits nowhere on the grid; only fixed instances were placed"
                .to_string()
        }
        PlacementStatus::Failed => {
            "the largest instance fits nowhere on the grid; nothing was placed".to_string()
        }
    };
    if !rejected_fixed.is_empty() {
        message.push_str(&format!("; {} fixed positions rejected", rejected_fixed.len()));
    }

    info!(
        ?status,
        placed = placed.len(),
        unplaced = unplaced.len(),
        rejected_fixed = rejected_fixed.len(),
        score = score.total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "placement finished"
    );

    Ok(PlacementOutcome {
        status,
        placed,
        fixed: fixed_len,
        rejected_fixed,
        unplaced,
        grid: engine.grid,
        score,
        connections,
        message,
    })
}

/// Occupy the cells of every acceptable fixed position, in input order.
fn reserve_fixed(
    catalog: &ModuleCatalog,
    fixed: &[FixedPosition],
    grid: &mut OccupancyGrid,
) -> (Vec<PlacedModuleInstance>, Vec<RejectedFixed>) {
    let mut accepted: Vec<PlacedModuleInstance> = Vec::with_capacity(fixed.len());
    let mut rejected = Vec::new();
    let mut next_index: BTreeMap<ModuleId, u32> = BTreeMap::new();

    for position in fixed {
        let (x, y) = (position.x, position.y);
        let verdict = match catalog.get(position.module_id) {
            None => Err("module is not in the catalog"),
            Some(module) if !module.is_placeable() => Err("module has no footprint"),
            Some(module)
                if u64::from(x) + u64::from(module.width) > u64::from(grid.width())
                    || u64::from(y) + u64::from(module.height) > u64::from(grid.height()) =>
            {
                Err("position lies outside the grid")
            }
            Some(module) if !grid.fits(i64::from(x), i64::from(y), module.width, module.height) => {
                Err("position overlaps a locked cell or another fixed instance")
            }
            Some(module) => Ok(module),
        };

        let module = match verdict {
            Ok(module) => module,
            Err(reason) => {
                warn!(module_id = position.module_id, x, y, %reason, "fixed position rejected");
                rejected.push(RejectedFixed {
                    position: *position,
                    reason: reason.to_string(),
                });
                continue;
            }
        };

        let index = next_index.entry(module.id).or_default();
        let instance = ModuleInstance {
            module,
            instance_index: *index,
        };
        *index += 1;
        grid.occupy(
            x,
            y,
            module.width,
            module.height,
            Cell::Occupied {
                module_id: module.id,
                instance: instance.instance_index,
            },
        );
        debug!(module_id = module.id, instance = instance.instance_index, x, y, "fixed instance reserved");
        accepted.push(instance.into_placed(x, y));
    }
    (accepted, rejected)
}

/// Selected counts minus the instances already fixed; modules whose count
/// drops to zero are removed.
fn remaining_counts(
    counts: &BTreeMap<ModuleId, u64>,
    fixed_counts: &BTreeMap<ModuleId, u32>,
) -> BTreeMap<ModuleId, u64> {
    let mut remaining = counts.clone();
    for (id, fixed) in fixed_counts {
        match remaining.get_mut(id) {
            Some(count) => *count = count.saturating_sub(u64::from(*fixed)),
            None => warn!(module_id = id, fixed, "fixed module is not among the selected counts"),
        }
    }
    remaining.retain(|_, count| *count > 0);
    remaining
}

/// Mutable state of one placement run, indexed by instance.
struct Engine<'i, 'a> {
    instances: &'i [ModuleInstance<'a>],
    connectivity: ConnectivityMatrix,
    grid: OccupancyGrid,
    positions: Vec<Option<(u32, u32)>>,
    /// Placeable instances, largest first.
    order: Vec<usize>,
    order_placed: Vec<usize>,
    unplaced: Vec<(usize, String)>,
    skipped: Vec<bool>,
}

impl<'i, 'a> Engine<'i, 'a> {
    fn new(instances: &'i [ModuleInstance<'a>], grid: OccupancyGrid) -> Self {
        let modules: Vec<&ModuleDefinition> = instances.iter().map(|i| i.module).collect();
        let mut engine = Self {
            instances,
            connectivity: connectivity_matrix(&modules),
            grid,
            positions: vec![None; instances.len()],
            order: Vec::with_capacity(instances.len()),
            order_placed: Vec::with_capacity(instances.len()),
            unplaced: Vec::new(),
            skipped: vec![false; instances.len()],
        };

        for (index, instance) in instances.iter().enumerate() {
            if instance.module.is_placeable() {
                engine.order.push(index);
            } else {
                warn!(
                    module_id = instance.module.id,
                    instance = instance.instance_index,
                    "module has no footprint, instance skipped"
                );
                engine.skip(index, "module has no footprint");
            }
        }
        // Stable: equal areas keep expansion order.
        engine
            .order
            .sort_by(|a, b| instances[*b].area().cmp(&instances[*a].area()));
        engine
    }

    /// Returns false when the seed could not be placed.
    fn run(&mut self) -> bool {
        let Some(&seed) = self.order.first() else {
            return true;
        };
        match self.scan_first_fit(seed) {
            Some((x, y)) => self.commit(seed, x, y),
            None => {
                let (width, height) = self.size(seed);
                warn!(
                    module_id = self.instances[seed].module.id,
                    width,
                    height,
                    "largest instance fits nowhere, placement aborted"
                );
                for index in self.order.clone() {
                    self.skip(index, "placement aborted: the largest instance fits nowhere");
                }
                return false;
            }
        }

        loop {
            let Some(next) = self.pending().next() else {
                break;
            };
            if let Some((index, x, y)) = self.best_adjacent() {
                self.commit(index, x, y);
                continue;
            }
            match self.most_compact(next) {
                Some((x, y)) => self.commit(next, x, y),
                None => {
                    let module = self.instances[next].module;
                    warn!(
                        module_id = module.id,
                        module = %module.name,
                        instance = self.instances[next].instance_index,
                        "no free position, instance skipped"
                    );
                    self.skip(next, "no free position on the grid");
                }
            }
        }
        true
    }

    /// Unplaced, unskipped instances in size order.
    fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        self.order
            .iter()
            .copied()
            .filter(|i| self.positions[*i].is_none() && !self.skipped[*i])
    }

    fn size(&self, index: usize) -> (u32, u32) {
        let module = self.instances[index].module;
        (module.width, module.height)
    }

    fn commit(&mut self, index: usize, x: u32, y: u32) {
        let (w, h) = self.size(index);
        let instance = &self.instances[index];
        self.grid.occupy(
            x,
            y,
            w,
            h,
            Cell::Occupied {
                module_id: instance.module.id,
                instance: instance.instance_index,
            },
        );
        self.positions[index] = Some((x, y));
        self.order_placed.push(index);
        debug!(
            module_id = instance.module.id,
            module = %instance.module.name,
            instance = instance.instance_index,
            x,
            y,
            "instance placed"
        );
    }

    fn skip(&mut self, index: usize, reason: &str) {
        self.skipped[index] = true;
        self.unplaced.push((index, reason.to_string()));
    }

    fn placed_rect(&self, index: usize) -> Option<PlacedModuleInstance> {
        self.positions[index].map(|(x, y)| self.instances[index].into_placed(x, y))
    }

    /// First free position in row-major scan order.
    fn scan_first_fit(&self, index: usize) -> Option<(u32, u32)> {
        let (w, h) = self.size(index);
        let (gw, gh) = (self.grid.width(), self.grid.height());
        if w > gw || h > gh {
            return None;
        }
        (0..=gh - h)
            .flat_map(|y| (0..=gw - w).map(move |x| (x, y)))
            .find(|(x, y)| self.grid.fits(i64::from(*x), i64::from(*y), w, h))
    }

    /// Among pending instances coupled to the placed set, the one whose best
    /// anchor-adjacent position has the lowest connectivity-weighted distance
    /// to everything placed.
    fn best_adjacent(&self) -> Option<(usize, u32, u32)> {
        let placed: Vec<(usize, PlacedModuleInstance)> = self
            .order_placed
            .iter()
            .filter_map(|j| self.placed_rect(*j).map(|rect| (*j, rect)))
            .collect();

        let mut best: Option<(usize, u32, u32, f64)> = None;
        for candidate in self.pending() {
            if self.connectivity.total_to(candidate, placed.iter().map(|(j, _)| *j)) <= 0.0 {
                continue;
            }
            let (w, h) = self.size(candidate);
            let mut candidate_best: Option<(u32, u32, f64)> = None;

            for (_, anchor) in &placed {
                let (ax, ay) = (i64::from(anchor.x), i64::from(anchor.y));
                let slots = [
                    (ax + i64::from(anchor.width), ay),
                    (ax, ay + i64::from(anchor.height)),
                    (ax - i64::from(w), ay),
                    (ax, ay - i64::from(h)),
                ];
                for (x, y) in slots {
                    if !self.grid.fits(x, y, w, h) {
                        continue;
                    }
                    let trial = self.instances[candidate].into_placed(x as u32, y as u32);
                    let cost: f64 = placed
                        .iter()
                        .map(|(j, other)| {
                            center_distance(&trial, other)
                                / (self.connectivity.get(candidate, *j) + CONNECTIVITY_OFFSET)
                        })
                        .sum();
                    if candidate_best.is_none_or(|(_, _, c)| cost < c) {
                        candidate_best = Some((x as u32, y as u32, cost));
                    }
                }
            }

            if let Some((x, y, cost)) = candidate_best {
                if best.is_none_or(|(_, _, _, c)| cost < c) {
                    best = Some((candidate, x, y, cost));
                }
            }
        }
        best.map(|(index, x, y, _)| (index, x, y))
    }

    /// Free position that keeps the bounding box of everything placed smallest.
    fn most_compact(&self, index: usize) -> Option<(u32, u32)> {
        let (w, h) = self.size(index);
        let (gw, gh) = (self.grid.width(), self.grid.height());
        if w > gw || h > gh {
            return None;
        }
        let current = bounding_box(
            self.order_placed
                .iter()
                .filter_map(|j| self.placed_rect(*j))
                .map(|p| (p.x, p.y, p.width, p.height)),
        );

        let mut best: Option<(u32, u32, u64)> = None;
        for y in 0..=gh - h {
            for x in 0..=gw - w {
                if !self.grid.fits(i64::from(x), i64::from(y), w, h) {
                    continue;
                }
                let (x0, y0, x1, y1) = match current {
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + w), y1.max(y + h)),
                    None => (x, y, x + w, y + h),
                };
                let area = u64::from(x1 - x0) * u64::from(y1 - y0);
                if best.is_none_or(|(_, _, a)| area < a) {
                    best = Some((x, y, area));
                }
            }
        }
        best.map(|(x, y, _)| (x, y))
    }
}
