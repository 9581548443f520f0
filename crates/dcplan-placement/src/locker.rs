//! Locked regions: rectangles of the site excluded from placement.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A locked rectangle, already clamped to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Per-cell lock flags in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockMask {
    width: u32,
    height: u32,
    locked: Vec<bool>,
}

impl LockMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            locked: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_locked(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.locked[self.index(x, y)]
    }

    pub fn locked_cells(&self) -> usize {
        self.locked.iter().filter(|cell| **cell).count()
    }

    /// Matrix `[height][width]` with `-1` for locked cells and `0` otherwise.
    pub fn to_codes(&self) -> Vec<Vec<i64>> {
        self.locked
            .chunks(self.width.max(1) as usize)
            .map(|row| row.iter().map(|locked| if *locked { -1 } else { 0 }).collect())
            .collect()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn lock(&mut self, region: &LockedRegion) {
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                let index = self.index(x, y);
                self.locked[index] = true;
            }
        }
    }
}

/// Accumulates locked rectangles for a `width × height` grid.
#[derive(Debug, Clone)]
pub struct RegionLocker {
    regions: Vec<LockedRegion>,
    mask: LockMask,
}

impl RegionLocker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            regions: Vec::new(),
            mask: LockMask::new(width, height),
        }
    }

    /// Lock a rectangle given by any corner and a signed size.
    ///
    /// Both corners are clamped to the grid. Returns the region actually
    /// locked, or `None` when nothing of it lies inside the grid. Overlapping
    /// an existing lock is harmless.
    pub fn add_region(&mut self, x: i64, y: i64, width: i64, height: i64) -> Option<LockedRegion> {
        let clamp_x = |v: i64| v.clamp(0, i64::from(self.mask.width)) as u32;
        let clamp_y = |v: i64| v.clamp(0, i64::from(self.mask.height)) as u32;
        let (x1, x2) = (clamp_x(x), clamp_x(x.saturating_add(width)));
        let (y1, y2) = (clamp_y(y), clamp_y(y.saturating_add(height)));

        let region = LockedRegion {
            x: x1.min(x2),
            y: y1.min(y2),
            width: x1.abs_diff(x2),
            height: y1.abs_diff(y2),
        };
        if region.width == 0 || region.height == 0 {
            debug!(x, y, width, height, "lock request lies outside the grid, ignored");
            return None;
        }

        self.mask.lock(&region);
        self.regions.push(region);
        debug!(
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            locked_cells = self.mask.locked_cells(),
            "region locked"
        );
        Some(region)
    }

    pub fn clear_all(&mut self) {
        self.regions.clear();
        self.mask = LockMask::new(self.mask.width, self.mask.height);
    }

    pub fn regions(&self) -> &[LockedRegion] {
        &self.regions
    }

    pub fn mask(&self) -> &LockMask {
        &self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_cells_and_records_region() {
        let mut locker = RegionLocker::new(6, 4);
        let region = locker.add_region(1, 1, 2, 2).unwrap();
        assert_eq!(region, LockedRegion { x: 1, y: 1, width: 2, height: 2 });
        assert_eq!(locker.mask().locked_cells(), 4);
        assert!(locker.mask().is_locked(2, 2));
        assert!(!locker.mask().is_locked(3, 2));
        assert_eq!(locker.regions().len(), 1);
    }

    #[test]
    fn clamps_to_grid_bounds() {
        let mut locker = RegionLocker::new(5, 5);
        let region = locker.add_region(-2, 3, 4, 10).unwrap();
        assert_eq!(region, LockedRegion { x: 0, y: 3, width: 2, height: 2 });
        assert_eq!(locker.mask().locked_cells(), 4);
    }

    #[test]
    fn negative_sizes_select_from_the_other_corner() {
        let mut locker = RegionLocker::new(5, 5);
        let region = locker.add_region(4, 4, -2, -3).unwrap();
        assert_eq!(region, LockedRegion { x: 2, y: 1, width: 2, height: 3 });
    }

    #[test]
    fn empty_or_outside_requests_are_ignored() {
        let mut locker = RegionLocker::new(5, 5);
        assert!(locker.add_region(7, 7, 2, 2).is_none());
        assert!(locker.add_region(1, 1, 0, 3).is_none());
        assert!(locker.regions().is_empty());
    }

    #[test]
    fn overlapping_locks_do_not_double_count() {
        let mut locker = RegionLocker::new(4, 4);
        locker.add_region(0, 0, 2, 2);
        locker.add_region(0, 0, 2, 2);
        assert_eq!(locker.regions().len(), 2);
        assert_eq!(locker.mask().locked_cells(), 4);
    }

    #[test]
    fn clear_all_resets_everything() {
        let mut locker = RegionLocker::new(3, 3);
        locker.add_region(0, 0, 3, 3);
        locker.clear_all();
        assert!(locker.regions().is_empty());
        assert_eq!(locker.mask().locked_cells(), 0);
        assert_eq!(locker.mask().to_codes(), vec![vec![0; 3]; 3]);
    }

    #[test]
    fn codes_mark_locked_cells_negative() {
        let mut locker = RegionLocker::new(3, 2);
        locker.add_region(2, 0, 1, 2);
        assert_eq!(locker.mask().to_codes(), vec![vec![0, 0, -1], vec![0, 0, -1]]);
    }
}
