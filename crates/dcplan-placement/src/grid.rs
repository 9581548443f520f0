//! Working occupancy grid owned by the placer.

use std::collections::BTreeMap;

use dcplan_core::ModuleId;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::locker::LockMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Locked,
    Occupied { module_id: ModuleId, instance: u32 },
}

impl Cell {
    /// `0` empty, `-1` locked, the module id when occupied.
    pub fn code(&self) -> i64 {
        match self {
            Cell::Empty => 0,
            Cell::Locked => -1,
            Cell::Occupied { module_id, .. } => i64::from(*module_id),
        }
    }
}

/// Row-major `width × height` grid. Coordinates grow right (x) and down (y).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl OccupancyGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; width as usize * height as usize],
        }
    }

    /// A fresh grid with the mask's locked cells copied in.
    pub fn from_mask(mask: &LockMask) -> Self {
        let mut grid = Self::new(mask.width(), mask.height());
        for y in 0..grid.height {
            for x in 0..grid.width {
                if mask.is_locked(x, y) {
                    let index = grid.index(x, y);
                    grid.cells[index] = Cell::Locked;
                }
            }
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<Cell> {
        (x < self.width && y < self.height).then(|| self.cells[self.index(x, y)])
    }

    /// Whether a `width × height` rectangle at `(x, y)` lies inside the grid
    /// over empty cells only.
    pub fn fits(&self, x: i64, y: i64, width: u32, height: u32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        if x + i64::from(width) > i64::from(self.width) || y + i64::from(height) > i64::from(self.height) {
            return false;
        }
        let (x, y) = (x as u32, y as u32);
        (y..y + height).all(|row| (x..x + width).all(|col| self.cells[self.index(col, row)] == Cell::Empty))
    }

    /// Mark a rectangle as occupied. The caller checks [`fits`](Self::fits) first.
    pub(crate) fn occupy(&mut self, x: u32, y: u32, width: u32, height: u32, cell: Cell) {
        for row in y..y + height {
            for col in x..x + width {
                let index = self.index(col, row);
                self.cells[index] = cell;
            }
        }
    }

    pub fn locked_cells(&self) -> usize {
        self.cells.iter().filter(|cell| **cell == Cell::Locked).count()
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| matches!(cell, Cell::Occupied { .. }))
            .count()
    }

    /// Matrix `[height][width]` of cell codes.
    pub fn to_codes(&self) -> Vec<Vec<i64>> {
        self.cells
            .chunks(self.width.max(1) as usize)
            .map(|row| row.iter().map(Cell::code).collect())
            .collect()
    }

    /// Text rendering: `.` empty, `#` locked, one symbol per module id.
    pub fn render_ascii(&self) -> String {
        const SYMBOLS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut symbols: BTreeMap<ModuleId, char> = BTreeMap::new();
        for cell in &self.cells {
            if let Cell::Occupied { module_id, .. } = cell {
                let next = symbols.len();
                symbols
                    .entry(*module_id)
                    .or_insert_with(|| SYMBOLS.get(next).map(|b| *b as char).unwrap_or('?'));
            }
        }

        let mut out = String::with_capacity(self.cells.len() + self.height as usize);
        for row in self.cells.chunks(self.width.max(1) as usize) {
            for cell in row {
                out.push(match cell {
                    Cell::Empty => '.',
                    Cell::Locked => '#',
                    Cell::Occupied { module_id, .. } => symbols[module_id],
                });
            }
            out.push('\n');
        }
        if !symbols.is_empty() {
            out.push('\n');
            for (module_id, symbol) in &symbols {
                out.push_str(&format!("{symbol} = module {module_id}\n"));
            }
        }
        out
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl Serialize for OccupancyGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("OccupancyGrid", 3)?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.serialize_field("cells", &self.to_codes())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locker::RegionLocker;

    #[test]
    fn fits_respects_bounds_and_occupancy() {
        let mut grid = OccupancyGrid::new(4, 3);
        assert!(grid.fits(0, 0, 4, 3));
        assert!(!grid.fits(1, 0, 4, 1));
        assert!(!grid.fits(-1, 0, 1, 1));
        grid.occupy(1, 1, 2, 1, Cell::Occupied { module_id: 9, instance: 0 });
        assert!(!grid.fits(0, 0, 2, 2));
        assert!(grid.fits(0, 2, 4, 1));
        assert_eq!(grid.occupied_cells(), 2);
    }

    #[test]
    fn mask_cells_become_locked() {
        let mut locker = RegionLocker::new(3, 3);
        locker.add_region(0, 0, 1, 3);
        let grid = OccupancyGrid::from_mask(locker.mask());
        assert_eq!(grid.locked_cells(), 3);
        assert_eq!(grid.cell(0, 2), Some(Cell::Locked));
        assert!(!grid.fits(0, 0, 1, 1));
        assert_eq!(grid.cell(3, 0), None);
    }

    #[test]
    fn codes_and_ascii_agree() {
        let mut grid = OccupancyGrid::new(3, 2);
        grid.occupy(0, 0, 2, 1, Cell::Occupied { module_id: 12, instance: 0 });
        grid.occupy(2, 1, 1, 1, Cell::Locked);
        assert_eq!(grid.to_codes(), vec![vec![12, 12, 0], vec![0, 0, -1]]);
        assert!(grid.render_ascii().starts_with("AA.\n..#\n"));
        assert!(grid.render_ascii().contains("A = module 12"));
    }

    #[test]
    fn serializes_as_code_matrix() {
        let grid = OccupancyGrid::new(2, 1);
        let json = serde_json::to_value(&grid).unwrap();
        assert_eq!(json["width"], 2);
        assert_eq!(json["cells"], serde_json::json!([[0, 0]]));
    }
}
