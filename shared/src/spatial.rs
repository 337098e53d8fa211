//! Spatial hashing for fast tile lookups.
//!
//! Map layers can hold thousands of tiles. Instead of scanning all of them for every
//! probe query, each tile box is bucketed into every grid cell it touches and queries
//! only visit the cells under the query box.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::geometry::WorldBox;

/// Default grid cell size in world units. Roughly a few tiles wide.
pub const DEFAULT_CELL_SIZE: f32 = 64.0;

/// A single entry in the spatial grid.
#[derive(Clone, Debug)]
pub struct GridEntry<T> {
    pub bounds: WorldBox,
    pub value: T,
}

/// Spatial hash grid keyed by (x, y) cell. Z is ignored for bucketing.
#[derive(Clone, Debug)]
pub struct SpatialGrid<T> {
    cell_size: f32,
    /// Map from grid cell to indices of entries overlapping that cell.
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// Inclusive range of occupied cells, `None` while empty.
    occupied: Option<((i32, i32), (i32, i32))>,
    entries: Vec<GridEntry<T>>,
}

impl<T> Default for SpatialGrid<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl<T> SpatialGrid<T> {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: HashMap::new(),
            occupied: None,
            entries: Vec::new(),
        }
    }

    #[inline]
    fn world_to_cell(&self, p: Vec3) -> (i32, i32) {
        (
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
        )
    }

    /// Insert a box into every cell it overlaps.
    pub fn insert(&mut self, bounds: WorldBox, value: T) {
        let idx = self.entries.len();
        let (x0, y0) = self.world_to_cell(bounds.min);
        let (x1, y1) = self.world_to_cell(bounds.max);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(idx);
            }
        }
        self.occupied = Some(match self.occupied {
            Some((lo, hi)) => ((lo.0.min(x0), lo.1.min(y0)), (hi.0.max(x1), hi.1.max(y1))),
            None => ((x0, y0), (x1, y1)),
        });
        self.entries.push(GridEntry { bounds, value });
    }

    /// Entries whose box strictly overlaps `query`, each reported once in insertion order.
    ///
    /// Only cells inside the occupied range are visited, so oversized queries stay cheap.
    pub fn query<'a>(&'a self, query: &WorldBox) -> impl Iterator<Item = &'a GridEntry<T>> + 'a {
        let mut hits: Vec<usize> = Vec::new();
        if let Some((lo, hi)) = self.occupied {
            let (qx0, qy0) = self.world_to_cell(query.min);
            let (qx1, qy1) = self.world_to_cell(query.max);
            let (x0, x1) = (qx0.max(lo.0), qx1.min(hi.0));
            let (y0, y1) = (qy0.max(lo.1), qy1.min(hi.1));

            let mut seen: HashSet<usize> = HashSet::new();
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    let Some(indices) = self.cells.get(&(cx, cy)) else { continue };
                    for &idx in indices {
                        if seen.insert(idx) && self.entries[idx].bounds.collides(query) {
                            hits.push(idx);
                        }
                    }
                }
            }
        }
        hits.sort_unstable();
        hits.into_iter().map(move |idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.occupied = None;
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: f32, y: f32) -> WorldBox {
        WorldBox::from_corner_size(Vec3::new(x, y, -5.0), Vec3::new(16.0, 16.0, 10.0))
    }

    #[test]
    fn test_spatial_grid_basic() {
        let mut grid = SpatialGrid::new(32.0);
        grid.insert(tile(0.0, 0.0), "a");
        grid.insert(tile(160.0, 0.0), "b");

        let hits: Vec<_> = grid.query(&tile(8.0, 8.0)).map(|e| e.value).collect();
        assert_eq!(hits, vec!["a"]);

        let none: Vec<_> = grid.query(&tile(64.0, 64.0)).collect();
        assert!(none.is_empty());
    }

    #[test]
    fn test_box_spanning_cells_is_reported_once() {
        let mut grid = SpatialGrid::new(8.0);
        // 16-unit tile spans several 8-unit cells.
        grid.insert(tile(4.0, 4.0), 7u32);
        let big = WorldBox::new(Vec3::new(-100.0, -100.0, -5.0), Vec3::new(100.0, 100.0, 5.0));
        let hits: Vec<_> = grid.query(&big).map(|e| e.value).collect();
        assert_eq!(hits, vec![7]);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut grid = SpatialGrid::new(16.0);
        grid.insert(tile(-32.0, -32.0), 1u8);
        assert_eq!(grid.query(&tile(-30.0, -30.0)).count(), 1);
        assert_eq!(grid.query(&tile(0.0, 0.0)).count(), 0);
    }

    #[test]
    fn test_huge_query_only_visits_occupied_cells() {
        let mut grid = SpatialGrid::new(16.0);
        grid.insert(tile(0.0, 0.0), 'a');
        grid.insert(tile(48.0, 16.0), 'b');
        let huge = WorldBox::new(Vec3::new(-1.0e9, -1.0e9, -5.0), Vec3::new(1.0e9, 1.0e9, 5.0));
        let hits: Vec<_> = grid.query(&huge).map(|e| e.value).collect();
        assert_eq!(hits, vec!['a', 'b']);
    }

    #[test]
    fn test_query_outside_occupied_range_and_after_clear() {
        let mut grid = SpatialGrid::new(16.0);
        grid.insert(tile(0.0, 0.0), 1u8);
        assert_eq!(grid.query(&tile(500.0, 500.0)).count(), 0);
        grid.clear();
        assert_eq!(grid.query(&tile(0.0, 0.0)).count(), 0);
    }
}
