//! Uniform grid broad phase
//!
//! Entities are bucketed by the cell containing their center. Queries widen
//! the search box by the largest radius inserted this frame, so an entity whose
//! body pokes into a neighboring cell is still found. Results may include
//! entities outside the exact radius; callers do the narrow-phase test.

use std::collections::HashMap;

use glam::Vec2;

/// Grid of entity references, rebuilt every frame
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    cell_size: f32,
    buckets: HashMap<(i32, i32), Vec<T>>,
    /// Largest radius inserted since the last clear
    margin: f32,
    len: usize,
}

impl<T: Copy> SpatialGrid<T> {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            buckets: HashMap::new(),
            margin: 0.0,
            len: 0,
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Safety margin currently added to every query
    #[inline]
    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Integer cell coordinates for a point
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Empty every bucket, keeping their allocations
    pub fn clear(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
        self.margin = 0.0;
        self.len = 0;
    }

    /// Register an entity with its body radius
    pub fn insert(&mut self, item: T, pos: Vec2, radius: f32) {
        if !pos.is_finite() {
            return;
        }
        let key = self.cell_of(pos);
        self.buckets.entry(key).or_default().push(item);
        self.margin = self.margin.max(radius);
        self.len += 1;
    }

    /// Collect every entity in cells overlapping the query box into `out`
    ///
    /// `out` is cleared first. Order is cell-major, insertion order within a cell.
    pub fn query_into(&self, center: Vec2, radius: f32, out: &mut Vec<T>) {
        out.clear();
        if self.len == 0 || !center.is_finite() {
            return;
        }
        let reach = radius.max(0.0) + self.margin;
        let (min_x, min_y) = self.cell_of(center - Vec2::splat(reach));
        let (max_x, max_y) = self.cell_of(center + Vec2::splat(reach));
        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                if let Some(bucket) = self.buckets.get(&(cx, cy)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
    }

    /// Allocating convenience wrapper over `query_into`
    pub fn query(&self, center: Vec2, radius: f32) -> Vec<T> {
        let mut out = Vec::new();
        self.query_into(center, radius, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_of_uses_floor() {
        let grid: SpatialGrid<u32> = SpatialGrid::new(64.0);
        assert_eq!(grid.cell_of(Vec2::new(0.0, 0.0)), (0, 0));
        assert_eq!(grid.cell_of(Vec2::new(63.9, 64.0)), (0, 1));
        assert_eq!(grid.cell_of(Vec2::new(-0.1, -64.1)), (-1, -2));
    }

    #[test]
    fn test_query_finds_neighbor_across_cell_boundary() {
        let mut grid = SpatialGrid::new(64.0);
        grid.insert(1u32, Vec2::new(66.0, 10.0), 4.0);
        let hits = grid.query(Vec2::new(62.0, 10.0), 4.0);
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn test_large_body_found_through_margin() {
        let mut grid = SpatialGrid::new(32.0);
        // Boss-sized body centered two cells away from the probe
        grid.insert(7u32, Vec2::new(100.0, 100.0), 60.0);
        grid.insert(8u32, Vec2::new(400.0, 400.0), 2.0);
        let hits = grid.query(Vec2::new(45.0, 100.0), 2.0);
        assert_eq!(hits, vec![7]);
    }

    #[test]
    fn test_far_entities_not_returned() {
        let mut grid = SpatialGrid::new(64.0);
        grid.insert(1u32, Vec2::new(10.0, 10.0), 4.0);
        grid.insert(2u32, Vec2::new(300.0, 300.0), 4.0);
        assert_eq!(grid.query(Vec2::new(12.0, 12.0), 4.0), vec![1]);
    }

    #[test]
    fn test_insertion_order_within_cell() {
        let mut grid = SpatialGrid::new(64.0);
        for id in [5u32, 3, 9] {
            grid.insert(id, Vec2::new(20.0, 20.0), 1.0);
        }
        assert_eq!(grid.query(Vec2::new(20.0, 20.0), 1.0), vec![5, 3, 9]);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut grid = SpatialGrid::new(64.0);
        grid.insert(1u32, Vec2::new(10.0, 10.0), 40.0);
        grid.clear();
        assert!(grid.is_empty());
        assert_eq!(grid.margin(), 0.0);
        assert!(grid.query(Vec2::new(10.0, 10.0), 100.0).is_empty());
    }

    #[test]
    fn test_non_finite_positions_ignored() {
        let mut grid = SpatialGrid::new(64.0);
        grid.insert(1u32, Vec2::new(f32::NAN, 0.0), 1.0);
        assert!(grid.is_empty());
        assert!(grid.query(Vec2::new(f32::INFINITY, 0.0), 1.0).is_empty());
    }
}
