//! Ember Physics - Overlap queries for combat targeting
//!
//! The combat engine only ever asks one question of the physics layer:
//! "which bodies overlap this shape and pass this predicate?". [`SpatialQuery`]
//! is that contract; [`SpatialIndex`] answers it with a uniform grid over the
//! ground plane.

mod shape;

pub use shape::{distance_to_segment, Body, Shape};

use std::collections::HashMap;

use ember_core::EntityId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Anything that can answer overlap queries
pub trait SpatialQuery {
    /// Ids of the bodies overlapping `shape` that `filter` accepts, nearest to
    /// [`Shape::origin`] first. Ties are broken by id so results are stable.
    fn overlapping(&self, shape: &Shape, filter: &mut dyn FnMut(EntityId) -> bool) -> Vec<EntityId>;
}

/// Errors raised by the scene index
#[derive(Debug, Clone, thiserror::Error)]
pub enum SpatialError {
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(f32),
}

/// Scene index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Edge length of a grid cell in meters
    pub cell_size: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self { cell_size: 8.0 }
    }
}

/// Grid coordinate on the XZ plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

impl CellCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Convert a world position to the cell that contains it
    pub fn from_world_pos(pos: Vec3, cell_size: f32) -> Self {
        Self {
            x: (pos.x / cell_size).floor() as i32,
            z: (pos.z / cell_size).floor() as i32,
        }
    }
}

/// Uniform-grid broad phase with an exact narrow phase per candidate
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    config: SpatialConfig,
    bodies: HashMap<EntityId, (Body, CellCoord)>,
    cells: HashMap<CellCoord, Vec<EntityId>>,
    /// Largest body radius ever inserted; widens the broad-phase search
    max_body_radius: f32,
}

impl SpatialIndex {
    /// Create an index with the default configuration
    pub fn new() -> Self {
        Self {
            config: SpatialConfig::default(),
            bodies: HashMap::new(),
            cells: HashMap::new(),
            max_body_radius: 0.0,
        }
    }

    /// Create an index with a custom configuration
    pub fn with_config(config: SpatialConfig) -> Result<Self, SpatialError> {
        if !(config.cell_size > 0.0) {
            return Err(SpatialError::InvalidCellSize(config.cell_size));
        }
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Insert a body, replacing any previous body with the same id
    pub fn insert(&mut self, id: EntityId, body: Body) {
        self.remove(id);
        let cell = CellCoord::from_world_pos(body.position, self.config.cell_size);
        self.cells.entry(cell).or_default().push(id);
        self.bodies.insert(id, (body, cell));
        self.max_body_radius = self.max_body_radius.max(body.radius);
    }

    /// Move a body. Returns false if the id is unknown.
    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> bool {
        let Some((body, cell)) = self.bodies.get_mut(&id) else {
            return false;
        };
        body.position = position;
        let new_cell = CellCoord::from_world_pos(position, self.config.cell_size);
        if new_cell != *cell {
            let old_cell = *cell;
            *cell = new_cell;
            self.detach(id, old_cell);
            self.cells.entry(new_cell).or_default().push(id);
        }
        true
    }

    /// Remove a body, returning it if it was present
    pub fn remove(&mut self, id: EntityId) -> Option<Body> {
        let (body, cell) = self.bodies.remove(&id)?;
        self.detach(id, cell);
        Some(body)
    }

    fn detach(&mut self, id: EntityId, cell: CellCoord) {
        if let Some(ids) = self.cells.get_mut(&cell) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Get a body by id
    pub fn get(&self, id: EntityId) -> Option<&Body> {
        self.bodies.get(&id).map(|(body, _)| body)
    }

    /// Number of indexed bodies
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Candidate ids for a query over `lo..=hi`. Falls back to every body when
    /// the span covers more cells than there are bodies.
    fn candidates(&self, lo: CellCoord, hi: CellCoord) -> Vec<EntityId> {
        let span_x = i64::from(hi.x) - i64::from(lo.x) + 1;
        let span_z = i64::from(hi.z) - i64::from(lo.z) + 1;
        let cell_count = span_x.max(0).saturating_mul(span_z.max(0));
        if cell_count > self.bodies.len() as i64 {
            return self.bodies.keys().copied().collect();
        }

        let mut ids = Vec::new();
        for x in lo.x..=hi.x {
            for z in lo.z..=hi.z {
                if let Some(cell) = self.cells.get(&CellCoord::new(x, z)) {
                    ids.extend_from_slice(cell);
                }
            }
        }
        ids
    }
}

impl SpatialQuery for SpatialIndex {
    fn overlapping(&self, shape: &Shape, filter: &mut dyn FnMut(EntityId) -> bool) -> Vec<EntityId> {
        let (min, max) = shape.bounds();
        let pad = Vec3::splat(self.max_body_radius);
        let lo = CellCoord::from_world_pos(min - pad, self.config.cell_size);
        let hi = CellCoord::from_world_pos(max + pad, self.config.cell_size);

        let origin = shape.origin();
        let mut hits: Vec<(f32, EntityId)> = Vec::new();
        for id in self.candidates(lo, hi) {
            let Some((body, _)) = self.bodies.get(&id) else {
                continue;
            };
            if shape.overlaps(body) && filter(id) {
                hits.push((origin.distance(body.position), id));
            }
        }

        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> (SpatialIndex, Vec<EntityId>) {
        let mut index = SpatialIndex::new();
        let ids: Vec<EntityId> = (0..5).map(|_| EntityId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            index.insert(*id, Body::new(Vec3::new(i as f32 * 3.0, 0.0, 0.0), 0.5));
        }
        (index, ids)
    }

    #[test]
    fn test_query_orders_by_distance() {
        let (index, ids) = populated();
        let found = index.overlapping(&Shape::sphere(Vec3::new(12.0, 0.0, 0.0), 7.0), &mut |_| true);
        assert_eq!(found, vec![ids[4], ids[3], ids[2]]);
    }

    #[test]
    fn test_filter_is_applied() {
        let (index, ids) = populated();
        let skip = ids[1];
        let found = index.overlapping(&Shape::sphere(Vec3::ZERO, 4.0), &mut |id| id != skip);
        assert_eq!(found, vec![ids[0]]);
    }

    #[test]
    fn test_move_across_cells() {
        let (mut index, ids) = populated();
        assert!(index.set_position(ids[0], Vec3::new(100.0, 0.0, 100.0)));
        let near_origin = index.overlapping(&Shape::sphere(Vec3::ZERO, 1.0), &mut |_| true);
        assert!(near_origin.is_empty());
        let far = index.overlapping(&Shape::sphere(Vec3::new(100.0, 0.0, 100.0), 1.0), &mut |_| true);
        assert_eq!(far, vec![ids[0]]);
    }

    #[test]
    fn test_remove() {
        let (mut index, ids) = populated();
        assert!(index.remove(ids[2]).is_some());
        assert!(index.remove(ids[2]).is_none());
        assert!(!index.set_position(ids[2], Vec3::ZERO));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_grid_matches_brute_force() {
        let mut index = SpatialIndex::with_config(SpatialConfig { cell_size: 2.0 }).unwrap();
        let mut bodies = Vec::new();
        for x in -6..6 {
            for z in -6..6 {
                let id = EntityId::new();
                let body = Body::new(Vec3::new(x as f32 * 1.7, 0.0, z as f32 * 1.3), 0.4);
                index.insert(id, body);
                bodies.push((id, body));
            }
        }
        let shapes = [
            Shape::sphere(Vec3::new(1.0, 0.0, -2.0), 3.5),
            Shape::cone(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0), 6.0, 60.0),
            Shape::capsule(Vec3::new(-8.0, 0.0, 0.0), Vec3::new(8.0, 0.0, 1.0), 0.3),
        ];
        for shape in &shapes {
            let mut expected: Vec<EntityId> = bodies
                .iter()
                .filter(|(_, body)| shape.overlaps(body))
                .map(|(id, _)| *id)
                .collect();
            let mut found = index.overlapping(shape, &mut |_| true);
            expected.sort();
            found.sort();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_huge_query_scans_bodies_directly() {
        let (index, ids) = populated();
        let lo = CellCoord::from_world_pos(Vec3::splat(-40_000.0), 8.0);
        let hi = CellCoord::from_world_pos(Vec3::splat(40_000.0), 8.0);
        assert_eq!(index.candidates(lo, hi).len(), ids.len());

        let found = index.overlapping(&Shape::sphere(Vec3::ZERO, 40_000.0), &mut |_| true);
        assert_eq!(found, ids);
        let everywhere = index.overlapping(&Shape::sphere(Vec3::ZERO, f32::INFINITY), &mut |_| true);
        assert_eq!(everywhere.len(), ids.len());
    }

    #[test]
    fn test_small_query_stays_on_the_grid() {
        let (index, ids) = populated();
        let cell = CellCoord::from_world_pos(Vec3::ZERO, 8.0);
        assert_eq!(index.candidates(cell, cell), vec![ids[0], ids[1], ids[2]]);
    }

    #[test]
    fn test_invalid_cell_size() {
        assert!(SpatialIndex::with_config(SpatialConfig { cell_size: 0.0 }).is_err());
    }
}
