//! Grid-cached containment queries over an area.
//!
//! `Polygon::contains` is far too slow to call once per node over millions
//! of nodes. `FastArea` lays a fixed grid over the area's bounding box and
//! classifies each cell on first touch: fully outside, fully inside, or
//! partial with the clipped sub-geometry cached. Full and empty cells
//! answer in O(1); only partial cells fall back to exact containment, and
//! against a much smaller geometry than the whole area.
//!
//! Covers semantics: a point on the area border is covered. A way is
//! covered when any of its loaded nodes is covered; a way that crosses the
//! area without a single node inside it is treated as not covered, which
//! is a documented approximation of this cache, not a defect.

use std::ops::ControlFlow;

use geo::{BooleanOps, Contains, Intersects, MultiPolygon, Point};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashSet;

use crate::error::{OsmemoryError, Result};
use crate::geometry::area::Area;
use crate::geometry::bbox::BoundingBox;
use crate::geometry::extended_way::ExtendedWay;
use crate::geometry::helper::box_rect;
use crate::object::{to_degrees, NodeHandle, ObjectRef, OsmRelation, OsmWay, TaggedObject};
use crate::storage::MemoryStorage;

/// Default grid resolution per axis (400 cells).
pub const DEFAULT_GRID: usize = 20;

enum CellState {
    Empty,
    Full,
    Partial(MultiPolygon<f64>),
}

/// Containment cache over one area, tied to the storage used to resolve
/// way and relation members.
pub struct FastArea<'a> {
    storage: &'a MemoryStorage,
    geom: MultiPolygon<f64>,
    grid: usize,
    // grid bounds and steps in fixed-point units
    min_x: i64,
    max_x: i64,
    min_y: i64,
    max_y: i64,
    step_x: i64,
    step_y: i64,
    cells: Vec<OnceCell<CellState>>,
}

impl<'a> FastArea<'a> {
    pub fn new(area: &Area, storage: &'a MemoryStorage) -> Result<Self> {
        Self::with_grid(area, storage, DEFAULT_GRID)
    }

    /// Build the cache for a way's or relation's reconstructed area.
    pub fn from_object(storage: &'a MemoryStorage, object: ObjectRef<'_>) -> Result<Self> {
        Self::new(&Area::from_object(storage, object)?, storage)
    }

    pub fn with_grid(area: &Area, storage: &'a MemoryStorage, grid: usize) -> Result<Self> {
        if grid == 0 {
            return Err(OsmemoryError::InvalidInput(
                "grid resolution must be positive".to_owned(),
            ));
        }
        let bbox = area.bounding_box();
        if bbox.is_empty() {
            return Err(OsmemoryError::InvalidInput(
                "empty area geometry".to_owned(),
            ));
        }
        let min_x = bbox.min_lon as i64 - 1;
        let max_x = bbox.max_lon as i64 + 1;
        let min_y = bbox.min_lat as i64 - 1;
        let max_y = bbox.max_lat as i64 + 1;
        let step_x = (max_x - min_x) / grid as i64 + 1;
        let step_y = (max_y - min_y) / grid as i64 + 1;
        let mut cells = Vec::with_capacity(grid * grid);
        cells.resize_with(grid * grid, OnceCell::new);
        Ok(Self {
            storage,
            geom: area.geometry().clone(),
            grid,
            min_x,
            max_x,
            min_y,
            max_y,
            step_x,
            step_y,
            cells,
        })
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geom
    }

    /// Cheap bounding-box overlap pre-check, usable before a full
    /// `covers` call.
    pub fn may_cover(&self, bbox: &BoundingBox) -> bool {
        if self.max_x < bbox.min_lon as i64 {
            return false;
        }
        if self.min_x > bbox.max_lon as i64 {
            return false;
        }
        if self.max_y < bbox.min_lat as i64 {
            return false;
        }
        if self.min_y > bbox.max_lat as i64 {
            return false;
        }
        true
    }

    pub fn covers(&self, object: &ObjectRef<'_>) -> bool {
        match object {
            ObjectRef::Node(node) => self.covers_node(node),
            ObjectRef::Way(way) => self.covers_way(way),
            ObjectRef::Relation(relation) => self.covers_relation(relation),
        }
    }

    pub fn covers_node(&self, node: &NodeHandle<'_>) -> bool {
        self.covers_point(node.lat(), node.lon())
    }

    /// Containment test for a raw fixed-point position.
    pub fn covers_point(&self, lat: i32, lon: i32) -> bool {
        match self.cell_for(lat, lon) {
            None | Some(CellState::Empty) => false,
            Some(CellState::Full) => true,
            Some(CellState::Partial(clipped)) => {
                clipped.intersects(&point_of(lat, lon))
            }
        }
    }

    /// True when any loaded node of the way is covered. Full-cell hits are
    /// checked first across the whole way, partial-cell exact tests only
    /// afterwards.
    pub fn covers_way(&self, way: &OsmWay) -> bool {
        let extended = ExtendedWay::new(way, self.storage);
        let full_hit = extended.visit_nodes(|lat, lon| match self.cell_for(lat, lon) {
            Some(CellState::Full) => ControlFlow::Break(true),
            _ => ControlFlow::Continue(()),
        });
        if let Some(covers) = full_hit {
            return covers;
        }
        let partial_hit = extended.visit_nodes(|lat, lon| match self.cell_for(lat, lon) {
            Some(CellState::Partial(clipped)) if clipped.intersects(&point_of(lat, lon)) => {
                ControlFlow::Break(true)
            }
            _ => ControlFlow::Continue(()),
        });
        partial_hit.unwrap_or(false)
    }

    /// True when any resolved member is covered, depth first. Relations
    /// already seen on the walk are skipped, so cyclic relation graphs
    /// terminate.
    pub fn covers_relation(&self, relation: &OsmRelation) -> bool {
        let mut visited = FxHashSet::default();
        self.covers_relation_guarded(relation, &mut visited)
    }

    fn covers_relation_guarded(
        &self,
        relation: &OsmRelation,
        visited: &mut FxHashSet<i64>,
    ) -> bool {
        visited.insert(relation.id());
        for index in 0..relation.members().len() {
            match relation.member_object(self.storage, index) {
                None => continue,
                Some(ObjectRef::Relation(nested)) => {
                    if visited.contains(&nested.id()) {
                        continue;
                    }
                    if self.covers_relation_guarded(nested, visited) {
                        return true;
                    }
                }
                Some(ObjectRef::Node(node)) => {
                    if self.covers_node(&node) {
                        return true;
                    }
                }
                Some(ObjectRef::Way(way)) => {
                    if self.covers_way(way) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn cell_for(&self, lat: i32, lon: i32) -> Option<&CellState> {
        let x = lon as i64;
        let y = lat as i64;
        if x < self.min_x || x >= self.max_x || y < self.min_y || y >= self.max_y {
            return None;
        }
        let ix = ((x - self.min_x) / self.step_x) as usize;
        let iy = ((y - self.min_y) / self.step_y) as usize;
        let cell = &self.cells[ix * self.grid + iy];
        Some(cell.get_or_init(|| self.classify(ix, iy)))
    }

    fn classify(&self, ix: usize, iy: usize) -> CellState {
        let ulx = self.min_x + ix as i64 * self.step_x;
        let uly = self.min_y + iy as i64 * self.step_y;
        let rect = box_rect(
            to_degrees_i64(ulx),
            to_degrees_i64(ulx + self.step_x - 1),
            to_degrees_i64(uly),
            to_degrees_i64(uly + self.step_y - 1),
        );
        if !rect.intersects(&self.geom) {
            return CellState::Empty;
        }
        if self.geom.contains(&rect) {
            return CellState::Full;
        }
        let cell_poly: MultiPolygon<f64> = rect.to_polygon().into();
        CellState::Partial(cell_poly.intersection(&self.geom))
    }
}

fn point_of(lat: i32, lon: i32) -> Point<f64> {
    Point::new(to_degrees(lon), to_degrees(lat))
}

fn to_degrees_i64(fixed: i64) -> f64 {
    fixed as f64 * crate::object::COORD_SCALE
}
