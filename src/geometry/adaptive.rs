//! Adaptive variant of the containment cache.
//!
//! Works like [`FastArea`](crate::geometry::FastArea), but instead of a
//! one-shot fixed grid it subdivides lazily and recursively: a region
//! answers by exact geometry tests until it has seen enough queries while
//! still being large, then splits into a 10×10 subgrid whose partial cells
//! are themselves adaptive regions. Hot small regions end up subdivided
//! deeply, cold ones never pay for subdivision at all.

use geo::{BooleanOps, BoundingRect, Contains, Intersects, MultiPolygon, Point};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::error::{OsmemoryError, Result};
use crate::geometry::area::Area;
use crate::geometry::bbox::BoundingBox;
use crate::geometry::helper::box_rect;
use crate::object::{to_degrees, NodeHandle, ObjectRef, OsmRelation, OsmWay, TaggedObject};
use crate::storage::MemoryStorage;

/// Subgrid resolution per axis at every subdivision level.
const PARTS_PER_AXIS: usize = 10;
/// Queries a region absorbs before it considers splitting.
const SPLIT_AFTER_CHECKS: u64 = 30;
/// Minimum extent (fixed-point units) per axis for a split to pay off.
const MIN_SPLIT_EXTENT: i64 = 200;

/// Adaptive containment cache over one area.
pub struct AdaptiveFastArea<'a> {
    storage: &'a MemoryStorage,
    root: AdaptiveRegion,
}

impl<'a> AdaptiveFastArea<'a> {
    pub fn new(area: &Area, storage: &'a MemoryStorage) -> Result<Self> {
        if area.bounding_box().is_empty() {
            return Err(OsmemoryError::InvalidInput(
                "empty area geometry".to_owned(),
            ));
        }
        Ok(Self {
            storage,
            root: AdaptiveRegion::new(area.geometry().clone()),
        })
    }

    pub fn from_object(storage: &'a MemoryStorage, object: ObjectRef<'_>) -> Result<Self> {
        Self::new(&Area::from_object(storage, object)?, storage)
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.root.geom
    }

    pub fn may_cover(&self, bbox: &BoundingBox) -> bool {
        let root = &self.root;
        !(root.max_x < bbox.min_lon as i64
            || root.min_x > bbox.max_lon as i64
            || root.max_y < bbox.min_lat as i64
            || root.min_y > bbox.max_lat as i64)
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

    pub fn covers_point(&self, lat: i32, lon: i32) -> bool {
        self.root.covers(lat, lon)
    }

    pub fn covers_way(&self, way: &OsmWay) -> bool {
        way.node_ids().iter().any(|&nid| {
            self.storage
                .node_by_id(nid)
                .map(|node| self.covers_node(&node))
                .unwrap_or(false)
        })
    }

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
}

enum CellCover {
    Empty,
    Full,
    Sub(Box<AdaptiveRegion>),
}

struct SubGrid {
    step_x: i64,
    step_y: i64,
    cells: Vec<Option<CellCover>>,
}

struct RegionState {
    check_count: u64,
    grid: Option<SubGrid>,
}

/// One recursively subdividable region of the area.
struct AdaptiveRegion {
    min_x: i64,
    max_x: i64,
    min_y: i64,
    max_y: i64,
    geom: MultiPolygon<f64>,
    state: Mutex<RegionState>,
}

impl AdaptiveRegion {
    fn new(geom: MultiPolygon<f64>) -> Self {
        let (min_x, max_x, min_y, max_y) = match geom.bounding_rect() {
            Some(rect) => {
                let bbox = BoundingBox::from_rect(&rect);
                (
                    bbox.min_lon as i64 - 1,
                    bbox.max_lon as i64 + 1,
                    bbox.min_lat as i64 - 1,
                    bbox.max_lat as i64 + 1,
                )
            }
            // degenerate clip result; covers nothing
            None => (0, 0, 0, 0),
        };
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            geom,
            state: Mutex::new(RegionState {
                check_count: 0,
                grid: None,
            }),
        }
    }

    fn covers(&self, lat: i32, lon: i32) -> bool {
        let x = lon as i64;
        let y = lat as i64;
        if x < self.min_x || x >= self.max_x || y < self.min_y || y >= self.max_y {
            return false;
        }

        let mut state = self.state.lock();
        state.check_count += 1;
        let splittable = state.check_count > SPLIT_AFTER_CHECKS
            && self.max_x - self.min_x > MIN_SPLIT_EXTENT
            && self.max_y - self.min_y > MIN_SPLIT_EXTENT;
        if state.grid.is_none() && !splittable {
            drop(state);
            return self.covers_by_geometry(lat, lon);
        }

        let step_x = (self.max_x - self.min_x) / PARTS_PER_AXIS as i64 + 1;
        let step_y = (self.max_y - self.min_y) / PARTS_PER_AXIS as i64 + 1;
        let grid = state.grid.get_or_insert_with(|| {
            let mut cells = Vec::new();
            cells.resize_with(PARTS_PER_AXIS * PARTS_PER_AXIS, || None);
            SubGrid {
                step_x,
                step_y,
                cells,
            }
        });

        let ix = ((x - self.min_x) / grid.step_x) as usize;
        let iy = ((y - self.min_y) / grid.step_y) as usize;
        let index = ix * PARTS_PER_AXIS + iy;
        if grid.cells[index].is_none() {
            let cell = self.classify(ix, iy, grid.step_x, grid.step_y);
            grid.cells[index] = Some(cell);
        }
        match &grid.cells[index] {
            Some(CellCover::Empty) => false,
            Some(CellCover::Full) => true,
            Some(CellCover::Sub(region)) => region.covers(lat, lon),
            None => false,
        }
    }

    fn covers_by_geometry(&self, lat: i32, lon: i32) -> bool {
        let point = Point::new(to_degrees(lon), to_degrees(lat));
        self.geom.intersects(&point)
    }

    fn classify(&self, ix: usize, iy: usize, step_x: i64, step_y: i64) -> CellCover {
        let ulx = self.min_x + ix as i64 * step_x;
        let uly = self.min_y + iy as i64 * step_y;
        let scale = crate::object::COORD_SCALE;
        let rect = box_rect(
            ulx as f64 * scale,
            (ulx + step_x - 1) as f64 * scale,
            uly as f64 * scale,
            (uly + step_y - 1) as f64 * scale,
        );
        if !rect.intersects(&self.geom) {
            return CellCover::Empty;
        }
        if self.geom.contains(&rect) {
            return CellCover::Full;
        }
        let cell_poly: MultiPolygon<f64> = rect.to_polygon().into();
        CellCover::Sub(Box::new(AdaptiveRegion::new(
            cell_poly.intersection(&self.geom),
        )))
    }
}
