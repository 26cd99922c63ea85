//! Cached derived geometry for a way.

use std::ops::ControlFlow;

use geo::{LineString, Polygon, Validation};
use once_cell::sync::OnceCell;

use crate::error::{OsmemoryError, Result};
use crate::geometry::bbox::BoundingBox;
use crate::geometry::helper::coord_of;
use crate::object::{OsmWay, TaggedObject};
use crate::storage::MemoryStorage;

/// A way plus lazily computed, memoized derived state: resolved node
/// positions, bounding box, line string and polygon. Each piece is
/// computed at most once; the underlying entities are immutable, so there
/// is no invalidation. Safe for concurrent first touch.
pub struct ExtendedWay<'a> {
    way: &'a OsmWay,
    storage: &'a MemoryStorage,
    resolved: OnceCell<Resolved>,
    line: OnceCell<LineString<f64>>,
    area: OnceCell<Polygon<f64>>,
}

struct Resolved {
    /// (lat, lon) per referenced node, `None` where the reference dangles.
    points: Vec<Option<(i32, i32)>>,
    bbox: BoundingBox,
    all_points_defined: bool,
}

impl<'a> ExtendedWay<'a> {
    pub fn new(way: &'a OsmWay, storage: &'a MemoryStorage) -> Self {
        Self {
            way,
            storage,
            resolved: OnceCell::new(),
            line: OnceCell::new(),
            area: OnceCell::new(),
        }
    }

    pub fn way(&self) -> &'a OsmWay {
        self.way
    }

    fn resolved(&self) -> &Resolved {
        self.resolved.get_or_init(|| {
            let mut points = Vec::with_capacity(self.way.node_ids().len());
            let mut bbox = BoundingBox::new();
            let mut all_points_defined = true;
            for &nid in self.way.node_ids() {
                match self.storage.node_by_id(nid) {
                    Some(node) => {
                        let (lat, lon) = (node.lat(), node.lon());
                        bbox.expand_to_include(lat, lon);
                        points.push(Some((lat, lon)));
                    }
                    None => {
                        all_points_defined = false;
                        points.push(None);
                    }
                }
            }
            Resolved {
                points,
                bbox,
                all_points_defined,
            }
        })
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.resolved().bbox
    }

    /// False when any referenced node id dangles.
    pub fn is_all_points_defined(&self) -> bool {
        self.resolved().all_points_defined
    }

    /// First node id equals last and there are enough nodes for a ring.
    pub fn is_closed(&self) -> bool {
        let nids = self.way.node_ids();
        nids.len() >= 3 && nids[0] == nids[nids.len() - 1]
    }

    /// No node id repeats, i.e. the way is a plain polyline.
    pub fn is_line(&self) -> bool {
        let nids = self.way.node_ids();
        for i in 0..nids.len() {
            for j in 0..i {
                if nids[i] == nids[j] {
                    return false;
                }
            }
        }
        true
    }

    pub fn line(&self) -> Result<&LineString<f64>> {
        self.line.get_or_try_init(|| {
            let resolved = self.resolved();
            if !resolved.all_points_defined {
                return Err(OsmemoryError::WayLine {
                    way: self.way.id(),
                    reason: "not all points defined",
                });
            }
            let coords = resolved
                .points
                .iter()
                .flatten()
                .map(|&(lat, lon)| coord_of(lat, lon))
                .collect();
            let line = LineString::new(coords);
            if !line.is_valid() {
                return Err(OsmemoryError::WayLine {
                    way: self.way.id(),
                    reason: "not valid line",
                });
            }
            Ok(line)
        })
    }

    /// The way as a polygon. Requires a closed way with all points
    /// resolvable and an engine-valid ring.
    pub fn area(&self) -> Result<&Polygon<f64>> {
        self.area.get_or_try_init(|| {
            if !self.is_closed() {
                return Err(OsmemoryError::WayPolygon {
                    way: self.way.id(),
                    reason: "non-closed way",
                });
            }
            let resolved = self.resolved();
            if !resolved.all_points_defined {
                return Err(OsmemoryError::WayPolygon {
                    way: self.way.id(),
                    reason: "not all points defined",
                });
            }
            let coords: Vec<_> = resolved
                .points
                .iter()
                .flatten()
                .map(|&(lat, lon)| coord_of(lat, lon))
                .collect();
            let polygon = Polygon::new(LineString::new(coords), Vec::new());
            if !polygon.is_valid() {
                return Err(OsmemoryError::WayPolygon {
                    way: self.way.id(),
                    reason: "it is not valid",
                });
            }
            Ok(polygon)
        })
    }

    /// Visit every resolvable node position; dangling references are
    /// skipped. `Break` stops the walk and surfaces its value.
    pub fn visit_nodes<F>(&self, mut f: F) -> Option<bool>
    where
        F: FnMut(i32, i32) -> ControlFlow<bool>,
    {
        for point in &self.resolved().points {
            if let Some((lat, lon)) = point {
                if let ControlFlow::Break(result) = f(*lat, *lon) {
                    return Some(result);
                }
            }
        }
        None
    }
}
