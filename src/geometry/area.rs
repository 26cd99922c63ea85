//! Planar area built from a way or relation.

use geo::{BoundingRect, MultiPolygon};

use crate::error::{OsmemoryError, Result};
use crate::geometry::bbox::BoundingBox;
use crate::geometry::extended_relation::ExtendedRelation;
use crate::geometry::extended_way::ExtendedWay;
use crate::geometry::helper::{multipolygon_from_wkt, to_wkt_string};
use crate::object::{ObjectRef, TaggedObject};
use crate::storage::MemoryStorage;

/// A reconstructed (or externally supplied) polygonal area.
#[derive(Debug, Clone)]
pub struct Area {
    geom: MultiPolygon<f64>,
}

impl Area {
    pub fn new(geom: MultiPolygon<f64>) -> Self {
        Self { geom }
    }

    pub fn from_wkt(text: &str) -> Result<Self> {
        Ok(Self::new(multipolygon_from_wkt(text)?))
    }

    /// Reconstruct the area of a way or relation. Nodes have no area.
    pub fn from_object(storage: &MemoryStorage, object: ObjectRef<'_>) -> Result<Self> {
        Ok(Self::new(area_of_ref(storage, object)?))
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geom
    }

    pub fn into_geometry(self) -> MultiPolygon<f64> {
        self.geom
    }

    pub fn to_wkt(&self) -> String {
        to_wkt_string(&self.geom)
    }

    /// Fixed-point bounding box of the area.
    pub fn bounding_box(&self) -> BoundingBox {
        match self.geom.bounding_rect() {
            Some(rect) => BoundingBox::from_rect(&rect),
            None => BoundingBox::new(),
        }
    }
}

/// Area geometry of any object reference; the shared path behind
/// [`Area::from_object`] and `border` member resolution.
pub(crate) fn area_of_ref(
    storage: &MemoryStorage,
    object: ObjectRef<'_>,
) -> Result<MultiPolygon<f64>> {
    match object {
        ObjectRef::Node(node) => Err(OsmemoryError::NotAnArea {
            code: node.object_code(),
        }),
        ObjectRef::Way(way) => {
            let extended = ExtendedWay::new(way, storage);
            let polygon = extended.area()?.clone();
            Ok(MultiPolygon::new(vec![polygon]))
        }
        ObjectRef::Relation(relation) => {
            let extended = ExtendedRelation::new(relation, storage);
            Ok(extended.area()?.clone())
        }
    }
}
