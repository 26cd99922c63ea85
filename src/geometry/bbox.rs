//! Fixed-point bounding box.

use geo::Rect;

use crate::object::COORD_SCALE;

/// Axis-aligned bounding box in fixed-point coordinate units.
///
/// Starts inverted (min > max) so the first `expand_to_include` snaps it to
/// a single point; an untouched box is "empty" and never overlaps anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_lat: i32,
    pub max_lat: i32,
    pub min_lon: i32,
    pub max_lon: i32,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBox {
    pub fn new() -> Self {
        Self {
            min_lat: i32::MAX,
            max_lat: i32::MIN,
            min_lon: i32::MAX,
            max_lon: i32::MIN,
        }
    }

    pub fn expand_to_include(&mut self, lat: i32, lon: i32) {
        if self.min_lat > lat {
            self.min_lat = lat;
        }
        if self.min_lon > lon {
            self.min_lon = lon;
        }
        if self.max_lat < lat {
            self.max_lat = lat;
        }
        if self.max_lon < lon {
            self.max_lon = lon;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat
    }

    /// Convert a degree-space rectangle to fixed-point units.
    pub fn from_rect(rect: &Rect<f64>) -> Self {
        Self {
            min_lat: (rect.min().y / COORD_SCALE) as i32,
            max_lat: (rect.max().y / COORD_SCALE) as i32,
            min_lon: (rect.min().x / COORD_SCALE) as i32,
            max_lon: (rect.max().x / COORD_SCALE) as i32,
        }
    }
}
