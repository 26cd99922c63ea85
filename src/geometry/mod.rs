//! Geometry reconstruction and spatial containment over stored objects.

pub mod adaptive;
pub mod area;
pub mod bbox;
pub mod extended_relation;
pub mod extended_way;
pub mod fast_area;
pub mod helper;

pub use adaptive::AdaptiveFastArea;
pub use area::Area;
pub use bbox::BoundingBox;
pub use extended_relation::ExtendedRelation;
pub use extended_way::ExtendedWay;
pub use fast_area::{FastArea, DEFAULT_GRID};
pub use helper::{equals_topo, multipolygon_from_wkt, to_wkt_string};
