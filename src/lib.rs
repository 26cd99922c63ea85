//! In-process, read-optimized storage for OSM map data with geometry
//! reconstruction and fast spatial containment queries.
//!
//! Entities live in sorted, densely packed sequences queried by binary
//! search; tag keys, member roles and usernames are interned to small
//! integer codes. On top of the store, relations and closed ways
//! reconstruct into multipolygons, and [`FastArea`] answers
//! "does this area cover that object" in amortized constant time per
//! point via a lazily classified grid cache.
//!
//! ```rust
//! use osmemory::{Area, FastArea, Loader, MemoryStorage};
//!
//! let mut storage = MemoryStorage::new();
//! let mut loader = Loader::new(&mut storage);
//! loader.create_node(1, 53.9, 27.56, &[("name", "Minsk")], "someone")?;
//! loader.finish()?;
//!
//! let area = Area::from_wkt("POLYGON((27 53,28 53,28 54,27 54,27 53))")?;
//! let fast = FastArea::new(&area, &storage)?;
//! let node = storage.node_by_id(1).unwrap();
//! assert!(fast.covers_node(&node));
//! # Ok::<(), osmemory::OsmemoryError>(())
//! ```

pub mod error;
pub mod geometry;
pub mod ingest;
pub mod object;
pub mod storage;
pub mod strings;

pub use error::{OsmemoryError, Result};

pub use object::{
    Member, NodeHandle, ObjectKind, ObjectRef, OsmNode, OsmRelation, OsmWay, SimpleNode, Tag,
    TagList, TaggedObject, COORD_SCALE,
};

pub use ingest::{Loader, UpdateMode};
pub use storage::{MemoryStorage, StorageStats};
pub use strings::StringPack;

pub use geometry::{
    AdaptiveFastArea, Area, BoundingBox, ExtendedRelation, ExtendedWay, FastArea,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{OsmemoryError, Result};

    pub use crate::{Loader, MemoryStorage, UpdateMode};

    pub use crate::{Member, ObjectKind, ObjectRef, TaggedObject};

    pub use crate::{AdaptiveFastArea, Area, BoundingBox, ExtendedRelation, ExtendedWay, FastArea};
}
