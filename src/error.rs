//! Error types for storage and geometry operations.
//!
//! Geometry errors are raised per object and carry the offending object
//! code (`n123`, `w45`, `r6`) so they can be chased down in the source map
//! data. Callers processing many relations are expected to catch per object
//! and continue.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, OsmemoryError>;

#[derive(Error, Debug)]
pub enum OsmemoryError {
    /// Bulk-loaded ids were not strictly increasing within a sequence.
    #[error("{kind} must be ordered by id")]
    IdOrder { kind: &'static str },

    /// An object code string did not match `n<id>` / `w<id>` / `r<id>`.
    #[error("wrong object code format: {0}")]
    InvalidObjectCode(String),

    /// A way references a node id that is not present in storage.
    #[error("node #{node} not exist for way #{way}")]
    MissingNode { node: i64, way: i64 },

    /// A relation member with a geometry-bearing role is not in storage.
    #[error("object {member} not exist for relation #{relation}")]
    MissingMember { member: String, relation: i64 },

    /// An `outer`/`inner` member turned out not to be a way.
    #[error("not a way {role} object {member} for relation #{relation}")]
    RingMemberNotAWay {
        role: &'static str,
        member: String,
        relation: i64,
    },

    /// A `border` member cannot coexist with outer/inner members.
    #[error("impossible to create area for {code}: border member mixed with outer/inner members")]
    MixedBorderMembers { code: String },

    #[error("there is no outer members for {code}")]
    NoOuterMembers { code: String },

    /// Ring assembly ran out of attachable fragments before closing.
    #[error("non-closed line starts from ({start_x} {start_y}) ends to ({end_x} {end_y})")]
    NonClosedRing {
        start_x: f64,
        start_y: f64,
        end_x: f64,
        end_y: f64,
    },

    #[error("self-intersected line near ({x} {y})")]
    SelfIntersectedRing { x: f64, y: f64 },

    #[error("impossible to create polygon from relation #{relation}: {reason}")]
    RelationGeometry {
        relation: i64,
        reason: &'static str,
    },

    #[error("impossible to create polygon from way #{way}: {reason}")]
    WayPolygon { way: i64, reason: &'static str },

    #[error("impossible to create line from way #{way}: {reason}")]
    WayLine { way: i64, reason: &'static str },

    /// Nodes have no area representation.
    #[error("{code} can't be area")]
    NotAnArea { code: String },

    #[error("invalid WKT geometry: {0}")]
    WktParse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
