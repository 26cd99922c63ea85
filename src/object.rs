//! Entity model: nodes, ways and relations.
//!
//! All entities are immutable once constructed; online updates replace the
//! whole entity in [`MemoryStorage`](crate::storage::MemoryStorage). Tag
//! keys, member roles and usernames are interned `i16` codes; tag values
//! are raw UTF-8 bytes. Coordinates are fixed-point integers (degrees
//! multiplied by 10^7), which halves memory versus doubles and keeps all
//! coordinates on the same 1e-7 grid the interchange formats use.

use std::collections::BTreeMap;

use bytes::Bytes;
use smallvec::SmallVec;

use crate::storage::MemoryStorage;

/// Degrees per fixed-point coordinate unit.
pub const COORD_SCALE: f64 = 0.0000001;

/// Convert a fixed-point coordinate to degrees.
#[inline]
pub fn to_degrees(fixed: i32) -> f64 {
    fixed as f64 * COORD_SCALE
}

/// The three entity kinds. Id spaces are independent per kind: node #5 and
/// way #5 are unrelated objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Node,
    Way,
    Relation,
}

impl ObjectKind {
    pub fn letter(self) -> char {
        match self {
            ObjectKind::Node => 'n',
            ObjectKind::Way => 'w',
            ObjectKind::Relation => 'r',
        }
    }

    /// Short object code like `n123`, `w75`, `r51`.
    pub fn code(self, id: i64) -> String {
        format!("{}{}", self.letter(), id)
    }
}

/// One interned-key tag.
#[derive(Debug, Clone)]
pub struct Tag {
    pub key: i16,
    pub value: Bytes,
}

/// Per-entity tag list. Almost every tagged object carries only a handful
/// of tags, so lookups are linear scans over an inline small vector.
pub type TagList = SmallVec<[Tag; 2]>;

/// Common read interface over all entity kinds.
///
/// The `*_named` variants round-trip through the storage's string pack and
/// are much slower than their code-based counterparts; prefer interning the
/// key once when scanning many objects.
pub trait TaggedObject {
    fn id(&self) -> i64;
    fn kind(&self) -> ObjectKind;
    fn tags(&self) -> &[Tag];
    fn user(&self) -> i16;

    fn object_code(&self) -> String {
        self.kind().code(self.id())
    }

    fn has_tag(&self, key: i16) -> bool {
        self.tags().iter().any(|t| t.key == key)
    }

    fn tag(&self, key: i16) -> Option<&str> {
        self.tags()
            .iter()
            .find(|t| t.key == key)
            .map(|t| std::str::from_utf8(&t.value).unwrap_or(""))
    }

    fn has_tag_named(&self, name: &str, storage: &MemoryStorage) -> bool {
        self.has_tag(storage.tags_pack().code(name))
    }

    fn tag_named(&self, name: &str, storage: &MemoryStorage) -> Option<&str> {
        self.tag(storage.tags_pack().code(name))
    }

    fn user_name(&self, storage: &MemoryStorage) -> Option<String> {
        storage.users_pack().name(self.user())
    }

    /// Extract all tags into a name-sorted map. Not fast; meant for
    /// reporting and debugging, not per-object hot paths.
    fn tags_map(&self, storage: &MemoryStorage) -> BTreeMap<String, String> {
        let mut result = BTreeMap::new();
        for tag in self.tags() {
            if let Some(name) = storage.tags_pack().name(tag.key) {
                let value = std::str::from_utf8(&tag.value).unwrap_or("").to_owned();
                result.insert(name, value);
            }
        }
        result
    }
}

/// A tagged node.
#[derive(Debug, Clone)]
pub struct OsmNode {
    id: i64,
    lat: i32,
    lon: i32,
    tags: TagList,
    user: i16,
}

impl OsmNode {
    pub fn new(id: i64, lat: i32, lon: i32, tags: TagList, user: i16) -> Self {
        Self {
            id,
            lat,
            lon,
            tags,
            user,
        }
    }

    pub fn lat(&self) -> i32 {
        self.lat
    }

    pub fn lon(&self) -> i32 {
        self.lon
    }

    pub fn latitude(&self) -> f64 {
        to_degrees(self.lat)
    }

    pub fn longitude(&self) -> f64 {
        to_degrees(self.lon)
    }
}

impl TaggedObject for OsmNode {
    fn id(&self) -> i64 {
        self.id
    }
    fn kind(&self) -> ObjectKind {
        ObjectKind::Node
    }
    fn tags(&self) -> &[Tag] {
        &self.tags
    }
    fn user(&self) -> i16 {
        self.user
    }
}

/// An untagged node, materialized from the columnar arrays on lookup.
///
/// The overwhelming majority of nodes in a real extract carry no tags, so
/// they are stored as three parallel arrays and never as per-node objects.
/// This view is a plain value and carries no heap data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleNode {
    pub id: i64,
    pub lat: i32,
    pub lon: i32,
}

impl TaggedObject for SimpleNode {
    fn id(&self) -> i64 {
        self.id
    }
    fn kind(&self) -> ObjectKind {
        ObjectKind::Node
    }
    fn tags(&self) -> &[Tag] {
        &[]
    }
    fn user(&self) -> i16 {
        -1
    }
}

/// What node lookups return: either an untagged columnar entry or a
/// reference to a tagged node.
#[derive(Debug, Clone, Copy)]
pub enum NodeHandle<'a> {
    Simple(SimpleNode),
    Full(&'a OsmNode),
}

impl<'a> NodeHandle<'a> {
    pub fn lat(&self) -> i32 {
        match self {
            NodeHandle::Simple(n) => n.lat,
            NodeHandle::Full(n) => n.lat(),
        }
    }

    pub fn lon(&self) -> i32 {
        match self {
            NodeHandle::Simple(n) => n.lon,
            NodeHandle::Full(n) => n.lon(),
        }
    }

    pub fn latitude(&self) -> f64 {
        to_degrees(self.lat())
    }

    pub fn longitude(&self) -> f64 {
        to_degrees(self.lon())
    }
}

impl<'a> TaggedObject for NodeHandle<'a> {
    fn id(&self) -> i64 {
        match self {
            NodeHandle::Simple(n) => n.id,
            NodeHandle::Full(n) => n.id(),
        }
    }
    fn kind(&self) -> ObjectKind {
        ObjectKind::Node
    }
    fn tags(&self) -> &[Tag] {
        match self {
            NodeHandle::Simple(_) => &[],
            NodeHandle::Full(n) => n.tags(),
        }
    }
    fn user(&self) -> i16 {
        match self {
            NodeHandle::Simple(_) => -1,
            NodeHandle::Full(n) => n.user(),
        }
    }
}

/// A way: an ordered sequence of node references.
///
/// Node ids are stored, not coordinates; positions resolve through storage
/// at read time, so moving a node implicitly moves every way through it.
#[derive(Debug, Clone)]
pub struct OsmWay {
    id: i64,
    tags: TagList,
    user: i16,
    nodes: Box<[i64]>,
}

impl OsmWay {
    pub fn new(id: i64, nodes: impl Into<Box<[i64]>>, tags: TagList, user: i16) -> Self {
        Self {
            id,
            tags,
            user,
            nodes: nodes.into(),
        }
    }

    pub fn node_ids(&self) -> &[i64] {
        &self.nodes
    }
}

impl TaggedObject for OsmWay {
    fn id(&self) -> i64 {
        self.id
    }
    fn kind(&self) -> ObjectKind {
        ObjectKind::Way
    }
    fn tags(&self) -> &[Tag] {
        &self.tags
    }
    fn user(&self) -> i16 {
        self.user
    }
}

/// One relation member: a typed reference plus an interned role code.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub kind: ObjectKind,
    pub id: i64,
    pub role: i16,
}

impl Member {
    pub fn code(&self) -> String {
        self.kind.code(self.id)
    }
}

/// A relation: an ordered collection of node/way/relation references with
/// roles.
#[derive(Debug, Clone)]
pub struct OsmRelation {
    id: i64,
    tags: TagList,
    user: i16,
    members: Box<[Member]>,
}

impl OsmRelation {
    pub fn new(id: i64, members: impl Into<Box<[Member]>>, tags: TagList, user: i16) -> Self {
        Self {
            id,
            tags,
            user,
            members: members.into(),
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Resolve member `index` against storage. `None` for dangling
    /// references, which are a normal condition in cropped extracts.
    pub fn member_object<'a>(
        &self,
        storage: &'a MemoryStorage,
        index: usize,
    ) -> Option<ObjectRef<'a>> {
        let member = self.members.get(index)?;
        match member.kind {
            ObjectKind::Node => storage.node_by_id(member.id).map(ObjectRef::Node),
            ObjectKind::Way => storage.way_by_id(member.id).map(ObjectRef::Way),
            ObjectKind::Relation => storage.relation_by_id(member.id).map(ObjectRef::Relation),
        }
    }

    /// Role string of member `index` (pool round-trip).
    pub fn member_role(&self, storage: &MemoryStorage, index: usize) -> Option<String> {
        let member = self.members.get(index)?;
        storage.relation_roles_pack().name(member.role)
    }
}

impl TaggedObject for OsmRelation {
    fn id(&self) -> i64 {
        self.id
    }
    fn kind(&self) -> ObjectKind {
        ObjectKind::Relation
    }
    fn tags(&self) -> &[Tag] {
        &self.tags
    }
    fn user(&self) -> i16 {
        self.user
    }
}

/// A reference to any stored object.
#[derive(Debug, Clone, Copy)]
pub enum ObjectRef<'a> {
    Node(NodeHandle<'a>),
    Way(&'a OsmWay),
    Relation(&'a OsmRelation),
}

impl<'a> ObjectRef<'a> {
    pub fn as_node(&self) -> Option<&NodeHandle<'a>> {
        match self {
            ObjectRef::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_way(&self) -> Option<&'a OsmWay> {
        match self {
            ObjectRef::Way(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&'a OsmRelation> {
        match self {
            ObjectRef::Relation(r) => Some(r),
            _ => None,
        }
    }
}

impl<'a> TaggedObject for ObjectRef<'a> {
    fn id(&self) -> i64 {
        match self {
            ObjectRef::Node(n) => n.id(),
            ObjectRef::Way(w) => w.id(),
            ObjectRef::Relation(r) => r.id(),
        }
    }
    fn kind(&self) -> ObjectKind {
        match self {
            ObjectRef::Node(_) => ObjectKind::Node,
            ObjectRef::Way(_) => ObjectKind::Way,
            ObjectRef::Relation(_) => ObjectKind::Relation,
        }
    }
    fn tags(&self) -> &[Tag] {
        match self {
            ObjectRef::Node(n) => n.tags(),
            ObjectRef::Way(w) => w.tags(),
            ObjectRef::Relation(r) => r.tags(),
        }
    }
    fn user(&self) -> i16 {
        match self {
            ObjectRef::Node(n) => n.user(),
            ObjectRef::Way(w) => w.user(),
            ObjectRef::Relation(r) => r.user(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn object_codes() {
        assert_eq!(ObjectKind::Node.code(123), "n123");
        assert_eq!(ObjectKind::Way.code(75), "w75");
        assert_eq!(ObjectKind::Relation.code(51), "r51");
    }

    #[test]
    fn tag_lookup_by_code() {
        let tags: TagList = smallvec![
            Tag {
                key: 3,
                value: Bytes::from_static(b"residential"),
            },
            Tag {
                key: 7,
                value: Bytes::from_static(b"Main Street"),
            },
        ];
        let node = OsmNode::new(1, 0, 0, tags, 0);
        assert!(node.has_tag(3));
        assert!(node.has_tag(7));
        assert!(!node.has_tag(4));
        assert_eq!(node.tag(7), Some("Main Street"));
        assert_eq!(node.tag(5), None);
    }

    #[test]
    fn simple_node_has_no_tags() {
        let node = SimpleNode {
            id: 9,
            lat: 539_000_000,
            lon: 275_666_670,
        };
        assert!(!node.has_tag(0));
        assert_eq!(node.tag(0), None);
        assert_eq!(node.object_code(), "n9");
        assert!((node.lat as f64 * COORD_SCALE - 53.9).abs() < 1e-9);
    }

    #[test]
    fn fixed_point_conversion() {
        assert!((to_degrees(275_666_670) - 27.566667).abs() < 1e-9);
        assert_eq!(to_degrees(0), 0.0);
        assert!((to_degrees(-900_000_000) - (-90.0)).abs() < 1e-9);
    }
}
