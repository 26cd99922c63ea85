//! In-memory storage for all nodes, ways and relations.
//!
//! Four sequences, each kept strictly increasing by id: untagged nodes as
//! three parallel columnar arrays, and tagged nodes, ways and relations as
//! sorted vectors. Every lookup is a binary search. The layout trades
//! insert/delete cost (a tail shift) for read density over datasets of
//! hundreds of millions of entries, where a generic ordered map would not
//! fit in memory.
//!
//! Once [`MemoryStorage::finish_loading`] has validated the ordering,
//! concurrent reads need no locking; writes (upsert/delete) must be
//! serialized externally against both other writes and reads.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{OsmemoryError, Result};
use crate::object::{NodeHandle, ObjectRef, OsmNode, OsmRelation, OsmWay, SimpleNode, TaggedObject};
use crate::strings::StringPack;

/// Untagged-node columns grow by this many entries at a time. This
/// sequence dominates memory for real extracts, so growth is chunked
/// rather than doubling.
const SIMPLE_NODE_CHUNK: usize = 1024 * 1024;

/// Storage for all map objects of one dataset.
pub struct MemoryStorage {
    // untagged nodes, parallel columns sorted by id
    simple_ids: Vec<i64>,
    simple_lats: Vec<i32>,
    simple_lons: Vec<i32>,

    nodes: Vec<OsmNode>,
    ways: Vec<OsmWay>,
    relations: Vec<OsmRelation>,

    tags: StringPack,
    relation_roles: StringPack,
    users: StringPack,

    started: Instant,
    load_time: Option<Duration>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            simple_ids: Vec::new(),
            simple_lats: Vec::new(),
            simple_lons: Vec::new(),
            nodes: Vec::new(),
            ways: Vec::new(),
            relations: Vec::new(),
            tags: StringPack::new(),
            relation_roles: StringPack::new(),
            users: StringPack::new(),
            started: Instant::now(),
            load_time: None,
        }
    }

    pub fn tags_pack(&self) -> &StringPack {
        &self.tags
    }

    pub fn relation_roles_pack(&self) -> &StringPack {
        &self.relation_roles
    }

    pub fn users_pack(&self) -> &StringPack {
        &self.users
    }

    /// Look up a node by id, untagged columns first.
    pub fn node_by_id(&self, id: i64) -> Option<NodeHandle<'_>> {
        if let Ok(pos) = self.simple_ids.binary_search(&id) {
            return Some(NodeHandle::Simple(SimpleNode {
                id,
                lat: self.simple_lats[pos],
                lon: self.simple_lons[pos],
            }));
        }
        self.nodes
            .binary_search_by_key(&id, |n| n.id())
            .ok()
            .map(|pos| NodeHandle::Full(&self.nodes[pos]))
    }

    pub fn way_by_id(&self, id: i64) -> Option<&OsmWay> {
        self.ways
            .binary_search_by_key(&id, |w| w.id())
            .ok()
            .map(|pos| &self.ways[pos])
    }

    pub fn relation_by_id(&self, id: i64) -> Option<&OsmRelation> {
        self.relations
            .binary_search_by_key(&id, |r| r.id())
            .ok()
            .map(|pos| &self.relations[pos])
    }

    /// Look up an object by code like `n123`, `w456`, `r789`.
    ///
    /// A malformed code is an error; a well-formed code for an absent
    /// object is `Ok(None)`.
    pub fn object_by_code(&self, code: &str) -> Result<Option<ObjectRef<'_>>> {
        let trimmed = code.trim();
        let bad = || OsmemoryError::InvalidObjectCode(code.to_owned());
        let kind = match trimmed.as_bytes().first() {
            Some(k @ (b'n' | b'w' | b'r')) => *k,
            _ => return Err(bad()),
        };
        let digits = &trimmed[1..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let id: i64 = digits.parse().map_err(|_| bad())?;
        match kind {
            b'n' => Ok(self.node_by_id(id).map(ObjectRef::Node)),
            b'w' => Ok(self.way_by_id(id).map(ObjectRef::Way)),
            _ => Ok(self.relation_by_id(id).map(ObjectRef::Relation)),
        }
    }

    /// Append an untagged node during bulk load. Id order is only checked
    /// at [`finish_loading`](Self::finish_loading).
    pub fn push_simple_node(&mut self, id: i64, lat: i32, lon: i32) {
        if self.simple_ids.len() == self.simple_ids.capacity() {
            self.simple_ids.reserve(SIMPLE_NODE_CHUNK);
            self.simple_lats.reserve(SIMPLE_NODE_CHUNK);
            self.simple_lons.reserve(SIMPLE_NODE_CHUNK);
        }
        self.simple_ids.push(id);
        self.simple_lats.push(lat);
        self.simple_lons.push(lon);
    }

    pub fn push_node(&mut self, node: OsmNode) {
        self.nodes.push(node);
    }

    pub fn push_way(&mut self, way: OsmWay) {
        self.ways.push(way);
    }

    pub fn push_relation(&mut self, relation: OsmRelation) {
        self.relations.push(relation);
    }

    /// Validate the strict id ordering of all four sequences and record
    /// the load duration. Must be called once after bulk load; binary
    /// search is only valid afterwards.
    pub fn finish_loading(&mut self) -> Result<()> {
        check_order("nodes", self.simple_ids.iter().copied())?;
        check_order("nodes", self.nodes.iter().map(|n| n.id()))?;
        check_order("ways", self.ways.iter().map(|w| w.id()))?;
        check_order("relations", self.relations.iter().map(|r| r.id()))?;
        self.load_time = Some(self.started.elapsed());
        log::debug!(
            "loading finished in {:?}: {} simple nodes, {} nodes, {} ways, {} relations",
            self.started.elapsed(),
            self.simple_ids.len(),
            self.nodes.len(),
            self.ways.len(),
            self.relations.len()
        );
        Ok(())
    }

    fn remove_simple_node(&mut self, id: i64) -> bool {
        match self.simple_ids.binary_search(&id) {
            Ok(pos) => {
                self.simple_ids.remove(pos);
                self.simple_lats.remove(pos);
                self.simple_lons.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    fn remove_tagged_node(&mut self, id: i64) -> bool {
        match self.nodes.binary_search_by_key(&id, |n| n.id()) {
            Ok(pos) => {
                self.nodes.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Insert or replace a tagged node, evicting any untagged entry with
    /// the same id so a node never lives in both sequences.
    pub fn upsert_node(&mut self, node: OsmNode) {
        let id = node.id();
        self.remove_simple_node(id);
        match self.nodes.binary_search_by_key(&id, |n| n.id()) {
            Ok(pos) => self.nodes[pos] = node,
            Err(pos) => self.nodes.insert(pos, node),
        }
    }

    /// Insert or replace an untagged node, evicting any tagged entry with
    /// the same id.
    pub fn upsert_simple_node(&mut self, id: i64, lat: i32, lon: i32) {
        self.remove_tagged_node(id);
        match self.simple_ids.binary_search(&id) {
            Ok(pos) => {
                self.simple_lats[pos] = lat;
                self.simple_lons[pos] = lon;
            }
            Err(pos) => {
                self.simple_ids.insert(pos, id);
                self.simple_lats.insert(pos, lat);
                self.simple_lons.insert(pos, lon);
            }
        }
    }

    /// Remove a node from whichever sequence holds it. Returns whether it
    /// was present.
    pub fn delete_node(&mut self, id: i64) -> bool {
        let simple = self.remove_simple_node(id);
        let tagged = self.remove_tagged_node(id);
        simple || tagged
    }

    pub fn upsert_way(&mut self, way: OsmWay) {
        match self.ways.binary_search_by_key(&way.id(), |w| w.id()) {
            Ok(pos) => self.ways[pos] = way,
            Err(pos) => self.ways.insert(pos, way),
        }
    }

    pub fn delete_way(&mut self, id: i64) -> bool {
        match self.ways.binary_search_by_key(&id, |w| w.id()) {
            Ok(pos) => {
                self.ways.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn upsert_relation(&mut self, relation: OsmRelation) {
        match self
            .relations
            .binary_search_by_key(&relation.id(), |r| r.id())
        {
            Ok(pos) => self.relations[pos] = relation,
            Err(pos) => self.relations.insert(pos, relation),
        }
    }

    pub fn delete_relation(&mut self, id: i64) -> bool {
        match self.relations.binary_search_by_key(&id, |r| r.id()) {
            Ok(pos) => {
                self.relations.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Visit every tagged object: tagged nodes, then ways, then relations.
    /// Untagged nodes carry nothing worth filtering on and are excluded.
    pub fn for_each<F: FnMut(ObjectRef<'_>)>(&self, mut f: F) {
        for node in &self.nodes {
            f(ObjectRef::Node(NodeHandle::Full(node)));
        }
        for way in &self.ways {
            f(ObjectRef::Way(way));
        }
        for relation in &self.relations {
            f(ObjectRef::Relation(relation));
        }
    }

    /// Visit every object carrying the given tag.
    pub fn for_each_with_tag<F: FnMut(ObjectRef<'_>)>(&self, tag_name: &str, mut f: F) {
        let key = self.tags.code(tag_name);
        self.for_each(|obj| {
            if obj.has_tag(key) {
                f(obj);
            }
        });
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            loading_ms: self.load_time.unwrap_or_default().as_millis() as u64,
            simple_nodes: self.simple_ids.len(),
            tagged_nodes: self.nodes.len(),
            ways: self.ways.len(),
            relations: self.relations.len(),
            tag_names: self.tags.len(),
            relation_roles: self.relation_roles.len(),
            users: self.users.len(),
        }
    }

    /// Log the loading statistics summary.
    pub fn log_stats(&self) {
        let stats = self.stats();
        log::info!("Loading time       : {}ms", stats.loading_ms);
        log::info!("Simple nodes count : {}", stats.simple_nodes);
        log::info!("Nodes count        : {}", stats.tagged_nodes);
        log::info!("Ways count         : {}", stats.ways);
        log::info!("Relations count    : {}", stats.relations);
        log::info!("Tags count         : {}", stats.tag_names);
        log::info!("RelRoles count     : {}", stats.relation_roles);
    }
}

fn check_order(kind: &'static str, ids: impl Iterator<Item = i64>) -> Result<()> {
    let mut prev = 0i64;
    for id in ids {
        if id <= prev {
            return Err(OsmemoryError::IdOrder { kind });
        }
        prev = id;
    }
    Ok(())
}

/// Loading statistics, serializable for reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageStats {
    pub loading_ms: u64,
    pub simple_nodes: usize,
    pub tagged_nodes: usize,
    pub ways: usize,
    pub relations: usize,
    pub tag_names: usize,
    pub relation_roles: usize,
    pub users: usize,
}
