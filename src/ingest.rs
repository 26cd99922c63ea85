//! Loader interface called by format drivers.
//!
//! Format-specific readers (o5m, XML, PBF) decode records and hand them to
//! a [`Loader`], which validates coordinates, applies the optional crop
//! box, interns tags/roles/usernames and routes entities into
//! [`MemoryStorage`]. Bulk `create_*` calls must arrive in strictly
//! increasing id order per kind; that precondition is checked once by
//! [`Loader::finish`], not per call.

use crate::error::{OsmemoryError, Result};
use crate::object::{Member, ObjectKind, OsmNode, OsmRelation, OsmWay, Tag, TagList, COORD_SCALE};
use crate::storage::MemoryStorage;

/// How an incremental-update record should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Create,
    Modify,
    Delete,
}

/// Driver-facing entry point for populating a storage.
pub struct Loader<'a> {
    storage: &'a mut MemoryStorage,
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

impl<'a> Loader<'a> {
    /// A loader without a crop box: every node is kept.
    pub fn new(storage: &'a mut MemoryStorage) -> Self {
        Self {
            storage,
            min_x: i32::MIN,
            max_x: i32::MAX,
            min_y: i32::MIN,
            max_y: i32::MAX,
        }
    }

    /// A loader that skips nodes outside the crop box (degrees). Ways and
    /// relations are kept when they reference at least one loaded node; a
    /// way partially outside the box is filtered, never an error.
    pub fn with_crop_box(
        storage: &'a mut MemoryStorage,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Self {
        Self {
            storage,
            min_x: (min_lon / COORD_SCALE) as i32 - 1,
            max_x: (max_lon / COORD_SCALE) as i32 + 1,
            min_y: (min_lat / COORD_SCALE) as i32 - 1,
            max_y: (max_lat / COORD_SCALE) as i32 + 1,
        }
    }

    pub fn storage(&self) -> &MemoryStorage {
        self.storage
    }

    fn inside_crop_box(&self, lat: i32, lon: i32) -> bool {
        lon >= self.min_x && lon <= self.max_x && lat >= self.min_y && lat <= self.max_y
    }

    fn to_fixed(&self, lat: f64, lon: f64) -> Result<(i32, i32)> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(OsmemoryError::InvalidInput(format!(
                "wrong value for latitude: {lat}"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(OsmemoryError::InvalidInput(format!(
                "wrong value for longitude: {lon}"
            )));
        }
        Ok(((lat / COORD_SCALE).round() as i32, (lon / COORD_SCALE).round() as i32))
    }

    fn intern_tags(&self, tags: &[(&str, &str)]) -> TagList {
        tags.iter()
            .map(|(k, v)| Tag {
                key: self.storage.tags_pack().code(k),
                value: bytes::Bytes::copy_from_slice(v.as_bytes()),
            })
            .collect()
    }

    fn intern_members(&self, members: &[(ObjectKind, i64, &str)]) -> Vec<Member> {
        members
            .iter()
            .map(|(kind, id, role)| Member {
                kind: *kind,
                id: *id,
                role: self.storage.relation_roles_pack().code(role),
            })
            .collect()
    }

    /// Add a node during bulk load. Untagged nodes go to the columnar
    /// arrays, tagged nodes to the sorted object sequence.
    pub fn create_node(
        &mut self,
        id: i64,
        lat: f64,
        lon: f64,
        tags: &[(&str, &str)],
        user: &str,
    ) -> Result<()> {
        let (lat, lon) = self.to_fixed(lat, lon)?;
        if !self.inside_crop_box(lat, lon) {
            return Ok(());
        }
        if tags.is_empty() {
            self.storage.push_simple_node(id, lat, lon);
        } else {
            let node = self.build_node(id, lat, lon, tags, user);
            self.storage.push_node(node);
        }
        Ok(())
    }

    /// Add a way during bulk load. Kept only if at least one referenced
    /// node was loaded, i.e. the way touches the crop box.
    pub fn create_way(
        &mut self,
        id: i64,
        node_ids: &[i64],
        tags: &[(&str, &str)],
        user: &str,
    ) -> Result<()> {
        let inside = node_ids
            .iter()
            .any(|nid| self.storage.node_by_id(*nid).is_some());
        if inside {
            let way = self.build_way(id, node_ids, tags, user);
            self.storage.push_way(way);
        }
        Ok(())
    }

    /// Add a relation during bulk load. Relations are always kept; member
    /// resolution happens at query time and tolerates dangling references.
    pub fn create_relation(
        &mut self,
        id: i64,
        members: &[(ObjectKind, i64, &str)],
        tags: &[(&str, &str)],
        user: &str,
    ) -> Result<()> {
        let relation = self.build_relation(id, members, tags, user);
        self.storage.push_relation(relation);
        Ok(())
    }

    /// Apply an incremental node update. Updates bypass the crop box; an
    /// update stream is assumed already scoped to the dataset.
    pub fn apply_node(
        &mut self,
        mode: UpdateMode,
        id: i64,
        lat: f64,
        lon: f64,
        tags: &[(&str, &str)],
        user: &str,
    ) -> Result<()> {
        if mode == UpdateMode::Delete {
            self.storage.delete_node(id);
            return Ok(());
        }
        let (lat, lon) = self.to_fixed(lat, lon)?;
        if tags.is_empty() {
            self.storage.upsert_simple_node(id, lat, lon);
        } else {
            let node = self.build_node(id, lat, lon, tags, user);
            self.storage.upsert_node(node);
        }
        Ok(())
    }

    pub fn apply_way(
        &mut self,
        mode: UpdateMode,
        id: i64,
        node_ids: &[i64],
        tags: &[(&str, &str)],
        user: &str,
    ) -> Result<()> {
        if mode == UpdateMode::Delete {
            self.storage.delete_way(id);
            return Ok(());
        }
        let way = self.build_way(id, node_ids, tags, user);
        self.storage.upsert_way(way);
        Ok(())
    }

    pub fn apply_relation(
        &mut self,
        mode: UpdateMode,
        id: i64,
        members: &[(ObjectKind, i64, &str)],
        tags: &[(&str, &str)],
        user: &str,
    ) -> Result<()> {
        if mode == UpdateMode::Delete {
            self.storage.delete_relation(id);
            return Ok(());
        }
        let relation = self.build_relation(id, members, tags, user);
        self.storage.upsert_relation(relation);
        Ok(())
    }

    fn build_node(&self, id: i64, lat: i32, lon: i32, tags: &[(&str, &str)], user: &str) -> OsmNode {
        let user = self.storage.users_pack().code(user);
        OsmNode::new(id, lat, lon, self.intern_tags(tags), user)
    }

    fn build_way(&self, id: i64, node_ids: &[i64], tags: &[(&str, &str)], user: &str) -> OsmWay {
        let user = self.storage.users_pack().code(user);
        OsmWay::new(id, node_ids.to_vec(), self.intern_tags(tags), user)
    }

    fn build_relation(
        &self,
        id: i64,
        members: &[(ObjectKind, i64, &str)],
        tags: &[(&str, &str)],
        user: &str,
    ) -> OsmRelation {
        let user = self.storage.users_pack().code(user);
        OsmRelation::new(id, self.intern_members(members), self.intern_tags(tags), user)
    }

    /// Validate ordering and finish the load.
    pub fn finish(self) -> Result<()> {
        self.storage.finish_loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::TaggedObject;

    #[test]
    fn crop_box_filters_nodes_and_ways() {
        let mut storage = MemoryStorage::new();
        {
            let mut loader = Loader::with_crop_box(&mut storage, 0.0, 10.0, 0.0, 10.0);
            loader.create_node(1, 5.0, 5.0, &[], "").unwrap();
            loader.create_node(2, 50.0, 50.0, &[], "").unwrap();
            loader.create_way(3, &[1, 2], &[], "").unwrap();
            loader.create_way(4, &[2], &[], "").unwrap();
            loader.finish().unwrap();
        }
        assert!(storage.node_by_id(1).is_some());
        assert!(storage.node_by_id(2).is_none());
        assert!(storage.way_by_id(3).is_some());
        assert!(storage.way_by_id(4).is_none());
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut storage = MemoryStorage::new();
        let mut loader = Loader::new(&mut storage);
        assert!(loader.create_node(1, 91.0, 0.0, &[], "").is_err());
        assert!(loader.create_node(1, 0.0, -180.5, &[], "").is_err());
        assert!(loader.create_node(1, 90.0, 180.0, &[], "").is_ok());
    }

    #[test]
    fn tagged_and_untagged_nodes_are_routed() {
        let mut storage = MemoryStorage::new();
        {
            let mut loader = Loader::new(&mut storage);
            loader.create_node(1, 1.0, 1.0, &[], "").unwrap();
            loader
                .create_node(2, 2.0, 2.0, &[("amenity", "cafe")], "alice")
                .unwrap();
            loader.finish().unwrap();
        }
        let stats = storage.stats();
        assert_eq!(stats.simple_nodes, 1);
        assert_eq!(stats.tagged_nodes, 1);

        let node = storage.node_by_id(2).unwrap();
        assert_eq!(node.tag_named("amenity", &storage), Some("cafe"));
        assert_eq!(node.user_name(&storage).as_deref(), Some("alice"));
    }

    #[test]
    fn update_modes_dispatch() {
        let mut storage = MemoryStorage::new();
        {
            let mut loader = Loader::new(&mut storage);
            loader.create_node(1, 1.0, 1.0, &[], "").unwrap();
            loader.finish().unwrap();
        }
        {
            let mut loader = Loader::new(&mut storage);
            loader
                .apply_node(UpdateMode::Modify, 1, 2.0, 2.0, &[], "")
                .unwrap();
            loader
                .apply_node(UpdateMode::Create, 5, 3.0, 3.0, &[("name", "x")], "bob")
                .unwrap();
            loader
                .apply_way(UpdateMode::Create, 9, &[1, 5], &[], "bob")
                .unwrap();
        }
        assert_eq!(storage.node_by_id(1).unwrap().lat(), 20_000_000);
        assert!(storage.node_by_id(5).unwrap().has_tag_named("name", &storage));
        assert!(storage.way_by_id(9).is_some());

        let mut loader = Loader::new(&mut storage);
        loader
            .apply_node(UpdateMode::Delete, 5, 0.0, 0.0, &[], "")
            .unwrap();
        loader.apply_way(UpdateMode::Delete, 9, &[], &[], "").unwrap();
        drop(loader);
        assert!(storage.node_by_id(5).is_none());
        assert!(storage.way_by_id(9).is_none());
    }
}
