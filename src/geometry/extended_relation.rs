//! Cached derived geometry for a relation, including multipolygon
//! reconstruction from role-tagged members.

use std::collections::VecDeque;
use std::ops::ControlFlow;

use geo::{Coord, LineString, MultiPolygon, Polygon, Validation};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashSet;

use crate::error::{OsmemoryError, Result};
use crate::geometry::area::area_of_ref;
use crate::geometry::bbox::BoundingBox;
use crate::geometry::helper::{coord_of, subtract, union};
use crate::object::{ObjectRef, OsmRelation, OsmWay, TaggedObject};
use crate::storage::MemoryStorage;

/// A relation plus memoized derived state: bounding box, whether every
/// transitively referenced node resolves, the reconstructed area and the
/// node ids making up its border. Computed at most once per wrapper; safe
/// for concurrent first touch.
pub struct ExtendedRelation<'a> {
    relation: &'a OsmRelation,
    storage: &'a MemoryStorage,
    summary: OnceCell<Summary>,
    area: OnceCell<AreaBuild>,
}

struct Summary {
    bbox: BoundingBox,
    all_points_defined: bool,
}

struct AreaBuild {
    geom: MultiPolygon<f64>,
    border_nodes: FxHashSet<i64>,
}

/// One member way, flattened for ring assembly.
struct Fragment {
    inner: bool,
    ids: Vec<i64>,
    coords: Vec<Coord<f64>>,
}

impl<'a> ExtendedRelation<'a> {
    pub fn new(relation: &'a OsmRelation, storage: &'a MemoryStorage) -> Self {
        Self {
            relation,
            storage,
            summary: OnceCell::new(),
            area: OnceCell::new(),
        }
    }

    pub fn relation(&self) -> &'a OsmRelation {
        self.relation
    }

    fn summary(&self) -> &Summary {
        self.summary.get_or_init(|| {
            let mut bbox = BoundingBox::new();
            let mut all_points_defined = true;
            self.visit_nodes(|point| {
                match point {
                    Some((lat, lon)) => bbox.expand_to_include(lat, lon),
                    None => all_points_defined = false,
                }
                ControlFlow::Continue(())
            });
            Summary {
                bbox,
                all_points_defined,
            }
        })
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.summary().bbox
    }

    /// False when any node reachable through members dangles.
    pub fn is_all_points_defined(&self) -> bool {
        self.summary().all_points_defined
    }

    /// Reconstruct the relation's area. Computed once and cached.
    pub fn area(&self) -> Result<&MultiPolygon<f64>> {
        self.area
            .get_or_try_init(|| self.build_area())
            .map(|build| &build.geom)
    }

    /// Node ids lying on the area's border. Forces area reconstruction.
    pub fn border_nodes(&self) -> Result<&FxHashSet<i64>> {
        self.area
            .get_or_try_init(|| self.build_area())
            .map(|build| &build.border_nodes)
    }

    /// Visit every node transitively reachable through members, depth
    /// first. Dangling node references inside ways surface as `None`;
    /// entirely missing members are skipped, as are relations already seen
    /// on the current walk (cyclic relation graphs occur in real data and
    /// are tolerated).
    pub fn visit_nodes<F>(&self, mut f: F) -> Option<bool>
    where
        F: FnMut(Option<(i32, i32)>) -> ControlFlow<bool>,
    {
        let mut visited = FxHashSet::default();
        self.visit_relation(self.relation, &mut visited, &mut f)
    }

    fn visit_relation<F>(
        &self,
        relation: &OsmRelation,
        visited: &mut FxHashSet<i64>,
        f: &mut F,
    ) -> Option<bool>
    where
        F: FnMut(Option<(i32, i32)>) -> ControlFlow<bool>,
    {
        visited.insert(relation.id());
        for index in 0..relation.members().len() {
            let result = match relation.member_object(self.storage, index) {
                None => None,
                Some(ObjectRef::Node(node)) => {
                    match f(Some((node.lat(), node.lon()))) {
                        ControlFlow::Break(value) => Some(value),
                        ControlFlow::Continue(()) => None,
                    }
                }
                Some(ObjectRef::Way(way)) => self.visit_way(way, f),
                Some(ObjectRef::Relation(nested)) => {
                    if visited.contains(&nested.id()) {
                        continue;
                    }
                    self.visit_relation(nested, visited, f)
                }
            };
            if result.is_some() {
                return result;
            }
        }
        None
    }

    fn visit_way<F>(&self, way: &OsmWay, f: &mut F) -> Option<bool>
    where
        F: FnMut(Option<(i32, i32)>) -> ControlFlow<bool>,
    {
        for &nid in way.node_ids() {
            let point = self.storage.node_by_id(nid).map(|n| (n.lat(), n.lon()));
            if let ControlFlow::Break(value) = f(point) {
                return Some(value);
            }
        }
        None
    }

    fn build_area(&self) -> Result<AreaBuild> {
        let relation_id = self.relation.id();
        let mut border_nodes = FxHashSet::default();
        let mut fragments: VecDeque<Fragment> = VecDeque::new();
        let mut border: Option<MultiPolygon<f64>> = None;

        for (index, member) in self.relation.members().iter().enumerate() {
            let role = self
                .relation
                .member_role(self.storage, index)
                .unwrap_or_default();
            match role.as_str() {
                "outer" | "" => {
                    let way = self.require_way_member(index, "outer")?;
                    fragments.push_back(self.way_fragment(way, false, &mut border_nodes)?);
                }
                "inner" => {
                    let way = self.require_way_member(index, "inner")?;
                    fragments.push_back(self.way_fragment(way, true, &mut border_nodes)?);
                }
                "border" => {
                    let object = self.relation.member_object(self.storage, index).ok_or_else(
                        || OsmemoryError::MissingMember {
                            member: member.code(),
                            relation: relation_id,
                        },
                    )?;
                    border = Some(area_of_ref(self.storage, object)?);
                }
                // roles like admin_centre or label carry no ring geometry
                _ => {}
            }
        }

        if let Some(border) = border {
            if !fragments.is_empty() {
                return Err(OsmemoryError::MixedBorderMembers {
                    code: self.relation.object_code(),
                });
            }
            return Ok(AreaBuild {
                geom: border,
                border_nodes,
            });
        }
        if fragments.is_empty() {
            return Err(OsmemoryError::NoOuterMembers {
                code: self.relation.object_code(),
            });
        }

        // Rings are consumed as leading same-role runs in member order:
        // consecutive outers form a group, immediately following inners cut
        // holes out of that whole group. Groups accumulate by union.
        let mut geom: Option<MultiPolygon<f64>> = None;
        while !fragments.is_empty() {
            let outer = take_leading_run(&mut fragments, false);
            let inner = take_leading_run(&mut fragments, true);
            let outer_geom = polygonize(outer)?;
            if !outer_geom.is_valid() {
                return Err(OsmemoryError::RelationGeometry {
                    relation: relation_id,
                    reason: "outer part is not valid",
                });
            }
            let inner_geom = polygonize(inner)?;
            if !inner_geom.is_valid() {
                return Err(OsmemoryError::RelationGeometry {
                    relation: relation_id,
                    reason: "inner part is not valid",
                });
            }
            let group = subtract(&outer_geom, &inner_geom);
            geom = Some(match geom {
                None => group,
                Some(acc) => union(&acc, &group),
            });
        }
        let geom = geom.ok_or(OsmemoryError::NoOuterMembers {
            code: self.relation.object_code(),
        })?;
        if !geom.is_valid() {
            return Err(OsmemoryError::RelationGeometry {
                relation: relation_id,
                reason: "it is not valid",
            });
        }
        Ok(AreaBuild { geom, border_nodes })
    }

    fn require_way_member(&self, index: usize, role: &'static str) -> Result<&'a OsmWay> {
        let member = &self.relation.members()[index];
        let object = self.relation.member_object(self.storage, index).ok_or_else(|| {
            OsmemoryError::MissingMember {
                member: member.code(),
                relation: self.relation.id(),
            }
        })?;
        match object {
            ObjectRef::Way(way) => Ok(way),
            other => Err(OsmemoryError::RingMemberNotAWay {
                role,
                member: other.object_code(),
                relation: self.relation.id(),
            }),
        }
    }

    fn way_fragment(
        &self,
        way: &OsmWay,
        inner: bool,
        border_nodes: &mut FxHashSet<i64>,
    ) -> Result<Fragment> {
        let mut ids = Vec::with_capacity(way.node_ids().len());
        let mut coords = Vec::with_capacity(way.node_ids().len());
        for &nid in way.node_ids() {
            let node = self
                .storage
                .node_by_id(nid)
                .ok_or(OsmemoryError::MissingNode {
                    node: nid,
                    way: way.id(),
                })?;
            border_nodes.insert(nid);
            ids.push(nid);
            coords.push(coord_of(node.lat(), node.lon()));
        }
        Ok(Fragment { inner, ids, coords })
    }
}

fn take_leading_run(pool: &mut VecDeque<Fragment>, inner: bool) -> Vec<Fragment> {
    let mut run = Vec::new();
    while let Some(front) = pool.front() {
        if front.inner != inner {
            break;
        }
        if let Some(fragment) = pool.pop_front() {
            run.push(fragment);
        }
    }
    run
}

/// Stitch a run of fragments into closed rings and return them as a
/// multipolygon. An empty run yields an empty multipolygon.
fn polygonize(fragments: Vec<Fragment>) -> Result<MultiPolygon<f64>> {
    let mut pool = fragments;
    let mut polygons = Vec::new();
    while !pool.is_empty() {
        let ring = close_ring(&mut pool)?;
        polygons.push(ring);
    }
    Ok(MultiPolygon::new(polygons))
}

/// Grow one ring: repeatedly scan the pool for a fragment whose first or
/// last node id matches either end of the ring built so far, appending it
/// (reversed if needed) until nothing attaches. The finished ring must be
/// closed and simple.
fn close_ring(pool: &mut Vec<Fragment>) -> Result<Polygon<f64>> {
    let mut ids: Vec<i64> = Vec::new();
    let mut coords: Vec<Coord<f64>> = Vec::new();

    loop {
        let mut found = false;
        let mut index = 0;
        while index < pool.len() {
            if attach(&mut ids, &mut coords, &pool[index]) {
                pool.remove(index);
                found = true;
            } else {
                index += 1;
            }
        }
        if !found {
            break;
        }
    }

    if ids.is_empty() || ids[0] != ids[ids.len() - 1] {
        let (start_x, start_y) = coords.first().map(|c| (c.x, c.y)).unwrap_or((0.0, 0.0));
        let (end_x, end_y) = coords.last().map(|c| (c.x, c.y)).unwrap_or((0.0, 0.0));
        return Err(OsmemoryError::NonClosedRing {
            start_x,
            start_y,
            end_x,
            end_y,
        });
    }

    let polygon = Polygon::new(LineString::new(coords), Vec::new());
    if !polygon.is_valid() {
        let (x, y) = polygon
            .exterior()
            .0
            .first()
            .map(|c| (c.x, c.y))
            .unwrap_or((0.0, 0.0));
        return Err(OsmemoryError::SelfIntersectedRing { x, y });
    }
    Ok(polygon)
}

/// Try to splice `fragment` onto either end of the ring under
/// construction. The shared joint node is kept once.
fn attach(ids: &mut Vec<i64>, coords: &mut Vec<Coord<f64>>, fragment: &Fragment) -> bool {
    if fragment.ids.is_empty() {
        // nothing to contribute; consume it
        return true;
    }
    if ids.is_empty() {
        ids.extend_from_slice(&fragment.ids);
        coords.extend_from_slice(&fragment.coords);
        return true;
    }

    let tail_first = ids[0];
    let tail_last = ids[ids.len() - 1];
    let frag_first = fragment.ids[0];
    let frag_last = fragment.ids[fragment.ids.len() - 1];
    let len = fragment.ids.len();

    if frag_first == tail_last {
        ids.extend_from_slice(&fragment.ids[1..]);
        coords.extend_from_slice(&fragment.coords[1..]);
    } else if frag_first == tail_first {
        let mut head_ids = fragment.ids[1..].to_vec();
        let mut head_coords = fragment.coords[1..].to_vec();
        head_ids.reverse();
        head_coords.reverse();
        ids.splice(0..0, head_ids);
        coords.splice(0..0, head_coords);
    } else if frag_last == tail_first {
        ids.splice(0..0, fragment.ids[..len - 1].iter().copied());
        coords.splice(0..0, fragment.coords[..len - 1].iter().copied());
    } else if frag_last == tail_last {
        let mut tail_ids = fragment.ids[..len - 1].to_vec();
        let mut tail_coords = fragment.coords[..len - 1].to_vec();
        tail_ids.reverse();
        tail_coords.reverse();
        ids.extend_from_slice(&tail_ids);
        coords.extend_from_slice(&tail_coords);
    } else {
        return false;
    }
    true
}
