//! Multipolygon reconstruction tests. Fixture shapes follow the
//! documented multipolygon mapping cases: single outer ring with holes,
//! rings split across several ways, island groups, and malformed inputs.

use osmemory::geometry::{equals_topo, multipolygon_from_wkt};
use osmemory::{
    Area, ExtendedRelation, ExtendedWay, Loader, MemoryStorage, ObjectKind, ObjectRef,
    OsmemoryError,
};

/// Build a storage from untagged nodes `(id, x, y)` (x = lon, y = lat),
/// ways `(id, node ids)` and relations `(id, members)`.
fn build(
    nodes: &[(i64, f64, f64)],
    ways: &[(i64, &[i64])],
    relations: &[(i64, &[(ObjectKind, i64, &str)])],
) -> MemoryStorage {
    let mut storage = MemoryStorage::new();
    let mut loader = Loader::new(&mut storage);
    for &(id, x, y) in nodes {
        loader.create_node(id, y, x, &[], "").unwrap();
    }
    for &(id, node_ids) in ways {
        loader.create_way(id, node_ids, &[], "").unwrap();
    }
    for &(id, members) in relations {
        loader.create_relation(id, members, &[], "").unwrap();
    }
    loader.finish().unwrap();
    storage
}

fn relation_area(storage: &MemoryStorage, id: i64) -> Result<Area, OsmemoryError> {
    let relation = storage.relation_by_id(id).unwrap();
    Area::from_object(storage, ObjectRef::Relation(relation))
}

fn assert_area_wkt(storage: &MemoryStorage, relation_id: i64, wkt: &str) {
    let area = relation_area(storage, relation_id).unwrap();
    let expected = multipolygon_from_wkt(wkt).unwrap();
    assert!(
        equals_topo(&expected, area.geometry()),
        "expected {wkt}, got {}",
        area.to_wkt()
    );
}

#[test]
fn outer_ring_with_inner_hole() {
    let storage = build(
        &[
            (1, 5.0, 6.0),
            (2, 8.0, 11.0),
            (3, 12.0, 9.0),
            (4, 13.0, 5.0),
            (5, 8.0, 2.0),
            (6, 7.0, 6.0),
            (7, 9.0, 5.0),
            (8, 10.0, 7.0),
            (9, 8.0, 8.0),
        ],
        &[(1, &[1, 2, 3, 4, 5, 1]), (2, &[6, 7, 8, 9, 6])],
        &[(
            1,
            &[
                (ObjectKind::Way, 1, "outer"),
                (ObjectKind::Way, 2, "inner"),
            ],
        )],
    );
    assert_area_wkt(
        &storage,
        1,
        "POLYGON ((5 6, 8 11, 12 9, 13 5, 8 2, 5 6), (7 6, 9 5, 10 7, 8 8, 7 6))",
    );
}

#[test]
fn outer_ring_split_across_two_ways() {
    let storage = build(
        &[
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 10.0, 10.0),
            (4, 0.0, 10.0),
        ],
        &[(1, &[1, 2, 3]), (2, &[3, 4, 1])],
        &[(
            1,
            &[
                (ObjectKind::Way, 1, "outer"),
                (ObjectKind::Way, 2, "outer"),
            ],
        )],
    );
    assert_area_wkt(&storage, 1, "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))");
}

#[test]
fn fragment_is_reversed_when_needed() {
    // second way runs the same direction as the first, so it only attaches
    // after reversal
    let storage = build(
        &[
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 10.0, 10.0),
            (4, 0.0, 10.0),
        ],
        &[(1, &[1, 2, 3]), (2, &[1, 4, 3])],
        &[(
            1,
            &[
                (ObjectKind::Way, 1, "outer"),
                (ObjectKind::Way, 2, ""),
            ],
        )],
    );
    assert_area_wkt(&storage, 1, "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))");
}

#[test]
fn two_disjoint_islands() {
    let storage = build(
        &[
            (1, 1.0, 6.0),
            (2, 4.0, 11.0),
            (3, 8.0, 9.0),
            (4, 9.0, 5.0),
            (5, 4.0, 2.0),
            (6, 9.0, 9.0),
            (7, 11.0, 11.0),
            (8, 15.0, 8.0),
            (9, 12.0, 2.0),
            (10, 10.0, 5.0),
        ],
        &[(1, &[1, 2, 3, 4, 5, 1]), (2, &[6, 7, 8, 9, 10, 6])],
        &[(
            1,
            &[
                (ObjectKind::Way, 1, "outer"),
                (ObjectKind::Way, 2, "outer"),
            ],
        )],
    );
    assert_area_wkt(
        &storage,
        1,
        "MULTIPOLYGON (((1 6, 4 11, 8 9, 9 5, 4 2, 1 6)), ((9 9, 11 11, 15 8, 12 2, 10 5, 9 9)))",
    );
}

#[test]
fn islands_with_holes_grouped_by_listing_order() {
    let storage = build(
        &[
            (1, 1.0, 6.0),
            (2, 4.0, 11.0),
            (3, 8.0, 9.0),
            (4, 9.0, 5.0),
            (5, 4.0, 2.0),
            (6, 3.0, 7.0),
            (7, 4.0, 4.0),
            (8, 6.0, 4.0),
            (9, 7.0, 7.0),
            (10, 6.0, 9.0),
            (11, 9.0, 9.0),
            (12, 11.0, 11.0),
            (13, 15.0, 8.0),
            (14, 12.0, 2.0),
            (15, 10.0, 5.0),
            (16, 10.0, 9.0),
            (17, 10.0, 6.0),
            (18, 12.0, 5.0),
            (19, 14.0, 7.0),
            (20, 12.0, 9.0),
        ],
        &[
            (1, &[1, 2, 3, 4, 5, 1]),
            (2, &[6, 7, 8, 9, 10, 6]),
            (3, &[11, 12, 13, 14, 15, 11]),
            (4, &[16, 17, 18, 19, 20, 16]),
        ],
        &[(
            1,
            &[
                (ObjectKind::Way, 1, "outer"),
                (ObjectKind::Way, 2, "inner"),
                (ObjectKind::Way, 3, "outer"),
                (ObjectKind::Way, 4, "inner"),
            ],
        )],
    );
    assert_area_wkt(
        &storage,
        1,
        "MULTIPOLYGON (((1 6, 4 11, 8 9, 9 5, 4 2, 1 6), (3 7, 4 4, 6 4, 7 7, 6 9, 3 7)), \
         ((9 9, 11 11, 15 8, 12 2, 10 5, 9 9), (10 9, 10 6, 12 5, 14 7, 12 9, 10 9)))",
    );
}

#[test]
fn unclosed_outer_ring_fails() {
    let storage = build(
        &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 10.0, 10.0)],
        &[(1, &[1, 2, 3])],
        &[(1, &[(ObjectKind::Way, 1, "outer")])],
    );
    let err = relation_area(&storage, 1).unwrap_err();
    assert!(matches!(err, OsmemoryError::NonClosedRing { .. }));
    assert!(err.to_string().starts_with("non-closed line"));
}

#[test]
fn ring_with_missing_final_segment_fails() {
    // two fragments meet at one end only; the other ends never join
    let storage = build(
        &[
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 10.0, 10.0),
            (4, 0.0, 10.0),
        ],
        &[(1, &[1, 2, 3]), (2, &[3, 4])],
        &[(
            1,
            &[
                (ObjectKind::Way, 1, "outer"),
                (ObjectKind::Way, 2, "outer"),
            ],
        )],
    );
    let err = relation_area(&storage, 1).unwrap_err();
    assert!(err.to_string().starts_with("non-closed line"));
}

#[test]
fn missing_member_is_an_error() {
    let storage = build(
        &[(1, 0.0, 0.0)],
        &[],
        &[(1, &[(ObjectKind::Way, 999, "outer")])],
    );
    let err = relation_area(&storage, 1).unwrap_err();
    assert_eq!(err.to_string(), "object w999 not exist for relation #1");
}

#[test]
fn non_way_ring_member_is_an_error() {
    let storage = build(
        &[(1, 0.0, 0.0)],
        &[],
        &[(1, &[(ObjectKind::Node, 1, "outer")])],
    );
    let err = relation_area(&storage, 1).unwrap_err();
    assert_eq!(err.to_string(), "not a way outer object n1 for relation #1");
}

#[test]
fn border_member_reuses_other_area() {
    let storage = build(
        &[
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 10.0, 10.0),
            (4, 0.0, 10.0),
        ],
        &[(1, &[1, 2, 3, 4, 1])],
        &[
            (1, &[(ObjectKind::Way, 1, "border")]),
            (
                2,
                &[
                    (ObjectKind::Way, 1, "border"),
                    (ObjectKind::Way, 1, "outer"),
                ],
            ),
        ],
    );
    assert_area_wkt(&storage, 1, "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))");

    let err = relation_area(&storage, 2).unwrap_err();
    assert!(matches!(err, OsmemoryError::MixedBorderMembers { .. }));
}

#[test]
fn relation_without_ring_members_fails() {
    let storage = build(
        &[(1, 0.0, 0.0)],
        &[],
        &[(1, &[(ObjectKind::Node, 1, "admin_centre")])],
    );
    let err = relation_area(&storage, 1).unwrap_err();
    assert!(matches!(err, OsmemoryError::NoOuterMembers { .. }));
}

#[test]
fn non_ring_roles_are_ignored() {
    let storage = build(
        &[
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 10.0, 10.0),
            (4, 0.0, 10.0),
            (5, 5.0, 5.0),
        ],
        &[(1, &[1, 2, 3, 4, 1])],
        &[(
            1,
            &[
                (ObjectKind::Node, 5, "admin_centre"),
                (ObjectKind::Way, 1, "outer"),
            ],
        )],
    );
    assert_area_wkt(&storage, 1, "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))");
}

#[test]
fn closed_way_becomes_area() {
    let storage = build(
        &[
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 10.0, 10.0),
            (4, 0.0, 10.0),
        ],
        &[(1, &[1, 2, 3, 4, 1]), (2, &[1, 2, 3])],
        &[],
    );
    let way = storage.way_by_id(1).unwrap();
    let area = Area::from_object(&storage, ObjectRef::Way(way)).unwrap();
    let expected = multipolygon_from_wkt("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))").unwrap();
    assert!(equals_topo(&expected, area.geometry()));

    let open = storage.way_by_id(2).unwrap();
    let err = Area::from_object(&storage, ObjectRef::Way(open)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "impossible to create polygon from way #2: non-closed way"
    );
}

#[test]
fn node_has_no_area() {
    let storage = build(&[(1, 0.0, 0.0)], &[], &[]);
    let node = storage.node_by_id(1).unwrap();
    let err = Area::from_object(&storage, ObjectRef::Node(node)).unwrap_err();
    assert_eq!(err.to_string(), "n1 can't be area");
}

#[test]
fn extended_way_tracks_dangling_nodes() {
    let mut storage = build(
        &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 10.0, 10.0)],
        &[],
        &[],
    );
    // bypass the loader's node-presence filter to get a dangling reference
    storage.upsert_way(osmemory::OsmWay::new(
        1,
        vec![1, 2, 3, 99, 1],
        osmemory::TagList::new(),
        0,
    ));

    let way = storage.way_by_id(1).unwrap();
    let extended = ExtendedWay::new(way, &storage);
    assert!(!extended.is_all_points_defined());
    assert!(extended.is_closed());
    let err = extended.area().unwrap_err();
    assert_eq!(
        err.to_string(),
        "impossible to create polygon from way #1: not all points defined"
    );

    let bbox = extended.bounding_box();
    assert_eq!(bbox.min_lat, 0);
    assert_eq!(bbox.max_lon, 100_000_000);
}

#[test]
fn dangling_node_inside_ring_member_fails() {
    let mut storage = build(&[(1, 0.0, 0.0), (2, 10.0, 0.0)], &[], &[]);
    storage.upsert_way(osmemory::OsmWay::new(
        1,
        vec![1, 2, 42, 1],
        osmemory::TagList::new(),
        0,
    ));
    storage.upsert_relation(osmemory::OsmRelation::new(
        1,
        vec![osmemory::Member {
            kind: ObjectKind::Way,
            id: 1,
            role: storage.relation_roles_pack().code("outer"),
        }],
        osmemory::TagList::new(),
        0,
    ));
    let err = relation_area(&storage, 1).unwrap_err();
    assert_eq!(err.to_string(), "node #42 not exist for way #1");
}

#[test]
fn relation_bbox_and_cycle_guard() {
    let mut storage = build(
        &[(1, 2.0, 3.0), (2, 8.0, 9.0)],
        &[],
        &[],
    );
    let roles = storage.relation_roles_pack().code("");
    // r1 -> n1, r2; r2 -> n2, r1 (cycle)
    storage.upsert_relation(osmemory::OsmRelation::new(
        1,
        vec![
            osmemory::Member {
                kind: ObjectKind::Node,
                id: 1,
                role: roles,
            },
            osmemory::Member {
                kind: ObjectKind::Relation,
                id: 2,
                role: roles,
            },
        ],
        osmemory::TagList::new(),
        0,
    ));
    storage.upsert_relation(osmemory::OsmRelation::new(
        2,
        vec![
            osmemory::Member {
                kind: ObjectKind::Node,
                id: 2,
                role: roles,
            },
            osmemory::Member {
                kind: ObjectKind::Relation,
                id: 1,
                role: roles,
            },
        ],
        osmemory::TagList::new(),
        0,
    ));

    let relation = storage.relation_by_id(1).unwrap();
    let extended = ExtendedRelation::new(relation, &storage);
    assert!(extended.is_all_points_defined());
    let bbox = extended.bounding_box();
    assert_eq!(bbox.min_lat, 30_000_000);
    assert_eq!(bbox.max_lat, 90_000_000);
    assert_eq!(bbox.min_lon, 20_000_000);
    assert_eq!(bbox.max_lon, 80_000_000);
}

#[test]
fn border_nodes_collected_during_reconstruction() {
    let storage = build(
        &[
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 10.0, 10.0),
            (4, 0.0, 10.0),
        ],
        &[(1, &[1, 2, 3, 4, 1])],
        &[(1, &[(ObjectKind::Way, 1, "outer")])],
    );
    let relation = storage.relation_by_id(1).unwrap();
    let extended = ExtendedRelation::new(relation, &storage);
    let border = extended.border_nodes().unwrap();
    assert_eq!(border.len(), 4);
    for id in [1, 2, 3, 4] {
        assert!(border.contains(&id));
    }
}
