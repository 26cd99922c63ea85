use criterion::{black_box, criterion_group, criterion_main, Criterion};
use osmemory::{AdaptiveFastArea, Area, FastArea, Loader, MemoryStorage};

fn grid_storage(per_axis: i64) -> MemoryStorage {
    let mut storage = MemoryStorage::new();
    let mut loader = Loader::new(&mut storage);
    let mut id = 1;
    for i in 0..per_axis {
        for j in 0..per_axis {
            let lat = i as f64 * 10.0 / per_axis as f64;
            let lon = j as f64 * 10.0 / per_axis as f64;
            loader.create_node(id, lat, lon, &[], "").unwrap();
            id += 1;
        }
    }
    loader.finish().unwrap();
    storage
}

fn benchmark_covers(c: &mut Criterion) {
    let mut group = c.benchmark_group("covers");

    let storage = grid_storage(100);
    let area = Area::from_wkt("POLYGON((2 2, 8 2, 8 8, 2 8, 2 2))").unwrap();

    let fast = FastArea::new(&area, &storage).unwrap();
    group.bench_function("fast_area_points", |b| {
        let mut id = 1i64;
        b.iter(|| {
            let node = storage.node_by_id(black_box(id)).unwrap();
            id = id % 10_000 + 1;
            fast.covers_node(&node)
        })
    });

    let adaptive = AdaptiveFastArea::new(&area, &storage).unwrap();
    group.bench_function("adaptive_area_points", |b| {
        let mut id = 1i64;
        b.iter(|| {
            let node = storage.node_by_id(black_box(id)).unwrap();
            id = id % 10_000 + 1;
            adaptive.covers_node(&node)
        })
    });

    group.finish();
}

fn benchmark_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage_lookup");

    let storage = grid_storage(100);
    group.bench_function("node_by_id", |b| {
        let mut id = 1i64;
        b.iter(|| {
            id = id % 10_000 + 1;
            storage.node_by_id(black_box(id))
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_covers, benchmark_lookup);
criterion_main!(benches);
