//! Spatial index and collision-candidate benchmarks at full entity capacity.
//!
//! The actor tick issues one candidate query per frame; at 60 Hz the whole
//! frame budget is 16.67ms, so a query should stay in the low microseconds.
//!
//! Run with: `cargo bench --bench spatial_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use hopper_world::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A default-capacity world holding `count` platforms on a square grid with
/// `spacing` units between centers.
fn populated_world(count: usize, spacing: f64) -> World {
    let mut world = World::new();
    let side = (count as f64).sqrt().ceil() as usize;
    for i in 0..count {
        let x = (i % side) as f64 * spacing;
        let z = (i / side) as f64 * spacing;
        world
            .spawn(EntitySpec::new(
                EntityKind::Platform,
                Vec3::new(x, 0.0, z),
                Vec3::new(2.0, 1.0, 2.0),
            ))
            .expect("capacity sized for the grid");
    }
    world
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_query");
    for &spacing in &[2.0, 4.0, 8.0] {
        let world = populated_world(500, spacing);
        let index = world.spatial().clone();
        let mut buf = Vec::new();
        group.bench_with_input(
            BenchmarkId::new("query_into", spacing),
            &spacing,
            |b, &spacing| {
                let mut t = 0.0f64;
                b.iter(|| {
                    t += 0.37;
                    let x = (t * spacing) % 40.0;
                    index.query_into(black_box(x), black_box(x * 0.5), &mut buf);
                    black_box(buf.len())
                })
            },
        );
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let world = populated_world(500, 4.0);
    let mut index = world.spatial().clone();
    let ids: Vec<EntityId> = world.ids().to_vec();
    c.bench_function("spatial_update_500_moving", |b| {
        let mut t = 0.0f64;
        b.iter(|| {
            t += 0.1;
            for (i, id) in ids.iter().enumerate() {
                let x = (i as f64 * 4.0 + t.sin() * 6.0) % 90.0;
                index.update(id, black_box(x), black_box(i as f64 * 0.2));
            }
        })
    });
}

fn bench_candidates(c: &mut Criterion) {
    let mut world = populated_world(499, 4.0);
    world
        .spawn(EntitySpec::new(
            EntityKind::Platform,
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(400.0, 1.0, 400.0),
        ))
        .expect("one slot reserved for the floor");
    c.bench_function("collision_candidates_with_oversized", |b| {
        b.iter(|| black_box(world.collision_candidates(black_box(20.0), black_box(20.0))))
    });
}

criterion_group!(benches, bench_query, bench_update, bench_candidates);
criterion_main!(benches);
