//! Benchmarks for stepping and querying a populated space.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

use phys_space::{BodyType, ObjectDesc, PhysicsObject, Space, SpaceConfig, Vector2};

/// Builds a space with a static floor and `count` circles dropped at random heights
fn pile_of_balls(count: usize) -> Space {
    let mut space = Space::new(SpaceConfig::default()).expect("default config is valid");
    let mut rng = rand::thread_rng();

    let floor = PhysicsObject::segment(
        Vector2::new(-2000.0, 0.0),
        Vector2::new(2000.0, 0.0),
        5.0,
        ObjectDesc::default().with_body_type(BodyType::Static),
    );
    space.add(&floor).expect("add floor");

    for _ in 0..count {
        let position = Vector2::new(rng.gen_range(-1500.0..1500.0), rng.gen_range(20.0..2000.0));
        let ball = PhysicsObject::circle(10.0, ObjectDesc::default().with_position(position));
        space.add(&ball).expect("add ball");
    }

    space
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("space_update");

    for count in [10, 100, 500] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut space = pile_of_balls(count);
            b.iter(|| black_box(space.update(1.0 / 60.0)));
        });
    }

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("space_query");
    let mut space = pile_of_balls(500);
    for _ in 0..60 {
        space.update(1.0 / 60.0);
    }

    group.bench_function("find_near_object", |b| {
        b.iter(|| black_box(space.find_near_object(Vector2::new(0.0, 50.0), 100.0, None)));
    });
    group.bench_function("find_objects", |b| {
        b.iter(|| black_box(space.find_objects(Vector2::new(0.0, 50.0), 200.0, None)));
    });

    let ball = space.get_objects()[1].clone();
    group.bench_function("object_query", |b| {
        b.iter(|| black_box(space.object_query(&ball)));
    });

    group.finish();
}

criterion_group!(benches, bench_update, bench_queries);
criterion_main!(benches);
