use criterion::*;
use std::hint::black_box;

use columnar_ecs::World;

mod common;
use common::*;

fn iterate_benchmark(c: &mut Criterion) {
    init_components();

    let mut group = c.benchmark_group("iterate");

    group.bench_function("integrate_position_100k", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                populate(&mut world, AGENTS_MED);
                world
            },
            |mut world| {
                let description = position_velocity_query();
                let view = world.query_mut(&description).unwrap();
                for chunk in view.chunks_mut() {
                    let (positions, velocities) =
                        chunk.pair_mut::<Position, Velocity>().unwrap();
                    for (position, velocity) in positions.iter_mut().zip(velocities.iter()) {
                        position.x += velocity.dx;
                        position.y += velocity.dy;
                    }
                }
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("sum_wealth_100k", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                populate(&mut world, AGENTS_MED);
                world
            },
            |mut world| {
                let description = wealth_query();
                let view = world.query(&description).unwrap();
                let mut total = 0.0f32;
                for chunk in view.chunks() {
                    for wealth in chunk.slice::<Wealth>().unwrap() {
                        total += wealth.value;
                    }
                }
                black_box(total);
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
