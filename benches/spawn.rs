use criterion::*;
use std::hint::black_box;

use columnar_ecs::World;

mod common;
use common::*;

fn spawn_benchmark(c: &mut Criterion) {
    init_components();

    let mut group = c.benchmark_group("spawn");

    group.bench_function("create_10k_three_components", |b| {
        b.iter_batched(
            World::new,
            |mut world| {
                populate(&mut world, AGENTS_SMALL);
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("create_destroy_churn_10k", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                populate(&mut world, AGENTS_SMALL);
                world
            },
            |mut world| {
                let description = wealth_query();
                let entities: Vec<_> = world
                    .query(&description)
                    .unwrap()
                    .entities()
                    .map(|(entity, _, _)| entity)
                    .collect();
                for entity in entities {
                    world.destroy(entity).unwrap();
                }
                populate(&mut world, AGENTS_SMALL);
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("add_remove_component_10k", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                populate(&mut world, AGENTS_SMALL);
                let description = wealth_query();
                let entities: Vec<_> = world
                    .query(&description)
                    .unwrap()
                    .entities()
                    .map(|(entity, _, _)| entity)
                    .collect();
                (world, entities)
            },
            |(mut world, entities)| {
                for &entity in &entities {
                    world.remove::<Wealth>(entity).unwrap();
                }
                for &entity in &entities {
                    world.add(entity, Wealth { value: 1.0 }).unwrap();
                }
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
