use std::mem::{align_of, size_of};
use std::sync::Once;

use columnar_ecs::{
    component_type_of, register_component, QueryDescription, Signature, World,
    CHUNK_BYTE_BUDGET,
};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

// Larger than the whole chunk byte budget.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Wide([u64; 2048]);

static INIT: Once = Once::new();

fn init_registry() {
    INIT.call_once(|| {
        register_component::<Position>().unwrap();
        register_component::<Velocity>().unwrap();
        register_component::<Wide>().unwrap();
    });
}

fn position_velocity_query() -> QueryDescription {
    let position = component_type_of::<Position>().unwrap();
    let velocity = component_type_of::<Velocity>().unwrap();
    QueryDescription::new().with_all(Signature::from_types([position, velocity]))
}

#[test]
fn columns_are_contiguous_and_aligned() {
    init_registry();

    let mut world = World::new();
    for i in 0..1024 {
        world
            .create((
                Position { x: i as f32, y: 0.0 },
                Velocity { dx: 0.5, dy: i as f32 },
            ))
            .unwrap();
    }

    let description = position_velocity_query();
    let view = world.query(&description).unwrap();
    let chunk = view.chunks().next().expect("one populated chunk");

    let positions = chunk.slice::<Position>().unwrap();
    let velocities = chunk.slice::<Velocity>().unwrap();
    assert_eq!(positions.len(), chunk.len());
    assert_eq!(velocities.len(), chunk.len());

    // Columns must not alias (SoA separation).
    assert_ne!(
        positions.as_ptr() as usize, velocities.as_ptr() as usize,
        "Position and Velocity columns should not start at the same address"
    );

    // Alignment of the column base pointers.
    assert_eq!((positions.as_ptr() as usize) % align_of::<Position>(), 0);
    assert_eq!((velocities.as_ptr() as usize) % align_of::<Velocity>(), 0);

    // Stride check: address(i+1) - address(i) == size_of::<T>().
    let base = positions.as_ptr() as usize;
    for i in 0..positions.len() {
        let address = unsafe { positions.as_ptr().add(i) } as usize;
        assert_eq!(
            address,
            base + i * size_of::<Position>(),
            "row {i} not at expected byte offset within chunk"
        );
    }
}

#[test]
fn chunk_capacity_follows_byte_budget() {
    init_registry();

    let mut world = World::new();
    world
        .create((Position { x: 0.0, y: 0.0 }, Velocity { dx: 0.0, dy: 0.0 }))
        .unwrap();

    let archetype = &world.archetypes()[0];
    let row_stride = size_of::<columnar_ecs::Entity>()
        + size_of::<Position>()
        + size_of::<Velocity>();
    assert_eq!(archetype.rows_per_chunk(), CHUNK_BYTE_BUDGET / row_stride);
}

#[test]
fn overflow_allocates_second_chunk_and_iterates_every_row() {
    init_registry();

    let mut world = World::new();

    // Probe the chunk capacity, then fill it plus one row.
    world
        .create((Position { x: 0.0, y: 0.0 }, Velocity { dx: 0.0, dy: 0.0 }))
        .unwrap();
    let capacity = world.archetypes()[0].rows_per_chunk();

    for i in 1..(capacity + 1) {
        world
            .create((
                Position { x: i as f32, y: 0.0 },
                Velocity { dx: 0.0, dy: 0.0 },
            ))
            .unwrap();
    }

    let archetype = &world.archetypes()[0];
    assert_eq!(archetype.len(), capacity + 1);
    assert_eq!(archetype.chunk_count(), 2);
    assert_eq!(archetype.chunk(0).len(), capacity);
    assert_eq!(archetype.chunk(1).len(), 1);

    // Every row is visited exactly once, first chunk before the overflow
    // chunk.
    let description = position_velocity_query();
    let view = world.query(&description).unwrap();

    let mut visited = 0usize;
    let mut last_chunk_base: Option<usize> = None;
    let mut chunk_changes = 0usize;
    for (_entity, _row, chunk) in view.entities() {
        let base = chunk as *const _ as usize;
        if last_chunk_base != Some(base) {
            chunk_changes += 1;
            last_chunk_base = Some(base);
        }
        visited += 1;
    }

    assert_eq!(visited, capacity + 1);
    assert_eq!(chunk_changes, 2, "rows must arrive chunk-major");
}

#[test]
fn column_pointers_are_stable_across_views() {
    init_registry();

    let mut world = World::new();
    for i in 0..256 {
        world
            .create((
                Position { x: i as f32, y: 0.0 },
                Velocity { dx: 0.0, dy: 0.0 },
            ))
            .unwrap();
    }

    let description = position_velocity_query();

    let first = {
        let view = world.query(&description).unwrap();
        let chunk = view.chunks().next().unwrap();
        chunk.slice::<Position>().unwrap().as_ptr() as usize
    };
    let second = {
        let view = world.query(&description).unwrap();
        let chunk = view.chunks().next().unwrap();
        chunk.slice::<Position>().unwrap().as_ptr() as usize
    };

    assert_eq!(first, second, "chunk pointer moved between views");
}

#[test]
fn oversized_rows_still_get_one_row_per_chunk() {
    init_registry();

    // Wide rows exceed the byte budget; capacity clamps to one row.
    let mut world = World::new();
    for i in 0..4u64 {
        world.create((Wide([i; 2048]),)).unwrap();
    }

    let archetype = &world.archetypes()[0];
    assert_eq!(archetype.rows_per_chunk(), 1);
    assert_eq!(archetype.chunk_count(), 4);
    assert_eq!(archetype.len(), 4);
}
