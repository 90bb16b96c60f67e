use std::sync::Once;

use columnar_ecs::{
    component_type_of, register_component, BitSet, ECSError, QueryDescription, Signature,
    World,
};

#[derive(Clone, Copy, Debug, PartialEq)]
struct A(u32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct B(u32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct C(u32);

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

static INIT: Once = Once::new();

fn init_registry() {
    INIT.call_once(|| {
        register_component::<A>().unwrap();
        register_component::<B>().unwrap();
        register_component::<C>().unwrap();
        register_component::<Position>().unwrap();
        register_component::<Velocity>().unwrap();
    });
}

fn signature_of(names: &[&str]) -> Signature {
    let mut types = Vec::new();
    for name in names {
        let ty = match *name {
            "a" => component_type_of::<A>().unwrap(),
            "b" => component_type_of::<B>().unwrap(),
            "c" => component_type_of::<C>().unwrap(),
            other => panic!("unknown component {other}"),
        };
        types.push(ty);
    }
    Signature::from_types(types)
}

#[test]
fn signature_hash_is_permutation_stable() {
    init_registry();

    let a = component_type_of::<A>().unwrap();
    let b = component_type_of::<B>().unwrap();
    let c = component_type_of::<C>().unwrap();

    let forward = Signature::from_types([a, b, c]);
    let backward = Signature::from_types([c, b, a]);
    let duplicated = Signature::from_types([b, a, c, a, b]);

    assert_eq!(forward.hash_value(), backward.hash_value());
    assert_eq!(forward, backward);
    assert_eq!(forward, duplicated);
    assert!(forward.hash_value() >= 0, "hashes leave the sentinel range free");

    let different = Signature::from_types([a, b]);
    assert_ne!(forward, different);
}

#[test]
fn bitset_laws_hold() {
    init_registry();

    let empty = BitSet::new();
    let set = BitSet::from_ids([1, 5, 64, 130]);
    let other = BitSet::from_ids([5]);
    let disjoint = BitSet::from_ids([2, 66]);

    // Vacuous truths for the empty mask.
    assert!(set.all(&empty));
    assert!(set.any(&empty));
    assert!(set.none(&empty));
    assert!(empty.all(&empty));
    assert!(empty.any(&empty));

    assert!(set.all(&other));
    assert!(!other.all(&set));
    assert!(set.any(&other));
    assert!(!set.none(&other));
    assert!(set.none(&disjoint));

    // Exclusive is exact equality, independent of backing length.
    assert!(set.exclusive(&BitSet::from_ids([130, 64, 5, 1])));
    assert!(!set.exclusive(&other));
    let mut trimmed = BitSet::from_ids([1, 5, 64, 130, 300]);
    trimmed.clear(300);
    assert!(set.exclusive(&trimmed));
    assert_eq!(set, trimmed);
}

fn populate_three_populations(world: &mut World) {
    for i in 0..100u32 {
        world.create((A(i),)).unwrap();
        world.create((A(i), B(i))).unwrap();
        world.create((B(i),)).unwrap();
    }
}

#[test]
fn predicate_counts_over_mixed_populations() {
    init_registry();

    let mut world = World::new();
    populate_three_populations(&mut world);

    // all = {A}, none = {B} -> entities with A but not B.
    let description = QueryDescription::new()
        .with_all(signature_of(&["a"]))
        .with_none(signature_of(&["b"]));
    assert_eq!(world.query(&description).unwrap().entity_count(), 100);

    // any = {A, B} -> all three populations.
    let description = QueryDescription::new().with_any(signature_of(&["a", "b"]));
    assert_eq!(world.query(&description).unwrap().entity_count(), 300);

    // exclusive = {A} -> only the A-only archetype.
    let description = QueryDescription::new().with_exclusive(signature_of(&["a"]));
    assert_eq!(world.query(&description).unwrap().entity_count(), 100);

    // exclusive = {A, B} -> only the exact pair archetype.
    let description = QueryDescription::new().with_exclusive(signature_of(&["a", "b"]));
    let view = world.query(&description).unwrap();
    assert_eq!(view.entity_count(), 100);
    for archetype in view.archetypes() {
        assert_eq!(archetype.signature().len(), 2);
    }

    // An all-empty description matches every archetype.
    let description = QueryDescription::new();
    assert_eq!(world.query(&description).unwrap().entity_count(), 300);
}

#[test]
fn query_completeness_matches_predicate_exactly() {
    init_registry();

    let mut world = World::new();
    populate_three_populations(&mut world);

    let snapshots: Vec<_> = world
        .archetypes()
        .iter()
        .map(|archetype| (archetype.id(), archetype.bitset().clone()))
        .collect();

    let description = QueryDescription::new()
        .with_all(signature_of(&["a"]))
        .with_none(signature_of(&["b"]));
    let view = world.query(&description).unwrap();
    let query = view.query();

    // Every archetype is either matched or rejected, in agreement with the
    // predicate over its bitset.
    for (id, bitset) in &snapshots {
        let matched = query.matches().contains(id);
        assert_eq!(matched, query.valid(bitset));
    }
}

#[test]
fn malformed_descriptions_are_rejected() {
    init_registry();

    let description = QueryDescription::new()
        .with_all(signature_of(&["a"]))
        .with_exclusive(signature_of(&["b"]));

    let mut world = World::new();
    assert!(matches!(
        world.query(&description),
        Err(ECSError::MalformedQuery(_))
    ));
}

#[test]
fn cached_queries_pick_up_archetypes_created_later() {
    init_registry();

    let mut world = World::new();
    let first = world.create((A(1),)).unwrap();

    let description = QueryDescription::new().with_all(signature_of(&["a"]));
    assert_eq!(world.query(&description).unwrap().entity_count(), 1);

    // Adding C creates a brand new {A, C} archetype after the query was
    // cached; the cached query must still see the migrated entity.
    world.add(first, C(9)).unwrap();
    let _second = world.create((A(2),)).unwrap();

    let view = world.query(&description).unwrap();
    assert_eq!(view.entity_count(), 2);

    let visited: Vec<u32> = view
        .entities()
        .map(|(entity, _row, _chunk)| entity.id)
        .collect();
    assert!(visited.contains(&first.id));
}

#[test]
fn description_hash_is_cached_until_rebuild() {
    init_registry();

    let mut description = QueryDescription::new().with_all(signature_of(&["a"]));
    let original = description.hash_value();
    assert_eq!(description.hash_value(), original, "hash is cached");

    description.all = signature_of(&["a", "b"]);
    assert_eq!(
        description.hash_value(),
        original,
        "mutation without rebuild keeps the stale hash"
    );

    description.rebuild();
    assert_ne!(description.hash_value(), original);
}

#[test]
fn role_swapped_descriptions_hash_differently() {
    init_registry();

    let all_a = QueryDescription::new().with_all(signature_of(&["a"]));
    let none_a = QueryDescription::new().with_none(signature_of(&["a"]));
    let any_a = QueryDescription::new().with_any(signature_of(&["a"]));

    assert_ne!(all_a.hash_value(), none_a.hash_value());
    assert_ne!(all_a.hash_value(), any_a.hash_value());
    assert_ne!(any_a.hash_value(), none_a.hash_value());
}

#[test]
fn chunk_iteration_applies_velocity_to_every_position_once() {
    init_registry();

    let mut world = World::new();
    let spawned: Vec<_> = (0..3)
        .map(|i| {
            world
                .create((
                    Position { x: i as f32, y: 0.0 },
                    Velocity { dx: 1.0, dy: 2.0 },
                ))
                .unwrap()
        })
        .collect();

    let position = component_type_of::<Position>().unwrap();
    let velocity = component_type_of::<Velocity>().unwrap();
    let description =
        QueryDescription::new().with_all(Signature::from_types([position, velocity]));

    let view = world.query_mut(&description).unwrap();
    for chunk in view.chunks_mut() {
        let (positions, velocities) = chunk.pair_mut::<Position, Velocity>().unwrap();
        for (position, velocity) in positions.iter_mut().zip(velocities.iter()) {
            position.x += velocity.dx;
            position.y += velocity.dy;
        }
    }

    for (i, entity) in spawned.iter().enumerate() {
        assert_eq!(
            *world.get::<Position>(*entity).unwrap(),
            Position { x: i as f32 + 1.0, y: 2.0 }
        );
    }
}
