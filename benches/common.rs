#![allow(dead_code)]

use std::sync::Once;

use columnar_ecs::{component_type_of, register_component, QueryDescription, Signature, World};

#[derive(Clone, Copy, Debug)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct Wealth {
    pub value: f32,
}

pub const AGENTS_SMALL: usize = 10_000;
pub const AGENTS_MED: usize = 100_000;

static INIT: Once = Once::new();

pub fn init_components() {
    INIT.call_once(|| {
        register_component::<Position>().unwrap();
        register_component::<Velocity>().unwrap();
        register_component::<Wealth>().unwrap();
    });
}

pub fn populate(world: &mut World, count: usize) {
    for i in 0..count {
        world
            .create((
                Position { x: i as f32, y: 0.0 },
                Velocity { dx: 1.0, dy: 0.5 },
                Wealth { value: 100.0 },
            ))
            .unwrap();
    }
}

pub fn position_velocity_query() -> QueryDescription {
    let position = component_type_of::<Position>().unwrap();
    let velocity = component_type_of::<Velocity>().unwrap();
    QueryDescription::new().with_all(Signature::from_types([position, velocity]))
}

pub fn wealth_query() -> QueryDescription {
    let wealth = component_type_of::<Wealth>().unwrap();
    QueryDescription::new().with_all(Signature::from_types([wealth]))
}
