//! Lifecycle hook points.
//!
//! The core invokes these hooks at every entity lifecycle transition but
//! defines no handlers of its own; surrounding layers (event dispatch,
//! change tracking, serialization) install an implementation via
//! [`crate::engine::world::World::set_hooks`].

use crate::engine::component::ComponentType;
use crate::engine::entity::Entity;


/// Receiver for entity lifecycle notifications.
///
/// All methods default to no-ops, so implementors override only the
/// transitions they care about.
pub trait LifecycleHooks {

    /// Called after an entity has been created and its row initialized.
    fn entity_created(&mut self, _entity: Entity) {}

    /// Called after a component value has been written for an entity.
    fn component_set(&mut self, _entity: Entity, _component: &ComponentType) {}

    /// Called after a component has been removed from an entity.
    fn component_removed(&mut self, _entity: Entity, _component: &ComponentType) {}

    /// Called before an entity's row is torn down.
    fn entity_destroyed(&mut self, _entity: Entity) {}
}

/// Default hook receiver that ignores every notification.
pub struct NoHooks;

impl LifecycleHooks for NoHooks {}
