//! Entity identity, liveness, and location tracking.
//!
//! This module defines the entity handle and the world's slot table.
//!
//! ## Purpose
//! Entities are lightweight, opaque identifiers that reference rows in
//! archetype storage. This module is responsible for:
//!
//! - Minting stable entity identifiers from a free list
//! - Tracking entity liveness via versioning
//! - Mapping entities to `(archetype, chunk, row)` positions
//!
//! ## Entity Model
//! An [`Entity`] is a versioned handle `{ id, version }`:
//!
//! - The **id** indexes the slot table directly.
//! - The **version** is incremented when the entity is destroyed, so all
//!   previously issued handles for that id become detectably stale.
//!
//! This layout allows O(1) validation and prevents use-after-free style
//! logic errors when ids are recycled.
//!
//! ## Invariants
//! - An entity is alive if and only if its version matches the version
//!   stored in its slot and the slot is marked alive.
//! - Slot locations always reflect the actual archetype row; structural
//!   changes rewrite them atomically with the row move.
//! - Free indices always refer to dead entity slots.

use crate::engine::error::{CapacityExceededError, StaleHandleError};
use crate::engine::types::{ArchetypeID, ChunkID, EntityIndex, RowID, VersionID};


/// Opaque, versioned identifier for an entity.
///
/// ## Invariants
/// - Two handles with the same `id` but different versions are distinct
///   and at most one of them is alive.
///
/// ## Notes
/// `Entity` values are cheap to copy and compare and are safe to pass
/// across threads.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Entity {

    /// Index into the world's entity slot table.
    pub id: EntityIndex,

    /// Generation the handle was minted with.
    pub version: VersionID,
}

impl Entity {
    /// Creates a handle from raw parts.
    #[inline]
    pub const fn new(id: EntityIndex, version: VersionID) -> Self {
        Self { id, version }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.id, self.version)
    }
}

/// Physical storage location of an entity within archetype storage.
///
/// ## Invariants
/// - Must always reflect the true location of the entity's component row.
/// - Updated atomically with archetype row moves.
/// - Invalidated immediately on destroy.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityLocation {

    /// Archetype containing the entity.
    pub archetype: ArchetypeID,

    /// Chunk index within the archetype.
    pub chunk: ChunkID,

    /// Row index within the chunk.
    pub row: RowID,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    location: EntityLocation,
    version: VersionID,
    alive: bool,
}

/// Dense entity slot table with id recycling.
///
/// ## Design
/// - Ids are minted from a free list of dead slots, or by appending.
/// - Versions are incremented on destroy to invalidate stale handles.
/// - Storage is dense and index-addressable.
///
/// ## Concurrency
/// This type is **not thread-safe**; the owning world serializes access.

#[derive(Default)]
pub struct EntityTable {
    slots: Vec<Slot>,
    free_store: Vec<EntityIndex>,
    live: usize,
}

impl EntityTable {

    /// Creates an empty table.
    pub fn new() -> Self { Self::default() }

    /// Returns the number of live entities.
    #[inline]
    pub fn live_count(&self) -> usize { self.live }

    /// Allocates a slot and returns the new entity handle.
    ///
    /// ## Behavior
    /// - Reuses a free slot if available, otherwise appends a new one.
    /// - Marks the slot alive and records the provided location.
    /// - The handle's version is the slot's current version; destroyed ids
    ///   come back with a bumped version.
    ///
    /// ## Errors
    /// Returns `CapacityExceededError` once the 32-bit id space is
    /// exhausted.

    pub fn spawn(&mut self, location: EntityLocation) -> Result<Entity, CapacityExceededError> {
        let index = match self.free_store.pop() {
            Some(index) => index,
            None => {
                if self.slots.len() > EntityIndex::MAX as usize {
                    return Err(CapacityExceededError {
                        entities_needed: self.slots.len() as u64 + 1,
                        capacity: EntityIndex::MAX as u64 + 1,
                    });
                }
                let index = self.slots.len() as EntityIndex;
                self.slots.push(Slot {
                    location: EntityLocation::default(),
                    version: 0,
                    alive: false,
                });
                index
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.alive = true;
        slot.location = location;
        self.live += 1;

        Ok(Entity::new(index, slot.version))
    }

    /// Destroys an entity and invalidates its handle.
    ///
    /// ## Behavior
    /// - Marks the slot dead and increments its version.
    /// - Returns the id to the free list.
    ///
    /// ## Errors
    /// Returns `StaleHandleError` if the handle does not match the slot.

    pub fn despawn(&mut self, entity: Entity) -> Result<(), StaleHandleError> {
        self.validate(entity)?;

        let slot = &mut self.slots[entity.id as usize];
        slot.alive = false;
        slot.version = slot.version.wrapping_add(1);
        slot.location = EntityLocation::default();
        self.free_store.push(entity.id);
        self.live -= 1;

        Ok(())
    }

    /// Returns `true` if the entity is alive and not stale.
    pub fn is_alive(&self, entity: Entity) -> bool {
        match self.slots.get(entity.id as usize) {
            Some(slot) => slot.alive && slot.version == entity.version,
            None => false,
        }
    }

    /// Checks a handle against its slot.
    ///
    /// ## Errors
    /// Returns `StaleHandleError` carrying the expected and actual versions
    /// if the entity is dead, stale, or out of range.

    pub fn validate(&self, entity: Entity) -> Result<(), StaleHandleError> {
        match self.slots.get(entity.id as usize) {
            Some(slot) if slot.alive && slot.version == entity.version => Ok(()),
            Some(slot) => Err(StaleHandleError {
                index: entity.id,
                expected: entity.version,
                actual: slot.version,
            }),
            None => Err(StaleHandleError {
                index: entity.id,
                expected: entity.version,
                actual: 0,
            }),
        }
    }

    /// Returns the archetype location of a live entity.
    pub fn location(&self, entity: Entity) -> Result<EntityLocation, StaleHandleError> {
        self.validate(entity)?;
        Ok(self.slots[entity.id as usize].location)
    }

    /// Updates the stored location for an entity.
    ///
    /// ## Notes
    /// Called by archetype row moves; the caller must ensure the entity is
    /// alive and the location reflects actual storage.

    pub fn set_location(&mut self, entity: Entity, location: EntityLocation) {
        debug_assert!(
            self.is_alive(entity),
            "set_location on a dead or stale entity: {:?} -> {:?}",
            entity,
            location
        );
        if let Some(slot) = self.slots.get_mut(entity.id as usize) {
            slot.location = location;
        }
    }
}
