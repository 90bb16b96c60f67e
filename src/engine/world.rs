//! World orchestration: entity lifecycle and structural changes.
//!
//! The [`World`] is the single external entry point to the storage core.
//! It owns the entity slot table, every archetype, the signature-keyed
//! archetype index, and the query cache, and it coordinates the operations
//! that move entities between archetypes:
//!
//! * entity creation and destruction,
//! * component addition and removal (archetype migration),
//! * O(1) component access through the slot table,
//! * query resolution and cached-query maintenance.
//!
//! ## Concurrency model
//!
//! The world is **not** internally synchronized. A single logical owner
//! issues all mutating operations; read-only iteration from multiple
//! threads is safe only while no mutation is in flight. The borrow checker
//! enforces the iteration half of this contract: query views borrow the
//! world, so structural changes cannot overlap them.
//!
//! ## Structural changes
//!
//! Adding or removing a component migrates the entity's row:
//!
//! 1. The destination signature is derived from the source signature.
//! 2. The destination archetype is resolved, created on demand; creation
//!    walks the query cache so existing queries pick the archetype up.
//! 3. A destination row is appended and shared columns are moved bytewise;
//!    values with no destination column are dropped.
//! 4. The source row is removed via swap-with-last and every relocated
//!    entity's slot is rewritten.
//!
//! References obtained from `get` are invalidated by any structural change;
//! holding one across such an operation is rejected at compile time.

use std::alloc::{self, Layout};
use std::any::Any;
use std::collections::HashMap;
use std::ptr::NonNull;

use log::{debug, trace};

use crate::engine::archetype::Archetype;
use crate::engine::component::{component_type_of, ComponentSet, ComponentType};
use crate::engine::entity::{Entity, EntityLocation, EntityTable};
use crate::engine::error::{ECSResult, TypeMismatchError, UnknownComponentError};
use crate::engine::hooks::{LifecycleHooks, NoHooks};
use crate::engine::query::{Query, QueryDescription, QueryView, QueryViewMut};
use crate::engine::signature::Signature;
use crate::engine::types::{ArchetypeID, ChunkID, RowID};


/// Central store for entities, archetypes, and cached queries.
///
/// ## Ownership
/// The world exclusively owns its archetypes; archetypes own chunks;
/// chunks own column buffers. Queries reference archetypes by index only.
///
/// ## Invariants
/// - `signature_index` maps every archetype's signature to its index.
/// - Every live entity's slot names the archetype row that stores it.
/// - Cached queries list exactly the archetypes their predicate accepts.

pub struct World {
    entities: EntityTable,
    archetypes: Vec<Archetype>,
    signature_index: HashMap<Signature, ArchetypeID>,
    queries: HashMap<i64, Query>,
    hooks: Box<dyn LifecycleHooks>,
}

impl World {

    /// Creates an empty world.
    pub fn new() -> Self {
        Self {
            entities: EntityTable::new(),
            archetypes: Vec::new(),
            signature_index: HashMap::new(),
            queries: HashMap::new(),
            hooks: Box::new(NoHooks),
        }
    }

    /// Installs a lifecycle hook receiver, replacing the previous one.
    pub fn set_hooks(&mut self, hooks: Box<dyn LifecycleHooks>) {
        self.hooks = hooks;
    }

    /// Returns the number of live entities.
    #[inline]
    pub fn entity_count(&self) -> usize { self.entities.live_count() }

    /// Returns `true` if the handle refers to a live entity.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool { self.entities.is_alive(entity) }

    /// All archetypes, in creation order.
    #[inline]
    pub fn archetypes(&self) -> &[Archetype] { &self.archetypes }

    /// Number of archetypes ever created.
    #[inline]
    pub fn archetype_count(&self) -> usize { self.archetypes.len() }

    /// The archetype currently storing `entity`.
    pub fn archetype_of(&self, entity: Entity) -> ECSResult<&Archetype> {
        let location = self.entities.location(entity)?;
        Ok(&self.archetypes[location.archetype as usize])
    }

    /// Creates an entity from a set of component values.
    ///
    /// ## Behavior
    /// 1. Resolves (or creates) the archetype for the set's signature.
    /// 2. Mints an entity id from the free list, or appends a new slot.
    /// 3. Appends a row and moves every component value into its column.
    /// 4. Fires the creation and per-component hooks.
    ///
    /// ## Errors
    /// - `Registry` if a component type was never registered.
    /// - `CapacityExceeded` if the 32-bit id space is exhausted.

    pub fn create<S: ComponentSet>(&mut self, components: S) -> ECSResult<Entity> {
        let mut bundle = components.into_bundle()?;
        let signature = Signature::from_types(bundle.component_types());
        let archetype_id = self.archetype_for(&signature);

        let entity = self.entities.spawn(EntityLocation::default())?;

        let archetype = &mut self.archetypes[archetype_id as usize];
        let (chunk, row) = archetype.add(entity);

        let chunk_ref = archetype.chunk_mut(chunk);
        for ty in signature.types() {
            let (ty, value) = bundle
                .take_ptr(ty.id)
                .expect("bundle holds a value for every signature component");
            chunk_ref.write_value(row, ty.id, value);
        }

        self.entities.set_location(
            entity,
            EntityLocation { archetype: archetype_id, chunk, row },
        );

        self.hooks.entity_created(entity);
        for ty in signature.types() {
            self.hooks.component_set(entity, ty);
        }

        Ok(entity)
    }

    /// Creates `count` entities sharing the same initial component values.
    ///
    /// ## Notes
    /// Convenience over [`World::create`] for populating large worlds; the
    /// archetype and query cache work is identical.
    ///
    /// ## Errors
    /// As [`World::create`]; entities created before a failure remain.

    pub fn create_batch<S: ComponentSet + Clone>(
        &mut self,
        count: usize,
        components: S,
    ) -> ECSResult<Vec<Entity>> {
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            created.push(self.create(components.clone())?);
        }
        Ok(created)
    }

    /// Destroys an entity, dropping its component values.
    ///
    /// ## Behavior
    /// - The row is removed via swap-with-last; any relocated entity's slot
    ///   is rewritten to its new position.
    /// - The slot's version is bumped and the id returned to the free list,
    ///   so every outstanding handle to this entity is now stale.
    ///
    /// ## Errors
    /// - `StaleHandle` if the handle does not match its slot.

    pub fn destroy(&mut self, entity: Entity) -> ECSResult<()> {
        let location = self.entities.location(entity)?;

        self.hooks.entity_destroyed(entity);

        let archetype = &mut self.archetypes[location.archetype as usize];
        archetype.chunk_mut(location.chunk).drop_row_values(location.row);
        archetype.remove(location.chunk, location.row, &mut self.entities);

        self.entities.despawn(entity)?;
        Ok(())
    }

    /// Adds a component to an entity, or overwrites it if already present.
    ///
    /// ## Behavior
    /// - Present: the old value is dropped and replaced in place; no
    ///   structural change occurs.
    /// - Absent: the entity migrates to the archetype with the extended
    ///   signature; all other component values are preserved bytewise.
    ///
    /// ## Errors
    /// - `StaleHandle` if the handle does not match its slot.
    /// - `Registry` if `T` was never registered.

    pub fn add<T: Send + Sync + 'static>(&mut self, entity: Entity, value: T) -> ECSResult<()> {
        let ty = component_type_of::<T>()?;
        let location = self.entities.location(entity)?;
        let source_id = location.archetype;

        if self.archetypes[source_id as usize].has(ty.id) {
            let chunk = self.archetypes[source_id as usize].chunk_mut(location.chunk);
            chunk.replace_value(location.row, ty.id, &value as *const T as *const u8);
            std::mem::forget(value);
            self.hooks.component_set(entity, &ty);
            return Ok(());
        }

        let destination_signature = self.archetypes[source_id as usize].signature().with(ty);
        let destination_id = self.archetype_for(&destination_signature);
        trace!("entity {} migrating {} -> {}", entity, source_id, destination_id);

        let (source, destination) =
            archetype_pair_mut(&mut self.archetypes, source_id, destination_id);

        let (dst_chunk, dst_row) = source.move_to(
            destination,
            entity,
            location.chunk,
            location.row,
            &mut self.entities,
        );
        destination
            .chunk_mut(dst_chunk)
            .write_value(dst_row, ty.id, &value as *const T as *const u8);
        std::mem::forget(value);

        self.entities.set_location(
            entity,
            EntityLocation { archetype: destination_id, chunk: dst_chunk, row: dst_row },
        );

        self.hooks.component_set(entity, &ty);
        Ok(())
    }

    /// Removes a component from an entity, dropping its value.
    ///
    /// ## Behavior
    /// The entity migrates to the archetype with the reduced signature; all
    /// other component values are preserved bytewise. Removing the last
    /// component leaves the entity alive in the empty archetype.
    ///
    /// ## Errors
    /// - `StaleHandle` if the handle does not match its slot.
    /// - `UnknownComponent` if the entity does not carry `T`.
    /// - `Registry` if `T` was never registered.

    pub fn remove<T: Send + Sync + 'static>(&mut self, entity: Entity) -> ECSResult<()> {
        let ty = component_type_of::<T>()?;
        let location = self.entities.location(entity)?;
        let source_id = location.archetype;

        if !self.archetypes[source_id as usize].has(ty.id) {
            return Err(UnknownComponentError { name: ty.name }.into());
        }

        let destination_signature =
            self.archetypes[source_id as usize].signature().without(ty.id);
        let destination_id = self.archetype_for(&destination_signature);
        trace!("entity {} migrating {} -> {}", entity, source_id, destination_id);

        let (source, destination) =
            archetype_pair_mut(&mut self.archetypes, source_id, destination_id);

        // Shared columns move over; the removed component's value is
        // dropped because the destination has no column for it.
        let (dst_chunk, dst_row) = source.move_to(
            destination,
            entity,
            location.chunk,
            location.row,
            &mut self.entities,
        );

        self.entities.set_location(
            entity,
            EntityLocation { archetype: destination_id, chunk: dst_chunk, row: dst_row },
        );

        self.hooks.component_removed(entity, &ty);
        Ok(())
    }

    /// Shared reference to an entity's component value.
    ///
    /// The reference is valid until the next structural change; the borrow
    /// of the world enforces that scope.
    ///
    /// ## Errors
    /// - `StaleHandle` if the handle does not match its slot.
    /// - `UnknownComponent` if the entity does not carry `T`.

    pub fn get<T: Send + Sync + 'static>(&self, entity: Entity) -> ECSResult<&T> {
        let ty = component_type_of::<T>()?;
        let location = self.entities.location(entity)?;
        let chunk = self.archetypes[location.archetype as usize].chunk(location.chunk);
        chunk
            .get::<T>(location.row)
            .ok_or_else(|| UnknownComponentError { name: ty.name }.into())
    }

    /// Mutable reference to an entity's component value.
    ///
    /// ## Errors
    /// As [`World::get`].

    pub fn get_mut<T: Send + Sync + 'static>(&mut self, entity: Entity) -> ECSResult<&mut T> {
        let ty = component_type_of::<T>()?;
        let location = self.entities.location(entity)?;
        let chunk = self.archetypes[location.archetype as usize].chunk_mut(location.chunk);
        chunk
            .get_mut::<T>(location.row)
            .ok_or_else(|| UnknownComponentError { name: ty.name }.into())
    }

    /// Returns `true` if the entity carries component `T`.
    pub fn has<T: Send + Sync + 'static>(&self, entity: Entity) -> ECSResult<bool> {
        let ty = component_type_of::<T>()?;
        let location = self.entities.location(entity)?;
        Ok(self.archetypes[location.archetype as usize].has(ty.id))
    }

    /// Type-erased presence check for serialization layers.
    pub fn has_type(&self, entity: Entity, component: &ComponentType) -> ECSResult<bool> {
        let location = self.entities.location(entity)?;
        Ok(self.archetypes[location.archetype as usize].has(component.id))
    }

    /// Type-erased read access for serialization layers.
    ///
    /// Returns a pointer to the component's bytes, valid until the next
    /// structural change.
    ///
    /// ## Errors
    /// - `StaleHandle` if the handle does not match its slot.
    /// - `UnknownComponent` if the entity does not carry the component.

    pub fn get_erased(
        &mut self,
        entity: Entity,
        component: &ComponentType,
    ) -> ECSResult<NonNull<u8>> {
        let location = self.entities.location(entity)?;
        let chunk = self.archetypes[location.archetype as usize].chunk(location.chunk);
        let ptr = chunk
            .value_ptr(location.row, component.id)
            .ok_or(UnknownComponentError { name: component.name })?;
        // Column pointers are never null; zero-sized columns hand out a
        // well-aligned dangling pointer.
        Ok(unsafe { NonNull::new_unchecked(ptr) })
    }

    /// Type-erased in-place write for serialization layers.
    ///
    /// ## Behavior
    /// The value's dynamic type is checked against the descriptor, the old
    /// value is dropped, and the new bytes are moved into the column.
    ///
    /// ## Errors
    /// - `TypeMismatch` if the boxed value is not of the descriptor's type.
    /// - `StaleHandle` if the handle does not match its slot.
    /// - `UnknownComponent` if the entity does not carry the component.

    pub fn set_erased(
        &mut self,
        entity: Entity,
        component: &ComponentType,
        value: Box<dyn Any>,
    ) -> ECSResult<()> {
        let actual = value.as_ref().type_id();
        if actual != component.type_id {
            return Err(TypeMismatchError { expected: component.type_id, actual }.into());
        }

        let location = self.entities.location(entity)?;
        let chunk = self.archetypes[location.archetype as usize].chunk_mut(location.chunk);
        if !chunk.has(component.id) {
            return Err(UnknownComponentError { name: component.name }.into());
        }

        let raw = Box::into_raw(value) as *mut u8;
        chunk.replace_value(location.row, component.id, raw);
        if component.size > 0 {
            // The value moved into the column; free the box shell only.
            let layout = Layout::from_size_align(component.size, component.align)
                .expect("component layout");
            unsafe { alloc::dealloc(raw, layout) };
        }

        self.hooks.component_set(entity, component);
        Ok(())
    }

    /// Resolves a query description to a shared view over its matches.
    ///
    /// ## Behavior
    /// On first use the description is compiled and every existing
    /// archetype is scanned; afterwards the cached query is reused and kept
    /// current by archetype creation.
    ///
    /// ## Errors
    /// - `MalformedQuery` if `exclusive` is combined with `all`/`any`/
    ///   `none`.

    pub fn query(&mut self, description: &QueryDescription) -> ECSResult<QueryView<'_>> {
        let hash = self.ensure_query(description)?;
        let query = self.queries.get(&hash).expect("query cached above");
        Ok(QueryView { archetypes: &self.archetypes, query })
    }

    /// Resolves a query description to a mutable view for in-place writes.
    ///
    /// ## Errors
    /// As [`World::query`].

    pub fn query_mut(&mut self, description: &QueryDescription) -> ECSResult<QueryViewMut<'_>> {
        let hash = self.ensure_query(description)?;
        let query = self.queries.get(&hash).expect("query cached above");
        Ok(QueryViewMut { archetypes: &mut self.archetypes, matches: query.matches() })
    }

    /// Looks up the archetype for a signature, creating it on demand.
    ///
    /// ## Behavior
    /// Creation walks the query cache so every cached query that matches
    /// the new archetype picks it up immediately.

    fn archetype_for(&mut self, signature: &Signature) -> ArchetypeID {
        if let Some(&id) = self.signature_index.get(signature) {
            return id;
        }

        let id = self.archetypes.len() as ArchetypeID;
        let archetype = Archetype::new(id, signature.clone());
        trace!("created archetype {} ({} components)", id, signature.len());

        for query in self.queries.values_mut() {
            query.consider(&archetype);
        }

        self.signature_index.insert(signature.clone(), id);
        self.archetypes.push(archetype);
        id
    }

    /// Compiles and caches the query for `description` if absent.
    fn ensure_query(&mut self, description: &QueryDescription) -> ECSResult<i64> {
        let hash = description.hash_value();
        if !self.queries.contains_key(&hash) {
            let mut query = Query::compile(description)?;
            query.scan(&self.archetypes);
            debug!(
                "compiled query {:#x} matching {} archetypes",
                hash,
                query.match_count()
            );
            self.queries.insert(hash, query);
        }
        Ok(hash)
    }

    /// The `(chunk, row)` position of a live entity, for diagnostics.
    pub fn position_of(&self, entity: Entity) -> ECSResult<(ArchetypeID, ChunkID, RowID)> {
        let location = self.entities.location(entity)?;
        Ok((location.archetype, location.chunk, location.row))
    }
}

impl Default for World {
    fn default() -> Self { Self::new() }
}

/// Disjoint mutable access to two distinct archetypes.
fn archetype_pair_mut(
    archetypes: &mut [Archetype],
    first: ArchetypeID,
    second: ArchetypeID,
) -> (&mut Archetype, &mut Archetype) {
    assert!(first != second, "source and destination archetype must differ");
    let (low, high) = if first < second { (first, second) } else { (second, first) };

    let (head, tail) = archetypes.split_at_mut(high as usize);
    let low_reference = &mut head[low as usize];
    let high_reference = &mut tail[0];
    if first < second {
        (low_reference, high_reference)
    } else {
        (high_reference, low_reference)
    }
}
