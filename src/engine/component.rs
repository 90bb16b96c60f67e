//! Component identity and the global type registry.
//!
//! This module assigns stable [`ComponentID`] values to Rust component
//! types and records the layout metadata (size, alignment, drop glue) that
//! the type-erased column storage needs to manage values it cannot name.
//!
//! ## Purpose
//! The registry decouples component type information (`TypeId`, name, size,
//! alignment) from runtime storage, enabling chunks to store heterogeneous
//! component columns behind raw byte buffers.
//!
//! ## Design
//! - Components are registered once and assigned a dense `ComponentID`
//!   starting at 0, in order of first registration.
//! - Every registered type yields a [`ComponentType`] descriptor that is
//!   `Copy` and cheap to pass around; the descriptor doubles as the storage
//!   vtable (element layout plus optional drop function).
//! - The registry can be `freeze()`d to prevent further registrations after
//!   world setup.
//!
//! ## Invariants
//! - `ComponentID` values are unique and stable for the lifetime of the
//!   process.
//! - When frozen, registration is disallowed; lookups always succeed for
//!   previously registered types.
//!
//! ## Concurrency
//! The registry is protected by `RwLock` for concurrent reads and
//! serialized writes. Id assignment is expected to complete during
//! single-threaded initialization.

use std::alloc::{self, Layout};
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::mem::{align_of, needs_drop, size_of};
use std::ptr::{self, NonNull};
use std::sync::{OnceLock, RwLock};

use crate::engine::error::{ECSResult, RegistryError, RegistryResult};
use crate::engine::types::ComponentID;


/// Registry-issued identity for a component class.
///
/// ## Purpose
/// `ComponentType` carries everything the storage layer needs to manage a
/// component without knowing its Rust type: a dense id for signature and
/// bitset membership, the element layout for column allocation and byte
/// copies, and the drop function invoked when a value is discarded rather
/// than moved.
///
/// ## Notes
/// Two descriptors are equal iff their ids are equal; all other fields are
/// derived from the same registration and cannot diverge.

#[derive(Clone, Copy, Debug)]
pub struct ComponentType {

    /// Dense runtime identifier assigned by the registry.
    pub id: ComponentID,

    /// Size of the component type in bytes.
    pub size: usize,

    /// Alignment of the component type in bytes.
    pub align: usize,

    /// `true` if the component occupies no storage.
    pub is_zero_sized: bool,

    /// Runtime `TypeId` of the component, used to check type-erased writes.
    pub type_id: TypeId,

    /// Rust type name for diagnostics.
    pub name: &'static str,

    /// Drop glue for a single element, absent for types without drop logic.
    pub drop_fn: Option<unsafe fn(*mut u8)>,
}

impl ComponentType {

    /// Constructs the descriptor for type `T` with an unassigned id.
    fn of<T: 'static>() -> Self {
        Self {
            id: 0,
            size: size_of::<T>(),
            align: align_of::<T>(),
            is_zero_sized: size_of::<T>() == 0,
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
            drop_fn: if needs_drop::<T>() {
                Some(drop_erased::<T>)
            } else {
                None
            },
        }
    }

    /// Returns `true` if this descriptor refers to type `T`.
    #[inline]
    pub fn matches_type<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Well-aligned dangling pointer for zero-sized elements.
    #[inline]
    pub(crate) fn dangling(&self) -> NonNull<u8> {
        debug_assert!(self.align.is_power_of_two());
        // A pointer equal to the alignment is dangling but well aligned.
        unsafe { NonNull::new_unchecked(self.align as *mut u8) }
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for ComponentType {}

impl std::hash::Hash for ComponentType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.id.hash(state); }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ComponentType {{ id: {}, name: {}, size: {}, align: {} }}",
            self.id, self.name, self.size, self.align
        )
    }
}

/// Drop glue instantiated per component type and stored in the descriptor.
unsafe fn drop_erased<T>(target: *mut u8) {
    unsafe { ptr::drop_in_place(target as *mut T) }
}

/// Global mapping between Rust component types and dense `ComponentID`
/// values.
///
/// ## Invariants
/// - Every entry in `by_type` has a matching `by_id[id]`.
/// - `next_id` equals `by_id.len()`.

pub struct ComponentRegistry {
    next_id: ComponentID,
    by_type: HashMap<TypeId, ComponentID>,
    by_id: Vec<ComponentType>,
    frozen: bool,
}

static REGISTRY: OnceLock<RwLock<ComponentRegistry>> = OnceLock::new();

fn component_registry() -> &'static RwLock<ComponentRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(ComponentRegistry {
            next_id: 0,
            by_type: HashMap::new(),
            by_id: Vec::new(),
            frozen: false,
        })
    })
}

impl ComponentRegistry {

    /// Registers component type `T` and returns its descriptor.
    ///
    /// ## Behavior
    /// - If `T` is already registered, returns the existing descriptor.
    /// - Otherwise assigns the next dense id and records the layout.
    ///
    /// ## Errors
    /// Returns `RegistryError::Frozen` for new registrations after
    /// [`ComponentRegistry::freeze`].

    pub fn register<T: Send + Sync + 'static>(&mut self) -> RegistryResult<ComponentType> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Ok(self.by_id[existing as usize]);
        }

        if self.frozen {
            return Err(RegistryError::Frozen);
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut descriptor = ComponentType::of::<T>();
        descriptor.id = id;

        self.by_type.insert(type_id, id);
        self.by_id.push(descriptor);

        Ok(descriptor)
    }

    /// Freezes the registry, preventing further component registrations.
    pub fn freeze(&mut self) { self.frozen = true; }

    /// Returns `true` if the registry has been frozen.
    pub fn is_frozen(&self) -> bool { self.frozen }

    /// Returns the descriptor for `T`, if registered.
    pub fn type_of<T: 'static>(&self) -> Option<ComponentType> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&id| self.by_id[id as usize])
    }

    /// Returns the descriptor for a `ComponentID`, if assigned.
    pub fn type_by_id(&self, component_id: ComponentID) -> Option<ComponentType> {
        self.by_id.get(component_id as usize).copied()
    }
}

/// Registers component type `T` in the global registry and returns its
/// descriptor.
///
/// ## Purpose
/// Convenience wrapper around the global [`ComponentRegistry`]. Repeated
/// registration of the same type returns the cached descriptor.

pub fn register_component<T: Send + Sync + 'static>() -> ECSResult<ComponentType> {
    let registry = component_registry();
    let mut registry = registry
        .write()
        .map_err(|_| RegistryError::PoisonedLock)?;
    Ok(registry.register::<T>()?)
}

/// Freezes the global component registry.
///
/// ## Purpose
/// Prevents any further component registration, making component ids stable
/// for archetype construction.

pub fn freeze_components() -> ECSResult<()> {
    let registry = component_registry();
    let mut registry = registry
        .write()
        .map_err(|_| RegistryError::PoisonedLock)?;
    registry.freeze();
    Ok(())
}

/// Returns the registered descriptor for type `T`.
///
/// ## Errors
/// Returns `RegistryError::NotRegistered` if `T` was never registered.

pub fn component_type_of<T: 'static>() -> ECSResult<ComponentType> {
    let registry = component_registry();
    let registry = registry
        .read()
        .map_err(|_| RegistryError::PoisonedLock)?;
    registry
        .type_of::<T>()
        .ok_or_else(|| RegistryError::NotRegistered { name: type_name::<T>() }.into())
}

/// Returns the descriptor for a raw `ComponentID`, if assigned.
pub fn component_type_by_id(component_id: ComponentID) -> ECSResult<Option<ComponentType>> {
    let registry = component_registry();
    let registry = registry
        .read()
        .map_err(|_| RegistryError::PoisonedLock)?;
    Ok(registry.type_by_id(component_id))
}

/// One staged component value inside a [`Bundle`].
///
/// The value's bytes live in a dedicated allocation with the component's
/// own layout so the drop glue can run on a well-aligned pointer if the
/// bundle is discarded before the value is consumed.
struct BundleItem {
    ty: ComponentType,
    data: NonNull<u8>,
    taken: bool,
}

impl BundleItem {
    #[inline]
    fn layout(&self) -> Layout {
        // Registered layouts are always valid.
        Layout::from_size_align(self.ty.size, self.ty.align).expect("component layout")
    }
}

/// Type-erased set of component values used to initialize an entity row.
///
/// ## Purpose
/// `Bundle` stages heterogeneous component values between the typed public
/// API and the untyped column storage. Values are moved in via
/// [`Bundle::insert`] and moved out bytewise when the world writes the
/// entity's row; anything left behind is dropped properly.
///
/// ## Notes
/// Inserting a component type twice replaces the earlier value.

pub struct Bundle {
    items: Vec<BundleItem>,
}

impl Bundle {

    /// Creates an empty bundle.
    #[inline]
    pub fn new() -> Self { Self { items: Vec::new() } }

    /// Moves a component value into the bundle.
    ///
    /// ## Errors
    /// Returns `RegistryError::NotRegistered` if `T` was never registered.

    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> ECSResult<()> {
        let ty = component_type_of::<T>()?;

        let data = if ty.is_zero_sized {
            // No bytes to stage; the bundle still owns one logical value.
            std::mem::forget(value);
            ty.dangling()
        } else {
            let layout = Layout::new::<T>();
            let raw = unsafe { alloc::alloc(layout) };
            let Some(raw) = NonNull::new(raw) else {
                alloc::handle_alloc_error(layout);
            };
            unsafe { ptr::write(raw.as_ptr() as *mut T, value) };
            raw
        };

        if let Some(existing) = self.items.iter_mut().find(|item| item.ty.id == ty.id) {
            if !existing.taken {
                unsafe { drop_item_value(existing) };
            }
            if !existing.ty.is_zero_sized {
                unsafe { alloc::dealloc(existing.data.as_ptr(), existing.layout()) };
            }
            existing.data = data;
            existing.taken = false;
        } else {
            self.items.push(BundleItem { ty, data, taken: false });
        }

        Ok(())
    }

    /// Returns the descriptors of all staged components.
    pub fn component_types(&self) -> Vec<ComponentType> {
        self.items.iter().map(|item| item.ty).collect()
    }

    /// Returns the number of staged components.
    #[inline]
    pub fn len(&self) -> usize { self.items.len() }

    /// Returns `true` if no components are staged.
    #[inline]
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Hands out the staged value for `component_id` as a raw pointer and
    /// marks it consumed.
    ///
    /// The caller must move exactly `ty.size` bytes out of the returned
    /// pointer before the bundle is dropped.
    pub(crate) fn take_ptr(&mut self, component_id: ComponentID) -> Option<(ComponentType, *const u8)> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.ty.id == component_id && !item.taken)?;
        item.taken = true;
        Some((item.ty, item.data.as_ptr() as *const u8))
    }
}

impl Default for Bundle {
    fn default() -> Self { Self::new() }
}

impl Drop for Bundle {
    fn drop(&mut self) {
        for item in &mut self.items {
            if !item.taken {
                unsafe { drop_item_value(item) };
            }
            if !item.ty.is_zero_sized {
                unsafe { alloc::dealloc(item.data.as_ptr(), item.layout()) };
            }
        }
    }
}

unsafe fn drop_item_value(item: &BundleItem) {
    if let Some(drop_fn) = item.ty.drop_fn {
        unsafe { drop_fn(item.data.as_ptr()) };
    }
}

/// Statically-typed set of components convertible into a [`Bundle`].
///
/// ## Purpose
/// This is the small typed seam over the dynamic bundle machinery: tuples
/// of up to eight registered component types implement it, so entity
/// creation reads as `world.create((Position { .. }, Velocity { .. }))`.

pub trait ComponentSet {
    /// Moves the set into a dynamic bundle.
    fn into_bundle(self) -> ECSResult<Bundle>;
}

impl ComponentSet for Bundle {
    fn into_bundle(self) -> ECSResult<Bundle> { Ok(self) }
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Send + Sync + 'static),+> ComponentSet for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_bundle(self) -> ECSResult<Bundle> {
                let ($($name,)+) = self;
                let mut bundle = Bundle::new();
                $(bundle.insert($name)?;)+
                Ok(bundle)
            }
        }
    };
}

impl_component_set!(T1);
impl_component_set!(T1, T2);
impl_component_set!(T1, T2, T3);
impl_component_set!(T1, T2, T3, T4);
impl_component_set!(T1, T2, T3, T4, T5);
impl_component_set!(T1, T2, T3, T4, T5, T6);
impl_component_set!(T1, T2, T3, T4, T5, T6, T7);
impl_component_set!(T1, T2, T3, T4, T5, T6, T7, T8);
