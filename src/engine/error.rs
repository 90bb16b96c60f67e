//! Error types for the storage and query core.
//!
//! This module declares focused, composable error types used across entity
//! lifecycle, component storage, and query compilation. Each error carries
//! enough context to make failures actionable while remaining small and
//! cheap to pass around or convert into the aggregate [`ECSError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode (stale
//!   entity handles, unregistered or absent components, malformed query
//!   descriptions, id-space exhaustion).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into [`ECSError`].
//! * **Actionability:** Structured fields (offending versions, component
//!   names, requested vs. available capacity) make logs useful without
//!   reproducing the issue.
//!
//! ## Typical flow
//! Low-level registry and storage operations return small, dedicated error
//! types. Higher-level orchestration code in the world uses `?` to bubble
//! failures into [`ECSError`], which callers can match on for control flow
//! or log with user-readable messages.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::any::TypeId;
use std::fmt;

use crate::engine::types::{EntityIndex, VersionID};


/// Returned when an entity handle no longer matches the version stored in
/// its world slot, typically because the entity was destroyed and the id
/// has been (or is eligible to be) reused.
///
/// ### Fields
/// * `index` — Slot index encoded in the offending handle.
/// * `expected` — Version carried by the handle.
/// * `actual` — Version currently stored in the slot.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleHandleError {

    /// Slot index encoded in the handle.
    pub index: EntityIndex,

    /// Version the handle was minted with.
    pub expected: VersionID,

    /// Version currently stored in the slot.
    pub actual: VersionID,
}

impl fmt::Display for StaleHandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stale entity handle: slot {} is at version {}, handle carries version {}",
            self.index, self.actual, self.expected
        )
    }
}

impl std::error::Error for StaleHandleError {}

/// Returned when an operation references a component type that is not
/// registered, or that is not present on the target entity.
///
/// ### Fields
/// * `name` — Rust type name of the offending component, for diagnostics.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownComponentError {

    /// Human-readable component type name.
    pub name: &'static str,
}

impl fmt::Display for UnknownComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown component: {}", self.name)
    }
}

impl std::error::Error for UnknownComponentError {}

/// Returned when a query description combines an `exclusive` signature with
/// any of `all`, `any`, or `none`.
///
/// ## Context
/// An exclusive query matches archetypes whose signature is *exactly* the
/// given component set; layering additional predicates on top of that is a
/// programming error, surfaced at query compile time.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedQueryError;

impl fmt::Display for MalformedQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("malformed query: exclusive cannot be combined with all/any/none")
    }
}

impl std::error::Error for MalformedQueryError {}

/// Returned when the world cannot mint another entity id because the 32-bit
/// id space is exhausted.
///
/// ### Fields
/// * `entities_needed` — Total number of slots the operation required.
/// * `capacity` — The id-space bound that prevented the operation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceededError {

    /// Total slots the operation attempted to allocate.
    pub entities_needed: u64,

    /// Id-space capacity limiting the operation.
    pub capacity: u64,
}

impl fmt::Display for CapacityExceededError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entity id space exhausted ({} needed; capacity {})",
            self.entities_needed, self.capacity
        )
    }
}

impl std::error::Error for CapacityExceededError {}

/// Returned when a type-erased write targets a column whose element type
/// does not match the provided value's type.
///
/// This is a logic error surfaced by the reflection surface when dynamic
/// type ids diverge (e.g. writing `Velocity` into a `Position` column).
///
/// ### Fields
/// * `expected` — The [`TypeId`] the destination column declares.
/// * `actual` — The [`TypeId`] of the value provided by the caller.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatchError {

    /// Destination column's declared element type.
    pub expected: TypeId,

    /// Provided value's dynamic type.
    pub actual: TypeId,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type mismatch: expected {:?}, actual {:?}", self.expected, self.actual)
    }
}

impl std::error::Error for TypeMismatchError {}

/// Errors produced by the global component type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {

    /// Registration was attempted after the registry was frozen.
    Frozen,

    /// The registry lock was poisoned by a panicking writer.
    PoisonedLock,

    /// A component type was used before being registered.
    NotRegistered {
        /// Human-readable component type name.
        name: &'static str,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Frozen => f.write_str("component registry is frozen"),
            RegistryError::PoisonedLock => f.write_str("component registry lock poisoned"),
            RegistryError::NotRegistered { name } => {
                write!(f, "component type not registered: {}", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Aggregate error for all world-facing operations.
///
/// `From<T>` conversions are implemented for every low-level error so
/// orchestration code can write `?` and still return a single type.
///
/// ### Display
/// Human-readable, single-line messages suitable for logs.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ECSError {

    /// An entity handle was stale or referred to a destroyed entity.
    StaleHandle(StaleHandleError),

    /// A component type was unregistered or absent on the target entity.
    UnknownComponent(UnknownComponentError),

    /// A query description violated the exclusive-predicate invariant.
    MalformedQuery(MalformedQueryError),

    /// The 32-bit entity id space is exhausted.
    CapacityExceeded(CapacityExceededError),

    /// A type-erased write carried a value of the wrong dynamic type.
    TypeMismatch(TypeMismatchError),

    /// The component type registry rejected an operation.
    Registry(RegistryError),
}

impl fmt::Display for ECSError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ECSError::StaleHandle(e) => write!(f, "{e}"),
            ECSError::UnknownComponent(e) => write!(f, "{e}"),
            ECSError::MalformedQuery(e) => write!(f, "{e}"),
            ECSError::CapacityExceeded(e) => write!(f, "{e}"),
            ECSError::TypeMismatch(e) => write!(f, "{e}"),
            ECSError::Registry(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ECSError {}

impl From<StaleHandleError> for ECSError {
    fn from(e: StaleHandleError) -> Self { ECSError::StaleHandle(e) }
}
impl From<UnknownComponentError> for ECSError {
    fn from(e: UnknownComponentError) -> Self { ECSError::UnknownComponent(e) }
}
impl From<MalformedQueryError> for ECSError {
    fn from(e: MalformedQueryError) -> Self { ECSError::MalformedQuery(e) }
}
impl From<CapacityExceededError> for ECSError {
    fn from(e: CapacityExceededError) -> Self { ECSError::CapacityExceeded(e) }
}
impl From<TypeMismatchError> for ECSError {
    fn from(e: TypeMismatchError) -> Self { ECSError::TypeMismatch(e) }
}
impl From<RegistryError> for ECSError {
    fn from(e: RegistryError) -> Self { ECSError::Registry(e) }
}

/// Result alias for world-facing operations.
pub type ECSResult<T> = Result<T, ECSError>;
