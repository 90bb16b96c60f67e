//! Core identifiers and layout constants.
//!
//! This module defines the **fundamental numeric types and capacity
//! constants** shared across all subsystems of the storage core: entity
//! handles, component identity, archetype addressing, and chunk layout.
//!
//! ## Design Philosophy
//!
//! The engine is designed around:
//!
//! - **Dense storage**: components live in contiguous per-type columns,
//! - **Stable numeric identifiers**: every concept is addressed by a small
//!   copyable integer,
//! - **Chunked allocation**: chunks are the unit of allocation and
//!   iteration, sized by a fixed byte budget.
//!
//! ## Entity Representation
//!
//! An entity handle is a pair `{ id, version }`. The id indexes the world's
//! entity table; the version disambiguates reused ids, so stale handles are
//! detected instead of silently resolving to a different entity.
//!
//! ## Addressing
//!
//! An entity's component data lives at a single `(archetype, chunk, row)`
//! position at any point in time. Structural changes rewrite that position;
//! nothing else does.

/// Index into the world's entity slot table.
pub type EntityIndex = u32;
/// Generation counter used to detect stale entity handles.
pub type VersionID = u32;

/// Dense identifier assigned to a registered component type.
pub type ComponentID = u32;

/// Index of an archetype within the world's archetype list.
pub type ArchetypeID = u32;
/// Chunk index within an archetype.
pub type ChunkID = u32;
/// Row index within a chunk.
pub type RowID = u32;

/// Byte budget for a single chunk.
///
/// ## Notes
/// The row capacity of a chunk is `CHUNK_BYTE_BUDGET / row_stride` (minimum
/// one row), where the stride counts the entity back-reference plus the size
/// of every component in the archetype's signature.
pub const CHUNK_BYTE_BUDGET: usize = 16_384;

/// Column-index sentinel meaning "component not present in this chunk".
pub const NO_COLUMN: i32 = -1;

/// Hash sentinel meaning "composite query hash not yet computed".
pub const UNCOMPUTED_HASH: i64 = -1;

/// Mask confining signature hashes to 63 bits.
///
/// ## Invariants
/// Masked hashes are always non-negative, so a valid hash can never collide
/// with [`UNCOMPUTED_HASH`].
pub const HASH_MASK: i64 = i64::MAX;
