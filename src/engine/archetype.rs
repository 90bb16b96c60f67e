//! Archetype storage: all entities sharing one component signature.
//!
//! An [`Archetype`] owns a growable list of [`Chunk`]s with identical
//! column layout. Entities are densely packed: every chunk before the tail
//! is full, only the tail chunk is partially filled, and trailing chunks
//! emptied by removals are retained for reuse rather than freed.
//!
//! ## Row movement
//!
//! Two operations relocate rows, and both report the affected entity so the
//! world can rewrite its slot:
//!
//! - Removal swaps the chunk's last row into the vacated row.
//! - If the vacated chunk was a full (non-tail) chunk, the tail chunk's
//!   last row is transferred over to keep earlier chunks full.
//!
//! ## Sizing
//!
//! Chunk row capacity is derived from [`CHUNK_BYTE_BUDGET`]: the budget
//! divided by the row stride (entity back-reference plus all component
//! sizes), with a minimum of one row so oversized rows still fit.

use log::trace;

use crate::engine::bitset::BitSet;
use crate::engine::chunk::Chunk;
use crate::engine::entity::{Entity, EntityLocation, EntityTable};
use crate::engine::signature::Signature;
use crate::engine::types::{ArchetypeID, ChunkID, ComponentID, RowID, CHUNK_BYTE_BUDGET};


/// Stores entities that share an identical component signature.
///
/// ## Invariants
/// - All chunks share one column layout derived from `signature`.
/// - `length` equals the sum of all chunk sizes.
/// - Chunks before the tail are full; chunks after it are empty.
/// - `bitset` exactly reflects the signature's component ids.

pub struct Archetype {
    id: ArchetypeID,
    signature: Signature,
    bitset: BitSet,
    chunks: Vec<Chunk>,
    rows_per_chunk: usize,
    length: usize,
}

impl Archetype {

    /// Creates a new empty archetype with the given identifier.
    ///
    /// ## Behavior
    /// - Computes the chunk row capacity from the byte budget.
    /// - Materializes the signature's predicate bitset.
    /// - No chunks are allocated until the first entity arrives.

    pub fn new(id: ArchetypeID, signature: Signature) -> Self {
        let row_stride = std::mem::size_of::<Entity>()
            + signature.types().iter().map(|ty| ty.size).sum::<usize>();
        let rows_per_chunk = (CHUNK_BYTE_BUDGET / row_stride).max(1);

        let bitset = signature.bitset();

        Self {
            id,
            signature,
            bitset,
            chunks: Vec::new(),
            rows_per_chunk,
            length: 0,
        }
    }

    /// Returns the archetype's stable identifier.
    #[inline]
    pub fn id(&self) -> ArchetypeID { self.id }

    /// Returns the archetype's signature.
    #[inline]
    pub fn signature(&self) -> &Signature { &self.signature }

    /// Returns the signature as a predicate bitset.
    #[inline]
    pub fn bitset(&self) -> &BitSet { &self.bitset }

    /// Returns the number of live entities stored in the archetype.
    ///
    /// ## Notes
    /// This reflects logical count only; retained empty chunks may hold
    /// additional unused capacity.
    #[inline]
    pub fn len(&self) -> usize { self.length }

    /// Returns `true` if the archetype holds no entities.
    #[inline]
    pub fn is_empty(&self) -> bool { self.length == 0 }

    /// Number of rows a single chunk can hold.
    #[inline]
    pub fn rows_per_chunk(&self) -> usize { self.rows_per_chunk }

    /// Returns `true` if the archetype's signature contains the component.
    #[inline]
    pub fn has(&self, component_id: ComponentID) -> bool {
        self.bitset.has(component_id)
    }

    /// All allocated chunks, including retained empty ones.
    #[inline]
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }

    /// Number of allocated chunks.
    #[inline]
    pub fn chunk_count(&self) -> usize { self.chunks.len() }

    /// Shared access to one chunk.
    #[inline]
    pub fn chunk(&self, chunk: ChunkID) -> &Chunk { &self.chunks[chunk as usize] }

    /// Mutable access to one chunk.
    #[inline]
    pub fn chunk_mut(&mut self, chunk: ChunkID) -> &mut Chunk {
        &mut self.chunks[chunk as usize]
    }

    /// Index of the chunk holding the archetype's last row.
    #[inline]
    fn tail_chunk(&self) -> ChunkID {
        debug_assert!(self.length > 0);
        ((self.length - 1) / self.rows_per_chunk) as ChunkID
    }

    /// Appends an entity and returns its `(chunk, row)` position.
    ///
    /// ## Behavior
    /// - Targets the chunk addressed by the current length, which is the
    ///   tail chunk or the first retained empty one.
    /// - Allocates a fresh chunk when none is available.
    /// - Component values for the row are written separately by the caller.

    pub fn add(&mut self, entity: Entity) -> (ChunkID, RowID) {
        let target = self.length / self.rows_per_chunk;
        if target == self.chunks.len() {
            self.chunks.push(Chunk::new(self.signature.types(), self.rows_per_chunk));
            trace!("archetype {} allocated chunk {}", self.id, target);
        }

        let row = self.chunks[target].add(entity);
        self.length += 1;
        (target as ChunkID, row)
    }

    /// Removes the row at `(chunk, row)` and keeps the archetype dense.
    ///
    /// ## Behavior
    /// - The chunk's last row is swapped into the vacated row.
    /// - If the vacated chunk is not the tail chunk, the tail chunk's last
    ///   row is transferred over so earlier chunks stay full.
    /// - Every relocated entity's world slot is rewritten through
    ///   `entities`.
    /// - Component values at the removed row are **not** dropped here; the
    ///   caller drops or moves them first.
    /// - Emptied chunks are retained for reuse.

    pub fn remove(&mut self, chunk: ChunkID, row: RowID, entities: &mut EntityTable) {
        let tail = self.tail_chunk();

        if let Some(moved) = self.chunks[chunk as usize].remove(row) {
            entities.set_location(
                moved,
                EntityLocation { archetype: self.id, chunk, row },
            );
        }

        if chunk != tail {
            let (head, rest) = self.chunks.split_at_mut(tail as usize);
            let destination = &mut head[chunk as usize];
            let source = &mut rest[0];

            let refill_row = destination.len() as RowID;
            let moved = destination.transfer(refill_row, source);
            entities.set_location(
                moved,
                EntityLocation { archetype: self.id, chunk, row: refill_row },
            );
        }

        self.length -= 1;
    }

    /// Moves an entity's row into another archetype.
    ///
    /// ## Purpose
    /// This is the core operation behind component addition and removal:
    /// the entity's component set changed, so its row must live in the
    /// archetype whose signature matches the new set.
    ///
    /// ## Behavior
    /// 1. A destination row is appended.
    /// 2. Values of components shared by both signatures are moved
    ///    bytewise; values with no destination column are dropped; columns
    ///    new to the destination are left for the caller to initialize.
    /// 3. The source row is removed via swap-with-last, rewriting the
    ///    slots of every relocated entity.
    ///
    /// The caller rewrites the migrating entity's own slot to the returned
    /// position.
    ///
    /// ## Returns
    /// The `(chunk, row)` of the entity in the destination archetype.

    pub fn move_to(
        &mut self,
        destination: &mut Archetype,
        entity: Entity,
        chunk: ChunkID,
        row: RowID,
        entities: &mut EntityTable,
    ) -> (ChunkID, RowID) {
        let (dst_chunk, dst_row) = destination.add(entity);
        Chunk::copy(
            self.chunk_mut(chunk),
            row,
            destination.chunk_mut(dst_chunk),
            dst_row,
            1,
        );
        self.remove(chunk, row, entities);
        (dst_chunk, dst_row)
    }
}
