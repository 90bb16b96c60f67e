//! Lazy iterators over query results.
//!
//! Three single-pass, non-restartable iterators expose matched storage at
//! increasing granularity: archetypes, chunks, and entity rows. A fourth,
//! mutable chunk iterator backs in-place component writes.
//!
//! ## Ordering
//! Iteration order is deterministic for a fixed history of operations:
//! archetypes in creation order, chunks in allocation order, rows in
//! current in-chunk order. Row order is not stable across removals.
//!
//! ## Allocation
//! None of the iterators allocate after construction; they walk borrowed
//! match lists by cursor.

use std::marker::PhantomData;

use crate::engine::archetype::Archetype;
use crate::engine::chunk::Chunk;
use crate::engine::entity::Entity;
use crate::engine::types::{ArchetypeID, RowID};


/// Yields `&Archetype` for each query match.
pub struct ArchetypeIter<'w> {
    archetypes: &'w [Archetype],
    matches: std::slice::Iter<'w, ArchetypeID>,
}

impl<'w> ArchetypeIter<'w> {
    pub(crate) fn new(archetypes: &'w [Archetype], matches: &'w [ArchetypeID]) -> Self {
        Self { archetypes, matches: matches.iter() }
    }
}

impl<'w> Iterator for ArchetypeIter<'w> {
    type Item = &'w Archetype;

    fn next(&mut self) -> Option<Self::Item> {
        let &id = self.matches.next()?;
        Some(&self.archetypes[id as usize])
    }
}

/// Yields `&Chunk` by flattening matched archetypes over their non-empty
/// chunks.
pub struct ChunkIter<'w> {
    archetypes: &'w [Archetype],
    matches: &'w [ArchetypeID],
    match_cursor: usize,
    chunk_cursor: usize,
}

impl<'w> ChunkIter<'w> {
    pub(crate) fn new(archetypes: &'w [Archetype], matches: &'w [ArchetypeID]) -> Self {
        Self { archetypes, matches, match_cursor: 0, chunk_cursor: 0 }
    }
}

impl<'w> Iterator for ChunkIter<'w> {
    type Item = &'w Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let &id = self.matches.get(self.match_cursor)?;
            let archetype = &self.archetypes[id as usize];

            if self.chunk_cursor >= archetype.chunk_count() {
                self.match_cursor += 1;
                self.chunk_cursor = 0;
                continue;
            }

            let chunk = archetype.chunk(self.chunk_cursor as u32);
            self.chunk_cursor += 1;

            // Retained trailing chunks can be empty; skip them.
            if chunk.is_empty() {
                continue;
            }
            return Some(chunk);
        }
    }
}

/// Yields `(entity, row, chunk)` triples in archetype-major, chunk-major,
/// row order.
pub struct EntityIter<'w> {
    chunks: ChunkIter<'w>,
    current: Option<&'w Chunk>,
    row: usize,
}

impl<'w> EntityIter<'w> {
    pub(crate) fn new(archetypes: &'w [Archetype], matches: &'w [ArchetypeID]) -> Self {
        Self { chunks: ChunkIter::new(archetypes, matches), current: None, row: 0 }
    }
}

impl<'w> Iterator for EntityIter<'w> {
    type Item = (Entity, RowID, &'w Chunk);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.current {
                Some(chunk) if self.row < chunk.len() => {
                    let row = self.row as RowID;
                    self.row += 1;
                    return Some((chunk.entity(row), row, chunk));
                }
                _ => {
                    self.current = Some(self.chunks.next()?);
                    self.row = 0;
                }
            }
        }
    }
}

/// Yields `&mut Chunk` by flattening matched archetypes over their
/// non-empty chunks.
///
/// ## Safety model
/// The iterator walks a strictly advancing `(match, chunk)` cursor over
/// distinct archetype indices, so every yielded `&mut Chunk` is disjoint
/// from all previous ones; the backing slice itself stays exclusively
/// borrowed for `'w`.
pub struct ChunkIterMut<'w> {
    archetypes: *mut Archetype,
    matches: &'w [ArchetypeID],
    match_cursor: usize,
    chunk_cursor: usize,
    _marker: PhantomData<&'w mut [Archetype]>,
}

impl<'w> ChunkIterMut<'w> {
    pub(crate) fn new(archetypes: &'w mut [Archetype], matches: &'w [ArchetypeID]) -> Self {
        Self {
            archetypes: archetypes.as_mut_ptr(),
            matches,
            match_cursor: 0,
            chunk_cursor: 0,
            _marker: PhantomData,
        }
    }
}

impl<'w> Iterator for ChunkIterMut<'w> {
    type Item = &'w mut Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let &id = self.matches.get(self.match_cursor)?;
            // SAFETY: match lists hold distinct, in-bounds archetype
            // indices, and the cursor never revisits a chunk, so no two
            // yielded references alias.
            let archetype = unsafe { &mut *self.archetypes.add(id as usize) };

            if self.chunk_cursor >= archetype.chunk_count() {
                self.match_cursor += 1;
                self.chunk_cursor = 0;
                continue;
            }

            let chunk = archetype.chunk_mut(self.chunk_cursor as u32);
            self.chunk_cursor += 1;

            if chunk.is_empty() {
                continue;
            }
            return Some(chunk);
        }
    }
}
