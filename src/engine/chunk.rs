//! Fixed-capacity Structure-of-Arrays storage block.
//!
//! A [`Chunk`] is the unit of allocation and iteration. It holds one
//! contiguous, densely-typed column per component in its archetype's
//! signature, plus an entity back-reference array, all sharing the same row
//! indexing: row `i` of every column belongs to the entity at
//! `entities()[i]`.
//!
//! ## Layout
//! - `columns[k]` stores the component at position `k` of the signature.
//! - `id_to_column` maps a component id to its column index, or
//!   [`NO_COLUMN`] when the component is absent, giving O(1) typed access.
//! - Rows `[0, size)` hold valid data; rows `[size, capacity)` are
//!   unspecified.
//!
//! ## Compaction
//! Removal fills the vacated row with the chunk's last row (swap-with-last)
//! so columns stay dense. Row order is therefore not stable across
//! removals; callers that track positions are told which entity moved.
//!
//! ## Ownership
//! The chunk owns its column buffers and is responsible for dropping the
//! live rows of every column when it is dropped. Removal operations are
//! pure byte moves; whoever discards a value (destroy, component removal)
//! runs its drop glue explicitly first.

use std::any::TypeId;

use crate::engine::component::ComponentType;
use crate::engine::entity::Entity;
use crate::engine::storage::ErasedColumn;
use crate::engine::types::{ComponentID, RowID, NO_COLUMN};


/// Structure-of-Arrays block of fixed row capacity.
///
/// ## Invariants
/// - All columns share the chunk's capacity and row indexing.
/// - `entities.len()` equals the number of valid rows.
/// - `id_to_column[id]` is a valid column index or [`NO_COLUMN`].

pub struct Chunk {
    capacity: usize,
    entities: Vec<Entity>,
    columns: Vec<ErasedColumn>,
    id_to_column: Box<[i32]>,
}

impl Chunk {

    /// Creates an empty chunk for the given component layout.
    ///
    /// ## Behavior
    /// - Builds the `id_to_column` lookup sized to the largest component id.
    /// - Allocates one column per component type; zero-sized components get
    ///   a column entry but no buffer.
    ///
    /// ## Notes
    /// `types` must be sorted and deduplicated; chunks are only built from
    /// signatures, which guarantee that.

    pub fn new(types: &[ComponentType], capacity: usize) -> Self {
        debug_assert!(capacity > 0, "chunk capacity must be at least one row");

        let lookup_len = types.iter().map(|ty| ty.id as usize + 1).max().unwrap_or(0);
        let mut id_to_column = vec![NO_COLUMN; lookup_len].into_boxed_slice();

        let mut columns = Vec::with_capacity(types.len());
        for (index, ty) in types.iter().enumerate() {
            id_to_column[ty.id as usize] = index as i32;
            columns.push(ErasedColumn::new(*ty, capacity));
        }

        Self {
            capacity,
            entities: Vec::with_capacity(capacity),
            columns,
            id_to_column,
        }
    }

    /// Maximum number of rows this chunk can hold.
    #[inline]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Number of valid rows.
    #[inline]
    pub fn len(&self) -> usize { self.entities.len() }

    /// Returns `true` if the chunk holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    /// Returns `true` if no further rows can be appended.
    #[inline]
    pub fn is_full(&self) -> bool { self.entities.len() == self.capacity }

    /// Entity back-references for rows `[0, size)`.
    #[inline]
    pub fn entities(&self) -> &[Entity] { &self.entities }

    /// Entity occupying `row`.
    #[inline]
    pub fn entity(&self, row: RowID) -> Entity { self.entities[row as usize] }

    /// Returns `true` if the chunk stores the given component.
    #[inline]
    pub fn has(&self, component_id: ComponentID) -> bool {
        let index = component_id as usize;
        index < self.id_to_column.len() && self.id_to_column[index] != NO_COLUMN
    }

    /// Column index for a component id, if present.
    #[inline]
    pub fn column_index(&self, component_id: ComponentID) -> Option<usize> {
        let index = component_id as usize;
        match self.id_to_column.get(index) {
            Some(&column) if column != NO_COLUMN => Some(column as usize),
            _ => None,
        }
    }

    #[inline]
    fn column_index_of<T: 'static>(&self) -> Option<usize> {
        let type_id = TypeId::of::<T>();
        self.columns
            .iter()
            .position(|column| column.component_type().type_id == type_id)
    }

    /// Appends an entity back-reference and returns the new row.
    ///
    /// ## Notes
    /// Component values for the row are written separately; the caller
    /// guarantees `size < capacity`.

    pub fn add(&mut self, entity: Entity) -> RowID {
        debug_assert!(!self.is_full(), "chunk overflow");
        let row = self.entities.len() as RowID;
        self.entities.push(entity);
        row
    }

    /// Removes `row` by swapping the last row into it.
    ///
    /// ## Behavior
    /// - Moves the last row's bytes into `row` for every column.
    /// - Does not run drop glue; values at `row` must already be moved out
    ///   or dropped by the caller.
    /// - The vacated last row is not zeroed.
    ///
    /// ## Returns
    /// The entity that was relocated into `row`, or `None` if `row` was the
    /// last row. The caller is responsible for rewriting the moved entity's
    /// world slot.

    pub fn remove(&mut self, row: RowID) -> Option<Entity> {
        let last = (self.entities.len() - 1) as RowID;
        debug_assert!(row <= last, "row out of bounds");

        if row == last {
            self.entities.pop();
            return None;
        }

        for column in &mut self.columns {
            column.move_row_within(last, row);
        }
        self.entities.swap_remove(row as usize);
        Some(self.entities[row as usize])
    }

    /// Moves the last row of `source` into row `dst_row` of this chunk.
    ///
    /// ## Purpose
    /// Used by the archetype to keep earlier chunks full: when a removal
    /// leaves a hole in a full chunk, the tail chunk's last row refills it.
    ///
    /// ## Returns
    /// The entity that was moved, so its world slot can be rewritten.
    ///
    /// ## Invariants
    /// Both chunks share one archetype layout; `dst_row` must equal the
    /// destination's current size.

    pub fn transfer(&mut self, dst_row: RowID, source: &mut Chunk) -> Entity {
        debug_assert_eq!(dst_row as usize, self.entities.len());
        debug_assert_eq!(self.columns.len(), source.columns.len());
        debug_assert!(!source.is_empty());

        let src_last = (source.entities.len() - 1) as RowID;
        for (column, src_column) in self.columns.iter_mut().zip(source.columns.iter()) {
            column.copy_row_from(dst_row, src_column, src_last);
        }

        let moved = source.entities.pop().expect("transfer from empty chunk");
        self.entities.push(moved);
        moved
    }

    /// Moves `length` rows of shared component data between two chunks.
    ///
    /// ## Behavior
    /// - For every destination column whose component also exists in the
    ///   source, the element bytes at `source_row..source_row + length` are
    ///   moved to `destination_row..`.
    /// - Columns present only in the destination are left untouched for the
    ///   caller to initialize.
    /// - Columns present only in the source have their values dropped; the
    ///   destination has nowhere to put them.
    ///
    /// ## Invariants
    /// The affected row ranges are valid in both chunks; the destination
    /// rows are uninitialized before the call.

    pub fn copy(
        source: &mut Chunk,
        source_row: RowID,
        destination: &mut Chunk,
        destination_row: RowID,
        length: usize,
    ) {
        for column in &mut destination.columns {
            let id = column.component_type().id;
            let Some(src_index) = source.column_index(id) else { continue };
            let src_column = &source.columns[src_index];
            for offset in 0..length as RowID {
                column.copy_row_from(destination_row + offset, src_column, source_row + offset);
            }
        }

        for column in &mut source.columns {
            if destination.has(column.component_type().id) {
                continue;
            }
            for offset in 0..length as RowID {
                column.drop_row(source_row + offset);
            }
        }
    }

    /// Runs drop glue for every component value at `row`.
    ///
    /// Used on entity destruction, before the row is compacted away.
    pub fn drop_row_values(&mut self, row: RowID) {
        debug_assert!((row as usize) < self.entities.len());
        for column in &mut self.columns {
            column.drop_row(row);
        }
    }

    /// Moves a single component value's bytes into `row`.
    ///
    /// The slot must be uninitialized; the source bytes are consumed.
    pub(crate) fn write_value(&mut self, row: RowID, component_id: ComponentID, source: *const u8) {
        let index = self
            .column_index(component_id)
            .expect("write_value: component not in chunk layout");
        self.columns[index].write_from(row, source);
    }

    /// Replaces the component value at `row`, dropping the previous one.
    pub(crate) fn replace_value(&mut self, row: RowID, component_id: ComponentID, source: *const u8) {
        let index = self
            .column_index(component_id)
            .expect("replace_value: component not in chunk layout");
        let column = &mut self.columns[index];
        column.drop_row(row);
        column.write_from(row, source);
    }

    /// Raw pointer to the component value at `row`, if present.
    pub(crate) fn value_ptr(&self, row: RowID, component_id: ComponentID) -> Option<*mut u8> {
        debug_assert!((row as usize) < self.entities.len());
        let index = self.column_index(component_id)?;
        Some(self.columns[index].ptr_at(row))
    }

    /// Views the column for `T` as a slice over the valid rows.
    pub fn slice<T: 'static>(&self) -> Option<&[T]> {
        let index = self.column_index_of::<T>()?;
        Some(self.columns[index].as_slice(self.entities.len()))
    }

    /// Views the column for `T` as a mutable slice over the valid rows.
    pub fn slice_mut<T: 'static>(&mut self) -> Option<&mut [T]> {
        let length = self.entities.len();
        let index = self.column_index_of::<T>()?;
        Some(self.columns[index].as_slice_mut(length))
    }

    /// Mutable slices over two distinct columns at once.
    ///
    /// Returns `None` if either component is absent or both name the same
    /// column.
    pub fn pair_mut<A: 'static, B: 'static>(&mut self) -> Option<(&mut [A], &mut [B])> {
        let a = self.column_index_of::<A>()?;
        let b = self.column_index_of::<B>()?;
        if a == b {
            return None;
        }

        let length = self.entities.len();
        let base = self.columns.as_mut_ptr();
        // SAFETY: a != b, so the two column borrows are disjoint.
        unsafe {
            let column_a = &mut *base.add(a);
            let column_b = &mut *base.add(b);
            Some((column_a.as_slice_mut::<A>(length), column_b.as_slice_mut::<B>(length)))
        }
    }

    /// Reference to the component value of `T` at `row`.
    pub fn get<T: 'static>(&self, row: RowID) -> Option<&T> {
        self.slice::<T>()?.get(row as usize)
    }

    /// Mutable reference to the component value of `T` at `row`.
    pub fn get_mut<T: 'static>(&mut self, row: RowID) -> Option<&mut T> {
        self.slice_mut::<T>()?.get_mut(row as usize)
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        for column in &mut self.columns {
            for row in 0..self.entities.len() as RowID {
                column.drop_row(row);
            }
        }
    }
}
