use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};

use crate::engine::component::ComponentType;
use crate::engine::types::RowID;


/// One fixed-capacity, type-erased component column inside a chunk.
///
/// Invariant:
/// - The buffer holds `capacity` slots of `ty.size` bytes at `ty.align`.
/// - The column does not track which rows are initialized; the owning chunk
///   does, and is responsible for dropping live rows before the column is
///   dropped.
/// - Zero-sized component types allocate nothing; the base pointer is a
///   well-aligned dangling pointer, which is valid for zero-size access.
pub struct ErasedColumn {
    ty: ComponentType,
    data: NonNull<u8>,
    capacity: usize,
}

// Columns only ever hold component types, and registration requires
// components to be Send + Sync.
unsafe impl Send for ErasedColumn {}
unsafe impl Sync for ErasedColumn {}

impl ErasedColumn {
    /// Allocates a column of `capacity` slots for `ty`.
    pub fn new(ty: ComponentType, capacity: usize) -> Self {
        let data = if ty.is_zero_sized || capacity == 0 {
            ty.dangling()
        } else {
            let layout = Self::buffer_layout(&ty, capacity);
            let raw = unsafe { alloc::alloc(layout) };
            match NonNull::new(raw) {
                Some(raw) => raw,
                None => alloc::handle_alloc_error(layout),
            }
        };

        Self { ty, data, capacity }
    }

    fn buffer_layout(ty: &ComponentType, capacity: usize) -> Layout {
        Layout::from_size_align(ty.size * capacity, ty.align)
            .expect("component column layout")
    }

    /// The component type stored in this column.
    #[inline]
    pub fn component_type(&self) -> &ComponentType { &self.ty }

    /// Number of slots in this column.
    #[inline]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Raw pointer to the slot at `row`.
    #[inline]
    pub fn ptr_at(&self, row: RowID) -> *mut u8 {
        debug_assert!((row as usize) < self.capacity || self.ty.is_zero_sized);
        unsafe { self.data.as_ptr().add(row as usize * self.ty.size) }
    }

    /// Views rows `[0, length)` as a typed slice.
    ///
    /// Debug builds assert the requested type matches the column type.
    #[inline]
    pub fn as_slice<T: 'static>(&self, length: usize) -> &[T] {
        debug_assert!(self.ty.matches_type::<T>(), "column type mismatch: {}", self.ty.name);
        debug_assert!(length <= self.capacity || self.ty.is_zero_sized);
        unsafe { std::slice::from_raw_parts(self.data.as_ptr() as *const T, length) }
    }

    /// Views rows `[0, length)` as a mutable typed slice.
    #[inline]
    pub fn as_slice_mut<T: 'static>(&mut self, length: usize) -> &mut [T] {
        debug_assert!(self.ty.matches_type::<T>(), "column type mismatch: {}", self.ty.name);
        debug_assert!(length <= self.capacity || self.ty.is_zero_sized);
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr() as *mut T, length) }
    }

    /// Moves one element's bytes from `source` into `row`.
    ///
    /// The destination slot must be uninitialized or already moved out;
    /// the source bytes must not be reused afterwards.
    #[inline]
    pub fn write_from(&mut self, row: RowID, source: *const u8) {
        if self.ty.is_zero_sized {
            return;
        }
        unsafe { ptr::copy_nonoverlapping(source, self.ptr_at(row), self.ty.size) };
    }

    /// Moves the element at `src_row` of `source` into `dst_row` of `self`.
    ///
    /// Both columns must store the same component type.
    #[inline]
    pub fn copy_row_from(&mut self, dst_row: RowID, source: &ErasedColumn, src_row: RowID) {
        debug_assert_eq!(self.ty.id, source.ty.id, "column component mismatch");
        self.write_from(dst_row, source.ptr_at(src_row));
    }

    /// Moves the element at `src_row` into `dst_row` within this column.
    ///
    /// The rows must be distinct; the value at `dst_row` must already be
    /// dropped or moved out.
    #[inline]
    pub fn move_row_within(&mut self, src_row: RowID, dst_row: RowID) {
        debug_assert_ne!(src_row, dst_row);
        if self.ty.is_zero_sized {
            return;
        }
        unsafe {
            ptr::copy_nonoverlapping(self.ptr_at(src_row), self.ptr_at(dst_row), self.ty.size);
        }
    }

    /// Runs the component's drop glue for the value at `row`.
    ///
    /// The slot must hold an initialized value; afterwards it does not.
    #[inline]
    pub fn drop_row(&mut self, row: RowID) {
        if let Some(drop_fn) = self.ty.drop_fn {
            unsafe { drop_fn(self.ptr_at(row)) };
        }
    }
}

impl Drop for ErasedColumn {
    fn drop(&mut self) {
        // Live rows were dropped by the owning chunk; only the buffer
        // remains.
        if !self.ty.is_zero_sized && self.capacity > 0 {
            let layout = Self::buffer_layout(&self.ty, self.capacity);
            unsafe { alloc::dealloc(self.data.as_ptr(), layout) };
        }
    }
}
