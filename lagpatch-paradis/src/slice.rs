//! Records stored contiguously in a mutable slice, e.g. one nodal accumulator per node.
use crate::{ParallelIndexedAccess, ParallelIndexedCollection};
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Shared handle to the records of a mutably borrowed slice.
///
/// Copies of the handle are given to every thread iterating over a [`DisjointSubsets`](crate::DisjointSubsets).
/// The slice stays mutably borrowed for `'a`, so no other access can observe the records meanwhile.
pub struct SliceRecords<'a, T> {
    first: NonNull<T>,
    len: usize,
    borrow: PhantomData<&'a mut [T]>,
}

impl<'a, T> SliceRecords<'a, T> {
    fn record_ptr(&self, index: usize) -> *mut T {
        debug_assert!(index < self.len, "record {index} out of bounds for {} records", self.len);
        // Index is within the borrowed slice, which the caller guarantees
        unsafe { self.first.as_ptr().add(index) }
    }
}

impl<'a, T> Clone for SliceRecords<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for SliceRecords<'a, T> {}

// Handles only hand out references to records, so they inherit the thread safety of `T`
unsafe impl<'a, T: Sync> Sync for SliceRecords<'a, T> {}
unsafe impl<'a, T: Send> Send for SliceRecords<'a, T> {}

unsafe impl<'a, 'b, T> ParallelIndexedAccess<'b> for SliceRecords<'a, T>
where
    'a: 'b,
    T: 'b + Send + Sync,
{
    type Record = &'b T;
    type RecordMut = &'b mut T;

    unsafe fn get_unchecked(&self, index: usize) -> &'b T {
        &*self.record_ptr(index)
    }

    unsafe fn get_unchecked_mut(&self, index: usize) -> &'b mut T {
        &mut *self.record_ptr(index)
    }
}

unsafe impl<'a, T: 'a + Send + Sync> ParallelIndexedCollection<'a> for [T] {
    type Access = SliceRecords<'a, T>;

    unsafe fn create_access(&'a mut self) -> SliceRecords<'a, T> {
        SliceRecords {
            len: self.len(),
            first: NonNull::new_unchecked(self.as_mut_ptr()),
            borrow: PhantomData,
        }
    }

    fn len(&self) -> usize {
        <[T]>::len(self)
    }
}
