//! Parallel processing of disjoint index subsets.
//!
//! The central type is [`DisjointSubsets`]: a collection of index subsets, no two of which
//! share an index. Given a storage of records, every subset may then be processed on its own
//! thread with exclusive mutable access to the records it names. A sequence of such
//! collections (a *coloring*, see [`coloring`]) covers every subset of an arbitrary set of
//! subsets, and is the basis for race-free parallel finite element assembly.

pub mod coloring;
pub mod slice;

use lagpatch_nested_vec::NestedVec;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub struct SubsetAccess<'data, Access> {
    subset_label: usize,
    global_indices: &'data [usize],
    access: Access,
}

impl<'data, Access> SubsetAccess<'data, Access> {
    pub fn global_indices(&self) -> &[usize] {
        self.global_indices
    }

    pub fn label(&self) -> usize {
        self.subset_label
    }

    pub fn len(&self) -> usize {
        self.global_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global_indices.is_empty()
    }

    pub fn get<'b>(&'b self, local_index: usize) -> <Access as ParallelIndexedAccess<'b>>::Record
    where
        'data: 'b,
        Access: ParallelIndexedAccess<'b>,
    {
        let global_index = self.global_indices[local_index];
        unsafe { self.access.get_unchecked(global_index) }
    }

    /// Mutable access to the record referenced by the given local index of the subset.
    ///
    /// The borrow of `self` ensures that at most one record of this subset is mutably accessed
    /// at a time, so duplicate indices within a subset are harmless.
    pub fn get_mut<'b>(&'b mut self, local_index: usize) -> <Access as ParallelIndexedAccess<'b>>::RecordMut
    where
        'data: 'b,
        Access: ParallelIndexedAccess<'b>,
    {
        let global_index = self.global_indices[local_index];
        unsafe { self.access.get_unchecked_mut(global_index) }
    }
}

/// Facilitates parallel access to (mutable) records stored in a collection.
///
/// # Safety
///
/// An implementor must ensure that it is sound for multiple threads to access a single record
/// *immutably*, provided that no thread accesses the same record mutably, and that it is sound
/// for multiple threads to access *disjoint* records mutably.
///
/// It is the responsibility of the consumer that a mutably accessed record is never accessed
/// by any other thread, and that a single thread never holds two records for the same index
/// when either of them is mutable.
pub unsafe trait ParallelIndexedAccess<'record>: Sync + Send + Clone {
    type Record;
    type RecordMut;

    unsafe fn get_unchecked(&self, index: usize) -> Self::Record;
    unsafe fn get_unchecked_mut(&self, index: usize) -> Self::RecordMut;
}

/// An indexed collection that exposes parallel indexed access to its contents.
///
/// # Safety
///
/// Consumers are permitted to access records with indices `[0, len)`, so an incorrect
/// [`len`](ParallelIndexedCollection::len) may lead to unsoundness.
pub unsafe trait ParallelIndexedCollection<'a> {
    type Access;

    unsafe fn create_access(&'a mut self) -> Self::Access;
    fn len(&self) -> usize;
}

/// A set of subsets of indices, in which the intersection of indices between any two subsets is
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisjointSubsets {
    // Largest index present in any subset, used to bounds check storages up front
    max_index: Option<usize>,
    // Indices may repeat within a subset, but never across two subsets
    subsets: NestedVec<usize>,
    labels: Vec<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SubsetsNotDisjointError {
    pub index: usize,
}

impl fmt::Display for SubsetsNotDisjointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {} is shared by more than one subset", self.index)
    }
}

impl std::error::Error for SubsetsNotDisjointError {}

impl DisjointSubsets {
    pub fn try_from_disjoint_subsets<Subsets: Into<NestedVec<usize>>>(
        subsets: Subsets,
        labels: Vec<usize>,
    ) -> Result<Self, SubsetsNotDisjointError> {
        let subsets = subsets.into();
        assert_eq!(subsets.len(), labels.len(), "Must have exactly one label per subset.");

        let mut global_index_set = HashSet::new();
        let mut local_index_set = HashSet::new();

        for subset in subsets.iter() {
            local_index_set.clear();
            local_index_set.extend(subset.iter().copied());
            for &idx in &local_index_set {
                if !global_index_set.insert(idx) {
                    return Err(SubsetsNotDisjointError { index: idx });
                }
            }
        }

        let max_index = global_index_set.iter().copied().max();
        Ok(Self {
            max_index,
            subsets,
            labels,
        })
    }

    /// # Safety
    ///
    /// The subsets must be pairwise disjoint and `max_index` must be the largest index present.
    pub unsafe fn from_disjoint_subsets_unchecked<Subsets: Into<NestedVec<usize>>>(
        subsets: Subsets,
        labels: Vec<usize>,
        max_index: Option<usize>,
    ) -> Self {
        let subsets = subsets.into();
        assert_eq!(subsets.len(), labels.len(), "Must have exactly one label per subset.");
        Self {
            max_index,
            subsets,
            labels,
        }
    }

    pub fn subsets(&self) -> &NestedVec<usize> {
        &self.subsets
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn max_index(&self) -> Option<usize> {
        self.max_index
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Create a parallel iterator over the subsets, fetching data from the provided storage.
    ///
    /// Panics if any subset contains an index that exceeds the length reported by `storage`.
    pub fn subsets_par_iter<'a, Storage>(
        &'a self,
        storage: &'a mut Storage,
    ) -> impl 'a + IndexedParallelIterator<Item = SubsetAccess<'a, Storage::Access>>
    where
        Storage: ?Sized + ParallelIndexedCollection<'a>,
        Storage::Access: 'a + Send + Sync + Clone,
    {
        assert!(
            self.max_index.map_or(true, |max| storage.len() > max),
            "Subsets contain indices out of bounds."
        );
        // The exclusive borrow of the storage guarantees this is the only access in existence
        let access = unsafe { storage.create_access() };
        let subsets = &self.subsets;
        let labels = &self.labels;

        (0..labels.len()).into_par_iter().map(move |i| SubsetAccess {
            subset_label: labels[i],
            global_indices: subsets.get(i).unwrap_or_default(),
            access: access.clone(),
        })
    }
}
