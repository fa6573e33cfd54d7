//! Flat storage of variable-length arrays.
//!
//! A [`NestedVec`] stores a sequence of arrays back to back in a single buffer, together with
//! an offset table. Array `i` occupies `data[offsets[i] .. offsets[i + 1]]`. This is used for
//! element connectivity, where most elements have the same number of nodes but a few
//! (the extended ones) carry additional trailing entries.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use std::ops::Range;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedVec<T> {
    data: Vec<T>,
    // Always contains at least one entry (zero), so that the number of arrays is
    // offsets.len() - 1
    offsets: Vec<usize>,
}

impl<T: Debug> Debug for NestedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Default for NestedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NestedVec<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            offsets: vec![0],
        }
    }

    pub fn with_capacity(num_arrays: usize, num_elements: usize) -> Self {
        let mut offsets = Vec::with_capacity(num_arrays + 1);
        offsets.push(0);
        Self {
            data: Vec::with_capacity(num_elements),
            offsets,
        }
    }

    /// Number of arrays.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of elements across all arrays.
    pub fn total_num_elements(&self) -> usize {
        self.data.len()
    }

    fn index_range(&self, index: usize) -> Option<Range<usize>> {
        let begin = *self.offsets.get(index)?;
        let end = *self.offsets.get(index + 1)?;
        Some(begin..end)
    }

    pub fn get(&self, index: usize) -> Option<&[T]> {
        let range = self.index_range(index)?;
        self.data.get(range)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut [T]> {
        let range = self.index_range(index)?;
        self.data.get_mut(range)
    }

    pub fn array_len(&self, index: usize) -> Option<usize> {
        self.index_range(index).map(|range| range.len())
    }

    pub fn iter(&self) -> impl '_ + DoubleEndedIterator<Item = &[T]> + ExactSizeIterator {
        self.offsets
            .windows(2)
            .map(move |w| &self.data[w[0]..w[1]])
    }

    /// Returns an iterator over all elements inside all arrays.
    pub fn iter_array_elements(&self) -> impl '_ + Iterator<Item = &T> {
        self.data.iter()
    }

    /// Appends an array built from an iterator.
    pub fn push_iter<I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.data.extend(elements);
        self.offsets.push(self.data.len());
    }

    /// Appends an empty array and returns a handle for adding entries to it one by one.
    pub fn begin_array(&mut self) -> ArrayAppender<'_, T> {
        self.offsets.push(self.data.len());
        ArrayAppender {
            data: &mut self.data,
            offsets: &mut self.offsets,
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.offsets.clear();
        self.offsets.push(0);
    }
}

impl<T: Clone> NestedVec<T> {
    pub fn push(&mut self, array: &[T]) {
        self.data.extend_from_slice(array);
        self.offsets.push(self.data.len());
    }

    /// Builds a nested vec of `num_arrays` arrays, each with `stride` entries produced by `f(array, local)`.
    pub fn from_fixed_stride<F>(num_arrays: usize, stride: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut result = Self::with_capacity(num_arrays, num_arrays * stride);
        for i in 0..num_arrays {
            result.push_iter((0..stride).map(|local| f(i, local)));
        }
        result
    }
}

/// Handle for appending entries to the last array of a [`NestedVec`].
#[derive(Debug)]
pub struct ArrayAppender<'a, T> {
    data: &'a mut Vec<T>,
    offsets: &'a mut Vec<usize>,
}

impl<'a, T> ArrayAppender<'a, T> {
    pub fn push_single(&mut self, element: T) -> &mut Self {
        self.data.push(element);
        if let Some(last) = self.offsets.last_mut() {
            *last = self.data.len();
        }
        self
    }

    pub fn count(&self) -> usize {
        let n = self.offsets.len();
        self.offsets[n - 1] - self.offsets[n - 2]
    }
}

impl<'a, T: Clone> From<&'a [Vec<T>]> for NestedVec<T> {
    fn from(arrays: &'a [Vec<T>]) -> Self {
        let mut result = Self::new();
        for array in arrays {
            result.push(array);
        }
        result
    }
}

impl<'a, T: Clone> From<&'a Vec<Vec<T>>> for NestedVec<T> {
    fn from(arrays: &'a Vec<Vec<T>>) -> Self {
        Self::from(arrays.as_slice())
    }
}

impl<T: Clone> From<Vec<Vec<T>>> for NestedVec<T> {
    fn from(arrays: Vec<Vec<T>>) -> Self {
        Self::from(arrays.as_slice())
    }
}

impl<'a, T: Clone> From<&'a NestedVec<T>> for Vec<Vec<T>> {
    fn from(nested: &'a NestedVec<T>) -> Self {
        nested.iter().map(|slice| slice.to_vec()).collect()
    }
}

impl<T: Clone> From<NestedVec<T>> for Vec<Vec<T>> {
    fn from(nested: NestedVec<T>) -> Self {
        Self::from(&nested)
    }
}
