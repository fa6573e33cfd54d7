//! Colorings of index subsets into groups of mutually disjoint subsets.
use crate::DisjointSubsets;
use lagpatch_nested_vec::NestedVec;
use std::collections::BTreeSet;

#[derive(Debug)]
struct Color {
    subsets: NestedVec<usize>,
    labels: Vec<usize>,
    indices: BTreeSet<usize>,
}

impl Color {
    fn new_with_subset(subset: &[usize], label: usize) -> Self {
        let mut subsets = NestedVec::new();
        subsets.push(subset);
        Self {
            subsets,
            labels: vec![label],
            indices: subset.iter().copied().collect(),
        }
    }

    fn try_add_subset(&mut self, subset: &[usize], label: usize) -> bool {
        if subset.iter().any(|idx| self.indices.contains(idx)) {
            false
        } else {
            self.subsets.push(subset);
            self.labels.push(label);
            self.indices.extend(subset.iter().copied());
            true
        }
    }
}

/// Greedily assigns every subset to the first color it does not intersect.
///
/// The label of each subset in the output is its position in `subsets`.
pub fn sequential_greedy_coloring(subsets: &NestedVec<usize>) -> Vec<DisjointSubsets> {
    let mut colors = Vec::<Color>::new();

    'subset_loop: for (label, subset) in subsets.iter().enumerate() {
        for color in &mut colors {
            if color.try_add_subset(subset, label) {
                continue 'subset_loop;
            }
        }
        colors.push(Color::new_with_subset(subset, label));
    }

    colors
        .into_iter()
        .map(|color| {
            // The last entry of a BTreeSet is its largest value
            let max_index = color.indices.iter().next_back().copied();
            // Subsets are disjoint by construction
            unsafe { DisjointSubsets::from_disjoint_subsets_unchecked(color.subsets, color.labels, max_index) }
        })
        .collect()
}

/// Partitions a structured `cells_x` by `cells_y` grid of cells into square blocks of
/// `block_size` cells per direction, and colors the blocks in a 2x2 checkerboard pattern.
///
/// Returns one entry per non-empty color. Each entry holds one array per block, listing the
/// row-major cell indices (`j * cells_x + i`) of that block. Two blocks of the same color are
/// separated by at least one block in some direction, so cells in distinct blocks of the same
/// color never share a grid vertex.
pub fn structured_block_coloring(cells_x: usize, cells_y: usize, block_size: usize) -> Vec<NestedVec<usize>> {
    let block_size = block_size.max(1);
    let blocks_x = (cells_x + block_size - 1) / block_size;
    let blocks_y = (cells_y + block_size - 1) / block_size;

    let mut colors = Vec::with_capacity(4);
    for (parity_x, parity_y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        let mut blocks = NestedVec::new();
        for bj in (parity_y..blocks_y).step_by(2) {
            for bi in (parity_x..blocks_x).step_by(2) {
                let j_range = bj * block_size..((bj + 1) * block_size).min(cells_y);
                let i_range = bi * block_size..((bi + 1) * block_size).min(cells_x);
                blocks.push_iter(
                    j_range.flat_map(|j| i_range.clone().map(move |i| j * cells_x + i)),
                );
            }
        }
        if !blocks.is_empty() {
            colors.push(blocks);
        }
    }
    colors
}
