//! Partitioning of elements into groups that can be assembled concurrently.
//!
//! A [`ThreadGroups`] is a sequence of groups, each group a list of tasks and each task a list
//! of elements. Tasks within a group touch pairwise disjoint node sets, so the tasks of a group
//! may run on separate threads while the groups themselves run one after another.
use lagpatch_nested_vec::NestedVec;
use lagpatch_paradis::coloring::{sequential_greedy_coloring, structured_block_coloring};
use lagpatch_paradis::{DisjointSubsets, SubsetsNotDisjointError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadGroups {
    groups: Vec<NestedVec<usize>>,
}

impl ThreadGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkerboard blocks of `block_size x block_size` elements on a structured element grid.
    ///
    /// Elements are numbered row by row, `i2 * elements_x + i1`.
    pub fn structured(elements_x: usize, elements_y: usize, block_size: usize) -> Self {
        Self {
            groups: structured_block_coloring(elements_x, elements_y, block_size),
        }
    }

    /// Greedy coloring of elements with arbitrary connectivity, one element per task.
    pub fn from_connectivity(connectivity: &NestedVec<usize>) -> Self {
        let groups = sequential_greedy_coloring(connectivity)
            .into_iter()
            .map(|color| {
                let mut tasks = NestedVec::with_capacity(color.len(), color.len());
                for &element in color.labels() {
                    tasks.push(&[element]);
                }
                tasks
            })
            .collect();
        Self { groups }
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The tasks of the given group.
    pub fn group(&self, index: usize) -> Option<&NestedVec<usize>> {
        self.groups.get(index)
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = &NestedVec<usize>> {
        self.groups.iter()
    }

    /// Total number of elements over all groups.
    pub fn num_elements(&self) -> usize {
        self.groups.iter().map(NestedVec::total_num_elements).sum()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// The node sets touched by each task, per group, labeled by task index.
    ///
    /// Each subset is the concatenation of the connectivity of the task's elements, so a node
    /// shared by two elements of the same task appears twice.
    pub fn node_subsets(
        &self,
        connectivity: &NestedVec<usize>,
    ) -> Result<Vec<DisjointSubsets>, SubsetsNotDisjointError> {
        self.groups
            .iter()
            .map(|tasks| {
                let mut subsets = NestedVec::with_capacity(tasks.len(), 0);
                for task in tasks.iter() {
                    let mut appender = subsets.begin_array();
                    for nodes in task.iter().filter_map(|&element| connectivity.get(element)) {
                        for &node in nodes {
                            appender.push_single(node);
                        }
                    }
                }
                DisjointSubsets::try_from_disjoint_subsets(subsets, (0..tasks.len()).collect())
            })
            .collect()
    }

    /// Checks that no two tasks of a group share a node.
    pub fn verify(&self, connectivity: &NestedVec<usize>) -> bool {
        self.node_subsets(connectivity).is_ok()
    }
}
