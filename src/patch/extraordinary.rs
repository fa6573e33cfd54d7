//! Extension of boundary elements with out-of-band nodes.
//!
//! Interface and constraint couplings attach extra unknowns (for instance Lagrange multipliers)
//! to the elements along one edge of a patch. Each such element gets an extraordinary twin that
//! lists the regular nodes followed by the extra nodes, with a mask excluding the regular
//! nodes off the edge from receiving contributions.
use crate::error::PatchError;
use crate::grid::Edge;
use crate::integrand::ElementNodes;
use crate::patch::{ElementId, GlobalNumbering, LagrangePatch};
use log::{debug, error};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtraordinaryElement {
    pub nodes: Vec<usize>,
    pub contributes: Vec<bool>,
    pub num_regular: usize,
    pub id: usize,
    pub edge: Edge,
}

impl ExtraordinaryElement {
    pub fn element_nodes(&self) -> ElementNodes<'_> {
        ElementNodes::extraordinary(&self.nodes, &self.contributes, self.num_regular)
    }
}

impl LagrangePatch {
    /// Appends `count` nodes without coordinates, drawing their ids from `numbering`.
    ///
    /// Reserves one extraordinary slot per element on first use. Returns the 0-based indices
    /// of the new nodes.
    pub fn add_extra_nodes(
        &mut self,
        count: usize,
        numbering: &mut GlobalNumbering,
    ) -> Result<Range<usize>, PatchError> {
        if count == 0 {
            error!("Number of extra nodes must be positive");
            return Err(PatchError::EmptyExtraNodes);
        }

        // Regular nodes may have been set explicitly, without global ids
        while self.node_ids.len() < self.coordinates.len() {
            self.node_ids.push(numbering.next_node());
        }

        let first = self.node_ids.len();
        self.node_ids.extend((0..count).map(|_| numbering.next_node()));
        if self.extraordinary.is_empty() {
            self.extraordinary = vec![None; self.element_ids.len()];
        }
        Ok(first..first + count)
    }

    /// Adds `count` extra nodes and extends every element along `edge` with them.
    ///
    /// Fails without modifying the patch if any of the elements was already extended.
    /// Returns the 0-based indices of the extra nodes.
    pub fn add_extraordinary_elements(
        &mut self,
        edge: Edge,
        count: usize,
        numbering: &mut GlobalNumbering,
    ) -> Result<Range<usize>, PatchError> {
        let (p1, p2) = self.grid.order();
        if p1 < 2 || p2 < 2 {
            error!("Cannot extend the {edge:?} edge before the topology is generated");
            return Err(PatchError::InvalidOrder { p1, p2 });
        }

        let elements: Vec<usize> = self
            .grid
            .elements_on_edge(edge)
            .filter(|&iel| matches!(self.element_ids.get(iel), Some(ElementId::Ordinary(_))))
            .collect();

        if let Some(&iel) = elements
            .iter()
            .find(|&&iel| matches!(self.extraordinary.get(iel), Some(Some(_))))
        {
            error!("Element {} is already extended, only one extraordinary edge is allowed", iel + 1);
            return Err(PatchError::DuplicateExtraordinaryEdge { element: iel + 1, edge });
        }

        let extra = self.add_extra_nodes(count, numbering)?;
        let grid = self.grid;
        for &iel in &elements {
            let Some(regular) = self.connectivity.get(iel) else {
                continue;
            };
            let mut nodes = regular.to_vec();
            let mut contributes: Vec<bool> = (0..p2)
                .flat_map(|b| (0..p1).map(move |a| grid.local_node_on_edge(a, b, edge)))
                .collect();
            nodes.extend(extra.clone());
            contributes.resize(nodes.len(), true);

            self.extraordinary[iel] = Some(ExtraordinaryElement {
                nodes,
                contributes,
                num_regular: p1 * p2,
                id: numbering.next_element(),
                edge,
            });
        }

        debug!(
            "Extended {} elements on {edge:?} edge with {count} extra nodes",
            elements.len()
        );
        Ok(extra)
    }

    /// Number of reserved extraordinary element slots.
    pub fn num_extraordinary_slots(&self) -> usize {
        self.extraordinary.len()
    }

    /// Identity of the extraordinary twin of the 1-based element, if it has one.
    pub fn extraordinary_element_id(&self, element: usize) -> Option<ElementId> {
        self.extraordinary_element(element.checked_sub(1)?)
            .map(|xo| ElementId::Extraordinary(xo.id))
    }

    /// Nodes of the extraordinary twin of the 1-based element, if it has one.
    pub fn extraordinary_element_nodes(&self, element: usize) -> Option<ElementNodes<'_>> {
        self.extraordinary_element(element.checked_sub(1)?)
            .map(ExtraordinaryElement::element_nodes)
    }

    pub(crate) fn extraordinary_element(&self, index: usize) -> Option<&ExtraordinaryElement> {
        self.extraordinary.get(index).and_then(Option::as_ref)
    }
}
