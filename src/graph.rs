//! Graph adapters and the read-only edge view the engine runs on.
//!
//! - [`Graph`] / [`GraphRef`]: dense adapters over nodes `0..n` (implemented for `petgraph`
//!   graphs under the `petgraph` feature, and by [`GraphView`] itself).
//! - [`NodeIndex`]: stable identifier -> dense index map, built once.
//! - [`GraphView`]: directed edges over dense indices, kept in the caller's enumeration order,
//!   plus a per-source CSR for neighbour slices.

use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Dense directed graph adapter with owned neighbour lists.
pub trait Graph {
    fn node_count(&self) -> usize;
    fn neighbors(&self, node: usize) -> Vec<usize>;
}

/// Dense directed graph adapter with borrowed neighbour slices.
pub trait GraphRef {
    fn node_count(&self) -> usize;
    fn neighbors_ref(&self, node: usize) -> &[usize];
}

#[cfg(feature = "petgraph")]
impl<N, E, Ty, Ix> Graph for petgraph::Graph<N, E, Ty, Ix>
where
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    fn node_count(&self) -> usize {
        petgraph::Graph::node_count(self)
    }

    fn neighbors(&self, node: usize) -> Vec<usize> {
        petgraph::Graph::neighbors(self, petgraph::graph::NodeIndex::new(node))
            .map(|n| n.index())
            .collect()
    }
}

/// Identifier -> dense index in `0..len`, in first-seen order.
#[derive(Debug, Clone)]
pub struct NodeIndex<T> {
    ids: Vec<T>,
    positions: HashMap<T, usize>,
}

impl<T: Eq + Hash + Clone> NodeIndex<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    fn insert(&mut self, id: T) -> usize {
        if let Some(&index) = self.positions.get(&id) {
            return index;
        }
        let index = self.ids.len();
        self.positions.insert(id.clone(), index);
        self.ids.push(id);
        index
    }

    pub fn get(&self, id: &T) -> Option<usize> {
        self.positions.get(id).copied()
    }
}

impl<T> NodeIndex<T> {
    pub fn id(&self, index: usize) -> Option<&T> {
        self.ids.get(index)
    }

    pub fn ids(&self) -> &[T] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for NodeIndex<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut index = Self::with_capacity(iter.size_hint().0);
        for id in iter {
            index.insert(id);
        }
        index
    }
}

/// Read-only directed edge list over dense node indices.
#[derive(Debug, Clone)]
pub struct GraphView<T> {
    nodes: NodeIndex<T>,
    edges: Vec<(usize, usize)>,
    offsets: Vec<usize>,
    targets: Vec<usize>,
}

impl<T: Eq + Hash + Clone> GraphView<T> {
    /// View over an explicit node set. Nodes without edges are kept (isolated).
    ///
    /// Fails with [`Error::UnknownNode`] if an edge names an identifier not in `nodes`.
    pub fn new<N, E>(nodes: N, edges: E) -> Result<Self>
    where
        T: Debug,
        N: IntoIterator<Item = T>,
        E: IntoIterator<Item = (T, T)>,
    {
        let nodes: NodeIndex<T> = nodes.into_iter().collect();
        let lookup = |id: &T| {
            nodes
                .get(id)
                .ok_or_else(|| Error::UnknownNode(format!("{id:?}")))
        };
        let edges = edges
            .into_iter()
            .map(|(s, t)| Ok((lookup(&s)?, lookup(&t)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_parts(nodes, edges))
    }

    /// View whose node set is every identifier appearing in `edges`, in first-seen order.
    pub fn from_edges<E>(edges: E) -> Self
    where
        E: IntoIterator<Item = (T, T)>,
    {
        let mut nodes = NodeIndex::with_capacity(0);
        let edges = edges
            .into_iter()
            .map(|(s, t)| (nodes.insert(s), nodes.insert(t)))
            .collect();
        Self::from_parts(nodes, edges)
    }

    /// Same nodes, every edge flipped (enumeration order preserved).
    pub fn reversed(&self) -> Self {
        let edges = self.edges.iter().map(|&(s, t)| (t, s)).collect();
        Self::from_parts(self.nodes.clone(), edges)
    }

    fn from_parts(nodes: NodeIndex<T>, edges: Vec<(usize, usize)>) -> Self {
        let (offsets, targets) = csr(nodes.len(), &edges);
        Self {
            nodes,
            edges,
            offsets,
            targets,
        }
    }
}

impl GraphView<usize> {
    /// View over a dense adapter; node `i` has identifier `i`.
    pub fn from_graph<G: Graph>(graph: &G) -> Result<Self> {
        let n = graph.node_count();
        let mut edges = Vec::new();
        for u in 0..n {
            for v in graph.neighbors(u) {
                if v >= n {
                    return Err(Error::IndexOutOfBounds(v));
                }
                edges.push((u, v));
            }
        }
        Ok(Self::from_parts((0..n).collect(), edges))
    }
}

impl<T> GraphView<T> {
    pub fn node_count(&self) -> usize {
        self.nodes.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &NodeIndex<T> {
        &self.nodes
    }

    /// Edges `(source, target)` in enumeration order.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }
}

impl<T> GraphRef for GraphView<T> {
    fn node_count(&self) -> usize {
        self.nodes.ids.len()
    }

    fn neighbors_ref(&self, node: usize) -> &[usize] {
        &self.targets[self.offsets[node]..self.offsets[node + 1]]
    }
}

/// Stable counting sort of edges by source: targets of each source keep enumeration order.
fn csr(n: usize, edges: &[(usize, usize)]) -> (Vec<usize>, Vec<usize>) {
    let mut offsets = vec![0usize; n + 1];
    for &(s, _) in edges {
        offsets[s + 1] += 1;
    }
    for i in 0..n {
        offsets[i + 1] += offsets[i];
    }
    let mut cursor = offsets.clone();
    let mut targets = vec![0usize; edges.len()];
    for &(s, t) in edges {
        targets[cursor[s]] = t;
        cursor[s] += 1;
    }
    (offsets, targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_edges_indexes_in_first_seen_order() {
        let g = GraphView::from_edges([("b", "a"), ("c", "b")]);
        assert_eq!(g.nodes().ids(), &["b", "a", "c"]);
        assert_eq!(g.edges(), &[(0, 1), (2, 0)]);
        assert_eq!(g.nodes().get(&"c"), Some(2));
        assert_eq!(g.nodes().get(&"z"), None);
    }

    #[test]
    fn new_keeps_isolated_nodes_and_rejects_unknown() {
        let g = GraphView::new(["a", "b", "d"], [("a", "b")]).unwrap();
        assert_eq!(g.node_count(), 3);
        assert!(g.neighbors_ref(2).is_empty());

        let err = GraphView::new(["a", "b"], [("a", "x")]).unwrap_err();
        assert!(matches!(err, Error::UnknownNode(_)));
        assert!(format!("{err}").contains("\"x\""));
    }

    #[test]
    fn index_accessors_need_no_bounds() {
        fn describe<T>(index: &NodeIndex<T>) -> (usize, bool, Option<&T>) {
            (index.len(), index.is_empty(), index.id(0))
        }
        let g = GraphView::from_edges([("x", "y")]);
        assert_eq!(describe(g.nodes()), (2, false, Some(&"x")));
        assert_eq!(g.nodes().id(2), None);
    }

    #[test]
    fn duplicate_node_ids_collapse() {
        let g = GraphView::new([1, 2, 1], [(1, 2)]).unwrap();
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn csr_preserves_enumeration_order_per_source() {
        let g = GraphView::from_edges([(0, 3), (1, 2), (0, 1), (0, 2)]);
        // ids 0,3,1,2 -> dense 0,1,2,3
        assert_eq!(g.neighbors_ref(0), &[1, 2, 3]);
        assert_eq!(g.neighbors_ref(2), &[3]);
        assert!(g.neighbors_ref(1).is_empty());
    }

    #[test]
    fn reversed_flips_edges() {
        let g = GraphView::from_edges([("a", "b"), ("b", "c")]);
        let r = g.reversed();
        assert_eq!(r.nodes().ids(), g.nodes().ids());
        assert_eq!(r.edges(), &[(1, 0), (2, 1)]);
        assert_eq!(r.neighbors_ref(2), &[1]);
    }

    #[test]
    fn from_graph_rejects_out_of_range_neighbors() {
        struct Bad;
        impl Graph for Bad {
            fn node_count(&self) -> usize {
                2
            }
            fn neighbors(&self, _node: usize) -> Vec<usize> {
                vec![5]
            }
        }
        assert!(matches!(
            GraphView::from_graph(&Bad),
            Err(Error::IndexOutOfBounds(5))
        ));
    }
}
