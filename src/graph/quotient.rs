// src/graph/quotient.rs

//! Quotient graphs: merge nodes into classes while preserving
//! inter-class edges.
//!
//! The pipeline uses this to collapse the Commands DAG into the
//! device-run dependency graph: every node is mapped to its run and the
//! runs inherit the dependency edges between their members.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use petgraph::graph::{DiGraph, NodeIndex};

/// A quotient of a graph under the node classification `class`.
pub struct Quotient<K> {
    pub graph: DiGraph<K, ()>,
    /// Class key -> quotient node.
    pub node_of: HashMap<K, NodeIndex>,
}

/// Build the quotient of `g` under `class`.
///
/// Quotient nodes are created in first-occurrence order of their class
/// (iterating `g`'s node indices), which keeps downstream traversal
/// deterministic. Intra-class and duplicate edges are dropped.
pub fn quotient<N, E, K>(
    g: &DiGraph<N, E>,
    class: impl Fn(NodeIndex, &N) -> K,
) -> Quotient<K>
where
    K: Eq + Hash + Clone,
{
    let mut graph = DiGraph::new();
    let mut node_of: HashMap<K, NodeIndex> = HashMap::new();
    let mut class_of: Vec<NodeIndex> = Vec::with_capacity(g.node_count());

    for idx in g.node_indices() {
        let key = class(idx, &g[idx]);
        let qidx = *node_of
            .entry(key.clone())
            .or_insert_with(|| graph.add_node(key));
        class_of.push(qidx);
    }

    let mut seen: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    for e in g.edge_indices() {
        let (a, b) = g.edge_endpoints(e).expect("edge endpoints");
        let (qa, qb) = (class_of[a.index()], class_of[b.index()]);
        if qa != qb && seen.insert((qa, qb)) {
            graph.add_edge(qa, qb, ());
        }
    }

    Quotient { graph, node_of }
}
