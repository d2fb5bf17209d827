// src/graph/simplify.rs

//! Node removal preserving transitive dependencies, plus transitive
//! reduction.
//!
//! [`simplify`] is used twice by the pipeline: once to collapse the full
//! effects graph to a Commands-only DAG, and once to strip the synthetic
//! Wait brackets from the instruction graph. In both cases the transitive
//! dependency relation through deleted nodes must survive, and the result
//! is transitively reduced so devices and instructions see only direct
//! edges.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::{CodegenError, Result};
use crate::graph::toposort_or_cycle;

/// Result of [`simplify`]: the reduced graph plus the mapping from kept
/// indices in the input graph to indices in the output graph.
pub struct Simplified<N> {
    pub graph: DiGraph<N, ()>,
    pub index_map: HashMap<NodeIndex, NodeIndex>,
}

/// Copy of `g` without self-loops or duplicate edges, with identical
/// node indices.
fn cleaned<N: Clone, E>(g: &DiGraph<N, E>) -> DiGraph<N, ()> {
    let mut out = DiGraph::new();
    for idx in g.node_indices() {
        out.add_node(g[idx].clone());
    }
    let mut seen = HashSet::new();
    for e in g.edge_indices() {
        let (a, b) = g.edge_endpoints(e).expect("edge endpoints");
        if a != b && seen.insert((a, b)) {
            out.add_edge(a, b, ());
        }
    }
    out
}

/// Set of nodes reachable from each node by following out-edges.
///
/// Self-loops and duplicate edges are irrelevant here: reachability is
/// computed as a plain DFS and a node is only in its own set if it sits
/// on a cycle.
pub fn reachable_sets<N, E>(g: &DiGraph<N, E>) -> Vec<HashSet<NodeIndex>> {
    let mut sets = vec![HashSet::new(); g.node_count()];
    for start in g.node_indices() {
        let mut stack: Vec<NodeIndex> = g.neighbors(start).collect();
        let set = &mut sets[start.index()];
        while let Some(n) = stack.pop() {
            if set.insert(n) {
                stack.extend(g.neighbors(n));
            }
        }
    }
    sets
}

/// Delete every node failing `keep` while preserving the transitive
/// dependency relation through deleted nodes, then transitively reduce.
///
/// Fails with a cycle error if the input graph is not a DAG.
pub fn simplify<N: Clone, E>(
    g: &DiGraph<N, E>,
    keep: impl Fn(NodeIndex, &N) -> bool,
) -> Result<Simplified<N>> {
    // Self-loops and duplicate edges are noise, not cycles; strip them
    // before asking for a topological order.
    let g = &cleaned(g);
    toposort_or_cycle(g)?;

    let reach = reachable_sets(g);

    let mut out = DiGraph::new();
    let mut index_map = HashMap::new();
    for idx in g.node_indices() {
        if keep(idx, &g[idx]) {
            index_map.insert(idx, out.add_node(g[idx].clone()));
        }
    }

    // Induce the transitive closure on the kept nodes, then reduce: an
    // edge u -> v survives only if no other kept successor of u still
    // reaches v.
    let kept: Vec<NodeIndex> = index_map.keys().copied().collect();
    for &u in &kept {
        let succs: Vec<NodeIndex> = kept
            .iter()
            .copied()
            .filter(|&v| v != u && reach[u.index()].contains(&v))
            .collect();
        for &v in &succs {
            let redundant = succs
                .iter()
                .any(|&w| w != v && reach[w.index()].contains(&v));
            if !redundant {
                out.add_edge(index_map[&u], index_map[&v], ());
            }
        }
    }

    Ok(Simplified {
        graph: out,
        index_map,
    })
}

/// Variant of [`simplify`] that maps a toposort failure to a cycle error
/// naming the offending node via `describe`.
pub fn simplify_described<N: Clone, E>(
    g: &DiGraph<N, E>,
    keep: impl Fn(NodeIndex, &N) -> bool,
    describe: impl Fn(&N) -> String,
) -> Result<Simplified<N>> {
    simplify(g, keep).map_err(|err| match err {
        CodegenError::Cycle(_) => {
            // Name a node that sits on a cycle: any node reaching itself.
            let g = &cleaned(g);
            let reach = reachable_sets(g);
            let on_cycle = g
                .node_indices()
                .find(|idx| reach[idx.index()].contains(idx));
            match on_cycle {
                Some(idx) => CodegenError::Cycle(describe(&g[idx])),
                None => CodegenError::Cycle("unlocatable cycle".to_string()),
            }
        }
        other => other,
    })
}
