// src/graph/mod.rs

//! Reusable graph algorithms over petgraph index-addressed storage.
//!
//! - [`simplify`] removes nodes while preserving transitive dependencies
//!   and transitively reduces the result.
//! - [`quotient`] merges nodes into classes (device runs) while keeping
//!   inter-class edges.
//!
//! Everything here treats an edge `u -> v` as "u depends on v"; the
//! pipeline keeps that convention throughout.

pub mod quotient;
pub mod simplify;

pub use quotient::{quotient, Quotient};
pub use simplify::{reachable_sets, simplify, simplify_described, Simplified};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::{CodegenError, Result};

/// Topologically sort `g`, mapping a cycle to a [`CodegenError::Cycle`].
///
/// With the "edge points at dependency" convention the returned order
/// lists dependents before their dependencies; callers that need
/// execution order reverse it.
pub fn toposort_or_cycle<N, E>(g: &DiGraph<N, E>) -> Result<Vec<NodeIndex>> {
    toposort(g, None).map_err(|cycle| {
        CodegenError::Cycle(format!(
            "cycle involving graph node {}",
            cycle.node_id().index()
        ))
    })
}
