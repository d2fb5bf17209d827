// src/codegen/roots.rs

//! Root Builder: merge the requested roots into one synthetic Bundle
//! root, detecting cycles that make the program unschedulable.

use std::collections::HashSet;

use tracing::debug;

use crate::errors::{CodegenError, Result};
use crate::program::{Bundle, Node, NodeId, Program};

/// Merge `roots` into a single synthetic [`Bundle`] root.
///
/// Builds the transitive predecessor closure of the requested roots,
/// finds the schedulable roots (closure nodes no other closure node
/// depends on), and checks that visiting from those roots covers the
/// whole closure. A shortfall means a dependency cycle with no entry
/// point; the error names the variant of one unreached node.
///
/// Returns `Ok(None)` for an empty input, which short-circuits the whole
/// pipeline to an empty result.
pub(crate) fn build_root(program: &mut Program, roots: &[NodeId]) -> Result<Option<NodeId>> {
    if roots.is_empty() {
        return Ok(None);
    }

    for &id in roots {
        if id.index() >= program.len() {
            return Err(CodegenError::InvalidProgram(format!(
                "requested root {id} is not a node of this program"
            )));
        }
    }

    let closure = predecessor_closure(program, roots);

    // A closure node is a schedulable root if no other closure node
    // lists it as a predecessor.
    let mut depended_on: HashSet<NodeId> = HashSet::new();
    for &id in &closure {
        depended_on.extend(program.node(id).from().iter().copied());
    }
    let schedulable: Vec<NodeId> = closure
        .iter()
        .copied()
        .filter(|id| !depended_on.contains(id))
        .collect();

    // Visit from every schedulable root, short-circuiting branches that
    // were already reached from an earlier root.
    let mut reached: HashSet<NodeId> = HashSet::new();
    for &root in &schedulable {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if reached.insert(id) {
                stack.extend(program.node(id).from().iter().copied());
            }
        }
    }

    if reached.len() != closure.len() {
        let unreached = closure
            .iter()
            .copied()
            .find(|id| !reached.contains(id))
            .expect("shortfall implies an unreached node");
        return Err(CodegenError::Cycle(format!(
            "cycle containing node of type {}",
            program.node(unreached).kind_name()
        )));
    }

    debug!(
        requested = roots.len(),
        schedulable = schedulable.len(),
        closure = closure.len(),
        "root builder: wrapping schedulable roots in a bundle"
    );

    let bundle = program.add(Node::Bundle(Bundle { from: schedulable }));
    Ok(Some(bundle))
}

/// Every node reachable from `roots` through predecessor edges, each
/// node once, in first-visit order.
fn predecessor_closure(program: &Program, roots: &[NodeId]) -> Vec<NodeId> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut order: Vec<NodeId> = Vec::new();
    let mut stack: Vec<NodeId> = roots.to_vec();

    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            order.push(id);
            stack.extend(program.node(id).from().iter().copied());
        }
    }
    order
}
