// src/codegen/coalesce.rs

//! Run Coalescer: merge adjacent same-device commands into contiguous
//! device runs.
//!
//! The Commands DAG is traversed frontier by frontier with dependents
//! visited before their dependencies. A command extends an existing run
//! backward when every one of its immediate dependents already sits in
//! that one run and the run's device matches; otherwise it joins a
//! frontier-local run shared with independent same-device siblings, so
//! parallel work on one device coalesces instead of fragmenting.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::{debug, trace, warn};

use crate::codegen::assign::Assignment;
use crate::program::{Node, NodeId, Program};
use crate::target::{Device, DeviceId};

/// One contiguous run of commands on a single device, in execution
/// order (dependencies first).
pub(crate) struct Run {
    pub device: Arc<dyn Device>,
    pub commands: VecDeque<NodeId>,
}

/// Output of [`coalesce_runs`]: the runs plus the command -> run map.
pub(crate) struct RunPartition {
    pub runs: Vec<Run>,
    pub run_of: HashMap<NodeId, usize>,
}

/// Partition the Commands DAG into device runs.
pub(crate) fn coalesce_runs(
    dag: &DiGraph<NodeId, ()>,
    program: &Program,
    assignment: &Assignment,
) -> RunPartition {
    let mut runs: Vec<Run> = Vec::new();
    let mut run_of: HashMap<NodeId, usize> = HashMap::new();

    for frontier in frontiers(dag) {
        // Runs created for siblings within this frontier, by device.
        let mut local: HashMap<DeviceId, usize> = HashMap::new();

        for idx in frontier {
            let node_id = dag[idx];
            if !matches!(program.node(node_id), Node::Command(_)) {
                continue;
            }
            let device = assignment.device_of(node_id);

            // Runs of this command's immediate dependents. A dependent
            // without a run (the synthetic root bundle) blocks backward
            // extension.
            let mut dependent_runs: Vec<Option<usize>> = dag
                .neighbors_directed(idx, Direction::Incoming)
                .map(|d| run_of.get(&dag[d]).copied())
                .collect();
            dependent_runs.sort();
            dependent_runs.dedup();

            let run = match dependent_runs.as_slice() {
                [Some(r)] if runs[*r].device.id() == device.id() => *r,
                _ => *local.entry(device.id()).or_insert_with(|| {
                    runs.push(Run {
                        device: Arc::clone(device),
                        commands: VecDeque::new(),
                    });
                    runs.len() - 1
                }),
            };

            trace!(node = %node_id, device = %device.id(), run, "coalesced");
            runs[run].commands.push_front(node_id);
            run_of.insert(node_id, run);
        }
    }

    debug!(
        commands = run_of.len(),
        runs = runs.len(),
        "run coalescing complete"
    );

    RunPartition { runs, run_of }
}

/// Frontier decomposition of the DAG, dependents before dependencies.
///
/// Frontier 0 holds the nodes nothing depends on; each later frontier
/// holds nodes whose dependents all sit in earlier frontiers.
fn frontiers(dag: &DiGraph<NodeId, ()>) -> Vec<Vec<NodeIndex>> {
    let mut remaining: Vec<usize> = dag
        .node_indices()
        .map(|idx| dag.neighbors_directed(idx, Direction::Incoming).count())
        .collect();
    let mut layer: Vec<usize> = vec![0; dag.node_count()];

    let mut queue: VecDeque<NodeIndex> = dag
        .node_indices()
        .filter(|idx| remaining[idx.index()] == 0)
        .collect();

    let mut layers: Vec<Vec<NodeIndex>> = Vec::new();
    let mut processed = 0usize;

    while let Some(idx) = queue.pop_front() {
        processed += 1;
        let l = layer[idx.index()];
        if layers.len() <= l {
            layers.resize_with(l + 1, Vec::new);
        }
        layers[l].push(idx);

        for dep in dag.neighbors(idx) {
            let d = dep.index();
            layer[d] = layer[d].max(l + 1);
            remaining[d] -= 1;
            if remaining[d] == 0 {
                queue.push_back(dep);
            }
        }
    }

    // Callers pass a validated DAG; anything left over means they did
    // not.
    if processed != dag.node_count() {
        warn!(
            processed,
            total = dag.node_count(),
            "frontier traversal did not cover the graph"
        );
    }

    layers
}
