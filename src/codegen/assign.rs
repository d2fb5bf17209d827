// src/codegen/assign.rs

//! Device Assignment: match every node of the Commands DAG to one
//! capable device.
//!
//! For each node the effective request is its own request (Command) or
//! the meet of its Command children's requests (Bundle). Candidates come
//! from the [`Target`]; human-capable devices are stably sorted after
//! automation so manual work is only chosen when nothing else qualifies.
//! Assignment is first-fit over a global device palette; no anti-affinity
//! between nodes is modeled.

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, trace};

use crate::errors::{CodegenError, Result};
use crate::program::{Node, NodeId, Program, Request};
use crate::target::{is_human, Device, DeviceId, Target};

/// Node -> device mapping produced by [`assign_devices`].
pub(crate) struct Assignment {
    /// Global device palette, in first-candidate-seen order.
    palette: Vec<Arc<dyn Device>>,
    color_of: HashMap<NodeId, usize>,
}

impl Assignment {
    pub(crate) fn device_of(&self, node: NodeId) -> &Arc<dyn Device> {
        &self.palette[self.color_of[&node]]
    }
}

/// Assign a device to every node of the Commands DAG.
pub(crate) fn assign_devices(
    dag: &DiGraph<NodeId, ()>,
    program: &Program,
    target: &dyn Target,
) -> Result<Assignment> {
    let mut palette: Vec<Arc<dyn Device>> = Vec::new();
    let mut color_index: HashMap<DeviceId, usize> = HashMap::new();
    let mut color_of: HashMap<NodeId, usize> = HashMap::new();

    for idx in dag.node_indices() {
        let node_id = dag[idx];
        let request = effective_request(dag, program, idx);

        let mut candidates = target.can_compile(&request);
        if candidates.is_empty() {
            return Err(CodegenError::NoDevice(request));
        }

        // Prefer automation: human-capable devices sort after the rest.
        // The sort is stable, so registration order breaks ties.
        candidates.sort_by_key(|d| is_human(d.as_ref()));

        for candidate in &candidates {
            let id = candidate.id();
            if !color_index.contains_key(&id) {
                color_index.insert(id, palette.len());
                palette.push(Arc::clone(candidate));
            }
        }

        // First-fit: take the first color in this node's own candidate
        // list.
        let chosen = color_index[&candidates[0].id()];
        trace!(
            node = %node_id,
            device = %palette[chosen].id(),
            candidates = candidates.len(),
            "assigned device"
        );
        color_of.insert(node_id, chosen);
    }

    debug!(
        nodes = color_of.len(),
        devices = palette.len(),
        "device assignment complete"
    );

    Ok(Assignment { palette, color_of })
}

/// The request a device must satisfy to handle `idx`.
fn effective_request(
    dag: &DiGraph<NodeId, ()>,
    program: &Program,
    idx: NodeIndex,
) -> Request {
    match program.node(dag[idx]) {
        Node::Command(c) => c.request.clone(),
        // A bundle requires whatever its command children require,
        // merged. UseComp nodes never reach the Commands DAG.
        _ => {
            let child_requests: Vec<&Request> = dag
                .neighbors(idx)
                .filter_map(|child| program.node(dag[child]).as_command())
                .map(|c| &c.request)
                .collect();
            Request::meet(child_requests)
        }
    }
}
