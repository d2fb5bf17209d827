// src/codegen/assemble.rs

//! Instruction Graph Assembler: build the final instruction DAG, strip
//! the synthetic scheduling brackets, and emit the dependency-ordered
//! stream.
//!
//! Every run is wrapped in Entry/Exit Wait brackets (registered even for
//! empty runs, such as the synthetic root bundle). Entries hang off the
//! last global initializer, the teardown phase hangs off every Exit, and
//! "tree" edges make each run's Entry wait for the Exit of every run it
//! depends on. The Wait brackets are then simplified away, preserving
//! the transitive dependencies they encoded, and the surviving
//! instructions are topologically sorted, given fresh IDs, and rewired
//! to final-ID dependencies.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::codegen::assign::Assignment;
use crate::codegen::coalesce::RunPartition;
use crate::codegen::implicit::GlobalPhases;
use crate::codegen::plan::{Plan, RunKey};
use crate::errors::Result;
use crate::graph::{simplify, toposort_or_cycle};
use crate::target::{IdGenerator, Inst, InstId, InstKind};

/// Instruction arena plus the dependency graph over it. Graph weights
/// are arena indices; an edge `u -> v` means `u` depends on `v`.
#[derive(Default)]
struct InstGraph {
    arena: Vec<Inst>,
    graph: DiGraph<usize, ()>,
}

impl InstGraph {
    fn add(&mut self, inst: Inst) -> NodeIndex {
        let idx = self.arena.len();
        self.arena.push(inst);
        self.graph.add_node(idx)
    }

    fn depends(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        self.graph.add_edge(dependent, dependency, ());
    }
}

/// Assemble the final instruction stream.
pub(crate) fn assemble(
    plan: &Plan,
    partition: &RunPartition,
    assignment: &Assignment,
    phases: &GlobalPhases,
    id_gen: &mut dyn IdGenerator,
) -> Result<Vec<Inst>> {
    let mut g = InstGraph::default();

    // Entry/Exit Wait brackets per run-quotient node.
    let mut entry_of: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut exit_of: HashMap<NodeIndex, NodeIndex> = HashMap::new();

    for &qidx in &plan.order {
        let device = match plan.quotient[qidx] {
            RunKey::Run(i) => partition.runs[i].device.id(),
            RunKey::Solo(node) => assignment.device_of(node).id(),
        };

        let entry = g.add(Inst::new(device.clone(), InstKind::Wait));
        let mut members: Vec<NodeIndex> = Vec::new();
        if let RunKey::Run(i) = plan.quotient[qidx] {
            let insts = &plan.insts[&i];
            for inst in insts {
                members.push(g.add(inst.clone()));
            }
            // Intra-run edges from the device's local position deps.
            for (pos, inst) in insts.iter().enumerate() {
                for dep in &inst.depends_on {
                    let d = dep.0 as usize;
                    if d < members.len() && d != pos {
                        g.depends(members[pos], members[d]);
                    }
                }
            }
        }
        let exit = g.add(Inst::new(device, InstKind::Wait));

        // Single-entry/single-exit: the first instruction follows the
        // Entry bracket, the Exit bracket follows the last.
        match (members.first(), members.last()) {
            (Some(&first), Some(&last)) => {
                g.depends(first, entry);
                g.depends(exit, last);
            }
            _ => g.depends(exit, entry),
        }

        entry_of.insert(qidx, entry);
        exit_of.insert(qidx, exit);
    }

    // Tree edges: a run's Entry waits for the Exit of every run it
    // depends on.
    for e in plan.quotient.edge_indices() {
        let (a, b) = plan.quotient.edge_endpoints(e).expect("edge endpoints");
        g.depends(entry_of[&a], exit_of[&b]);
    }

    // Global initializers: strict sequential chain; every Entry waits
    // for the last one.
    let inits: Vec<NodeIndex> = phases
        .initializers
        .iter()
        .map(|inst| g.add(inst.clone()))
        .collect();
    for pair in inits.windows(2) {
        g.depends(pair[1], pair[0]);
    }
    if let Some(&last_init) = inits.last() {
        for &entry in entry_of.values() {
            g.depends(entry, last_init);
        }
    }

    // Global finalizers execute in reverse declared order: the chain
    // head (last declared) waits for every Exit.
    let fins: Vec<NodeIndex> = phases
        .finalizers
        .iter()
        .map(|inst| g.add(inst.clone()))
        .collect();
    for pair in fins.windows(2) {
        g.depends(pair[0], pair[1]);
    }
    if let Some(&head) = fins.last() {
        for &exit in exit_of.values() {
            g.depends(head, exit);
        }
    }

    // Strip the Wait brackets, keeping the transitive dependencies they
    // encoded, then order and emit.
    let simplified = simplify(&g.graph, |_, &w| !g.arena[w].is_wait())?;
    let mut order = toposort_or_cycle(&simplified.graph)?;
    order.reverse();

    let mut final_id: HashMap<NodeIndex, InstId> = HashMap::new();
    let mut out: Vec<Inst> = Vec::with_capacity(order.len());
    for idx in order {
        let mut inst = g.arena[simplified.graph[idx]].clone();
        let id = id_gen.next_id();

        let mut depends_on: Vec<InstId> = simplified
            .graph
            .neighbors(idx)
            .map(|dep| final_id[&dep])
            .collect();
        depends_on.sort();

        inst.id = Some(id);
        inst.depends_on = depends_on;
        final_id.insert(idx, id);
        out.push(inst);
    }

    debug!(
        instructions = out.len(),
        initializers = phases.initializers.len(),
        finalizers = phases.finalizers.len(),
        "instruction graph assembled"
    );

    Ok(out)
}
