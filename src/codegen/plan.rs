// src/codegen/plan.rs

//! Device Compilation: compile every run in run-dependency order, and
//! validate that order stays acyclic.
//!
//! The Commands DAG is collapsed to its run quotient; a topological sort
//! of the quotient fixes the order in which each run's device is asked to
//! compile its commands. Each run's instruction list is recorded and
//! attached once to every member command for downstream association.
//!
//! A device finding its run infeasible simply fails the whole
//! compilation; splitting the run and rebalancing mix outputs across the
//! pieces is deliberately not attempted here.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use crate::codegen::coalesce::RunPartition;
use crate::errors::{CodegenError, Result};
use crate::graph::{quotient, toposort_or_cycle};
use crate::program::{Command, NodeId, Program};
use crate::target::{CompileContext, Inst};

/// Identity of one run-quotient node: a device run, or a single node
/// outside any run (the synthetic root bundle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RunKey {
    Run(usize),
    Solo(NodeId),
}

/// Output of [`compile_runs`].
pub(crate) struct Plan {
    /// Run-dependency quotient of the Commands DAG; an edge `a -> b`
    /// means run `a` depends on run `b`.
    pub quotient: DiGraph<RunKey, ()>,
    /// Quotient nodes in compile order (dependencies first).
    pub order: Vec<NodeIndex>,
    /// Compiled instructions per run index.
    pub insts: HashMap<usize, Vec<Inst>>,
}

/// Build the run quotient and compile every run on its device.
pub(crate) fn compile_runs(
    ctx: &CompileContext,
    program: &mut Program,
    dag: &DiGraph<NodeId, ()>,
    partition: &RunPartition,
) -> Result<Plan> {
    let (quotient, order) = run_order(dag, partition)?;

    let mut insts: HashMap<usize, Vec<Inst>> = HashMap::new();
    for &qidx in &order {
        let RunKey::Run(run_index) = quotient[qidx] else {
            continue;
        };
        let run = &partition.runs[run_index];

        let compiled = {
            let commands: Vec<&Command> = run
                .commands
                .iter()
                .map(|&id| {
                    program
                        .node(id)
                        .as_command()
                        .expect("runs contain only commands")
                })
                .collect();
            info!(
                device = %run.device.id(),
                commands = commands.len(),
                "compiling device run"
            );
            run.device
                .compile(ctx, &commands)
                .map_err(|source| CodegenError::Device {
                    device: run.device.id(),
                    source,
                })?
        };

        // Associate the run's instructions with every member command.
        // Single writer: each command belongs to exactly one run.
        for &id in &run.commands {
            let command = program
                .node_mut(id)
                .as_command_mut()
                .expect("runs contain only commands");
            command.output = Some(compiled.clone());
        }

        insts.insert(run_index, compiled);
    }

    Ok(Plan {
        quotient,
        order,
        insts,
    })
}

/// Re-derive the run quotient and check it is still a valid DAG.
///
/// Called again after implicit instruction insertion, before assembly;
/// any cycle here means the assignment produced an unschedulable
/// partition.
pub(crate) fn validate_run_order(
    dag: &DiGraph<NodeId, ()>,
    partition: &RunPartition,
) -> Result<()> {
    run_order(dag, partition).map(|_| ())
}

fn run_order(
    dag: &DiGraph<NodeId, ()>,
    partition: &RunPartition,
) -> Result<(DiGraph<RunKey, ()>, Vec<NodeIndex>)> {
    let q = quotient(dag, |_, &id| match partition.run_of.get(&id) {
        Some(&run) => RunKey::Run(run),
        None => RunKey::Solo(id),
    });

    // Toposort lists dependents first; compilation wants dependencies
    // first.
    let mut order = toposort_or_cycle(&q.graph).map_err(|_| {
        CodegenError::InvalidAssignment(
            "device run dependencies form a cycle".to_string(),
        )
    })?;
    order.reverse();

    debug!(runs = partition.runs.len(), quotient_nodes = q.graph.node_count(), "run order validated");
    Ok((q.graph, order))
}
