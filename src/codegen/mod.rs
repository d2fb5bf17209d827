// src/codegen/mod.rs

//! The codegen pipeline: program graph in, dependency-ordered
//! instruction stream out.
//!
//! Stages, in order:
//! 1. [`roots`] merges the requested roots under one synthetic Bundle.
//! 2. The effects graph is collapsed to a Commands-only DAG
//!    ([`crate::graph::simplify`]).
//! 3. [`assign`] matches every node to a capable device (first-fit).
//! 4. [`coalesce`] merges adjacent same-device commands into runs.
//! 5. [`plan`] compiles each run on its device in run-dependency order.
//! 6. [`implicit`] synthesizes global setup/teardown instructions.
//! 7. [`plan::validate_run_order`] re-checks the run DAG.
//! 8. [`assemble`] builds the final instruction DAG and emits it.
//!
//! The pipeline is synchronous and single-threaded; the only suspension
//! point is each device's `compile` call. Every failure is fatal to the
//! whole [`compile`] call; callers retry externally if they want to.

pub(crate) mod assemble;
pub(crate) mod assign;
pub(crate) mod coalesce;
pub(crate) mod implicit;
pub(crate) mod plan;
pub(crate) mod roots;

use std::collections::HashMap;

use petgraph::graph::DiGraph;
use tracing::{debug, info};

use crate::errors::{CodegenError, Result};
use crate::graph::simplify_described;
use crate::program::{NodeId, Program};
use crate::target::{CompileContext, IdGenerator, Inst, InstKind, Target};

/// Compile a program graph into a dependency-ordered instruction stream.
///
/// `roots` are the nodes the caller wants scheduled; their transitive
/// predecessors are pulled in automatically. An empty `roots` yields an
/// empty, error-free result. On success each returned instruction
/// carries a fresh unique ID from `id_gen` and `depends_on` entries
/// referring only to instructions earlier in the stream.
pub fn compile(
    ctx: &CompileContext,
    target: &dyn Target,
    id_gen: &mut dyn IdGenerator,
    program: &mut Program,
    roots: &[NodeId],
) -> Result<Vec<Inst>> {
    let Some(root) = roots::build_root(program, roots)? else {
        info!("no roots requested; nothing to compile");
        return Ok(Vec::new());
    };

    // Collapse the effects graph to a Commands-only DAG: retain commands
    // not yet compiled, plus the synthetic root.
    let effects = effects_graph(program, root);
    let commands = simplify_described(
        &effects,
        |_, &id| {
            id == root
                || program
                    .node(id)
                    .as_command()
                    .is_some_and(|c| c.output.is_none())
        },
        |&id| format!("node of type {}", program.node(id).kind_name()),
    )?;
    debug!(
        effects = effects.node_count(),
        commands = commands.graph.node_count(),
        "commands DAG built"
    );

    let assignment = assign::assign_devices(&commands.graph, program, target)
        .map_err(CodegenError::stage("assigning devices"))?;

    let partition = coalesce::coalesce_runs(&commands.graph, program, &assignment);

    let plan = plan::compile_runs(ctx, program, &commands.graph, &partition)
        .map_err(CodegenError::stage("planning"))?;

    let phases = implicit::insert_implicit(&plan, &partition);

    plan::validate_run_order(&commands.graph, &partition)
        .map_err(CodegenError::stage("planning"))?;

    let insts = assemble::assemble(&plan, &partition, &assignment, &phases, id_gen)
        .map_err(CodegenError::stage("generating instructions"))?;

    enforce_single_setup(&insts)?;

    info!(instructions = insts.len(), "compilation complete");
    Ok(insts)
}

/// Graph over the predecessor closure of `root`; an edge `n -> m` means
/// `n` depends on `m`.
fn effects_graph(program: &Program, root: NodeId) -> DiGraph<NodeId, ()> {
    let mut graph = DiGraph::new();
    let mut index: HashMap<NodeId, petgraph::graph::NodeIndex> = HashMap::new();

    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !index.contains_key(&id) {
            index.insert(id, graph.add_node(id));
            stack.extend(program.node(id).from().iter().copied());
        }
    }

    let ids: Vec<NodeId> = index.keys().copied().collect();
    for id in ids {
        for &pred in program.node(id).from() {
            graph.add_edge(index[&id], index[&pred], ());
        }
    }
    graph
}

/// A compiled program may configure at most one mixer and one incubator.
fn enforce_single_setup(insts: &[Inst]) -> Result<()> {
    let mixers = insts
        .iter()
        .filter(|i| matches!(i.kind, InstKind::SetupMixer { .. }))
        .count();
    let incubators = insts
        .iter()
        .filter(|i| matches!(i.kind, InstKind::SetupIncubator))
        .count();
    if mixers > 1 || incubators > 1 {
        return Err(CodegenError::MultipleSetup);
    }
    Ok(())
}
