// src/codegen/implicit.rs

//! Implicit Instruction Insertion: synthesize the global setup and
//! teardown instructions no explicit command asked for.
//!
//! If any compiled instruction is a Mix task, the program implicitly
//! needs its components ordered and its plates prepared before anything
//! runs, a SetupIncubator for every automated incubator-capable device in
//! use, and a SetupMixer per mix task. On top of that, devices may attach
//! initializer/finalizer instructions to anything they compile; those are
//! hoisted into the global phases here, in run order.
//!
//! The initializer list executes in strict sequential order; the
//! finalizer list executes in the reverse of its declared order. The
//! assembler materializes both chains as dependency edges.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::codegen::coalesce::RunPartition;
use crate::codegen::plan::{Plan, RunKey};
use crate::target::{is_human, is_incubator_capable, Inst, InstKind, MixTask};

/// Global setup/teardown instructions, in declared order.
pub(crate) struct GlobalPhases {
    pub initializers: Vec<Inst>,
    pub finalizers: Vec<Inst>,
}

/// Collect and synthesize the global initializer and finalizer lists.
pub(crate) fn insert_implicit(plan: &Plan, partition: &RunPartition) -> GlobalPhases {
    let mut initializers: Vec<Inst> = Vec::new();
    let mut finalizers: Vec<Inst> = Vec::new();

    // Every mix task compiled anywhere, with runs visited in compile
    // order and instructions in their internal topological order.
    let mut mixes: Vec<MixTask> = Vec::new();
    for_each_inst(plan, |inst| {
        if let InstKind::Mix(task) = &inst.kind {
            mixes.push(task.clone());
        }
    });

    if !mixes.is_empty() {
        let lead_device = mixes[0].device.clone();
        initializers.push(Inst::new(
            lead_device.clone(),
            InstKind::Order {
                mixes: mixes.clone(),
            },
        ));
        initializers.push(Inst::new(
            lead_device,
            InstKind::PlatePrep {
                mixes: mixes.clone(),
            },
        ));

        // One incubator setup per distinct automated incubator-capable
        // device that compiled anything, in compile order.
        let mut seen = HashSet::new();
        for &qidx in &plan.order {
            let RunKey::Run(run_index) = plan.quotient[qidx] else {
                continue;
            };
            let device = &partition.runs[run_index].device;
            if !seen.insert(device.id()) {
                continue;
            }
            if is_incubator_capable(device.as_ref()) && !is_human(device.as_ref()) {
                initializers.push(Inst::new(device.id(), InstKind::SetupIncubator));
            }
        }

        for mix in &mixes {
            initializers.push(Inst::new(
                mix.device.clone(),
                InstKind::SetupMixer {
                    mixes: vec![mix.clone()],
                },
            ));
        }
    }

    // Hoist device-declared initializers and finalizers, run by run.
    for_each_inst(plan, |inst| {
        initializers.extend(inst.initializers.iter().cloned());
        finalizers.extend(inst.finalizers.iter().cloned());
    });

    debug!(
        initializers = initializers.len(),
        finalizers = finalizers.len(),
        mixes = mixes.len(),
        "implicit instruction insertion complete"
    );

    GlobalPhases {
        initializers,
        finalizers,
    }
}

/// Visit every compiled instruction: runs in compile order, instructions
/// in their internal topological order.
fn for_each_inst(plan: &Plan, mut visit: impl FnMut(&Inst)) {
    for &qidx in &plan.order {
        let RunKey::Run(run_index) = plan.quotient[qidx] else {
            continue;
        };
        let insts = &plan.insts[&run_index];
        for pos in internal_order(insts) {
            visit(&insts[pos]);
        }
    }
}

/// Topological order of one run's instruction list under its local
/// position dependencies, dependencies first.
///
/// Devices contractually return a DAG; a malformed list falls back to
/// its given order.
pub(crate) fn internal_order(insts: &[Inst]) -> Vec<usize> {
    let n = insts.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (pos, inst) in insts.iter().enumerate() {
        for dep in &inst.depends_on {
            let d = dep.0 as usize;
            if d < n && d != pos {
                indegree[pos] += 1;
                dependents[d].push(pos);
            }
        }
    }

    let mut queue: VecDeque<usize> =
        (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &j in &dependents[i] {
            indegree[j] -= 1;
            if indegree[j] == 0 {
                queue.push_back(j);
            }
        }
    }

    if order.len() != n {
        warn!(
            expected = n,
            ordered = order.len(),
            "device returned cyclic instruction dependencies; using list order"
        );
        return (0..n).collect();
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::DeviceId;

    fn inst(kind: InstKind) -> Inst {
        Inst::new(DeviceId::new("dev"), kind)
    }

    #[test]
    fn internal_order_respects_local_deps() {
        // Positions: 0 depends on 1, 1 depends on 2.
        let insts = vec![
            inst(InstKind::Wait).after(1),
            inst(InstKind::Wait).after(2),
            inst(InstKind::Wait),
        ];
        assert_eq!(internal_order(&insts), vec![2, 1, 0]);
    }

    #[test]
    fn internal_order_falls_back_on_cycles() {
        let insts = vec![inst(InstKind::Wait).after(1), inst(InstKind::Wait).after(0)];
        assert_eq!(internal_order(&insts), vec![0, 1]);
    }

    #[test]
    fn internal_order_ignores_out_of_range_deps() {
        let insts = vec![inst(InstKind::Wait).after(7)];
        assert_eq!(internal_order(&insts), vec![0]);
    }
}
