// src/target/mod.rs

//! External collaborator surface: devices, the target they are
//! registered in, and the instruction ID source.
//!
//! The pipeline talks to a [`Device`] trait instead of concrete physical
//! planners. Production code registers real liquid handlers, incubators,
//! plate readers and human operators; tests provide fakes that record
//! what they were asked to compile (see `labdag-test-utils`).

pub mod inst;

pub use inst::{Inst, InstId, InstKind, MixTask};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::program::{capabilities, Command, Request};

/// Stable identifier of one registered device.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ambient information devices may consult while compiling a run.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    /// Hint for where device planners may drop generated artifacts.
    pub out_dir: Option<PathBuf>,
}

/// One physical (or human) device capable of executing instructions.
///
/// `compile` is the only suspension point of the pipeline: it may take
/// arbitrarily long (e.g. contacting a physical-layer planner) and is
/// invoked synchronously per run in run-dependency order. Implementations
/// wanting timeouts or cancellation must provide them internally and
/// return an error.
pub trait Device: Send + Sync {
    fn id(&self) -> DeviceId;

    /// Can this device satisfy every selector in `request`?
    fn can_compile(&self, request: &Request) -> bool;

    /// Compile one contiguous run of commands into an ordered instruction
    /// list.
    ///
    /// Contract: the returned list is single-entry/single-exit:
    /// `insts[0]` is the logical entry and `insts[last]` the logical
    /// exit. `depends_on` entries refer to positions within the returned
    /// list; the pipeline rewrites them to final IDs during assembly.
    fn compile(
        &self,
        ctx: &CompileContext,
        commands: &[&Command],
    ) -> anyhow::Result<Vec<Inst>>;
}

/// Registry of every device available to one compilation.
pub trait Target {
    /// All registered devices whose capabilities satisfy `request`, in
    /// registration order.
    fn can_compile(&self, request: &Request) -> Vec<Arc<dyn Device>>;
}

/// Process-unique instruction ID source.
///
/// Must never hand out the same ID twice within a process; the pipeline
/// calls it strictly sequentially, once per emitted instruction.
pub trait IdGenerator {
    fn next_id(&mut self) -> InstId;
}

/// Whether a device is operated by a human.
pub fn is_human(device: &dyn Device) -> bool {
    device.can_compile(&Request::capability(capabilities::HUMAN))
}

/// Whether a device can run incubation steps.
pub fn is_incubator_capable(device: &dyn Device) -> bool {
    device.can_compile(&Request::capability(capabilities::INCUBATOR))
}
