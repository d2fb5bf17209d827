// src/target/inst.rs

//! Concrete instructions and their optional capabilities.
//!
//! Devices compile a run of commands into a list of [`Inst`] values; the
//! assembler wires them into the final dependency-ordered stream.
//! Optional capabilities (initializer, finalizer, time estimate) are
//! explicit fields checked by presence rather than probed dynamically.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::target::DeviceId;

/// Globally unique instruction identifier, assigned by the injected
/// [`IdGenerator`](crate::target::IdGenerator) when the final stream is
/// emitted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct InstId(pub u64);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Summary of one liquid-mixing task, carried by the synthesized
/// Order/PlatePrep/SetupMixer instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixTask {
    pub device: DeviceId,
    pub label: String,
}

/// What an instruction does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstKind {
    /// Execute one mixing task on a liquid handler.
    Mix(MixTask),
    /// Hold plates at temperature.
    Incubate { duration_seconds: u64 },
    /// Ask a human operator to do or confirm something.
    Prompt { message: String },
    /// Read a plate on a reader.
    PlateRead { label: String },
    /// Free-form manual step.
    Manual { details: String },
    /// Synthesized: order the components every mix needs.
    Order { mixes: Vec<MixTask> },
    /// Synthesized: prepare the plates every mix needs.
    PlatePrep { mixes: Vec<MixTask> },
    /// Synthesized: configure the mixer for one mix task.
    SetupMixer { mixes: Vec<MixTask> },
    /// Synthesized: configure an incubator-capable device.
    SetupIncubator,
    /// Synthetic scheduling bracket; never survives into the final
    /// stream.
    Wait,
}

impl InstKind {
    /// Short name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            InstKind::Mix(_) => "Mix",
            InstKind::Incubate { .. } => "Incubate",
            InstKind::Prompt { .. } => "Prompt",
            InstKind::PlateRead { .. } => "PlateRead",
            InstKind::Manual { .. } => "Manual",
            InstKind::Order { .. } => "Order",
            InstKind::PlatePrep { .. } => "PlatePrep",
            InstKind::SetupMixer { .. } => "SetupMixer",
            InstKind::SetupIncubator => "SetupIncubator",
            InstKind::Wait => "Wait",
        }
    }
}

/// One concrete instruction.
///
/// Dependency encoding changes over the instruction's life:
/// - inside a device-returned list, `depends_on` holds *positions within
///   that list* (see [`Device::compile`](crate::target::Device::compile));
/// - in the final stream returned by [`compile`](crate::codegen::compile),
///   `depends_on` holds the [`InstId`]s of earlier instructions and `id`
///   is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inst {
    pub id: Option<InstId>,
    pub device: DeviceId,
    pub kind: InstKind,
    pub depends_on: Vec<InstId>,
    /// Setup instructions to hoist into the global initializer phase.
    pub initializers: Vec<Inst>,
    /// Teardown instructions to hoist into the global finalizer phase.
    pub finalizers: Vec<Inst>,
    /// Optional estimate of how long this instruction takes; carried
    /// through assembly untouched.
    pub time_estimate: Option<Duration>,
}

impl Inst {
    pub fn new(device: DeviceId, kind: InstKind) -> Self {
        Self {
            id: None,
            device,
            kind,
            depends_on: Vec::new(),
            initializers: Vec::new(),
            finalizers: Vec::new(),
            time_estimate: None,
        }
    }

    /// Builder-style local dependency (position within a device-returned
    /// list).
    pub fn after(mut self, position: u64) -> Self {
        self.depends_on.push(InstId(position));
        self
    }

    pub fn with_initializer(mut self, inst: Inst) -> Self {
        self.initializers.push(inst);
        self
    }

    pub fn with_finalizer(mut self, inst: Inst) -> Self {
        self.finalizers.push(inst);
        self
    }

    pub fn with_time_estimate(mut self, estimate: Duration) -> Self {
        self.time_estimate = Some(estimate);
        self
    }

    pub fn is_wait(&self) -> bool {
        matches!(self.kind, InstKind::Wait)
    }
}
