#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use labdag::program::{capabilities, Command, Request, SELECTOR_CAPABILITY};
use labdag::target::{
    CompileContext, Device, DeviceId, IdGenerator, Inst, InstId, InstKind,
    MixTask, Target,
};

/// How a [`FakeDevice`] renders the run it is asked to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitStyle {
    /// One Manual instruction summarizing the whole run.
    ManualPerRun,
    /// One Mix instruction per command, chained sequentially.
    MixPerCommand,
    /// One Incubate instruction per command, chained sequentially.
    IncubatePerCommand,
}

/// A fake device that:
/// - advertises a configurable capability set
/// - records the size of every run it compiles
/// - emits instructions per its [`EmitStyle`].
pub struct FakeDevice {
    id: DeviceId,
    advertises: Request,
    emit: EmitStyle,
    initializers: Vec<Inst>,
    finalizers: Vec<Inst>,
    compiled_runs: Mutex<Vec<usize>>,
}

impl FakeDevice {
    pub fn new(id: &str) -> Self {
        Self {
            id: DeviceId::new(id),
            advertises: Request::new(),
            emit: EmitStyle::ManualPerRun,
            initializers: Vec::new(),
            finalizers: Vec::new(),
            compiled_runs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_capability(mut self, cap: &str) -> Self {
        self.advertises = self.advertises.with(SELECTOR_CAPABILITY, cap);
        self
    }

    /// Mark this device as human-operated.
    pub fn human(self) -> Self {
        self.with_capability(capabilities::HUMAN)
    }

    pub fn emit(mut self, style: EmitStyle) -> Self {
        self.emit = style;
        self
    }

    /// Attach an initializer to the first instruction of every compiled
    /// run.
    pub fn with_initializer(mut self, inst: Inst) -> Self {
        self.initializers.push(inst);
        self
    }

    /// Attach a finalizer to the last instruction of every compiled run.
    pub fn with_finalizer(mut self, inst: Inst) -> Self {
        self.finalizers.push(inst);
        self
    }

    /// Sizes of the runs this device compiled, in call order.
    pub fn compiled_runs(&self) -> Vec<usize> {
        self.compiled_runs.lock().unwrap().clone()
    }
}

impl Device for FakeDevice {
    fn id(&self) -> DeviceId {
        self.id.clone()
    }

    fn can_compile(&self, request: &Request) -> bool {
        self.advertises.contains(request)
    }

    fn compile(
        &self,
        _ctx: &CompileContext,
        commands: &[&Command],
    ) -> anyhow::Result<Vec<Inst>> {
        self.compiled_runs.lock().unwrap().push(commands.len());

        let mut insts: Vec<Inst> = match self.emit {
            EmitStyle::ManualPerRun => vec![Inst::new(
                self.id.clone(),
                InstKind::Manual {
                    details: format!("{}: run of {} commands", self.id, commands.len()),
                },
            )],
            EmitStyle::MixPerCommand => (0..commands.len())
                .map(|i| {
                    let mut inst = Inst::new(
                        self.id.clone(),
                        InstKind::Mix(MixTask {
                            device: self.id.clone(),
                            label: format!("{}-mix-{}", self.id, i),
                        }),
                    );
                    if i > 0 {
                        inst = inst.after(i as u64 - 1);
                    }
                    inst
                })
                .collect(),
            EmitStyle::IncubatePerCommand => (0..commands.len())
                .map(|i| {
                    let mut inst = Inst::new(
                        self.id.clone(),
                        InstKind::Incubate {
                            duration_seconds: 600,
                        },
                    );
                    if i > 0 {
                        inst = inst.after(i as u64 - 1);
                    }
                    inst
                })
                .collect(),
        };

        if let Some(first) = insts.first_mut() {
            first.initializers = self.initializers.clone();
        }
        if let Some(last) = insts.last_mut() {
            last.finalizers = self.finalizers.clone();
        }

        Ok(insts)
    }
}

/// In-memory device registry preserving registration order.
#[derive(Default)]
pub struct FakeTarget {
    devices: Vec<Arc<dyn Device>>,
}

impl FakeTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, device: Arc<dyn Device>) -> Self {
        self.devices.push(device);
        self
    }
}

impl Target for FakeTarget {
    fn can_compile(&self, request: &Request) -> Vec<Arc<dyn Device>> {
        self.devices
            .iter()
            .filter(|d| d.can_compile(request))
            .cloned()
            .collect()
    }
}

/// Sequential ID source seeded at zero.
#[derive(Default)]
pub struct SeqIdGen {
    next: u64,
}

impl SeqIdGen {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SeqIdGen {
    fn next_id(&mut self) -> InstId {
        let id = InstId(self.next);
        self.next += 1;
        id
    }
}
