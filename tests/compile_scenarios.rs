use std::sync::Arc;

use labdag::program::{capabilities, Request, SELECTOR_CAPABILITY};
use labdag::target::{CompileContext, InstKind};
use labdag::{compile, CodegenError};
use labdag_test_utils::builders::ProgramBuilder;
use labdag_test_utils::fake_devices::{EmitStyle, FakeDevice, FakeTarget, SeqIdGen};
use labdag_test_utils::init_tracing;

fn kinds(insts: &[labdag::Inst]) -> Vec<&'static str> {
    insts.iter().map(|i| i.kind.name()).collect()
}

#[test]
fn empty_roots_compile_to_nothing() {
    init_tracing();

    let mut program = ProgramBuilder::new().build();
    let target = FakeTarget::new();
    let mut ids = SeqIdGen::new();

    let insts = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[],
    )
    .unwrap();
    assert!(insts.is_empty());
}

#[test]
fn single_command_single_instruction() {
    // One command requesting a mixer; the device returns a non-Mix
    // instruction, so no setup instructions are synthesized.
    init_tracing();

    let mut b = ProgramBuilder::new();
    let cmd = b.command(Request::capability(capabilities::MIXER), []);
    let mut program = b.build();

    let target = FakeTarget::new().register(Arc::new(
        FakeDevice::new("mixbot").with_capability(capabilities::MIXER),
    ));
    let mut ids = SeqIdGen::new();

    let insts = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[cmd],
    )
    .unwrap();

    assert_eq!(kinds(&insts), vec!["Manual"]);
    assert!(insts[0].depends_on.is_empty());
    assert!(insts[0].id.is_some());
}

#[test]
fn mix_chains_compile_across_devices() {
    // Four independent chains: Mix command -> UseComp -> Incubate
    // command, with a mixer-capable human and an incubator-only device
    // registered.
    init_tracing();

    let mut b = ProgramBuilder::new();
    let mut roots = Vec::new();
    for i in 0..4 {
        let mix = b.command(Request::capability(capabilities::MIXER), []);
        let used = b.use_comp(&format!("culture-{i}"), [mix]);
        let incubate = b.command(Request::capability(capabilities::INCUBATOR), [used]);
        roots.push(incubate);
    }
    let mut program = b.build();

    let target = FakeTarget::new()
        .register(Arc::new(
            FakeDevice::new("operator")
                .human()
                .with_capability(capabilities::MIXER),
        ))
        .register(Arc::new(
            FakeDevice::new("incubot")
                .with_capability(capabilities::INCUBATOR)
                .emit(EmitStyle::IncubatePerCommand),
        ));
    let mut ids = SeqIdGen::new();

    let insts = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &roots,
    )
    .unwrap();

    assert!(!insts.is_empty());
    let last = insts.last().unwrap();
    assert_eq!(
        last.depends_on.len(),
        1,
        "last instruction should continue exactly one chain: {:?}",
        kinds(&insts)
    );
}

#[test]
fn unsatisfiable_request_fails() {
    init_tracing();

    let mut b = ProgramBuilder::new();
    let cmd = b.command(Request::capability(capabilities::PLATE_READER), []);
    let mut program = b.build();

    let target = FakeTarget::new().register(Arc::new(
        FakeDevice::new("mixbot").with_capability(capabilities::MIXER),
    ));
    let mut ids = SeqIdGen::new();

    let err = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[cmd],
    )
    .err()
    .unwrap();
    assert!(
        err.to_string().contains("no device can handle constraints"),
        "{err}"
    );
}

#[test]
fn two_mixes_hit_the_single_setup_policy() {
    // Two independent mix commands coalesce into one run; the mixer
    // emits one Mix instruction per command, so two SetupMixer
    // instructions get synthesized.
    init_tracing();

    let mut b = ProgramBuilder::new();
    let m1 = b.command(Request::capability(capabilities::MIXER), []);
    let m2 = b.command(Request::capability(capabilities::MIXER), []);
    let mut program = b.build();

    let target = FakeTarget::new().register(Arc::new(
        FakeDevice::new("mixbot")
            .with_capability(capabilities::MIXER)
            .emit(EmitStyle::MixPerCommand),
    ));
    let mut ids = SeqIdGen::new();

    let err = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[m1, m2],
    )
    .err()
    .unwrap();
    assert!(matches!(err, CodegenError::MultipleSetup), "{err}");
    assert_eq!(
        err.to_string(),
        "multiple incubates or multiple mixes not supported"
    );
}

#[test]
fn two_incubators_in_use_hit_the_single_setup_policy() {
    // A mix feeding incubations in two different bays: each bay is a
    // distinct automated incubator-capable device, so two SetupIncubator
    // instructions get synthesized.
    init_tracing();

    let mut b = ProgramBuilder::new();
    let mix = b.command(Request::capability(capabilities::MIXER), []);
    let used = b.use_comp("culture", [mix]);
    let warm = b.command(
        Request::capability(capabilities::INCUBATOR).with(SELECTOR_CAPABILITY, "bay-a"),
        [used],
    );
    let cold = b.command(
        Request::capability(capabilities::INCUBATOR).with(SELECTOR_CAPABILITY, "bay-b"),
        [warm],
    );
    let mut program = b.build();

    let target = FakeTarget::new()
        .register(Arc::new(
            FakeDevice::new("mixbot")
                .with_capability(capabilities::MIXER)
                .emit(EmitStyle::MixPerCommand),
        ))
        .register(Arc::new(
            FakeDevice::new("incubot-a")
                .with_capability(capabilities::INCUBATOR)
                .with_capability("bay-a")
                .emit(EmitStyle::IncubatePerCommand),
        ))
        .register(Arc::new(
            FakeDevice::new("incubot-b")
                .with_capability(capabilities::INCUBATOR)
                .with_capability("bay-b")
                .emit(EmitStyle::IncubatePerCommand),
        ));
    let mut ids = SeqIdGen::new();

    let err = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[cold],
    )
    .err()
    .unwrap();
    assert!(matches!(err, CodegenError::MultipleSetup), "{err}");
}

#[test]
fn dependency_cycle_fails_with_no_instructions() {
    init_tracing();

    let mut b = ProgramBuilder::new();
    let a = b.command(Request::capability(capabilities::MIXER), []);
    let c = b.command(Request::capability(capabilities::MIXER), [a]);
    b.add_dependency(a, c);
    let mut program = b.build();

    let target = FakeTarget::new().register(Arc::new(
        FakeDevice::new("mixbot").with_capability(capabilities::MIXER),
    ));
    let mut ids = SeqIdGen::new();

    let result = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[c],
    );
    let err = result.err().expect("cycle must fail compilation");
    assert!(err.to_string().contains("cycle"), "{err}");
}

#[test]
fn single_mix_synthesizes_the_setup_prelude() {
    init_tracing();

    let mut b = ProgramBuilder::new();
    let mix = b.command(Request::capability(capabilities::MIXER), []);
    let mut program = b.build();

    let target = FakeTarget::new().register(Arc::new(
        FakeDevice::new("mixbot")
            .with_capability(capabilities::MIXER)
            .emit(EmitStyle::MixPerCommand),
    ));
    let mut ids = SeqIdGen::new();

    let insts = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[mix],
    )
    .unwrap();

    assert_eq!(
        kinds(&insts),
        vec!["Order", "PlatePrep", "SetupMixer", "Mix"]
    );

    // Initializers chain sequentially and the real work hangs off the
    // last one.
    let order_id = insts[0].id.unwrap();
    let prep_id = insts[1].id.unwrap();
    let setup_id = insts[2].id.unwrap();
    assert_eq!(insts[1].depends_on, vec![order_id]);
    assert_eq!(insts[2].depends_on, vec![prep_id]);
    assert_eq!(insts[3].depends_on, vec![setup_id]);
}

#[test]
fn incubator_in_use_gets_a_setup_instruction() {
    // A mix plus an automated incubation: the incubator-capable non-human
    // device must be set up during the initializer phase.
    init_tracing();

    let mut b = ProgramBuilder::new();
    let mix = b.command(Request::capability(capabilities::MIXER), []);
    let used = b.use_comp("culture", [mix]);
    let incubate = b.command(Request::capability(capabilities::INCUBATOR), [used]);
    let mut program = b.build();

    let target = FakeTarget::new()
        .register(Arc::new(
            FakeDevice::new("mixbot")
                .with_capability(capabilities::MIXER)
                .emit(EmitStyle::MixPerCommand),
        ))
        .register(Arc::new(
            FakeDevice::new("incubot")
                .with_capability(capabilities::INCUBATOR)
                .emit(EmitStyle::IncubatePerCommand),
        ));
    let mut ids = SeqIdGen::new();

    let insts = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[incubate],
    )
    .unwrap();

    let names = kinds(&insts);
    assert_eq!(
        names.iter().filter(|n| **n == "SetupIncubator").count(),
        1,
        "{names:?}"
    );
    assert_eq!(names.iter().filter(|n| **n == "SetupMixer").count(), 1);
    assert_eq!(names.last(), Some(&"Incubate"));
}

#[test]
fn commands_in_one_run_share_their_output() {
    init_tracing();

    let mixer = Request::capability(capabilities::MIXER);
    let mut b = ProgramBuilder::new();
    let a = b.command(mixer.clone(), []);
    let c = b.command(mixer.clone(), [a]);
    let mut program = b.build();

    let target = FakeTarget::new().register(Arc::new(
        FakeDevice::new("mixbot").with_capability(capabilities::MIXER),
    ));
    let mut ids = SeqIdGen::new();

    compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[c],
    )
    .unwrap();

    let out_a = program.node(a).as_command().unwrap().output.clone().unwrap();
    let out_c = program.node(c).as_command().unwrap().output.clone().unwrap();
    assert_eq!(out_a.len(), out_c.len());
    assert_eq!(out_a.len(), 1, "one coalesced run, one manual instruction");
}

#[test]
fn device_initializers_and_finalizers_bracket_the_stream() {
    init_tracing();

    let power_on = labdag::Inst::new(
        labdag::DeviceId::new("mixbot"),
        InstKind::Prompt {
            message: "power on the mixer".to_string(),
        },
    );
    let power_off = labdag::Inst::new(
        labdag::DeviceId::new("mixbot"),
        InstKind::Prompt {
            message: "power off the mixer".to_string(),
        },
    );

    let mut b = ProgramBuilder::new();
    let cmd = b.command(Request::capability(capabilities::MIXER), []);
    let mut program = b.build();

    let target = FakeTarget::new().register(Arc::new(
        FakeDevice::new("mixbot")
            .with_capability(capabilities::MIXER)
            .with_initializer(power_on)
            .with_finalizer(power_off),
    ));
    let mut ids = SeqIdGen::new();

    let insts = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[cmd],
    )
    .unwrap();

    assert_eq!(kinds(&insts), vec!["Prompt", "Manual", "Prompt"]);
    let manual_id = insts[1].id.unwrap();
    assert_eq!(insts[1].depends_on, vec![insts[0].id.unwrap()]);
    assert_eq!(insts[2].depends_on, vec![manual_id]);
}

#[test]
fn multiple_finalizers_execute_in_reverse_declared_order() {
    // Finalizers declared [wash, power off] run in reverse: power off
    // first, then wash.
    init_tracing();

    let prompt = |message: &str| {
        labdag::Inst::new(
            labdag::DeviceId::new("mixbot"),
            InstKind::Prompt {
                message: message.to_string(),
            },
        )
    };

    let mut b = ProgramBuilder::new();
    let cmd = b.command(Request::capability(capabilities::MIXER), []);
    let mut program = b.build();

    let target = FakeTarget::new().register(Arc::new(
        FakeDevice::new("mixbot")
            .with_capability(capabilities::MIXER)
            .with_finalizer(prompt("wash the deck"))
            .with_finalizer(prompt("power off the mixer")),
    ));
    let mut ids = SeqIdGen::new();

    let insts = compile(
        &CompileContext::default(),
        &target,
        &mut ids,
        &mut program,
        &[cmd],
    )
    .unwrap();

    assert_eq!(kinds(&insts), vec!["Manual", "Prompt", "Prompt"]);
    let message = |inst: &labdag::Inst| match &inst.kind {
        InstKind::Prompt { message } => message.clone(),
        other => panic!("expected a prompt, got {}", other.name()),
    };
    assert_eq!(message(&insts[1]), "power off the mixer");
    assert_eq!(message(&insts[2]), "wash the deck");

    // The chain head (last declared) waits for the work; the earlier
    // declaration waits for the head.
    assert_eq!(insts[1].depends_on, vec![insts[0].id.unwrap()]);
    assert_eq!(insts[2].depends_on, vec![insts[1].id.unwrap()]);
}
