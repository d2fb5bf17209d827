// src/lib.rs

//! labdag compiles an abstract graph of laboratory operations (liquid
//! transfers, incubations, prompts, plate reads) into a concrete,
//! dependency-ordered instruction stream executable by a heterogeneous
//! set of devices: liquid handlers, incubators, plate readers and human
//! operators.
//!
//! The caller builds a [`program::Program`] of Command/UseComp/Bundle
//! nodes, registers devices in a [`target::Target`], and calls
//! [`compile`]. The pipeline normalizes the graph, assigns a capable
//! device to every command, coalesces adjacent same-device commands into
//! runs, delegates each run to its device, synthesizes the implicit
//! setup/teardown instructions, and assembles the final instruction DAG.
//!
//! Workflow parsing, inventories, persistence and the physical
//! per-device planners all live outside this crate; they meet it at the
//! traits in [`target`].

pub mod codegen;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod program;
pub mod target;

pub use codegen::compile;
pub use errors::{CodegenError, Result};
pub use program::{
    capabilities, Bundle, Command, Node, NodeId, Payload, Program, Request,
    Selector, UseComp,
};
pub use target::{
    CompileContext, Device, DeviceId, IdGenerator, Inst, InstId, InstKind,
    MixTask, Target,
};
