// src/program/mod.rs

//! Program graph model.
//!
//! - [`node`] defines the closed node sum type (Command/UseComp/Bundle)
//!   and the arena [`Program`] that owns the graph.
//! - [`request`] defines capability selectors and the Request algebra
//!   (superset test, meet).

pub mod node;
pub mod request;

pub use node::{Bundle, Command, Node, NodeId, Payload, Program, UseComp};
pub use request::{capabilities, Request, Selector, SELECTOR_CAPABILITY};
