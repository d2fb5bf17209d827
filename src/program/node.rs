// src/program/node.rs

//! Program graph nodes and their arena storage.
//!
//! The program graph is a closed sum type: [`Command`] (one unit of device
//! work), [`UseComp`] (consumption of one external resource value) and
//! [`Bundle`] (a synthetic join of independent roots). Every variant holds
//! its predecessor list; edges always point from a node to the nodes it
//! depends on.
//!
//! Nodes live in a [`Program`] arena and are addressed by stable
//! [`NodeId`] indices, so the pipeline owns all graph memory for one
//! `compile` call and nothing escapes except the final instruction
//! sequence.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::program::Request;
use crate::target::Inst;

/// Stable index of a node inside a [`Program`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Opaque instruction payload carried by a [`Command`].
///
/// Only the concrete device chosen for the command understands the
/// payload; the pipeline never looks inside it.
#[derive(Clone)]
pub struct Payload(Arc<dyn Any + Send + Sync>);

impl Payload {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(..)")
    }
}

/// One unit of device work.
#[derive(Debug, Clone)]
pub struct Command {
    /// Capability selectors a device must satisfy to compile this command.
    pub request: Request,
    /// Opaque payload interpreted by the chosen device.
    pub payload: Option<Payload>,
    /// Predecessor nodes this command depends on.
    pub from: Vec<NodeId>,
    /// Instructions produced for this command once its run is compiled.
    ///
    /// `None` until device compilation; written exactly once.
    pub output: Option<Vec<Inst>>,
}

/// Consumption of one external resource value.
#[derive(Debug, Clone)]
pub struct UseComp {
    /// Reference to the consumed resource (plate well, component, ...).
    pub comp: String,
    pub from: Vec<NodeId>,
}

/// Synthetic aggregation with no semantics of its own; joins independent
/// roots or sub-requests.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub from: Vec<NodeId>,
}

/// A node of the program graph.
#[derive(Debug, Clone)]
pub enum Node {
    Command(Command),
    UseComp(UseComp),
    Bundle(Bundle),
}

impl Node {
    /// Predecessors of this node, whatever its variant.
    pub fn from(&self) -> &[NodeId] {
        match self {
            Node::Command(c) => &c.from,
            Node::UseComp(u) => &u.from,
            Node::Bundle(b) => &b.from,
        }
    }

    /// Human-readable variant name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Command(_) => "Command",
            Node::UseComp(_) => "UseComp",
            Node::Bundle(_) => "Bundle",
        }
    }

    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Node::Command(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_command_mut(&mut self) -> Option<&mut Command> {
        match self {
            Node::Command(c) => Some(c),
            _ => None,
        }
    }
}

/// Arena holding every node of one program graph.
#[derive(Debug, Clone, Default)]
pub struct Program {
    nodes: Vec<Node>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }
}
