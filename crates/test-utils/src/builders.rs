#![allow(dead_code)]

use labdag::program::{
    Bundle, Command, Node, NodeId, Payload, Program, Request, UseComp,
};

/// Builder for [`Program`] graphs to simplify test setup.
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            program: Program::new(),
        }
    }

    pub fn command(
        &mut self,
        request: Request,
        from: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        self.program.add(Node::Command(Command {
            request,
            payload: None,
            from: from.into_iter().collect(),
            output: None,
        }))
    }

    pub fn command_with_payload(
        &mut self,
        request: Request,
        payload: Payload,
        from: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        self.program.add(Node::Command(Command {
            request,
            payload: Some(payload),
            from: from.into_iter().collect(),
            output: None,
        }))
    }

    pub fn use_comp(
        &mut self,
        comp: &str,
        from: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        self.program.add(Node::UseComp(UseComp {
            comp: comp.to_string(),
            from: from.into_iter().collect(),
        }))
    }

    pub fn bundle(&mut self, from: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.program.add(Node::Bundle(Bundle {
            from: from.into_iter().collect(),
        }))
    }

    /// Add a dependency edge after the fact. Lets tests build graphs the
    /// builder API cannot express forward-only, including cycles.
    pub fn add_dependency(&mut self, node: NodeId, on: NodeId) {
        match self.program.node_mut(node) {
            Node::Command(c) => c.from.push(on),
            Node::UseComp(u) => u.from.push(on),
            Node::Bundle(b) => b.from.push(on),
        }
    }

    pub fn build(self) -> Program {
        self.program
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
