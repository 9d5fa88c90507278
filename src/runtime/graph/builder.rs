//! Programmatic script construction
//!
//! [`ScriptBuilder`] assembles a [`Blocks`] arena without going through a saved project.
//! Hosts use it to generate scripts; tests and benchmarks use it to set up programs.
//!
//! ```rust
//! use blockvm::runtime::graph::ScriptBuilder;
//!
//! let mut builder = ScriptBuilder::new();
//! let say = builder.command("looks_say", &[("MESSAGE", "hi".into())]);
//! let top = builder.script("event_whenflagclicked", &[say]);
//! let blocks = builder.build();
//! assert_eq!(blocks.scripts(), vec![top]);
//! ```

use super::{branch_input_name, Block, BlockId, Blocks, Field, Input, Mutation, Opcode, CUSTOM_BLOCK_INPUT};
use crate::runtime::value::Value;

/// Builds a program graph block by block.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    blocks: Blocks,
    next_key: usize,
}

impl ScriptBuilder {
    /// Create an empty builder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue building on an existing graph.
    pub fn from_blocks(blocks: Blocks) -> Self {
        let next_key = blocks.len();
        Self { blocks, next_key }
    }

    /// Finish and hand back the graph.
    pub fn build(self) -> Blocks {
        self.blocks
    }

    pub fn blocks(&self) -> &Blocks {
        &self.blocks
    }

    fn fresh_key(&mut self) -> String {
        loop {
            let key = format!("block{}", self.next_key);
            self.next_key += 1;
            if self.blocks.id_of(&key).is_none() {
                return key;
            }
        }
    }

    /// Add a detached block.
    pub fn block(
        &mut self,
        opcode: impl Into<Opcode>,
    ) -> BlockId {
        let key = self.fresh_key();
        self.blocks.create_block(Block::new(key.as_str(), opcode))
    }

    /// Add a block whose inputs are all literals.
    pub fn command(
        &mut self,
        opcode: impl Into<Opcode>,
        inputs: &[(&str, Value)],
    ) -> BlockId {
        let id = self.block(opcode);
        for (name, value) in inputs {
            self.literal(id, name, value.clone());
        }
        id
    }

    /// Put a literal in an input slot.
    pub fn literal(
        &mut self,
        id: BlockId,
        name: &str,
        value: impl Into<Value>,
    ) {
        if let Some(block) = self.blocks.get_mut(id) {
            block.inputs.insert(name.to_string(), Input::Literal(value.into()));
        }
    }

    /// Set a field; `field_id` is the variable or list id for data blocks.
    pub fn field(
        &mut self,
        id: BlockId,
        name: &str,
        value: &str,
        field_id: Option<&str>,
    ) {
        if let Some(block) = self.blocks.get_mut(id) {
            let field = match field_id {
                Some(field_id) => Field::with_id(value, field_id),
                None => Field::new(value),
            };
            block.fields.insert(name.to_string(), field);
        }
    }

    /// Plug a reporter block into an input slot.
    pub fn reporter(
        &mut self,
        parent: BlockId,
        name: &str,
        reporter: BlockId,
    ) {
        self.plug(parent, name, Input::Reporter(reporter), reporter);
    }

    /// Plug the first block of a stack into a branch slot (`SUBSTACK`, `SUBSTACK2`, ...).
    pub fn branch(
        &mut self,
        parent: BlockId,
        branch: usize,
        body: &[BlockId],
    ) {
        let Some(first) = self.chain(body) else {
            return;
        };
        let name = branch_input_name(branch);
        self.plug(parent, &name, Input::Branch(first), first);
    }

    fn plug(
        &mut self,
        parent: BlockId,
        name: &str,
        input: Input,
        child: BlockId,
    ) {
        if let Some(block) = self.blocks.get_mut(parent) {
            block.inputs.insert(name.to_string(), input);
        }
        if let Some(block) = self.blocks.get_mut(child) {
            block.parent = Some(parent);
        }
    }

    /// Link blocks through their `next` pointers. Returns the first one.
    pub fn chain(
        &mut self,
        body: &[BlockId],
    ) -> Option<BlockId> {
        for pair in body.windows(2) {
            if let Some(block) = self.blocks.get_mut(pair[0]) {
                block.next = Some(pair[1]);
            }
            if let Some(block) = self.blocks.get_mut(pair[1]) {
                block.parent = Some(pair[0]);
            }
        }
        body.first().copied()
    }

    /// Add a top-level hat with `body` below it. Returns the hat.
    pub fn script(
        &mut self,
        hat: impl Into<Opcode>,
        body: &[BlockId],
    ) -> BlockId {
        let top = self.block(hat);
        self.attach_body(top, body)
    }

    /// Add a top-level hat with one field, such as a broadcast or key name.
    pub fn script_with_field(
        &mut self,
        hat: impl Into<Opcode>,
        field: (&str, &str),
        body: &[BlockId],
    ) -> BlockId {
        let top = self.block(hat);
        self.field(top, field.0, field.1, None);
        self.attach_body(top, body)
    }

    /// Make `body` a top-level stack of its own, with no hat. Returns its first block.
    pub fn stack(
        &mut self,
        body: &[BlockId],
    ) -> Option<BlockId> {
        let first = self.chain(body)?;
        if let Some(block) = self.blocks.get_mut(first) {
            block.top_level = true;
        }
        Some(first)
    }

    fn attach_body(
        &mut self,
        top: BlockId,
        body: &[BlockId],
    ) -> BlockId {
        if let Some(block) = self.blocks.get_mut(top) {
            block.top_level = true;
        }
        if let Some(first) = self.chain(body) {
            if let Some(block) = self.blocks.get_mut(top) {
                block.next = Some(first);
            }
            if let Some(block) = self.blocks.get_mut(first) {
                block.parent = Some(top);
            }
        }
        top
    }

    /// Define a procedure. Arguments are `(id, name, default)`.
    ///
    /// Returns the definition hat.
    pub fn procedure(
        &mut self,
        proccode: &str,
        arguments: &[(&str, &str, &str)],
        warp: bool,
        body: &[BlockId],
    ) -> BlockId {
        let prototype = self.block(Opcode::ProceduresPrototype);
        if let Some(block) = self.blocks.get_mut(prototype) {
            block.shadow = true;
            block.mutation = Some(Mutation {
                proccode: proccode.to_string(),
                argument_ids: arguments.iter().map(|(id, _, _)| id.to_string()).collect(),
                argument_names: arguments.iter().map(|(_, name, _)| name.to_string()).collect(),
                argument_defaults: arguments
                    .iter()
                    .map(|(_, _, default)| default.to_string())
                    .collect(),
                warp,
            });
        }
        let definition = self.block(Opcode::ProceduresDefinition);
        self.plug(definition, CUSTOM_BLOCK_INPUT, Input::Reporter(prototype), prototype);
        self.attach_body(definition, body)
    }

    /// A call block. Arguments are `(argument id, value)`.
    pub fn call(
        &mut self,
        proccode: &str,
        arguments: &[(&str, Value)],
    ) -> BlockId {
        let id = self.block(Opcode::ProceduresCall);
        if let Some(block) = self.blocks.get_mut(id) {
            let mut mutation = Mutation::new(proccode);
            mutation.argument_ids = arguments.iter().map(|(id, _)| id.to_string()).collect();
            block.mutation = Some(mutation);
        }
        for (argument, value) in arguments {
            self.literal(id, argument, value.clone());
        }
        id
    }
}
