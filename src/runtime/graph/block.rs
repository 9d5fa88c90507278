//! Block nodes and their handles

use super::opcode::Opcode;
use crate::runtime::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Handle to a block in a [`Blocks`](super::Blocks) arena.
///
/// The generation changes every time a slot is freed, so a handle to a deleted block
/// stays invalid even after its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl BlockId {
    /// Slot index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BlockId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "block@{}v{}", self.index, self.generation)
    }
}

/// Content of an input slot
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A value typed directly into the slot
    Literal(Value),
    /// A reporter block evaluated for its value
    Reporter(BlockId),
    /// The first block of a sub-stack (loop body, if/else branch)
    Branch(BlockId),
}

impl Input {
    /// The block this input points at, if any
    pub fn block(&self) -> Option<BlockId> {
        match self {
            Input::Literal(_) => None,
            Input::Reporter(id) | Input::Branch(id) => Some(*id),
        }
    }
}

/// Field value (dropdown or variable reference)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Field {
    pub value: String,
    /// Id of the referenced variable, list or broadcast, if any
    pub id: Option<String>,
}

impl Field {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            id: None,
        }
    }

    pub fn with_id(
        value: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            id: Some(id.into()),
        }
    }
}

/// Procedure signature carried by prototype and call blocks
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mutation {
    /// Procedure signature, e.g. `jump %s times`
    pub proccode: String,
    /// Argument ids, matching call-site input names
    pub argument_ids: Vec<String>,
    /// Argument names as seen by argument reporters
    pub argument_names: Vec<String>,
    /// Defaults for arguments missing at the call site
    pub argument_defaults: Vec<String>,
    /// Run the procedure body without yielding
    pub warp: bool,
}

impl Mutation {
    pub fn new(proccode: impl Into<String>) -> Self {
        Self {
            proccode: proccode.into(),
            ..Default::default()
        }
    }
}

/// A node of the program graph
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Handle assigned by the arena
    pub id: BlockId,
    /// Serialized identifier, unique within the graph
    pub key: Arc<str>,
    pub opcode: Opcode,
    pub inputs: IndexMap<String, Input>,
    pub fields: IndexMap<String, Field>,
    pub mutation: Option<Mutation>,
    pub next: Option<BlockId>,
    pub parent: Option<BlockId>,
    pub shadow: bool,
    pub top_level: bool,
    pub x: f64,
    pub y: f64,
}

impl Block {
    /// Create a detached block. The arena assigns the handle on insertion.
    pub fn new(
        key: impl Into<Arc<str>>,
        opcode: impl Into<Opcode>,
    ) -> Self {
        Self {
            id: BlockId {
                index: u32::MAX,
                generation: 0,
            },
            key: key.into(),
            opcode: opcode.into(),
            inputs: IndexMap::new(),
            fields: IndexMap::new(),
            mutation: None,
            next: None,
            parent: None,
            shadow: false,
            top_level: false,
            x: 0.0,
            y: 0.0,
        }
    }

    /// Field value by name
    pub fn field(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.fields.get(name).map(|f| f.value.as_str())
    }

    /// Blocks referenced by inputs, in input order
    pub fn input_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.inputs.values().filter_map(Input::block)
    }
}
