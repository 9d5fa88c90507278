//! Stack frames

use crate::runtime::graph::BlockId;
use crate::runtime::thread::ThreadId;
use crate::runtime::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::time::Duration;

/// Per-block execution context kept between executions of the same block
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FrameState {
    /// The block has not stored anything yet
    #[default]
    Fresh,
    /// Iterations left in a counted loop
    Repeat { remaining: i64 },
    /// A timed wait in progress
    Timer {
        started: Duration,
        duration: Duration,
    },
    /// Threads started by a broadcast that the block is waiting on
    BroadcastWait { threads: Vec<ThreadId> },
    /// A procedure call that already pushed its definition
    Called,
}

/// One level of a thread's call stack
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    /// The block this frame is executing
    pub block: BlockId,
    /// Re-enter the block when its branch completes
    pub is_loop: bool,
    /// Run without yielding between blocks
    pub warp_mode: bool,
    /// Procedure arguments bound by a call, visible to the frames above
    pub params: Option<IndexMap<String, Value>>,
    /// Values already produced by reporters feeding this frame's block
    pub reported: HashMap<BlockId, Value>,
    pub state: FrameState,
}

impl StackFrame {
    pub fn new(
        block: BlockId,
        warp_mode: bool,
    ) -> Self {
        Self {
            block,
            is_loop: false,
            warp_mode,
            params: None,
            reported: HashMap::new(),
            state: FrameState::Fresh,
        }
    }

    /// Point the frame at another block, clearing what belonged to the old one.
    ///
    /// Warp mode and parameter bindings are kept.
    pub fn reuse(
        &mut self,
        block: BlockId,
    ) {
        self.block = block;
        self.is_loop = false;
        self.reported.clear();
        self.state = FrameState::Fresh;
    }
}
