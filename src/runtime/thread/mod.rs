//! Script threads
//!
//! A [`Thread`] is one running instance of a script: an explicit stack of
//! [`StackFrame`]s plus a status the sequencer reads after every block. Threads never
//! hold references into the program graph; they store block handles and look structure
//! up through a [`Blocks`] borrowed for the duration of a call.

pub mod frame;

pub use frame::{FrameState, StackFrame};

use crate::runtime::deferred::Deferred;
use crate::runtime::engine::TargetId;
use crate::runtime::graph::{BlockId, Blocks, Opcode};
use crate::runtime::value::Value;
use crate::util::timer::Timer;
use indexmap::IndexMap;

/// Unique thread identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ThreadId(pub u64);

impl ThreadId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "Thread({})", self.0)
    }
}

/// Thread status, read by the sequencer after every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadStatus {
    /// Keep executing blocks.
    #[default]
    Running,
    /// Give up the rest of this turn; resume at the same block next time.
    Yield,
    /// Like `Yield`, but also sit out any further rounds of the current pass.
    YieldTick,
    /// Parked on a deferred primitive result.
    PromiseWait,
    /// Stack is empty; the thread is removed at the end of the pass.
    Done,
}

/// Where a resolved deferred value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingSlot {
    /// Memoize as the value of a reporter feeding the top frame
    Reporter(BlockId),
    /// The top block itself was waiting; move past it
    Command,
}

/// A deferred result a parked thread is waiting on
#[derive(Debug)]
pub struct Pending {
    pub deferred: Deferred,
    pub slot: PendingSlot,
}

/// One running instance of a script
#[derive(Debug, Default)]
pub struct Thread {
    id: ThreadId,
    /// Actor the script belongs to
    pub target: TargetId,
    /// Hat (or clicked) block the thread started from
    pub top_block: Option<BlockId>,
    stack: Vec<StackFrame>,
    pub status: ThreadStatus,
    /// Started when the thread enters a warp frame during a turn
    pub warp_timer: Option<Timer>,
    /// Deferred result the thread is parked on
    pub pending: Option<Pending>,
    /// Started by clicking the script rather than by an event
    pub stack_click: bool,
    /// Value reported by a reporter script run from the editor
    pub just_reported: Option<Value>,
    /// Restart from the top block once the current turn ends
    pub restart_requested: bool,
}

impl Thread {
    /// Create a thread positioned at the top of a script.
    pub fn new(
        id: ThreadId,
        target: TargetId,
        top_block: BlockId,
    ) -> Self {
        let mut thread = Self {
            id,
            target,
            top_block: Some(top_block),
            ..Default::default()
        };
        thread.push_stack(top_block);
        thread
    }

    /// Create a thread with an empty stack.
    pub fn empty(
        id: ThreadId,
        target: TargetId,
    ) -> Self {
        Self {
            id,
            target,
            ..Default::default()
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Push a frame. The new frame inherits warp mode from the frame below it.
    pub fn push_stack(
        &mut self,
        block: BlockId,
    ) {
        let warp_mode = self.stack.last().is_some_and(|frame| frame.warp_mode);
        self.stack.push(StackFrame::new(block, warp_mode));
    }

    /// Pop the top frame and return its block; `None` once the stack is empty.
    ///
    /// Status is left alone, so popping an empty stack is harmless.
    pub fn pop_stack(&mut self) -> Option<BlockId> {
        self.stack.pop().map(|frame| frame.block)
    }

    /// Block of the top frame
    pub fn peek_stack(&self) -> Option<BlockId> {
        self.stack.last().map(|frame| frame.block)
    }

    pub fn peek_stack_frame(&self) -> Option<&StackFrame> {
        self.stack.last()
    }

    pub fn peek_stack_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.stack.last_mut()
    }

    /// Frame at a stack position, bottom first
    pub fn frame_mut(
        &mut self,
        index: usize,
    ) -> Option<&mut StackFrame> {
        self.stack.get_mut(index)
    }

    /// Frame right below the top
    pub fn peek_parent_stack_frame(&self) -> Option<&StackFrame> {
        self.stack.iter().rev().nth(1)
    }

    /// Blocks on the stack, bottom first
    pub fn stack(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.stack.iter().map(|frame| frame.block)
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Whether the top frame is the script's first frame
    pub fn at_stack_top(&self) -> bool {
        self.stack.len() == 1
    }

    /// Point the top frame at another block, keeping its warp mode and parameters.
    pub fn reuse_stack_for_next_block(
        &mut self,
        block: BlockId,
    ) {
        if let Some(frame) = self.stack.last_mut() {
            frame.reuse(block);
        }
    }

    /// Move the top frame to its block's successor, or pop it at the end of a chain.
    ///
    /// Returns the new top block.
    pub fn go_to_next_block(
        &mut self,
        blocks: &Blocks,
    ) -> Option<BlockId> {
        let current = self.peek_stack()?;
        match blocks.next(current) {
            Some(next) => self.reuse_stack_for_next_block(next),
            None => {
                self.pop_stack();
            }
        }
        self.peek_stack()
    }

    /// Whether a frame below the top is a call to `proccode`.
    pub fn is_recursive_call(
        &self,
        blocks: &Blocks,
        proccode: &str,
    ) -> bool {
        let below_top = self.stack.len().saturating_sub(1);
        self.stack[..below_top].iter().rev().any(|frame| {
            blocks.get(frame.block).is_some_and(|block| {
                block.opcode == Opcode::ProceduresCall
                    && block
                        .mutation
                        .as_ref()
                        .is_some_and(|mutation| mutation.proccode == proccode)
            })
        })
    }

    /// Give the top frame an empty parameter mapping, unless it has one.
    pub fn init_params(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.params.get_or_insert_with(IndexMap::new);
        }
    }

    /// Bind a parameter on the top frame
    pub fn push_param(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) {
        if let Some(frame) = self.stack.last_mut() {
            frame
                .params
                .get_or_insert_with(IndexMap::new)
                .insert(name.into(), value);
        }
    }

    /// Look up a procedure parameter.
    ///
    /// The nearest frame that has bindings decides; a name it does not bind is `None`,
    /// as is any lookup outside a procedure.
    pub fn get_param(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| frame.params.as_ref())
            .and_then(|params| params.get(name))
    }

    /// Record the value produced by a reporter script
    pub fn push_reported_value(
        &mut self,
        value: Value,
    ) {
        self.just_reported = Some(value);
    }

    /// Drop every frame and finish. Any pending deferred is discarded.
    pub fn retire(&mut self) {
        self.stack.clear();
        self.pending = None;
        self.warp_timer = None;
        self.restart_requested = false;
        self.status = ThreadStatus::Done;
    }

    /// Clear the stack and start over from the top block.
    pub fn restart(&mut self) {
        self.stack.clear();
        self.pending = None;
        self.warp_timer = None;
        self.restart_requested = false;
        self.status = ThreadStatus::Running;
        if let Some(top) = self.top_block {
            self.push_stack(top);
        }
    }

    /// Pop frames up to the enclosing procedure call, or everything outside one.
    pub fn stop_this_script(
        &mut self,
        blocks: &Blocks,
    ) {
        while let Some(block) = self.peek_stack() {
            if blocks.opcode(block) == Some(&Opcode::ProceduresCall) {
                break;
            }
            self.pop_stack();
        }
        if self.stack.is_empty() {
            self.status = ThreadStatus::Done;
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == ThreadStatus::Done
    }
}
