//! Block execution
//!
//! Executing a block evaluates its inputs (literals as-is, reporter blocks recursively,
//! branches skipped), then runs its primitive through a [`BlockUtility`]. Reporter
//! results are memoized on the executing frame so a block re-entered after a deferred
//! reporter resolves does not evaluate its other inputs twice.

use super::Sequencer;
use crate::primitives::{self, Args, Flow, PrimitiveError};
use crate::runtime::engine::{Runtime, Target, TargetId};
use crate::runtime::graph::{Block, BlockId, Blocks, Input, Opcode};
use crate::runtime::thread::{FrameState, Pending, PendingSlot, Thread, ThreadStatus};
use crate::runtime::value::Value;
use indexmap::IndexMap;
use std::time::Duration;
use tracing::trace;

/// Everything a primitive may touch while it runs
pub struct BlockUtility<'a> {
    pub(crate) sequencer: &'a Sequencer,
    pub runtime: &'a mut Runtime,
    pub thread: &'a mut Thread,
    pub blocks: &'a Blocks,
    block: BlockId,
    /// Stack position of the frame executing the block
    frame: usize,
}

impl<'a> BlockUtility<'a> {
    /// Handle of the block being run
    pub fn block_id(&self) -> BlockId {
        self.block
    }

    pub fn block(&self) -> Option<&'a Block> {
        self.blocks.get(self.block)
    }

    pub fn opcode(&self) -> Option<&'a Opcode> {
        self.blocks.opcode(self.block)
    }

    /// Field value of the block being run
    pub fn field(
        &self,
        name: &str,
    ) -> Option<&'a str> {
        self.block().and_then(|block| block.field(name))
    }

    /// Id stored with a field (variable, list or broadcast id)
    pub fn field_id(
        &self,
        name: &str,
    ) -> Option<&'a str> {
        self.block()
            .and_then(|block| block.fields.get(name))
            .and_then(|field| field.id.as_deref())
    }

    /// Actor running the thread
    pub fn target_id(&self) -> TargetId {
        self.thread.target
    }

    pub fn target(&self) -> Option<&Target> {
        self.runtime.target(self.thread.target)
    }

    pub fn target_mut(&mut self) -> Option<&mut Target> {
        self.runtime.target_mut(self.thread.target)
    }

    /// Per-block state of the executing frame
    pub fn frame_state(&mut self) -> Option<&mut FrameState> {
        self.thread.frame_mut(self.frame).map(|frame| &mut frame.state)
    }

    /// Whether the executing frame runs without yielding
    pub fn is_warp(&self) -> bool {
        self.thread
            .peek_stack_frame()
            .is_some_and(|frame| frame.warp_mode)
    }

    pub fn start_branch(
        &mut self,
        branch: usize,
        is_loop: bool,
    ) {
        self.sequencer
            .step_to_branch(self.thread, self.blocks, branch, is_loop);
    }

    pub fn start_procedure(
        &mut self,
        proccode: &str,
        args: &IndexMap<String, Value>,
    ) -> bool {
        self.sequencer
            .step_to_procedure(self.thread, self.blocks, proccode, args)
    }

    /// End the turn and run this block again next turn
    pub fn yield_thread(&mut self) {
        self.thread.status = ThreadStatus::Yield;
    }

    /// End the turn and sit out the rest of the pass
    pub fn yield_tick(&mut self) {
        self.thread.status = ThreadStatus::YieldTick;
    }

    pub fn stop_this_script(&mut self) {
        self.thread.stop_this_script(self.blocks);
    }

    pub fn retire(&mut self) {
        self.sequencer.retire_thread(self.thread);
    }

    pub fn request_redraw(&mut self) {
        self.runtime.request_redraw();
    }

    /// Engine clock reading
    pub fn now(&self) -> Duration {
        self.runtime.clock().now()
    }
}

/// Execute the top block of a thread.
///
/// A block that no longer exists is skipped. Errors come from the primitive and are
/// handled by the caller by retiring the thread.
pub(crate) fn execute(
    sequencer: &Sequencer,
    rt: &mut Runtime,
    thread: &mut Thread,
    blocks: &Blocks,
) -> Result<(), PrimitiveError> {
    let Some(block_id) = thread.peek_stack() else {
        return Ok(());
    };
    let Some(block) = blocks.get(block_id) else {
        trace!(block = %block_id, "block vanished, skipping");
        return Ok(());
    };
    let frame = thread.stack_len() - 1;

    let Some(args) = evaluate_inputs(sequencer, rt, thread, blocks, block, frame, 0)? else {
        return Ok(());
    };
    let flow = invoke(sequencer, rt, thread, blocks, block, frame, &args);
    match flow {
        Ok(Flow::Deferred(deferred)) => {
            thread.pending = Some(Pending {
                deferred,
                slot: PendingSlot::Command,
            });
            thread.status = ThreadStatus::PromiseWait;
            Ok(())
        }
        other => {
            if let Some(frame) = thread.frame_mut(frame) {
                frame.reported.clear();
            }
            if let Flow::Value(value) = other? {
                if thread.top_block == Some(block_id) {
                    thread.push_reported_value(value);
                }
            }
            Ok(())
        }
    }
}

/// Evaluate a block's inputs. `None` means a reporter parked the thread.
fn evaluate_inputs<'b>(
    sequencer: &Sequencer,
    rt: &mut Runtime,
    thread: &mut Thread,
    blocks: &'b Blocks,
    block: &'b Block,
    frame: usize,
    depth: usize,
) -> Result<Option<Args<'b>>, PrimitiveError> {
    let mut args = Args::new();
    for (name, input) in &block.inputs {
        let value = match input {
            Input::Literal(value) => value.clone(),
            Input::Reporter(reporter) => {
                match evaluate_reporter(sequencer, rt, thread, blocks, *reporter, frame, depth)? {
                    Some(value) => value,
                    None => return Ok(None),
                }
            }
            Input::Branch(_) => continue,
        };
        args.push(name, value);
    }
    Ok(Some(args))
}

fn evaluate_reporter(
    sequencer: &Sequencer,
    rt: &mut Runtime,
    thread: &mut Thread,
    blocks: &Blocks,
    id: BlockId,
    frame: usize,
    depth: usize,
) -> Result<Option<Value>, PrimitiveError> {
    let memo = thread
        .frame_mut(frame)
        .and_then(|frame| frame.reported.get(&id).cloned());
    if let Some(value) = memo {
        return Ok(Some(value));
    }
    let Some(block) = blocks.get(id) else {
        return Ok(Some(Value::default()));
    };
    if block.opcode.is_menu() {
        let value = block
            .fields
            .values()
            .next()
            .map(|field| Value::String(field.value.clone()))
            .unwrap_or_default();
        return Ok(Some(value));
    }
    if depth >= sequencer.max_reporter_depth() {
        return Err(PrimitiveError::TooDeep(depth));
    }

    let Some(args) = evaluate_inputs(sequencer, rt, thread, blocks, block, frame, depth + 1)?
    else {
        return Ok(None);
    };
    match invoke(sequencer, rt, thread, blocks, block, frame, &args)? {
        Flow::Value(value) => {
            if let Some(frame) = thread.frame_mut(frame) {
                frame.reported.insert(id, value.clone());
            }
            Ok(Some(value))
        }
        Flow::Done => Ok(Some(Value::default())),
        Flow::Deferred(deferred) => {
            thread.pending = Some(Pending {
                deferred,
                slot: PendingSlot::Reporter(id),
            });
            thread.status = ThreadStatus::PromiseWait;
            Ok(None)
        }
    }
}

fn invoke(
    sequencer: &Sequencer,
    rt: &mut Runtime,
    thread: &mut Thread,
    blocks: &Blocks,
    block: &Block,
    frame: usize,
    args: &Args<'_>,
) -> Result<Flow, PrimitiveError> {
    let mut util = BlockUtility {
        sequencer,
        runtime: rt,
        thread,
        blocks,
        block: block.id,
        frame,
    };
    primitives::run(&mut util, &block.opcode, args)
}
