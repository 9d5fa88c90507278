//! Sequencer
//!
//! One scheduling pass visits every thread in list order. A visited thread executes
//! blocks until it yields, parks on a deferred result, or finishes; the pass stops early
//! once the work-time budget is spent, leaving the remaining threads for the next pass.
//! A pass cut short that way is resumed by the next pass at the first thread it skipped,
//! so threads late in the list are not starved by busy threads ahead of them.
//!
//! Threads never run recursively through the host stack: control flow is an explicit
//! push/pop on the thread's own stack, and a loop is a frame marked `is_loop` that is
//! executed again when its branch completes.

pub mod execute;

pub use execute::BlockUtility;

use crate::primitives::PrimitiveError;
use crate::runtime::deferred::DeferredState;
use crate::runtime::engine::{CurrentThread, Runtime, ThreadFault};
use crate::runtime::graph::{Blocks, Opcode};
use crate::runtime::thread::{PendingSlot, Thread, ThreadId, ThreadStatus};
use crate::runtime::value::Value;
use crate::util::config::EngineConfig;
use crate::util::timer::{SharedClock, Timer};
use indexmap::IndexMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// What the sequencer does after one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Execute the thread's next block in the same turn
    Continue,
    /// The thread's turn is over
    EndTurn,
}

/// Counters of the last pass, kept for profiling and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencerStats {
    /// Passes run since creation
    pub passes: u64,
    /// Rounds over the thread list in the last pass
    pub rounds: usize,
    /// Blocks executed in the last pass
    pub blocks_executed: usize,
    /// Threads removed as finished in the last pass
    pub threads_finished: usize,
    /// The last pass ended on the work-time budget
    pub budget_exhausted: bool,
}

/// Drives scheduling passes over a runtime's threads
#[derive(Debug)]
pub struct Sequencer {
    clock: SharedClock,
    work_time: Duration,
    warp_time: Duration,
    max_call_depth: usize,
    max_reporter_depth: usize,
    repeat_until_redraw: bool,
    turbo_mode: bool,
    pass_timer: Option<Timer>,
    /// First thread skipped by a pass that ran out of budget
    resume_at: Option<ThreadId>,
    stats: SequencerStats,
}

impl Sequencer {
    pub fn new(
        config: &EngineConfig,
        clock: SharedClock,
    ) -> Self {
        let mut sequencer = Self {
            clock,
            work_time: Duration::ZERO,
            warp_time: Duration::ZERO,
            max_call_depth: 0,
            max_reporter_depth: 0,
            repeat_until_redraw: false,
            turbo_mode: false,
            pass_timer: None,
            resume_at: None,
            stats: SequencerStats::default(),
        };
        sequencer.configure(config);
        sequencer
    }

    /// Pick up configuration changes before a pass
    pub fn configure(
        &mut self,
        config: &EngineConfig,
    ) {
        self.work_time = config.work_time();
        self.warp_time = config.warp_time();
        self.max_call_depth = config.max_call_depth;
        self.max_reporter_depth = config.reporter_depth();
        self.repeat_until_redraw = config.repeat_until_redraw;
        self.turbo_mode = config.turbo_mode;
    }

    pub fn stats(&self) -> &SequencerStats {
        &self.stats
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    pub fn max_reporter_depth(&self) -> usize {
        self.max_reporter_depth
    }

    /// Run one pass. Returns the threads that finished and were removed.
    ///
    /// Threads started during the pass are appended at the end and first run next pass.
    pub fn step_threads(
        &mut self,
        rt: &mut Runtime,
    ) -> Vec<ThreadId> {
        self.pass_timer = Some(Timer::start(self.clock.clone()));
        self.stats = SequencerStats {
            passes: self.stats.passes + 1,
            ..SequencerStats::default()
        };
        rt.in_pass = true;
        rt.redraw_requested = false;
        for thread in rt.threads.iter_mut() {
            if thread.status == ThreadStatus::YieldTick {
                thread.status = ThreadStatus::Running;
            }
        }

        let mut done = Vec::new();
        let mut start = self.resume_index(rt);
        loop {
            self.stats.rounds += 1;
            let mut exhausted = false;
            let len = rt.threads.len();
            for offset in 0..len {
                let index = (start + offset) % len;
                let Some(slot) = rt.threads.get_mut(index) else {
                    continue;
                };
                let mut thread = std::mem::replace(slot, placeholder());
                self.visit(rt, &mut thread);
                if let Some(slot) = rt.threads.get_mut(index) {
                    *slot = thread;
                }
                if self.budget_exhausted() {
                    exhausted = true;
                    self.resume_at = if offset + 1 < len {
                        rt.threads.get((index + 1) % len).map(Thread::id)
                    } else {
                        None
                    };
                    break;
                }
            }
            if !exhausted {
                self.resume_at = None;
            }
            start = 0;
            self.collect_done(rt, &mut done);

            if exhausted {
                debug!(rounds = self.stats.rounds, "work time budget exhausted");
                self.stats.budget_exhausted = true;
            }
            let another_round = self.repeat_until_redraw
                && !exhausted
                && (!rt.redraw_requested || self.turbo_mode)
                && rt
                    .threads
                    .iter()
                    .any(|thread| thread.status == ThreadStatus::Running);
            if !another_round {
                break;
            }
        }

        let spawned = std::mem::take(&mut rt.spawned);
        rt.threads
            .extend(spawned.into_iter().filter(|thread| !thread.is_done()));
        rt.in_pass = false;
        self.pass_timer = None;
        done
    }

    /// Where this pass starts: the thread a budget-cut pass skipped first, else the head
    fn resume_index(
        &mut self,
        rt: &Runtime,
    ) -> usize {
        let Some(id) = self.resume_at.take() else {
            return 0;
        };
        rt.threads
            .iter()
            .position(|thread| thread.id() == id)
            .unwrap_or(0)
    }

    fn collect_done(
        &mut self,
        rt: &mut Runtime,
        done: &mut Vec<ThreadId>,
    ) {
        let mut reports = Vec::new();
        rt.threads.retain_mut(|thread| {
            if !thread.is_done() {
                return true;
            }
            if let Some(value) = thread.just_reported.take() {
                reports.push((thread.id(), value));
            }
            done.push(thread.id());
            false
        });
        self.stats.threads_finished = done.len();
        for (thread, value) in reports {
            rt.push_report(thread, value);
        }
    }

    /// Give one thread its turn
    fn visit(
        &mut self,
        rt: &mut Runtime,
        thread: &mut Thread,
    ) {
        match thread.status {
            ThreadStatus::Done | ThreadStatus::YieldTick => return,
            ThreadStatus::PromiseWait => {
                if !self.resolve_pending(rt, thread) {
                    thread.warp_timer = None;
                    return;
                }
            }
            ThreadStatus::Running | ThreadStatus::Yield => {}
        }

        let Some(blocks) = rt.blocks(thread.target) else {
            debug!(thread = %thread.id(), target = %thread.target, "target gone, retiring");
            self.retire_thread(thread);
            return;
        };
        rt.current = Some(CurrentThread {
            id: thread.id(),
            target: thread.target,
            top_block: thread.top_block,
            restart: false,
            retire: false,
        });
        self.step_thread(rt, thread, &blocks);
        rt.current = None;

        if thread.restart_requested {
            thread.restart();
        }
        thread.warp_timer = None;
    }

    /// Poll a parked thread. Returns whether it may keep running this turn.
    fn resolve_pending(
        &mut self,
        rt: &mut Runtime,
        thread: &mut Thread,
    ) -> bool {
        let Some(pending) = thread.pending.as_ref() else {
            thread.status = ThreadStatus::Running;
            return true;
        };
        let slot = pending.slot;
        match pending.deferred.poll() {
            DeferredState::Pending => false,
            DeferredState::Resolved(value) => {
                thread.pending = None;
                thread.status = ThreadStatus::Running;
                match slot {
                    PendingSlot::Reporter(block) => {
                        if let Some(frame) = thread.peek_stack_frame_mut() {
                            frame.reported.insert(block, value);
                        }
                        true
                    }
                    PendingSlot::Command => {
                        let Some(blocks) = rt.blocks(thread.target) else {
                            self.retire_thread(thread);
                            return false;
                        };
                        if let Some(frame) = thread.peek_stack_frame_mut() {
                            frame.reported.clear();
                        }
                        self.advance(thread, &blocks) == StepOutcome::Continue
                    }
                }
            }
            DeferredState::Rejected(reason) => {
                let opcode = rt
                    .blocks(thread.target)
                    .zip(thread.peek_stack())
                    .and_then(|(blocks, block)| blocks.opcode(block).map(Opcode::to_string))
                    .unwrap_or_default();
                self.fault(rt, thread, opcode, PrimitiveError::Rejected(reason));
                false
            }
        }
    }

    /// Execute blocks until the thread's turn is over
    pub fn step_thread(
        &mut self,
        rt: &mut Runtime,
        thread: &mut Thread,
        blocks: &Blocks,
    ) {
        while self.step_block(rt, thread, blocks) == StepOutcome::Continue {}
    }

    /// Execute the thread's top block and move on from it.
    pub fn step_block(
        &mut self,
        rt: &mut Runtime,
        thread: &mut Thread,
        blocks: &Blocks,
    ) -> StepOutcome {
        let Some(current) = thread.peek_stack() else {
            thread.status = ThreadStatus::Done;
            return StepOutcome::EndTurn;
        };
        let warp = thread
            .peek_stack_frame()
            .is_some_and(|frame| frame.warp_mode);
        if warp && thread.warp_timer.is_none() {
            thread.warp_timer = Some(Timer::start(self.clock.clone()));
        }

        #[cfg(feature = "debug")]
        trace!(
            thread = %thread.id(),
            block = %current,
            opcode = ?blocks.opcode(current),
            warp,
            "step block"
        );
        self.stats.blocks_executed += 1;
        if let Err(error) = execute::execute(self, rt, thread, blocks) {
            let opcode = blocks
                .opcode(current)
                .map(Opcode::to_string)
                .unwrap_or_default();
            self.fault(rt, thread, opcode, error);
            return StepOutcome::EndTurn;
        }
        if let Some(outcome) = apply_requests(rt, thread) {
            return outcome;
        }

        match thread.status {
            ThreadStatus::Yield => {
                thread.status = ThreadStatus::Running;
                return if warp && self.warp_ok(thread) {
                    StepOutcome::Continue
                } else {
                    StepOutcome::EndTurn
                };
            }
            ThreadStatus::YieldTick | ThreadStatus::PromiseWait | ThreadStatus::Done => {
                return StepOutcome::EndTurn;
            }
            ThreadStatus::Running => {}
        }

        if thread.stack_len() == 0 {
            thread.status = ThreadStatus::Done;
            return StepOutcome::EndTurn;
        }
        if thread.peek_stack() == Some(current) {
            return self.advance(thread, blocks);
        }
        StepOutcome::Continue
    }

    /// Move past the top block, unwinding finished frames.
    ///
    /// A loop frame uncovered by the unwind is executed again: right away in warp mode,
    /// otherwise on the thread's next turn.
    fn advance(
        &self,
        thread: &mut Thread,
        blocks: &Blocks,
    ) -> StepOutcome {
        let mut popped = go_to_next_block(thread, blocks);
        while popped {
            let Some(frame) = thread.peek_stack_frame() else {
                thread.status = ThreadStatus::Done;
                return StepOutcome::EndTurn;
            };
            if frame.is_loop {
                return if frame.warp_mode && self.warp_ok(thread) {
                    StepOutcome::Continue
                } else {
                    StepOutcome::EndTurn
                };
            }
            popped = go_to_next_block(thread, blocks);
        }
        StepOutcome::Continue
    }

    /// Push the `branch`-th sub-stack of the top block.
    ///
    /// An empty branch leaves control where it is; an empty loop body still yields so
    /// the loop does not spin.
    pub fn step_to_branch(
        &self,
        thread: &mut Thread,
        blocks: &Blocks,
        branch: usize,
        is_loop: bool,
    ) {
        let Some(current) = thread.peek_stack() else {
            return;
        };
        if let Some(frame) = thread.peek_stack_frame_mut() {
            frame.is_loop = is_loop;
        }
        match blocks.branch(current, branch) {
            Some(first) => thread.push_stack(first),
            None if is_loop => thread.status = ThreadStatus::Yield,
            None => {}
        }
    }

    /// Push a procedure body with its arguments bound by name.
    ///
    /// `args` is keyed by argument id; missing arguments take the prototype's defaults.
    /// Returns `false` when the procedure does not exist or the call depth cap is hit.
    pub fn step_to_procedure(
        &self,
        thread: &mut Thread,
        blocks: &Blocks,
        proccode: &str,
        args: &IndexMap<String, Value>,
    ) -> bool {
        let Some(definition) = blocks.procedure_definition(proccode) else {
            trace!(proccode, "unknown procedure, skipping call");
            return false;
        };
        if thread.stack_len() >= self.max_call_depth {
            warn!(
                thread = %thread.id(),
                proccode,
                depth = thread.stack_len(),
                "call depth limit reached, refusing call"
            );
            return false;
        }

        let is_recursive = thread.is_recursive_call(blocks, proccode);
        thread.push_stack(definition);
        thread.init_params();
        let mut warp = false;
        if let Some(params) = blocks.procedure_params(proccode) {
            warp = params.warp;
            for (index, name) in params.names.iter().enumerate() {
                let value = params
                    .ids
                    .get(index)
                    .and_then(|id| args.get(id))
                    .cloned()
                    .or_else(|| params.defaults.get(index).cloned().map(Value::String))
                    .unwrap_or_default();
                thread.push_param(name.clone(), value);
            }
        }

        let in_warp = thread
            .peek_stack_frame()
            .is_some_and(|frame| frame.warp_mode);
        if in_warp && !self.warp_timer_ok(thread) {
            thread.status = ThreadStatus::Yield;
        } else if warp {
            if let Some(frame) = thread.peek_stack_frame_mut() {
                frame.warp_mode = true;
            }
        } else if is_recursive {
            thread.status = ThreadStatus::Yield;
        }
        true
    }

    /// Stop a thread now: empty its stack and mark it done.
    pub fn retire_thread(
        &self,
        thread: &mut Thread,
    ) {
        debug!(thread = %thread.id(), "thread retired");
        thread.retire();
    }

    fn fault(
        &self,
        rt: &mut Runtime,
        thread: &mut Thread,
        opcode: String,
        error: PrimitiveError,
    ) {
        rt.faults().record(ThreadFault {
            thread: thread.id(),
            target: thread.target,
            opcode,
            error,
        });
        self.retire_thread(thread);
    }

    /// Whether the pass has used up its work time
    pub fn budget_exhausted(&self) -> bool {
        self.pass_timer
            .as_ref()
            .is_some_and(|timer| timer.elapsed() >= self.work_time)
    }

    fn warp_timer_ok(
        &self,
        thread: &Thread,
    ) -> bool {
        thread
            .warp_timer
            .as_ref()
            .map_or(true, |timer| timer.elapsed() <= self.warp_time)
    }

    /// Whether a warp frame may keep going without yielding
    fn warp_ok(
        &self,
        thread: &Thread,
    ) -> bool {
        self.warp_timer_ok(thread) && !self.budget_exhausted()
    }
}

/// Apply stop and restart requests the runtime parked for the running thread
fn apply_requests(
    rt: &mut Runtime,
    thread: &mut Thread,
) -> Option<StepOutcome> {
    let current = rt.current.as_mut()?;
    if std::mem::take(&mut current.retire) {
        thread.retire();
        return Some(StepOutcome::EndTurn);
    }
    if std::mem::take(&mut current.restart) {
        thread.restart_requested = true;
        return Some(StepOutcome::EndTurn);
    }
    None
}

/// Go to the next block; returns whether a frame was popped
fn go_to_next_block(
    thread: &mut Thread,
    blocks: &Blocks,
) -> bool {
    let before = thread.stack_len();
    thread.go_to_next_block(blocks);
    thread.stack_len() < before
}

/// Stand-in left in the thread list while a thread is out for its turn
fn placeholder() -> Thread {
    let mut thread = Thread::default();
    thread.status = ThreadStatus::Done;
    thread
}
