//! Control primitives: loops, conditionals, waits, stop and clones

use super::{Args, Flow, PrimitiveResult};
use crate::runtime::engine::Target;
use crate::runtime::scheduler::BlockUtility;
use crate::runtime::thread::FrameState;
use std::time::Duration;

pub(super) fn forever(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    util.start_branch(1, true);
    Ok(Flow::Done)
}

/// Counted loop. The count is read once, on the first execution of the frame.
pub(super) fn repeat(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let times = (args.number("TIMES") + 0.5).floor() as i64;
    let Some(state) = util.frame_state() else {
        return Ok(Flow::Done);
    };
    if !matches!(state, FrameState::Repeat { .. }) {
        *state = FrameState::Repeat { remaining: times };
    }
    let FrameState::Repeat { remaining } = state else {
        return Ok(Flow::Done);
    };
    *remaining -= 1;
    if *remaining >= 0 {
        util.start_branch(1, true);
    }
    Ok(Flow::Done)
}

pub(super) fn repeat_until(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    if !args.boolean("CONDITION") {
        util.start_branch(1, true);
    }
    Ok(Flow::Done)
}

pub(super) fn while_loop(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    if args.boolean("CONDITION") {
        util.start_branch(1, true);
    }
    Ok(Flow::Done)
}

pub(super) fn if_then(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    if args.boolean("CONDITION") {
        util.start_branch(1, false);
    }
    Ok(Flow::Done)
}

pub(super) fn if_else(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let branch = if args.boolean("CONDITION") { 1 } else { 2 };
    util.start_branch(branch, false);
    Ok(Flow::Done)
}

/// Timed wait: start a timer on the first execution, then yield until it runs out.
pub(super) fn wait(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let now = util.now();
    let Some(state) = util.frame_state() else {
        return Ok(Flow::Done);
    };
    match state {
        FrameState::Timer { started, duration } => {
            if now.saturating_sub(*started) < *duration {
                util.yield_thread();
            }
        }
        _ => {
            let seconds = args.number("DURATION").max(0.0);
            let duration = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX);
            *state = FrameState::Timer {
                started: now,
                duration,
            };
            util.request_redraw();
            util.yield_thread();
        }
    }
    Ok(Flow::Done)
}

pub(super) fn wait_until(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    if !args.boolean("CONDITION") {
        util.yield_thread();
    }
    Ok(Flow::Done)
}

pub(super) fn stop(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    match util.field("STOP_OPTION").unwrap_or("all") {
        "all" => {
            util.runtime.stop_all();
            util.retire();
        }
        "this script" => util.stop_this_script(),
        "other scripts in sprite" | "other scripts in stage" => {
            let (target, keep) = (util.target_id(), util.thread.id());
            util.runtime.stop_for_target(target, Some(keep));
        }
        _ => {}
    }
    Ok(Flow::Done)
}

pub(super) fn create_clone_of(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let option = args.string("CLONE_OPTION");
    let source = if option == "_myself_" {
        Some(util.target_id())
    } else {
        util.runtime.target_by_name(&option).map(Target::id)
    };
    if let Some(source) = source {
        util.runtime.create_clone(source);
    }
    Ok(Flow::Done)
}

pub(super) fn delete_this_clone(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    if util.target().is_some_and(|target| !target.is_original) {
        let target = util.target_id();
        util.runtime.delete_clone(target);
        util.retire();
    }
    Ok(Flow::Done)
}

/// Run the body as one atomic step.
pub(super) fn all_at_once(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    util.start_branch(1, false);
    if util.thread.peek_stack() != Some(util.block_id()) {
        if let Some(frame) = util.thread.peek_stack_frame_mut() {
            frame.warp_mode = true;
        }
    }
    Ok(Flow::Done)
}
