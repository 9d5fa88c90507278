use super::{Args, Flow, PrimitiveResult};
use crate::runtime::scheduler::BlockUtility;
use crate::runtime::thread::FrameState;

pub(super) fn broadcast(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let message = args.string("BROADCAST_INPUT");
    util.runtime.broadcast(&message);
    Ok(Flow::Done)
}

/// Broadcast once, then keep yielding while any receiver is still running.
pub(super) fn broadcast_and_wait(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let waiting = match util.frame_state() {
        Some(FrameState::BroadcastWait { threads }) => Some(threads.clone()),
        _ => None,
    };
    let threads = match waiting {
        Some(threads) => threads,
        None => {
            let message = args.string("BROADCAST_INPUT");
            let started = util.runtime.broadcast(&message);
            if let Some(state) = util.frame_state() {
                *state = FrameState::BroadcastWait {
                    threads: started.clone(),
                };
            }
            started
        }
    };
    if threads
        .iter()
        .any(|thread| util.runtime.is_active_thread(*thread))
    {
        util.yield_thread();
    }
    Ok(Flow::Done)
}
