use super::{Args, Flow, PrimitiveResult};
use crate::runtime::scheduler::BlockUtility;

/// Show a speech bubble; an empty message clears it
pub(super) fn say(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let message = args.string("MESSAGE");
    let Some(target) = util.target_mut().filter(|target| !target.is_stage) else {
        return Ok(Flow::Done);
    };
    target.say = (!message.is_empty()).then_some(message);
    util.request_redraw();
    Ok(Flow::Done)
}

pub(super) fn set_visible(
    util: &mut BlockUtility<'_>,
    visible: bool,
) -> PrimitiveResult {
    let Some(target) = util.target_mut().filter(|target| !target.is_stage) else {
        return Ok(Flow::Done);
    };
    target.visible = visible;
    util.request_redraw();
    Ok(Flow::Done)
}
