//! Sensing primitives: they poll the IO devices

use super::{Args, Flow, PrimitiveResult};
use crate::runtime::scheduler::BlockUtility;
use crate::runtime::value::Value;

pub(super) fn timer(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    let seconds = util.runtime.io.clock.project_timer();
    Ok(Flow::Value(Value::Number(seconds)))
}

pub(super) fn reset_timer(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    util.runtime.io.clock.reset();
    Ok(Flow::Done)
}

pub(super) fn key_pressed(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let down = util
        .runtime
        .io
        .keyboard
        .key_is_down(&args.value("KEY_OPTION"));
    Ok(Flow::Value(Value::Bool(down)))
}

pub(super) fn mouse_x(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    Ok(Flow::Value(Value::Number(util.runtime.io.mouse.scratch_x())))
}

pub(super) fn mouse_y(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    Ok(Flow::Value(Value::Number(util.runtime.io.mouse.scratch_y())))
}

pub(super) fn mouse_down(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    Ok(Flow::Value(Value::Bool(util.runtime.io.mouse.is_down())))
}

pub(super) fn username(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    let name = util.runtime.io.user_data.username().to_string();
    Ok(Flow::Value(Value::String(name)))
}

/// Queue the question and park until the host answers it
pub(super) fn ask_and_wait(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let question = args.string("QUESTION");
    Ok(Flow::Deferred(util.runtime.ask(question)))
}

pub(super) fn answer(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    Ok(Flow::Value(Value::String(util.runtime.answer().to_string())))
}
