//! Motion primitives. The stage does not move; its position reporters read `0`.

use super::{Args, Flow, PrimitiveResult};
use crate::runtime::scheduler::BlockUtility;
use crate::runtime::value::Value;

/// Move the sprite, asking for a redraw when it is visible
fn move_to(
    util: &mut BlockUtility<'_>,
    to: impl FnOnce(f64, f64) -> (f64, f64),
) {
    let Some(target) = util.target_mut().filter(|target| !target.is_stage) else {
        return;
    };
    let (x, y) = to(target.x, target.y);
    target.set_xy(x, y);
    if target.visible {
        util.request_redraw();
    }
}

pub(super) fn goto_xy(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let (x, y) = (args.number("X"), args.number("Y"));
    move_to(util, |_, _| (x, y));
    Ok(Flow::Done)
}

pub(super) fn change_x_by(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let dx = args.number("DX");
    move_to(util, |x, y| (x + dx, y));
    Ok(Flow::Done)
}

pub(super) fn change_y_by(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let dy = args.number("DY");
    move_to(util, |x, y| (x, y + dy));
    Ok(Flow::Done)
}

pub(super) fn set_x(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let x = args.number("X");
    move_to(util, |_, y| (x, y));
    Ok(Flow::Done)
}

pub(super) fn set_y(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let y = args.number("Y");
    move_to(util, |x, _| (x, y));
    Ok(Flow::Done)
}

pub(super) fn x_position(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    let x = util
        .target()
        .filter(|target| !target.is_stage)
        .map_or(0.0, |target| target.x);
    Ok(Flow::Value(Value::Number(x)))
}

pub(super) fn y_position(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    let y = util
        .target()
        .filter(|target| !target.is_stage)
        .map_or(0.0, |target| target.y);
    Ok(Flow::Value(Value::Number(y)))
}
