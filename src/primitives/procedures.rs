use super::{Args, Flow, PrimitiveResult};
use crate::runtime::scheduler::BlockUtility;
use crate::runtime::thread::FrameState;
use crate::runtime::value::Value;
use indexmap::IndexMap;

/// Push the procedure body. The frame remembers the call so the block is skipped when
/// control comes back to it.
pub(super) fn call(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    if matches!(util.frame_state(), Some(FrameState::Called)) {
        return Ok(Flow::Done);
    }
    let Some(mutation) = util.block().and_then(|block| block.mutation.as_ref()) else {
        return Ok(Flow::Done);
    };
    if let Some(state) = util.frame_state() {
        *state = FrameState::Called;
    }
    let by_id: IndexMap<String, Value> = mutation
        .argument_ids
        .iter()
        .filter_map(|id| args.get(id).map(|value| (id.clone(), value.clone())))
        .collect();
    util.start_procedure(&mutation.proccode, &by_id);
    Ok(Flow::Done)
}

pub(super) fn argument_string_number(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    let name = util.field("VALUE").unwrap_or_default();
    let value = util
        .thread
        .get_param(name)
        .cloned()
        .unwrap_or(Value::Number(0.0));
    Ok(Flow::Value(value))
}

pub(super) fn argument_boolean(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    let name = util.field("VALUE").unwrap_or_default();
    let value = util
        .thread
        .get_param(name)
        .map_or(false, Value::to_boolean);
    Ok(Flow::Value(Value::Bool(value)))
}
