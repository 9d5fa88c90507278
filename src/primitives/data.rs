//! Variable and list primitives

use super::{Args, Flow, PrimitiveResult};
use crate::runtime::engine::{join_list, Variable, VariableKind};
use crate::runtime::scheduler::BlockUtility;
use crate::runtime::value::{ListIndex, Value};
use std::cmp::Ordering;

/// Lists stop growing past this many items
const LIST_ITEM_LIMIT: usize = 200_000;

fn lookup<'u>(
    util: &'u mut BlockUtility<'_>,
    field: &str,
    kind: VariableKind,
) -> Option<&'u mut Variable> {
    let id = util.field_id(field);
    let name = util.field(field).unwrap_or_default();
    let target = util.target_id();
    util.runtime
        .lookup_or_create_variable(target, id, name, kind)
}

fn with_list<R>(
    util: &mut BlockUtility<'_>,
    apply: impl FnOnce(&mut Vec<Value>) -> R,
) -> Option<R> {
    lookup(util, "LIST", VariableKind::List)
        .and_then(Variable::items_mut)
        .map(apply)
}

pub(super) fn variable(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    let value = lookup(util, "VARIABLE", VariableKind::Scalar)
        .map(|variable| variable.get())
        .unwrap_or_default();
    Ok(Flow::Value(value))
}

pub(super) fn set_variable_to(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let value = args.value("VALUE");
    set_scalar(util, |_| value);
    Ok(Flow::Done)
}

pub(super) fn change_variable_by(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let delta = args.number("VALUE");
    set_scalar(util, |current| Value::Number(current.to_number() + delta));
    Ok(Flow::Done)
}

/// Write a scalar and forward cloud variables to the cloud outbox
fn set_scalar(
    util: &mut BlockUtility<'_>,
    update: impl FnOnce(Value) -> Value,
) {
    let Some(variable) = lookup(util, "VARIABLE", VariableKind::Scalar) else {
        return;
    };
    let value = update(variable.get());
    variable.set(value.clone());
    if variable.is_cloud {
        let name = variable.name.clone();
        util.runtime.io.cloud.request_update(name, value);
    }
}

pub(super) fn list_contents(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    let contents = with_list(util, |items| join_list(items)).unwrap_or_default();
    Ok(Flow::Value(Value::String(contents)))
}

pub(super) fn add_to_list(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let item = args.value("ITEM");
    with_list(util, |items| {
        if items.len() < LIST_ITEM_LIMIT {
            items.push(item);
        }
    });
    Ok(Flow::Done)
}

pub(super) fn delete_of_list(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let index = args.value("INDEX");
    with_list(util, |items| match index.to_list_index(items.len(), true) {
        ListIndex::All => items.clear(),
        ListIndex::Index(index) => {
            items.remove(index - 1);
        }
        ListIndex::Invalid => {}
    });
    Ok(Flow::Done)
}

pub(super) fn delete_all_of_list(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    with_list(util, Vec::clear);
    Ok(Flow::Done)
}

pub(super) fn insert_at_list(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let (index, item) = (args.value("INDEX"), args.value("ITEM"));
    with_list(util, |items| {
        if items.len() >= LIST_ITEM_LIMIT {
            return;
        }
        if let ListIndex::Index(index) = index.to_list_index(items.len() + 1, false) {
            items.insert(index - 1, item);
        }
    });
    Ok(Flow::Done)
}

pub(super) fn replace_item_of_list(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let (index, item) = (args.value("INDEX"), args.value("ITEM"));
    with_list(util, |items| {
        if let ListIndex::Index(index) = index.to_list_index(items.len(), false) {
            items[index - 1] = item;
        }
    });
    Ok(Flow::Done)
}

pub(super) fn item_of_list(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let index = args.value("INDEX");
    let item = with_list(util, |items| match index.to_list_index(items.len(), false) {
        ListIndex::Index(index) => items[index - 1].clone(),
        _ => Value::default(),
    });
    Ok(Flow::Value(item.unwrap_or_default()))
}

pub(super) fn length_of_list(util: &mut BlockUtility<'_>) -> PrimitiveResult {
    let length = with_list(util, |items| items.len()).unwrap_or(0);
    Ok(Flow::Value(Value::from(length)))
}

pub(super) fn list_contains_item(
    util: &mut BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let item = args.value("ITEM");
    let found = with_list(util, |items| {
        items
            .iter()
            .any(|candidate| candidate.compare(&item) == Ordering::Equal)
    })
    .unwrap_or(false);
    Ok(Flow::Value(Value::Bool(found)))
}
