//! 集成测试共用的脚本搭建工具

use blockvm::util::timer::{ManualClock, SharedClock};
use blockvm::{BlockId, EngineConfig, Runtime, ScriptBuilder, TargetId, Value, VariableKind};
use std::sync::Arc;

/// Runtime on a clock the test moves by hand
pub fn manual_runtime(config: EngineConfig) -> (Runtime, Arc<ManualClock>) {
    let clock = ManualClock::shared();
    let shared: SharedClock = clock.clone();
    (Runtime::with_clock(config, shared), clock)
}

/// Scalar variable of an actor, empty when missing
pub fn var(
    rt: &Runtime,
    target: TargetId,
    name: &str,
) -> Value {
    rt.target(target)
        .and_then(|target| target.variable_by_name(name, VariableKind::Scalar))
        .map(|variable| variable.get())
        .unwrap_or_default()
}

pub fn set_to(
    b: &mut ScriptBuilder,
    name: &str,
    value: impl Into<Value>,
) -> BlockId {
    let id = b.command("data_setvariableto", &[("VALUE", value.into())]);
    b.field(id, "VARIABLE", name, None);
    id
}

pub fn change_by(
    b: &mut ScriptBuilder,
    name: &str,
    field_id: Option<&str>,
    delta: f64,
) -> BlockId {
    let id = b.command("data_changevariableby", &[("VALUE", Value::Number(delta))]);
    b.field(id, "VARIABLE", name, field_id);
    id
}

/// `data_variable` reporter
pub fn read(
    b: &mut ScriptBuilder,
    name: &str,
    field_id: Option<&str>,
) -> BlockId {
    let id = b.block("data_variable");
    b.field(id, "VARIABLE", name, field_id);
    id
}

/// Binary operator over two reporters or literals
pub fn binary(
    b: &mut ScriptBuilder,
    opcode: &str,
    (left_name, left): (&str, Operand),
    (right_name, right): (&str, Operand),
) -> BlockId {
    let id = b.block(opcode);
    for (name, operand) in [(left_name, left), (right_name, right)] {
        match operand {
            Operand::Literal(value) => b.literal(id, name, value),
            Operand::Block(block) => b.reporter(id, name, block),
        }
    }
    id
}

/// One side of a binary operator
pub enum Operand {
    Literal(Value),
    Block(BlockId),
}

impl From<BlockId> for Operand {
    fn from(block: BlockId) -> Self {
        Operand::Block(block)
    }
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Operand::Literal(Value::Number(n))
    }
}
