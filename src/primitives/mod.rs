//! Block primitives
//!
//! One function per built-in opcode, dispatched with a `match` over [`Opcode`]. A
//! primitive reads its evaluated inputs from [`Args`], touches engine state through the
//! [`BlockUtility`], and reports back a [`Flow`].

mod control;
mod data;
mod event;
mod looks;
mod motion;
mod operators;
mod procedures;
mod sensing;

use crate::runtime::deferred::Deferred;
use crate::runtime::graph::Opcode;
use crate::runtime::scheduler::BlockUtility;
use crate::runtime::value::Value;
use smallvec::SmallVec;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::trace;

/// Faults raised while running a primitive.
///
/// Any of these retires the thread that hit it; other threads keep running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrimitiveError {
    #[error("{opcode} failed: {message}")]
    Fault { opcode: String, message: String },

    #[error("deferred result rejected: {0}")]
    Rejected(String),

    #[error("{opcode} panicked: {message}")]
    Panicked { opcode: String, message: String },

    #[error("reporters nested deeper than {0}")]
    TooDeep(usize),
}

impl PrimitiveError {
    pub fn fault(
        opcode: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        PrimitiveError::Fault {
            opcode: opcode.into(),
            message: message.into(),
        }
    }
}

/// What a primitive produced
#[derive(Debug)]
pub enum Flow {
    /// A command finished
    Done,
    /// A reporter's value
    Value(Value),
    /// The result arrives later; the thread parks until it does
    Deferred(Deferred),
}

impl From<Value> for Flow {
    fn from(value: Value) -> Self {
        Flow::Value(value)
    }
}

pub type PrimitiveResult = Result<Flow, PrimitiveError>;

/// Evaluated inputs of a block, by input name
#[derive(Debug, Clone, Default)]
pub struct Args<'a> {
    values: SmallVec<[(&'a str, Value); 4]>,
}

impl<'a> Args<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        name: &'a str,
        value: Value,
    ) {
        self.values.push((name, value));
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.values
            .iter()
            .find(|(arg, _)| *arg == name)
            .map(|(_, value)| value)
    }

    /// Input value; a missing input is the empty string
    pub fn value(
        &self,
        name: &str,
    ) -> Value {
        self.get(name).cloned().unwrap_or_default()
    }

    pub fn number(
        &self,
        name: &str,
    ) -> f64 {
        self.get(name).map_or(0.0, Value::to_number)
    }

    pub fn string(
        &self,
        name: &str,
    ) -> String {
        self.get(name).map(Value::to_string).unwrap_or_default()
    }

    pub fn boolean(
        &self,
        name: &str,
    ) -> bool {
        self.get(name).is_some_and(Value::to_boolean)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &Value)> + '_ {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Run the primitive for `opcode`
pub fn run(
    util: &mut BlockUtility<'_>,
    opcode: &Opcode,
    args: &Args<'_>,
) -> PrimitiveResult {
    use Opcode::*;

    match opcode {
        ControlForever => control::forever(util),
        ControlRepeat => control::repeat(util, args),
        ControlRepeatUntil => control::repeat_until(util, args),
        ControlWhile => control::while_loop(util, args),
        ControlIf => control::if_then(util, args),
        ControlIfElse => control::if_else(util, args),
        ControlWait => control::wait(util, args),
        ControlWaitUntil => control::wait_until(util, args),
        ControlStop => control::stop(util),
        ControlCreateCloneOf => control::create_clone_of(util, args),
        ControlDeleteThisClone => control::delete_this_clone(util),
        ControlAllAtOnce => control::all_at_once(util),

        EventBroadcast => event::broadcast(util, args),
        EventBroadcastAndWait => event::broadcast_and_wait(util, args),

        DataVariable => data::variable(util),
        DataSetVariableTo => data::set_variable_to(util, args),
        DataChangeVariableBy => data::change_variable_by(util, args),
        DataListContents => data::list_contents(util),
        DataAddToList => data::add_to_list(util, args),
        DataDeleteOfList => data::delete_of_list(util, args),
        DataDeleteAllOfList => data::delete_all_of_list(util),
        DataInsertAtList => data::insert_at_list(util, args),
        DataReplaceItemOfList => data::replace_item_of_list(util, args),
        DataItemOfList => data::item_of_list(util, args),
        DataLengthOfList => data::length_of_list(util),
        DataListContainsItem => data::list_contains_item(util, args),

        OperatorAdd => operators::add(args),
        OperatorSubtract => operators::subtract(args),
        OperatorMultiply => operators::multiply(args),
        OperatorDivide => operators::divide(args),
        OperatorMod => operators::modulo(args),
        OperatorRound => operators::round(args),
        OperatorRandom => operators::random(args),
        OperatorLt => operators::lt(args),
        OperatorEquals => operators::equals(args),
        OperatorGt => operators::gt(args),
        OperatorAnd => operators::and(args),
        OperatorOr => operators::or(args),
        OperatorNot => operators::not(args),
        OperatorJoin => operators::join(args),
        OperatorLetterOf => operators::letter_of(args),
        OperatorLength => operators::length(args),
        OperatorContains => operators::contains(args),
        OperatorMathop => operators::mathop(util, args),

        ProceduresCall => procedures::call(util, args),
        ArgumentReporterStringNumber => procedures::argument_string_number(util),
        ArgumentReporterBoolean => procedures::argument_boolean(util),

        MotionGotoXY => motion::goto_xy(util, args),
        MotionChangeXBy => motion::change_x_by(util, args),
        MotionChangeYBy => motion::change_y_by(util, args),
        MotionSetX => motion::set_x(util, args),
        MotionSetY => motion::set_y(util, args),
        MotionXPosition => motion::x_position(util),
        MotionYPosition => motion::y_position(util),

        LooksSay => looks::say(util, args),
        LooksShow => looks::set_visible(util, true),
        LooksHide => looks::set_visible(util, false),

        SensingTimer => sensing::timer(util),
        SensingResetTimer => sensing::reset_timer(util),
        SensingKeyPressed => sensing::key_pressed(util, args),
        SensingMouseX => sensing::mouse_x(util),
        SensingMouseY => sensing::mouse_y(util),
        SensingMouseDown => sensing::mouse_down(util),
        SensingUsername => sensing::username(util),
        SensingAskAndWait => sensing::ask_and_wait(util, args),
        SensingAnswer => sensing::answer(util),

        ControlCreateCloneOfMenu | EventBroadcastMenu | SensingKeyOptions => Ok(menu_value(util)),

        // hats and definitions only mark where a script starts
        ControlStartAsClone
        | EventWhenFlagClicked
        | EventWhenBroadcastReceived
        | EventWhenKeyPressed
        | EventWhenThisSpriteClicked
        | ProceduresDefinition
        | ProceduresPrototype => Ok(Flow::Done),

        Unknown(name) => run_extension(util, name, args),
    }
}

/// A menu shadow reports its single field
fn menu_value(util: &BlockUtility<'_>) -> Flow {
    let value = util
        .block()
        .and_then(|block| block.fields.values().next())
        .map(|field| Value::String(field.value.clone()))
        .unwrap_or_default();
    Flow::Value(value)
}

/// Run a host extension primitive, containing any panic as a fault.
fn run_extension(
    util: &mut BlockUtility<'_>,
    opcode: &str,
    args: &Args<'_>,
) -> PrimitiveResult {
    let Some(handler) = util.runtime.extension(opcode) else {
        trace!(opcode, "no primitive for opcode, skipping");
        return Ok(Flow::Done);
    };
    match catch_unwind(AssertUnwindSafe(|| handler(util, args))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(PrimitiveError::Panicked {
                opcode: opcode.to_string(),
                message,
            })
        }
    }
}
