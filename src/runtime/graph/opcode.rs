//! Block opcodes
//!
//! Opcodes are parsed once, when a block is created, into a closed enum so the
//! interpreter dispatches with a `match` instead of a string lookup. Names that are not
//! built in are kept verbatim in [`Opcode::Unknown`]: they may belong to a host
//! extension, and they must survive a save/load round trip either way.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// How a hat opcode treats a thread that is already running its script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HatInfo {
    /// Restart the running thread from the top instead of leaving it alone
    pub restart_existing: bool,
}

macro_rules! opcodes {
    ($($variant:ident => $name:literal,)*) => {
        /// Operation tag of a block
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($variant,)*
            /// An opcode without a built-in primitive
            Unknown(String),
        }

        impl Opcode {
            /// The opcode's serialized name
            pub fn as_str(&self) -> &str {
                match self {
                    $(Opcode::$variant => $name,)*
                    Opcode::Unknown(name) => name,
                }
            }
        }

        static BY_NAME: Lazy<HashMap<&'static str, Opcode>> = Lazy::new(|| {
            let mut table = HashMap::new();
            $(table.insert($name, Opcode::$variant);)*
            table
        });
    };
}

opcodes! {
    // control
    ControlForever => "control_forever",
    ControlRepeat => "control_repeat",
    ControlRepeatUntil => "control_repeat_until",
    ControlWhile => "control_while",
    ControlIf => "control_if",
    ControlIfElse => "control_if_else",
    ControlWait => "control_wait",
    ControlWaitUntil => "control_wait_until",
    ControlStop => "control_stop",
    ControlCreateCloneOf => "control_create_clone_of",
    ControlCreateCloneOfMenu => "control_create_clone_of_menu",
    ControlDeleteThisClone => "control_delete_this_clone",
    ControlStartAsClone => "control_start_as_clone",
    ControlAllAtOnce => "control_all_at_once",
    // event
    EventWhenFlagClicked => "event_whenflagclicked",
    EventWhenBroadcastReceived => "event_whenbroadcastreceived",
    EventWhenKeyPressed => "event_whenkeypressed",
    EventWhenThisSpriteClicked => "event_whenthisspriteclicked",
    EventBroadcast => "event_broadcast",
    EventBroadcastAndWait => "event_broadcastandwait",
    EventBroadcastMenu => "event_broadcast_menu",
    // data
    DataVariable => "data_variable",
    DataSetVariableTo => "data_setvariableto",
    DataChangeVariableBy => "data_changevariableby",
    DataListContents => "data_listcontents",
    DataAddToList => "data_addtolist",
    DataDeleteOfList => "data_deleteoflist",
    DataDeleteAllOfList => "data_deletealloflist",
    DataInsertAtList => "data_insertatlist",
    DataReplaceItemOfList => "data_replaceitemoflist",
    DataItemOfList => "data_itemoflist",
    DataLengthOfList => "data_lengthoflist",
    DataListContainsItem => "data_listcontainsitem",
    // operators
    OperatorAdd => "operator_add",
    OperatorSubtract => "operator_subtract",
    OperatorMultiply => "operator_multiply",
    OperatorDivide => "operator_divide",
    OperatorMod => "operator_mod",
    OperatorRound => "operator_round",
    OperatorRandom => "operator_random",
    OperatorLt => "operator_lt",
    OperatorEquals => "operator_equals",
    OperatorGt => "operator_gt",
    OperatorAnd => "operator_and",
    OperatorOr => "operator_or",
    OperatorNot => "operator_not",
    OperatorJoin => "operator_join",
    OperatorLetterOf => "operator_letter_of",
    OperatorLength => "operator_length",
    OperatorContains => "operator_contains",
    OperatorMathop => "operator_mathop",
    // procedures
    ProceduresDefinition => "procedures_definition",
    ProceduresPrototype => "procedures_prototype",
    ProceduresCall => "procedures_call",
    ArgumentReporterStringNumber => "argument_reporter_string_number",
    ArgumentReporterBoolean => "argument_reporter_boolean",
    // motion
    MotionGotoXY => "motion_gotoxy",
    MotionChangeXBy => "motion_changexby",
    MotionChangeYBy => "motion_changeyby",
    MotionSetX => "motion_setx",
    MotionSetY => "motion_sety",
    MotionXPosition => "motion_xposition",
    MotionYPosition => "motion_yposition",
    // looks
    LooksSay => "looks_say",
    LooksShow => "looks_show",
    LooksHide => "looks_hide",
    // sensing
    SensingTimer => "sensing_timer",
    SensingResetTimer => "sensing_resettimer",
    SensingKeyPressed => "sensing_keypressed",
    SensingKeyOptions => "sensing_keyoptions",
    SensingMouseX => "sensing_mousex",
    SensingMouseY => "sensing_mousey",
    SensingMouseDown => "sensing_mousedown",
    SensingUsername => "sensing_username",
    SensingAskAndWait => "sensing_askandwait",
    SensingAnswer => "sensing_answer",
}

impl Opcode {
    /// Parse a serialized opcode name. Never fails: unknown names are kept as-is.
    pub fn parse(name: &str) -> Self {
        BY_NAME
            .get(name)
            .cloned()
            .unwrap_or_else(|| Opcode::Unknown(name.to_string()))
    }

    /// Hat behaviour, or `None` when the opcode does not start scripts on events
    pub fn hat(&self) -> Option<HatInfo> {
        let restart_existing = match self {
            Opcode::EventWhenFlagClicked
            | Opcode::EventWhenBroadcastReceived
            | Opcode::EventWhenThisSpriteClicked => true,
            Opcode::EventWhenKeyPressed | Opcode::ControlStartAsClone => false,
            _ => return None,
        };
        Some(HatInfo { restart_existing })
    }

    /// Menu shadows report the value of their single field.
    pub fn is_menu(&self) -> bool {
        matches!(
            self,
            Opcode::ControlCreateCloneOfMenu | Opcode::EventBroadcastMenu | Opcode::SensingKeyOptions
        )
    }

    /// Whether the opcode has a built-in primitive
    pub fn is_known(&self) -> bool {
        !matches!(self, Opcode::Unknown(_))
    }
}

impl From<&str> for Opcode {
    fn from(name: &str) -> Self {
        Opcode::parse(name)
    }
}

impl fmt::Display for Opcode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
