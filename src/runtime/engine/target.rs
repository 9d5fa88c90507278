//! Actors: the stage, sprites and their clones

use crate::runtime::graph::Blocks;
use crate::runtime::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Unique actor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Target({})", self.0)
    }
}

/// Identifier of a sprite: an original actor plus its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SpriteId(pub u32);

/// Program graph and clone roster shared by an original actor and its clones
#[derive(Debug, Clone)]
pub struct Sprite {
    pub name: String,
    pub blocks: Arc<Blocks>,
    /// The actor loaded from the project
    pub original: TargetId,
    pub clones: Vec<TargetId>,
}

/// Variable flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Scalar,
    List,
}

/// Stored value of a variable
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Scalar(Value),
    List(Vec<Value>),
}

/// A named variable or list owned by an actor
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: String,
    pub name: String,
    pub value: VariableValue,
    /// Synced with the cloud provider (stage scalars only)
    pub is_cloud: bool,
}

impl Variable {
    /// A scalar variable holding `0`
    pub fn scalar(
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: VariableValue::Scalar(Value::Number(0.0)),
            is_cloud: false,
        }
    }

    /// An empty list
    pub fn list(
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: VariableValue::List(Vec::new()),
            is_cloud: false,
        }
    }

    pub fn kind(&self) -> VariableKind {
        match self.value {
            VariableValue::Scalar(_) => VariableKind::Scalar,
            VariableValue::List(_) => VariableKind::List,
        }
    }

    /// Scalar value; lists read as their joined contents
    pub fn get(&self) -> Value {
        match &self.value {
            VariableValue::Scalar(value) => value.clone(),
            VariableValue::List(items) => Value::String(join_list(items)),
        }
    }

    /// Overwrite a scalar. Lists are left alone.
    pub fn set(
        &mut self,
        value: Value,
    ) {
        if let VariableValue::Scalar(current) = &mut self.value {
            *current = value;
        }
    }

    /// List items, or `None` for a scalar
    pub fn items_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.value {
            VariableValue::List(items) => Some(items),
            VariableValue::Scalar(_) => None,
        }
    }

    pub fn items(&self) -> Option<&[Value]> {
        match &self.value {
            VariableValue::List(items) => Some(items),
            VariableValue::Scalar(_) => None,
        }
    }
}

/// Join list items for display: no separator when every item is a single character.
pub fn join_list(items: &[Value]) -> String {
    let strings: Vec<String> = items.iter().map(Value::to_string).collect();
    let single_chars = strings.iter().all(|s| s.chars().count() == 1);
    strings.join(if single_chars { "" } else { " " })
}

/// An actor: the stage, a sprite, or a clone of a sprite
#[derive(Debug, Clone)]
pub struct Target {
    id: TargetId,
    pub sprite: SpriteId,
    pub name: String,
    pub is_stage: bool,
    pub is_original: bool,
    /// Variables and lists keyed by id
    pub variables: IndexMap<String, Variable>,
    pub x: f64,
    pub y: f64,
    pub visible: bool,
    /// Speech bubble text
    pub say: Option<String>,
}

impl Target {
    pub fn new(
        id: TargetId,
        sprite: SpriteId,
        name: impl Into<String>,
        is_stage: bool,
    ) -> Self {
        Self {
            id,
            sprite,
            name: name.into(),
            is_stage,
            is_original: true,
            variables: IndexMap::new(),
            x: 0.0,
            y: 0.0,
            visible: true,
            say: None,
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Copy of this actor under a new id: variables and position carry over.
    pub fn make_clone(
        &self,
        id: TargetId,
    ) -> Self {
        Self {
            id,
            is_original: false,
            say: None,
            ..self.clone()
        }
    }

    /// Add or replace a variable
    pub fn insert_variable(
        &mut self,
        variable: Variable,
    ) {
        self.variables.insert(variable.id.clone(), variable);
    }

    /// Key of a variable with this id and kind
    pub fn find_variable_by_id(
        &self,
        id: &str,
        kind: VariableKind,
    ) -> Option<&str> {
        self.variables
            .get_key_value(id)
            .filter(|(_, var)| var.kind() == kind)
            .map(|(key, _)| key.as_str())
    }

    /// Key of the first variable with this name and kind
    pub fn find_variable_by_name(
        &self,
        name: &str,
        kind: VariableKind,
    ) -> Option<&str> {
        self.variables
            .iter()
            .find(|(_, var)| var.name == name && var.kind() == kind)
            .map(|(key, _)| key.as_str())
    }

    /// Variable by name and kind
    pub fn variable_by_name(
        &self,
        name: &str,
        kind: VariableKind,
    ) -> Option<&Variable> {
        self.find_variable_by_name(name, kind)
            .and_then(|key| self.variables.get(key))
    }

    /// Set the position, snapping away float noise.
    pub fn set_xy(
        &mut self,
        x: f64,
        y: f64,
    ) {
        self.x = limit_precision(x);
        self.y = limit_precision(y);
    }
}

/// Snap coordinates within 1e-9 of an integer onto it
fn limit_precision(coordinate: f64) -> f64 {
    let rounded = coordinate.round();
    if (coordinate - rounded).abs() < 1e-9 {
        rounded
    } else {
        coordinate
    }
}
