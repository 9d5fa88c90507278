//! Runtime events and the queue they wait in until the end of a pass

use crate::runtime::engine::TargetId;
use crate::runtime::graph::Opcode;
use std::collections::VecDeque;

/// Something that starts every script under a matching hat
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub hat: Opcode,
    /// Hat fields that must match, compared case-insensitively
    pub fields: Vec<(String, String)>,
    /// Only scripts of this actor
    pub target: Option<TargetId>,
}

impl Event {
    pub fn new(hat: Opcode) -> Self {
        Self {
            hat,
            fields: Vec::new(),
            target: None,
        }
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn for_target(
        mut self,
        target: TargetId,
    ) -> Self {
        self.target = Some(target);
        self
    }

    pub fn green_flag() -> Self {
        Self::new(Opcode::EventWhenFlagClicked)
    }

    pub fn broadcast(message: impl Into<String>) -> Self {
        Self::new(Opcode::EventWhenBroadcastReceived).with_field("BROADCAST_OPTION", message)
    }

    /// Key press, using key names such as `space`, `A` or `any`
    pub fn key_pressed(key: impl Into<String>) -> Self {
        Self::new(Opcode::EventWhenKeyPressed).with_field("KEY_OPTION", key)
    }

    pub fn clicked(target: TargetId) -> Self {
        Self::new(Opcode::EventWhenThisSpriteClicked).for_target(target)
    }

    pub fn clone_start(target: TargetId) -> Self {
        Self::new(Opcode::ControlStartAsClone).for_target(target)
    }
}

/// FIFO of events waiting for dispatch
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        event: Event,
    ) {
        self.events.push_back(event);
    }

    /// Take every queued event, oldest first
    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}
