//! Keyboard state

use super::{IoContext, IoDevice};
use crate::runtime::engine::Event;
use crate::runtime::value::Value;
use tracing::trace;

/// Key names understood by key hats and `key pressed?`
const KEY_NAMES: [&str; 7] = [
    "space",
    "left arrow",
    "up arrow",
    "right arrow",
    "down arrow",
    "enter",
    "any",
];

/// A key going down or up
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    /// Host key string: a character, or a name such as `ArrowLeft` or `Enter`
    pub key: String,
    pub is_down: bool,
}

impl KeyEvent {
    pub fn down(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_down: true,
        }
    }

    pub fn up(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_down: false,
        }
    }
}

/// Keys currently held down, by key name
#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    keys_pressed: Vec<String>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key is held. Accepts key names, char codes and `any`.
    pub fn key_is_down(
        &self,
        key: &Value,
    ) -> bool {
        let Some(key) = key_arg_to_name(key) else {
            return false;
        };
        if key == "any" {
            return !self.keys_pressed.is_empty();
        }
        self.keys_pressed.iter().any(|pressed| *pressed == key)
    }

    /// Names of the keys held down, oldest first
    pub fn pressed(&self) -> &[String] {
        &self.keys_pressed
    }
}

impl IoDevice for Keyboard {
    type Data = KeyEvent;

    fn post_data(
        &mut self,
        data: KeyEvent,
        cx: &mut IoContext<'_>,
    ) {
        let Some(key) = normalize_key(&data.key) else {
            trace!(key = %data.key, "ignoring key");
            return;
        };
        if data.is_down {
            cx.events.push(Event::key_pressed(key.clone()));
            cx.events.push(Event::key_pressed("any"));
            if !self.keys_pressed.contains(&key) {
                self.keys_pressed.push(key);
            }
        } else {
            self.keys_pressed.retain(|pressed| *pressed != key);
        }
    }
}

/// Map a host key string to a key name; `None` for keys scripts cannot see.
pub fn normalize_key(key: &str) -> Option<String> {
    let name = match key {
        " " => "space",
        "ArrowLeft" | "Left" => "left arrow",
        "ArrowUp" | "Up" => "up arrow",
        "ArrowRight" | "Right" => "right arrow",
        "ArrowDown" | "Down" => "down arrow",
        "Enter" => "enter",
        _ => {
            let mut chars = key.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c.to_uppercase().collect()),
                _ => None,
            };
        }
    };
    Some(name.to_string())
}

/// Map a `key pressed?` argument to a key name
fn key_arg_to_name(key: &Value) -> Option<String> {
    if let Value::Number(code) = key {
        let code = *code;
        if (48.0..=90.0).contains(&code) && code.fract() == 0.0 {
            return char::from_u32(code as u32).map(String::from);
        }
        let name = match code as i64 {
            32 => "space",
            37 => "left arrow",
            38 => "up arrow",
            39 => "right arrow",
            40 => "down arrow",
            _ => "",
        };
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    let text = key.to_string();
    if KEY_NAMES.contains(&text.as_str()) {
        return Some(text);
    }
    text.chars().next().map(|c| c.to_uppercase().collect())
}
