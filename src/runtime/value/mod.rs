//! Script values
//!
//! Block inputs, variables and reporter results all carry a [`Value`]. Values are
//! dynamically typed: every primitive casts its arguments to what it needs with the
//! helpers in [`cast`], and casting never fails.

pub mod cast;

pub use cast::ListIndex;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A dynamically typed script value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
}

impl Default for Value {
    /// Missing inputs and unknown reporters evaluate to the empty string.
    fn default() -> Self {
        Value::String(String::new())
    }
}

impl Value {
    /// Cast to a number. Anything non-numeric (including NaN) becomes `0`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) if n.is_nan() => 0.0,
            Value::Number(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::String(s) => {
                let n = cast::parse_number(s);
                if n.is_nan() {
                    0.0
                } else {
                    n
                }
            }
        }
    }

    /// Cast to a boolean. `""`, `"0"` and `"false"` (any case) are false.
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        }
    }

    /// Compare two values the way the comparison operators do.
    ///
    /// Both sides are compared numerically when both look like numbers; whitespace-only
    /// strings never count as numbers. Otherwise the comparison is a case-insensitive
    /// string comparison.
    pub fn compare(
        &self,
        other: &Value,
    ) -> Ordering {
        let mut n1 = self.strict_number();
        let mut n2 = other.strict_number();
        if n1 == 0.0 && self.is_whitespace() {
            n1 = f64::NAN;
        } else if n2 == 0.0 && other.is_whitespace() {
            n2 = f64::NAN;
        }

        if n1.is_nan() || n2.is_nan() {
            let s1 = self.to_string().to_lowercase();
            let s2 = other.to_string().to_lowercase();
            return s1.cmp(&s2);
        }
        if n1.is_infinite() && n1 == n2 {
            return Ordering::Equal;
        }
        n1.partial_cmp(&n2).unwrap_or(Ordering::Equal)
    }

    /// Whether the value reads as an integer. Strings count when they have no decimal
    /// point; NaN counts too.
    pub fn is_int(&self) -> bool {
        match self {
            Value::Number(n) => n.is_nan() || n.fract() == 0.0,
            Value::Bool(_) => true,
            Value::String(s) => !s.contains('.'),
        }
    }

    /// Whether the value is a string made only of whitespace (or empty).
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Value::String(s) if s.trim().is_empty())
    }

    /// Resolve a list index argument against a list of `length` items.
    pub fn to_list_index(
        &self,
        length: usize,
        accept_all: bool,
    ) -> ListIndex {
        cast::to_list_index(self, length, accept_all)
    }

    /// Number conversion that keeps NaN for non-numeric input.
    fn strict_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::String(s) => cast::parse_number(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&cast::format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
