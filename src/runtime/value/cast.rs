//! Number parsing, number formatting and list index resolution

use super::Value;
use rand::Rng;

/// Result of resolving a list index argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListIndex {
    /// A 1-based position inside the list
    Index(usize),
    /// The whole list (`"all"`)
    All,
    /// Out of range or not an index at all
    Invalid,
}

/// Parse a string the way a script author expects numbers to parse.
///
/// Surrounding whitespace is ignored, the empty string is `0`, and `Infinity`, hex
/// (`0x`), binary (`0b`) and octal (`0o`) literals are accepted. Anything else that is
/// not a plain decimal literal is NaN.
pub fn parse_number(source: &str) -> f64 {
    let s = source.trim();
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0b") | Some("0B") => Some(2),
        Some("0o") | Some("0O") => Some(8),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&s[2..], radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }

    // f64's parser also takes "inf" and "nan", which are not numbers here
    let decimal = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !decimal {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Format a number the way it shows up in a say bubble or a joined string.
///
/// Integers print without a fractional part, `-0` prints as `0`, and very large or very
/// small magnitudes switch to exponent notation (`1e+21`, `1e-7`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if magnitude >= 1e21 {
        let formatted = format!("{:e}", n);
        return formatted.replacen('e', "e+", 1);
    }
    if magnitude < 1e-6 {
        return format!("{:e}", n);
    }
    format!("{}", n)
}

/// Resolve a list index argument: `all`, `last`, `random`/`any`, or a 1-based number.
pub fn to_list_index(
    index: &Value,
    length: usize,
    accept_all: bool,
) -> ListIndex {
    if let Value::String(s) = index {
        match s.as_str() {
            "all" => {
                return if accept_all {
                    ListIndex::All
                } else {
                    ListIndex::Invalid
                };
            }
            "last" => {
                return if length > 0 {
                    ListIndex::Index(length)
                } else {
                    ListIndex::Invalid
                };
            }
            "random" | "any" => {
                return if length > 0 {
                    ListIndex::Index(rand::rng().random_range(1..=length))
                } else {
                    ListIndex::Invalid
                };
            }
            _ => {}
        }
    }

    let n = index.to_number().floor();
    if n < 1.0 || n > length as f64 {
        ListIndex::Invalid
    } else {
        ListIndex::Index(n as usize)
    }
}
