//! Operator primitives. All pure except `random`.

use super::{Args, Flow, PrimitiveResult};
use crate::runtime::scheduler::BlockUtility;
use crate::runtime::value::Value;
use crate::util::math::{deg_to_rad, rad_to_deg, round_to, tan};
use rand::Rng;
use std::cmp::Ordering;

fn number(n: f64) -> PrimitiveResult {
    Ok(Flow::Value(Value::Number(n)))
}

fn boolean(b: bool) -> PrimitiveResult {
    Ok(Flow::Value(Value::Bool(b)))
}

pub(super) fn add(args: &Args<'_>) -> PrimitiveResult {
    number(args.number("NUM1") + args.number("NUM2"))
}

pub(super) fn subtract(args: &Args<'_>) -> PrimitiveResult {
    number(args.number("NUM1") - args.number("NUM2"))
}

pub(super) fn multiply(args: &Args<'_>) -> PrimitiveResult {
    number(args.number("NUM1") * args.number("NUM2"))
}

pub(super) fn divide(args: &Args<'_>) -> PrimitiveResult {
    number(args.number("NUM1") / args.number("NUM2"))
}

/// Remainder with the sign of the divisor
pub(super) fn modulo(args: &Args<'_>) -> PrimitiveResult {
    let n = args.number("NUM1");
    let modulus = args.number("NUM2");
    let mut result = n % modulus;
    if result / modulus < 0.0 {
        result += modulus;
    }
    number(result)
}

/// Half rounds up, so `-2.5` rounds to `-2`
pub(super) fn round(args: &Args<'_>) -> PrimitiveResult {
    number((args.number("NUM") + 0.5).floor())
}

/// Integer when both bounds read as integers, otherwise a float in the range.
pub(super) fn random(args: &Args<'_>) -> PrimitiveResult {
    let (from, to) = (args.value("FROM"), args.value("TO"));
    let (n1, n2) = (from.to_number(), to.to_number());
    let (low, high) = if n1 <= n2 { (n1, n2) } else { (n2, n1) };
    if low == high {
        return number(low);
    }
    let r: f64 = rand::rng().random();
    if from.is_int() && to.is_int() {
        number(low + (r * (high + 1.0 - low)).floor())
    } else {
        number(r * (high - low) + low)
    }
}

pub(super) fn lt(args: &Args<'_>) -> PrimitiveResult {
    boolean(args.value("OPERAND1").compare(&args.value("OPERAND2")) == Ordering::Less)
}

pub(super) fn equals(args: &Args<'_>) -> PrimitiveResult {
    boolean(args.value("OPERAND1").compare(&args.value("OPERAND2")) == Ordering::Equal)
}

pub(super) fn gt(args: &Args<'_>) -> PrimitiveResult {
    boolean(args.value("OPERAND1").compare(&args.value("OPERAND2")) == Ordering::Greater)
}

pub(super) fn and(args: &Args<'_>) -> PrimitiveResult {
    boolean(args.boolean("OPERAND1") && args.boolean("OPERAND2"))
}

pub(super) fn or(args: &Args<'_>) -> PrimitiveResult {
    boolean(args.boolean("OPERAND1") || args.boolean("OPERAND2"))
}

pub(super) fn not(args: &Args<'_>) -> PrimitiveResult {
    boolean(!args.boolean("OPERAND"))
}

pub(super) fn join(args: &Args<'_>) -> PrimitiveResult {
    let joined = args.string("STRING1") + &args.string("STRING2");
    Ok(Flow::Value(Value::String(joined)))
}

/// 1-based character; out of range is the empty string
pub(super) fn letter_of(args: &Args<'_>) -> PrimitiveResult {
    let index = args.number("LETTER") - 1.0;
    let text = args.string("STRING");
    let letter = if index < 0.0 {
        None
    } else {
        text.chars().nth(index as usize)
    };
    let letter = letter.map(String::from).unwrap_or_default();
    Ok(Flow::Value(Value::String(letter)))
}

pub(super) fn length(args: &Args<'_>) -> PrimitiveResult {
    number(args.string("STRING").chars().count() as f64)
}

pub(super) fn contains(args: &Args<'_>) -> PrimitiveResult {
    let haystack = args.string("STRING1").to_lowercase();
    let needle = args.string("STRING2").to_lowercase();
    boolean(haystack.contains(&needle))
}

/// Math function chosen by the `OPERATOR` field. Angles are in degrees.
pub(super) fn mathop(
    util: &BlockUtility<'_>,
    args: &Args<'_>,
) -> PrimitiveResult {
    let n = args.number("NUM");
    let result = match util
        .field("OPERATOR")
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "abs" => n.abs(),
        "floor" => n.floor(),
        "ceiling" => n.ceil(),
        "sqrt" => n.sqrt(),
        "sin" => round_to(deg_to_rad(n).sin(), 10),
        "cos" => round_to(deg_to_rad(n).cos(), 10),
        "tan" => tan(n),
        "asin" => rad_to_deg(n.asin()),
        "acos" => rad_to_deg(n.acos()),
        "atan" => rad_to_deg(n.atan()),
        "ln" => n.ln(),
        "log" => n.log10(),
        "e ^" => n.exp(),
        "10 ^" => 10f64.powf(n),
        _ => 0.0,
    };
    number(result)
}
