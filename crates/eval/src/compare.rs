//! Comparison of raw values for predicate evaluation.
//!
//! Numbers compare by value across integer and float spellings (`4 == 4.0`).
//! Ordering is defined between two numbers, two strings, two booleans or two
//! arrays (lexicographically); every other pairing is `Incomparable`, which
//! the predicate evaluator folds into `false`.

use std::cmp::Ordering;

use serde_json::Number;
use tessera_core::record::{json_type_name, RawValue};
use tessera_core::CompareOp;

/// An operator that cannot be applied to the given operand types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply '{op}' to {left} and {right}")]
pub struct Incomparable {
    pub op: &'static str,
    pub left: &'static str,
    pub right: &'static str,
}

/// Apply `op` to two evaluated operands.
///
/// `Contains` asks whether `left` contains `right`: a substring of a string,
/// an element of an array, or a key of a record.
pub fn compare_values(left: &RawValue, right: &RawValue, op: CompareOp) -> Result<bool, Incomparable> {
    let incomparable = || Incomparable {
        op: op.symbol(),
        left: json_type_name(left),
        right: json_type_name(right),
    };
    match op {
        CompareOp::Eq => Ok(values_equal(left, right)),
        CompareOp::Ne => Ok(!values_equal(left, right)),
        CompareOp::Gt => order(left, right).map(Ordering::is_gt).ok_or_else(incomparable),
        CompareOp::Ge => order(left, right).map(Ordering::is_ge).ok_or_else(incomparable),
        CompareOp::Lt => order(left, right).map(Ordering::is_lt).ok_or_else(incomparable),
        CompareOp::Le => order(left, right).map(Ordering::is_le).ok_or_else(incomparable),
        CompareOp::Contains => match (left, right) {
            (RawValue::String(haystack), RawValue::String(needle)) => {
                Ok(haystack.contains(needle.as_str()))
            }
            (RawValue::Array(items), needle) => Ok(items.iter().any(|i| values_equal(i, needle))),
            (RawValue::Object(fields), RawValue::String(key)) => Ok(fields.contains_key(key)),
            _ => Err(incomparable()),
        },
    }
}

/// Structural equality with numeric normalisation.
pub fn values_equal(left: &RawValue, right: &RawValue) -> bool {
    match (left, right) {
        (RawValue::Number(l), RawValue::Number(r)) => compare_numbers(l, r) == Some(Ordering::Equal),
        (RawValue::Array(l), RawValue::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        (RawValue::Object(l), RawValue::Object(r)) => {
            l.len() == r.len()
                && l
                    .iter()
                    .all(|(k, v)| r.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => left == right,
    }
}

fn order(left: &RawValue, right: &RawValue) -> Option<Ordering> {
    match (left, right) {
        (RawValue::Number(l), RawValue::Number(r)) => compare_numbers(l, r),
        (RawValue::String(l), RawValue::String(r)) => Some(l.cmp(r)),
        (RawValue::Bool(l), RawValue::Bool(r)) => Some(l.cmp(r)),
        (RawValue::Array(l), RawValue::Array(r)) => {
            for (a, b) in l.iter().zip(r) {
                match order(a, b)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(l.len().cmp(&r.len()))
        }
        _ => None,
    }
}

fn compare_numbers(l: &Number, r: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (l.as_u64(), r.as_u64()) {
        return Some(a.cmp(&b));
    }
    l.as_f64()?.partial_cmp(&r.as_f64()?)
}
