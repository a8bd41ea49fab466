//! Predicate evaluation against raw records.
//!
//! The predicate tree is a recursive structure. Each node evaluates to a
//! raw value: booleans for logical, comparison and most string nodes, and
//! arbitrary values for field references and the plain text view.
//!
//! Only a strict field reference can fail. Every combinator, comparison and
//! string transform folds a failing operand into `false`, so match tests
//! are best-effort and never abort resolution.

use tessera_core::predicate::{FieldDefault, Operand, Predicate, StringOp};
use tessera_core::record::{contains_path, is_truthy, lookup, text_form, RawRecord, RawValue};
use tessera_core::DispatchError;
use tracing::trace;

use crate::compare::compare_values;

/// Evaluate a predicate to a value.
///
/// Dotted field paths such as `engine.kind` descend the record's nested
/// objects. They are not resolved against any type's schema; the schema
/// walk only happens when a family member's discriminator values are
/// registered.
///
/// Returns `MissingField`/`MissingKey` only when the node itself is a strict
/// field reference whose path is absent.
pub fn eval_pred(pred: &Predicate, record: &RawRecord) -> Result<RawValue, DispatchError> {
    match pred {
        Predicate::FieldRef { path, default } => match lookup(record, path) {
            Ok(v) => Ok(v.clone()),
            Err(err) => match default {
                FieldDefault::Strict => Err(err),
                FieldDefault::Value(v) => Ok(v.clone()),
            },
        },

        Predicate::FieldExists(path) => Ok(RawValue::Bool(contains_path(record, path))),

        Predicate::Literal(b) => Ok(RawValue::Bool(*b)),

        Predicate::Not(inner) => Ok(RawValue::Bool(!truth(inner, record))),

        Predicate::And(left, right) => {
            Ok(RawValue::Bool(truth(left, record) && truth(right, record)))
        }

        Predicate::Or(left, right) => {
            Ok(RawValue::Bool(truth(left, record) || truth(right, record)))
        }

        Predicate::Compare { op, left, right } => {
            let result = match (eval_operand(left, record), eval_operand(right, record)) {
                (Ok(l), Ok(r)) => compare_values(&l, &r, *op).unwrap_or_else(|err| {
                    trace!(%err, "comparison folded to false");
                    false
                }),
                (Err(err), _) | (_, Err(err)) => {
                    trace!(%err, "comparison operand failed, folded to false");
                    false
                }
            };
            Ok(RawValue::Bool(result))
        }

        Predicate::StringTransform { op, inner } => {
            let text = eval_pred(inner, record).ok().and_then(|v| text_form(&v));
            Ok(apply_string_op(op, text))
        }
    }
}

/// Evaluate a predicate as a match test. Any failure is `false`.
pub fn pred_matches(pred: &Predicate, record: &RawRecord) -> bool {
    truth(pred, record)
}

fn truth(pred: &Predicate, record: &RawRecord) -> bool {
    match eval_pred(pred, record) {
        Ok(v) => is_truthy(&v),
        Err(err) => {
            trace!(%err, "predicate failed, folded to false");
            false
        }
    }
}

fn eval_operand(operand: &Operand, record: &RawRecord) -> Result<RawValue, DispatchError> {
    match operand {
        Operand::Expr(p) => eval_pred(p, record),
        Operand::Value(v) => Ok(v.clone()),
    }
}

/// A missing text input yields null for the plain text view and `false`
/// for every transform.
fn apply_string_op(op: &StringOp, text: Option<String>) -> RawValue {
    let Some(s) = text else {
        return match op {
            StringOp::Text => RawValue::Null,
            _ => RawValue::Bool(false),
        };
    };
    match op {
        StringOp::Text => RawValue::String(s),
        StringOp::Lower => RawValue::String(s.to_lowercase()),
        StringOp::Upper => RawValue::String(s.to_uppercase()),
        StringOp::Strip => RawValue::String(s.trim().to_string()),
        StringOp::EqIgnoreCase(other) => RawValue::Bool(s.to_lowercase() == other.to_lowercase()),
        StringOp::StartsWith(prefix) => RawValue::Bool(s.starts_with(prefix.as_str())),
        StringOp::EndsWith(suffix) => RawValue::Bool(s.ends_with(suffix.as_str())),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_core::predicate::{field, Expr};

    fn rec(v: RawValue) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn field_ref_reads_value() {
        let r = rec(json!({"num_doors": 4}));
        assert_eq!(eval_pred(&field("num_doors").into(), &r).unwrap(), json!(4));
    }

    #[test]
    fn field_ref_default_on_absence() {
        let r = rec(json!({}));
        assert_eq!(eval_pred(&field("num_doors").into(), &r).unwrap(), json!(null));
        assert_eq!(
            eval_pred(&field("num_doors").or_default(2).into(), &r).unwrap(),
            json!(2)
        );
    }

    #[test]
    fn strict_field_ref_surfaces_missing_field() {
        let r = rec(json!({}));
        assert_eq!(
            eval_pred(&field("num_doors").strict().into(), &r),
            Err(DispatchError::MissingField {
                field: "num_doors".to_string()
            })
        );
    }

    #[test]
    fn strict_dotted_field_ref_surfaces_missing_key() {
        let r = rec(json!({"engine": {}}));
        assert_eq!(
            eval_pred(&field("engine.kind").strict().into(), &r),
            Err(DispatchError::MissingKey {
                path: "engine.kind".to_string(),
                key: "kind".to_string()
            })
        );
    }

    #[test]
    fn strict_failure_inside_combinator_folds_to_false() {
        let r = rec(json!({}));
        let missing: Predicate = field("x").strict().into();
        assert!(!pred_matches(&missing.clone().and(true), &r));
        assert!(pred_matches(&missing.clone().or(true), &r));
        assert!(pred_matches(&missing.clone().negate(), &r));
        assert!(!pred_matches(&missing.equals(json!(null)), &r));
    }

    #[test]
    fn dotted_field_ref_descends_record() {
        let r = rec(json!({"engine": {"kind": "electric"}}));
        assert!(pred_matches(&field("engine.kind").equals("electric"), &r));
    }

    #[test]
    fn exists_sees_explicit_null() {
        let r = rec(json!({"new_attr": null}));
        assert!(pred_matches(&field("new_attr").exists(), &r));
        assert!(!pred_matches(&field("other").exists(), &r));
    }

    #[test]
    fn eq_ignore_case() {
        let r = rec(json!({"type": "CAR"}));
        assert!(pred_matches(&field("type").str().eq_ignore_case("car"), &r));
        assert!(!pred_matches(&field("type").equals("car"), &r));
    }

    #[test]
    fn string_view_of_number() {
        let r = rec(json!({"num_doors": 4}));
        assert!(pred_matches(&field("num_doors").str().equals("4"), &r));
        assert!(pred_matches(&field("num_doors").str().starts_with("4"), &r));
    }

    #[test]
    fn string_transform_of_absent_field_is_false() {
        let r = rec(json!({}));
        assert_eq!(
            eval_pred(&field("type").str().lower(), &r).unwrap(),
            json!(false)
        );
        assert!(!pred_matches(&field("type").str().lower().equals("bicycle"), &r));
        assert_eq!(eval_pred(&field("type").str().into(), &r).unwrap(), json!(null));
    }

    #[test]
    fn lower_then_compare() {
        let r = rec(json!({"type": "  Bicycle "}));
        let strip_lower = Predicate::StringTransform {
            op: StringOp::Lower,
            inner: Box::new(field("type").str().strip()),
        };
        assert!(pred_matches(&strip_lower.equals("bicycle"), &r));
        assert_eq!(
            eval_pred(&field("type").str().upper(), &r).unwrap(),
            json!("  BICYCLE ")
        );
    }

    #[test]
    fn type_error_in_ordering_folds_to_false() {
        let r = rec(json!({"num_doors": "four"}));
        assert!(!pred_matches(&field("num_doors").gt(2), &r));
        assert!(!pred_matches(&field("num_doors").le(2), &r));
    }

    #[test]
    fn one_of_and_contains() {
        let r = rec(json!({"kind": "van", "tags": ["cargo", "diesel"]}));
        assert!(pred_matches(&field("kind").one_of(json!(["car", "van"])), &r));
        assert!(!pred_matches(&field("kind").one_of(json!(["bus"])), &r));
        assert!(pred_matches(&field("tags").contains("diesel"), &r));
    }

    #[test]
    fn field_ref_operand_on_both_sides() {
        let r = rec(json!({"seats": 7, "max_seats": 9}));
        assert!(pred_matches(&field("seats").lt(field("max_seats")), &r));
    }

    #[test]
    fn bare_field_is_truthiness() {
        assert!(pred_matches(&field("enabled").into(), &rec(json!({"enabled": true}))));
        assert!(!pred_matches(&field("enabled").into(), &rec(json!({"enabled": 0}))));
        assert!(!pred_matches(&field("enabled").into(), &rec(json!({}))));
    }
}
