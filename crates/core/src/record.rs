//! Raw records: the untyped exchange format at the engine boundary.
//!
//! A raw record is a JSON object. Values are null, booleans, numbers,
//! strings, arrays or nested objects; everything the engine reads from
//! the outside world arrives in this shape, and `flatten` produces it.

use std::fmt;

use crate::error::DispatchError;

/// A single raw value.
pub type RawValue = serde_json::Value;

/// A string-keyed raw record.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// A dotted path (`"engine.kind"`) split into its segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> FieldPath {
        FieldPath {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when the path has more than one segment.
    pub fn is_dotted(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::parse(path)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Read the value at `path`, descending through nested records.
///
/// A missing single-segment key is a `MissingField`; any failure on a
/// dotted path (absent key or a non-record in the middle) is a `MissingKey`
/// naming the segment where the walk stopped.
pub fn lookup<'a>(record: &'a RawRecord, path: &FieldPath) -> Result<&'a RawValue, DispatchError> {
    let missing = |key: &str| {
        if path.is_dotted() {
            DispatchError::MissingKey {
                path: path.to_string(),
                key: key.to_string(),
            }
        } else {
            DispatchError::MissingField {
                field: key.to_string(),
            }
        }
    };

    let (last, parents) = match path.segments.split_last() {
        Some(split) => split,
        None => return Err(missing("")),
    };
    let mut current = record;
    for segment in parents {
        match current.get(segment) {
            Some(RawValue::Object(inner)) => current = inner,
            _ => return Err(missing(segment)),
        }
    }
    current.get(last).ok_or_else(|| missing(last))
}

/// True when `path` resolves to a value (including an explicit null).
pub fn contains_path(record: &RawRecord, path: &FieldPath) -> bool {
    lookup(record, path).is_ok()
}

/// Write `value` at `path`, creating intermediate records as needed.
///
/// An intermediate segment holding a non-record value is replaced by a
/// fresh record.
pub fn insert_path(record: &mut RawRecord, path: &FieldPath, value: RawValue) {
    let Some((last, parents)) = path.segments.split_last() else {
        return;
    };
    let mut current = record;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| RawValue::Object(RawRecord::new()));
        if !slot.is_object() {
            *slot = RawValue::Object(RawRecord::new());
        }
        current = match slot {
            RawValue::Object(inner) => inner,
            _ => return,
        };
    }
    current.insert(last.clone(), value);
}

/// Truthiness of a raw value: null, `false`, zero, and empty strings,
/// arrays and records are false.
pub fn is_truthy(v: &RawValue) -> bool {
    match v {
        RawValue::Null => false,
        RawValue::Bool(b) => *b,
        RawValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        RawValue::String(s) => !s.is_empty(),
        RawValue::Array(items) => !items.is_empty(),
        RawValue::Object(fields) => !fields.is_empty(),
    }
}

/// Textual form of a raw value, as used by string predicates.
///
/// Null has no textual form.
pub fn text_form(v: &RawValue) -> Option<String> {
    match v {
        RawValue::Null => None,
        RawValue::String(s) => Some(s.clone()),
        RawValue::Bool(b) => Some(b.to_string()),
        RawValue::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Canonical key used to bucket discriminator values.
///
/// Integral floats collapse onto their integer spelling so `4` and `4.0`
/// share a bucket; strings keep their quotes so `"4"` does not.
pub fn index_key(v: &RawValue) -> String {
    canonical(v).to_string()
}

fn canonical(v: &RawValue) -> RawValue {
    match v {
        RawValue::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                        return RawValue::from(f as i64);
                    }
                }
            }
            v.clone()
        }
        RawValue::Array(items) => RawValue::Array(items.iter().map(canonical).collect()),
        RawValue::Object(fields) => RawValue::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), canonical(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Return a descriptive type name for a raw value (for error messages).
pub fn json_type_name(v: &RawValue) -> &'static str {
    match v {
        RawValue::Null => "null",
        RawValue::Bool(_) => "boolean",
        RawValue::Number(_) => "number",
        RawValue::String(_) => "string",
        RawValue::Array(_) => "array",
        RawValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: RawValue) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn lookup_single_segment() {
        let r = rec(json!({"type": "car"}));
        assert_eq!(lookup(&r, &"type".into()).unwrap(), &json!("car"));
    }

    #[test]
    fn lookup_missing_single_segment_is_missing_field() {
        let r = rec(json!({}));
        assert_eq!(
            lookup(&r, &"type".into()),
            Err(DispatchError::MissingField {
                field: "type".to_string()
            })
        );
    }

    #[test]
    fn lookup_dotted_descends_record() {
        let r = rec(json!({"engine": {"kind": "electric"}}));
        assert_eq!(
            lookup(&r, &"engine.kind".into()).unwrap(),
            &json!("electric")
        );
    }

    #[test]
    fn lookup_dotted_stops_at_non_record() {
        let r = rec(json!({"engine": 3}));
        assert_eq!(
            lookup(&r, &"engine.kind".into()),
            Err(DispatchError::MissingKey {
                path: "engine.kind".to_string(),
                key: "engine".to_string(),
            })
        );
    }

    #[test]
    fn explicit_null_counts_as_present() {
        let r = rec(json!({"new_attr": null}));
        assert!(contains_path(&r, &"new_attr".into()));
        assert!(!contains_path(&r, &"other".into()));
    }

    #[test]
    fn insert_path_creates_intermediate_records() {
        let mut r = RawRecord::new();
        insert_path(&mut r, &"engine.kind".into(), json!("electric"));
        assert_eq!(RawValue::Object(r), json!({"engine": {"kind": "electric"}}));
    }

    #[test]
    fn insert_path_keeps_siblings() {
        let mut r = rec(json!({"engine": {"kwh": 75}}));
        insert_path(&mut r, &"engine.kind".into(), json!("electric"));
        assert_eq!(
            RawValue::Object(r),
            json!({"engine": {"kwh": 75, "kind": "electric"}})
        );
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!(4)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!({"a": 1})));
    }

    #[test]
    fn index_key_merges_integral_floats() {
        assert_eq!(index_key(&json!(4)), index_key(&json!(4.0)));
        assert_ne!(index_key(&json!(4)), index_key(&json!("4")));
        assert_ne!(index_key(&json!(4.5)), index_key(&json!(4)));
    }

    #[test]
    fn text_form_of_scalars() {
        assert_eq!(text_form(&json!(null)), None);
        assert_eq!(text_form(&json!("Van")), Some("Van".to_string()));
        assert_eq!(text_form(&json!(4)), Some("4".to_string()));
        assert_eq!(text_form(&json!(true)), Some("true".to_string()));
    }
}
