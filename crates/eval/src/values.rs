//! Typed runtime values produced by `build`.

use std::path::PathBuf;

use rust_decimal::Decimal;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use tessera_core::record::RawValue;

/// A fully coerced value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(Date),
    /// Date and time without a UTC offset.
    DateTime(PrimitiveDateTime),
    /// Date and time with a UTC offset.
    ZonedDateTime(OffsetDateTime),
    Time(Time),
    Path(PathBuf),
    Object(Instance),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Entries in the order the raw record listed them.
    Map(Vec<(Value, Value)>),
    /// Uncoerced raw value for `any` fields.
    Raw(RawValue),
}

/// A built instance of a concrete type. Fields are in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl Instance {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Value {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Decimal(_) => "Decimal",
            Value::Text(_) => "Text",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::ZonedDateTime(_) => "ZonedDateTime",
            Value::Time(_) => "Time",
            Value::Path(_) => "Path",
            Value::Object(_) => "Object",
            Value::List(_) => "List",
            Value::Tuple(_) => "Tuple",
            Value::Map(_) => "Map",
            Value::Raw(_) => "Raw",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

// ──────────────────────────────────────────────
// ISO 8601 text forms
// ──────────────────────────────────────────────

pub(crate) fn parse_date(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("invalid date '{}': {}", s, e))
}

/// Accepts RFC 3339 (offset-bearing) text, naive `YYYY-MM-DDTHH:MM[:SS[.f]]`
/// with `T` or a space, and a bare date meaning midnight.
pub(crate) fn parse_datetime(s: &str) -> Result<Value, String> {
    if let Ok(zoned) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(Value::ZonedDateTime(zoned));
    }
    let normalized = s.replacen(' ', "T", 1);
    let naive = PrimitiveDateTime::parse(
        &normalized,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            &normalized,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            &normalized,
            format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        )
    });
    match naive {
        Ok(dt) => Ok(Value::DateTime(dt)),
        Err(e) => match parse_date(s) {
            Ok(date) => Ok(Value::DateTime(date.midnight())),
            Err(_) => Err(format!("invalid datetime '{}': {}", s, e)),
        },
    }
}

pub(crate) fn parse_time(s: &str) -> Result<Time, String> {
    Time::parse(s, format_description!("[hour]:[minute]:[second].[subsecond]"))
        .or_else(|_| Time::parse(s, format_description!("[hour]:[minute]:[second]")))
        .or_else(|_| Time::parse(s, format_description!("[hour]:[minute]")))
        .map_err(|e| format!("invalid time '{}': {}", s, e))
}

pub(crate) fn format_date(d: &Date) -> String {
    d.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| d.to_string())
}

pub(crate) fn format_datetime(dt: &PrimitiveDateTime) -> String {
    let formatted = if dt.nanosecond() == 0 {
        dt.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
    } else {
        dt.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"
        ))
    };
    formatted.unwrap_or_else(|_| dt.to_string())
}

pub(crate) fn format_zoned(dt: &OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string())
}

pub(crate) fn format_time(t: &Time) -> String {
    let formatted = if t.nanosecond() == 0 {
        t.format(format_description!("[hour]:[minute]:[second]"))
    } else {
        t.format(format_description!("[hour]:[minute]:[second].[subsecond]"))
    };
    formatted.unwrap_or_else(|_| t.to_string())
}

/// Convert a typed value to tagged JSON for display.
///
/// Unlike `flatten`, the output keeps every coerced type visible and does
/// not write back discriminators.
pub fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::json!({ "kind": "null_value" }),
        Value::Bool(b) => serde_json::json!({ "kind": "bool_value", "value": b }),
        Value::Int(i) => serde_json::json!({ "kind": "int_value", "value": i }),
        Value::Float(f) => serde_json::json!({ "kind": "float_value", "value": f }),
        Value::Decimal(d) => serde_json::json!({ "kind": "decimal_value", "value": d.to_string() }),
        Value::Text(t) => serde_json::json!({ "kind": "text_value", "value": t }),
        Value::Date(d) => serde_json::json!({ "kind": "date_value", "value": format_date(d) }),
        Value::DateTime(dt) => {
            serde_json::json!({ "kind": "datetime_value", "value": format_datetime(dt) })
        }
        Value::ZonedDateTime(dt) => {
            serde_json::json!({ "kind": "datetime_value", "value": format_zoned(dt) })
        }
        Value::Time(t) => serde_json::json!({ "kind": "time_value", "value": format_time(t) }),
        Value::Path(p) => {
            serde_json::json!({ "kind": "path_value", "value": p.to_string_lossy() })
        }
        Value::Object(instance) => {
            let mut fields = serde_json::Map::new();
            for (k, v) in &instance.fields {
                fields.insert(k.clone(), value_to_json(v));
            }
            serde_json::json!({
                "kind": "object_value",
                "type": instance.type_name,
                "fields": fields,
            })
        }
        Value::List(items) => {
            let arr: Vec<serde_json::Value> = items.iter().map(value_to_json).collect();
            serde_json::json!({ "kind": "list_value", "elements": arr })
        }
        Value::Tuple(items) => {
            let arr: Vec<serde_json::Value> = items.iter().map(value_to_json).collect();
            serde_json::json!({ "kind": "tuple_value", "elements": arr })
        }
        Value::Map(entries) => {
            let arr: Vec<serde_json::Value> = entries
                .iter()
                .map(|(k, v)| serde_json::json!({ "key": value_to_json(k), "value": value_to_json(v) }))
                .collect();
            serde_json::json!({ "kind": "map_value", "entries": arr })
        }
        Value::Raw(raw) => serde_json::json!({ "kind": "raw_value", "value": raw }),
    }
}
