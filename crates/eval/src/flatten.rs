//! Typed values back to raw records.

use tessera_core::record::{insert_path, RawRecord, RawValue};
use tracing::trace;

use crate::registry::Registry;
use crate::values::{format_date, format_datetime, format_time, format_zoned, Instance, Value};

/// Flatten an instance to a raw record.
///
/// Fields are emitted in schema order. When the instance's type is a
/// registered family member, every discriminator's static value is written
/// back (into nested records for dotted paths) so the result resolves to
/// the same type again.
pub fn flatten(registry: &Registry, instance: &Instance) -> RawRecord {
    let mut record = RawRecord::new();
    for (name, value) in &instance.fields {
        record.insert(name.clone(), flatten_value(registry, value));
    }
    if let Some(statics) = registry.static_values(&instance.type_name) {
        for (path, value) in statics {
            trace!(type_name = %instance.type_name, attr = %path, "writing back discriminator");
            insert_path(&mut record, path, value.clone());
        }
    }
    record
}

/// Flatten a single typed value. Non-finite floats become null.
pub fn flatten_value(registry: &Registry, value: &Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Bool(*b),
        Value::Int(i) => RawValue::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(RawValue::Number)
            .unwrap_or(RawValue::Null),
        Value::Decimal(d) => RawValue::String(d.to_string()),
        Value::Text(s) => RawValue::String(s.clone()),
        Value::Date(d) => RawValue::String(format_date(d)),
        Value::DateTime(dt) => RawValue::String(format_datetime(dt)),
        Value::ZonedDateTime(dt) => RawValue::String(format_zoned(dt)),
        Value::Time(t) => RawValue::String(format_time(t)),
        Value::Path(p) => RawValue::String(p.to_string_lossy().into_owned()),
        Value::Object(instance) => RawValue::Object(flatten(registry, instance)),
        Value::List(items) | Value::Tuple(items) => {
            RawValue::Array(items.iter().map(|v| flatten_value(registry, v)).collect())
        }
        Value::Map(entries) => {
            let mut out = RawRecord::new();
            for (k, v) in entries {
                out.insert(map_key(registry, k), flatten_value(registry, v));
            }
            RawValue::Object(out)
        }
        Value::Raw(raw) => raw.clone(),
    }
}

/// Record keys are strings; other keys use their JSON text.
fn map_key(registry: &Registry, key: &Value) -> String {
    match flatten_value(registry, key) {
        RawValue::String(s) => s,
        other => other.to_string(),
    }
}
