//! Construction of typed values from raw records.
//!
//! `build` walks a type's field schema in declaration order and coerces
//! each raw field value to its declared type, re-entering the resolver for
//! every field whose type is a family. Fields the schema does not name are
//! ignored. Nothing is returned until every field has succeeded.

use std::path::PathBuf;

use rust_decimal::Decimal;
use tessera_core::record::{json_type_name, RawRecord, RawValue};
use tessera_core::schema::{FieldType, TypeDecl};
use tessera_core::DispatchError;
use tracing::{debug, trace};

use crate::compare::values_equal;
use crate::registry::Registry;
use crate::resolve::resolve;
use crate::values::{parse_date, parse_datetime, parse_time, Instance, Value};

/// Build a typed value for `target`, which names either a family or a type.
///
/// A family is resolved against `record` first; a type is built directly.
pub fn build(registry: &Registry, target: &str, record: &RawRecord) -> Result<Instance, DispatchError> {
    let decl = if registry.is_family(target) {
        resolve(registry, target, record)?
    } else {
        registry
            .get_type(target)
            .ok_or_else(|| DispatchError::UnknownType {
                name: target.to_string(),
            })?
    };
    build_type(registry, decl, record)
}

/// Build `decl` from `record` without resolution.
pub fn build_type(
    registry: &Registry,
    decl: &TypeDecl,
    record: &RawRecord,
) -> Result<Instance, DispatchError> {
    let mut fields = Vec::with_capacity(decl.fields.len());
    for f in &decl.fields {
        let raw = match (record.get(&f.name), &f.default) {
            (Some(raw), _) => raw,
            (None, Some(default)) => {
                trace!(type_name = %decl.name, field = %f.name, "using declared default");
                default
            }
            (None, None) => {
                return Err(DispatchError::MissingField {
                    field: f.name.clone(),
                })
            }
        };
        trace!(type_name = %decl.name, field = %f.name, ty = %f.ty, "coercing field");
        let value = coerce(registry, &f.ty, raw).map_err(|e| e.within(&f.name))?;
        fields.push((f.name.clone(), value));
    }
    Ok(Instance {
        type_name: decl.name.clone(),
        fields,
    })
}

/// Coerce one raw value to `ty`.
///
/// Errors carry a field path relative to `raw` (empty for `raw` itself);
/// callers prefix it with [`DispatchError::within`].
pub fn coerce(registry: &Registry, ty: &FieldType, raw: &RawValue) -> Result<Value, DispatchError> {
    match ty {
        FieldType::Any => Ok(Value::Raw(raw.clone())),

        FieldType::Null => match raw {
            RawValue::Null => Ok(Value::Null),
            _ => Err(mismatch(ty, raw)),
        },

        FieldType::Bool => match raw {
            RawValue::Bool(b) => Ok(Value::Bool(*b)),
            RawValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(malformed(format!("'{}' is not a boolean", s))),
            },
            RawValue::Number(n) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(malformed(format!("{} is not a boolean", n))),
            },
            _ => Err(mismatch(ty, raw)),
        },

        FieldType::Int => match raw {
            RawValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Value::Int(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::Int(f as i64)),
                    _ => Err(malformed(format!("{} is not a 64-bit integer", n))),
                }
            }
            RawValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| malformed(format!("invalid integer '{}': {}", s, e))),
            _ => Err(mismatch(ty, raw)),
        },

        FieldType::Float => match raw {
            RawValue::Number(n) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| malformed(format!("{} is not a float", n))),
            RawValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| malformed(format!("invalid float '{}': {}", s, e))),
            _ => Err(mismatch(ty, raw)),
        },

        FieldType::Decimal => {
            let text = match raw {
                RawValue::Number(n) => n.to_string(),
                RawValue::String(s) => s.trim().to_string(),
                _ => return Err(mismatch(ty, raw)),
            };
            text.parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(&text))
                .map(Value::Decimal)
                .map_err(|e| malformed(format!("invalid decimal '{}': {}", text, e)))
        }

        FieldType::Text => match raw {
            RawValue::String(s) => Ok(Value::Text(s.clone())),
            RawValue::Number(n) => Ok(Value::Text(n.to_string())),
            RawValue::Bool(b) => Ok(Value::Text(b.to_string())),
            _ => Err(mismatch(ty, raw)),
        },

        FieldType::Date => {
            let s = expect_text(ty, raw)?;
            parse_date(s).map(Value::Date).map_err(malformed)
        }

        FieldType::DateTime => {
            let s = expect_text(ty, raw)?;
            parse_datetime(s).map_err(malformed)
        }

        FieldType::Time => {
            let s = expect_text(ty, raw)?;
            parse_time(s).map(Value::Time).map_err(malformed)
        }

        FieldType::Path => {
            let s = expect_text(ty, raw)?;
            Ok(Value::Path(PathBuf::from(s)))
        }

        FieldType::Object(name) => {
            let record = raw.as_object().ok_or_else(|| mismatch(ty, raw))?;
            build(registry, name, record).map(Value::Object)
        }

        FieldType::Family(name) => {
            let record = raw.as_object().ok_or_else(|| mismatch(ty, raw))?;
            if !registry.is_family(name) {
                return Err(DispatchError::UnknownFamily { name: name.clone() });
            }
            build(registry, name, record).map(Value::Object)
        }

        FieldType::Optional(inner) => match raw {
            RawValue::Null => Ok(Value::Null),
            _ => coerce(registry, inner, raw),
        },

        FieldType::List(inner) => {
            let items = raw.as_array().ok_or_else(|| mismatch(ty, raw))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    coerce(registry, inner, item).map_err(|e| e.within(&format!("[{}]", i)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }

        FieldType::Tuple { items, variadic } => {
            let elements = raw.as_array().ok_or_else(|| mismatch(ty, raw))?;
            let arity_ok = if *variadic {
                elements.len() + 1 >= items.len()
            } else {
                elements.len() == items.len()
            };
            if !arity_ok {
                return Err(malformed(format!(
                    "expected {} elements for {}, got {}",
                    items.len(),
                    ty,
                    elements.len()
                )));
            }
            let mut out = Vec::with_capacity(elements.len());
            for (i, element) in elements.iter().enumerate() {
                let element_ty = match items.get(i) {
                    Some(t) => t,
                    None => match (variadic, items.last()) {
                        (true, Some(last)) => last,
                        _ => {
                            return Err(malformed(format!(
                                "unexpected element at position {} for {}",
                                i, ty
                            )))
                        }
                    },
                };
                out.push(
                    coerce(registry, element_ty, element)
                        .map_err(|e| e.within(&format!("[{}]", i)))?,
                );
            }
            Ok(Value::Tuple(out))
        }

        FieldType::Map(key_ty, value_ty) => {
            let entries = raw.as_object().ok_or_else(|| mismatch(ty, raw))?;
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let path = format!("{{{}}}", k);
                let key = coerce(registry, key_ty, &RawValue::String(k.clone()))
                    .map_err(|e| e.within(&path))?;
                let value = coerce(registry, value_ty, v).map_err(|e| e.within(&path))?;
                out.push((key, value));
            }
            Ok(Value::Map(out))
        }

        FieldType::Union(alternatives) => {
            for alternative in alternatives {
                match coerce(registry, alternative, raw) {
                    Ok(value) => return Ok(value),
                    Err(err) => debug!(%alternative, %err, "union alternative rejected"),
                }
            }
            Err(mismatch(ty, raw))
        }

        FieldType::Literal(choices) => {
            if choices.iter().any(|c| values_equal(c, raw)) {
                Ok(plain_value(raw))
            } else {
                let listed: Vec<String> = choices.iter().map(ToString::to_string).collect();
                Err(malformed(format!(
                    "{} is not one of [{}]",
                    raw,
                    listed.join(", ")
                )))
            }
        }
    }
}

/// Typed form of a scalar that needs no declared type.
fn plain_value(raw: &RawValue) -> Value {
    match raw {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(*b),
        RawValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or_else(|| Value::Raw(raw.clone())),
        },
        RawValue::String(s) => Value::Text(s.clone()),
        other => Value::Raw(other.clone()),
    }
}

fn expect_text<'a>(ty: &FieldType, raw: &'a RawValue) -> Result<&'a str, DispatchError> {
    raw.as_str().ok_or_else(|| mismatch(ty, raw))
}

fn mismatch(expected: &FieldType, raw: &RawValue) -> DispatchError {
    DispatchError::TypeMismatch {
        field: String::new(),
        expected: expected.to_string(),
        got: json_type_name(raw).to_string(),
    }
}

fn malformed(reason: String) -> DispatchError {
    DispatchError::Malformed {
        field: String::new(),
        reason,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
