//! Declarative catalogues of types and dispatch families.
//!
//! A catalogue is a JSON (or TOML, via any serde format) document:
//!
//! ```json
//! {
//!   "types": [
//!     { "name": "Battery", "fields": [ { "name": "kwh", "type": "float" } ] }
//!   ],
//!   "families": [
//!     {
//!       "name": "Engine",
//!       "discriminators": ["kind"],
//!       "members": [
//!         {
//!           "name": "Electric",
//!           "fields": [
//!             { "name": "kind", "type": "str", "default": "electric" },
//!             { "name": "kwh", "type": "float" }
//!           ],
//!           "match": { "op": "gt", "left": { "field": "kwh" }, "right": 0 }
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! The outer shape is deserialized with serde and unknown keys are rejected.
//! Field types and predicates are kept as raw JSON and parsed by hand so
//! error messages can name the offending type and field.

use serde::{Deserialize, Deserializer};

use crate::error::CatalogueError;
use crate::predicate::{all_of, any_of, field, CompareOp, Operand, Predicate, StringOp};
use crate::record::{FieldPath, RawValue};
use crate::schema::{FamilyDecl, FieldDecl, FieldType, TypeDecl};

/// Catalogue document as written on disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogueDoc {
    #[serde(default)]
    pub types: Vec<TypeDoc>,
    #[serde(default)]
    pub families: Vec<FamilyDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDoc {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDoc>,
    #[serde(default, rename = "match")]
    pub matcher: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: serde_json::Value,
    /// Present-but-null is a null default, not "no default".
    #[serde(default, deserialize_with = "explicit_value")]
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FamilyDoc {
    pub name: String,
    #[serde(default)]
    pub discriminators: Vec<String>,
    #[serde(default)]
    pub members: Vec<TypeDoc>,
}

fn explicit_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(d).map(Some)
}

/// A parsed catalogue, ready to be registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogue {
    /// Plain (non-dispatch) types.
    pub types: Vec<TypeDecl>,
    /// Families with their members, in document order.
    pub families: Vec<(FamilyDecl, Vec<TypeDecl>)>,
}

impl Catalogue {
    pub fn from_json(v: &serde_json::Value) -> Result<Catalogue, CatalogueError> {
        let doc: CatalogueDoc = serde_json::from_value(v.clone())?;
        Catalogue::from_doc(&doc)
    }

    pub fn from_json_str(s: &str) -> Result<Catalogue, CatalogueError> {
        let doc: CatalogueDoc = serde_json::from_str(s)?;
        Catalogue::from_doc(&doc)
    }

    pub fn from_doc(doc: &CatalogueDoc) -> Result<Catalogue, CatalogueError> {
        let mut types = Vec::with_capacity(doc.types.len());
        for ty in &doc.types {
            if ty.matcher.is_some() {
                return Err(CatalogueError::Predicate {
                    owner: ty.name.clone(),
                    message: "match is only meaningful on family members".to_string(),
                });
            }
            types.push(parse_type_doc(ty)?);
        }
        let mut families = Vec::new();
        for family in &doc.families {
            let decl = FamilyDecl {
                name: family.name.clone(),
                discriminators: family
                    .discriminators
                    .iter()
                    .map(|d| FieldPath::parse(d))
                    .collect(),
            };
            let members = family
                .members
                .iter()
                .map(parse_type_doc)
                .collect::<Result<Vec<_>, _>>()?;
            families.push((decl, members));
        }
        Ok(Catalogue { types, families })
    }

    /// Number of declared types, family members included.
    pub fn type_count(&self) -> usize {
        self.types.len() + self.families.iter().map(|(_, m)| m.len()).sum::<usize>()
    }
}

fn parse_type_doc(doc: &TypeDoc) -> Result<TypeDecl, CatalogueError> {
    let mut fields = Vec::with_capacity(doc.fields.len());
    for f in &doc.fields {
        let ty = parse_field_type(&f.ty).map_err(|message| CatalogueError::FieldType {
            owner: doc.name.clone(),
            field: f.name.clone(),
            message,
        })?;
        fields.push(FieldDecl {
            name: f.name.clone(),
            ty,
            default: f.default.clone(),
        });
    }
    let matcher = match &doc.matcher {
        Some(m) => Some(
            parse_predicate(m).map_err(|message| CatalogueError::Predicate {
                owner: doc.name.clone(),
                message,
            })?,
        ),
        None => None,
    };
    Ok(TypeDecl {
        name: doc.name.clone(),
        fields,
        matcher,
    })
}

/// Parse a field type descriptor.
pub fn parse_field_type(v: &serde_json::Value) -> Result<FieldType, String> {
    if let Some(name) = v.as_str() {
        return match name {
            "any" => Ok(FieldType::Any),
            "null" | "none" => Ok(FieldType::Null),
            "bool" | "boolean" => Ok(FieldType::Bool),
            "int" | "integer" => Ok(FieldType::Int),
            "float" | "number" => Ok(FieldType::Float),
            "decimal" => Ok(FieldType::Decimal),
            "str" | "string" | "text" => Ok(FieldType::Text),
            "date" => Ok(FieldType::Date),
            "datetime" => Ok(FieldType::DateTime),
            "time" => Ok(FieldType::Time),
            "path" => Ok(FieldType::Path),
            other => Err(format!(
                "unknown primitive '{}'; use {{\"object\": ...}} or {{\"family\": ...}} for named types",
                other
            )),
        };
    }

    let obj = v
        .as_object()
        .ok_or_else(|| format!("field type must be a string or object, got {}", v))?;

    if let Some(name) = obj.get("object") {
        return name_of(name, "object").map(FieldType::Object);
    }
    if let Some(name) = obj.get("family") {
        return name_of(name, "family").map(FieldType::Family);
    }
    if let Some(inner) = obj.get("optional") {
        return Ok(FieldType::optional(parse_field_type(inner)?));
    }
    if let Some(inner) = obj.get("list") {
        return Ok(FieldType::list(parse_field_type(inner)?));
    }
    if let Some(items) = obj.get("tuple") {
        let items = parse_type_list(items, "tuple")?;
        let variadic = obj
            .get("variadic")
            .and_then(|b| b.as_bool())
            .unwrap_or(false);
        if variadic && items.is_empty() {
            return Err("variadic tuple needs at least one element type".to_string());
        }
        return Ok(FieldType::Tuple { items, variadic });
    }
    if let Some(pair) = obj.get("map") {
        let mut kv = parse_type_list(pair, "map")?;
        if kv.len() != 2 {
            return Err(format!("map needs [key, value] types, got {}", kv.len()));
        }
        let value = kv.pop().unwrap_or(FieldType::Any);
        let key = kv.pop().unwrap_or(FieldType::Any);
        return Ok(FieldType::map(key, value));
    }
    if let Some(items) = obj.get("union") {
        let items = parse_type_list(items, "union")?;
        if items.is_empty() {
            return Err("union needs at least one alternative".to_string());
        }
        return Ok(FieldType::Union(items));
    }
    if let Some(values) = obj.get("literal") {
        let values = values
            .as_array()
            .ok_or_else(|| "literal must list its allowed values".to_string())?;
        return Ok(FieldType::Literal(values.clone()));
    }
    Err(format!("unrecognised field type {}", v))
}

fn name_of(v: &serde_json::Value, what: &str) -> Result<String, String> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("'{}' must name a type", what))
}

fn parse_type_list(v: &serde_json::Value, what: &str) -> Result<Vec<FieldType>, String> {
    v.as_array()
        .ok_or_else(|| format!("'{}' must be an array of types", what))?
        .iter()
        .map(parse_field_type)
        .collect()
}

/// Parse a match predicate.
pub fn parse_predicate(v: &serde_json::Value) -> Result<Predicate, String> {
    if let Some(b) = v.as_bool() {
        return Ok(Predicate::Literal(b));
    }
    let obj = v
        .as_object()
        .ok_or_else(|| format!("predicate must be a boolean or object, got {}", v))?;

    if let Some(path) = obj.get("field") {
        let path = path
            .as_str()
            .ok_or_else(|| "'field' must be a path string".to_string())?;
        let strict = obj.get("strict").and_then(|s| s.as_bool()).unwrap_or(false);
        let f = match (strict, obj.get("default")) {
            (true, Some(_)) => {
                return Err(format!("field '{}' cannot be strict and have a default", path))
            }
            (true, None) => field(path).strict(),
            (false, Some(default)) => field(path).or_default(default.clone()),
            (false, None) => field(path),
        };
        return Ok(f.into());
    }

    if let Some(path) = obj.get("exists") {
        let path = path
            .as_str()
            .ok_or_else(|| "'exists' must be a path string".to_string())?;
        return Ok(Predicate::FieldExists(FieldPath::parse(path)));
    }

    if let Some(inner) = obj.get("not") {
        return Ok(Predicate::Not(Box::new(parse_predicate(inner)?)));
    }

    if let Some(items) = obj.get("and") {
        return Ok(all_of(parse_predicate_list(items, "and")?));
    }

    if let Some(items) = obj.get("or") {
        return Ok(any_of(parse_predicate_list(items, "or")?));
    }

    if let Some(op) = obj.get("op") {
        let op_name = op
            .as_str()
            .ok_or_else(|| "'op' must be a string".to_string())?;
        let op =
            CompareOp::parse(op_name).ok_or_else(|| format!("unknown operator '{}'", op_name))?;
        let left = parse_operand(
            obj.get("left")
                .ok_or_else(|| format!("{} missing 'left'", op_name))?,
        )?;
        let right = parse_operand(
            obj.get("right")
                .ok_or_else(|| format!("{} missing 'right'", op_name))?,
        )?;
        return Ok(Predicate::Compare { op, left, right });
    }

    if let Some(kind) = obj.get("str") {
        let kind = kind
            .as_str()
            .ok_or_else(|| "'str' must name a string transform".to_string())?;
        let inner = parse_predicate(
            obj.get("of")
                .ok_or_else(|| format!("str {} missing 'of'", kind))?,
        )?;
        let arg = || {
            obj.get("value")
                .and_then(|a| a.as_str())
                .map(str::to_string)
                .ok_or_else(|| format!("str {} missing string 'value'", kind))
        };
        let op = match kind {
            "text" => StringOp::Text,
            "lower" => StringOp::Lower,
            "upper" => StringOp::Upper,
            "strip" => StringOp::Strip,
            "eq_ignore_case" => StringOp::EqIgnoreCase(arg()?),
            "starts_with" => StringOp::StartsWith(arg()?),
            "ends_with" => StringOp::EndsWith(arg()?),
            other => return Err(format!("unknown string transform '{}'", other)),
        };
        return Ok(Predicate::StringTransform {
            op,
            inner: Box::new(inner),
        });
    }

    Err(format!("unrecognised predicate {}", v))
}

fn parse_predicate_list(v: &serde_json::Value, what: &str) -> Result<Vec<Predicate>, String> {
    v.as_array()
        .ok_or_else(|| format!("'{}' must be an array of predicates", what))?
        .iter()
        .map(parse_predicate)
        .collect()
}

/// Objects are predicates unless they are `{"value": v}` wrappers; any
/// other JSON is a literal.
fn parse_operand(v: &serde_json::Value) -> Result<Operand, String> {
    match v {
        RawValue::Object(obj) => match obj.get("value") {
            Some(literal) if obj.len() == 1 => Ok(Operand::Value(literal.clone())),
            _ => Ok(Operand::Expr(Box::new(parse_predicate(v)?))),
        },
        other => Ok(Operand::Value(other.clone())),
    }
}
