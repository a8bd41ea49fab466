//! Field schemas: the static shape of every type the engine can build.

use std::fmt;

use crate::predicate::Predicate;
use crate::record::{FieldPath, RawValue};

/// Declared type of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Raw value passed through untouched.
    Any,
    Null,
    Bool,
    Int,
    Float,
    /// Exact decimal, from a number or numeric text.
    Decimal,
    Text,
    /// ISO 8601 calendar date, `YYYY-MM-DD`.
    Date,
    /// ISO 8601 date and time, with or without a UTC offset.
    DateTime,
    /// ISO 8601 time of day.
    Time,
    Path,
    /// A nested concrete type, built directly.
    Object(String),
    /// A dispatch family, resolved before building.
    Family(String),
    Optional(Box<FieldType>),
    List(Box<FieldType>),
    /// Positional elements; when `variadic`, the last element type repeats.
    Tuple { items: Vec<FieldType>, variadic: bool },
    Map(Box<FieldType>, Box<FieldType>),
    /// Alternatives tried in declaration order.
    Union(Vec<FieldType>),
    /// The raw value must equal one of these.
    Literal(Vec<RawValue>),
}

impl FieldType {
    pub fn object(name: &str) -> FieldType {
        FieldType::Object(name.to_string())
    }

    pub fn family(name: &str) -> FieldType {
        FieldType::Family(name.to_string())
    }

    pub fn optional(inner: FieldType) -> FieldType {
        FieldType::Optional(Box::new(inner))
    }

    pub fn list(inner: FieldType) -> FieldType {
        FieldType::List(Box::new(inner))
    }

    pub fn map(key: FieldType, value: FieldType) -> FieldType {
        FieldType::Map(Box::new(key), Box::new(value))
    }

    pub fn tuple(items: Vec<FieldType>) -> FieldType {
        FieldType::Tuple {
            items,
            variadic: false,
        }
    }

    pub fn variadic(items: Vec<FieldType>) -> FieldType {
        FieldType::Tuple {
            items,
            variadic: true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |items: &[FieldType]| {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            FieldType::Any => write!(f, "any"),
            FieldType::Null => write!(f, "null"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::Decimal => write!(f, "decimal"),
            FieldType::Text => write!(f, "str"),
            FieldType::Date => write!(f, "date"),
            FieldType::DateTime => write!(f, "datetime"),
            FieldType::Time => write!(f, "time"),
            FieldType::Path => write!(f, "path"),
            FieldType::Object(name) | FieldType::Family(name) => write!(f, "{}", name),
            FieldType::Optional(inner) => write!(f, "optional[{}]", inner),
            FieldType::List(inner) => write!(f, "list[{}]", inner),
            FieldType::Tuple { items, variadic } => {
                if *variadic {
                    write!(f, "tuple[{}, ...]", join(items))
                } else {
                    write!(f, "tuple[{}]", join(items))
                }
            }
            FieldType::Map(k, v) => write!(f, "map[{}, {}]", k, v),
            FieldType::Union(items) => write!(f, "union[{}]", join(items)),
            FieldType::Literal(values) => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "literal[{}]", values.join(", "))
            }
        }
    }
}

/// One entry of a type's field schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: FieldType,
    /// Raw default used when the record omits the field.
    pub default: Option<RawValue>,
}

/// A concrete type: an ordered field schema plus an optional match predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    /// Predicate carried by the declaration itself. An explicit predicate
    /// given at registration takes precedence.
    pub matcher: Option<Predicate>,
}

impl TypeDecl {
    pub fn new(name: &str) -> TypeDecl {
        TypeDecl {
            name: name.to_string(),
            fields: Vec::new(),
            matcher: None,
        }
    }

    pub fn field(mut self, name: &str, ty: FieldType) -> Self {
        self.push_field(name, ty, None);
        self
    }

    pub fn field_default(mut self, name: &str, ty: FieldType, default: impl Into<RawValue>) -> Self {
        self.push_field(name, ty, Some(default.into()));
        self
    }

    pub fn matching(mut self, predicate: impl Into<Predicate>) -> Self {
        self.matcher = Some(predicate.into());
        self
    }

    /// Declaring a field twice replaces the earlier entry in place.
    fn push_field(&mut self, name: &str, ty: FieldType, default: Option<RawValue>) {
        let decl = FieldDecl {
            name: name.to_string(),
            ty,
            default,
        };
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => *existing = decl,
            None => self.fields.push(decl),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A dispatch family and its exact-match discriminator attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDecl {
    pub name: String,
    pub discriminators: Vec<FieldPath>,
}

impl FamilyDecl {
    pub fn new(name: &str) -> FamilyDecl {
        FamilyDecl {
            name: name.to_string(),
            discriminators: Vec::new(),
        }
    }

    pub fn discriminator(mut self, path: &str) -> Self {
        self.discriminators.push(FieldPath::parse(path));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_keep_declaration_order() {
        let car = TypeDecl::new("Car")
            .field_default("type", FieldType::Text, "car")
            .field_default("num_doors", FieldType::Int, 4)
            .field("engine", FieldType::family("Engine"));
        let names: Vec<&str> = car.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["type", "num_doors", "engine"]);
        assert_eq!(car.get_field("type").unwrap().default, Some(json!("car")));
        assert_eq!(car.get_field("engine").unwrap().default, None);
    }

    #[test]
    fn redeclared_field_replaces_in_place() {
        let t = TypeDecl::new("T")
            .field("a", FieldType::Int)
            .field("b", FieldType::Int)
            .field_default("a", FieldType::Float, 1.5);
        assert_eq!(t.fields.len(), 2);
        assert_eq!(t.fields[0].ty, FieldType::Float);
    }

    #[test]
    fn display_nested_types() {
        let ty = FieldType::map(
            FieldType::Text,
            FieldType::list(FieldType::optional(FieldType::family("Engine"))),
        );
        assert_eq!(ty.to_string(), "map[str, list[optional[Engine]]]");
        assert_eq!(
            FieldType::variadic(vec![FieldType::Int, FieldType::Text]).to_string(),
            "tuple[int, str, ...]"
        );
    }
}
