//! Match predicates: boolean expression trees over raw records.
//!
//! A type carries a predicate that decides whether a raw record describes
//! it. Trees are built once, with the builder API below or from catalogue
//! JSON, and are immutable afterwards. Evaluation lives in `tessera-eval`.
//!
//! ```
//! use tessera_core::predicate::{field, Expr};
//!
//! // type equals "car" ignoring case, or the record has four doors
//! let car = field("type")
//!     .str()
//!     .eq_ignore_case("car")
//!     .or(field("num_doors").equals(4));
//! # let _ = car;
//! ```

use std::fmt;

use crate::record::{FieldPath, RawValue};

/// What a field reference yields when its path is absent from the record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// Absence is a `MissingField`/`MissingKey` failure.
    Strict,
    /// Absence yields this value.
    Value(RawValue),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Left operand contains the right one (substring, array element or
    /// record key).
    Contains,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Contains => "contains",
        }
    }

    pub fn parse(op: &str) -> Option<CompareOp> {
        match op {
            "eq" | "==" | "=" => Some(CompareOp::Eq),
            "ne" | "!=" => Some(CompareOp::Ne),
            "gt" | ">" => Some(CompareOp::Gt),
            "ge" | ">=" => Some(CompareOp::Ge),
            "lt" | "<" => Some(CompareOp::Lt),
            "le" | "<=" => Some(CompareOp::Le),
            "contains" => Some(CompareOp::Contains),
            _ => None,
        }
    }
}

/// String transforms. Each one first takes the textual form of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringOp {
    /// Textual form, unchanged.
    Text,
    Lower,
    Upper,
    Strip,
    EqIgnoreCase(String),
    StartsWith(String),
    EndsWith(String),
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Expr(Box<Predicate>),
    Value(RawValue),
}

/// A predicate expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Value at a (possibly dotted) record path.
    FieldRef {
        path: FieldPath,
        default: FieldDefault,
    },
    /// Whether the path is present in the record.
    FieldExists(FieldPath),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    StringTransform {
        op: StringOp,
        inner: Box<Predicate>,
    },
    Literal(bool),
}

impl Predicate {
    /// The predicate stored for types that declare none.
    pub fn always() -> Predicate {
        Predicate::Literal(true)
    }
}

impl From<bool> for Predicate {
    fn from(b: bool) -> Self {
        Predicate::Literal(b)
    }
}

macro_rules! operand_from_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Operand {
                fn from(v: $t) -> Self {
                    Operand::Value(RawValue::from(v))
                }
            }
        )*
    };
}

operand_from_value!(RawValue, &str, String, bool, i32, i64, u32, u64, f64);

impl From<Predicate> for Operand {
    fn from(p: Predicate) -> Self {
        Operand::Expr(Box::new(p))
    }
}

impl From<Field> for Operand {
    fn from(f: Field) -> Self {
        Operand::Expr(Box::new(f.into()))
    }
}

/// Combinators shared by everything that can become a predicate.
pub trait Expr: Into<Predicate> + Sized {
    fn and(self, other: impl Into<Predicate>) -> Predicate {
        Predicate::And(Box::new(self.into()), Box::new(other.into()))
    }

    fn or(self, other: impl Into<Predicate>) -> Predicate {
        Predicate::Or(Box::new(self.into()), Box::new(other.into()))
    }

    fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self.into()))
    }

    fn compare(self, op: CompareOp, value: impl Into<Operand>) -> Predicate {
        Predicate::Compare {
            op,
            left: Operand::Expr(Box::new(self.into())),
            right: value.into(),
        }
    }

    fn equals(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    fn not_equals(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    fn gt(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    fn ge(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    fn lt(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    fn le(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    /// This value contains `value`.
    fn contains(self, value: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Contains, value)
    }

    /// This value is contained in `choices`.
    fn one_of(self, choices: impl Into<Operand>) -> Predicate {
        Predicate::Compare {
            op: CompareOp::Contains,
            left: choices.into(),
            right: Operand::Expr(Box::new(self.into())),
        }
    }
}

impl Expr for Predicate {}
impl Expr for Field {}
impl Expr for StringField {}

/// Start a field reference. Absent fields read as null unless made
/// [`strict`](Field::strict) or given another default.
pub fn field(path: &str) -> Field {
    Field {
        path: FieldPath::parse(path),
        default: FieldDefault::Value(RawValue::Null),
    }
}

/// Fold predicates with AND; an empty list is `true`.
pub fn all_of(preds: impl IntoIterator<Item = Predicate>) -> Predicate {
    preds
        .into_iter()
        .reduce(|acc, p| acc.and(p))
        .unwrap_or(Predicate::Literal(true))
}

/// Fold predicates with OR; an empty list is `false`.
pub fn any_of(preds: impl IntoIterator<Item = Predicate>) -> Predicate {
    preds
        .into_iter()
        .reduce(|acc, p| acc.or(p))
        .unwrap_or(Predicate::Literal(false))
}

/// Builder for a field reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    path: FieldPath,
    default: FieldDefault,
}

impl Field {
    /// Absence becomes a hard failure instead of a default.
    pub fn strict(mut self) -> Self {
        self.default = FieldDefault::Strict;
        self
    }

    pub fn or_default(mut self, value: impl Into<RawValue>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    pub fn exists(&self) -> Predicate {
        Predicate::FieldExists(self.path.clone())
    }

    /// View the field through its textual form.
    pub fn str(self) -> StringField {
        StringField { field: self }
    }
}

impl From<Field> for Predicate {
    fn from(f: Field) -> Self {
        Predicate::FieldRef {
            path: f.path,
            default: f.default,
        }
    }
}

/// A field read as text.
#[derive(Debug, Clone, PartialEq)]
pub struct StringField {
    field: Field,
}

impl StringField {
    fn transform(self, op: StringOp) -> Predicate {
        Predicate::StringTransform {
            op,
            inner: Box::new(self.field.into()),
        }
    }

    pub fn lower(self) -> Predicate {
        self.transform(StringOp::Lower)
    }

    pub fn upper(self) -> Predicate {
        self.transform(StringOp::Upper)
    }

    pub fn strip(self) -> Predicate {
        self.transform(StringOp::Strip)
    }

    pub fn starts_with(self, prefix: &str) -> Predicate {
        self.transform(StringOp::StartsWith(prefix.to_string()))
    }

    pub fn ends_with(self, suffix: &str) -> Predicate {
        self.transform(StringOp::EndsWith(suffix.to_string()))
    }

    pub fn eq_ignore_case(self, value: &str) -> Predicate {
        self.transform(StringOp::EqIgnoreCase(value.to_string()))
    }

    /// Equality against `value`, optionally ignoring case.
    pub fn eq_case(self, value: &str, case_insensitive: bool) -> Predicate {
        if case_insensitive {
            self.eq_ignore_case(value)
        } else {
            self.equals(value)
        }
    }
}

impl From<StringField> for Predicate {
    fn from(s: StringField) -> Self {
        s.transform(StringOp::Text)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Expr(p) => write!(f, "{}", p),
            Operand::Value(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::FieldRef { path, default } => match default {
                FieldDefault::Strict => write!(f, "{}!", path),
                FieldDefault::Value(RawValue::Null) => write!(f, "{}", path),
                FieldDefault::Value(v) => write!(f, "{}?{}", path, v),
            },
            Predicate::FieldExists(path) => write!(f, "exists({})", path),
            Predicate::Not(p) => write!(f, "!({})", p),
            Predicate::And(l, r) => write!(f, "({} & {})", l, r),
            Predicate::Or(l, r) => write!(f, "({} | {})", l, r),
            Predicate::Compare { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Predicate::StringTransform { op, inner } => match op {
                StringOp::Text => write!(f, "str({})", inner),
                StringOp::Lower => write!(f, "lower({})", inner),
                StringOp::Upper => write!(f, "upper({})", inner),
                StringOp::Strip => write!(f, "strip({})", inner),
                StringOp::EqIgnoreCase(s) => write!(f, "({} ~= {:?})", inner, s),
                StringOp::StartsWith(s) => write!(f, "starts_with({}, {:?})", inner, s),
                StringOp::EndsWith(s) => write!(f, "ends_with({}, {:?})", inner, s),
            },
            Predicate::Literal(b) => write!(f, "{}", b),
        }
    }
}
