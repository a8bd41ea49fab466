//! tessera-core: data model for rule-based type dispatch.
//!
//! Raw records come in as JSON-shaped values. Types declare an ordered
//! field schema and, optionally, a match predicate; families group types
//! and name the discriminator attributes used for exact-match indexing.
//! The resolution and construction algorithms live in `tessera-eval`.
//!
//! # Public API
//!
//! - [`RawRecord`], [`RawValue`], [`FieldPath`] -- the boundary format
//! - [`Predicate`] and the [`field`] builder -- match rules
//! - [`FieldType`], [`TypeDecl`], [`FamilyDecl`] -- schemas
//! - [`Catalogue`] -- declarative JSON/TOML type catalogues
//! - [`DispatchError`], [`CatalogueError`] -- error taxonomy

pub mod catalogue;
pub mod error;
pub mod predicate;
pub mod record;
pub mod schema;

pub use catalogue::{Catalogue, CatalogueDoc};
pub use error::{CatalogueError, DispatchError};
pub use predicate::{all_of, any_of, field, CompareOp, Expr, FieldDefault, Operand, Predicate, StringOp};
pub use record::{FieldPath, RawRecord, RawValue};
pub use schema::{FamilyDecl, FieldDecl, FieldType, TypeDecl};
