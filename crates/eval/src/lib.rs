//! Tessera dispatch engine -- resolves raw records to registered types
//! and builds typed values from them.
//!
//! A [`Registry`] holds declared types and families. [`resolve`] picks the
//! single family member a record matches, using the family's discriminator
//! index and each member's match predicate. [`build`] coerces a record into
//! a typed [`Instance`], resolving nested family fields as it goes, and
//! [`flatten`] turns an instance back into a raw record with discriminators
//! restored.
//!
//! ```
//! use serde_json::json;
//! use tessera_core::{FamilyDecl, FieldType, TypeDecl};
//! use tessera_eval::{build, flatten, Registry};
//!
//! let mut registry = Registry::new();
//! registry.declare_family(FamilyDecl::new("Vehicle").discriminator("type"));
//! let car = TypeDecl::new("Car")
//!     .field_default("type", FieldType::Text, "car")
//!     .field_default("num_doors", FieldType::Int, 4);
//! registry.register("Vehicle", car, None).unwrap();
//!
//! let record = json!({"type": "car", "num_doors": "2"});
//! let instance = build(&registry, "Vehicle", record.as_object().unwrap()).unwrap();
//! assert_eq!(instance.type_name, "Car");
//! assert_eq!(flatten(&registry, &instance)["num_doors"], json!(2));
//! ```

pub mod build;
pub mod compare;
pub mod flatten;
pub mod predicate;
pub mod registry;
pub mod resolve;
pub mod values;

pub use build::{build, build_type, coerce};
pub use compare::{compare_values, values_equal, Incomparable};
pub use flatten::{flatten, flatten_value};
pub use predicate::{eval_pred, pred_matches};
pub use registry::Registry;
pub use resolve::resolve;
pub use values::{value_to_json, Instance, Value};
