//! The type registry: declared types, families, and the per-family
//! attribute index used by the resolver.

use std::collections::{BTreeMap, BTreeSet};

use tessera_core::predicate::Predicate;
use tessera_core::record::{index_key, FieldPath, RawValue};
use tessera_core::schema::{FamilyDecl, FieldType, TypeDecl};
use tessera_core::{Catalogue, CatalogueError, DispatchError};
use tracing::{debug, warn};

// ──────────────────────────────────────────────
// Family index
// ──────────────────────────────────────────────

/// Index state for one family.
#[derive(Debug, Clone)]
pub(crate) struct FamilyIndex {
    pub(crate) decl: FamilyDecl,
    /// discriminator path -> canonical value key -> member types
    buckets: BTreeMap<FieldPath, BTreeMap<String, BTreeSet<String>>>,
    /// member type -> stored constraint (`Literal(true)` when none was given)
    constraints: BTreeMap<String, Predicate>,
    /// member type -> static discriminator values, in discriminator order
    statics: BTreeMap<String, Vec<(FieldPath, RawValue)>>,
}

impl FamilyIndex {
    fn new(decl: FamilyDecl) -> FamilyIndex {
        FamilyIndex {
            decl,
            buckets: BTreeMap::new(),
            constraints: BTreeMap::new(),
            statics: BTreeMap::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Member types sharing `value` for the discriminator at `path`.
    pub(crate) fn bucket(&self, path: &FieldPath, value: &RawValue) -> Option<&BTreeSet<String>> {
        self.buckets.get(path)?.get(&index_key(value))
    }

    pub(crate) fn constraints(&self) -> impl Iterator<Item = (&String, &Predicate)> {
        self.constraints.iter()
    }

    pub(crate) fn constraint(&self, type_name: &str) -> Option<&Predicate> {
        self.constraints.get(type_name)
    }

    fn remove_member(&mut self, type_name: &str) {
        for values in self.buckets.values_mut() {
            for members in values.values_mut() {
                members.remove(type_name);
            }
            values.retain(|_, members| !members.is_empty());
        }
        self.constraints.remove(type_name);
        self.statics.remove(type_name);
    }
}

// ──────────────────────────────────────────────
// Registry
// ──────────────────────────────────────────────

/// Owns every declared type and family.
///
/// Mutation (`declare_*`, `register`) takes `&mut self`; resolution and
/// coercion only need `&self`. Applications that re-register at runtime
/// share the registry behind a `std::sync::RwLock`.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, TypeDecl>,
    families: BTreeMap<String, FamilyIndex>,
    /// member type -> owning family
    membership: BTreeMap<String, String>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Declare (or redeclare) a type that belongs to no family.
    pub fn declare_type(&mut self, decl: TypeDecl) {
        debug!(type_name = %decl.name, fields = decl.fields.len(), "declared type");
        self.types.insert(decl.name.clone(), decl);
    }

    /// Declare a family. Redeclaring an existing family discards its members.
    pub fn declare_family(&mut self, decl: FamilyDecl) {
        let name = decl.name.clone();
        if self.families.contains_key(&name) {
            warn!(family = %name, "family redeclared, previous members dropped");
            self.membership.retain(|_, family| family != &name);
        }
        debug!(family = %name, discriminators = decl.discriminators.len(), "declared family");
        self.families.insert(name, FamilyIndex::new(decl));
    }

    /// Register `decl` as a member of `family`.
    ///
    /// The static value of every discriminator attribute is read from the
    /// type's field defaults (descending through nested object fields for
    /// dotted paths) and indexed. The stored constraint is `predicate`, else
    /// the declaration's own matcher, else `Literal(true)`.
    ///
    /// Registering a type again replaces its previous entry. On error the
    /// registry is left unchanged.
    pub fn register(
        &mut self,
        family: &str,
        decl: TypeDecl,
        predicate: Option<Predicate>,
    ) -> Result<(), DispatchError> {
        let index = self
            .families
            .get(family)
            .ok_or_else(|| DispatchError::UnknownFamily {
                name: family.to_string(),
            })?;

        let mut statics = Vec::with_capacity(index.decl.discriminators.len());
        for path in &index.decl.discriminators {
            let value = self.static_lookup(&decl, path)?;
            statics.push((path.clone(), value));
        }
        let constraint = predicate
            .or_else(|| decl.matcher.clone())
            .unwrap_or_else(Predicate::always);

        let type_name = decl.name.clone();
        if let Some(previous) = self.membership.get(&type_name) {
            if let Some(old) = self.families.get_mut(previous) {
                old.remove_member(&type_name);
            }
        }
        let Some(index) = self.families.get_mut(family) else {
            return Err(DispatchError::UnknownFamily {
                name: family.to_string(),
            });
        };
        for (path, value) in &statics {
            index
                .buckets
                .entry(path.clone())
                .or_default()
                .entry(index_key(value))
                .or_default()
                .insert(type_name.clone());
        }
        debug!(
            family,
            type_name = %type_name,
            discriminators = ?statics.iter().map(|(p, v)| format!("{}={}", p, v)).collect::<Vec<_>>(),
            constraint = %constraint,
            "registered type"
        );
        index.constraints.insert(type_name.clone(), constraint);
        index.statics.insert(type_name.clone(), statics);
        self.membership.insert(type_name.clone(), family.to_string());
        self.types.insert(type_name, decl);
        Ok(())
    }

    /// Populate the registry from a catalogue.
    ///
    /// Plain types and all family members are declared before any member
    /// registers, so dotted discriminators may refer to types defined later
    /// in the document.
    pub fn load(&mut self, catalogue: &Catalogue) -> Result<(), CatalogueError> {
        for decl in &catalogue.types {
            self.declare_type(decl.clone());
        }
        for (family, _) in &catalogue.families {
            self.declare_family(family.clone());
        }
        for (_, members) in &catalogue.families {
            for decl in members {
                self.types.insert(decl.name.clone(), decl.clone());
            }
        }
        for (family, members) in &catalogue.families {
            for decl in members {
                self.register(&family.name, decl.clone(), None)?;
            }
        }
        Ok(())
    }

    pub fn from_catalogue(catalogue: &Catalogue) -> Result<Registry, CatalogueError> {
        let mut registry = Registry::new();
        registry.load(catalogue)?;
        Ok(registry)
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    pub fn family(&self, name: &str) -> Option<&FamilyDecl> {
        self.families.get(name).map(|index| &index.decl)
    }

    pub fn is_family(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }

    /// The family `type_name` is registered with, if any.
    pub fn family_of(&self, type_name: &str) -> Option<&FamilyDecl> {
        let family = self.membership.get(type_name)?;
        self.family(family)
    }

    /// Registered member type names of `family`, sorted.
    pub fn members(&self, family: &str) -> Vec<&str> {
        self.families
            .get(family)
            .map(|index| index.constraints.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Static discriminator values indexed for a registered member.
    pub fn static_values(&self, type_name: &str) -> Option<&[(FieldPath, RawValue)]> {
        let family = self.membership.get(type_name)?;
        self.families
            .get(family)?
            .statics
            .get(type_name)
            .map(Vec::as_slice)
    }

    /// Names of declared families, sorted.
    pub fn family_names(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    /// Names of declared types, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub(crate) fn index(&self, family: &str) -> Result<&FamilyIndex, DispatchError> {
        self.families
            .get(family)
            .ok_or_else(|| DispatchError::UnknownFamily {
                name: family.to_string(),
            })
    }

    /// Resolve a discriminator's static value through the type schema.
    ///
    /// All but the last segment must name fields whose declared type is a
    /// concrete object (optionally wrapped in `optional`); the last segment
    /// must carry a default.
    fn static_lookup(&self, decl: &TypeDecl, path: &FieldPath) -> Result<RawValue, DispatchError> {
        let missing = || DispatchError::MissingDiscriminator {
            type_name: decl.name.clone(),
            attr: path.to_string(),
        };
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(missing());
        };
        let mut current = decl;
        for segment in parents {
            let field = current.get_field(segment).ok_or_else(missing)?;
            let nested = match object_name(&field.ty) {
                Some(name) => name,
                None => return Err(missing()),
            };
            current = if nested == decl.name {
                decl
            } else {
                self.types
                    .get(nested)
                    .ok_or_else(|| DispatchError::UnknownType {
                        name: nested.to_string(),
                    })?
            };
        }
        current
            .get_field(last)
            .and_then(|f| f.default.clone())
            .ok_or_else(missing)
    }
}

fn object_name(ty: &FieldType) -> Option<&str> {
    match ty {
        FieldType::Object(name) => Some(name),
        FieldType::Optional(inner) => object_name(inner),
        _ => None,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
