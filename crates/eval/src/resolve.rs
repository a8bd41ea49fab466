//! Record-to-type resolution within a family.
//!
//! Discriminator attributes seed the candidate set by exact value match
//! (intersecting across attributes); families without discriminators seed
//! it from every member whose constraint holds. Seeded candidates are then
//! filtered by their stored constraints. Exactly one survivor is required:
//! there is no declaration-order tie-break.

use std::collections::BTreeSet;

use tessera_core::record::{lookup, RawRecord};
use tessera_core::schema::TypeDecl;
use tessera_core::DispatchError;
use tracing::debug;

use crate::predicate::pred_matches;
use crate::registry::{FamilyIndex, Registry};

/// Pick the single member of `family` that matches `record`.
pub fn resolve<'r>(
    registry: &'r Registry,
    family: &str,
    record: &RawRecord,
) -> Result<&'r TypeDecl, DispatchError> {
    let index = registry.index(family)?;
    if index.is_empty() {
        return Err(DispatchError::EmptyFamily {
            family: family.to_string(),
        });
    }

    let candidates = if index.decl.discriminators.is_empty() {
        let matching: BTreeSet<&str> = index
            .constraints()
            .filter(|(_, constraint)| pred_matches(constraint, record))
            .map(|(name, _)| name.as_str())
            .collect();
        debug!(family, candidates = matching.len(), "seeded candidates from constraints");
        matching
    } else {
        let seeded = seed_from_index(index, record);
        debug!(family, candidates = seeded.len(), "seeded candidates from discriminators");
        seeded
            .into_iter()
            .filter(|name| {
                index
                    .constraint(name)
                    .map_or(true, |constraint| pred_matches(constraint, record))
            })
            .collect()
    };

    let mut survivors = candidates.into_iter();
    match (survivors.next(), survivors.next()) {
        (None, _) => {
            debug!(family, "no candidate survived");
            Err(DispatchError::NoMatch {
                family: family.to_string(),
            })
        }
        (Some(name), None) => {
            debug!(family, type_name = name, "resolved");
            registry
                .get_type(name)
                .ok_or_else(|| DispatchError::UnknownType {
                    name: name.to_string(),
                })
        }
        (Some(first), Some(second)) => {
            let candidates: Vec<String> = [first, second]
                .into_iter()
                .chain(survivors)
                .map(str::to_string)
                .collect();
            debug!(family, ?candidates, "ambiguous resolution");
            Err(DispatchError::Ambiguous {
                family: family.to_string(),
                candidates,
            })
        }
    }
}

/// Intersect the buckets for each discriminator's record value.
///
/// An attribute absent from the record, or a value no member declared,
/// empties the set.
fn seed_from_index<'i>(index: &'i FamilyIndex, record: &RawRecord) -> BTreeSet<&'i str> {
    let mut candidates: Option<BTreeSet<&'i str>> = None;
    for path in &index.decl.discriminators {
        let bucket: BTreeSet<&str> = match lookup(record, path) {
            Ok(value) => index
                .bucket(path, value)
                .map(|members| members.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            Err(err) => {
                debug!(%err, "discriminator absent from record");
                BTreeSet::new()
            }
        };
        let narrowed = match candidates {
            None => bucket,
            Some(current) => current.intersection(&bucket).copied().collect(),
        };
        if narrowed.is_empty() {
            return narrowed;
        }
        candidates = Some(narrowed);
    }
    candidates.unwrap_or_default()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
