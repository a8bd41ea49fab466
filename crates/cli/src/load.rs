//! Reading catalogue and record files from disk.
//!
//! Files ending in `.toml` are parsed as TOML; everything else is JSON.

use std::path::{Path, PathBuf};

use tessera_core::{Catalogue, CatalogueError, RawRecord, RawValue};
use tessera_eval::Registry;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub(crate) enum LoadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid TOML in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{} does not contain a record (expected an object at the top level)", .path.display())]
    NotARecord { path: PathBuf },

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
}

/// Read a JSON or TOML document into a raw value.
pub(crate) fn read_document(path: &Path) -> Result<RawValue, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    if is_toml {
        let doc = toml::from_str::<toml::Value>(&text).map_err(|source| LoadError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml_to_raw(doc))
    } else {
        serde_json::from_str::<RawValue>(&text).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Native TOML dates and times become their ISO 8601 text, the same
/// form a JSON document would carry them in.
fn toml_to_raw(v: toml::Value) -> RawValue {
    match v {
        toml::Value::String(s) => RawValue::String(s),
        toml::Value::Integer(i) => RawValue::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(RawValue::Number)
            .unwrap_or(RawValue::Null),
        toml::Value::Boolean(b) => RawValue::Bool(b),
        toml::Value::Datetime(dt) => RawValue::String(dt.to_string()),
        toml::Value::Array(items) => RawValue::Array(items.into_iter().map(toml_to_raw).collect()),
        toml::Value::Table(table) => RawValue::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_raw(v)))
                .collect(),
        ),
    }
}

/// Load a catalogue file and register everything it declares.
pub(crate) fn load_registry(path: &Path) -> Result<(Catalogue, Registry), LoadError> {
    let doc = read_document(path)?;
    let catalogue = Catalogue::from_json(&doc)?;
    let registry = Registry::from_catalogue(&catalogue)?;
    debug!(
        path = %path.display(),
        families = catalogue.families.len(),
        types = catalogue.type_count(),
        "loaded catalogue"
    );
    Ok((catalogue, registry))
}

pub(crate) fn load_record(path: &Path) -> Result<RawRecord, LoadError> {
    match read_document(path)? {
        RawValue::Object(record) => Ok(record),
        _ => Err(LoadError::NotARecord {
            path: path.to_path_buf(),
        }),
    }
}
