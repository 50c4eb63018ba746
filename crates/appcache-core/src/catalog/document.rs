//! Wire format of the remote catalog documents.
//!
//! Steam's app list looks like `{"applist": {"apps": [{"appid": 10, "name": "..."}]}}`.
//! The community dumps use the same shape, and a bare array of records is
//! accepted as well.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::AppId;

/// Id to display name.
pub type Mapping = HashMap<AppId, String>;

/// One `{appid, name}` entry. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogRecord {
    #[serde(rename = "appid", alias = "id")]
    pub app_id: AppId,
    pub name: String,
}

/// Locate the record array inside a parsed document.
fn record_array(root: Value) -> Option<Value> {
    match root {
        Value::Array(_) => Some(root),
        mut obj @ Value::Object(_) => obj
            .pointer_mut("/applist/apps")
            .filter(|v| v.is_array())
            .map(Value::take),
        _ => None,
    }
}

/// Parse catalog text into a mapping. The first occurrence of an id wins.
pub fn parse_mapping(text: &str, path: &Path) -> Result<Mapping, ParseError> {
    let root: Value = serde_json::from_str(text).map_err(|source| ParseError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let records = record_array(root).ok_or_else(|| ParseError::UnsupportedShape {
        path: path.to_path_buf(),
    })?;

    let records: Vec<CatalogRecord> =
        serde_json::from_value(records).map_err(|source| ParseError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let mut mapping = Mapping::with_capacity(records.len());
    for record in records {
        mapping.entry(record.app_id).or_insert(record.name);
    }
    Ok(mapping)
}

/// Read and parse a catalog file.
pub fn load(path: &Path) -> Result<Mapping, ParseError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_mapping(&text, path)
}

/// Remove every id present in `exclusion` from `mapping`.
pub fn filter_out(mapping: &mut Mapping, exclusion: &Mapping) {
    mapping.retain(|id, _| !exclusion.contains_key(id));
}
