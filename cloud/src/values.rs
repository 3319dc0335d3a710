//! Conversions between API values and attribute values
//!
//! Remote ids are integers; in state and records they are decimal strings.

use chrono::{DateTime, SecondsFormat, Utc};
use tfplug::types::Dynamic;

use crate::error::{Error, Result};

pub fn id_value(id: u64) -> Dynamic {
    Dynamic::String(id.to_string())
}

pub fn optional_id(id: Option<u64>) -> Dynamic {
    id.map(id_value).unwrap_or(Dynamic::Null)
}

pub fn id_list(ids: &[u64]) -> Dynamic {
    Dynamic::List(ids.iter().copied().map(id_value).collect())
}

pub fn timestamp(ts: Option<DateTime<Utc>>) -> Dynamic {
    ts.map(|t| Dynamic::String(t.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .unwrap_or(Dynamic::Null)
}

pub fn parse_id(field: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{} '{}' is not a valid id", field, raw)))
}

/// Parses every element of a list attribute as an id
pub fn parse_id_list(field: &str, values: &[Dynamic]) -> Result<Vec<u64>> {
    values
        .iter()
        .map(|v| match v {
            Dynamic::String(s) => parse_id(field, s),
            Dynamic::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as u64),
            other => Err(Error::Config(format!(
                "{} contains a {} where an id was expected",
                field,
                other.type_name()
            ))),
        })
        .collect()
}
