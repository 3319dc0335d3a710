//! Record schema and filter evaluation for list data sources
//!
//! A list data source turns every remote object into a flat [`Record`].
//! Users narrow the result with `filter` blocks: clauses AND together,
//! values inside one clause OR together. Filter values arrive as strings
//! and are coerced to the kind of the field they name.

use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::AttributeType;

use crate::error::{Error, Result};

/// One remote object flattened into attribute name -> value
pub type Record = HashMap<String, Dynamic>;

/// Absolute tolerance for float comparisons
pub const FLOAT_TOLERANCE: f64 = 0.001;

/// Semantic type of a record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Bool,
    Int,
    Float,
    List(AttributeType),
    Set(AttributeType),
    Map(AttributeType),
}

impl FieldKind {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            FieldKind::String => AttributeType::String,
            FieldKind::Bool => AttributeType::Bool,
            FieldKind::Int | FieldKind::Float => AttributeType::Number,
            FieldKind::List(elem) => AttributeType::List(Box::new(elem.clone())),
            FieldKind::Set(elem) => AttributeType::Set(Box::new(elem.clone())),
            FieldKind::Map(elem) => AttributeType::Map(Box::new(elem.clone())),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Bool => "bool",
            FieldKind::Int => "integer",
            FieldKind::Float => "float",
            FieldKind::List(_) => "list",
            FieldKind::Set(_) => "set",
            FieldKind::Map(_) => "map",
        }
    }

    /// Parses a filter value. Compound kinds never take part in filtering
    /// and yield `None`.
    fn coerce(&self, field: &str, raw: &str) -> Result<Option<FilterValue>> {
        let invalid = || Error::Coercion {
            field: field.to_string(),
            value: raw.to_string(),
            kind: self.label(),
        };

        let value = match self {
            FieldKind::String => FilterValue::String(raw.to_string()),
            FieldKind::Bool => FilterValue::Bool(parse_bool(raw).ok_or_else(invalid)?),
            FieldKind::Int => FilterValue::Int(raw.parse::<i64>().map_err(|_| invalid())?),
            FieldKind::Float => FilterValue::Float(raw.parse::<f64>().map_err(|_| invalid())?),
            FieldKind::List(_) | FieldKind::Set(_) | FieldKind::Map(_) => return Ok(None),
        };
        Ok(Some(value))
    }
}

/// Accepts the usual spellings: 1/t/T/TRUE/true/True and their negations
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl FilterValue {
    fn matches(&self, stored: &Dynamic) -> bool {
        match (self, stored) {
            (FilterValue::String(want), Dynamic::String(have)) => want == have,
            (FilterValue::Bool(want), Dynamic::Bool(have)) => want == have,
            (FilterValue::Int(want), Dynamic::Number(have)) => *have == *want as f64,
            (FilterValue::Float(want), Dynamic::Number(have)) => {
                (have - want).abs() < FLOAT_TOLERANCE
            }
            _ => false,
        }
    }
}

/// A record field as exposed in data source state
#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

impl RecordField {
    pub fn new(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::String, description)
    }

    pub fn bool(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Bool, description)
    }

    pub fn int(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Int, description)
    }

    pub fn float(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Float, description)
    }

    pub fn string_list(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::List(AttributeType::String), description)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub name: String,
    pub values: Vec<String>,
}

impl FilterClause {
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Reads the `filter` blocks of a data source configuration
    pub fn from_config(config: &DynamicValue) -> Result<Vec<FilterClause>> {
        let blocks = match config.get_list(&AttributePath::new("filter")) {
            Ok(blocks) => blocks,
            Err(e) if e.is_missing() => return Ok(Vec::new()),
            Err(e) => return Err(Error::Config(format!("filter: {}", e))),
        };

        blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let path = AttributePath::new("filter").index(i as i64);
                let map = block
                    .as_map()
                    .ok_or_else(|| Error::Config(format!("{} must be an object", path)))?;
                let name = map
                    .get("name")
                    .and_then(Dynamic::as_str)
                    .ok_or_else(|| Error::Config(format!("{}.name is required", path)))?;
                let values = map
                    .get("values")
                    .and_then(Dynamic::as_list)
                    .unwrap_or_default()
                    .iter()
                    .map(|v| {
                        v.as_str().map(str::to_string).ok_or_else(|| {
                            Error::Config(format!("{}.values must be strings", path))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(FilterClause {
                    name: name.to_string(),
                    values,
                })
            })
            .collect()
    }
}

/// Keeps the records that satisfy every clause
pub fn apply_filters(
    records: Vec<Record>,
    clauses: &[FilterClause],
    fields: &[RecordField],
) -> Result<Vec<Record>> {
    let mut records = records;

    for clause in clauses {
        let field = fields
            .iter()
            .find(|f| f.name == clause.name)
            .ok_or_else(|| Error::UnknownFilterField(clause.name.clone()))?;

        let wanted = clause
            .values
            .iter()
            .map(|raw| field.kind.coerce(field.name, raw))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        records.retain(|record| {
            record
                .get(field.name)
                .is_some_and(|stored| wanted.iter().any(|w| w.matches(stored)))
        });

        tracing::debug!(
            "Filter on {} kept {} record(s)",
            clause.name,
            records.len()
        );
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<RecordField> {
        vec![
            RecordField::string("name", ""),
            RecordField::int("cpu", ""),
            RecordField::float("size", ""),
            RecordField::bool("public", ""),
            RecordField::string_list("tags", ""),
        ]
    }

    fn record(name: &str, cpu: u32, size: f64, public: bool) -> Record {
        HashMap::from([
            ("name".to_string(), Dynamic::from(name)),
            ("cpu".to_string(), Dynamic::from(cpu)),
            ("size".to_string(), Dynamic::from(size)),
            ("public".to_string(), Dynamic::from(public)),
            (
                "tags".to_string(),
                Dynamic::from(vec!["a".to_string(), "b".to_string()]),
            ),
        ])
    }

    fn records() -> Vec<Record> {
        vec![
            record("a", 1, 1.0, true),
            record("b", 2, 2.5, false),
            record("c", 2, 1.0, true),
            record("d", 4, 8.0, false),
        ]
    }

    fn names(records: &[Record]) -> Vec<&str> {
        records
            .iter()
            .filter_map(|r| r.get("name").and_then(Dynamic::as_str))
            .collect()
    }

    #[test]
    fn values_inside_a_clause_are_alternatives() {
        let out = apply_filters(records(), &[FilterClause::new("cpu", &["1", "4"])], &fields())
            .unwrap();
        assert_eq!(names(&out), vec!["a", "d"]);
    }

    #[test]
    fn disjoint_clauses_produce_nothing() {
        let clauses = [
            FilterClause::new("name", &["a", "b"]),
            FilterClause::new("name", &["c", "d"]),
        ];
        let out = apply_filters(records(), &clauses, &fields()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn overlapping_clauses_produce_the_intersection() {
        let clauses = [
            FilterClause::new("cpu", &["2"]),
            FilterClause::new("public", &["true"]),
        ];
        let out = apply_filters(records(), &clauses, &fields()).unwrap();
        assert_eq!(names(&out), vec!["c"]);
    }

    #[test]
    fn floats_match_within_tolerance() {
        let near = apply_filters(
            records(),
            &[FilterClause::new("size", &["1.0003"])],
            &fields(),
        )
        .unwrap();
        assert_eq!(names(&near), vec!["a", "c"]);

        let far = apply_filters(
            records(),
            &[FilterClause::new("size", &["1.002"])],
            &fields(),
        )
        .unwrap();
        assert!(far.is_empty());
    }

    #[test]
    fn compound_fields_never_match() {
        let out = apply_filters(records(), &[FilterClause::new("tags", &["a"])], &fields())
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn bad_values_fail_the_whole_filter() {
        let err = apply_filters(
            records(),
            &[FilterClause::new("cpu", &["2", "two"])],
            &fields(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Coercion { ref value, .. } if value == "two"));

        let err = apply_filters(
            records(),
            &[FilterClause::new("public", &["yes"])],
            &fields(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Coercion { kind: "bool", .. }));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = apply_filters(records(), &[FilterClause::new("colour", &["red"])], &fields())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownFilterField(ref f) if f == "colour"));
    }

    #[test]
    fn bool_spellings() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn clauses_are_read_from_config() {
        let config = DynamicValue::from_json(serde_json::json!({
            "filter": [
                {"name": "cpu", "values": ["2", "4"]},
                {"name": "public", "values": ["true"]}
            ]
        }));

        let clauses = FilterClause::from_config(&config).unwrap();
        assert_eq!(
            clauses,
            vec![
                FilterClause::new("cpu", &["2", "4"]),
                FilterClause::new("public", &["true"]),
            ]
        );

        let empty = DynamicValue::from_json(serde_json::json!({"filter": null}));
        assert!(FilterClause::from_config(&empty).unwrap().is_empty());
    }
}
