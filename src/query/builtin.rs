//! Descriptors every server registers.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{FieldSpec, FieldType, QueryDescriptor, QueryInstance};
use crate::catalog::{Catalog, Entry};
use crate::error::{AppError, AppResult};

pub fn all() -> Vec<Arc<dyn QueryDescriptor>> {
    vec![Arc::new(FullText), Arc::new(KeyLookup), Arc::new(Comparison), Arc::new(FamilyFilter)]
}

/// Follow a dotted key (`a.b.c`) through nested metadata objects.
pub fn metadata_value<'a>(metadata: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut cur = metadata.get(parts.next()?)?;
    for p in parts {
        cur = cur.as_object()?.get(p)?;
    }
    Some(cur)
}

fn any_string(v: &Value, pred: &dyn Fn(&str) -> bool) -> bool {
    match v {
        Value::String(s) => pred(s),
        Value::Array(items) => items.iter().any(|i| any_string(i, pred)),
        Value::Object(m) => m.values().any(|i| any_string(i, pred)),
        _ => false,
    }
}

/// Substring match against every string value in an entry's metadata.
pub struct FullText;

impl QueryDescriptor for FullText {
    fn name(&self) -> &'static str { "fulltext" }
    fn fields(&self) -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] =
            &[FieldSpec::new("text", FieldType::String), FieldSpec::new("case_sensitive", FieldType::Boolean)];
        FIELDS
    }
    fn apply(&self, catalog: &Catalog, query: &QueryInstance) -> AppResult<Catalog> {
        let Some(text) = query.get_str("text") else { return Ok(catalog.clone()) };
        if query.get_bool("case_sensitive").unwrap_or(false) {
            Ok(catalog.filter(|_, e| e.metadata().values().any(|v| any_string(v, &|s: &str| s.contains(text)))))
        } else {
            let needle = text.to_lowercase();
            Ok(catalog.filter(|_, e| e.metadata().values().any(|v| any_string(v, &|s: &str| s.to_lowercase().contains(&needle)))))
        }
    }
}

/// Select a single child by key.
pub struct KeyLookup;

impl QueryDescriptor for KeyLookup {
    fn name(&self) -> &'static str { "lookup" }
    fn fields(&self) -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[FieldSpec::new("key", FieldType::String)];
        FIELDS
    }
    fn apply(&self, catalog: &Catalog, query: &QueryInstance) -> AppResult<Catalog> {
        match query.get_str("key") {
            Some(key) => Ok(catalog.filter(|k, _| k == key)),
            None => Ok(catalog.clone()),
        }
    }
}

const OPERATORS: &[&str] = &["lt", "le", "gt", "ge", "eq", "ne"];

/// Numeric comparison against a metadata value. Entries whose value is
/// missing or not a number never match.
pub struct Comparison;

impl QueryDescriptor for Comparison {
    fn name(&self) -> &'static str { "comparison" }
    fn fields(&self) -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("key", FieldType::String),
            FieldSpec::new("operator", FieldType::Enum(OPERATORS)),
            FieldSpec::new("value", FieldType::Float),
        ];
        FIELDS
    }
    fn apply(&self, catalog: &Catalog, query: &QueryInstance) -> AppResult<Catalog> {
        let (key, value) = match (query.get_str("key"), query.get_f64("value")) {
            (Some(k), Some(v)) => (k, v),
            (None, None) => return Ok(catalog.clone()),
            (None, Some(_)) => return Err(AppError::bad_filter("comparison", "key", "a value needs a key to compare against")),
            (Some(_), None) => return Err(AppError::bad_filter("comparison", "value", "a key needs a value to compare with")),
        };
        let op = query.get_str("operator").unwrap_or("eq");
        let cmp = |x: f64| match op {
            "lt" => x < value,
            "le" => x <= value,
            "gt" => x > value,
            "ge" => x >= value,
            "ne" => x != value,
            _ => x == value,
        };
        Ok(catalog.filter(|_, e| metadata_value(e.metadata(), key).and_then(Value::as_f64).is_some_and(&cmp)))
    }
}

const FAMILIES: &[&str] = &["catalog", "array", "variable", "data_array", "dataset"];

/// Keep children of one structure family.
pub struct FamilyFilter;

impl QueryDescriptor for FamilyFilter {
    fn name(&self) -> &'static str { "structure_family" }
    fn fields(&self) -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[FieldSpec::new("family", FieldType::Enum(FAMILIES))];
        FIELDS
    }
    fn apply(&self, catalog: &Catalog, query: &QueryInstance) -> AppResult<Catalog> {
        match query.get_str("family") {
            Some(family) => Ok(catalog.filter(|_, e: &Entry| e.family().as_str() == family)),
            None => Ok(catalog.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{demo::demo_tree, resolve};
    use crate::query::FieldValue;

    fn arrays() -> Catalog {
        let root = demo_tree();
        resolve(&root, "arrays").unwrap().as_catalog().unwrap().clone()
    }

    fn keys(c: &Catalog) -> Vec<String> { c.keys().map(str::to_string).collect() }

    #[test]
    fn fulltext_is_case_insensitive_by_default() {
        let q = QueryInstance::new("fulltext").with("text", FieldValue::String("BLUE".into()));
        assert_eq!(keys(&FullText.apply(&arrays(), &q).unwrap()), vec!["small", "cube"]);
        let strict = q.with("case_sensitive", FieldValue::Boolean(true));
        assert!(FullText.apply(&arrays(), &strict).unwrap().is_empty());
    }

    #[test]
    fn comparison_on_numeric_metadata() {
        let q = QueryInstance::new("comparison")
            .with("key", FieldValue::String("count".into()))
            .with("operator", FieldValue::Enum("ge".into()))
            .with("value", FieldValue::Float(100.0));
        assert_eq!(keys(&Comparison.apply(&arrays(), &q).unwrap()), vec!["small", "medium"]);
        let half = QueryInstance::new("comparison").with("value", FieldValue::Float(1.0));
        assert!(matches!(Comparison.apply(&arrays(), &half), Err(AppError::BadFilterValue { .. })));
    }

    #[test]
    fn lookup_and_family() {
        let q = QueryInstance::new("lookup").with("key", FieldValue::String("cube".into()));
        assert_eq!(keys(&KeyLookup.apply(&arrays(), &q).unwrap()), vec!["cube"]);
        let root = demo_tree();
        let labeled = resolve(&root, "labeled").unwrap().as_catalog().unwrap().clone();
        let q = QueryInstance::new("structure_family").with("family", FieldValue::Enum("dataset".into()));
        assert_eq!(keys(&FamilyFilter.apply(&labeled, &q).unwrap()), vec!["weather"]);
    }

    #[test]
    fn dotted_keys_descend() {
        let m: Map<String, Value> = serde_json::from_str(r#"{"a": {"b": {"c": 5}}}"#).unwrap();
        assert_eq!(metadata_value(&m, "a.b.c"), Some(&Value::from(5)));
        assert_eq!(metadata_value(&m, "a.x"), None);
    }
}
