//! Structured search: typed query descriptors, the registry that holds them,
//! and the binder that turns `filter[...]` request parameters into query
//! instances.

pub mod binder;
pub mod builtin;
pub mod registry;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::AppResult;

pub use binder::{apply_filters, bind_filters};
pub use registry::{QueryRegistry, QueryRegistryBuilder, RegistryError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Enum(&'static [&'static str]),
}

impl FieldType {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Enum(_) => "enum",
        }
    }

    /// Coerce a raw parameter value. The error is a human-readable reason.
    pub fn coerce(&self, raw: &str) -> Result<FieldValue, String> {
        match self {
            FieldType::String => Ok(FieldValue::String(raw.to_string())),
            FieldType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| format!("expected an integer, got {raw:?}")),
            FieldType::Float => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(FieldValue::Float(v)),
                _ => Err(format!("expected a number, got {raw:?}")),
            },
            FieldType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(FieldValue::Boolean(true)),
                "false" | "0" | "no" => Ok(FieldValue::Boolean(false)),
                _ => Err(format!("expected true or false, got {raw:?}")),
            },
            FieldType::Enum(choices) => choices
                .iter()
                .find(|c| **c == raw)
                .map(|c| FieldValue::Enum(c.to_string()))
                .ok_or_else(|| format!("expected one of {}, got {raw:?}", choices.join(", "))),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self { Self { name, ty } }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Enum(String),
}

/// Concrete field values for one descriptor. Fields the caller did not
/// supply are absent and mean "no constraint".
#[derive(Clone, Debug, PartialEq)]
pub struct QueryInstance {
    pub descriptor: String,
    pub values: BTreeMap<String, FieldValue>,
}

impl QueryInstance {
    pub fn new<S: Into<String>>(descriptor: S) -> Self { Self { descriptor: descriptor.into(), values: BTreeMap::new() } }

    pub fn with<S: Into<String>>(mut self, field: S, value: FieldValue) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> { self.values.get(field) }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.values.get(field)? {
            FieldValue::String(s) | FieldValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        match self.values.get(field)? {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        match self.values.get(field)? {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// A named, versioned search capability. Implementations narrow a catalog's
/// children; they never mutate the catalog they are given.
pub trait QueryDescriptor: Send + Sync {
    fn name(&self) -> &'static str;
    fn version(&self) -> u32 { 1 }
    fn fields(&self) -> &'static [FieldSpec];
    fn apply(&self, catalog: &Catalog, query: &QueryInstance) -> AppResult<Catalog>;

    fn field(&self, name: &str) -> Option<&'static FieldSpec> { self.fields().iter().find(|f| f.name == name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_by_type() {
        assert_eq!(FieldType::Integer.coerce(" 42 "), Ok(FieldValue::Integer(42)));
        assert!(FieldType::Integer.coerce("4.2").is_err());
        assert_eq!(FieldType::Float.coerce("2.5"), Ok(FieldValue::Float(2.5)));
        assert!(FieldType::Float.coerce("NaN").is_err());
        assert_eq!(FieldType::Boolean.coerce("True"), Ok(FieldValue::Boolean(true)));
        assert!(FieldType::Boolean.coerce("maybe").is_err());
        const CHOICES: &[&str] = &["lt", "gt"];
        assert_eq!(FieldType::Enum(CHOICES).coerce("gt"), Ok(FieldValue::Enum("gt".into())));
        let err = FieldType::Enum(CHOICES).coerce("eq").unwrap_err();
        assert!(err.contains("lt, gt"));
    }

    #[test]
    fn instance_accessors() {
        let q = QueryInstance::new("comparison").with("value", FieldValue::Integer(3)).with("key", FieldValue::String("count".into()));
        assert_eq!(q.get_f64("value"), Some(3.0));
        assert_eq!(q.get_str("key"), Some("count"));
        assert_eq!(q.get_bool("key"), None);
        assert!(q.get("missing").is_none());
    }
}
