//! Descriptor registry.
//!
//! Registration happens on a builder before the server starts; `build()`
//! freezes it. The frozen registry is shared behind an `Arc` and only read
//! during request handling, so lookups take no lock.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use super::{builtin, QueryDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a query descriptor named {0:?} is already registered")]
    Duplicate(String),
    #[error("query descriptor names may not be empty or contain '[' or ']': {0:?}")]
    InvalidName(String),
}

#[derive(Default)]
pub struct QueryRegistryBuilder {
    order: Vec<Arc<dyn QueryDescriptor>>,
}

impl QueryRegistryBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn register(&mut self, descriptor: Arc<dyn QueryDescriptor>) -> Result<&mut Self, RegistryError> {
        let name = descriptor.name();
        if name.is_empty() || name.contains(['[', ']']) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.order.iter().any(|d| d.name() == name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.order.push(descriptor);
        Ok(self)
    }

    /// Register the descriptors every server ships with.
    pub fn with_builtins(mut self) -> Result<Self, RegistryError> {
        for d in builtin::all() {
            self.register(d)?;
        }
        Ok(self)
    }

    pub fn build(self) -> QueryRegistry {
        let by_name = self.order.iter().enumerate().map(|(i, d)| (d.name(), i)).collect();
        QueryRegistry { order: self.order, by_name }
    }
}

pub struct QueryRegistry {
    order: Vec<Arc<dyn QueryDescriptor>>,
    by_name: HashMap<&'static str, usize>,
}

impl QueryRegistry {
    /// A frozen registry holding only the built-in descriptors.
    pub fn builtins() -> Self {
        let mut b = QueryRegistryBuilder::new();
        for d in builtin::all() {
            // Built-in names are distinct and bracket-free.
            let _ = b.register(d);
        }
        b.build()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn QueryDescriptor>> { self.by_name.get(name).map(|&i| &self.order[i]) }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn QueryDescriptor>> { self.order.iter() }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    /// Published schema: every descriptor with its fields, so clients can
    /// build `filter[...]` parameters without prior knowledge.
    pub fn describe(&self) -> Value {
        Value::Array(
            self.order
                .iter()
                .map(|d| {
                    let fields: Vec<Value> = d
                        .fields()
                        .iter()
                        .map(|f| {
                            let mut v = json!({"name": f.name, "type": f.ty.type_name()});
                            if let super::FieldType::Enum(choices) = f.ty {
                                v["choices"] = json!(choices);
                            }
                            v
                        })
                        .collect();
                    json!({
                        "name": d.name(),
                        "version": d.version(),
                        "fields": fields,
                        "parameter": format!("filter[{}][condition][<field>]", d.name()),
                    })
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::AppResult;
    use crate::query::{FieldSpec, FieldType, QueryInstance};

    struct Named(&'static str);

    impl QueryDescriptor for Named {
        fn name(&self) -> &'static str { self.0 }
        fn fields(&self) -> &'static [FieldSpec] {
            const F: &[FieldSpec] = &[FieldSpec::new("x", FieldType::Boolean)];
            F
        }
        fn apply(&self, catalog: &Catalog, _: &QueryInstance) -> AppResult<Catalog> { Ok(catalog.clone()) }
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut b = QueryRegistryBuilder::new();
        b.register(Arc::new(Named("custom"))).unwrap();
        let err = b.register(Arc::new(Named("custom"))).err().unwrap();
        assert_eq!(err, RegistryError::Duplicate("custom".into()));
        assert!(matches!(b.register(Arc::new(Named("a[b]"))), Err(RegistryError::InvalidName(_))));
    }

    #[test]
    fn custom_descriptor_is_discoverable() {
        let mut b = QueryRegistryBuilder::new().with_builtins().unwrap();
        b.register(Arc::new(Named("custom"))).unwrap();
        let reg = b.build();
        assert!(reg.get("custom").is_some());
        assert!(reg.get("fulltext").is_some());
        let described = reg.describe();
        let last = described.as_array().unwrap().last().unwrap();
        assert_eq!(last["name"], "custom");
        assert_eq!(last["fields"][0]["type"], "boolean");
    }

    #[test]
    fn builtins_frozen_in_order() {
        let reg = QueryRegistry::builtins();
        let names: Vec<_> = reg.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["fulltext", "lookup", "comparison", "structure_family"]);
    }
}
