//! Catalog tree model.
//!
//! A tree snapshot is built once at startup and shared read-only between
//! requests. Nodes are either a `Catalog` (ordered, keyed children) or a
//! `DataSource` (block-chunked array data, possibly with named sub-components).
//! Children are held behind `Arc` so search narrowing can build filtered
//! catalogs without copying subtrees.

pub mod demo;
pub mod loader;
pub mod resolver;
pub mod structure;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::array::generate::Generator;
use crate::error::{AppError, AppResult, ComponentKind};
pub use resolver::{normalize_path, resolve, resolve_typed};
pub use structure::{ArrayStructure, DType, StructureError, StructureFamily, VariableStructure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Catalog,
    DataSource,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Catalog => "Catalog",
            EntryKind::DataSource => "Data Source",
        }
    }
}

/// One array leaf: its structure plus the recipe the provider uses to
/// materialize blocks.
#[derive(Debug, Clone)]
pub struct ArrayNode {
    pub structure: ArrayStructure,
    pub generator: Arc<Generator>,
}

impl ArrayNode {
    pub fn new(structure: ArrayStructure, generator: Generator) -> Result<Self, StructureError> {
        structure.validate()?;
        if let Generator::Literal { values } = &generator {
            if values.len() != structure.len() {
                return Err(StructureError::LiteralLength { expected: structure.len(), got: values.len() });
            }
        }
        Ok(Self { structure, generator: Arc::new(generator) })
    }
}

#[derive(Debug, Clone)]
pub struct VariableNode {
    pub dims: Vec<String>,
    pub data: ArrayNode,
    pub attrs: Map<String, Value>,
}

impl VariableNode {
    pub fn new(dims: Vec<String>, data: ArrayNode, attrs: Map<String, Value>) -> Result<Self, StructureError> {
        if dims.len() != data.structure.ndim() {
            return Err(StructureError::DimsRank { expected: data.structure.ndim(), got: dims.len() });
        }
        Ok(Self { dims, data, attrs })
    }

    pub fn structure(&self) -> VariableStructure {
        VariableStructure { dims: self.dims.clone(), data: self.data.structure.clone(), attrs: self.attrs.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct DataArrayNode {
    pub variable: VariableNode,
    pub coords: Vec<(String, VariableNode)>,
}

impl DataArrayNode {
    pub fn coord(&self, name: &str) -> Option<&VariableNode> {
        self.coords.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn structure_json(&self) -> Value {
        json!({
            "variable": self.variable.structure().to_json(),
            "coords": named_structures(&self.coords),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatasetNode {
    pub data_vars: Vec<(String, DataArrayNode)>,
    pub coords: Vec<(String, VariableNode)>,
}

impl DatasetNode {
    pub fn data_var(&self, name: &str) -> Option<&DataArrayNode> {
        self.data_vars.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn coord(&self, name: &str) -> Option<&VariableNode> {
        self.coords.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

fn named_structures(items: &[(String, VariableNode)]) -> Value {
    let mut m = Map::new();
    for (name, v) in items {
        m.insert(name.clone(), v.structure().to_json());
    }
    Value::Object(m)
}

#[derive(Debug, Clone)]
pub enum DataSourceKind {
    Array(ArrayNode),
    Variable(VariableNode),
    DataArray(DataArrayNode),
    Dataset(DatasetNode),
}

#[derive(Debug, Clone)]
pub struct DataSource {
    pub metadata: Map<String, Value>,
    pub kind: DataSourceKind,
}

impl DataSource {
    pub fn new(metadata: Map<String, Value>, kind: DataSourceKind) -> Self { Self { metadata, kind } }

    pub fn family(&self) -> StructureFamily {
        match &self.kind {
            DataSourceKind::Array(_) => StructureFamily::Array,
            DataSourceKind::Variable(_) => StructureFamily::Variable,
            DataSourceKind::DataArray(_) => StructureFamily::DataArray,
            DataSourceKind::Dataset(_) => StructureFamily::Dataset,
        }
    }

    /// The description facet served under `attributes.structure`.
    pub fn structure(&self) -> Value {
        match &self.kind {
            DataSourceKind::Array(a) => json!(a.structure),
            DataSourceKind::Variable(v) => v.structure().to_json(),
            DataSourceKind::DataArray(da) => da.structure_json(),
            DataSourceKind::Dataset(ds) => {
                let mut vars = Map::new();
                for (name, da) in &ds.data_vars {
                    vars.insert(name.clone(), da.structure_json());
                }
                json!({ "data_vars": vars, "coords": named_structures(&ds.coords) })
            }
        }
    }

    /// Select the array a block request addresses.
    ///
    /// Datasets need a variable name; data arrays and datasets accept an
    /// optional coordinate name. Dataset coordinates are looked up on the
    /// variable first, then on the dataset itself.
    pub fn component(&self, variable: Option<&str>, coord: Option<&str>) -> AppResult<&ArrayNode> {
        match &self.kind {
            DataSourceKind::Array(a) => {
                reject_component(variable, coord)?;
                Ok(a)
            }
            DataSourceKind::Variable(v) => {
                reject_component(variable, coord)?;
                Ok(&v.data)
            }
            DataSourceKind::DataArray(da) => {
                if let Some(v) = variable {
                    return Err(AppError::unknown_component(ComponentKind::Variable, v));
                }
                match coord {
                    None => Ok(&da.variable.data),
                    Some(c) => da
                        .coord(c)
                        .map(|v| &v.data)
                        .ok_or_else(|| AppError::unknown_component(ComponentKind::Coordinate, c)),
                }
            }
            DataSourceKind::Dataset(ds) => {
                let Some(name) = variable else {
                    return Err(AppError::bad_request("A dataset block request requires a variable name."));
                };
                let da = ds
                    .data_var(name)
                    .ok_or_else(|| AppError::unknown_component(ComponentKind::Variable, name))?;
                match coord {
                    None => Ok(&da.variable.data),
                    Some(c) => da
                        .coord(c)
                        .or_else(|| ds.coord(c))
                        .map(|v| &v.data)
                        .ok_or_else(|| AppError::unknown_component(ComponentKind::Coordinate, c)),
                }
            }
        }
    }
}

fn reject_component(variable: Option<&str>, coord: Option<&str>) -> AppResult<()> {
    if let Some(v) = variable {
        return Err(AppError::unknown_component(ComponentKind::Variable, v));
    }
    if let Some(c) = coord {
        return Err(AppError::unknown_component(ComponentKind::Coordinate, c));
    }
    Ok(())
}

/// Ordered, keyed collection of child entries. Iteration follows insertion
/// order, which is what pagination windows over.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    metadata: Map<String, Value>,
    keys: Vec<String>,
    children: HashMap<String, Arc<Entry>>,
}

impl Catalog {
    pub fn new(metadata: Map<String, Value>) -> Self {
        Self { metadata, keys: Vec::new(), children: HashMap::new() }
    }

    /// Insert or replace a child. Replacing keeps the original position.
    pub fn insert<K: Into<String>>(&mut self, key: K, entry: Entry) {
        let key = key.into();
        if self.children.insert(key.clone(), Arc::new(entry)).is_none() {
            self.keys.push(key);
        }
    }

    pub fn with_entry<K: Into<String>>(mut self, key: K, entry: Entry) -> Self {
        self.insert(key, entry);
        self
    }

    pub fn metadata(&self) -> &Map<String, Value> { &self.metadata }

    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }

    pub fn get(&self, key: &str) -> Option<&Arc<Entry>> { self.children.get(key) }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> + '_ { self.keys.iter().map(String::as_str) }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Arc<Entry>)> + '_ {
        self.keys.iter().map(move |k| (k.as_str(), &self.children[k]))
    }

    /// A narrowed copy holding only the children the predicate keeps, in the
    /// same relative order.
    pub fn filter<F>(&self, mut keep: F) -> Catalog
    where
        F: FnMut(&str, &Entry) -> bool,
    {
        let mut out = Catalog::new(self.metadata.clone());
        for (key, entry) in self.iter() {
            if keep(key, entry) {
                out.keys.push(key.to_string());
                out.children.insert(key.to_string(), Arc::clone(entry));
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub enum Entry {
    Catalog(Catalog),
    DataSource(DataSource),
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Catalog(_) => EntryKind::Catalog,
            Entry::DataSource(_) => EntryKind::DataSource,
        }
    }

    pub fn family(&self) -> StructureFamily {
        match self {
            Entry::Catalog(_) => StructureFamily::Catalog,
            Entry::DataSource(ds) => ds.family(),
        }
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        match self {
            Entry::Catalog(c) => c.metadata(),
            Entry::DataSource(ds) => &ds.metadata,
        }
    }

    pub fn as_catalog(&self) -> Option<&Catalog> {
        match self {
            Entry::Catalog(c) => Some(c),
            Entry::DataSource(_) => None,
        }
    }

    pub fn as_data_source(&self) -> Option<&DataSource> {
        match self {
            Entry::DataSource(ds) => Some(ds),
            Entry::Catalog(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> Entry {
        let s = ArrayStructure::regular(vec![4], &[2], DType::Float64).unwrap();
        Entry::DataSource(DataSource::new(Map::new(), DataSourceKind::Array(ArrayNode::new(s, Generator::Zeros).unwrap())))
    }

    #[test]
    fn catalog_preserves_insertion_order() {
        let c = Catalog::new(Map::new()).with_entry("c", leaf()).with_entry("a", leaf()).with_entry("b", leaf());
        assert_eq!(c.keys().collect::<Vec<_>>(), vec!["c", "a", "b"]);
        let again = c.clone().with_entry("a", leaf());
        assert_eq!(again.keys().collect::<Vec<_>>(), vec!["c", "a", "b"]);
    }

    #[test]
    fn filter_keeps_relative_order() {
        let c = Catalog::new(Map::new()).with_entry("x1", leaf()).with_entry("y", leaf()).with_entry("x2", leaf());
        let narrowed = c.filter(|k, _| k.starts_with('x'));
        assert_eq!(narrowed.keys().collect::<Vec<_>>(), vec!["x1", "x2"]);
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn literal_length_checked() {
        let s = ArrayStructure::single_chunk(vec![3], DType::Int64);
        let err = ArrayNode::new(s, Generator::Literal { values: vec![1.0, 2.0] }).unwrap_err();
        assert_eq!(err, StructureError::LiteralLength { expected: 3, got: 2 });
    }

    #[test]
    fn dataset_component_lookup() {
        let ds = demo::demo_tree();
        let weather = resolve(&ds, "labeled/weather").unwrap();
        let src = weather.as_data_source().unwrap();
        assert!(src.component(Some("temp"), None).is_ok());
        assert!(src.component(Some("temp"), Some("time")).is_ok());
        let err = src.component(Some("temp"), Some("lat")).unwrap_err();
        assert_eq!(err, AppError::unknown_component(ComponentKind::Coordinate, "lat"));
        let err = src.component(Some("pressure"), None).unwrap_err();
        assert_eq!(err, AppError::unknown_component(ComponentKind::Variable, "pressure"));
    }
}
