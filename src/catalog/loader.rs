//! Build a catalog tree from a JSON document.
//!
//! ```json
//! {"type": "catalog", "metadata": {...}, "entries": {
//!     "raw": {"type": "array", "shape": [10, 10], "chunks": [4, 4],
//!             "dtype": "float64", "generator": {"kind": "arange"}}
//! }}
//! ```
//!
//! Object key order in the document becomes child order in the tree.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use super::{
    ArrayNode, ArrayStructure, Catalog, DataArrayNode, DataSource, DataSourceKind, DatasetNode, DType, Entry,
    VariableNode,
};
use crate::array::Generator;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChunkSpec {
    Regular(Vec<usize>),
    Explicit(Vec<Vec<usize>>),
}

fn default_dtype() -> DType { DType::Float64 }

#[derive(Debug, Deserialize)]
struct ArraySpec {
    shape: Vec<usize>,
    #[serde(default)]
    chunks: Option<ChunkSpec>,
    #[serde(default = "default_dtype")]
    dtype: DType,
    #[serde(default)]
    dims: Option<Vec<String>>,
    #[serde(default)]
    generator: Generator,
}

#[derive(Debug, Deserialize)]
struct VariableSpec {
    dims: Vec<String>,
    data: ArraySpec,
    #[serde(default)]
    attrs: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct DataArraySpec {
    variable: VariableSpec,
    #[serde(default)]
    coords: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum NodeSpec {
    Catalog {
        #[serde(default)]
        metadata: Map<String, Value>,
        #[serde(default)]
        entries: Map<String, Value>,
    },
    Array {
        #[serde(default)]
        metadata: Map<String, Value>,
        shape: Vec<usize>,
        #[serde(default)]
        chunks: Option<ChunkSpec>,
        #[serde(default = "default_dtype")]
        dtype: DType,
        #[serde(default)]
        dims: Option<Vec<String>>,
        #[serde(default)]
        generator: Generator,
    },
    Variable {
        #[serde(default)]
        metadata: Map<String, Value>,
        dims: Vec<String>,
        data: ArraySpec,
        #[serde(default)]
        attrs: Map<String, Value>,
    },
    DataArray {
        #[serde(default)]
        metadata: Map<String, Value>,
        variable: VariableSpec,
        #[serde(default)]
        coords: Map<String, Value>,
    },
    Dataset {
        #[serde(default)]
        metadata: Map<String, Value>,
        #[serde(default)]
        data_vars: Map<String, Value>,
        #[serde(default)]
        coords: Map<String, Value>,
    },
}

fn build_array(spec: ArraySpec, at: &str) -> Result<ArrayNode> {
    let structure = match spec.chunks {
        None => ArrayStructure::single_chunk(spec.shape, spec.dtype),
        Some(ChunkSpec::Regular(c)) => ArrayStructure::regular(spec.shape, &c, spec.dtype).with_context(|| at.to_string())?,
        Some(ChunkSpec::Explicit(chunks)) => ArrayStructure { shape: spec.shape, chunks, dtype: spec.dtype, dims: None },
    };
    let structure = match spec.dims {
        Some(d) => structure.with_dims(d).with_context(|| at.to_string())?,
        None => structure,
    };
    ArrayNode::new(structure, spec.generator).with_context(|| at.to_string())
}

fn build_variable(spec: VariableSpec, at: &str) -> Result<VariableNode> {
    let data = build_array(spec.data, at)?;
    VariableNode::new(spec.dims, data, spec.attrs).with_context(|| at.to_string())
}

fn build_coords(coords: Map<String, Value>, at: &str) -> Result<Vec<(String, VariableNode)>> {
    coords
        .into_iter()
        .map(|(name, v)| {
            let here = format!("{at}.coords.{name}");
            let spec: VariableSpec = serde_json::from_value(v).with_context(|| here.clone())?;
            Ok((name, build_variable(spec, &here)?))
        })
        .collect()
}

fn build_data_array(spec: DataArraySpec, at: &str) -> Result<DataArrayNode> {
    Ok(DataArrayNode {
        variable: build_variable(spec.variable, at)?,
        coords: build_coords(spec.coords, at)?,
    })
}

fn build_entry(value: Value, at: &str) -> Result<Entry> {
    let spec: NodeSpec = serde_json::from_value(value).with_context(|| format!("invalid node at /{at}"))?;
    let entry = match spec {
        NodeSpec::Catalog { metadata, entries } => {
            let mut catalog = Catalog::new(metadata);
            for (key, child) in entries {
                if key.is_empty() || key.contains('/') {
                    bail!("invalid key {key:?} under /{at}");
                }
                let child_path = if at.is_empty() { key.clone() } else { format!("{at}/{key}") };
                catalog.insert(key, build_entry(child, &child_path)?);
            }
            Entry::Catalog(catalog)
        }
        NodeSpec::Array { metadata, shape, chunks, dtype, dims, generator } => {
            let node = build_array(ArraySpec { shape, chunks, dtype, dims, generator }, at)?;
            Entry::DataSource(DataSource::new(metadata, DataSourceKind::Array(node)))
        }
        NodeSpec::Variable { metadata, dims, data, attrs } => {
            let node = build_variable(VariableSpec { dims, data, attrs }, at)?;
            Entry::DataSource(DataSource::new(metadata, DataSourceKind::Variable(node)))
        }
        NodeSpec::DataArray { metadata, variable, coords } => {
            let node = build_data_array(DataArraySpec { variable, coords }, at)?;
            Entry::DataSource(DataSource::new(metadata, DataSourceKind::DataArray(node)))
        }
        NodeSpec::Dataset { metadata, data_vars, coords } => {
            let mut vars = Vec::with_capacity(data_vars.len());
            for (name, v) in data_vars {
                let here = format!("{at}.data_vars.{name}");
                let spec: DataArraySpec = serde_json::from_value(v).with_context(|| here.clone())?;
                vars.push((name, build_data_array(spec, &here)?));
            }
            let node = DatasetNode { data_vars: vars, coords: build_coords(coords, at)? };
            Entry::DataSource(DataSource::new(metadata, DataSourceKind::Dataset(node)))
        }
    };
    Ok(entry)
}

pub fn load_tree_from_str(doc: &str) -> Result<Arc<Entry>> {
    let value: Value = serde_json::from_str(doc).context("catalog document is not valid JSON")?;
    let root = build_entry(value, "")?;
    if root.as_catalog().is_none() {
        return Err(anyhow!("the root of a catalog document must be a catalog"));
    }
    Ok(Arc::new(root))
}

pub fn load_tree_from_path(path: &Path) -> Result<Arc<Entry>> {
    let doc = std::fs::read_to_string(path).with_context(|| format!("reading catalog {}", path.display()))?;
    let root = load_tree_from_str(&doc).with_context(|| format!("loading catalog {}", path.display()))?;
    info!(
        target: "catalog",
        "Loaded catalog {} with {} top-level entries",
        path.display(),
        root.as_catalog().map_or(0, |c| c.len())
    );
    Ok(root)
}
