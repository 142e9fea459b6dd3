//! Built-in tree served when no catalog document is configured.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::structure::regular_chunks;
use super::{
    ArrayNode, ArrayStructure, Catalog, DataArrayNode, DataSource, DataSourceKind, DatasetNode, DType, Entry,
    VariableNode,
};
use crate::array::Generator;

fn meta(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

fn array(shape: &[usize], chunk: &[usize], dtype: DType, generator: Generator) -> ArrayNode {
    let chunks = shape.iter().zip(chunk).map(|(&s, &c)| regular_chunks(s, c)).collect();
    ArrayNode {
        structure: ArrayStructure { shape: shape.to_vec(), chunks, dtype, dims: None },
        generator: Arc::new(generator),
    }
}

fn variable(dims: &[&str], data: ArrayNode, attrs: Value) -> VariableNode {
    let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    let mut data = data;
    data.structure.dims = Some(dims.clone());
    VariableNode { dims, data, attrs: meta(attrs) }
}

fn leaf(metadata: Value, kind: DataSourceKind) -> Entry { Entry::DataSource(DataSource::new(meta(metadata), kind)) }

fn arrays() -> Catalog {
    Catalog::new(meta(json!({"description": "plain arrays"})))
        .with_entry(
            "tiny",
            leaf(
                json!({"color": "red", "fruit": "apple", "count": 3}),
                DataSourceKind::Array(array(&[3], &[3], DType::Float64, Generator::Ones)),
            ),
        )
        .with_entry(
            "small",
            leaf(
                json!({"color": "blue", "fruit": "banana", "count": 100}),
                DataSourceKind::Array(array(&[10, 10], &[4, 4], DType::Float64, Generator::default())),
            ),
        )
        .with_entry(
            "medium",
            leaf(
                json!({"color": "green", "fruit": "cherry", "count": 10_000}),
                DataSourceKind::Array(array(&[100, 100], &[25, 50], DType::Int32, Generator::default())),
            ),
        )
        .with_entry(
            "cube",
            leaf(
                json!({"color": "blue", "fruit": "date", "count": 64}),
                DataSourceKind::Array(array(&[4, 4, 4], &[2, 2, 2], DType::UInt8, Generator::default())),
            ),
        )
}

fn labeled() -> Catalog {
    let time = || variable(&["time"], array(&[24], &[12], DType::Float64, Generator::default()), json!({"units": "hours"}));
    let lat = variable(
        &["lat"],
        array(&[5], &[5], DType::Float64, Generator::Linspace { start: -90.0, stop: 90.0 }),
        json!({"units": "degrees_north"}),
    );
    let lon = variable(
        &["lon"],
        array(&[6], &[6], DType::Float64, Generator::Linspace { start: 0.0, stop: 300.0 }),
        json!({"units": "degrees_east"}),
    );
    let elevation = DataArrayNode {
        variable: variable(&["lat", "lon"], array(&[5, 6], &[5, 3], DType::Float32, Generator::default()), json!({"units": "m"})),
        coords: vec![("lat".into(), lat), ("lon".into(), lon)],
    };
    let weather = DatasetNode {
        data_vars: vec![
            (
                "temp".into(),
                DataArrayNode {
                    variable: variable(
                        &["time"],
                        array(&[24], &[6], DType::Float64, Generator::Linspace { start: 12.0, stop: 21.2 }),
                        json!({"units": "degC"}),
                    ),
                    coords: vec![("time".into(), time())],
                },
            ),
            (
                "humidity".into(),
                DataArrayNode {
                    variable: variable(&["time"], array(&[24], &[6], DType::Int32, Generator::Arange { start: 40.0, step: 1.0 }), json!({"units": "%"})),
                    coords: Vec::new(),
                },
            ),
        ],
        coords: vec![("time".into(), time())],
    };
    Catalog::new(meta(json!({"description": "labeled data"})))
        .with_entry(
            "temperature_series",
            leaf(json!({"station": "north ridge"}), DataSourceKind::Variable(time())),
        )
        .with_entry("elevation", leaf(json!({"region": "valley survey"}), DataSourceKind::DataArray(elevation)))
        .with_entry("weather", leaf(json!({"station": "north ridge", "season": "summer"}), DataSourceKind::Dataset(weather)))
}

fn nested() -> Catalog {
    let deep = Catalog::new(meta(json!({"depth": 2}))).with_entry(
        "leaf",
        leaf(json!({"depth": 3}), DataSourceKind::Array(array(&[2, 2], &[1, 1], DType::Int64, Generator::default()))),
    );
    Catalog::new(meta(json!({"depth": 1}))).with_entry("inner", Entry::Catalog(deep))
}

/// A small tree covering every structure family.
pub fn demo_tree() -> Arc<Entry> {
    let root = Catalog::new(meta(json!({"description": "demo catalog"})))
        .with_entry("arrays", Entry::Catalog(arrays()))
        .with_entry("labeled", Entry::Catalog(labeled()))
        .with_entry("nested", Entry::Catalog(nested()));
    Arc::new(Entry::Catalog(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::resolve;

    // Every hand-built node must satisfy the same checks the loader applies.
    fn check(entry: &Entry) {
        match entry {
            Entry::Catalog(c) => c.iter().for_each(|(_, e)| check(e)),
            Entry::DataSource(ds) => {
                let arrays: Vec<&ArrayNode> = match &ds.kind {
                    DataSourceKind::Array(a) => vec![a],
                    DataSourceKind::Variable(v) => vec![&v.data],
                    DataSourceKind::DataArray(da) => {
                        std::iter::once(&da.variable.data).chain(da.coords.iter().map(|(_, v)| &v.data)).collect()
                    }
                    DataSourceKind::Dataset(d) => d
                        .data_vars
                        .iter()
                        .flat_map(|(_, da)| std::iter::once(&da.variable.data).chain(da.coords.iter().map(|(_, v)| &v.data)))
                        .chain(d.coords.iter().map(|(_, v)| &v.data))
                        .collect(),
                };
                for a in arrays {
                    a.structure.validate().unwrap();
                }
            }
        }
    }

    #[test]
    fn demo_structures_are_valid() { check(&demo_tree()); }

    #[test]
    fn demo_layout() {
        let root = demo_tree();
        assert_eq!(root.as_catalog().unwrap().keys().collect::<Vec<_>>(), vec!["arrays", "labeled", "nested"]);
        assert!(resolve(&root, "nested/inner/leaf").is_ok());
    }
}
