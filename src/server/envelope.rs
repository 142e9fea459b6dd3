//! JSON response envelopes: resources, single-entry documents and listings.

use serde_json::{json, Map, Value};

use super::params::FieldSet;
use crate::catalog::{DataSourceKind, Entry, StructureFamily};
use crate::pagination::Page;

fn join(base: &str, key: &str) -> String { if base.is_empty() { key.to_string() } else { format!("{base}/{key}") } }

/// Percent-encode each `/`-separated segment of an entry path for use in a URL.
pub fn encode_path(path: &str) -> String { path.split('/').map(urlencoding::encode).collect::<Vec<_>>().join("/") }

fn links(path: &str, entry: &Entry) -> Value {
    let p = encode_path(path);
    match entry.family() {
        StructureFamily::Catalog => json!({
            "self": format!("/metadata/{p}"),
            "entries": format!("/entries/{p}"),
            "search": format!("/search/{p}"),
        }),
        StructureFamily::Array => {
            let ndim = match entry.as_data_source().map(|ds| &ds.kind) {
                Some(DataSourceKind::Array(a)) => a.structure.ndim(),
                _ => 0,
            };
            let template = (0..ndim).map(|i| format!("{{index_{i}}}")).collect::<Vec<_>>().join(",");
            json!({
                "self": format!("/metadata/{p}"),
                "block": format!("/tile/array/{p}?block={template}"),
                "full": format!("/full/array/{p}"),
            })
        }
        StructureFamily::Variable => json!({
            "self": format!("/metadata/{p}"),
            "block": format!("/tile/variable/{p}?block={{index}}"),
        }),
        StructureFamily::DataArray => json!({
            "self": format!("/metadata/{p}"),
            "block": format!("/tile/data_array/{p}?block={{index}}&coord={{coord}}"),
        }),
        StructureFamily::Dataset => json!({
            "self": format!("/metadata/{p}"),
            "block": format!("/tile/dataset/{p}?variable={{variable}}&block={{index}}&coord={{coord}}"),
        }),
    }
}

/// One entry rendered as `{id, attributes, meta, links}`. `count` is only
/// meaningful for catalogs and `structure` only for data sources.
pub fn resource(path: &str, entry: &Entry, fields: FieldSet) -> Value {
    let mut attributes = Map::new();
    if fields.metadata {
        attributes.insert("metadata".into(), Value::Object(entry.metadata().clone()));
    }
    if fields.structure_family {
        attributes.insert("structure_family".into(), json!(entry.family()));
    }
    match entry {
        Entry::Catalog(c) if fields.count => {
            attributes.insert("count".into(), json!(c.len()));
        }
        Entry::DataSource(ds) if fields.structure => {
            attributes.insert("structure".into(), ds.structure());
        }
        _ => {}
    }
    json!({
        "id": path,
        "attributes": attributes,
        "meta": {},
        "links": links(path, entry),
    })
}

pub fn single(path: &str, entry: &Entry, fields: FieldSet) -> Value { json!({ "data": resource(path, entry, fields) }) }

/// A page of children of the catalog at `parent`.
pub fn listing<'a>(parent: &str, page: &Page<(&'a str, &'a Entry)>, base: &str, carried: &str, fields: FieldSet) -> Value {
    let data: Vec<Value> = page.items.iter().map(|(key, entry)| resource(&join(parent, key), entry, fields)).collect();
    json!({
        "data": data,
        "links": page.links(base, carried),
        "meta": { "count": page.total },
    })
}
