//! Dynamic binding of `filter[<descriptor>][condition][<field>]=<value>`
//! request parameters.
//!
//! Handlers hand over the raw parameter list; only keys in the filter
//! namespace are consumed here. New descriptors therefore need no change in
//! request handling.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{QueryInstance, QueryRegistry};
use crate::catalog::Catalog;
use crate::error::{AppError, AppResult};

static FILTER_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^filter\[([^\[\]]+)\]\[condition\]\[([^\[\]]+)\]$").expect("filter key pattern"));

pub fn is_filter_key(key: &str) -> bool { key.starts_with("filter[") }

/// Group filter parameters by descriptor, coerce every value against its
/// declared field type, and build one instance per referenced descriptor,
/// in order of first appearance.
pub fn bind_filters(registry: &QueryRegistry, params: &[(String, String)]) -> AppResult<Vec<QueryInstance>> {
    let mut out: Vec<QueryInstance> = Vec::new();
    for (key, raw) in params.iter().filter(|(k, _)| is_filter_key(k)) {
        let caps = FILTER_KEY
            .captures(key)
            .ok_or_else(|| AppError::bad_request(format!("Malformed filter parameter {key}; expected filter[<name>][condition][<field>]")))?;
        let (name, field) = (&caps[1], &caps[2]);
        let descriptor = registry
            .get(name)
            .ok_or_else(|| AppError::bad_request(format!("Unknown query type {name:?}")))?;
        let spec = descriptor
            .field(field)
            .ok_or_else(|| AppError::bad_filter(name, field, format!("{name} has no field {field:?}")))?;
        let value = spec.ty.coerce(raw).map_err(|m| AppError::bad_filter(name, field, m))?;

        let idx = match out.iter().position(|q| q.descriptor == name) {
            Some(i) => i,
            None => {
                out.push(QueryInstance::new(name));
                out.len() - 1
            }
        };
        if out[idx].values.insert(field.to_string(), value).is_some() {
            return Err(AppError::bad_filter(name, field, "given more than once"));
        }
    }
    Ok(out)
}

/// Narrow `catalog` by each instance in turn, so filters compose by
/// intersection.
pub fn apply_filters(registry: &QueryRegistry, catalog: &Catalog, queries: &[QueryInstance]) -> AppResult<Catalog> {
    let mut current = catalog.clone();
    for q in queries {
        let descriptor = registry
            .get(&q.descriptor)
            .ok_or_else(|| AppError::bad_request(format!("Unknown query type {:?}", q.descriptor)))?;
        current = descriptor.apply(&current, q)?;
        debug!(target: "search", descriptor = %q.descriptor, remaining = current.len(), "filter applied");
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{demo::demo_tree, resolve};
    use crate::query::FieldValue;

    fn params(v: &[(&str, &str)]) -> Vec<(String, String)> {
        v.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn groups_by_descriptor_and_ignores_other_keys() {
        let reg = QueryRegistry::builtins();
        let p = params(&[
            ("page[offset]", "0"),
            ("filter[comparison][condition][key]", "count"),
            ("filter[fulltext][condition][text]", "blue"),
            ("filter[comparison][condition][value]", "50"),
        ]);
        let bound = bind_filters(&reg, &p).unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].descriptor, "comparison");
        assert_eq!(bound[0].get("value"), Some(&FieldValue::Float(50.0)));
        assert_eq!(bound[1].get_str("text"), Some("blue"));
    }

    #[test]
    fn coercion_failure_names_the_field() {
        let reg = QueryRegistry::builtins();
        let err = bind_filters(&reg, &params(&[("filter[comparison][condition][value]", "lots")])).unwrap_err();
        match err {
            AppError::BadFilterValue { descriptor, field, .. } => {
                assert_eq!(descriptor, "comparison");
                assert_eq!(field, "value");
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = bind_filters(&reg, &params(&[("filter[fulltext][condition][nope]", "x")])).unwrap_err();
        assert!(matches!(err, AppError::BadFilterValue { .. }));
    }

    #[test]
    fn malformed_and_unknown_are_bad_requests() {
        let reg = QueryRegistry::builtins();
        assert!(matches!(bind_filters(&reg, &params(&[("filter[fulltext]", "x")])), Err(AppError::BadRequest { .. })));
        assert!(matches!(
            bind_filters(&reg, &params(&[("filter[spatial][condition][bbox]", "x")])),
            Err(AppError::BadRequest { .. })
        ));
    }

    #[test]
    fn filters_intersect() {
        let reg = QueryRegistry::builtins();
        let root = demo_tree();
        let arrays = resolve(&root, "arrays").unwrap();
        let p = params(&[
            ("filter[fulltext][condition][text]", "blue"),
            ("filter[comparison][condition][key]", "count"),
            ("filter[comparison][condition][operator]", "lt"),
            ("filter[comparison][condition][value]", "100"),
        ]);
        let bound = bind_filters(&reg, &p).unwrap();
        let narrowed = apply_filters(&reg, arrays.as_catalog().unwrap(), &bound).unwrap();
        assert_eq!(narrowed.keys().collect::<Vec<_>>(), vec!["cube"]);
    }
}
