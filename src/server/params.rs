//! Generic request-parameter handling.
//!
//! Every handler takes the query string as a flat list of pairs and pulls
//! out what it needs here; the search binder consumes the `filter[...]`
//! keys from the same list.

use crate::array::{parse_block, SliceSpec};
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::query::binder::is_filter_key;

pub type Params = [(String, String)];

pub fn first<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

/// Non-empty value of an optional name parameter (`variable`, `coord`).
pub fn name_param<'a>(params: &'a Params, name: &str) -> AppResult<Option<&'a str>> {
    match first(params, name) {
        None => Ok(None),
        Some("") => Err(AppError::bad_request(format!("{name} must not be empty"))),
        Some(v) => Ok(Some(v)),
    }
}

fn parse_count(params: &Params, name: &str) -> AppResult<Option<usize>> {
    match first(params, name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("{name} must be a non-negative integer, got {raw:?}"))),
    }
}

/// `page[offset]` and `page[limit]`, defaulted and clamped from config.
pub fn page(params: &Params, config: &ServerConfig) -> AppResult<(usize, usize)> {
    let offset = parse_count(params, "page[offset]")?.unwrap_or(0);
    let limit = parse_count(params, "page[limit]")?.unwrap_or(config.default_page_limit).min(config.max_page_limit);
    Ok((offset, limit))
}

/// Which resource facets to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSet {
    pub metadata: bool,
    pub structure_family: bool,
    pub structure: bool,
    pub count: bool,
}

impl FieldSet {
    pub const ALL: FieldSet = FieldSet { metadata: true, structure_family: true, structure: true, count: true };
    const NONE: FieldSet = FieldSet { metadata: false, structure_family: false, structure: false, count: false };
}

/// `fields` may repeat and may hold comma-separated names. Absent means all.
pub fn fields(params: &Params) -> AppResult<FieldSet> {
    let names: Vec<&str> = params
        .iter()
        .filter(|(k, _)| k == "fields")
        .flat_map(|(_, v)| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(FieldSet::ALL);
    }
    let mut set = FieldSet::NONE;
    for n in names {
        match n {
            "metadata" => set.metadata = true,
            "structure_family" => set.structure_family = true,
            "structure" | "description" => set.structure = true,
            "count" => set.count = true,
            other => {
                return Err(AppError::bad_request(format!(
                    "Unknown field {other:?}; expected metadata, structure_family, structure or count"
                )))
            }
        }
    }
    Ok(set)
}

pub fn block(params: &Params) -> AppResult<Vec<usize>> { parse_block(first(params, "block").unwrap_or("")) }

pub fn slice(params: &Params) -> AppResult<SliceSpec> { first(params, "slice").unwrap_or("").parse() }

/// Parameters that page links must repeat: fields and filters, re-encoded.
pub fn carried_query(params: &Params) -> String {
    params
        .iter()
        .filter(|(k, _)| k == "fields" || is_filter_key(k))
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: &[(&str, &str)]) -> Vec<(String, String)> { v.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect() }

    #[test]
    fn page_defaults_and_clamp() {
        let cfg = ServerConfig::default();
        assert_eq!(page(&p(&[]), &cfg).unwrap(), (0, 10));
        assert_eq!(page(&p(&[("page[offset]", "5"), ("page[limit]", "100000")]), &cfg).unwrap(), (5, 300));
        assert!(matches!(page(&p(&[("page[offset]", "-1")]), &cfg), Err(AppError::BadRequest { .. })));
        assert!(page(&p(&[("page[limit]", "ten")]), &cfg).is_err());
    }

    #[test]
    fn fields_repeat_and_split() {
        let f = fields(&p(&[("fields", "metadata,count"), ("fields", "structure_family")])).unwrap();
        assert!(f.metadata && f.count && f.structure_family && !f.structure);
        assert_eq!(fields(&p(&[])).unwrap(), FieldSet::ALL);
        assert!(fields(&p(&[("fields", "bogus")])).is_err());
    }

    #[test]
    fn carried_query_keeps_filters_only() {
        let q = carried_query(&p(&[
            ("page[offset]", "0"),
            ("filter[fulltext][condition][text]", "north ridge"),
            ("fields", "metadata"),
        ]));
        assert_eq!(q, "filter[fulltext][condition][text]=north%20ridge&fields=metadata");
    }

    #[test]
    fn empty_names_rejected() {
        assert!(name_param(&p(&[("coord", "")]), "coord").is_err());
        assert_eq!(name_param(&p(&[("coord", "time")]), "coord").unwrap(), Some("time"));
    }
}
