//! `Accept` header parsing and media-type selection.

use crate::error::{AppError, AppResult};

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const NPY: &str = "application/x-npy";
pub const JSON: &str = "application/json";
pub const CSV: &str = "text/csv";

/// What kind of result a request produces; each has its own encoder set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Array,
    Envelope,
}

/// Encoders that can carry an array result of rank `ndim`, default first.
pub fn array_media_types(ndim: usize) -> Vec<&'static str> {
    let mut out = vec![OCTET_STREAM, NPY, JSON];
    if (1..=2).contains(&ndim) {
        out.push(CSV);
    }
    out
}

pub fn envelope_media_types() -> Vec<&'static str> { vec![JSON] }

/// Media types from an `Accept` header, most preferred first. Ties keep
/// header order; entries with `q=0` are dropped. A missing or blank header
/// accepts anything.
pub fn parse_accept(header: Option<&str>) -> Vec<String> {
    let Some(raw) = header.map(str::trim).filter(|h| !h.is_empty()) else {
        return vec!["*/*".to_string()];
    };
    let mut ranked: Vec<(f32, String)> = Vec::new();
    for item in raw.split(',') {
        let mut parts = item.split(';');
        let media = parts.next().unwrap_or("").trim().to_ascii_lowercase();
        if media.is_empty() {
            continue;
        }
        let mut q = 1.0f32;
        for param in parts {
            if let Some((k, v)) = param.split_once('=') {
                if k.trim().eq_ignore_ascii_case("q") {
                    q = v.trim().parse().unwrap_or(0.0);
                }
            }
        }
        if q > 0.0 {
            ranked.push((q, media));
        }
    }
    // sort_by is stable, so equal weights keep their order
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().map(|(_, m)| m).collect()
}

fn matches(range: &str, candidate: &str) -> bool {
    match range.strip_suffix("/*") {
        Some("*") => true,
        Some(prefix) => candidate.split('/').next() == Some(prefix),
        None => range == candidate,
    }
}

/// Pick the first acceptable type from `supported`. `*/*` selects `default`.
pub fn negotiate(accepted: &[String], supported: &[&'static str], default: &'static str) -> AppResult<&'static str> {
    for range in accepted {
        if range == "*/*" {
            return Ok(default);
        }
        if let Some(hit) = supported.iter().find(|s| matches(range, s)) {
            return Ok(*hit);
        }
    }
    Err(AppError::unsupported_media(supported))
}

/// Negotiate against the encoder set of `kind`.
pub fn negotiate_for(kind: ResultKind, ndim: usize, accept: Option<&str>) -> AppResult<&'static str> {
    let accepted = parse_accept(accept);
    match kind {
        ResultKind::Array => negotiate(&accepted, &array_media_types(ndim), OCTET_STREAM),
        ResultKind::Envelope => negotiate(&accepted, &envelope_media_types(), JSON),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn wildcard_after_unknown_picks_default() {
        let got = negotiate(&accepted(&["application/unknown", "*/*"]), &array_media_types(2), OCTET_STREAM).unwrap();
        assert_eq!(got, OCTET_STREAM);
    }

    #[test]
    fn nothing_acceptable_lists_supported() {
        let err = negotiate(&accepted(&["image/png"]), &array_media_types(3), OCTET_STREAM).unwrap_err();
        match err {
            AppError::UnsupportedMediaTypes { supported } => {
                assert_eq!(supported, vec![OCTET_STREAM, NPY, JSON]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quality_ordering_and_zero_weight() {
        let got = parse_accept(Some("text/csv;q=0.5, application/json, application/x-npy;q=0"));
        assert_eq!(got, vec!["application/json", "text/csv"]);
        assert_eq!(parse_accept(None), vec!["*/*"]);
    }

    #[test]
    fn type_wildcard_matches_by_prefix() {
        assert_eq!(negotiate_for(ResultKind::Array, 2, Some("text/*")).unwrap(), CSV);
        assert!(negotiate_for(ResultKind::Array, 3, Some("text/*")).is_err());
        assert_eq!(negotiate_for(ResultKind::Envelope, 0, None).unwrap(), JSON);
        assert!(negotiate_for(ResultKind::Envelope, 0, Some("text/csv")).is_err());
    }
}
