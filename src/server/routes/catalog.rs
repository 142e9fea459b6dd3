//! Discovery, metadata, listing and search endpoints.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tracing::debug;

use super::{envelope_response, negotiate_envelope};
use crate::catalog::{normalize_path, resolve, resolve_typed, Catalog, EntryKind};
use crate::error::{AppError, AppResult};
use crate::media::{array_media_types, negotiate::envelope_media_types};
use crate::pagination::paginate;
use crate::query::{apply_filters, bind_filters};
use crate::server::auth::Reader;
use crate::server::extract::{ApiPath, ApiQuery, RawQuery};
use crate::server::envelope;
use crate::server::params::{self, Params};
use crate::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(discovery))
        .route("/metadata", get(metadata_root))
        .route("/metadata/", get(metadata_root))
        .route("/metadata/{*path}", get(metadata))
        .route("/entries", get(entries_root))
        .route("/entries/", get(entries_root))
        .route("/entries/{*path}", get(entries))
        .route("/search", get(search_root))
        .route("/search/", get(search_root))
        .route("/search/{*path}", get(search))
}

/// `GET /`: what this server can do, including every registered search
/// descriptor, so clients can build `filter[...]` parameters.
async fn discovery(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let media = negotiate_envelope(&headers)?;
    let doc = json!({
        "library_version": env!("CARGO_PKG_VERSION"),
        "formats": {
            "array": array_media_types(2),
            "array_rank_above_2": array_media_types(3),
            "envelope": envelope_media_types(),
        },
        "queries": state.registry.describe(),
        "authentication": {
            "required": !state.config.allow_anonymous_access,
            "methods": ["bearer", "api_key"],
            "token": "/token",
        },
        "pagination": {
            "default_limit": state.config.default_page_limit,
            "max_limit": state.config.max_page_limit,
        },
        "links": {
            "metadata": "/metadata/{path}",
            "entries": "/entries/{path}",
            "search": "/search/{path}",
            "full_array": "/full/array/{path}",
        },
    });
    envelope_response(media, &doc)
}

fn metadata_at(state: &AppState, headers: &HeaderMap, path: &str, params: &Params) -> AppResult<Response> {
    let media = negotiate_envelope(headers)?;
    let fields = params::fields(params)?;
    let entry = resolve(&state.root, path)?;
    debug!(target: "catalog", path, family = entry.family().as_str(), "metadata");
    envelope_response(media, &envelope::single(&normalize_path(path), &entry, fields))
}

fn catalog_at(state: &AppState, path: &str) -> AppResult<Catalog> {
    let entry = resolve_typed(&state.root, path, EntryKind::Catalog)?;
    entry
        .as_catalog()
        .cloned()
        .ok_or_else(|| AppError::internal("catalog resolution returned a data source"))
}

fn list(state: &AppState, route: &str, path: &str, catalog: &Catalog, params: &Params, media: &'static str) -> AppResult<Response> {
    let (offset, limit) = params::page(params, &state.config)?;
    let fields = params::fields(params)?;
    let norm = normalize_path(path);
    let page = paginate(catalog.iter().map(|(k, e)| (k, e.as_ref())), offset, limit);
    let base = format!("/{route}/{}", envelope::encode_path(&norm));
    envelope_response(media, &envelope::listing(&norm, &page, &base, &params::carried_query(params), fields))
}

fn entries_at(state: &AppState, headers: &HeaderMap, path: &str, params: &Params) -> AppResult<Response> {
    let media = negotiate_envelope(headers)?;
    let catalog = catalog_at(state, path)?;
    list(state, "entries", path, &catalog, params, media)
}

fn search_at(state: &AppState, headers: &HeaderMap, path: &str, params: &Params) -> AppResult<Response> {
    let media = negotiate_envelope(headers)?;
    let catalog = catalog_at(state, path)?;
    let queries = bind_filters(&state.registry, params)?;
    let narrowed = apply_filters(&state.registry, &catalog, &queries)?;
    debug!(target: "search", path, filters = queries.len(), before = catalog.len(), after = narrowed.len(), "search");
    list(state, "search", path, &narrowed, params, media)
}

async fn metadata_root(State(state): State<AppState>, _: Reader, headers: HeaderMap, ApiQuery(q): RawQuery) -> AppResult<Response> {
    metadata_at(&state, &headers, "", &q)
}

async fn metadata(
    State(state): State<AppState>,
    _: Reader,
    headers: HeaderMap,
    ApiPath(path): ApiPath<String>,
    ApiQuery(q): RawQuery,
) -> AppResult<Response> {
    metadata_at(&state, &headers, &path, &q)
}

async fn entries_root(State(state): State<AppState>, _: Reader, headers: HeaderMap, ApiQuery(q): RawQuery) -> AppResult<Response> {
    entries_at(&state, &headers, "", &q)
}

async fn entries(
    State(state): State<AppState>,
    _: Reader,
    headers: HeaderMap,
    ApiPath(path): ApiPath<String>,
    ApiQuery(q): RawQuery,
) -> AppResult<Response> {
    entries_at(&state, &headers, &path, &q)
}

async fn search_root(State(state): State<AppState>, _: Reader, headers: HeaderMap, ApiQuery(q): RawQuery) -> AppResult<Response> {
    search_at(&state, &headers, "", &q)
}

async fn search(
    State(state): State<AppState>,
    _: Reader,
    headers: HeaderMap,
    ApiPath(path): ApiPath<String>,
    ApiQuery(q): RawQuery,
) -> AppResult<Response> {
    search_at(&state, &headers, &path, &q)
}
