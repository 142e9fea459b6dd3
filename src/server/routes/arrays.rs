//! Block ("tile") and full-array data endpoints.
//!
//! Everything that can fail cheaply (resolution, component selection, block
//! and slice validation, content negotiation) is checked before the provider
//! is asked to compute anything.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::debug;

use super::accept;
use crate::array::{locate_block, resulting_shape, ArrayData};
use crate::catalog::resolver::resolve_family;
use crate::catalog::{normalize_path, ArrayNode, Entry, StructureFamily};
use crate::error::{AppError, AppResult};
use crate::media::{negotiate_for, serialize_array, ResultKind};
use crate::provider::materialize_all;
use crate::server::auth::Reader;
use crate::server::extract::{ApiPath, ApiQuery, RawQuery};
use crate::server::params::{self, Params};
use crate::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tile/array/{*path}", get(array_block))
        .route("/tile/variable/{*path}", get(variable_block))
        .route("/tile/data_array/{*path}", get(data_array_block))
        .route("/tile/dataset/{*path}", get(dataset_block))
        .route("/full/array/{*path}", get(full_array))
}

fn encoded(media: &'static str, data: &ArrayData) -> AppResult<Response> {
    let body = serialize_array(media, data)?;
    Ok(([(CONTENT_TYPE, media)], body).into_response())
}

fn component<'a>(entry: &'a Entry, variable: Option<&str>, coord: Option<&str>) -> AppResult<&'a ArrayNode> {
    entry
        .as_data_source()
        .ok_or_else(|| AppError::internal("family resolution returned a catalog"))?
        .component(variable, coord)
}

async fn serve_block(
    state: &AppState,
    headers: &HeaderMap,
    path: &str,
    params: &Params,
    family: StructureFamily,
    variable: Option<&str>,
    coord: Option<&str>,
) -> AppResult<Response> {
    let entry = resolve_family(&state.root, path, family)?;
    let array = component(&entry, variable, coord)?;
    let index = params::block(params)?;
    let region = locate_block(&array.structure, &index)?;
    let spec = params::slice(params)?;
    let dims = spec.resolve(&region.shape)?;
    let media = negotiate_for(ResultKind::Array, resulting_shape(&dims).len(), accept(headers))?;

    let data = state.provider.materialize(array, &region).await?;
    let data = if spec.is_empty() { data } else { data.sliced(&dims) };
    debug!(
        target: "array",
        path = %normalize_path(path),
        family = family.as_str(),
        block = ?index,
        media,
        "block served"
    );
    encoded(media, &data)
}

async fn array_block(
    State(state): State<AppState>,
    _: Reader,
    headers: HeaderMap,
    ApiPath(path): ApiPath<String>,
    ApiQuery(q): RawQuery,
) -> AppResult<Response> {
    serve_block(&state, &headers, &path, &q, StructureFamily::Array, None, None).await
}

async fn variable_block(
    State(state): State<AppState>,
    _: Reader,
    headers: HeaderMap,
    ApiPath(path): ApiPath<String>,
    ApiQuery(q): RawQuery,
) -> AppResult<Response> {
    serve_block(&state, &headers, &path, &q, StructureFamily::Variable, None, None).await
}

async fn data_array_block(
    State(state): State<AppState>,
    _: Reader,
    headers: HeaderMap,
    ApiPath(path): ApiPath<String>,
    ApiQuery(q): RawQuery,
) -> AppResult<Response> {
    let coord = params::name_param(&q, "coord")?;
    serve_block(&state, &headers, &path, &q, StructureFamily::DataArray, None, coord).await
}

async fn dataset_block(
    State(state): State<AppState>,
    _: Reader,
    headers: HeaderMap,
    ApiPath(path): ApiPath<String>,
    ApiQuery(q): RawQuery,
) -> AppResult<Response> {
    let variable = params::name_param(&q, "variable")?;
    let coord = params::name_param(&q, "coord")?;
    serve_block(&state, &headers, &path, &q, StructureFamily::Dataset, variable, coord).await
}

/// The whole array in one response, assembled from every block. Refused
/// up front when the encoded payload would exceed the configured ceiling.
async fn full_array(
    State(state): State<AppState>,
    _: Reader,
    headers: HeaderMap,
    ApiPath(path): ApiPath<String>,
    ApiQuery(q): RawQuery,
) -> AppResult<Response> {
    let entry = resolve_family(&state.root, &path, StructureFamily::Array)?;
    let array = component(&entry, None, None)?;
    let nbytes = array.structure.nbytes();
    if nbytes > state.config.max_response_bytes {
        return Err(AppError::bad_request(format!(
            "Array is {nbytes} bytes, over the {} byte response limit; request it block by block.",
            state.config.max_response_bytes
        )));
    }
    let spec = params::slice(&q)?;
    let dims = spec.resolve(&array.structure.shape)?;
    let media = negotiate_for(ResultKind::Array, resulting_shape(&dims).len(), accept(&headers))?;

    let data = materialize_all(state.provider.as_ref(), array).await?;
    let data = if spec.is_empty() { data } else { data.sliced(&dims) };
    debug!(target: "array", path = %normalize_path(&path), nbytes, media, "full array served");
    encoded(media, &data)
}
