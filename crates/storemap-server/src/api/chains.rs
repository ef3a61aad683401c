//! Read-only proxies over the remote inventory API.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use storemap_core::Store;

use crate::middleware::RequestId;

use super::{map_source_error, ApiError, ApiResponse, AppState};

pub(super) async fn list_chains(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let chains = state
        .store_sync
        .source()
        .list_chains()
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::wrap(chains, req_id.0))
}

pub(super) async fn list_chain_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(chain): Path<String>,
) -> Result<Json<ApiResponse<Vec<Store>>>, ApiError> {
    let stores = state
        .store_sync
        .source()
        .list_stores_for_chain(&chain)
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::wrap(stores, req_id.0))
}
