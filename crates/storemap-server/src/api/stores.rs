use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storemap_core::{ChainScope, StoreKey};
use storemap_db::StoreRecord;
use storemap_sync::{BackfillReport, DeleteCriteria, ReconcileReport, StoreStats};

use crate::middleware::RequestId;

use super::{map_db_error, map_sync_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct StoresQuery {
    pub chain: Option<String>,
    #[serde(default)]
    pub sync: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChainQuery {
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DeleteKeysBody {
    pub keys: Vec<StoreKey>,
}

#[derive(Debug, Serialize)]
pub(super) struct StoreItem {
    pub id: i64,
    pub chain_code: String,
    pub code: String,
    #[serde(rename = "type")]
    pub store_type: String,
    pub address: String,
    pub city: String,
    pub zipcode: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoreRecord> for StoreItem {
    fn from(row: StoreRecord) -> Self {
        Self {
            id: row.id,
            chain_code: row.chain_code,
            code: row.code,
            store_type: row.store_type,
            address: row.address,
            city: row.city,
            zipcode: row.zipcode,
            lat: row.lat,
            lon: row.lon,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct StoresData {
    pub stores: Vec<StoreItem>,
    pub stats: StoreStats,
    pub backfill: BackfillReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<ReconcileReport>,
}

#[derive(Debug, Serialize)]
pub(super) struct StorePinItem {
    pub chain_code: String,
    pub code: String,
    #[serde(rename = "type")]
    pub store_type: String,
    pub address: String,
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedFlag {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedCount {
    pub deleted: u64,
}

fn scope_from(chain: Option<&str>) -> ChainScope {
    chain.map_or(ChainScope::All, ChainScope::parse)
}

pub(super) async fn list_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<StoresQuery>,
) -> Result<Json<ApiResponse<StoresData>>, ApiError> {
    let scope = scope_from(params.chain.as_deref());
    let snapshot = state
        .store_sync
        .get_stores(&scope, params.sync)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    let data = StoresData {
        stores: snapshot.stores.into_iter().map(StoreItem::from).collect(),
        stats: snapshot.stats,
        backfill: snapshot.backfill,
        reconcile: snapshot.reconcile,
    };

    Ok(ApiResponse::wrap(data, req_id.0))
}

pub(super) async fn list_store_pins(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ChainQuery>,
) -> Result<Json<ApiResponse<Vec<StorePinItem>>>, ApiError> {
    let scope = scope_from(params.chain.as_deref());
    let rows = state
        .store_sync
        .repository()
        .list_geocoded(scope.chain_code())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .filter_map(|row| {
            let point = row.coordinate()?;
            Some(StorePinItem {
                chain_code: row.chain_code,
                code: row.code,
                store_type: row.store_type,
                address: row.address,
                city: row.city,
                lat: point.lat,
                lon: point.lon,
            })
        })
        .collect();

    Ok(ApiResponse::wrap(data, req_id.0))
}

pub(super) async fn get_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((chain, code)): Path<(String, String)>,
) -> Result<Json<ApiResponse<StoreItem>>, ApiError> {
    let row = state
        .store_sync
        .repository()
        .find_by_key(&chain, &code)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("store {chain}:{code} not found"),
            )
        })?;

    Ok(ApiResponse::wrap(StoreItem::from(row), req_id.0))
}

pub(super) async fn delete_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((chain, code)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DeletedFlag>>, ApiError> {
    let deleted = state
        .store_sync
        .delete_stores(&DeleteCriteria::Key(StoreKey::new(chain, code)))
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::wrap(
        DeletedFlag {
            deleted: deleted > 0,
        },
        req_id.0,
    ))
}

pub(super) async fn delete_chain_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ChainQuery>,
) -> Result<Json<ApiResponse<DeletedCount>>, ApiError> {
    // Only a named chain may be wiped; "all" or a missing value is rejected.
    let ChainScope::Chain(chain_code) = scope_from(params.chain.as_deref()) else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "chain query parameter must name a single chain",
        ));
    };

    let deleted = state
        .store_sync
        .delete_stores(&DeleteCriteria::Chain(chain_code))
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::wrap(DeletedCount { deleted }, req_id.0))
}

pub(super) async fn delete_store_keys(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<DeleteKeysBody>,
) -> Result<Json<ApiResponse<DeletedCount>>, ApiError> {
    if body.keys.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "keys must not be empty",
        ));
    }
    if body
        .keys
        .iter()
        .any(|k| k.chain_code.trim().is_empty() || k.code.trim().is_empty())
    {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "every key needs a chain_code and a code",
        ));
    }

    let deleted = state
        .store_sync
        .delete_stores(&DeleteCriteria::Keys(body.keys))
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::wrap(DeletedCount { deleted }, req_id.0))
}
