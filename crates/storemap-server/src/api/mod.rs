mod chains;
mod stores;
mod users;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use storemap_db::PgStoreRepository;
use storemap_sources::{GeocoderClient, InventoryClient, SourceError};
use storemap_sync::{StoreSync, SyncError, SyncPacing};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

/// The orchestrator wired to the production repository and HTTP clients.
pub type ServerSync = StoreSync<PgStoreRepository, GeocoderClient, InventoryClient>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store_sync: Arc<ServerSync>,
}

impl AppState {
    #[must_use]
    pub fn new(
        pool: PgPool,
        geocoder: GeocoderClient,
        inventory: InventoryClient,
        pacing: SyncPacing,
    ) -> Self {
        let repo = PgStoreRepository::new(pool.clone());
        Self {
            pool,
            store_sync: Arc::new(StoreSync::new(repo, geocoder, inventory, pacing)),
        }
    }

    /// Builds the HTTP clients and pacing from the application config.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if either HTTP client cannot be built.
    pub fn from_config(
        pool: PgPool,
        config: &storemap_core::AppConfig,
    ) -> Result<Self, SourceError> {
        Ok(Self::new(
            pool,
            GeocoderClient::from_app_config(config)?,
            InventoryClient::from_app_config(config)?,
            SyncPacing::from_app_config(config),
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn wrap(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &storemap_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_source_error(request_id: String, error: &SourceError) -> ApiError {
    if error.is_configuration() {
        tracing::error!(error = %error, "remote source is not configured");
        ApiError::new(request_id, "configuration_error", error.to_string())
    } else {
        tracing::warn!(error = %error, "remote source request failed");
        ApiError::new(request_id, "upstream_error", error.to_string())
    }
}

pub(super) fn map_sync_error(request_id: String, error: &SyncError) -> ApiError {
    match error {
        SyncError::Configuration(source) | SyncError::Upstream(source) => {
            map_source_error(request_id, source)
        }
        SyncError::Persistence(db) => map_db_error(request_id, db),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/stores",
            get(stores::list_stores).delete(stores::delete_chain_stores),
        )
        .route("/api/v1/stores/pins", get(stores::list_store_pins))
        .route("/api/v1/stores/delete", post(stores::delete_store_keys))
        .route(
            "/api/v1/stores/{chain}/{code}",
            get(stores::get_store).delete(stores::delete_store),
        )
        .route("/api/v1/chains", get(chains::list_chains))
        .route(
            "/api/v1/chains/{chain}/stores",
            get(chains::list_chain_stores),
        )
        .route(
            "/api/v1/users",
            get(users::list_users).delete(users::delete_users),
        )
        .route(
            "/api/v1/users/{id}/profile",
            get(users::get_profile).patch(users::update_profile),
        )
        .route(
            "/api/v1/users/{id}/last-login",
            post(users::record_last_login),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match storemap_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
