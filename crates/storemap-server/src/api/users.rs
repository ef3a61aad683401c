//! User listing, profile edits, and login bookkeeping.
//!
//! Accounts are created by the external auth provider; these handlers never
//! insert users.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storemap_db::{DbError, ImageUpdate, ProfileUpdate, UserProfile, UserRow};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub(super) struct DeleteUsersRequest {
    pub ids: Vec<String>,
}

// Field names follow the auth frontend's camelCase payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateProfileRequest {
    pub username: Option<String>,
    pub image_url: Option<String>,
    pub image_blob: Option<String>,
    #[serde(default)]
    pub delete_image: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct UserItem {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserItem {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            image: row.image,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A profile as served to clients. An uploaded blob takes the place of the
/// image URL, inlined as a `data:` URL.
#[derive(Debug, Serialize)]
pub(super) struct ProfileItem {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserProfile> for ProfileItem {
    fn from(row: UserProfile) -> Self {
        let image = match row.image_blob {
            Some(blob) if !blob.is_empty() => Some(to_data_url(&blob)),
            _ => row.image,
        };
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            image,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedCount {
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct LastLoginData {
    pub id: Uuid,
    pub recorded: bool,
}

fn parse_user_id(req_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ApiError::new(
            req_id,
            "validation_error",
            format!("'{raw}' is not a valid user id"),
        )
    })
}

fn user_not_found(req_id: String, id: Uuid) -> ApiError {
    ApiError::new(req_id, "not_found", format!("user {id} not found"))
}

fn image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/png",
    }
}

pub(super) fn to_data_url(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", image_mime(bytes), STANDARD.encode(bytes))
}

/// Decodes an uploaded image given either as bare base64 or as a
/// `data:<mime>;base64,<payload>` URL.
pub(super) fn decode_image_blob(req_id: &str, raw: &str) -> Result<Vec<u8>, ApiError> {
    let raw = raw.trim();
    let payload = match raw.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((header, payload)) if header.ends_with(";base64") => payload,
            _ => {
                return Err(ApiError::new(
                    req_id,
                    "validation_error",
                    "imageBlob data URL must be base64-encoded",
                ))
            }
        },
        None => raw,
    };

    let bytes = STANDARD.decode(payload.trim()).map_err(|e| {
        ApiError::new(
            req_id,
            "validation_error",
            format!("imageBlob is not valid base64: {e}"),
        )
    })?;

    if bytes.is_empty() {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "imageBlob must not be empty",
        ));
    }
    Ok(bytes)
}

/// Turns a PATCH body into a typed edit. Image precedence is
/// `deleteImage`, then `imageBlob`, then `imageUrl`.
pub(super) fn build_profile_update(
    req_id: &str,
    body: &UpdateProfileRequest,
) -> Result<ProfileUpdate, ApiError> {
    let name = match body.username.as_deref().map(str::trim) {
        None => None,
        Some("") => {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                "username must not be empty",
            ))
        }
        Some(name) if name.chars().count() > MAX_NAME_LEN => {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                format!("username must be at most {MAX_NAME_LEN} characters"),
            ))
        }
        Some(name) => Some(name.to_string()),
    };

    let image = if body.delete_image {
        Some(ImageUpdate::Remove)
    } else if let Some(blob) = body.image_blob.as_deref() {
        Some(ImageUpdate::Blob(decode_image_blob(req_id, blob)?))
    } else {
        body.image_url
            .as_deref()
            .map(|url| ImageUpdate::Url(url.trim().to_string()))
    };

    let update = ProfileUpdate { name, image };
    if update.is_empty() {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "no profile fields supplied",
        ));
    }
    Ok(update)
}

pub(super) async fn list_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<UserItem>>>, ApiError> {
    let rows = storemap_db::list_users(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &DbError::from(e)))?;

    Ok(ApiResponse::wrap(
        rows.into_iter().map(UserItem::from).collect(),
        req_id.0,
    ))
}

pub(super) async fn delete_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<DeleteUsersRequest>,
) -> Result<Json<ApiResponse<DeletedCount>>, ApiError> {
    if body.ids.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "ids must not be empty",
        ));
    }
    let ids = body
        .ids
        .iter()
        .map(|raw| parse_user_id(&req_id.0, raw))
        .collect::<Result<Vec<_>, _>>()?;

    let deleted = storemap_db::delete_users_by_ids(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &DbError::from(e)))?;
    tracing::info!(requested = ids.len(), deleted, "deleted users");

    Ok(ApiResponse::wrap(DeletedCount { deleted }, req_id.0))
}

pub(super) async fn get_profile(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProfileItem>>, ApiError> {
    let id = parse_user_id(&req_id.0, &id)?;
    let profile = storemap_db::get_user(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &DbError::from(e)))?
        .ok_or_else(|| user_not_found(req_id.0.clone(), id))?;

    Ok(ApiResponse::wrap(ProfileItem::from(profile), req_id.0))
}

pub(super) async fn update_profile(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileItem>>, ApiError> {
    let id = parse_user_id(&req_id.0, &id)?;
    let update = build_profile_update(&req_id.0, &body)?;

    let profile = storemap_db::update_profile(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &DbError::from(e)))?
        .ok_or_else(|| user_not_found(req_id.0.clone(), id))?;

    Ok(ApiResponse::wrap(ProfileItem::from(profile), req_id.0))
}

pub(super) async fn record_last_login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LastLoginData>>, ApiError> {
    let id = parse_user_id(&req_id.0, &id)?;
    let recorded = storemap_db::record_last_login(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &DbError::from(e)))?;

    if !recorded {
        return Err(user_not_found(req_id.0, id));
    }
    Ok(ApiResponse::wrap(LastLoginData { id, recorded }, req_id.0))
}
