//! Database operations for the `users` table.
//!
//! Users are created by the external authentication provider; this module
//! only reads, edits profiles, and deletes them.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// A row from the `users` table without the image blob.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A full `users` row, including the uploaded image bytes when present.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub image_blob: Option<Vec<u8>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a profile edit treats the avatar.
///
/// A user has at most one of an image URL or an uploaded blob; setting one
/// clears the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageUpdate {
    Remove,
    Url(String),
    Blob(Vec<u8>),
}

/// A partial profile edit. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub image: Option<ImageUpdate>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.image.is_none()
    }
}

/// List all users, newest first. Blobs are not loaded.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_users(pool: &PgPool) -> Result<Vec<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id, name, email, image, last_login, created_at, updated_at \
         FROM users \
         ORDER BY created_at DESC, id ASC",
    )
    .fetch_all(pool)
    .await
}

/// Fetch one user with the image blob.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        "SELECT id, name, email, image, image_blob, last_login, created_at, updated_at \
         FROM users \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Apply a profile edit and return the updated row, or `None` for an unknown
/// user.
///
/// An empty URL clears the image the same way [`ImageUpdate::Remove`] does.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the update fails.
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: &ProfileUpdate,
) -> Result<Option<UserProfile>, sqlx::Error> {
    let (action, url, blob): (&str, Option<&str>, Option<&[u8]>) = match &update.image {
        None => ("keep", None, None),
        Some(ImageUpdate::Remove) => ("remove", None, None),
        Some(ImageUpdate::Url(url)) if url.trim().is_empty() => ("remove", None, None),
        Some(ImageUpdate::Url(url)) => ("url", Some(url.as_str()), None),
        Some(ImageUpdate::Blob(bytes)) => ("blob", None, Some(bytes.as_slice())),
    };

    sqlx::query_as::<_, UserProfile>(
        "UPDATE users SET \
             name       = COALESCE($2, name), \
             image      = CASE $3::text WHEN 'keep' THEN image \
                                        WHEN 'url'  THEN $4::text \
                                        ELSE NULL END, \
             image_blob = CASE $3::text WHEN 'keep' THEN image_blob \
                                        WHEN 'blob' THEN $5::bytea \
                                        ELSE NULL END, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, name, email, image, image_blob, last_login, created_at, updated_at",
    )
    .bind(id)
    .bind(update.name.as_deref())
    .bind(action)
    .bind(url)
    .bind(blob)
    .fetch_optional(pool)
    .await
}

/// Stamp `last_login` and `updated_at` with the current time. Returns `false`
/// for an unknown user.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the update fails.
pub async fn record_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let rows_affected =
        sqlx::query("UPDATE users SET last_login = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();

    Ok(rows_affected > 0)
}

/// Delete a set of users. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the delete fails.
pub async fn delete_users_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let rows_affected = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows_affected)
}
