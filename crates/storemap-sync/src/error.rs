use storemap_db::DbError;
use storemap_sources::SourceError;
use thiserror::Error;

/// Failures that abort a sync or delete operation as a whole.
///
/// Per-store geocoding and update failures never surface here; they are
/// folded into the run's statistics instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required credential or endpoint is not configured.
    #[error("configuration error: {0}")]
    Configuration(#[source] SourceError),

    /// The remote inventory listing could not be fetched.
    #[error("upstream error: {0}")]
    Upstream(#[source] SourceError),

    #[error("persistence error: {0}")]
    Persistence(#[from] DbError),
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        if err.is_configuration() {
            Self::Configuration(err)
        } else {
            Self::Upstream(err)
        }
    }
}
