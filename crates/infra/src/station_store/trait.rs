use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bikeshare_core::StationId;
use bikeshare_stations::{Station, StationPatch};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("station not found")]
    NotFound,

    #[error("duplicate station id: {0}")]
    Duplicate(StationId),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Durable keyed storage of station records.
///
/// Stores are dumb on purpose: `update` is a raw field merge and never checks
/// `available <= capacity`. The inventory engine is the only caller that may
/// write inventory fields, and it validates before writing.
///
/// Implementations must never expose a half-written row to `get`/`list`.
#[async_trait]
pub trait StationStore: Send + Sync {
    async fn insert(&self, station: Station) -> Result<(), StoreError>;

    async fn get(&self, id: StationId) -> Result<Option<Station>, StoreError>;

    /// Full scan, unordered.
    async fn list(&self) -> Result<Vec<Station>, StoreError>;

    /// Merge `patch` into the stored row, stamping `updated_at` with `now`.
    async fn update(
        &self,
        id: StationId,
        patch: &StationPatch,
        now: DateTime<Utc>,
    ) -> Result<Station, StoreError>;

    async fn delete(&self, id: StationId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> StationStore for Arc<S>
where
    S: StationStore + ?Sized,
{
    async fn insert(&self, station: Station) -> Result<(), StoreError> {
        (**self).insert(station).await
    }

    async fn get(&self, id: StationId) -> Result<Option<Station>, StoreError> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<Station>, StoreError> {
        (**self).list().await
    }

    async fn update(
        &self,
        id: StationId,
        patch: &StationPatch,
        now: DateTime<Utc>,
    ) -> Result<Station, StoreError> {
        (**self).update(id, patch, now).await
    }

    async fn delete(&self, id: StationId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}
