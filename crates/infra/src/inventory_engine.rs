//! Inventory mutation engine.
//!
//! The only writer of `available`/`capacity`. Every mutation follows the same
//! sequence:
//!
//! ```text
//! lock(station_id)
//!   ↓
//! 1. Load current row (NotFound if absent)
//!   ↓
//! 2. Run the pure policy from `bikeshare-stations` (validate / clamp / reject)
//!   ↓
//! 3. Write the resulting fields back through the store
//!   ↓
//! unlock
//! ```
//!
//! A policy failure returns before step 3, so a rejected mutation persists
//! nothing. Reads (`get`/`list`) skip the lock.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use bikeshare_core::{DomainError, StationId};
use bikeshare_stations::{NewStation, Station, StationPatch};

use crate::keyed_lock::KeyedLocks;
use crate::station_store::{StationStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("station not found")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<DomainError> for InventoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => InventoryError::Validation(msg),
            DomainError::InvalidId(msg) => InventoryError::Validation(msg),
            DomainError::InvariantViolation(msg) => InventoryError::InvariantViolation(msg),
        }
    }
}

impl From<StoreError> for InventoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => InventoryError::NotFound,
            other => InventoryError::Store(other.to_string()),
        }
    }
}

/// Serialises mutations per station and routes them through the station
/// policies.
#[derive(Debug)]
pub struct InventoryEngine<S> {
    store: S,
    locks: KeyedLocks<StationId>,
}

impl<S> InventoryEngine<S>
where
    S: StationStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    #[instrument(skip(self, input), fields(name = %input.name), err)]
    pub async fn create(&self, input: NewStation) -> Result<Station, InventoryError> {
        let station = Station::create(StationId::new(), input, Utc::now())?;
        self.store.insert(station.clone()).await?;
        info!(
            station_id = %station.id_typed(),
            capacity = station.capacity(),
            available = station.available(),
            "station created"
        );
        Ok(station)
    }

    pub async fn get(&self, id: StationId) -> Result<Station, InventoryError> {
        self.store.get(id).await?.ok_or(InventoryError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<Station>, InventoryError> {
        Ok(self.store.list().await?)
    }

    /// Direct edit. Rejects (never clamps) a patch whose merged result breaks
    /// `available <= capacity`. An empty patch performs no write.
    #[instrument(skip(self, patch), fields(station_id = %id), err)]
    pub async fn replace(&self, id: StationId, patch: StationPatch) -> Result<Station, InventoryError> {
        let _guard = self.locks.lock(id).await;
        let current = self.get(id).await?;

        if patch.is_empty() {
            return Ok(current);
        }

        let now = Utc::now();
        current.with_patch(&patch, now).inspect_err(|e| {
            warn!(
                capacity = current.capacity(),
                available = current.available(),
                error = %e,
                "direct edit rejected"
            );
        })?;

        let stored = self.store.update(id, &patch, now).await?;
        info!(
            capacity = stored.capacity(),
            available = stored.available(),
            "station replaced"
        );
        Ok(stored)
    }

    /// Delta adjustment, clamped into `[0, capacity]`. A zero delta is a no-op
    /// and performs no write.
    #[instrument(skip(self), fields(station_id = %id), err)]
    pub async fn adjust_inventory(&self, id: StationId, delta: i64) -> Result<Station, InventoryError> {
        let _guard = self.locks.lock(id).await;
        let current = self.get(id).await?;

        if delta == 0 {
            return Ok(current);
        }

        let now = Utc::now();
        let next = current.with_delta(delta, now);
        let stored = self
            .store
            .update(id, &StationPatch::available(next.available()), now)
            .await?;

        info!(
            from = current.available(),
            to = stored.available(),
            capacity = stored.capacity(),
            "inventory adjusted"
        );
        Ok(stored)
    }

    /// Capacity resize. Shrinking below `available` drops the excess bikes.
    #[instrument(skip(self), fields(station_id = %id), err)]
    pub async fn set_capacity(&self, id: StationId, capacity: u32) -> Result<Station, InventoryError> {
        let _guard = self.locks.lock(id).await;
        let current = self.get(id).await?;

        let now = Utc::now();
        let next = current.with_capacity(capacity, now);
        let stored = self
            .store
            .update(id, &StationPatch::inventory(next.capacity(), next.available()), now)
            .await?;

        if stored.available() < current.available() {
            warn!(
                dropped = current.available() - stored.available(),
                capacity,
                "capacity shrink clamped availability"
            );
        }
        info!(capacity = stored.capacity(), available = stored.available(), "capacity set");
        Ok(stored)
    }

    /// Unconditional removal. Records that reference the station are left
    /// untouched.
    #[instrument(skip(self), fields(station_id = %id), err)]
    pub async fn delete(&self, id: StationId) -> Result<(), InventoryError> {
        let _guard = self.locks.lock(id).await;
        self.store.delete(id).await?;
        info!("station deleted");
        Ok(())
    }
}
