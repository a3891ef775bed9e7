use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bikeshare_core::StationId;
use bikeshare_stations::{Station, StationPatch};

use super::r#trait::{StationStore, StoreError};

/// In-memory station table.
///
/// Intended for tests/dev. Rows are replaced whole under the write lock, so
/// readers only ever see committed rows.
#[derive(Debug, Default)]
pub struct InMemoryStationStore {
    rows: RwLock<HashMap<StationId, Station>>,
}

impl InMemoryStationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl StationStore for InMemoryStationStore {
    async fn insert(&self, station: Station) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let id = station.id_typed();
        if rows.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        rows.insert(id, station);
        Ok(())
    }

    async fn get(&self, id: StationId) -> Result<Option<Station>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Station>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().collect())
    }

    async fn update(
        &self,
        id: StationId,
        patch: &StationPatch,
        now: DateTime<Utc>,
    ) -> Result<Station, StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let row = rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.merge(patch, now);
        Ok(row.clone())
    }

    async fn delete(&self, id: StationId) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikeshare_stations::NewStation;

    fn station(capacity: u32, available: u32) -> Station {
        Station::create(
            StationId::new(),
            NewStation::new("Dock", 0.0, 0.0).with_inventory(capacity, available),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = InMemoryStationStore::new();
        let s = station(10, 2);
        store.insert(s.clone()).await.unwrap();
        assert_eq!(store.get(s.id_typed()).await.unwrap(), Some(s));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let store = InMemoryStationStore::new();
        let s = station(10, 2);
        store.insert(s.clone()).await.unwrap();
        let err = store.insert(s.clone()).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate(s.id_typed()));
    }

    #[tokio::test]
    async fn update_is_a_raw_merge() {
        let store = InMemoryStationStore::new();
        let s = station(10, 2);
        store.insert(s.clone()).await.unwrap();

        // The store does not guard the invariant; that is the engine's job.
        let merged = store
            .update(s.id_typed(), &StationPatch::available(50), Utc::now())
            .await
            .unwrap();
        assert_eq!(merged.available(), 50);
        assert_eq!(merged.capacity(), 10);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = InMemoryStationStore::new();
        let err = store
            .update(StationId::new(), &StationPatch::available(1), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn delete_then_get_is_empty() {
        let store = InMemoryStationStore::new();
        let s = station(10, 2);
        store.insert(s.clone()).await.unwrap();
        store.delete(s.id_typed()).await.unwrap();
        assert_eq!(store.get(s.id_typed()).await.unwrap(), None);
        assert_eq!(store.delete(s.id_typed()).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn list_returns_every_row() {
        let store = InMemoryStationStore::new();
        for _ in 0..3 {
            store.insert(station(5, 1)).await.unwrap();
        }
        assert_eq!(store.list().await.unwrap().len(), 3);
    }
}
