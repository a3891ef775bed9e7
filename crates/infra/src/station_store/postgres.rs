//! Postgres-backed station store.
//!
//! ## Error Mapping
//!
//! | SQLx error | Code | StoreError |
//! |---|---|---|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (check violation) | `23514` | `Backend` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / network / other | n/a | `Backend` |
//!
//! ## Locking
//!
//! `update` runs as one transaction: `SELECT … FOR UPDATE`, merge, `UPDATE`.
//! The row lock serialises raw merges across processes; the inventory engine's
//! keyed locks serialise the full read-decide-write cycle inside a process.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;

use bikeshare_core::StationId;
use bikeshare_stations::{Station, StationPatch, StationRow};

use super::r#trait::{StationStore, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS stations (
    id          UUID PRIMARY KEY,
    name        TEXT NOT NULL,
    lat         DOUBLE PRECISION NOT NULL,
    lng         DOUBLE PRECISION NOT NULL,
    capacity    BIGINT NOT NULL CHECK (capacity >= 0),
    available   BIGINT NOT NULL CHECK (available >= 0),
    open        BOOLEAN NOT NULL DEFAULT TRUE,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
)
"#;

const COLUMNS: &str = "id, name, lat, lng, capacity, available, open, created_at, updated_at";

/// Postgres-backed station table.
#[derive(Debug, Clone)]
pub struct PostgresStationStore {
    pool: Arc<PgPool>,
}

impl PostgresStationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the `stations` table if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl StationStore for PostgresStationStore {
    #[instrument(skip(self, station), fields(station_id = %station.id_typed()), err)]
    async fn insert(&self, station: Station) -> Result<(), StoreError> {
        let row = StationRow::from(&station);
        sqlx::query(
            r#"
            INSERT INTO stations (id, name, lat, lng, capacity, available, open, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(row.id.as_uuid())
        .bind(&row.name)
        .bind(row.lat)
        .bind(row.lng)
        .bind(i64::from(row.capacity))
        .bind(i64::from(row.available))
        .bind(row.open)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))
        .map_err(|e| match e {
            StoreError::Duplicate(_) => StoreError::Duplicate(row.id),
            other => other,
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(station_id = %id), err)]
    async fn get(&self, id: StationId) -> Result<Option<Station>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM stations WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|r| decode_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Station>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM stations"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(decode_row).collect()
    }

    #[instrument(skip(self, patch), fields(station_id = %id), err)]
    async fn update(
        &self,
        id: StationId,
        patch: &StationPatch,
        now: DateTime<Utc>,
    ) -> Result<Station, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update.begin", e))?;

        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM stations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update.select", e))?
        .ok_or(StoreError::NotFound)?;

        let mut station = decode_row(&row)?;
        station.merge(patch, now);
        let merged = StationRow::from(&station);

        sqlx::query(
            r#"
            UPDATE stations
            SET name = $2, lat = $3, lng = $4, capacity = $5, available = $6, open = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(merged.id.as_uuid())
        .bind(&merged.name)
        .bind(merged.lat)
        .bind(merged.lng)
        .bind(i64::from(merged.capacity))
        .bind(i64::from(merged.available))
        .bind(merged.open)
        .bind(merged.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update.write", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update.commit", e))?;

        Ok(station)
    }

    #[instrument(skip(self), fields(station_id = %id), err)]
    async fn delete(&self, id: StationId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM stations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn decode_row(row: &PgRow) -> Result<Station, StoreError> {
    let decode = |e: sqlx::Error| map_sqlx_error("decode", e);
    let count = |column: &str, value: i64| {
        u32::try_from(value)
            .map_err(|_| StoreError::Backend(format!("{column} out of range: {value}")))
    };

    let id: uuid::Uuid = row.try_get("id").map_err(decode)?;
    let capacity: i64 = row.try_get("capacity").map_err(decode)?;
    let available: i64 = row.try_get("available").map_err(decode)?;

    Ok(Station::from(StationRow {
        id: StationId::from_uuid(id),
        name: row.try_get("name").map_err(decode)?,
        lat: row.try_get("lat").map_err(decode)?,
        lng: row.try_get("lng").map_err(decode)?,
        capacity: count("capacity", capacity)?,
        available: count("available", available)?,
        open: row.try_get("open").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    }))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Placeholder id; `insert` swaps in the real one.
                Some("23505") => StoreError::Duplicate(StationId::from_uuid(uuid::Uuid::nil())),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
