//! Service wiring: picks a station store and builds the inventory engine on
//! top of it.

use std::sync::Arc;

use bikeshare_infra::{InMemoryStationStore, InventoryEngine, StationStore};

use crate::config::{ApiConfig, StoreBackend};

pub type DynStationStore = Arc<dyn StationStore>;

/// Engine type shared by every handler, whatever the backing store.
pub type StationEngine = InventoryEngine<DynStationStore>;

#[derive(Clone)]
pub struct AppServices {
    engine: Arc<StationEngine>,
}

impl AppServices {
    pub fn new(store: DynStationStore) -> Self {
        Self {
            engine: Arc::new(InventoryEngine::new(store)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStationStore::new()))
    }

    pub fn engine(&self) -> &StationEngine {
        &self.engine
    }
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    match config.store {
        StoreBackend::Memory => {
            tracing::info!("using in-memory station store");
            Ok(AppServices::in_memory())
        }
        StoreBackend::Postgres => {
            #[cfg(feature = "postgres")]
            {
                return build_postgres_services(config).await;
            }
            #[cfg(not(feature = "postgres"))]
            {
                tracing::warn!(
                    "STATION_STORE=postgres but postgres feature not enabled, falling back to in-memory"
                );
                return Ok(AppServices::in_memory());
            }
        }
    }
}

#[cfg(feature = "postgres")]
async fn build_postgres_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    use anyhow::Context;
    use bikeshare_infra::station_store::PostgresStationStore;
    use sqlx::PgPool;

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when STATION_STORE=postgres")?;

    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = PostgresStationStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("failed to create stations table")?;

    tracing::info!("using postgres station store");
    Ok(AppServices::new(Arc::new(store)))
}
