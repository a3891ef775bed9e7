//! Infrastructure layer: station storage, keyed locking, and the inventory
//! mutation engine that ties them to the station policies.

pub mod inventory_engine;
pub mod keyed_lock;
pub mod station_store;

pub use inventory_engine::{InventoryEngine, InventoryError};
pub use keyed_lock::{KeyedLockGuard, KeyedLocks};
pub use station_store::{InMemoryStationStore, StationStore, StoreError};
