//! Station entity store boundary.
//!
//! This module defines an infrastructure-facing abstraction for storing and
//! loading station rows without making any storage assumptions.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStationStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStationStore;
pub use r#trait::{StationStore, StoreError};
