//! Station domain module.
//!
//! This crate contains the inventory rules for bike-dock stations, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). Callers
//! are responsible for sequencing reads and writes; every function here takes
//! the current state and returns the next one or a `DomainError`.

pub mod patch;
pub mod station;

pub use patch::StationPatch;
pub use station::{DEFAULT_AVAILABLE, DEFAULT_CAPACITY, NewStation, Station, StationRow};
