use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bikeshare_core::{DomainError, DomainResult, StationId};

use crate::patch::StationPatch;

/// Dock count used when a station is created without an explicit capacity.
pub const DEFAULT_CAPACITY: u32 = 10;

/// Bike count used when a station is created without an explicit availability.
pub const DEFAULT_AVAILABLE: u32 = 0;

/// A bike-dock station.
///
/// Invariant after every successful policy call: `available <= capacity`
/// (both are unsigned, so the lower bound holds by construction).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    id: StationId,
    name: String,
    lat: f64,
    lng: f64,
    capacity: u32,
    available: u32,
    open: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Input for station creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStation {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub capacity: Option<u32>,
    pub available: Option<u32>,
    pub open: Option<bool>,
}

impl NewStation {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
            capacity: None,
            available: None,
            open: None,
        }
    }

    pub fn with_inventory(mut self, capacity: u32, available: u32) -> Self {
        self.capacity = Some(capacity);
        self.available = Some(available);
        self
    }
}

/// Flat persisted shape of a station.
///
/// Stores hand rows back through `Station::from(row)`; rows are trusted, no
/// policy runs on hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRow {
    pub id: StationId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub capacity: u32,
    pub available: u32,
    pub open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StationRow> for Station {
    fn from(row: StationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            lat: row.lat,
            lng: row.lng,
            capacity: row.capacity,
            available: row.available,
            open: row.open,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Station> for StationRow {
    fn from(s: &Station) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            lat: s.lat,
            lng: s.lng,
            capacity: s.capacity,
            available: s.available,
            open: s.open,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

impl Station {
    /// Validate creation input and build a new station.
    ///
    /// Every failure here is a `Validation` error, including an initial
    /// availability above capacity.
    pub fn create(id: StationId, input: NewStation, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = validate_name(&input.name)?;
        let lat = validate_coordinate("lat", input.lat)?;
        let lng = validate_coordinate("lng", input.lng)?;
        let capacity = input.capacity.unwrap_or(DEFAULT_CAPACITY);
        let available = input.available.unwrap_or(DEFAULT_AVAILABLE);

        if available > capacity {
            return Err(DomainError::validation(format!(
                "available ({available}) cannot exceed capacity ({capacity})"
            )));
        }

        Ok(Self {
            id,
            name,
            lat,
            lng,
            capacity,
            available,
            open: input.open.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> StationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Free docks at this station.
    pub fn free_docks(&self) -> u32 {
        self.capacity.saturating_sub(self.available)
    }

    pub fn check_invariant(&self) -> DomainResult<()> {
        if self.available > self.capacity {
            return Err(DomainError::invariant(format!(
                "available ({}) exceeds capacity ({})",
                self.available, self.capacity
            )));
        }
        Ok(())
    }

    /// Direct edit: merge the patch and reject (never clamp) a result that
    /// breaks the inventory invariant.
    pub fn with_patch(&self, patch: &StationPatch, now: DateTime<Utc>) -> DomainResult<Self> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(lat) = patch.lat {
            validate_coordinate("lat", lat)?;
        }
        if let Some(lng) = patch.lng {
            validate_coordinate("lng", lng)?;
        }

        let mut next = self.clone();
        next.merge(patch, now);
        next.check_invariant()?;
        Ok(next)
    }

    /// Delta adjustment: `available + delta`, clamped into `[0, capacity]`.
    ///
    /// A zero delta returns an identical station (timestamps included).
    pub fn with_delta(&self, delta: i64, now: DateTime<Utc>) -> Self {
        if delta == 0 {
            return self.clone();
        }

        let target = i64::from(self.available)
            .saturating_add(delta)
            .clamp(0, i64::from(self.capacity));

        let mut next = self.clone();
        // In range [0, capacity] so the conversion cannot fail.
        next.available = u32::try_from(target).unwrap_or(self.capacity);
        next.updated_at = now;
        next
    }

    /// Capacity resize: capacity is authoritative, `available` is clamped down
    /// on shrink.
    pub fn with_capacity(&self, capacity: u32, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.capacity = capacity;
        next.available = next.available.min(capacity);
        next.updated_at = now;
        next
    }

    /// Raw field merge. No validation and no invariant check.
    pub fn merge(&mut self, patch: &StationPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(lat) = patch.lat {
            self.lat = lat;
        }
        if let Some(lng) = patch.lng {
            self.lng = lng;
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = capacity;
        }
        if let Some(available) = patch.available {
            self.available = available;
        }
        if let Some(open) = patch.open {
            self.open = open;
        }
        self.updated_at = now;
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    Ok(trimmed.to_string())
}

fn validate_coordinate(label: &str, value: f64) -> DomainResult<f64> {
    if !value.is_finite() {
        return Err(DomainError::validation(format!("{label} must be a number")));
    }
    Ok(value)
}
