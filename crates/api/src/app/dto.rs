use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bikeshare_infra::InventoryError;
use bikeshare_stations::{NewStation, Station, StationPatch};

// -------------------------
// Request DTOs
// -------------------------

/// A JSON number, or a string holding one (form posts send coordinates as text).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn to_f64(&self, field: &str) -> Result<f64, InventoryError> {
        let value = match self {
            LooseNumber::Number(n) => *n,
            LooseNumber::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                InventoryError::Validation(format!("{field} must be numeric, got '{s}'"))
            })?,
        };

        if !value.is_finite() {
            return Err(InventoryError::Validation(format!("{field} must be finite")));
        }
        Ok(value)
    }

    fn to_count(&self, field: &str) -> Result<u32, InventoryError> {
        let value = self.to_f64(field)?;
        if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
            return Err(InventoryError::Validation(format!(
                "{field} must be a non-negative whole number, got {value}"
            )));
        }
        Ok(value as u32)
    }

    /// Like `to_count`, but a negative value breaks the inventory invariant
    /// rather than being malformed input.
    fn to_quantity(&self, field: &str) -> Result<u32, InventoryError> {
        let value = self.to_f64(field)?;
        if value < 0.0 {
            return Err(InventoryError::InvariantViolation(format!(
                "{field} cannot be negative, got {value}"
            )));
        }
        self.to_count(field)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStationRequest {
    pub name: Option<String>,
    pub lat: Option<LooseNumber>,
    pub lng: Option<LooseNumber>,
    pub capacity: Option<LooseNumber>,
    pub available: Option<LooseNumber>,
    pub open: Option<bool>,
}

impl CreateStationRequest {
    pub fn into_new_station(self) -> Result<NewStation, InventoryError> {
        let name = self
            .name
            .ok_or_else(|| InventoryError::Validation("name is required".to_string()))?;
        let lat = required_number(self.lat, "lat")?;
        let lng = required_number(self.lng, "lng")?;

        Ok(NewStation {
            name,
            lat,
            lng,
            capacity: self.capacity.map(|c| c.to_count("capacity")).transpose()?,
            available: self.available.map(|a| a.to_count("available")).transpose()?,
            open: self.open,
        })
    }
}

fn required_number(value: Option<LooseNumber>, field: &str) -> Result<f64, InventoryError> {
    value
        .ok_or_else(|| InventoryError::Validation(format!("{field} is required")))?
        .to_f64(field)
}

/// Direct edit body. Only these keys are accepted; anything else (`id`,
/// timestamps) fails deserialization. Numbers may arrive as text, the way the
/// admin edit form posts them.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStationRequest {
    pub name: Option<String>,
    pub lat: Option<LooseNumber>,
    pub lng: Option<LooseNumber>,
    pub capacity: Option<LooseNumber>,
    pub available: Option<LooseNumber>,
    pub open: Option<bool>,
}

impl UpdateStationRequest {
    pub fn into_patch(self) -> Result<StationPatch, InventoryError> {
        Ok(StationPatch {
            name: self.name,
            lat: self.lat.map(|v| v.to_f64("lat")).transpose()?,
            lng: self.lng.map(|v| v.to_f64("lng")).transpose()?,
            capacity: self.capacity.map(|v| v.to_quantity("capacity")).transpose()?,
            available: self.available.map(|v| v.to_quantity("available")).transpose()?,
            open: self.open,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustInventoryRequest {
    #[serde(default)]
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetCapacityRequest {
    pub capacity: i64,
}

impl SetCapacityRequest {
    pub fn capacity(&self) -> Result<u32, InventoryError> {
        u32::try_from(self.capacity).map_err(|_| {
            InventoryError::Validation(format!(
                "capacity must be a non-negative integer, got {}",
                self.capacity
            ))
        })
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationResponse {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub capacity: u32,
    pub available: u32,
    pub free_docks: u32,
    pub open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Station> for StationResponse {
    fn from(s: &Station) -> Self {
        Self {
            id: s.id_typed().to_string(),
            name: s.name().to_string(),
            lat: s.lat(),
            lng: s.lng(),
            capacity: s.capacity(),
            available: s.available(),
            free_docks: s.free_docks(),
            open: s.is_open(),
            created_at: s.created_at(),
            updated_at: s.updated_at(),
        }
    }
}

pub fn stations_to_response(mut stations: Vec<Station>) -> Vec<StationResponse> {
    stations.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id_typed().cmp(&b.id_typed()))
    });
    stations.iter().map(StationResponse::from).collect()
}
