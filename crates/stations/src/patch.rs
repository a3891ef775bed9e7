use serde::{Deserialize, Serialize};

/// Allow-listed partial update of a station.
///
/// Only these fields can ever be written through an edit; identifiers and
/// timestamps are owned by the system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
}

impl StationPatch {
    pub fn available(available: u32) -> Self {
        Self {
            available: Some(available),
            ..Self::default()
        }
    }

    pub fn inventory(capacity: u32, available: u32) -> Self {
        Self {
            capacity: Some(capacity),
            available: Some(available),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.lat.is_none()
            && self.lng.is_none()
            && self.capacity.is_none()
            && self.available.is_none()
            && self.open.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patch_is_empty() {
        assert!(StationPatch::default().is_empty());
        assert!(!StationPatch::available(3).is_empty());
    }

    #[test]
    fn serializes_only_present_fields() {
        let json = serde_json::to_value(StationPatch::inventory(10, 4)).unwrap();
        assert_eq!(json, serde_json::json!({ "capacity": 10, "available": 4 }));
    }
}
