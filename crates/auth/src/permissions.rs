use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "stations.read"). The wildcard `"*"`
/// means "allow all" and is what the admin role maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: &'static str = "*";

    pub const STATIONS_READ: &'static str = "stations.read";
    pub const STATIONS_CREATE: &'static str = "stations.create";
    pub const STATIONS_UPDATE: &'static str = "stations.update";
    pub const STATIONS_DELETE: &'static str = "stations.delete";
    pub const STATIONS_INVENTORY: &'static str = "stations.inventory";
    pub const STATIONS_CAPACITY: &'static str = "stations.capacity";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::WILDCARD
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
