//! Delivery addresses.

use serde::{Deserialize, Serialize};

use crate::types::{AddressId, AddressKind};

/// A saved delivery address, in the backend's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: AddressId,
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub alt_phone: Option<String>,
    pub pincode: String,
    pub state: String,
    pub city: String,
    pub house_no: String,
    pub area: String,
    #[serde(default)]
    pub landmark: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: AddressKind,
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    /// Single-line rendering used in order summaries.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {} - {}",
            self.house_no, self.area, self.city, self.pincode
        )
    }

    /// The default address if one is flagged, else the first one.
    #[must_use]
    pub fn preferred(addresses: &[Self]) -> Option<&Self> {
        addresses
            .iter()
            .find(|a| a.is_default)
            .or_else(|| addresses.first())
    }
}

/// Form data for creating an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub full_name: String,
    pub phone: String,
    pub alt_phone: String,
    pub pincode: String,
    pub state: String,
    pub city: String,
    pub house_no: String,
    pub area: String,
    pub landmark: String,
    #[serde(rename = "type")]
    pub kind: AddressKind,
}

impl NewAddress {
    /// Names of required fields left blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("fullName", &self.full_name),
            ("phone", &self.phone),
            ("pincode", &self.pincode),
            ("state", &self.state),
            ("city", &self.city),
            ("houseNo", &self.house_no),
            ("area", &self.area),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}
