//! Delivery serviceability by postal pincode.

use serde::{Deserialize, Serialize};

/// One delivery area as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceArea {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub pincode: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(rename = "DeliveryAvlabelStatus", default)]
    pub deliverable: bool,
}

/// Trim a pincode the way user input and backend records are compared.
#[must_use]
pub fn normalize_pincode(pincode: &str) -> &str {
    pincode.trim()
}

/// The set of known delivery areas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceAreas {
    areas: Vec<ServiceArea>,
}

impl ServiceAreas {
    #[must_use]
    pub const fn new(areas: Vec<ServiceArea>) -> Self {
        Self { areas }
    }

    /// Whether deliveries to `pincode` are currently accepted.
    ///
    /// Unknown pincodes and areas with delivery switched off both answer
    /// `false`.
    #[must_use]
    pub fn is_serviceable(&self, pincode: &str) -> bool {
        let pincode = normalize_pincode(pincode);
        !pincode.is_empty()
            && self
                .areas
                .iter()
                .any(|a| normalize_pincode(&a.pincode) == pincode && a.deliverable)
    }

    #[must_use]
    pub fn areas(&self) -> &[ServiceArea] {
        &self.areas
    }

    /// Number of areas currently accepting deliveries.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.areas.iter().filter(|a| a.deliverable).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn areas() -> ServiceAreas {
        serde_json::from_value::<Vec<ServiceArea>>(serde_json::json!([
            { "pincode": "301001", "city": "Alwar", "state": "RJ", "DeliveryAvlabelStatus": true },
            { "pincode": "400001", "city": "Mumbai", "state": "MH", "DeliveryAvlabelStatus": false },
        ]))
        .map(ServiceAreas::new)
        .unwrap()
    }

    #[test]
    fn test_serviceable_only_when_flag_is_true() {
        let areas = areas();
        assert!(areas.is_serviceable("301001"));
        assert!(areas.is_serviceable(" 301001 "));
        assert!(!areas.is_serviceable("400001"));
        assert!(!areas.is_serviceable("110001"));
        assert!(!areas.is_serviceable(""));
        assert_eq!(areas.active_count(), 1);
    }
}
