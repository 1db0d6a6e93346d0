//! Document models persisted in the AURA document store.
//!
//! Every model serializes with camelCase field names and exposes its id as
//! `_id`, which is the wire contract the web frontend consumes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub mod alert;
pub mod certification;
pub mod farmer;
pub mod prediction;

pub use alert::{Alert, AlertType, SentChannels};
pub use certification::{
    Certification, CertificationMetadata, CertificationStatus, Intervention,
};
pub use farmer::{AlertPreferences, Crop, CropType, Farmer, FarmerProfile, Location, Role};
pub use prediction::{
    GeoPoint, Prediction, PredictionSource, Recommendation, RiskFactors, RiskLevel,
    SatelliteData, StorageConditions, WeatherData,
};

/// How a crop batch is kept after harvest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Silo,
    #[default]
    Bag,
    Warehouse,
    Open,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Silo => "silo",
            StorageType::Bag => "bag",
            StorageType::Warehouse => "warehouse",
            StorageType::Open => "open",
        }
    }
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silo" => Ok(StorageType::Silo),
            "bag" => Ok(StorageType::Bag),
            "warehouse" => Ok(StorageType::Warehouse),
            "open" => Ok(StorageType::Open),
            other => Err(format!("Unknown storage type: {}", other)),
        }
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Parse either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Serde helpers for optional dates that accept the formats of [`parse_date`].
pub mod flexible_date {
    use super::parse_date;
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse_date(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date: {}", s))),
        }
    }
}
