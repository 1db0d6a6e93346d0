use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{flexible_date, new_id};
use crate::storage::Document;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificationStatus {
    #[default]
    Pending,
    Certified,
    Rejected,
}

impl CertificationStatus {
    /// Pending batches can be decided either way; a certified batch can
    /// still be revoked. Rejection is terminal.
    pub fn can_transition_to(&self, next: CertificationStatus) -> bool {
        use CertificationStatus::*;
        matches!(
            (self, next),
            (Pending, Certified) | (Pending, Rejected) | (Certified, Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CertificationStatus::Pending => "PENDING",
            CertificationStatus::Certified => "CERTIFIED",
            CertificationStatus::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for CertificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(CertificationStatus::Pending),
            "CERTIFIED" => Ok(CertificationStatus::Certified),
            "REJECTED" => Ok(CertificationStatus::Rejected),
            other => Err(format!("Unknown certification status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intervention {
    #[serde(
        default,
        deserialize_with = "flexible_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<DateTime<Utc>>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effectiveness: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_conditions: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preventive_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_results: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    #[serde(rename = "_id")]
    pub id: String,
    pub farmer: String,
    pub batch_id: String,
    pub crop_type: String,
    pub quantity: f64,
    pub harvest_date: DateTime<Utc>,
    pub certification_date: DateTime<Utc>,
    pub average_risk_score: f64,
    #[serde(default)]
    pub predictions: Vec<String>,
    #[serde(default)]
    pub interventions_taken: Vec<Intervention>,
    #[serde(default)]
    pub blockchain_tx_hash: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub status: CertificationStatus,
    #[serde(default)]
    pub verification_url: Option<String>,
    #[serde(default)]
    pub metadata: CertificationMetadata,
    pub expires_at: DateTime<Utc>,
}

impl Certification {
    pub fn new(
        farmer: &str,
        crop_type: &str,
        quantity: f64,
        harvest_date: Option<DateTime<Utc>>,
        average_risk_score: f64,
        validity: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            farmer: farmer.to_string(),
            batch_id: generate_batch_id(now),
            crop_type: crop_type.trim().to_string(),
            quantity,
            harvest_date: harvest_date.unwrap_or(now),
            certification_date: now,
            average_risk_score,
            predictions: Vec::new(),
            interventions_taken: Vec::new(),
            blockchain_tx_hash: None,
            qr_code: None,
            status: CertificationStatus::Pending,
            verification_url: None,
            metadata: CertificationMetadata::default(),
            expires_at: now + validity,
        }
    }

    /// A batch verifies only while certified and unexpired
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CertificationStatus::Certified && now < self.expires_at
    }
}

impl Document for Certification {
    const COLLECTION: &'static str = "certifications";

    fn id(&self) -> &str {
        &self.id
    }
}

/// `AURA-<unix millis>-<8 hex chars>`
pub fn generate_batch_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("AURA-{}-{}", now.timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_shape() {
        let now = Utc::now();
        let id = generate_batch_id(now);
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "AURA");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 8);
        assert_ne!(generate_batch_id(now), id);
    }

    #[test]
    fn test_status_transitions() {
        use CertificationStatus::*;
        assert!(Pending.can_transition_to(Certified));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Certified.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Certified));
        assert!(!Certified.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
        assert_eq!("certified".parse::<CertificationStatus>(), Ok(Certified));
        assert!("revoked".parse::<CertificationStatus>().is_err());
    }

    #[test]
    fn test_validity_window() {
        let mut cert = Certification::new("f1", "maize", 1000.0, None, 3.0, Duration::days(365));
        let now = Utc::now();
        assert!(!cert.is_valid_at(now));

        cert.status = CertificationStatus::Certified;
        assert!(cert.is_valid_at(now));
        assert!(!cert.is_valid_at(now + Duration::days(366)));
    }

    #[test]
    fn test_wire_defaults() {
        let cert = Certification::new("f1", " maize ", 500.0, None, 5.0, Duration::days(365));
        let json = serde_json::to_value(&cert).unwrap();
        assert_eq!(json["cropType"], "maize");
        assert_eq!(json["status"], "PENDING");
        assert!(json["blockchainTxHash"].is_null());
        assert!(json["qrCode"].is_null());
    }
}
