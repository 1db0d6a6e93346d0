//! Aflatoxin risk assessment.
//!
//! Scores come from the external model service through [`MlClient`]; when
//! that call fails and the fallback is enabled, [`fallback::assess`] scores
//! the request locally instead.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod fallback;
pub mod ml_client;

pub use ml_client::MlClient;

use crate::config::MlConfig;
use crate::models::{
    PredictionSource, Recommendation, RiskFactors, RiskLevel, SatelliteData, StorageType,
    WeatherData,
};

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("ML service request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ML service returned status {0}")]
    Status(u16),
    #[error("ML service response could not be decoded: {0}")]
    Decode(String),
}

/// Body sent to the model service
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub storage_type: StorageType,
    /// Ventilation quality, 0..=1
    pub storage_quality: f64,
    /// Grain moisture, percent
    pub moisture_content: f64,
}

/// Recommendation list as returned to clients alongside a prediction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendations {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub actions: Vec<String>,
    pub priority: String,
}

impl Recommendations {
    pub fn for_score(risk_score: f64, risk_level: RiskLevel) -> Self {
        Self {
            risk_level,
            risk_score,
            actions: actions_for(risk_level)
                .iter()
                .map(|a| a.to_string())
                .collect(),
            priority: priority_for(risk_score).to_string(),
        }
    }

    /// One stored recommendation per action, all with the list priority
    pub fn to_records(&self) -> Vec<Recommendation> {
        self.actions
            .iter()
            .map(|action| Recommendation {
                priority: self.priority.clone(),
                action: action.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub source: PredictionSource,
    pub factors: RiskFactors,
    pub satellite_data: Option<SatelliteData>,
    pub weather_data: Option<WeatherData>,
    pub recommendations: Recommendations,
    pub forecast: serde_json::Value,
}

pub fn priority_for(score: f64) -> &'static str {
    if score >= 8.0 {
        "URGENT"
    } else if score >= 6.0 {
        "HIGH"
    } else {
        "NORMAL"
    }
}

pub fn actions_for(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::Critical => &[
            "IMMEDIATE ACTION REQUIRED",
            "Deploy moisture-absorbing desiccants (silica gel/calcium chloride) in storage area",
            "Ensure maximum ventilation - open all vents and use fans if available",
            "Move produce to cooler, drier storage immediately if possible",
            "Reduce storage density to improve air circulation",
            "Consider emergency drying using mechanical dryers",
            "Test samples for aflatoxin contamination within 24 hours",
        ],
        RiskLevel::High => &[
            "HIGH RISK - Take preventive action within 24 hours",
            "Increase ventilation in storage area",
            "Deploy drying beads or moisture control agents",
            "Monitor temperature and humidity every 6 hours",
            "Inspect produce for visible mold or discoloration",
            "Prepare for possible relocation to better storage",
        ],
        RiskLevel::Moderate => &[
            "MODERATE RISK - Monitor closely and prepare",
            "Check storage ventilation systems are functioning",
            "Keep drying materials ready for deployment",
            "Monitor weather forecasts for humidity spikes",
            "Inspect storage area for moisture accumulation",
            "Plan for increased monitoring over next 48 hours",
        ],
        RiskLevel::Low => &[
            "LOW RISK - Maintain current practices",
            "Continue routine monitoring",
            "Keep storage area clean and well-ventilated",
            "Monitor for changes in weather conditions",
        ],
    }
}

/// `storageQuality` as sent by clients: a 0..=1 number or a label.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StorageQuality {
    Score(f64),
    Label(String),
}

impl StorageQuality {
    pub fn to_score(&self) -> Result<f64, String> {
        match self {
            StorageQuality::Score(v) => Ok(*v),
            StorageQuality::Label(label) => {
                if let Ok(v) = label.trim().parse::<f64>() {
                    return Ok(v);
                }
                match label.trim().to_ascii_lowercase().as_str() {
                    "excellent" => Ok(0.9),
                    "good" => Ok(0.7),
                    "fair" => Ok(0.5),
                    "poor" => Ok(0.3),
                    other => Err(format!("Unknown storage quality: {}", other)),
                }
            }
        }
    }
}

/// Model service with local fallback
pub struct RiskService {
    ml: MlClient,
    fallback_enabled: bool,
}

impl RiskService {
    pub fn new(config: &MlConfig) -> Result<Self, RiskError> {
        Ok(Self {
            ml: MlClient::new(&config.api_url, Duration::from_secs(config.timeout_secs))?,
            fallback_enabled: config.fallback_enabled,
        })
    }

    pub async fn assess(&self, request: &RiskRequest) -> Result<RiskAssessment, RiskError> {
        match self.ml.predict(request).await {
            Ok(assessment) => Ok(assessment),
            Err(e) if self.fallback_enabled => {
                warn!(
                    "ML service at {} unavailable ({}), using fallback scoring",
                    self.ml.api_url(),
                    e
                );
                Ok(fallback::assess(request))
            }
            Err(e) => Err(e),
        }
    }
}
