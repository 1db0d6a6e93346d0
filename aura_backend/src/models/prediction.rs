use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, StorageType};
use crate::storage::Document;

pub const MIN_RISK_SCORE: f64 = 1.0;
pub const MAX_RISK_SCORE: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            RiskLevel::Critical
        } else if score >= 6.0 {
            RiskLevel::High
        } else if score >= 4.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MODERATE" | "MEDIUM" => Ok(RiskLevel::Moderate),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            other => Err(format!("Unknown risk level: {}", other)),
        }
    }
}

/// Clamp a raw score into the 1..=10 scale; NaN collapses to the minimum.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_RISK_SCORE;
    }
    score.clamp(MIN_RISK_SCORE, MAX_RISK_SCORE)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Ml,
    Fallback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_risk: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity_risk: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_stress_risk: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_quality_risk: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SatelliteData {
    #[serde(default)]
    pub ndvi: Option<f64>,
    #[serde(default)]
    pub ndmi: Option<f64>,
    #[serde(default, alias = "crop_health")]
    pub crop_health: Option<f64>,
    #[serde(default, alias = "stress_level")]
    pub stress_level: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub rainfall: Option<f64>,
    #[serde(default, alias = "wind_speed")]
    pub wind_speed: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageConditions {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// 0..=1, higher is better ventilated
    pub ventilation_score: f64,
    /// Grain moisture, percent
    pub moisture_content: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub priority: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(rename = "_id")]
    pub id: String,
    pub farmer: String,
    pub location: GeoPoint,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub source: PredictionSource,
    #[serde(default)]
    pub factors: RiskFactors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite_data: Option<SatelliteData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_data: Option<WeatherData>,
    pub storage_data: StorageConditions,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    pub prediction_date: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl Prediction {
    /// Build a prediction record; the score is clamped and the level is
    /// taken from the caller when supplied, otherwise derived from the score.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        farmer: &str,
        location: GeoPoint,
        risk_score: f64,
        risk_level: Option<RiskLevel>,
        confidence: f64,
        source: PredictionSource,
        storage_data: StorageConditions,
        validity: Duration,
    ) -> Self {
        let risk_score = clamp_score(risk_score);
        let now = Utc::now();
        Self {
            id: new_id(),
            farmer: farmer.to_string(),
            location,
            risk_score,
            risk_level: risk_level.unwrap_or_else(|| RiskLevel::from_score(risk_score)),
            confidence: confidence.clamp(0.0, 1.0),
            source,
            factors: RiskFactors::default(),
            satellite_data: None,
            weather_data: None,
            storage_data,
            recommendations: Vec::new(),
            prediction_date: now,
            valid_until: now + validity,
        }
    }
}

impl Document for Prediction {
    const COLLECTION: &'static str = "predictions";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_score(1.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(3.99), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(4.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(6.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(7.9), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(8.0), RiskLevel::Critical);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(0.2), 1.0);
        assert_eq!(clamp_score(12.5), 10.0);
        assert_eq!(clamp_score(f64::NAN), 1.0);
        assert_eq!(clamp_score(5.5), 5.5);
    }

    #[test]
    fn test_prediction_serializes_camel_case() {
        let prediction = Prediction::new(
            "farmer-1",
            GeoPoint {
                latitude: 15.3,
                longitude: 75.7,
            },
            14.0,
            None,
            0.8,
            PredictionSource::Ml,
            StorageConditions {
                storage_type: StorageType::Bag,
                ventilation_score: 0.5,
                moisture_content: 12.0,
            },
            Duration::hours(72),
        );

        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["riskScore"], 10.0);
        assert_eq!(json["riskLevel"], "CRITICAL");
        assert_eq!(json["storageData"]["type"], "bag");
        assert_eq!(json["source"], "ml");
        assert_eq!(
            prediction.valid_until - prediction.prediction_date,
            Duration::hours(72)
        );
    }

    #[test]
    fn test_satellite_data_accepts_snake_case() {
        let data: SatelliteData = serde_json::from_value(serde_json::json!({
            "ndvi": 0.65,
            "crop_health": 0.7,
            "stress_level": 0.3,
            "canopy_water": 0.6
        }))
        .unwrap();
        assert_eq!(data.crop_health, Some(0.7));
        assert_eq!(data.stress_level, Some(0.3));
    }
}
