use super::{Recommendations, RiskAssessment, RiskRequest};
use crate::models::prediction::clamp_score;
use crate::models::{PredictionSource, RiskFactors, RiskLevel, StorageType};

pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Local rule-based score used when the model service is unreachable.
///
/// Additive on the request alone: storage type, ventilation quality and
/// grain moisture each contribute a fixed increment over a base of 1.0.
pub fn score(request: &RiskRequest) -> f64 {
    let mut risk = 1.0;

    // Storage exposure
    risk += match request.storage_type {
        StorageType::Open => 2.5,
        StorageType::Bag => 1.0,
        StorageType::Warehouse => 0.5,
        StorageType::Silo => 0.0,
    };

    // Ventilation
    if request.storage_quality < 0.4 {
        risk += 2.0;
    } else if request.storage_quality < 0.6 {
        risk += 1.0;
    }

    // Grain moisture
    if request.moisture_content > 14.0 {
        risk += 3.0;
    } else if request.moisture_content > 13.0 {
        risk += 1.5;
    }

    clamp_score(risk)
}

pub fn assess(request: &RiskRequest) -> RiskAssessment {
    let risk_score = score(request);
    let risk_level = RiskLevel::from_score(risk_score);

    RiskAssessment {
        risk_score,
        risk_level,
        confidence: FALLBACK_CONFIDENCE,
        source: PredictionSource::Fallback,
        factors: RiskFactors {
            temperature_risk: Some(1.0),
            humidity_risk: Some(1.0),
            crop_stress_risk: Some(1.0),
            storage_quality_risk: Some(1.0 + (1.0 - request.storage_quality.clamp(0.0, 1.0))),
        },
        satellite_data: None,
        weather_data: None,
        recommendations: Recommendations::for_score(risk_score, risk_level),
        forecast: serde_json::Value::Null,
    }
}
