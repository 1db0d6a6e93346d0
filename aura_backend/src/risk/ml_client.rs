use std::time::Duration;

use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

use super::{Recommendations, RiskAssessment, RiskError, RiskRequest};
use crate::models::{PredictionSource, RiskFactors, RiskLevel, SatelliteData, WeatherData};

/// Client for the external aflatoxin risk model service
pub struct MlClient {
    client: Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct MlResponse {
    prediction: MlPrediction,
    recommendations: MlRecommendations,
    #[serde(default)]
    risk_factors: MlRiskFactors,
    #[serde(default)]
    data_sources: MlDataSources,
    #[serde(default)]
    forecast: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MlPrediction {
    risk_score: f64,
    #[serde(default)]
    risk_level: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MlRecommendations {
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    priority: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MlRiskFactors {
    temperature_risk: Option<f64>,
    humidity_risk: Option<f64>,
    crop_stress_risk: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct MlDataSources {
    #[serde(default)]
    satellite: Option<SatelliteData>,
    #[serde(default)]
    weather: Option<WeatherData>,
}

impl MlClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, RiskError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// POST the request to `<api_url>/api/predict` and decode the assessment.
    pub async fn predict(&self, request: &RiskRequest) -> Result<RiskAssessment, RiskError> {
        let url = format!("{}/api/predict", self.api_url);
        debug!("Requesting ML prediction from {}", url);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RiskError::Status(status.as_u16()));
        }

        let body: MlResponse = response
            .json()
            .await
            .map_err(|e| RiskError::Decode(e.to_string()))?;

        let assessment = body.into_assessment();
        info!(
            "ML prediction: score {:.2} ({})",
            assessment.risk_score,
            assessment.risk_level.as_str()
        );
        Ok(assessment)
    }
}

impl MlResponse {
    fn into_assessment(self) -> RiskAssessment {
        let score = crate::models::prediction::clamp_score(self.prediction.risk_score);
        let level = self
            .prediction
            .risk_level
            .as_deref()
            .and_then(|l| l.parse::<RiskLevel>().ok())
            .unwrap_or_else(|| RiskLevel::from_score(score));

        let mut recommendations = Recommendations::for_score(score, level);
        if !self.recommendations.actions.is_empty() {
            recommendations.actions = self.recommendations.actions;
        }
        if let Some(priority) = self.recommendations.priority {
            recommendations.priority = priority;
        }

        RiskAssessment {
            risk_score: score,
            risk_level: level,
            confidence: self.prediction.confidence.unwrap_or(0.5),
            source: PredictionSource::Ml,
            factors: RiskFactors {
                temperature_risk: self.risk_factors.temperature_risk,
                humidity_risk: self.risk_factors.humidity_risk,
                crop_stress_risk: self.risk_factors.crop_stress_risk,
                storage_quality_risk: None,
            },
            satellite_data: self.data_sources.satellite,
            weather_data: self.data_sources.weather,
            recommendations,
            forecast: self.forecast,
        }
    }
}
