use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, Prediction, RiskLevel};
use crate::storage::Document;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    RiskThreshold,
    WeatherWarning,
    ActionRequired,
    Info,
}

/// Delivery state per notification channel
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SentChannels {
    pub sms: bool,
    pub push: bool,
    pub email: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: String,
    pub farmer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: RiskLevel,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub sent: SentChannels,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Alert {
    /// Risk-threshold alert raised for a freshly stored prediction
    pub fn for_prediction(prediction: &Prediction, actions: Vec<String>, ttl: Duration) -> Self {
        let score = prediction.risk_score;
        let (title, message) = match prediction.risk_level {
            RiskLevel::Critical => (
                "CRITICAL AFLATOXIN RISK",
                format!("Immediate action required! Risk Score: {:.1}/10", score),
            ),
            RiskLevel::High => (
                "HIGH AFLATOXIN RISK",
                format!(
                    "Take preventive action within 24 hours. Risk Score: {:.1}/10",
                    score
                ),
            ),
            _ => (
                "MODERATE AFLATOXIN RISK",
                format!("Monitor closely and prepare. Risk Score: {:.1}/10", score),
            ),
        };

        let now = Utc::now();
        Self {
            id: new_id(),
            farmer: prediction.farmer.clone(),
            prediction: Some(prediction.id.clone()),
            alert_type: AlertType::RiskThreshold,
            severity: prediction.risk_level,
            title: title.to_string(),
            message,
            actions,
            sent: SentChannels::default(),
            read: false,
            acknowledged: false,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }

    /// Acknowledging implies reading
    pub fn acknowledge(&mut self) {
        self.acknowledged = true;
        self.read = true;
    }
}

impl Document for Alert {
    const COLLECTION: &'static str = "alerts";

    fn id(&self) -> &str {
        &self.id
    }
}
