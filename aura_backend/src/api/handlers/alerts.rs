use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthUser;
use crate::api::errors::{ApiError, ApiResult};
use crate::api::AppState;
use crate::models::{Alert, Prediction, RiskLevel};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    pub unread_only: Option<String>,
}

/// Alert with its prediction reference resolved to the document
#[derive(Debug, Serialize)]
pub struct PopulatedAlert {
    #[serde(flatten)]
    pub alert: Alert,
    pub prediction: Option<Prediction>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total: usize,
    pub unread: usize,
    pub by_severity: SeverityCounts,
}

impl AlertStats {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut stats = AlertStats::default();
        for alert in alerts {
            stats.total += 1;
            if !alert.read {
                stats.unread += 1;
            }
            match alert.severity {
                RiskLevel::Low => stats.by_severity.low += 1,
                RiskLevel::Moderate => stats.by_severity.medium += 1,
                RiskLevel::High => stats.by_severity.high += 1,
                RiskLevel::Critical => stats.by_severity.critical += 1,
            }
        }
        stats
    }
}

/// GET /api/alerts/:farmer_id?unreadOnly=true
pub async fn list_alerts(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farmer_id): Path<String>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<Json<Vec<PopulatedAlert>>> {
    user.ensure_owner(&farmer_id)?;
    let unread_only = query.unread_only.as_deref() == Some("true");

    let mut alerts = state
        .db
        .alerts
        .find(|a| a.farmer == farmer_id && (!unread_only || !a.read))
        .await?;
    alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    alerts.truncate(state.config.alerts.list_limit);

    let prediction_ids: Vec<String> = alerts.iter().filter_map(|a| a.prediction.clone()).collect();
    let predictions: HashMap<String, Prediction> = state
        .db
        .predictions
        .get_many(&prediction_ids)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let populated = alerts
        .into_iter()
        .map(|mut alert| {
            let prediction = alert
                .prediction
                .take()
                .and_then(|id| predictions.get(&id).cloned());
            PopulatedAlert { alert, prediction }
        })
        .collect();

    Ok(Json(populated))
}

/// Load an alert and check the caller may act on it.
async fn owned_alert(state: &AppState, user: &AuthUser, alert_id: &str) -> ApiResult<Alert> {
    let alert = state
        .db
        .alerts
        .get(alert_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Alert not found"))?;
    user.ensure_owner(&alert.farmer)?;
    Ok(alert)
}

/// PUT /api/alerts/:alert_id/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(alert_id): Path<String>,
) -> ApiResult<Json<Alert>> {
    owned_alert(&state, &user, &alert_id).await?;

    let alert = state
        .db
        .alerts
        .update(&alert_id, |a| a.mark_read())
        .await?
        .ok_or_else(|| ApiError::not_found("Alert not found"))?;

    Ok(Json(alert))
}

/// PUT /api/alerts/:alert_id/acknowledge
pub async fn acknowledge(
    State(state): State<AppState>,
    user: AuthUser,
    Path(alert_id): Path<String>,
) -> ApiResult<Json<Alert>> {
    owned_alert(&state, &user, &alert_id).await?;

    let alert = state
        .db
        .alerts
        .update(&alert_id, |a| a.acknowledge())
        .await?
        .ok_or_else(|| ApiError::not_found("Alert not found"))?;

    info!("Alert {} acknowledged by {}", alert_id, user.id);
    Ok(Json(alert))
}

/// GET /api/alerts/:farmer_id/stats
pub async fn alert_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farmer_id): Path<String>,
) -> ApiResult<Json<AlertStats>> {
    user.ensure_owner(&farmer_id)?;

    let alerts = state.db.alerts.find(|a| a.farmer == farmer_id).await?;
    Ok(Json(AlertStats::from_alerts(&alerts)))
}
