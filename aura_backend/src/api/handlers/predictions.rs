use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::Duration;
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body, has_text, missing, to_json};
use crate::api::auth::AuthUser;
use crate::api::errors::{ApiError, ApiResult, ValidationErrors};
use crate::api::validation::{
    parse_limit, validate_coordinates, validate_percentage, validate_unit_interval,
};
use crate::api::AppState;
use crate::models::{Alert, GeoPoint, Prediction, StorageConditions, StorageType};
use crate::risk::{RiskRequest, StorageQuality};

pub const DEFAULT_STORAGE_QUALITY: f64 = 0.5;
pub const DEFAULT_MOISTURE_CONTENT: f64 = 12.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub farmer_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub storage_type: Option<String>,
    pub storage_quality: Option<StorageQuality>,
    pub moisture_content: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
}

/// Resolve optional inputs to a complete model request, validating ranges.
fn build_risk_request(req: &PredictionRequest) -> ApiResult<RiskRequest> {
    let latitude = req.latitude.unwrap_or_default();
    let longitude = req.longitude.unwrap_or_default();

    let storage_type = match req.storage_type.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<StorageType>()
            .map_err(|e| ApiError::validation_error("storageType", &e))?,
        _ => StorageType::default(),
    };

    let storage_quality = match &req.storage_quality {
        Some(quality) => quality
            .to_score()
            .map_err(|e| ApiError::validation_error("storageQuality", &e))?,
        None => DEFAULT_STORAGE_QUALITY,
    };

    let moisture_content = req.moisture_content.unwrap_or(DEFAULT_MOISTURE_CONTENT);

    let mut errors = ValidationErrors::new();
    errors.check(validate_coordinates(latitude, longitude));
    errors.check(validate_unit_interval("storageQuality", storage_quality));
    errors.check(validate_percentage("moistureContent", moisture_content));
    errors.into_result()?;

    Ok(RiskRequest {
        latitude,
        longitude,
        storage_type,
        storage_quality,
        moisture_content,
    })
}

/// POST /api/predictions
pub async fn create_prediction(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let req = body(payload)?;

    let absent = missing(&[
        ("farmerId", has_text(&req.farmer_id)),
        ("latitude", req.latitude.is_some()),
        ("longitude", req.longitude.is_some()),
    ]);
    if !absent.is_empty() {
        return Err(ApiError::missing_fields(&absent));
    }

    let farmer_id = req.farmer_id.clone().unwrap_or_default();
    user.ensure_owner(&farmer_id)?;
    let risk_request = build_risk_request(&req)?;

    if state.db.farmers.get(&farmer_id).await?.is_none() {
        return Err(ApiError::not_found("Farmer not found"));
    }

    let assessment = state.risk.assess(&risk_request).await.map_err(|e| {
        error!("Prediction failed for farmer {}: {}", farmer_id, e);
        ApiError::bad_gateway("Prediction failed")
    })?;

    let mut prediction = Prediction::new(
        &farmer_id,
        GeoPoint {
            latitude: risk_request.latitude,
            longitude: risk_request.longitude,
        },
        assessment.risk_score,
        Some(assessment.risk_level),
        assessment.confidence,
        assessment.source,
        StorageConditions {
            storage_type: risk_request.storage_type,
            ventilation_score: risk_request.storage_quality,
            moisture_content: risk_request.moisture_content,
        },
        Duration::hours(state.config.predictions.validity_hours),
    );
    prediction.factors = assessment.factors;
    prediction.satellite_data = assessment.satellite_data;
    prediction.weather_data = assessment.weather_data;
    prediction.recommendations = assessment.recommendations.to_records();

    state.db.predictions.insert(&prediction).await?;
    info!(
        "Prediction {} for farmer {}: {:.1} {} ({:?})",
        prediction.id,
        farmer_id,
        prediction.risk_score,
        prediction.risk_level.as_str(),
        prediction.source
    );

    let mut response = json!({
        "prediction": prediction,
        "recommendations": assessment.recommendations,
        "forecast": assessment.forecast,
    });

    if prediction.risk_score >= state.config.alerts.risk_threshold {
        let alert = Alert::for_prediction(
            &prediction,
            assessment.recommendations.actions.clone(),
            Duration::hours(state.config.alerts.ttl_hours),
        );
        state.db.alerts.insert(&alert).await?;
        info!("Raised {} alert {} for farmer {}", alert.severity.as_str(), alert.id, farmer_id);
        response["alert"] = to_json(&alert)?;
    }

    Ok(Json(response))
}

/// GET /api/predictions/history/:farmer_id?limit=N
pub async fn history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farmer_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<Prediction>>> {
    user.ensure_owner(&farmer_id)?;
    let limit = parse_limit(query.limit.as_deref());

    let mut predictions = state
        .db
        .predictions
        .find(|p| p.farmer == farmer_id)
        .await?;
    predictions.sort_by(|a, b| b.prediction_date.cmp(&a.prediction_date));
    predictions.truncate(limit);

    Ok(Json(predictions))
}
