use std::collections::HashSet;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{body, has_text, missing};
use crate::api::auth::AuthUser;
use crate::api::errors::{ApiError, ApiResult};
use crate::api::validation::validate_quantity;
use crate::api::AppState;
use crate::models::{
    flexible_date, Certification, CertificationMetadata, CertificationStatus, Intervention,
    Location, Prediction,
};
use crate::verification::{qr_data_url, verification_url};

pub const FARMER_LIST_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationRequest {
    pub farmer_id: Option<String>,
    pub crop_type: Option<String>,
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "flexible_date::option")]
    pub harvest_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub predictions: Vec<String>,
    #[serde(default)]
    pub interventions: Option<InterventionsInput>,
    #[serde(default)]
    pub metadata: Option<CertificationMetadata>,
}

/// Interventions arrive either as free text or as a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InterventionsInput {
    Text(String),
    List(Vec<InterventionEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InterventionEntry {
    Detailed(Intervention),
    Action(String),
}

impl InterventionsInput {
    pub fn into_interventions(self) -> Vec<Intervention> {
        let action = |text: String| Intervention {
            date: None,
            action: text,
            effectiveness: None,
        };

        match self {
            InterventionsInput::Text(text) if text.trim().is_empty() => Vec::new(),
            InterventionsInput::Text(text) => vec![action(text.trim().to_string())],
            InterventionsInput::List(entries) => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    InterventionEntry::Detailed(i) => Some(i),
                    InterventionEntry::Action(text) if !text.trim().is_empty() => {
                        Some(action(text.trim().to_string()))
                    }
                    InterventionEntry::Action(_) => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifiedFarmer {
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub valid: bool,
    pub certification: Certification,
    pub farmer: Option<VerifiedFarmer>,
    pub predictions: Vec<Prediction>,
    pub verification_time: DateTime<Utc>,
}

/// Drop repeated ids, keeping first-seen order
pub fn distinct_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

pub fn average_risk(predictions: &[Prediction]) -> Option<f64> {
    if predictions.is_empty() {
        return None;
    }
    let total: f64 = predictions.iter().map(|p| p.risk_score).sum();
    Some(total / predictions.len() as f64)
}

/// POST /api/certifications
pub async fn create_certification(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CertificationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let req = body(payload)?;

    let absent = missing(&[
        ("farmerId", has_text(&req.farmer_id)),
        ("cropType", has_text(&req.crop_type)),
        ("quantity", req.quantity.is_some()),
    ]);
    if !absent.is_empty() {
        return Err(ApiError::missing_fields(&absent));
    }

    let farmer_id = req.farmer_id.unwrap_or_default();
    let crop_type = req.crop_type.unwrap_or_default();
    let quantity = req.quantity.unwrap_or_default();

    user.ensure_owner(&farmer_id)?;
    validate_quantity(quantity)?;

    if state.db.farmers.get(&farmer_id).await?.is_none() {
        return Err(ApiError::not_found("Farmer not found"));
    }

    // Only the farmer's own predictions count towards the average, each once
    let prediction_ids = distinct_ids(req.predictions);
    let predictions: Vec<Prediction> = state
        .db
        .predictions
        .get_many(&prediction_ids)
        .await?
        .into_iter()
        .filter(|p| p.farmer == farmer_id)
        .collect();

    let average = average_risk(&predictions).ok_or_else(|| {
        warn!("Certification for {} rejected: no predictions", farmer_id);
        ApiError::bad_request("No predictions found")
    })?;

    let policy = &state.config.certification;
    if average > policy.max_average_risk {
        warn!(
            "Certification for {} rejected: average risk {:.2} above {}",
            farmer_id, average, policy.max_average_risk
        );
        return Err(ApiError::risk_too_high(average));
    }

    let mut certification = Certification::new(
        &farmer_id,
        &crop_type,
        quantity,
        req.harvest_date,
        average,
        Duration::days(policy.validity_days),
    );
    certification.predictions = predictions.iter().map(|p| p.id.clone()).collect();
    certification.interventions_taken = req
        .interventions
        .map(InterventionsInput::into_interventions)
        .unwrap_or_default();
    certification.metadata = req.metadata.unwrap_or_default();
    certification.status = if average < policy.auto_certify_below {
        CertificationStatus::Certified
    } else {
        CertificationStatus::Pending
    };

    let url = verification_url(&policy.verify_base_url, &certification.batch_id);
    let qr_code = qr_data_url(&url).map_err(|e| {
        error!("QR generation failed for {}: {}", certification.batch_id, e);
        ApiError::internal_server_error("Certification generation failed")
    })?;
    certification.verification_url = Some(url);
    certification.qr_code = Some(qr_code.clone());

    state
        .db
        .certifications
        .insert_unique(
            &certification,
            &[("batchId", certification.batch_id.as_str())],
        )
        .await?;

    let cert_id = certification.id.clone();
    state
        .db
        .farmers
        .update(&farmer_id, move |farmer| farmer.certifications.push(cert_id))
        .await?;

    info!(
        "Certification {} issued to {} ({}, avg risk {:.2})",
        certification.batch_id,
        farmer_id,
        certification.status.as_str(),
        average
    );

    let tx_hash = state.registry.record(&certification).await;
    if let Some(hash) = &tx_hash {
        let hash = hash.clone();
        if let Some(updated) = state
            .db
            .certifications
            .update(&certification.id, move |c| c.blockchain_tx_hash = Some(hash))
            .await?
        {
            certification = updated;
        }
    }
    let explorer_url = tx_hash
        .as_deref()
        .and_then(|hash| state.registry.explorer_url(hash));

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Certification generated successfully",
            "certification": certification,
            "qrCode": qr_code,
            "explorerUrl": explorer_url,
        })),
    ))
}

/// GET /api/certifications/verify/:batch_id
pub async fn verify(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> ApiResult<Json<VerificationResponse>> {
    let certification = state
        .db
        .certifications
        .find_unique("batchId", &batch_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Certification not found"))?;

    let farmer = state
        .db
        .farmers
        .get(&certification.farmer)
        .await?
        .map(|f| VerifiedFarmer {
            name: f.name,
            location: f.location,
        });
    let predictions = state
        .db
        .predictions
        .get_many(&certification.predictions)
        .await?;

    let now = Utc::now();
    Ok(Json(VerificationResponse {
        valid: certification.is_valid_at(now),
        certification,
        farmer,
        predictions,
        verification_time: now,
    }))
}

/// GET /api/certifications/farmer/:farmer_id
pub async fn list_for_farmer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farmer_id): Path<String>,
) -> ApiResult<Json<Vec<Certification>>> {
    user.ensure_owner(&farmer_id)?;

    let mut certifications = state
        .db
        .certifications
        .find(|c| c.farmer == farmer_id)
        .await?;
    certifications.sort_by(|a, b| b.certification_date.cmp(&a.certification_date));
    certifications.truncate(FARMER_LIST_LIMIT);

    Ok(Json(certifications))
}

/// PUT /api/certifications/:batch_id/status (admins and certifiers)
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(batch_id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<Certification>> {
    user.require_staff()?;
    let req = body(payload)?;

    let next = match req.status.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw
            .parse::<CertificationStatus>()
            .map_err(|e| ApiError::validation_error("status", &e))?,
        _ => return Err(ApiError::missing_fields(&["status"])),
    };

    let current = state
        .db
        .certifications
        .find_unique("batchId", &batch_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Certification not found"))?;

    let mut previous = current.status;
    let mut applied = false;
    let updated = state
        .db
        .certifications
        .update(&current.id, |c| {
            previous = c.status;
            if c.status.can_transition_to(next) {
                c.status = next;
                applied = true;
            }
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Certification not found"))?;

    if !applied {
        return Err(ApiError::with_details(
            409,
            "Invalid status transition".to_string(),
            json!({ "from": previous.as_str(), "to": next.as_str() }),
        ));
    }

    info!(
        "Certification {} moved {} -> {} by {}",
        batch_id,
        previous.as_str(),
        next.as_str(),
        user.id
    );
    Ok(Json(updated))
}
