use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use log::info;
use serde::Deserialize;
use serde_json::Value;

use super::{body, to_json};
use crate::api::auth::AuthUser;
use crate::api::errors::{ApiError, ApiResult, ValidationErrors};
use crate::api::validation::{validate_coordinates, validate_phone, validate_required};
use crate::api::AppState;
use crate::models::{AlertPreferences, Crop, Location};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFarmerRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<Location>,
    pub crops: Option<Vec<Crop>>,
    pub alert_preferences: Option<AlertPreferences>,
}

/// GET /api/farmers/:id
pub async fn get_farmer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    user.ensure_owner(&id)?;

    let farmer = state
        .db
        .farmers
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Farmer not found"))?;

    let certifications = state
        .db
        .certifications
        .get_many(&farmer.certifications)
        .await?;

    Ok(Json(to_json(&farmer.profile_with(certifications))?))
}

/// PUT /api/farmers/:id
pub async fn update_farmer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateFarmerRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    user.ensure_owner(&id)?;
    let req = body(payload)?;

    let mut errors = ValidationErrors::new();
    if let Some(name) = &req.name {
        errors.check(validate_required("name", name));
    }
    if let Some(phone) = &req.phone {
        errors.check(validate_phone(phone));
    }
    if let Some(location) = &req.location {
        errors.check(validate_coordinates(location.latitude, location.longitude));
    }
    errors.into_result()?;

    let updated = state
        .db
        .farmers
        .update(&id, move |farmer| {
            if let Some(name) = req.name {
                farmer.name = name.trim().to_string();
            }
            if let Some(phone) = req.phone {
                farmer.phone = phone.trim().to_string();
            }
            if let Some(location) = req.location {
                farmer.location = location;
            }
            if let Some(crops) = req.crops {
                farmer.crops = crops;
            }
            if let Some(preferences) = req.alert_preferences {
                farmer.alert_preferences = preferences;
            }
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Farmer not found"))?;

    info!("Updated profile of farmer {}", id);
    Ok(Json(to_json(&updated.profile())?))
}
