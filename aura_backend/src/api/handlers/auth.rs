use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{body, has_text, missing, to_json};
use crate::api::auth::{hash_password, verify_password, AuthUser};
use crate::api::errors::{ApiError, ApiResult, ValidationErrors};
use crate::api::validation::{
    validate_coordinates, validate_email, validate_password, validate_phone, validate_required,
};
use crate::api::AppState;
use crate::models::{farmer::normalize_email, Crop, Farmer, Location, Role};
use crate::storage::StorageError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub location: Option<Location>,
    #[serde(default)]
    pub crops: Vec<Crop>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let req = body(payload)?;

    let absent = missing(&[
        ("name", has_text(&req.name)),
        ("email", has_text(&req.email)),
        ("phone", has_text(&req.phone)),
        ("password", req.password.is_some()),
        ("location", req.location.is_some()),
    ]);
    if !absent.is_empty() {
        return Err(ApiError::missing_fields(&absent));
    }

    let name = req.name.unwrap_or_default();
    let email = req.email.unwrap_or_default();
    let phone = req.phone.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    let location = req.location.unwrap_or_else(Location::origin);

    let mut errors = ValidationErrors::new();
    errors.check(validate_required("name", &name));
    errors.check(validate_email(&email));
    errors.check(validate_phone(&phone));
    errors.check(validate_password(&password));
    errors.check(validate_coordinates(location.latitude, location.longitude));
    errors.into_result()?;

    let farmer = Farmer::new(
        &name,
        &email,
        &phone,
        hash_password(&password)?,
        Role::Farmer,
        location,
        req.crops,
    );

    match state
        .db
        .farmers
        .insert_unique(&farmer, &[("email", farmer.email.as_str())])
        .await
    {
        Ok(()) => {}
        Err(StorageError::Duplicate(_)) => {
            warn!("Registration rejected, email taken: {}", farmer.email);
            return Err(ApiError::bad_request("User already registered"));
        }
        Err(e) => return Err(e.into()),
    }

    let token = state.tokens.issue(&farmer)?;
    info!("Registered farmer {} ({})", farmer.id, farmer.email);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "token": token,
            "farmer": farmer.profile(),
        })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let req = body(payload)?;

    let absent = missing(&[
        ("email", has_text(&req.email)),
        ("password", req.password.is_some()),
    ]);
    if !absent.is_empty() {
        return Err(ApiError::missing_fields(&absent));
    }

    let email = normalize_email(req.email.as_deref().unwrap_or_default());
    let password = req.password.unwrap_or_default();

    let farmer = match state.db.farmers.find_unique("email", &email).await? {
        Some(farmer) => farmer,
        None => {
            warn!("Login failed for unknown email {}", email);
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    if !verify_password(&password, &farmer.password) {
        warn!("Login failed for {}: wrong password", email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = state.tokens.issue(&farmer)?;
    info!("Login successful: {}", farmer.id);

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "farmer": farmer.profile(),
    })))
}

/// POST /api/auth/invite (admins only)
pub async fn invite(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<InviteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    user.require_admin()?;
    let req = body(payload)?;

    let absent = missing(&[
        ("name", has_text(&req.name)),
        ("email", has_text(&req.email)),
        ("password", req.password.is_some()),
    ]);
    if !absent.is_empty() {
        return Err(ApiError::missing_fields(&absent));
    }

    let role = match req.role.as_deref().filter(|r| !r.trim().is_empty()) {
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| ApiError::validation_error("role", &e))?,
        None => Role::Admin,
    };

    let name = req.name.unwrap_or_default();
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let mut errors = ValidationErrors::new();
    errors.check(validate_email(&email));
    errors.check(validate_password(&password));
    errors.into_result()?;

    let account = Farmer::new(
        &name,
        &email,
        "0000000000",
        hash_password(&password)?,
        role,
        Location::origin(),
        Vec::new(),
    );

    match state
        .db
        .farmers
        .insert_unique(&account, &[("email", account.email.as_str())])
        .await
    {
        Ok(()) => {}
        Err(StorageError::Duplicate(_)) => return Err(ApiError::bad_request("User exists")),
        Err(e) => return Err(e.into()),
    }

    info!(
        "Admin {} created {} account {}",
        user.id,
        role.as_str(),
        account.email
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": format!("User created with role {}", role.as_str()) })),
    ))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let farmer = state
        .db
        .farmers
        .get(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Farmer not found"))?;

    Ok(Json(to_json(&farmer.profile())?))
}
