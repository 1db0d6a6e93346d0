//! Token issuing and verification, password hashing and role gates.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::errors::{ApiError, ApiResult};
use super::AppState;
use crate::config::AuthConfig;
use crate::models::{farmer::normalize_email, Farmer, Location, Role};
use crate::storage::{Database, StorageError};

pub const TOKEN_HEADER: &str = "x-auth-token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Token(_) => ApiError::unauthorized("Token is not valid"),
            AuthError::Storage(e) => e.into(),
            AuthError::Hash(e) => {
                log::error!("Password hashing failed: {}", e);
                ApiError::internal_server_error("Server error")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 token issuer and verifier
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, farmer: &Farmer) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            id: farmer.id.clone(),
            email: farmer.email.clone(),
            role: farmer.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// False for a wrong password and for an unparsable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

pub fn parse_bearer_token(header: Option<&str>) -> Option<String> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// `x-auth-token` first, then `Authorization: Bearer`.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    parse_bearer_token(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()))
}

/// Authenticated caller, extracted from the request token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.role != Role::Admin {
            return Err(ApiError::forbidden("Access denied: Admins only"));
        }
        Ok(())
    }

    pub fn require_staff(&self) -> ApiResult<()> {
        if !self.role.is_staff() {
            return Err(ApiError::forbidden("Access denied"));
        }
        Ok(())
    }

    /// The caller must be `farmer_id` itself or hold a staff role.
    pub fn ensure_owner(&self, farmer_id: &str) -> ApiResult<()> {
        if self.id == farmer_id || self.role.is_staff() {
            return Ok(());
        }
        warn!("User {} denied access to records of {}", self.id, farmer_id);
        Err(ApiError::forbidden("Access denied"))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))?;

        let claims = state.tokens.verify(&token).map_err(|e| {
            debug!("Rejected token: {}", e);
            ApiError::unauthorized("Token is not valid")
        })?;

        Ok(AuthUser {
            id: claims.id,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Create the configured super admin unless that email is already taken.
/// Returns whether an account was created.
pub async fn bootstrap_super_admin(db: &Database, auth: &AuthConfig) -> Result<bool, AuthError> {
    let email = match auth.root_admin_email.as_deref().map(normalize_email) {
        Some(email) if !email.is_empty() => email,
        _ => return Ok(false),
    };

    if db.farmers.find_unique("email", &email).await?.is_some() {
        debug!("Super admin {} already present", email);
        return Ok(false);
    }

    let admin = Farmer::new(
        "Super Admin",
        &email,
        "0000000000",
        hash_password(&auth.root_admin_password)?,
        Role::Admin,
        Location::origin(),
        Vec::new(),
    );

    match db.farmers.insert_unique(&admin, &[("email", admin.email.as_str())]).await {
        Ok(()) => {
            info!("Super admin created: {}", email);
            Ok(true)
        }
        Err(StorageError::Duplicate(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
