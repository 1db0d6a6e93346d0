//! Request validation utilities for the AURA API

use crate::api::errors::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 100;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Non-empty after trimming
pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid(field, format!("{} is required", field)));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(invalid("email", "Email cannot be empty"));
    }

    if !EMAIL_RE.is_match(email.trim()) {
        return Err(invalid("email", "Please enter a valid email"));
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(invalid(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    if len > MAX_PASSWORD_LEN {
        return Err(invalid(
            "password",
            format!("Password must be at most {} characters", MAX_PASSWORD_LEN),
        ));
    }

    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));

    if !allowed || !(7..=15).contains(&digits) {
        return Err(invalid("phone", "Phone number is invalid"));
    }

    Ok(())
}

/// Latitude in -90..=90 and longitude in -180..=180. Zero is a valid coordinate.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(invalid("latitude", "Latitude must be between -90 and 90"));
    }

    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid("longitude", "Longitude must be between -180 and 180"));
    }

    Ok(())
}

pub fn validate_quantity(quantity: f64) -> Result<(), ValidationError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(invalid("quantity", "Quantity must be greater than zero"));
    }

    Ok(())
}

/// Storage quality on the 0..=1 scale
pub fn validate_unit_interval(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(invalid(field, format!("{} must be between 0 and 1", field)));
    }

    Ok(())
}

/// Moisture content as a percentage
pub fn validate_percentage(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(invalid(field, format!("{} must be between 0 and 100", field)));
    }

    Ok(())
}

/// Parse a `limit` query value: missing or unparsable falls back to the
/// default, anything above the cap is clamped.
pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT)
}
