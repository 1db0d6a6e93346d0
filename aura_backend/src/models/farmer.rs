use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{flexible_date, new_id, StorageType};
use crate::storage::Document;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Farmer,
    Admin,
    Certifier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Admin => "admin",
            Role::Certifier => "certifier",
        }
    }

    /// Staff roles may act on any farmer's records
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Certifier)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "farmer" => Ok(Role::Farmer),
            "admin" => Ok(Role::Admin),
            "certifier" => Ok(Role::Certifier),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Location {
    pub fn origin() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            address: None,
            district: None,
            state: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CropType {
    Maize,
    Groundnut,
    Rice,
    Chili,
    Wheat,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    #[serde(rename = "type")]
    pub crop_type: CropType,
    /// Acres under cultivation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<StorageType>,
    #[serde(
        default,
        deserialize_with = "flexible_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub harvest_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlertPreferences {
    pub sms: bool,
    pub push: bool,
    pub email: bool,
}

impl Default for AlertPreferences {
    fn default() -> Self {
        Self {
            sms: true,
            push: true,
            email: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farmer {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Argon2 PHC string
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub location: Location,
    #[serde(default)]
    pub crops: Vec<Crop>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub alert_preferences: AlertPreferences,
    pub created_at: DateTime<Utc>,
}

impl Farmer {
    pub fn new(
        name: &str,
        email: &str,
        phone: &str,
        password_hash: String,
        role: Role,
        location: Location,
        crops: Vec<Crop>,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            phone: phone.trim().to_string(),
            password: password_hash,
            role,
            location,
            crops,
            certifications: Vec::new(),
            alert_preferences: AlertPreferences::default(),
            created_at: Utc::now(),
        }
    }

    /// Public view without the password hash
    pub fn profile(&self) -> FarmerProfile<String> {
        self.profile_with(self.certifications.clone())
    }

    /// Public view with the certification references replaced by `certifications`
    pub fn profile_with<C>(&self, certifications: Vec<C>) -> FarmerProfile<C> {
        FarmerProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            location: self.location.clone(),
            crops: self.crops.clone(),
            certifications,
            alert_preferences: self.alert_preferences,
            created_at: self.created_at,
        }
    }
}

impl Document for Farmer {
    const COLLECTION: &'static str = "farmers";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerProfile<C> {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub location: Location,
    pub crops: Vec<Crop>,
    pub certifications: Vec<C>,
    pub alert_preferences: AlertPreferences,
    pub created_at: DateTime<Utc>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Farmer {
        Farmer::new(
            "  Demo Farmer ",
            "Demo@Example.com",
            "+911234567890",
            "hash".to_string(),
            Role::Farmer,
            Location {
                latitude: 15.3173,
                longitude: 75.7139,
                address: Some("Demo Village".to_string()),
                district: None,
                state: None,
            },
            vec![],
        )
    }

    #[test]
    fn test_new_farmer_normalizes_fields() {
        let farmer = sample();
        assert_eq!(farmer.name, "Demo Farmer");
        assert_eq!(farmer.email, "demo@example.com");
        assert_eq!(farmer.alert_preferences, AlertPreferences::default());
    }

    #[test]
    fn test_profile_hides_password() {
        let json = serde_json::to_value(sample().profile()).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("_id").is_some());
        assert_eq!(json["alertPreferences"]["sms"], true);
    }

    #[test]
    fn test_crop_accepts_bare_dates() {
        let crop: Crop = serde_json::from_value(serde_json::json!({
            "type": "maize",
            "area": 5,
            "storageType": "silo",
            "harvestDate": "2025-02-10"
        }))
        .unwrap();
        assert_eq!(crop.crop_type, CropType::Maize);
        assert_eq!(crop.storage_type, Some(StorageType::Silo));
        assert!(crop.harvest_date.is_some());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Certifier".parse::<Role>().unwrap(), Role::Certifier);
        assert!(Role::Admin.is_staff());
        assert!(!Role::Farmer.is_staff());
    }
}
