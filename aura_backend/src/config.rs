//! Layered configuration: built-in defaults, an optional TOML file, then
//! `AURA_`-prefixed environment variables (`AURA_SERVER__PORT=8080`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/aura.toml";
pub const DEFAULT_JWT_SECRET: &str = "default_secret";

/// Hardhat account #0; only meaningful against a local development node.
const HARDHAT_DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub ml: MlConfig,
    pub alerts: AlertConfig,
    pub predictions: PredictionConfig,
    pub certification: CertificationConfig,
    pub blockchain: BlockchainConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3001,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Rocksdb,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackend::Rocksdb,
            path: PathBuf::from("data/aura"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub root_admin_email: Option<String>,
    pub root_admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: 24 * 7,
            root_admin_email: None,
            root_admin_password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub fallback_enabled: bool,
}

impl Default for MlConfig {
    fn default() -> Self {
        MlConfig {
            api_url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
            fallback_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub risk_threshold: f64,
    pub ttl_hours: i64,
    pub list_limit: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            risk_threshold: 6.0,
            ttl_hours: 48,
            list_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub validity_hours: i64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig { validity_hours: 72 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationConfig {
    pub max_average_risk: f64,
    pub auto_certify_below: f64,
    pub validity_days: i64,
    pub verify_base_url: String,
}

impl Default for CertificationConfig {
    fn default() -> Self {
        CertificationConfig {
            max_average_risk: 7.0,
            auto_certify_below: 4.0,
            validity_days: 365,
            verify_base_url: "https://aura.verify".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Local,
    Sepolia,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockchainConfig {
    pub enabled: bool,
    pub network: Network,
    pub rpc_url: String,
    pub private_key: String,
    pub contracts_path: PathBuf,
    pub artifact_path: PathBuf,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        BlockchainConfig {
            enabled: false,
            network: Network::Local,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            private_key: HARDHAT_DEV_KEY.to_string(),
            contracts_path: PathBuf::from("config/contracts.json"),
            artifact_path: PathBuf::from("config/AuraCertification.json"),
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` if it exists, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("AURA")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }

        for (name, value) in [
            ("alerts.risk_threshold", self.alerts.risk_threshold),
            ("certification.max_average_risk", self.certification.max_average_risk),
            ("certification.auto_certify_below", self.certification.auto_certify_below),
        ] {
            if !(1.0..=10.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within 1..=10, got {}",
                    name, value
                )));
            }
        }

        if self.certification.auto_certify_below > self.certification.max_average_risk {
            return Err(ConfigError::Invalid(
                "certification.auto_certify_below must not exceed certification.max_average_risk"
                    .into(),
            ));
        }

        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_hours must be positive".into()));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.auth.jwt_secret == DEFAULT_JWT_SECRET
    }
}
