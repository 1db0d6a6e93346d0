//! On-chain mirroring of certifications.
//!
//! Writes are best effort: a registry never fails a request, it only
//! reports whether a transaction hash was obtained.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

pub mod ethereum;

pub use ethereum::EthereumRegistry;

use crate::config::{BlockchainConfig, Network};
use crate::models::Certification;

#[async_trait]
pub trait CertificationRegistry: Send + Sync {
    /// Record the certification on chain, returning the transaction hash.
    async fn record(&self, certification: &Certification) -> Option<String>;

    /// Block explorer link for a transaction, if the network has one.
    fn explorer_url(&self, tx_hash: &str) -> Option<String>;

    fn name(&self) -> &'static str;
}

/// Registry used when mirroring is switched off or unavailable
pub struct DisabledRegistry;

#[async_trait]
impl CertificationRegistry for DisabledRegistry {
    async fn record(&self, _certification: &Certification) -> Option<String> {
        None
    }

    fn explorer_url(&self, _tx_hash: &str) -> Option<String> {
        None
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

pub fn explorer_url_for(network: Network, tx_hash: &str) -> Option<String> {
    match network {
        Network::Sepolia => Some(format!("https://sepolia.etherscan.io/tx/{}", tx_hash)),
        Network::Local => None,
    }
}

/// Build the registry selected by `config`, degrading to [`DisabledRegistry`]
/// only when the deployment files or signing key are unusable. An unreachable
/// node is not fatal here; the Ethereum registry connects on its first write.
pub fn registry_from_config(config: &BlockchainConfig) -> Arc<dyn CertificationRegistry> {
    if !config.enabled {
        info!("Blockchain mirroring disabled");
        return Arc::new(DisabledRegistry);
    }

    match EthereumRegistry::new(config) {
        Ok(registry) => {
            info!(
                "Blockchain mirroring enabled on {:?} via {} (connects on first write)",
                config.network, config.rpc_url
            );
            Arc::new(registry)
        }
        Err(e) => {
            warn!("Blockchain mirroring unavailable, continuing without it: {:#}", e);
            Arc::new(DisabledRegistry)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_disabled_registry_records_nothing() {
        let cert = Certification::new("f1", "maize", 100.0, None, 2.0, Duration::days(365));
        let registry = DisabledRegistry;
        assert!(registry.record(&cert).await.is_none());
        assert!(registry.explorer_url("0xabc").is_none());
    }

    #[test]
    fn test_explorer_urls() {
        assert_eq!(
            explorer_url_for(Network::Sepolia, "0xabc").as_deref(),
            Some("https://sepolia.etherscan.io/tx/0xabc")
        );
        assert!(explorer_url_for(Network::Local, "0xabc").is_none());
    }

    fn deployment(dir: &tempfile::TempDir) -> BlockchainConfig {
        std::fs::write(
            dir.path().join("contracts.json"),
            r#"{"AuraCertification": "0x5FbDB2315678afecb367f032d93F642f64180aa3"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("AuraCertification.json"),
            r#"{"abi": [{
                "type": "function",
                "name": "createCertification",
                "stateMutability": "nonpayable",
                "inputs": [
                    {"name": "batchId", "type": "string"},
                    {"name": "farmer", "type": "address"},
                    {"name": "cropType", "type": "string"},
                    {"name": "quantity", "type": "uint256"},
                    {"name": "harvestDate", "type": "uint256"},
                    {"name": "riskScore", "type": "uint256"},
                    {"name": "verificationUrl", "type": "string"}
                ],
                "outputs": []
            }]}"#,
        )
        .unwrap();

        BlockchainConfig {
            enabled: true,
            rpc_url: "http://127.0.0.1:9".to_string(),
            contracts_path: dir.path().join("contracts.json"),
            artifact_path: dir.path().join("AuraCertification.json"),
            ..BlockchainConfig::default()
        }
    }

    #[tokio::test]
    async fn test_unreachable_node_keeps_registry_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_from_config(&deployment(&dir));
        assert_eq!(registry.name(), "ethereum");

        // Each write retries the handshake instead of disabling mirroring
        let cert = Certification::new("f1", "maize", 100.0, None, 2.0, Duration::days(365));
        assert!(registry.record(&cert).await.is_none());
        assert!(registry.record(&cert).await.is_none());
        assert_eq!(registry.name(), "ethereum");
    }

    #[test]
    fn test_bad_key_degrades_to_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = BlockchainConfig {
            private_key: "not-a-key".to_string(),
            ..deployment(&dir)
        };
        assert_eq!(registry_from_config(&config).name(), "disabled");
    }

    #[test]
    fn test_missing_deployment_degrades_to_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = BlockchainConfig {
            enabled: true,
            contracts_path: dir.path().join("contracts.json"),
            artifact_path: dir.path().join("AuraCertification.json"),
            ..BlockchainConfig::default()
        };
        let registry = registry_from_config(&config);
        assert_eq!(registry.name(), "disabled");
    }
}
