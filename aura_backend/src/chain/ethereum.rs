//! Certification registry backed by the `AuraCertification` contract.

use std::convert::TryFrom;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::abi::Abi;
use ethers::prelude::*;
use log::{error, info};
use tokio::sync::OnceCell;

use super::{explorer_url_for, CertificationRegistry};
use crate::config::{BlockchainConfig, Network};
use crate::models::Certification;

pub const CONTRACT_NAME: &str = "AuraCertification";

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Registry for the deployed contract. Construction only reads local files
/// and keys; the node is first contacted on [`CertificationRegistry::record`],
/// and a failed handshake is retried on the next write.
pub struct EthereumRegistry {
    provider: Provider<Http>,
    wallet: LocalWallet,
    contract_address: Address,
    abi: Abi,
    contract: OnceCell<Contract<SignerClient>>,
    network: Network,
}

impl EthereumRegistry {
    /// Load the deployment and signing key. Fails only on local problems
    /// (missing or malformed files, bad key, bad RPC URL).
    pub fn new(config: &BlockchainConfig) -> Result<Self> {
        let contract_address = load_contract_address(&config.contracts_path)?;
        let abi = load_abi(&config.artifact_path)?;

        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| anyhow!("Failed to create HTTP provider: {}", e))?;

        let wallet = config
            .private_key
            .parse::<LocalWallet>()
            .map_err(|e| anyhow!("Invalid private key: {}", e))?;

        info!(
            "{} registry configured at {:?}, signer {:?}",
            CONTRACT_NAME,
            contract_address,
            wallet.address()
        );

        Ok(Self {
            provider,
            wallet,
            contract_address,
            abi,
            contract: OnceCell::new(),
            network: config.network,
        })
    }

    /// Contract bound to a chain-aware signer, connecting on first use.
    async fn contract(&self) -> Result<&Contract<SignerClient>> {
        self.contract
            .get_or_try_init(|| async {
                let chain_id = self
                    .provider
                    .get_chainid()
                    .await
                    .map_err(|e| anyhow!("Failed to get chain ID: {}", e))?
                    .as_u64();

                let wallet = self.wallet.clone().with_chain_id(chain_id);
                let client = Arc::new(SignerMiddleware::new(self.provider.clone(), wallet));
                info!("Connected to {} on chain {}", CONTRACT_NAME, chain_id);

                Ok::<_, anyhow::Error>(Contract::new(
                    self.contract_address,
                    self.abi.clone(),
                    client,
                ))
            })
            .await
    }

    async fn create_certification(&self, certification: &Certification) -> Result<String> {
        let args = (
            certification.batch_id.clone(),
            self.wallet.address(),
            certification.crop_type.clone(),
            U256::from(certification.quantity.max(0.0).round() as u64),
            U256::from(chrono::Utc::now().timestamp().max(0) as u64),
            U256::from(certification.average_risk_score.floor().max(0.0) as u64),
            certification.verification_url.clone().unwrap_or_default(),
        );

        let call = self
            .contract()
            .await?
            .method::<_, ()>("createCertification", args)
            .map_err(|e| anyhow!("Failed to encode createCertification: {}", e))?;

        info!("Issuing certification {} on chain", certification.batch_id);
        let pending = call
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send transaction: {}", e))?;
        info!("Transaction sent: {:?}", pending.tx_hash());

        let receipt = pending
            .confirmations(1)
            .await
            .map_err(|e| anyhow!("Failed to get confirmation: {}", e))?
            .ok_or_else(|| anyhow!("Transaction dropped"))?;

        if receipt.status != Some(U64::from(1)) {
            return Err(anyhow!("Transaction reverted"));
        }

        info!(
            "Transaction confirmed in block {:?}: {:?}",
            receipt.block_number, receipt.transaction_hash
        );
        Ok(format!("{:?}", receipt.transaction_hash))
    }
}

#[async_trait]
impl CertificationRegistry for EthereumRegistry {
    async fn record(&self, certification: &Certification) -> Option<String> {
        match self.create_certification(certification).await {
            Ok(hash) => Some(hash),
            Err(e) => {
                error!("Blockchain write failed for {}: {:#}", certification.batch_id, e);
                None
            }
        }
    }

    fn explorer_url(&self, tx_hash: &str) -> Option<String> {
        explorer_url_for(self.network, tx_hash)
    }

    fn name(&self) -> &'static str {
        "ethereum"
    }
}

/// Read the deployed address from `{ "AuraCertification": "0x..." }`.
pub fn load_contract_address(path: &Path) -> Result<Address> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read contract addresses from {}", path.display()))?;
    let contracts: serde_json::Value = serde_json::from_str(&raw)?;

    contracts
        .get(CONTRACT_NAME)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("{} address missing in {}", CONTRACT_NAME, path.display()))?
        .parse::<Address>()
        .map_err(|e| anyhow!("Invalid contract address: {}", e))
}

/// Read the ABI from a Hardhat artifact's `abi` field.
pub fn load_abi(path: &Path) -> Result<Abi> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read contract artifact {}", path.display()))?;
    let artifact: serde_json::Value = serde_json::from_str(&raw)?;
    let abi = artifact
        .get("abi")
        .cloned()
        .ok_or_else(|| anyhow!("Artifact {} has no abi", path.display()))?;

    Ok(serde_json::from_value(abi)?)
}
