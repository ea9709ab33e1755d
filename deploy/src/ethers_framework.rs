use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use ethers::{
    contract::ContractFactory as AbiFactory,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{H160, H256, U64},
    utils::{hex, to_checksum},
};

use crate::{
    artifacts::Artifacts,
    framework::{
        ContractFactory, ContractFramework, DeployedContract, DeploymentFailure,
        PendingDeployment,
    },
};

pub type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Send pre-EIP-1559 transactions.
    pub legacy: bool,
    pub confirmations: usize,
    pub poll_interval: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            legacy: false,
            confirmations: 1,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Deploys compiled artifacts over JSON-RPC with a local signing key.
pub struct EthersFramework {
    client: Arc<Client>,
    artifacts: Artifacts,
    options: DeployOptions,
}

impl EthersFramework {
    pub async fn connect(
        rpc: &str,
        sk: &str,
        artifacts: Artifacts,
        options: DeployOptions,
    ) -> Result<Self, DeploymentFailure> {
        let wallet = parse_wallet(sk)?;
        let provider = Provider::<Http>::try_from(rpc)
            .map_err(|e| {
                DeploymentFailure::Configuration(format!("invalid rpc url {rpc}: {e}"))
            })?
            .interval(options.poll_interval);

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| DeploymentFailure::Network(e.to_string()))?
            .as_u64();
        log::info!(
            "connected to chain id:{} as {}",
            chain_id,
            to_checksum(&wallet.address(), None)
        );

        let client = Arc::new(SignerMiddleware::new(provider, wallet.with_chain_id(chain_id)));
        Ok(Self {
            client,
            artifacts,
            options,
        })
    }
}

fn parse_wallet(sk: &str) -> Result<LocalWallet, DeploymentFailure> {
    let bytes = hex::decode(sk.strip_prefix("0x").unwrap_or(sk))
        .map_err(|e| DeploymentFailure::Configuration(format!("private key is not hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(DeploymentFailure::Configuration(format!(
            "private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    LocalWallet::from_bytes(&bytes)
        .map_err(|e| DeploymentFailure::Configuration(format!("invalid private key: {e}")))
}

#[async_trait]
impl ContractFramework for EthersFramework {
    type Factory = EthersFactory;

    async fn get_contract_factory(&self, name: &str) -> Result<EthersFactory, DeploymentFailure> {
        let artifact = self.artifacts.load(name)?;
        let factory = AbiFactory::new(artifact.abi, artifact.bytecode, self.client.clone());

        Ok(EthersFactory {
            name: artifact.contract_name,
            client: self.client.clone(),
            factory,
            options: self.options.clone(),
        })
    }
}

pub struct EthersFactory {
    name: String,
    client: Arc<Client>,
    factory: AbiFactory<Client>,
    options: DeployOptions,
}

#[async_trait]
impl ContractFactory for EthersFactory {
    type Pending = EthersPendingDeployment;

    async fn deploy(self) -> Result<EthersPendingDeployment, DeploymentFailure> {
        let deployer = self
            .factory
            .deploy(())
            .map_err(|e| DeploymentFailure::Rejected(e.to_string()))?;
        let mut tx = if self.options.legacy {
            deployer.legacy().tx
        } else {
            deployer.tx
        };

        self.client
            .fill_transaction(&mut tx, None)
            .await
            .map_err(|e| DeploymentFailure::Rejected(e.to_string()))?;

        let tx_hash = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| DeploymentFailure::Rejected(e.to_string()))?
            .tx_hash();
        log::info!("{} deployment transaction hash:{:?}", self.name, tx_hash);

        Ok(EthersPendingDeployment {
            client: self.client,
            tx_hash,
            confirmations: self.options.confirmations,
        })
    }
}

pub struct EthersPendingDeployment {
    client: Arc<Client>,
    tx_hash: H256,
    confirmations: usize,
}

#[async_trait]
impl PendingDeployment for EthersPendingDeployment {
    type Deployed = EthersDeployedContract;

    async fn deployed(self) -> Result<EthersDeployedContract, DeploymentFailure> {
        let receipt = PendingTransaction::new(self.tx_hash, self.client.provider())
            .confirmations(self.confirmations)
            .await
            .map_err(|e| DeploymentFailure::Network(e.to_string()))?
            .ok_or_else(|| {
                DeploymentFailure::Rejected(format!("transaction {:?} was dropped", self.tx_hash))
            })?;

        if receipt.status == Some(U64::zero()) {
            return Err(DeploymentFailure::Rejected(format!(
                "transaction {:?} reverted in block {:?}",
                self.tx_hash, receipt.block_number
            )));
        }

        let address = receipt.contract_address.ok_or_else(|| {
            DeploymentFailure::Rejected(format!(
                "receipt for {:?} has no contract address",
                self.tx_hash
            ))
        })?;
        log::debug!(
            "deployment mined in block:{:?} gas used:{:?}",
            receipt.block_number,
            receipt.gas_used
        );

        Ok(EthersDeployedContract { address })
    }
}

pub struct EthersDeployedContract {
    address: H160,
}

impl DeployedContract for EthersDeployedContract {
    fn address(&self) -> String {
        to_checksum(&self.address, None)
    }
}
