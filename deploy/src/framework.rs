//! The deployment framework seen from the orchestrator: resolve a factory by
//! contract name, deploy it, wait for confirmation, read the address.

use std::io;

use async_trait::async_trait;
use thiserror::Error;

/// Every way a deployment can fail. The orchestrator does not recover from any
/// of them; they all end the process with a non-zero exit status.
#[derive(Debug, Error)]
pub enum DeploymentFailure {
    /// No compiled artifact exists for the requested contract name.
    #[error("contract not found: {0}")]
    ContractNotFound(String),
    /// An artifact exists but cannot be used to deploy.
    #[error("invalid artifact {path}: {reason}")]
    InvalidArtifact { path: String, reason: String },
    /// Bad ambient configuration (key, rpc url).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Transport or provider failure.
    #[error("network error: {0}")]
    Network(String),
    /// The network refused or reverted the deployment transaction.
    #[error("deployment rejected: {0}")]
    Rejected(String),
    /// Status output could not be written.
    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

/// Resolves compiled contracts into factories.
#[async_trait]
pub trait ContractFramework: Send + Sync {
    type Factory: ContractFactory;

    async fn get_contract_factory(&self, name: &str) -> Result<Self::Factory, DeploymentFailure>;
}

/// Builds new instances of one compiled contract.
#[async_trait]
pub trait ContractFactory: Send {
    type Pending: PendingDeployment;

    /// Submits the deployment transaction.
    async fn deploy(self) -> Result<Self::Pending, DeploymentFailure>;
}

/// A submitted deployment whose address is not known yet.
#[async_trait]
pub trait PendingDeployment: Send {
    type Deployed: DeployedContract;

    /// Suspends until the deployment transaction is mined.
    async fn deployed(self) -> Result<Self::Deployed, DeploymentFailure>;
}

/// A confirmed deployment.
pub trait DeployedContract {
    fn address(&self) -> String;
}
