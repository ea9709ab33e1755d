use std::{io, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    artifacts::Artifacts,
    deploy::{report, Deploy},
    ethers_framework::{DeployOptions, EthersFramework},
    framework::DeploymentFailure,
};

#[derive(Debug, Parser)]
pub struct CommandLine {
    #[clap(short, long, env = "RPC_URL", default_value = "http://127.0.0.1:8545")]
    rpc: String,

    #[clap(long, env = "PRIVATE_KEY", hide_env_values = true)]
    sk: Option<String>,

    #[clap(short, long, env = "ARTIFACTS_DIR", default_value = "artifacts")]
    artifacts: String,

    #[clap(short, long, env = "CONTRACT_NAME", default_value = "HelloWorld")]
    contract: String,

    #[clap(long, env = "CONFIRMATIONS", default_value_t = 1)]
    confirmations: usize,

    #[clap(long, env = "POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    #[clap(long, env = "LEGACY_TX")]
    legacy: bool,
}

impl CommandLine {
    pub async fn execute(self) -> u8 {
        let result = self.deploy().await;
        report(result, &mut io::stderr())
    }

    async fn deploy(self) -> Result<String> {
        let sk = self.sk.as_deref().ok_or_else(|| {
            DeploymentFailure::Configuration(
                "private key not set, pass --sk or PRIVATE_KEY".to_string(),
            )
        })?;
        let options = DeployOptions {
            legacy: self.legacy,
            confirmations: self.confirmations,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        };
        let framework = EthersFramework::connect(
            &self.rpc,
            sk,
            Artifacts::new(&self.artifacts),
            options,
        )
        .await
        .with_context(|| format!("connecting to {}", self.rpc))?;

        let deploy = Deploy::new(framework, self.contract);
        Ok(deploy.run(&mut io::stdout()).await?)
    }
}
