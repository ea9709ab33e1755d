use std::io::Write;

use crate::framework::{
    ContractFactory, ContractFramework, DeployedContract, DeploymentFailure, PendingDeployment,
};

/// Deploys one named contract through a [`ContractFramework`].
pub struct Deploy<F> {
    framework: F,
    contract_name: String,
}

impl<F: ContractFramework> Deploy<F> {
    pub fn new(framework: F, contract_name: impl Into<String>) -> Self {
        Self {
            framework,
            contract_name: contract_name.into(),
        }
    }

    /// Runs a single deployment attempt, writing status lines to `out`, and
    /// returns the confirmed address.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<String, DeploymentFailure> {
        writeln!(out, "Compiling...")?;

        writeln!(out, "Deploying {} contract...", self.contract_name)?;
        let factory = self
            .framework
            .get_contract_factory(&self.contract_name)
            .await?;
        log::debug!("resolved factory for {}", self.contract_name);

        let pending = factory.deploy().await?;
        log::info!("{} deployment submitted, waiting for confirmation", self.contract_name);

        let contract = pending.deployed().await?;
        let address = contract.address();

        writeln!(out, "{} deployed to: {}", self.contract_name, address)?;
        Ok(address)
    }
}

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Turns the outcome of a deployment into the process exit status, writing any
/// failure to `err`.
pub fn report<T, W: Write>(result: anyhow::Result<T>, err: &mut W) -> u8 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            log::debug!("deployment failed: {:?}", e);
            let _ = writeln!(err, "Error: {:#}", e);
            EXIT_FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[derive(Clone, Copy, PartialEq)]
    enum Failure {
        None,
        Resolve,
        Deploy,
        Confirm,
    }

    /// Hands out a fresh address for every deployment.
    struct MockFramework {
        known: &'static str,
        fail: Failure,
        deployments: Arc<AtomicUsize>,
    }

    impl MockFramework {
        fn new(fail: Failure) -> Self {
            Self {
                known: "HelloWorld",
                fail,
                deployments: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    struct MockFactory {
        fail: Failure,
        deployments: Arc<AtomicUsize>,
    }

    struct MockPending {
        fail: Failure,
        address: String,
    }

    struct MockDeployed(String);

    #[async_trait]
    impl ContractFramework for MockFramework {
        type Factory = MockFactory;

        async fn get_contract_factory(&self, name: &str) -> Result<MockFactory, DeploymentFailure> {
            if self.fail == Failure::Resolve || name != self.known {
                return Err(DeploymentFailure::ContractNotFound(name.to_string()));
            }
            Ok(MockFactory {
                fail: self.fail,
                deployments: self.deployments.clone(),
            })
        }
    }

    #[async_trait]
    impl ContractFactory for MockFactory {
        type Pending = MockPending;

        async fn deploy(self) -> Result<MockPending, DeploymentFailure> {
            if self.fail == Failure::Deploy {
                return Err(DeploymentFailure::Network("connection refused".to_string()));
            }
            let n = self.deployments.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(MockPending {
                fail: self.fail,
                address: format!("0x{:040x}", n),
            })
        }
    }

    #[async_trait]
    impl PendingDeployment for MockPending {
        type Deployed = MockDeployed;

        async fn deployed(self) -> Result<MockDeployed, DeploymentFailure> {
            if self.fail == Failure::Confirm {
                return Err(DeploymentFailure::Rejected("insufficient funds".to_string()));
            }
            Ok(MockDeployed(self.address))
        }
    }

    impl DeployedContract for MockDeployed {
        fn address(&self) -> String {
            self.0.clone()
        }
    }

    async fn invoke(deploy: &Deploy<MockFramework>) -> (String, String, u8, Option<String>) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = deploy.run(&mut out).await;
        let address = result.as_ref().ok().cloned();
        let code = report(result.map_err(anyhow::Error::from), &mut err);
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
            code,
            address,
        )
    }

    #[tokio::test]
    async fn test_successful_deployment_prints_three_lines() {
        let deploy = Deploy::new(MockFramework::new(Failure::None), "HelloWorld");
        let (out, err, code, address) = invoke(&deploy).await;

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Compiling...",
                "Deploying HelloWorld contract...",
                "HelloWorld deployed to: 0x0000000000000000000000000000000000000001",
            ]
        );
        assert!(err.is_empty());
        assert_eq!(code, EXIT_SUCCESS);
        assert_eq!(
            address.as_deref(),
            Some("0x0000000000000000000000000000000000000001")
        );
    }

    #[tokio::test]
    async fn test_rejected_deploy_fails_without_address() {
        let deploy = Deploy::new(MockFramework::new(Failure::Deploy), "HelloWorld");
        let (out, err, code, address) = invoke(&deploy).await;

        assert!(!out.contains("deployed to"));
        assert_eq!(out.lines().count(), 2);
        assert!(err.contains("connection refused"));
        assert_eq!(code, EXIT_FAILURE);
        assert!(address.is_none());
    }

    #[tokio::test]
    async fn test_failed_confirmation_fails_without_address() {
        let deploy = Deploy::new(MockFramework::new(Failure::Confirm), "HelloWorld");
        let (out, err, code, _) = invoke(&deploy).await;

        assert!(!out.contains("deployed to"));
        assert!(err.contains("insufficient funds"));
        assert_eq!(code, EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_unknown_contract_follows_failure_path() {
        let deploy = Deploy::new(MockFramework::new(Failure::None), "Missing");
        let (out, err, code, address) = invoke(&deploy).await;

        assert!(!out.contains("deployed to"));
        assert!(err.contains("contract not found: Missing"));
        assert_eq!(code, EXIT_FAILURE);
        assert!(address.is_none());
    }

    #[tokio::test]
    async fn test_resolution_failure_follows_failure_path() {
        let deploy = Deploy::new(MockFramework::new(Failure::Resolve), "HelloWorld");
        let (out, _, code, _) = invoke(&deploy).await;

        assert!(!out.contains("deployed to"));
        assert_eq!(code, EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_each_invocation_reports_its_own_address() {
        let deploy = Deploy::new(MockFramework::new(Failure::None), "HelloWorld");

        let (first_out, _, _, first) = invoke(&deploy).await;
        let (second_out, _, _, second) = invoke(&deploy).await;

        let first = first.unwrap();
        let second = second.unwrap();
        assert_ne!(first, second);
        assert!(first_out.ends_with(&format!("deployed to: {first}\n")));
        assert!(second_out.ends_with(&format!("deployed to: {second}\n")));
        assert_eq!(deploy.framework.deployments.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_report_failure_writes_a_single_error_line() {
        let mut err = Vec::new();
        let failure = DeploymentFailure::ContractNotFound("HelloWorld".to_string());

        assert_eq!(report::<(), _>(Err(failure.into()), &mut err), EXIT_FAILURE);
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "Error: contract not found: HelloWorld\n"
        );
    }

    #[test]
    fn test_report_success() {
        let mut err = Vec::new();
        assert_eq!(report(Ok(()), &mut err), EXIT_SUCCESS);
        assert!(err.is_empty());
    }
}
