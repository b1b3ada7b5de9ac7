//! Disposable fork node
//!
//! The Simulated context points at a local fork of the live chain. A fork is
//! spawned per chain per cycle at the live gas price and stopped afterwards.

use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use tokio::process::Command;
use tracing::{debug, info};

/// A running fork, identified by whatever the backend returned at start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkInstance {
    pub id: String,
}

#[async_trait]
pub trait ForkNode: Send + Sync {
    /// Start a fork of `upstream_url` mining at `gas_price`
    async fn start(&self, upstream_url: &str, gas_price: u128, chain_id: u64) -> Result<ForkInstance>;

    async fn stop(&self, instance: &ForkInstance) -> Result<()>;
}

/// Ganache started in detached mode through `npx`
pub struct GanacheFork {
    port: u16,
}

impl GanacheFork {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    fn start_args(&self, upstream_url: &str, gas_price: u128, chain_id: u64) -> Vec<String> {
        vec![
            "ganache".to_string(),
            "--fork".to_string(),
            upstream_url.to_string(),
            "-q".to_string(),
            "-g".to_string(),
            gas_price.to_string(),
            "--wallet.deterministic".to_string(),
            "--detach".to_string(),
            "-e".to_string(),
            "100000".to_string(),
            "--chain.chainId".to_string(),
            chain_id.to_string(),
            "--server.port".to_string(),
            self.port.to_string(),
        ]
    }
}

#[async_trait]
impl ForkNode for GanacheFork {
    async fn start(&self, upstream_url: &str, gas_price: u128, chain_id: u64) -> Result<ForkInstance> {
        info!("🍴 Spinning up fork of chain {} at gas price {}", chain_id, gas_price);

        let output = Command::new("npx")
            .args(self.start_args(upstream_url, gas_price, chain_id))
            .output()
            .await
            .wrap_err("failed to run npx ganache")?;

        if !output.status.success() {
            return Err(eyre!(
                "ganache exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(eyre!("ganache did not report an instance name"));
        }

        debug!("Fork instance {} listening on port {}", id, self.port);
        Ok(ForkInstance { id })
    }

    async fn stop(&self, instance: &ForkInstance) -> Result<()> {
        info!("🧹 Stopping fork instance {}", instance.id);

        let status = Command::new("npx")
            .args(["ganache", "instances", "stop", instance.id.as_str()])
            .status()
            .await
            .wrap_err("failed to run npx ganache instances stop")?;

        if !status.success() {
            return Err(eyre!("stopping fork {} exited with {}", instance.id, status));
        }
        Ok(())
    }
}
