//! Executing a governance batch against a fork, checking post-conditions, and emitting the
//! upload manifest.

use std::path::PathBuf;

use alloy_primitives::Address;
use async_trait::async_trait;
use governance_types::{ChainError, ChainReader, EncodedTransaction, ForkExecutor};
use tracing::{info, warn};

use crate::{
    deployments::DeploymentBook,
    encoder::GovernanceEncoder,
    errors::{DryRunError, GovernanceError, InvariantViolation},
    manifest::UploadManifest,
    resolver::AddressNameResolver,
    topology::ControllerRegistry,
    wrapper::unwrap,
};

/// A governance script: the batch it wants executed and what must hold afterwards.
#[async_trait(?Send)]
pub trait GovernanceScript {
    /// Name recorded in the manifest's `meta.name`.
    fn name(&self) -> String;

    fn description(&self) -> String {
        String::new()
    }

    async fn transactions(
        &self,
        encoder: &mut GovernanceEncoder<'_>,
    ) -> Result<Vec<EncodedTransaction>, GovernanceError>;

    /// Post-state assertions; must be side-effect free.
    async fn invariants(&self, _chain: &dyn ChainReader) -> Result<(), InvariantViolation> {
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct DryRunConfig {
    pub protocol: Address,
    pub registry: ControllerRegistry,
    pub deployments: DeploymentBook,
    /// Where to write the manifest on success.
    pub output: Option<PathBuf>,
    /// Skip fork execution and invariants; only encode and write the manifest.
    pub encode_only: bool,
    /// Print per-transaction diagnostics to stdout.
    pub echo: bool,
}

impl DryRunConfig {
    pub fn new(protocol: Address, registry: ControllerRegistry) -> Self {
        Self {
            protocol,
            registry,
            deployments: DeploymentBook::default(),
            output: None,
            encode_only: false,
            echo: true,
        }
    }
}

pub struct DryRunOrchestrator<'a, F: ForkExecutor> {
    fork: &'a F,
    config: DryRunConfig,
}

impl<'a, F: ForkExecutor> DryRunOrchestrator<'a, F> {
    pub fn new(fork: &'a F, config: DryRunConfig) -> Self {
        Self { fork, config }
    }

    pub async fn run<S: GovernanceScript + ?Sized>(
        &self,
        script: &S,
    ) -> Result<UploadManifest, DryRunError> {
        let chain_id = self.fork.chain_id().await.map_err(DryRunError::Setup)?;
        let names = AddressNameResolver::new(
            chain_id,
            self.config.protocol,
            self.config.deployments.clone(),
        );
        let mut encoder = GovernanceEncoder::new(
            self.fork,
            self.config.protocol,
            self.config.registry.clone(),
            names,
        )
        .with_echo(self.config.echo);

        let transactions = script.transactions(&mut encoder).await?;
        if transactions.is_empty() {
            warn!(script = %script.name(), "script produced no transactions");
        }

        if self.config.encode_only {
            warn!("encode-only run: fork execution and invariants skipped");
        } else {
            let topology = encoder.topology().await?;
            let sender = topology.controller();
            self.fork
                .impersonate(sender)
                .await
                .map_err(DryRunError::Setup)?;

            for (index, tx) in transactions.iter().enumerate() {
                let step = unwrap(tx, &topology);
                match self.fork.send(sender, &step).await {
                    Ok(outcome) => info!(
                        index,
                        to = %step.to,
                        tx_hash = outcome.tx_hash.as_deref().unwrap_or("-"),
                        gas_used = outcome.gas_used.unwrap_or_default(),
                        "executed on fork"
                    ),
                    Err(ChainError::Reverted { reason }) => {
                        return Err(DryRunError::Execution {
                            index,
                            to: step.to,
                            reason,
                        })
                    }
                    Err(other) => {
                        return Err(DryRunError::Execution {
                            index,
                            to: step.to,
                            reason: other.to_string(),
                        })
                    }
                }
            }

            script.invariants(self.fork).await?;
            info!(count = transactions.len(), "all transactions executed and invariants hold");
        }

        let manifest = UploadManifest::new(chain_id, &script.name(), &transactions)
            .with_description(script.description())
            .sealed()?;
        if let Some(path) = &self.config.output {
            manifest.write_atomic(path)?;
            info!(path = %path.display(), "wrote upload manifest");
        }
        Ok(manifest)
    }
}
