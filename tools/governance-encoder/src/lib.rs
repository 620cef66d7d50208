//! Governance transaction encoding and dry-run pipeline.
//!
//! A script builds [`CallIntent`]s against [`ContractInterface`]s. Each intent is rendered into
//! annotated diagnostics ([`formatter`]) and wrapped for the protocol's live controller
//! ([`wrapper`], using the topology from [`topology`]). The [`dry_run`] orchestrator executes the
//! batch on a fork, checks the script's invariants and emits the [`manifest`].

pub mod classifier;
pub mod deployments;
pub mod dry_run;
pub mod encoder;
pub mod errors;
pub mod formatter;
pub mod intent;
pub mod interfaces;
pub mod manifest;
pub mod mock;
pub mod resolver;
pub mod rpc;
pub mod topology;
pub mod wrapper;

#[cfg(test)]
mod tests;

pub use governance_types::{
    ChainError, ChainReader, ControllerKind, EncodedTransaction, ExecutionOutcome, ForkExecutor,
    OwnershipTopology,
};

pub use deployments::DeploymentBook;
pub use dry_run::{DryRunConfig, DryRunOrchestrator, GovernanceScript};
pub use encoder::GovernanceEncoder;
pub use errors::{DryRunError, GovernanceError, InvariantViolation};
pub use intent::{CallIntent, ContractInterface};
pub use manifest::UploadManifest;
pub use resolver::AddressNameResolver;
pub use topology::{ControllerRegistry, OwnershipTopologyResolver};
