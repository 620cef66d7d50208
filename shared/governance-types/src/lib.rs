//! Shared types for governance transaction encoding: ownership topology, encoded transactions
//! and the chain access traits implemented by RPC and in-memory backends.

pub mod chain;
pub mod topology;
pub mod transaction;

pub use chain::{ChainError, ChainReader, ExecutionOutcome, ForkExecutor};
pub use topology::{ControllerKind, OwnershipTopology};
pub use transaction::EncodedTransaction;
