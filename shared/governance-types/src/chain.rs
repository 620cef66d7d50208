use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::transaction::EncodedTransaction;

/// Errors during chain access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// Used by mocks or partially implemented backends.
    #[error("operation not supported by this chain backend")]
    NotImplemented,
    /// The call or transaction reverted. `reason` is the revert message as reported by the node.
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },
    /// Return data was malformed or could not be decoded.
    #[error("malformed return data from {target}")]
    MalformedReturn { target: Address },
    /// The node could not be reached or answered with a transport-level error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Receipt summary of a transaction executed against a fork.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub tx_hash: Option<String>,
    pub gas_used: Option<u64>,
}

/// Read-only access to chain state.
#[async_trait(?Send)]
pub trait ChainReader {
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// `eth_call` of `data` against `to` at the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;
}

/// A forked chain that accepts transactions from impersonated senders.
#[async_trait(?Send)]
pub trait ForkExecutor: ChainReader {
    /// Make `account` usable as a sender (impersonation + gas funding).
    async fn impersonate(&self, _account: Address) -> Result<(), ChainError> {
        Err(ChainError::NotImplemented)
    }

    /// Send `tx` from `from` and wait for it to be mined.
    async fn send(
        &self,
        _from: Address,
        _tx: &EncodedTransaction,
    ) -> Result<ExecutionOutcome, ChainError> {
        Err(ChainError::NotImplemented)
    }
}
