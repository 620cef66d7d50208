use std::path::PathBuf;

use alloy_primitives::{Address, U256};

/// Errors during chain access.
pub use governance_types::ChainError;

/// Errors while turning intents into governance transactions.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    /// `owner()` is not a registered controller nor a recognised direct signer.
    #[error("unknown owner {owner}: not a registered controller or direct signer")]
    UnknownOwner { owner: Address },
    /// Owner adapters have no value parameter, so native value would be dropped.
    #[error("controller {controller} cannot forward native value {value}")]
    ValueNotForwardable { controller: Address, value: U256 },
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("`{contract}` has no method `{method}` taking {arity} argument(s)")]
    UnknownMethod {
        contract: String,
        method: String,
        arity: usize,
    },
    #[error("`{contract}.{method}` is overloaded with {arity} argument(s); use the full signature")]
    AmbiguousMethod {
        contract: String,
        method: String,
        arity: usize,
    },
    #[error("ABI error in {context}: {message}")]
    Abi { context: String, message: String },
    #[error("failed reading {path}: {message}")]
    InvalidFile { path: PathBuf, message: String },
}

impl GovernanceError {
    pub(crate) fn abi(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        GovernanceError::Abi {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

/// A post-condition check failed after every transaction executed successfully.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invariant violated: {0}")]
pub struct InvariantViolation(pub String);

impl InvariantViolation {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<ChainError> for InvariantViolation {
    fn from(err: ChainError) -> Self {
        Self(format!("post-state query failed: {err}"))
    }
}

/// Errors during a dry run. Execution and invariant failures are kept apart: the first means a
/// call reverted, the second that every call ran but the intended state was not reached.
#[derive(Debug, thiserror::Error)]
pub enum DryRunError {
    #[error("encoding failed: {0}")]
    Encoding(#[from] GovernanceError),
    #[error("fork setup failed: {0}")]
    Setup(ChainError),
    #[error("transaction #{index} to {to} failed: {reason}")]
    Execution {
        index: usize,
        to: Address,
        reason: String,
    },
    #[error("all transactions executed but {0}")]
    Invariant(#[from] InvariantViolation),
    #[error("writing upload manifest failed: {0}")]
    Manifest(#[from] crate::manifest::ManifestError),
}
