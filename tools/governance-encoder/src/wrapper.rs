//! Wrapping raw calls into the submission shape of the live controller, and back.

use alloy_sol_types::SolCall;
use governance_types::{EncodedTransaction, OwnershipTopology};

use crate::{
    errors::GovernanceError,
    interfaces::{IDelayedMultiSig, IOwnerAdapterV1, IOwnerAdapterV2},
};

/// Produce the outer transaction that makes `topology`'s controller perform `raw`.
///
/// A call whose target is the controller itself is returned verbatim: the controller is
/// reconfigured by calling it directly, not by submitting a transaction to itself.
pub fn wrap(
    raw: EncodedTransaction,
    topology: &OwnershipTopology,
) -> Result<EncodedTransaction, GovernanceError> {
    if raw.to == topology.controller() {
        return Ok(raw);
    }

    let outer = match *topology {
        OwnershipTopology::DirectOwner(_) | OwnershipTopology::GnosisSafe(_) => raw,
        OwnershipTopology::DelayedMultiSig(multisig) => {
            let call = IDelayedMultiSig::submitTransactionCall {
                destination: raw.to,
                value: raw.value,
                data: raw.data,
            };
            EncodedTransaction::new(multisig, call.abi_encode())
        }
        OwnershipTopology::OwnerAdapterV1(adapter) => {
            ensure_no_value(&raw, topology)?;
            let call = IOwnerAdapterV1::submitTransactionCall {
                destination: raw.to,
                data: raw.data,
            };
            EncodedTransaction::new(adapter, call.abi_encode())
        }
        OwnershipTopology::OwnerAdapterV2(adapter) => {
            ensure_no_value(&raw, topology)?;
            let call = IOwnerAdapterV2::submitTransactionCall {
                destination: raw.to,
                data: raw.data,
            };
            EncodedTransaction::new(adapter, call.abi_encode())
        }
    };
    Ok(outer)
}

/// Recover the call the controller will perform for `tx`.
///
/// Transactions not addressed to the controller, or addressed to it with anything other than a
/// submission, are returned unchanged.
pub fn unwrap(tx: &EncodedTransaction, topology: &OwnershipTopology) -> EncodedTransaction {
    if tx.to != topology.controller() {
        return tx.clone();
    }

    let inner = match topology {
        OwnershipTopology::DirectOwner(_) | OwnershipTopology::GnosisSafe(_) => None,
        OwnershipTopology::DelayedMultiSig(_) => {
            IDelayedMultiSig::submitTransactionCall::abi_decode(&tx.data, true)
                .ok()
                .map(|c| EncodedTransaction::new(c.destination, c.data).with_value(c.value))
        }
        OwnershipTopology::OwnerAdapterV1(_) => {
            IOwnerAdapterV1::submitTransactionCall::abi_decode(&tx.data, true)
                .ok()
                .map(|c| EncodedTransaction::new(c.destination, c.data))
        }
        OwnershipTopology::OwnerAdapterV2(_) => {
            IOwnerAdapterV2::submitTransactionCall::abi_decode(&tx.data, true)
                .ok()
                .map(|c| EncodedTransaction::new(c.destination, c.data))
        }
    };
    inner.unwrap_or_else(|| tx.clone())
}

fn ensure_no_value(
    raw: &EncodedTransaction,
    topology: &OwnershipTopology,
) -> Result<(), GovernanceError> {
    if raw.value.is_zero() {
        return Ok(());
    }
    Err(GovernanceError::ValueNotForwardable {
        controller: topology.controller(),
        value: raw.value,
    })
}
