//! In-memory chain for testing.
//!
//! This can be used to exercise encoding, formatting and dry runs without a forked node:
//! static responses answer `eth_call`s, and [`MockContract`]s hold state that transactions
//! mutate.

use std::{cell::RefCell, collections::HashMap};

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;

pub use governance_types::{ChainError, ChainReader, EncodedTransaction, ExecutionOutcome, ForkExecutor};

/// A stateful contract living on the mock chain.
pub trait MockContract {
    fn call(&self, data: &[u8]) -> Result<Bytes, ChainError>;

    /// Execute a transaction; `Err` carries the revert reason.
    fn execute(&mut self, from: Address, value: U256, data: &[u8]) -> Result<(), String>;
}

/// Mock chain for off-chain testing.
///
/// Calls to addresses with neither a contract nor a registered response return empty data, like
/// an `eth_call` to an account without code.
pub struct MockChain {
    chain_id: u64,
    responses: HashMap<(Address, Bytes), Result<Bytes, ChainError>>,
    contracts: RefCell<HashMap<Address, Box<dyn MockContract>>>,
    impersonated: RefCell<Vec<Address>>,
    queries: RefCell<Vec<(Address, Bytes)>>,
    sent: RefCell<Vec<(Address, EncodedTransaction)>>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            responses: HashMap::new(),
            contracts: RefCell::new(HashMap::new()),
            impersonated: RefCell::new(Vec::new()),
            queries: RefCell::new(Vec::new()),
            sent: RefCell::new(Vec::new()),
        }
    }

    /// Answer `call` against `to` with `ret`, ABI-encoded as a single return value.
    pub fn with_call<C: SolCall, R: SolValue>(mut self, to: Address, call: C, ret: R) -> Self {
        self.responses
            .insert((to, call.abi_encode().into()), Ok(ret.abi_encode().into()));
        self
    }

    /// Make `call` against `to` revert with `reason`.
    pub fn with_revert<C: SolCall>(mut self, to: Address, call: C, reason: &str) -> Self {
        self.responses.insert(
            (to, call.abi_encode().into()),
            Err(ChainError::Reverted {
                reason: reason.to_string(),
            }),
        );
        self
    }

    pub fn with_contract(self, at: Address, contract: impl MockContract + 'static) -> Self {
        self.contracts.borrow_mut().insert(at, Box::new(contract));
        self
    }

    /// Number of `eth_call`s served so far.
    pub fn query_count(&self) -> usize {
        self.queries.borrow().len()
    }

    pub fn sent(&self) -> Vec<(Address, EncodedTransaction)> {
        self.sent.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ChainReader for MockChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        self.queries.borrow_mut().push((to, data.clone()));
        if let Some(contract) = self.contracts.borrow().get(&to) {
            return contract.call(&data);
        }
        match self.responses.get(&(to, data)) {
            Some(response) => response.clone(),
            None => Ok(Bytes::new()),
        }
    }
}

#[async_trait(?Send)]
impl ForkExecutor for MockChain {
    async fn impersonate(&self, account: Address) -> Result<(), ChainError> {
        let mut impersonated = self.impersonated.borrow_mut();
        if !impersonated.contains(&account) {
            impersonated.push(account);
        }
        Ok(())
    }

    async fn send(
        &self,
        from: Address,
        tx: &EncodedTransaction,
    ) -> Result<ExecutionOutcome, ChainError> {
        if !self.impersonated.borrow().contains(&from) {
            return Err(ChainError::Transport(format!(
                "sender {from} is not impersonated"
            )));
        }
        self.sent.borrow_mut().push((from, tx.clone()));

        if let Some(contract) = self.contracts.borrow_mut().get_mut(&tx.to) {
            contract
                .execute(from, tx.value, &tx.data)
                .map_err(|reason| ChainError::Reverted { reason })?;
        }
        Ok(ExecutionOutcome {
            tx_hash: None,
            gas_used: None,
        })
    }
}
