//! JSON-RPC chain backend over ethers, for forked nodes (anvil / hardhat).

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider, ProviderError},
    types::{
        transaction::eip2718::TypedTransaction, Bytes as EthBytes, TransactionRequest, H160,
        U256 as EthU256, U64,
    },
};
use governance_types::{ChainError, ChainReader, EncodedTransaction, ExecutionOutcome, ForkExecutor};
use regex::Regex;
use tracing::debug;

/// Balance given to impersonated senders so they can pay for gas (100 ETH).
const DEFAULT_GAS_FUNDING: u128 = 100_000_000_000_000_000_000;

pub struct RpcChain {
    provider: Provider<Http>,
    gas_funding: U256,
}

impl RpcChain {
    pub fn new(rpc_url: &str) -> Result<Self, ChainError> {
        let provider =
            Provider::<Http>::try_from(rpc_url).map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(Self {
            provider,
            gas_funding: U256::from(DEFAULT_GAS_FUNDING),
        })
    }

    pub fn with_gas_funding(mut self, wei: U256) -> Self {
        self.gas_funding = wei;
        self
    }
}

fn to_h160(address: Address) -> H160 {
    H160::from_slice(address.as_slice())
}

fn to_eth_u256(value: U256) -> EthU256 {
    EthU256::from_big_endian(&value.to_be_bytes::<32>())
}

fn map_provider_error(err: ProviderError) -> ChainError {
    let text = err.to_string();
    match revert_reason(&text) {
        Some(reason) => ChainError::Reverted { reason },
        None => ChainError::Transport(text),
    }
}

/// Extract the revert reason from a node's error text.
///
/// Handles anvil/geth (`execution reverted: <reason>`) and hardhat
/// (`reverted with reason string '<reason>'`).
pub(crate) fn revert_reason(text: &str) -> Option<String> {
    let hardhat = Regex::new(r"reverted with reason string '([^']*)'").ok()?;
    if let Some(reason) = hardhat.captures(text).and_then(|c| c.get(1)) {
        return Some(reason.as_str().to_string());
    }

    let geth = Regex::new(r"execution reverted(?::\s*([^,\n]*))?").ok()?;
    let captures = geth.captures(text)?;
    let reason = captures
        .get(1)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .unwrap_or("execution reverted without a reason");
    Some(reason.to_string())
}

#[async_trait(?Send)]
impl ChainReader for RpcChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        let id = self.provider.get_chainid().await.map_err(map_provider_error)?;
        Ok(id.as_u64())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(to_h160(to))
            .data(EthBytes::from(data.to_vec()))
            .into();
        let out = self.provider.call(&tx, None).await.map_err(map_provider_error)?;
        Ok(Bytes::from(out.to_vec()))
    }
}

#[async_trait(?Send)]
impl ForkExecutor for RpcChain {
    async fn impersonate(&self, account: Address) -> Result<(), ChainError> {
        let who = to_h160(account);
        self.provider
            .request::<_, serde_json::Value>("hardhat_impersonateAccount", [who])
            .await
            .map_err(map_provider_error)?;
        self.provider
            .request::<_, serde_json::Value>(
                "hardhat_setBalance",
                (who, format!("{:#x}", self.gas_funding)),
            )
            .await
            .map_err(map_provider_error)?;
        debug!(%account, "impersonating account on fork");
        Ok(())
    }

    async fn send(
        &self,
        from: Address,
        tx: &EncodedTransaction,
    ) -> Result<ExecutionOutcome, ChainError> {
        let request = TransactionRequest::new()
            .from(to_h160(from))
            .to(to_h160(tx.to))
            .value(to_eth_u256(tx.value))
            .data(EthBytes::from(tx.data.to_vec()));

        let pending = self
            .provider
            .send_transaction(request, None)
            .await
            .map_err(map_provider_error)?;
        let tx_hash = format!("{:?}", pending.tx_hash());
        let receipt = pending
            .await
            .map_err(map_provider_error)?
            .ok_or_else(|| ChainError::Transport(format!("transaction {tx_hash} was dropped")))?;

        if receipt.status != Some(U64::from(1u64)) {
            return Err(ChainError::Reverted {
                reason: format!("transaction {tx_hash} reverted"),
            });
        }
        Ok(ExecutionOutcome {
            tx_hash: Some(tx_hash),
            gas_used: receipt.gas_used.map(|g| g.as_u64()),
        })
    }
}
