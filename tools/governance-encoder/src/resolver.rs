//! Human-readable labels for addresses and market ids.
//!
//! Every lookup is memoized in the resolver's [`NameCache`]. The cache lives as long as the
//! resolver (one script run): the token and market set is assumed stable for that long, so
//! nothing is ever invalidated.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use governance_types::{ChainError, ChainReader};
use tracing::{debug, warn};

use crate::{
    deployments::DeploymentBook,
    interfaces::{IChainlinkAggregator, IERC20Metadata, IMarketRegistry},
};

pub const UNKNOWN_MARKET: &str = "(Unknown)";

/// `eth_call` with a typed binding.
pub(crate) async fn call_typed<C: SolCall>(
    chain: &dyn ChainReader,
    to: Address,
    call: C,
) -> Result<C::Return, ChainError> {
    let out = chain.call(to, call.abi_encode().into()).await?;
    C::abi_decode_returns(&out, true).map_err(|_| ChainError::MalformedReturn { target: to })
}

#[derive(Clone, Debug, Default)]
pub struct NameCache {
    token_labels: HashMap<Address, String>,
    feed_labels: HashMap<Address, String>,
    decimals: HashMap<Address, u8>,
    market_tokens: HashMap<U256, Address>,
    num_markets: Option<U256>,
}

impl NameCache {
    /// Cached symbol label of `token`; `Some("")` when it has no readable symbol.
    pub fn token_label(&self, token: Address) -> Option<&str> {
        self.token_labels.get(&token).map(String::as_str)
    }

    pub fn feed_label(&self, feed: Address) -> Option<&str> {
        self.feed_labels.get(&feed).map(String::as_str)
    }

    pub fn decimals(&self, token: Address) -> Option<u8> {
        self.decimals.get(&token).copied()
    }
}

/// Resolves addresses and market ids to labels such as `(USDC)` or `(DolomiteMargin)`.
///
/// Labels are already parenthesised; an empty label means nothing could be resolved.
#[derive(Clone, Debug)]
pub struct AddressNameResolver {
    chain_id: u64,
    protocol: Address,
    deployments: DeploymentBook,
    cache: NameCache,
    last_decimals: Option<u8>,
}

impl AddressNameResolver {
    pub fn new(chain_id: u64, protocol: Address, deployments: DeploymentBook) -> Self {
        Self {
            chain_id,
            protocol,
            deployments,
            cache: NameCache::default(),
            last_decimals: None,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn deployments(&self) -> &DeploymentBook {
        &self.deployments
    }

    pub fn cache(&self) -> &NameCache {
        &self.cache
    }

    /// Decimals of the token most recently resolved since the last reset.
    pub fn last_decimals(&self) -> Option<u8> {
        self.last_decimals
    }

    pub fn reset_decimals(&mut self) {
        self.last_decimals = None;
    }

    /// Symbol label of an ERC-20; empty when the token has no readable metadata.
    pub async fn resolve_token(&mut self, chain: &dyn ChainReader, token: Address) -> String {
        if let Some(label) = self.cache.token_labels.get(&token) {
            if let Some(decimals) = self.cache.decimals.get(&token) {
                self.last_decimals = Some(*decimals);
            }
            return label.clone();
        }

        let label = match call_typed(chain, token, IERC20Metadata::symbolCall {}).await {
            Ok(symbol) => format!("({})", symbol._0),
            Err(err) => {
                debug!(%token, %err, "no symbol for address");
                String::new()
            }
        };
        match call_typed(chain, token, IERC20Metadata::decimalsCall {}).await {
            Ok(decimals) => {
                self.cache.decimals.insert(token, decimals._0);
                self.last_decimals = Some(decimals._0);
            }
            Err(err) if !label.is_empty() => {
                warn!(%token, %err, "token has a symbol but no readable decimals");
            }
            Err(_) => {}
        }

        self.cache.token_labels.insert(token, label.clone());
        label
    }

    /// Label of the token listed under `market_id`, or [`UNKNOWN_MARKET`] past the last market.
    pub async fn resolve_market(&mut self, chain: &dyn ChainReader, market_id: U256) -> String {
        let num_markets = match self.cache.num_markets {
            Some(n) => n,
            None => match call_typed(chain, self.protocol, IMarketRegistry::getNumMarketsCall {})
                .await
            {
                Ok(n) => {
                    self.cache.num_markets = Some(n._0);
                    n._0
                }
                Err(err) => {
                    warn!(protocol = %self.protocol, %err, "could not read the market count");
                    return String::new();
                }
            },
        };
        if market_id >= num_markets {
            return UNKNOWN_MARKET.to_string();
        }

        let token = match self.cache.market_tokens.get(&market_id) {
            Some(token) => *token,
            None => {
                let call = IMarketRegistry::getMarketTokenAddressCall { marketId: market_id };
                match call_typed(chain, self.protocol, call).await {
                    Ok(token) => {
                        self.cache.market_tokens.insert(market_id, token._0);
                        token._0
                    }
                    Err(err) => {
                        warn!(%market_id, %err, "could not read the market token");
                        return String::new();
                    }
                }
            }
        };
        self.resolve_token(chain, token).await
    }

    /// Description label of a Chainlink-style price feed, eg `(ETH / USD)`.
    pub async fn resolve_aggregator(&mut self, chain: &dyn ChainReader, feed: Address) -> String {
        if let Some(label) = self.cache.feed_labels.get(&feed) {
            return label.clone();
        }
        let label = match call_typed(chain, feed, IChainlinkAggregator::descriptionCall {}).await {
            Ok(description) => format!("({})", description._0),
            Err(err) => {
                warn!(%feed, %err, "price feed has no readable description");
                String::new()
            }
        };
        self.cache.feed_labels.insert(feed, label.clone());
        label
    }

    /// Deployment name of `address` on this chain, falling back to a token symbol.
    pub async fn resolve_generic(&mut self, chain: &dyn ChainReader, address: Address) -> String {
        if address.is_zero() {
            return String::new();
        }
        if let Some(name) = self.deployments.name_of(address, self.chain_id) {
            return format!("({name})");
        }
        self.resolve_token(chain, address).await
    }
}
