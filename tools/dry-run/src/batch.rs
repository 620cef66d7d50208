//! JSON batch files: the calls to encode and the read-only checks that must hold after them.
//!
//! ```json
//! {
//!   "name": "Enable liquidator",
//!   "contracts": { "DolomiteMargin": { "abi": "abis/IDolomiteMargin.json" } },
//!   "calls": [
//!     { "contract": "DolomiteMargin", "method": "ownerSetGlobalOperator", "args": ["0x..", "true"] }
//!   ],
//!   "invariants": [
//!     { "contract": "DolomiteMargin", "method": "getIsGlobalOperator", "args": ["0x.."], "expect": ["true"] }
//!   ]
//! }
//! ```
//!
//! ABI paths are relative to the batch file. A contract without an explicit `address` is looked up
//! in the deployment manifests by its key.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy_dyn_abi::{DynSolValue, FunctionExt, Specifier};
use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use governance_encoder::{
    formatter::raw_value, CallIntent, ChainReader, ContractInterface, DeploymentBook,
    EncodedTransaction, GovernanceEncoder, GovernanceError, GovernanceScript, InvariantViolation,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct BatchFile {
    name: String,
    #[serde(default)]
    description: String,
    contracts: BTreeMap<String, ContractSource>,
    calls: Vec<CallSpec>,
    #[serde(default)]
    invariants: Vec<CheckSpec>,
}

#[derive(Debug, Deserialize)]
struct ContractSource {
    abi: PathBuf,
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct CallSpec {
    contract: String,
    method: String,
    #[serde(default)]
    args: Vec<String>,
    /// Wei, decimal or `0x` hex.
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckSpec {
    contract: String,
    method: String,
    #[serde(default)]
    args: Vec<String>,
    expect: Vec<String>,
}

/// A view call whose decoded outputs must equal `expect`.
#[derive(Debug)]
struct InvariantCheck {
    intent: CallIntent,
    expect: Vec<DynSolValue>,
}

/// A governance script read from a batch file.
#[derive(Debug)]
pub struct BatchScript {
    name: String,
    description: String,
    calls: Vec<CallIntent>,
    checks: Vec<InvariantCheck>,
}

impl BatchScript {
    pub fn load(path: &Path, deployments: &DeploymentBook, chain_id: u64) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading batch {}", path.display()))?;
        let file: BatchFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing batch {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut contracts = BTreeMap::new();
        for (key, source) in &file.contracts {
            let address = match source.address {
                Some(address) => address,
                None => deployments.address_of(key, chain_id).ok_or_else(|| {
                    anyhow!("no address for `{key}` on chain {chain_id}; add one to the batch or a deployments file")
                })?,
            };
            let abi_path = base.join(&source.abi);
            let artifact = fs::read_to_string(&abi_path)
                .with_context(|| format!("failed reading ABI {}", abi_path.display()))?;
            contracts.insert(
                key.clone(),
                ContractInterface::from_artifact(key.clone(), address, &artifact)?,
            );
        }
        let contract = |key: &str| {
            contracts
                .get(key)
                .ok_or_else(|| anyhow!("batch references undeclared contract `{key}`"))
        };

        let mut calls = Vec::with_capacity(file.calls.len());
        for call in &file.calls {
            let mut intent = contract(&call.contract)?.intent_from_strs(&call.method, &call.args)?;
            if let Some(value) = &call.value {
                let wei = U256::from_str(value)
                    .with_context(|| format!("invalid value `{value}` for {}.{}", call.contract, call.method))?;
                intent = intent.with_value(wei);
            }
            calls.push(intent);
        }

        let mut checks = Vec::with_capacity(file.invariants.len());
        for check in &file.invariants {
            let intent = contract(&check.contract)?.intent_from_strs(&check.method, &check.args)?;
            let outputs = &intent.function.outputs;
            if outputs.len() != check.expect.len() {
                return Err(anyhow!(
                    "{}.{} returns {} value(s) but {} are expected",
                    check.contract,
                    check.method,
                    outputs.len(),
                    check.expect.len()
                ));
            }
            let expect = outputs
                .iter()
                .zip(&check.expect)
                .map(|(param, text)| {
                    let ty = param.resolve()?;
                    Ok(ty.coerce_str(text)?)
                })
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("invalid expectation for {}.{}", check.contract, check.method))?;
            checks.push(InvariantCheck { intent, expect });
        }

        debug!(calls = calls.len(), checks = checks.len(), "loaded batch");
        Ok(Self {
            name: file.name,
            description: file.description,
            calls,
            checks,
        })
    }
}

#[async_trait(?Send)]
impl GovernanceScript for BatchScript {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    async fn transactions(
        &self,
        encoder: &mut GovernanceEncoder<'_>,
    ) -> Result<Vec<EncodedTransaction>, GovernanceError> {
        encoder.encode_all(&self.calls).await
    }

    async fn invariants(&self, chain: &dyn ChainReader) -> Result<(), InvariantViolation> {
        for check in &self.checks {
            let label = format!("{}.{}", check.intent.contract, check.intent.function.name);
            let query = check
                .intent
                .encode()
                .map_err(|e| InvariantViolation::new(format!("{label}: {e}")))?;
            let out = chain.call(query.to, query.data).await?;
            let actual = check
                .intent
                .function
                .abi_decode_output(&out, true)
                .map_err(|e| InvariantViolation::new(format!("{label}: undecodable return: {e}")))?;
            if actual != check.expect {
                let render = |values: &[DynSolValue]| {
                    values.iter().map(raw_value).collect::<Vec<_>>().join(", ")
                };
                return Err(InvariantViolation::new(format!(
                    "{label} returned ({}), expected ({})",
                    render(&actual),
                    render(&check.expect)
                )));
            }
        }
        Ok(())
    }
}
