//! Classifying the protocol's current owner against the known controller contracts.

use std::{collections::BTreeMap, fs, path::Path};

use alloy_primitives::Address;
use governance_types::{ChainReader, ControllerKind, OwnershipTopology};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    deployments::DeploymentBook, errors::GovernanceError, interfaces::IProtocolOwnable,
    resolver::call_typed,
};

/// Known controllers for one chain, plus the plain signers allowed to own the protocol directly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerRegistry {
    #[serde(default)]
    pub owner_adapter_v1: Vec<Address>,
    #[serde(default)]
    pub owner_adapter_v2: Vec<Address>,
    #[serde(default)]
    pub delayed_multi_sig: Vec<Address>,
    #[serde(default)]
    pub gnosis_safe: Vec<Address>,
    #[serde(default)]
    pub direct_signers: Vec<Address>,
}

impl ControllerRegistry {
    /// Registry built from the canonical controller deployment names.
    pub fn from_deployments(book: &DeploymentBook, chain_id: u64) -> Self {
        let mut registry = Self::default();
        for kind in ControllerKind::PRECEDENCE {
            if let Some(address) = kind
                .deployment_name()
                .and_then(|name| book.address_of(name, chain_id))
            {
                registry.addresses_mut(kind).push(address);
            }
        }
        registry
    }

    /// Load the registry for `chain_id` from a `{ "<chainId>": { ... } }` JSON file.
    pub fn from_json_file(path: &Path, chain_id: u64) -> Result<Self, GovernanceError> {
        let invalid = |message: String| GovernanceError::InvalidFile {
            path: path.to_path_buf(),
            message,
        };
        let raw = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let mut by_chain: BTreeMap<String, ControllerRegistry> =
            serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;
        by_chain
            .remove(&chain_id.to_string())
            .ok_or_else(|| invalid(format!("no controllers for chain {chain_id}")))
    }

    pub fn with(mut self, kind: ControllerKind, address: Address) -> Self {
        self.addresses_mut(kind).push(address);
        self
    }

    /// Merge `other` into `self`, keeping entries of both.
    pub fn extend(&mut self, other: ControllerRegistry) {
        for kind in ControllerKind::PRECEDENCE {
            let incoming = other.addresses(kind).to_vec();
            let existing = self.addresses_mut(kind);
            for address in incoming {
                if !existing.contains(&address) {
                    existing.push(address);
                }
            }
        }
    }

    pub fn addresses(&self, kind: ControllerKind) -> &[Address] {
        match kind {
            ControllerKind::OwnerAdapterV1 => &self.owner_adapter_v1,
            ControllerKind::OwnerAdapterV2 => &self.owner_adapter_v2,
            ControllerKind::DelayedMultiSig => &self.delayed_multi_sig,
            ControllerKind::GnosisSafe => &self.gnosis_safe,
            ControllerKind::DirectOwner => &self.direct_signers,
        }
    }

    fn addresses_mut(&mut self, kind: ControllerKind) -> &mut Vec<Address> {
        match kind {
            ControllerKind::OwnerAdapterV1 => &mut self.owner_adapter_v1,
            ControllerKind::OwnerAdapterV2 => &mut self.owner_adapter_v2,
            ControllerKind::DelayedMultiSig => &mut self.delayed_multi_sig,
            ControllerKind::GnosisSafe => &mut self.gnosis_safe,
            ControllerKind::DirectOwner => &mut self.direct_signers,
        }
    }

    /// First controller kind, in precedence order, that lists `owner`.
    pub fn classify(&self, owner: Address) -> Option<ControllerKind> {
        ControllerKind::PRECEDENCE
            .into_iter()
            .find(|kind| self.addresses(*kind).contains(&owner))
    }
}

/// Resolves the protocol's ownership topology once and serves it from cache afterwards.
#[derive(Clone, Debug)]
pub struct OwnershipTopologyResolver {
    registry: ControllerRegistry,
    resolved: Option<(Address, OwnershipTopology)>,
}

impl OwnershipTopologyResolver {
    pub fn new(registry: ControllerRegistry) -> Self {
        Self {
            registry,
            resolved: None,
        }
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub async fn resolve(
        &mut self,
        chain: &dyn ChainReader,
        protocol: Address,
    ) -> Result<OwnershipTopology, GovernanceError> {
        if let Some((cached_for, topology)) = self.resolved {
            if cached_for == protocol {
                debug!(%topology, "ownership topology served from cache");
                return Ok(topology);
            }
        }

        let owner = call_typed(chain, protocol, IProtocolOwnable::ownerCall {})
            .await?
            ._0;
        let kind = self
            .registry
            .classify(owner)
            .ok_or(GovernanceError::UnknownOwner { owner })?;
        let topology = OwnershipTopology::new(kind, owner);

        info!(%protocol, %topology, "resolved ownership topology");
        self.resolved = Some((protocol, topology));
        Ok(topology)
    }
}
