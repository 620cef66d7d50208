//! Deployment manifests: `{ contractName: { chainId: { address, ... } } }` JSON files.

use std::{collections::BTreeMap, fs, path::Path};

use alloy_primitives::Address;
use serde::Deserialize;

use crate::errors::GovernanceError;

#[derive(Clone, Debug, Deserialize)]
pub struct DeploymentEntry {
    pub address: Address,
    #[serde(default)]
    pub transaction: Option<String>,
}

/// One deployment file, keyed by contract name then chain id.
pub type DeploymentFile = BTreeMap<String, BTreeMap<String, DeploymentEntry>>;

/// All loaded deployment files, in load order (core set first, then script outputs).
#[derive(Clone, Debug, Default)]
pub struct DeploymentBook {
    files: Vec<DeploymentFile>,
}

impl DeploymentBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<(), GovernanceError> {
        let raw = fs::read_to_string(path).map_err(|e| GovernanceError::InvalidFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.add_json(&raw).map_err(|e| GovernanceError::InvalidFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn add_json(&mut self, raw: &str) -> Result<(), serde_json::Error> {
        let file: DeploymentFile = serde_json::from_str(raw)?;
        self.files.push(file);
        Ok(())
    }

    /// Address of `name` on `chain_id`; later files override earlier ones.
    pub fn address_of(&self, name: &str, chain_id: u64) -> Option<Address> {
        let chain = chain_id.to_string();
        self.files
            .iter()
            .rev()
            .find_map(|f| f.get(name).and_then(|c| c.get(&chain)))
            .map(|e| e.address)
    }

    /// Name of the first current deployment on `chain_id` at `address`.
    ///
    /// Entries whose name a later file moved to another address are stale and skipped. Several
    /// current names can still share one address (eg an implementation registered twice); the
    /// first file in load order wins, and within a file the alphabetically first name.
    pub fn name_of(&self, address: Address, chain_id: u64) -> Option<&str> {
        let chain = chain_id.to_string();
        self.files.iter().find_map(|f| {
            f.iter()
                .find(|(name, chains)| {
                    chains.get(&chain).is_some_and(|e| e.address == address)
                        && self.address_of(name, chain_id) == Some(address)
                })
                .map(|(name, _)| name.as_str())
        })
    }
}
