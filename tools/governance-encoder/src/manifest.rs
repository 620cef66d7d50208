//! The upload manifest: a transaction batch in the Safe transaction-builder import format.
//!
//! Field names and shapes are a compatibility surface with the signing UI; changing them
//! requires bumping [`MANIFEST_VERSION`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use governance_types::EncodedTransaction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::{Digest, Keccak256};
use time::OffsetDateTime;

pub const MANIFEST_VERSION: &str = "1.0";
pub const TX_BUILDER_VERSION: &str = "1.16.5";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed serialising upload manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestTransaction {
    pub to: String,
    pub value: String,
    pub data: String,
}

impl From<&EncodedTransaction> for ManifestTransaction {
    fn from(tx: &EncodedTransaction) -> Self {
        Self {
            to: tx.to.to_checksum(None),
            value: tx.value.to_string(),
            data: format!("0x{}", hex::encode(&tx.data)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tx_builder_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadManifest {
    pub version: String,
    pub chain_id: String,
    pub created_at: u64,
    pub meta: ManifestMeta,
    pub transactions: Vec<ManifestTransaction>,
}

impl UploadManifest {
    pub fn new(chain_id: u64, name: &str, transactions: &[EncodedTransaction]) -> Self {
        let created_at = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;
        Self {
            version: MANIFEST_VERSION.to_string(),
            chain_id: chain_id.to_string(),
            created_at,
            meta: ManifestMeta {
                name: name.to_string(),
                description: String::new(),
                tx_builder_version: TX_BUILDER_VERSION.to_string(),
                checksum: None,
            },
            transactions: transactions.iter().map(ManifestTransaction::from).collect(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = description.into();
        self
    }

    pub fn with_created_at(mut self, created_at_ms: u64) -> Self {
        self.created_at = created_at_ms;
        self
    }

    /// Set `meta.checksum`; call after every other field is final.
    pub fn sealed(mut self) -> Result<Self, ManifestError> {
        self.meta.checksum = Some(self.compute_checksum()?);
        Ok(self)
    }

    /// Safe transaction-builder checksum: keccak256 over the key-sorted serialization of the
    /// batch with `meta.name` nulled and without the checksum itself.
    pub fn compute_checksum(&self) -> Result<String, ManifestError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(meta) = value.get_mut("meta").and_then(Value::as_object_mut) {
            meta.remove("checksum");
            meta.insert("name".to_string(), Value::Null);
        }
        let digest = checksum_digest(&serialize_sorted(&value));
        Ok(format!("0x{}", hex::encode(digest)))
    }

    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write via a sibling temp file and rename, so readers never see a partial manifest.
    pub fn write_atomic(&self, path: &Path) -> Result<(), ManifestError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let serialised = self.to_json_pretty()?;
        let tmp_path = tmp_path_for(path);
        fs::write(&tmp_path, serialised.as_bytes()).map_err(io_error(&tmp_path))?;
        fs::rename(&tmp_path, path).map_err(io_error(path))?;
        Ok(())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ManifestError {
    let path = path.to_path_buf();
    move |source| ManifestError::Io { path, source }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn checksum_digest(serialized: &str) -> [u8; 32] {
    Keccak256::digest(serialized.as_bytes()).into()
}

/// Serialization used by the Safe transaction builder for checksums: objects become
/// `{["k1","k2"]v1,v2,}` with sorted keys, arrays `[v1,v2]`, scalars plain JSON.
fn serialize_sorted(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(serialize_sorted).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut acc = String::from("{");
            acc.push_str(&Value::from(keys.iter().map(|k| k.as_str()).collect::<Vec<_>>()).to_string());
            for key in keys {
                acc.push_str(&serialize_sorted(&map[key.as_str()]));
                acc.push(',');
            }
            acc.push('}');
            acc
        }
        scalar => scalar.to_string(),
    }
}
