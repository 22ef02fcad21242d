// Local record of issued verification tokens, keyed by guide id.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chaperone_core::GuideId;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRecord {
    pub guide_id: GuideId,
    #[serde(with = "as_string")]
    pub mint: Pubkey,
    /// Guide wallet holding the token
    #[serde(with = "as_string")]
    pub owner: Pubkey,
    pub metadata_uri: String,
    #[serde(with = "as_string")]
    pub signature: Signature,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    mints: BTreeMap<GuideId, MintRecord>,
}

/// JSON file of mint records. A missing file is an empty ledger.
pub struct MintLedger {
    path: PathBuf,
    records: BTreeMap<GuideId, MintRecord>,
}

impl MintLedger {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let records = match std::fs::read(&path) {
            Ok(raw) => {
                let file: LedgerFile =
                    serde_json::from_slice(&raw).map_err(|e| ledger_error(&path, e))?;
                file.mints
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ledger_error(&path, e)),
        };
        debug!(path = %path.display(), records = records.len(), "mint ledger loaded");
        Ok(Self { path, records })
    }

    pub fn get(&self, id: &GuideId) -> Option<&MintRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Inserts or replaces the record for its guide and writes the file.
    pub fn record(&mut self, record: MintRecord) -> Result<(), ClientError> {
        self.records.insert(record.guide_id, record);
        self.save()
    }

    /// Replaces the file atomically: write a sibling temp file, then rename.
    fn save(&self) -> Result<(), ClientError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| ledger_error(&self.path, e))?;

        let file = LedgerFile {
            mints: self.records.clone(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| ledger_error(&self.path, e))?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| ledger_error(&self.path, e))?;
        tmp.write_all(&json).map_err(|e| ledger_error(&self.path, e))?;
        tmp.as_file().sync_all().map_err(|e| ledger_error(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| ledger_error(&self.path, e.error))?;
        Ok(())
    }
}

fn ledger_error(path: &Path, err: impl std::fmt::Display) -> ClientError {
    ClientError::Ledger {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

mod as_string {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
