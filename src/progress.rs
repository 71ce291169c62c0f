use crate::scan_id::ScanId;
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub address: Address,
    pub creation_block: u64,
    pub creation_tx: B256,
    pub processed: bool,
    #[serde(default)]
    pub logs_found: u64,
    #[serde(default)]
    pub duplicate_txs: u64,
}

impl ContractRecord {
    pub fn new(address: Address, creation_block: u64, creation_tx: B256) -> Self {
        Self {
            address,
            creation_block,
            creation_tx,
            processed: false,
            logs_found: 0,
            duplicate_txs: 0,
        }
    }

    /// Key used in [`ScanProgress::addresses`]: lowercase `0x` hex.
    pub fn key(&self) -> String {
        format!("{:#x}", self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub scan_id: String,
    pub network: String,
    pub event_topic: B256,
    #[serde(default)]
    pub start_block: u64,
    #[serde(default)]
    pub end_block: Option<u64>,
    #[serde(default)]
    pub addresses: HashMap<String, ContractRecord>,
    /// Next block of an all-addresses sweep; unused for targeted scans.
    #[serde(default)]
    pub sweep_cursor: Option<u64>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub total_logs: u64,
    #[serde(default)]
    pub duplicate_txs: u64,
    #[serde(default)]
    pub processed_txs: u64,
}

impl ScanProgress {
    pub fn new(
        scan_id: &ScanId,
        network: &str,
        event_topic: B256,
        start_block: u64,
        end_block: Option<u64>,
        addresses: HashMap<String, ContractRecord>,
    ) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            network: network.to_string(),
            event_topic,
            start_block,
            end_block,
            addresses,
            sweep_cursor: None,
            last_updated: Utc::now(),
            total_logs: 0,
            duplicate_txs: 0,
            processed_txs: 0,
        }
    }

    pub fn processed_count(&self) -> usize {
        self.addresses.values().filter(|r| r.processed).count()
    }
}

/// Progress files live side by side in one directory, one file per scan id.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, scan_id: &ScanId) -> PathBuf {
        self.dir.join(scan_id.file_name())
    }

    /// `None` means there is nothing to resume: the file is missing, unreadable
    /// or does not hold a scan.
    pub fn load(&self, scan_id: &ScanId) -> Option<ScanProgress> {
        Self::read_file(&self.path_for(scan_id))
    }

    fn read_file(path: &Path) -> Option<ScanProgress> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("No progress at {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<ScanProgress>(&contents) {
            Ok(progress) if !progress.scan_id.is_empty() => Some(progress),
            Ok(_) => {
                error!("Progress file {} has no scan id, ignoring", path.display());
                None
            }
            Err(e) => {
                error!("Could not decode progress file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Stamps `last_updated` and replaces the file through a rename.
    pub fn save(&self, progress: &mut ScanProgress) -> Result<()> {
        progress.last_updated = Utc::now();

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.path_for(&ScanId::from_raw(progress.scan_id.clone()));
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(progress).context("Failed to encode progress")?;

        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!("Saved progress to {}", path.display());
        Ok(())
    }

    /// Returns `false` when there was no file to remove.
    pub fn remove(&self, scan_id: &ScanId) -> Result<bool> {
        let path = self.path_for(scan_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    fn progress_files(&self) -> Result<Vec<(ScanId, PathBuf)>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", self.dir.display()));
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(ScanId::from_file_name) {
                files.push((id, entry.path()));
            }
        }
        files.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        Ok(files)
    }

    /// Every readable scan in the directory.
    pub fn list(&self) -> Result<Vec<(PathBuf, ScanProgress)>> {
        Ok(self
            .progress_files()?
            .into_iter()
            .filter_map(|(_, path)| Self::read_file(&path).map(|p| (path, p)))
            .collect())
    }

    /// First scan id (in sorted order) starting with `prefix`.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<Option<ScanId>> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Ok(None);
        }
        Ok(self
            .progress_files()?
            .into_iter()
            .map(|(id, _)| id)
            .find(|id| id.as_str().starts_with(&prefix)))
    }

    /// Deletes progress files last modified more than `age` ago and returns their paths.
    pub fn remove_older_than(&self, age: Duration) -> Result<Vec<PathBuf>> {
        let cutoff = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = Vec::new();
        for (_, path) in self.progress_files()? {
            let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            if modified <= cutoff {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed.push(path),
                    Err(e) => error!("Error removing old scan file {}: {}", path.display(), e),
                }
            }
        }
        Ok(removed)
    }
}
