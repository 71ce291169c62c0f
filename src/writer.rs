use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 4] = [
    "Transaction Hash",
    "Explorer Link",
    "From Address",
    "Block Number",
];

pub const UNKNOWN_SENDER: &str = "Unknown";

/// One CSV row. Column order follows [`HEADER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateTransaction {
    pub transaction_hash: String,
    pub explorer_link: String,
    pub from_address: String,
    pub block_number: u64,
}

impl DuplicateTransaction {
    pub fn new(
        explorer_url: &str,
        transaction_hash: &B256,
        sender: Option<&Address>,
        block_number: u64,
    ) -> Self {
        let hash = format!("{transaction_hash:#x}");
        Self {
            explorer_link: explorer_link(explorer_url, &hash),
            transaction_hash: hash,
            from_address: sender
                .map(|a| format!("{a:#x}"))
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            block_number,
        }
    }
}

pub fn explorer_link(explorer_url: &str, tx_hash: &str) -> String {
    format!("{}/tx/{}", explorer_url.trim_end_matches('/'), tx_hash)
}

/// Append-only CSV sink. Re-running against the same file appends; rows are
/// not deduplicated across runs.
pub struct ResultWriter {
    writer: Writer<File>,
    path: PathBuf,
}

impl ResultWriter {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

        let is_empty = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len()
            == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_empty {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(ResultWriter {
            writer,
            path: path.to_path_buf(),
        })
    }

    /// Writes and flushes one row.
    pub fn append(&mut self, row: &DuplicateTransaction) -> Result<()> {
        self.writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", self.path.display()))?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
