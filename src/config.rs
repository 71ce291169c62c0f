use crate::events;
use crate::logging::LogLevel;
use crate::network::{self, Network};
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const DEFAULT_NETWORK: &str = "ethereum";
const DEFAULT_RESOLVE_DELAY_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub network: &'static Network,
    pub event_topic: B256,
    pub block_range: u64,
    pub rate_limit: Duration,
    pub resolve_delay: Duration,
    pub start_block: u64,
    /// `None` scans up to the latest block.
    pub end_block: Option<u64>,
    pub target_addresses: Vec<Address>,
    pub output_file: PathBuf,
    pub progress_dir: PathBuf,
    pub log_level: LogLevel,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network = network::lookup(&var("NETWORK").unwrap_or_else(|| DEFAULT_NETWORK.into()))?;

        let event_topic = match var("EVENT_TOPIC") {
            Some(topic) => B256::from_str(topic.trim()).context("Invalid EVENT_TOPIC format")?,
            None => events::default_topic(),
        };

        let block_range = parse_u64(var("BLOCK_RANGE"), "BLOCK_RANGE")?
            .unwrap_or(network.default_block_range);
        if block_range == 0 {
            anyhow::bail!("BLOCK_RANGE must be greater than zero");
        }

        let rate_limit = parse_u64(var("RATE_LIMIT_MS"), "RATE_LIMIT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(network.default_rate_limit);

        let resolve_delay = Duration::from_millis(
            parse_u64(var("RESOLVE_DELAY_MS"), "RESOLVE_DELAY_MS")?
                .unwrap_or(DEFAULT_RESOLVE_DELAY_MS),
        );

        let start_block = parse_u64(var("START_BLOCK"), "START_BLOCK")?.unwrap_or(0);
        // 0 keeps its historical meaning of "latest"
        let end_block = parse_u64(var("END_BLOCK"), "END_BLOCK")?.filter(|b| *b > 0);

        let mut target_addresses = Vec::new();
        if let Some(list) = var("TARGET_ADDRESSES") {
            for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                target_addresses.push(
                    Address::from_str(item)
                        .with_context(|| format!("Invalid address in TARGET_ADDRESSES: {item}"))?,
                );
            }
        }
        if let Some(file) = var("ADDRESS_FILE") {
            target_addresses.extend(load_addresses(Path::new(&file))?);
        }
        dedup_addresses(&mut target_addresses);

        let output_file = var("OUTPUT_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}_upgraded_transactions.csv", network.key)));

        let progress_dir = var("PROGRESS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let log_level = var("LOG_LEVEL")
            .as_deref()
            .map(LogLevel::from)
            .unwrap_or_default();

        Ok(Config {
            network,
            event_topic,
            block_range,
            rate_limit,
            resolve_delay,
            start_block,
            end_block,
            target_addresses,
            output_file,
            progress_dir,
            log_level,
        })
    }
}

fn parse_u64(value: Option<String>, name: &str) -> Result<Option<u64>> {
    value
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .with_context(|| format!("{name} must be a non-negative integer, got {v:?}"))
        })
        .transpose()
}

fn dedup_addresses(addresses: &mut Vec<Address>) {
    let mut seen = HashSet::new();
    addresses.retain(|a| seen.insert(*a));
}

/// Reads one address per line. Blank lines and lines starting with `#` or
/// `//` are skipped.
pub fn load_addresses(path: &Path) -> Result<Vec<Address>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read address file {}", path.display()))?;

    let addresses = parse_address_list(&contents)
        .with_context(|| format!("Invalid address file {}", path.display()))?;

    info!("Loaded {} addresses from {}", addresses.len(), path.display());
    Ok(addresses)
}

pub fn parse_address_list(contents: &str) -> Result<Vec<Address>> {
    contents
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#') && !line.starts_with("//"))
        .map(|(lineno, line)| {
            Address::from_str(line).with_context(|| format!("line {lineno}: invalid address {line}"))
        })
        .collect()
}
