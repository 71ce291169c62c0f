use crate::explorer::{AddressInfo, Explorer, Implementation, LogEvent, LogQuery, TransactionLog};
use alloy_primitives::{Address, B256};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    latest_block: Option<u64>,
    addresses: HashMap<Address, AddressInfo>,
    tx_blocks: HashMap<B256, u64>,
    senders: HashMap<B256, Address>,
    logs: Vec<LogEvent>,
    failing_chunks: HashSet<u64>,
    calls: Vec<&'static str>,
    resolved: Vec<Address>,
    log_queries: Vec<(u64, u64, Vec<Address>)>,
    watched_file: Option<PathBuf>,
    file_snapshots: Vec<Option<String>>,
}

/// In-memory explorer for tests.
#[derive(Default)]
pub struct MockExplorer {
    state: Mutex<State>,
}

impl MockExplorer {
    pub fn new(latest_block: u64) -> Self {
        let explorer = Self::default();
        explorer.state.lock().unwrap().latest_block = Some(latest_block);
        explorer
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn add_address_info(&self, address: Address, info: AddressInfo) {
        self.state.lock().unwrap().addresses.insert(address, info);
    }

    pub fn add_proxy(&self, address: Address, creation_tx: B256, creation_block: u64) {
        self.add_address_info(
            address,
            AddressInfo {
                is_contract: true,
                creation_transaction_hash: Some(format!("{creation_tx:#x}")),
                proxy_type: Some("eip1967".into()),
                implementations: Some(vec![Implementation {
                    address: Some(format!("{:#x}", Address::repeat_byte(0xee))),
                }]),
                ..Default::default()
            },
        );
        self.state
            .lock()
            .unwrap()
            .tx_blocks
            .insert(creation_tx, creation_block);
    }

    pub fn add_eoa(&self, address: Address) {
        self.add_address_info(address, AddressInfo::default());
    }

    pub fn add_plain_contract(&self, address: Address) {
        self.add_address_info(
            address,
            AddressInfo {
                is_contract: true,
                creation_transaction_hash: Some(format!("{:#x}", B256::repeat_byte(0x99))),
                proxy_type: None,
                implementations: Some(vec![]),
                ..Default::default()
            },
        );
    }

    pub fn add_log(&self, log: LogEvent) {
        self.state.lock().unwrap().logs.push(log);
    }

    pub fn set_sender(&self, tx: B256, sender: Address) {
        self.state.lock().unwrap().senders.insert(tx, sender);
    }

    /// `getLogs` fails for the chunk starting at `from_block`.
    pub fn fail_chunk(&self, from_block: u64) {
        self.state.lock().unwrap().failing_chunks.insert(from_block);
    }

    pub fn calls(&self, method: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.calls.iter().filter(|c| **c == method).count()
    }

    /// Addresses looked up through `address_info`, in call order.
    pub fn resolved(&self) -> Vec<Address> {
        self.state.lock().unwrap().resolved.clone()
    }

    pub fn log_queries(&self) -> Vec<(u64, u64, Vec<Address>)> {
        self.state.lock().unwrap().log_queries.clone()
    }

    /// Reads `path` at the start of every `get_logs` call.
    pub fn watch_file(&self, path: PathBuf) {
        self.state.lock().unwrap().watched_file = Some(path);
    }

    /// Contents of the watched file as seen by each `get_logs` call, `None` if absent.
    pub fn file_snapshots(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().file_snapshots.clone()
    }

    fn record(&self, method: &'static str) {
        self.state.lock().unwrap().calls.push(method);
    }
}

#[async_trait]
impl Explorer for MockExplorer {
    async fn address_info(&self, address: &Address) -> Result<AddressInfo> {
        self.record("address_info");
        let mut state = self.state.lock().unwrap();
        state.resolved.push(*address);
        state
            .addresses
            .get(address)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("API returned status 404"))
    }

    async fn transaction_block(&self, tx_hash: &B256) -> Result<u64> {
        self.record("transaction_block");
        let state = self.state.lock().unwrap();
        state
            .tx_blocks
            .get(tx_hash)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("API returned status 404"))
    }

    async fn latest_block(&self) -> Result<u64> {
        self.record("latest_block");
        self.state
            .lock()
            .unwrap()
            .latest_block
            .ok_or_else(|| anyhow::anyhow!("explorer unreachable"))
    }

    async fn get_logs(&self, query: &LogQuery<'_>) -> Result<Vec<LogEvent>> {
        self.record("get_logs");
        let mut state = self.state.lock().unwrap();
        state
            .log_queries
            .push((query.from_block, query.to_block, query.addresses.to_vec()));
        if let Some(path) = state.watched_file.clone() {
            let snapshot = std::fs::read_to_string(path).ok();
            state.file_snapshots.push(snapshot);
        }

        if state.failing_chunks.contains(&query.from_block) {
            anyhow::bail!("API returned status 502");
        }

        Ok(state
            .logs
            .iter()
            .filter(|l| (query.from_block..=query.to_block).contains(&l.block_number))
            .filter(|l| query.addresses.is_empty() || query.addresses.contains(&l.address))
            .cloned()
            .collect())
    }

    async fn transaction_sender(&self, tx_hash: &B256) -> Result<Address> {
        self.record("transaction_sender");
        let state = self.state.lock().unwrap();
        state
            .senders
            .get(tx_hash)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("transaction not found"))
    }

    async fn block_transactions(&self, _block_number: u64) -> Result<Vec<B256>> {
        self.record("block_transactions");
        anyhow::bail!("API returned status 404")
    }

    async fn transaction_logs(&self, _tx_hash: &B256) -> Result<Vec<TransactionLog>> {
        self.record("transaction_logs");
        anyhow::bail!("API returned status 404")
    }
}
