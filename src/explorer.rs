use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120); // 2 minutes timeout per request

/// Subset of `/api/v2/addresses/{address}` the resolver cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInfo {
    #[serde(default)]
    pub is_contract: bool,
    #[serde(default)]
    pub creation_transaction_hash: Option<String>,
    /// Older spelling, still sent next to the new one by some deployments.
    #[serde(default)]
    pub creation_tx_hash: Option<String>,
    #[serde(default)]
    pub proxy_type: Option<String>,
    #[serde(default)]
    pub implementations: Option<Vec<Implementation>>,
}

impl AddressInfo {
    /// Creation transaction hash, preferring `creation_transaction_hash`.
    pub fn creation_tx(&self) -> Option<&str> {
        self.creation_transaction_hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .or_else(|| self.creation_tx_hash.as_deref().map(str::trim))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Implementation {
    pub address: Option<String>,
}

/// A matching event returned by the legacy `getLogs` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct LogQuery<'a> {
    pub from_block: u64,
    pub to_block: u64,
    pub topic0: B256,
    pub addresses: &'a [Address],
}

/// Log entry from `/api/v2/transactions/{hash}/logs`, only used for debug output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionLog {
    #[serde(default)]
    pub address: Option<AddressRef>,
    #[serde(default)]
    pub topics: Vec<Option<String>>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub decoded: Option<DecodedLog>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressRef {
    pub hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecodedLog {
    pub method_call: String,
    #[serde(default)]
    pub parameters: Vec<DecodedParam>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecodedParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub indexed: Option<bool>,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Read-only view of a block explorer. One request per call, nothing cached.
#[async_trait]
pub trait Explorer: Send + Sync {
    async fn address_info(&self, address: &Address) -> Result<AddressInfo>;

    /// Block that included `tx_hash`.
    async fn transaction_block(&self, tx_hash: &B256) -> Result<u64>;

    async fn latest_block(&self) -> Result<u64>;

    async fn get_logs(&self, query: &LogQuery<'_>) -> Result<Vec<LogEvent>>;

    async fn transaction_sender(&self, tx_hash: &B256) -> Result<Address>;

    async fn block_transactions(&self, block_number: u64) -> Result<Vec<B256>>;

    async fn transaction_logs(&self, tx_hash: &B256) -> Result<Vec<TransactionLog>>;
}

#[derive(Clone)]
pub struct BlockscoutClient {
    http: reqwest::Client,
    base_url: String,
}

impl BlockscoutClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(BlockscoutClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, path_and_query: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("API returned status {}", status.as_u16());
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {url}"))?;
        debug!("GET {} -> {} bytes", url, body.len());
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let body = self.get_text(path_and_query).await?;
        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse response from {path_and_query}"))
    }
}

#[derive(Deserialize)]
struct TransactionInfo {
    #[serde(default)]
    block_number: Option<u64>,
    #[serde(default)]
    block: Option<u64>,
}

#[derive(Deserialize)]
struct Items<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct HashItem {
    hash: String,
}

#[derive(Deserialize)]
struct LegacyResponse<T> {
    #[serde(default)]
    message: Option<String>,
    result: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLogEntry {
    transaction_hash: String,
    block_number: String,
    address: String,
}

#[derive(Deserialize)]
struct RawTransaction {
    from: String,
}

#[async_trait]
impl Explorer for BlockscoutClient {
    async fn address_info(&self, address: &Address) -> Result<AddressInfo> {
        let body = self
            .get_text(&format!("/api/v2/addresses/{address:#x}"))
            .await?;
        debug!("Address API response for {:#x}: {}", address, body);
        serde_json::from_str(&body).context("Failed to parse address response")
    }

    async fn transaction_block(&self, tx_hash: &B256) -> Result<u64> {
        let info: TransactionInfo = self
            .get_json(&format!("/api/v2/transactions/{tx_hash:#x}"))
            .await?;
        match info.block_number.or(info.block) {
            Some(block) if block > 0 => Ok(block),
            other => anyhow::bail!("invalid block number: {:?}", other),
        }
    }

    async fn latest_block(&self) -> Result<u64> {
        let body = self
            .get_text("/api?module=block&action=eth_block_number")
            .await?;
        parse_block_number_response(&body)
    }

    async fn get_logs(&self, query: &LogQuery<'_>) -> Result<Vec<LogEvent>> {
        let response: LegacyResponse<Vec<RawLogEntry>> =
            self.get_json(&logs_path(query)).await?;

        let Some(entries) = response.result else {
            anyhow::bail!(
                "getLogs returned no result: {}",
                response.message.unwrap_or_default()
            );
        };

        entries
            .into_iter()
            .map(|raw| {
                Ok(LogEvent {
                    transaction_hash: B256::from_str(&raw.transaction_hash)
                        .with_context(|| format!("bad tx hash {}", raw.transaction_hash))?,
                    block_number: parse_quantity(&raw.block_number)?,
                    address: Address::from_str(&raw.address)
                        .with_context(|| format!("bad log address {}", raw.address))?,
                })
            })
            .collect()
    }

    async fn transaction_sender(&self, tx_hash: &B256) -> Result<Address> {
        let response: LegacyResponse<RawTransaction> = self
            .get_json(&format!(
                "/api?module=proxy&action=eth_getTransactionByHash&txhash={tx_hash:#x}"
            ))
            .await?;

        let tx = response
            .result
            .ok_or_else(|| anyhow::anyhow!("transaction {tx_hash:#x} not found"))?;
        Address::from_str(&tx.from).with_context(|| format!("bad sender address {}", tx.from))
    }

    async fn block_transactions(&self, block_number: u64) -> Result<Vec<B256>> {
        let response: Items<HashItem> = self
            .get_json(&format!("/api/v2/blocks/{block_number}/transactions"))
            .await?;

        response
            .items
            .into_iter()
            .map(|item| {
                B256::from_str(&item.hash).with_context(|| format!("bad tx hash {}", item.hash))
            })
            .collect()
    }

    async fn transaction_logs(&self, tx_hash: &B256) -> Result<Vec<TransactionLog>> {
        let response: Items<TransactionLog> = self
            .get_json(&format!("/api/v2/transactions/{tx_hash:#x}/logs"))
            .await?;
        Ok(response.items)
    }
}

pub fn logs_path(query: &LogQuery<'_>) -> String {
    let mut path = format!(
        "/api?module=logs&action=getLogs&fromBlock={}&toBlock={}&topic0={:#x}",
        query.from_block, query.to_block, query.topic0
    );

    if !query.addresses.is_empty() {
        let list: Vec<String> = query.addresses.iter().map(|a| format!("{a:#x}")).collect();
        path.push_str("&address=");
        path.push_str(&list.join(","));
    }

    path
}

/// Accepts `0x`-prefixed hex or plain decimal.
pub fn parse_quantity(value: &str) -> Result<u64> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16)
            .with_context(|| format!("invalid hex quantity: {value}")),
        None => value
            .parse()
            .with_context(|| format!("invalid quantity: {value}")),
    }
}

#[derive(Deserialize)]
struct JsonRpcBlockNumber {
    result: String,
}

#[derive(Deserialize)]
struct RestBlockNumber {
    result: RestBlock,
}

#[derive(Deserialize)]
struct RestBlock {
    number: String,
}

/// The block-number endpoint answers either JSON-RPC style (`"result": "0x.."`)
/// or REST style (`"result": {"number": "0x.."}`). JSON-RPC is tried first.
pub fn parse_block_number_response(body: &str) -> Result<u64> {
    if let Ok(rpc) = serde_json::from_str::<JsonRpcBlockNumber>(body) {
        if !rpc.result.is_empty() {
            return parse_quantity(&rpc.result);
        }
    }

    let rest: RestBlockNumber =
        serde_json::from_str(body).context("Unrecognized block number response")?;
    if rest.result.number.len() < 2 {
        anyhow::bail!("invalid block number format: {}", rest.result.number);
    }
    parse_quantity(&rest.result.number)
}
