use crate::config::Config;
use crate::explorer::Explorer;
use crate::inspect;
use crate::logs::{BlockChunk, BlockChunks, DuplicateGroup, scan_chunk};
use crate::progress::{ProgressStore, ScanProgress};
use crate::resolver::resolve_all;
use crate::scan_id::ScanId;
use crate::writer::{DuplicateTransaction, ResultWriter};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info};

/// getLogs calls slower than this double the following pause.
const SLOW_RESPONSE_THRESHOLD: Duration = Duration::from_millis(500);

pub fn chunk_delay(api_time: Duration, rate_limit: Duration) -> Duration {
    if api_time > SLOW_RESPONSE_THRESHOLD {
        rate_limit * 2
    } else {
        rate_limit
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ApiStats {
    calls: u64,
    total: Duration,
}

impl ApiStats {
    fn record(&mut self, elapsed: Duration) {
        self.calls += 1;
        self.total += elapsed;
    }

    fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ChunkTotals {
    logs: u64,
    duplicates: u64,
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub scan_id: ScanId,
    pub progress_file: PathBuf,
    /// State as of the last checkpoint, before the file was removed.
    pub progress: ScanProgress,
    pub api_calls: u64,
    pub avg_api_time: Duration,
    pub elapsed: Duration,
}

pub struct Scanner<E> {
    explorer: E,
    config: Config,
    store: ProgressStore,
    writer: ResultWriter,
    stats: ApiStats,
}

impl<E: Explorer> Scanner<E> {
    pub fn new(explorer: E, config: Config, writer: ResultWriter) -> Self {
        let store = ProgressStore::new(&config.progress_dir);
        Scanner {
            explorer,
            config,
            store,
            writer,
            stats: ApiStats::default(),
        }
    }

    pub async fn run(&mut self) -> Result<ScanSummary> {
        let started = Instant::now();
        let scan_id = ScanId::from_config(&self.config);
        let progress_file = self.store.path_for(&scan_id);

        info!(
            "Starting scan for events {:#x} on {} (scan id {})",
            self.config.event_topic, self.config.network.name, scan_id
        );

        let latest_block = self
            .explorer
            .latest_block()
            .await
            .context("Failed to get latest block number")?;
        let end_block = self.config.end_block.unwrap_or(latest_block);

        let mut progress = match self.store.load(&scan_id) {
            Some(progress) => {
                info!(
                    "Resuming scan: {}/{} addresses completed, {} logs and {} duplicate transactions so far",
                    progress.processed_count(),
                    progress.addresses.len(),
                    progress.total_logs,
                    progress.duplicate_txs
                );
                progress
            }
            None => self.start_fresh(&scan_id).await,
        };

        info!(
            "Scanning up to block {} (latest: {}), progress file {}",
            end_block,
            latest_block,
            progress_file.display()
        );

        if self.config.target_addresses.is_empty() {
            self.sweep(&mut progress, end_block).await?;
        } else {
            self.scan_addresses(&mut progress, end_block).await?;
        }

        match self.store.remove(&scan_id) {
            Ok(_) => info!("Progress file {} removed (scan completed)", progress_file.display()),
            Err(e) => error!("Could not remove progress file: {:#}", e),
        }

        let summary = ScanSummary {
            scan_id,
            progress_file,
            progress,
            api_calls: self.stats.calls,
            avg_api_time: self.stats.average(),
            elapsed: started.elapsed(),
        };

        info!(
            "Scan complete: {} logs, {} transactions with 2+ events, {} API calls (avg {:?}) in {:?}",
            summary.progress.total_logs,
            summary.progress.duplicate_txs,
            summary.api_calls,
            summary.avg_api_time,
            summary.elapsed
        );
        info!("Results saved to {}", self.writer.path().display());

        Ok(summary)
    }

    async fn start_fresh(&mut self, scan_id: &ScanId) -> ScanProgress {
        let addresses = if self.config.target_addresses.is_empty() {
            info!("No target addresses configured, sweeping every address");
            Default::default()
        } else {
            resolve_all(
                &self.explorer,
                &self.config.target_addresses,
                self.config.resolve_delay,
            )
            .await
        };

        let mut progress = ScanProgress::new(
            scan_id,
            self.config.network.key,
            self.config.event_topic,
            self.config.start_block,
            self.config.end_block,
            addresses,
        );
        info!(
            "Starting fresh scan: {} of {} target addresses are proxy contracts",
            progress.addresses.len(),
            self.config.target_addresses.len()
        );
        self.checkpoint(&mut progress);
        progress
    }

    async fn scan_addresses(&mut self, progress: &mut ScanProgress, end_block: u64) -> Result<()> {
        // sorted only so that log output is stable between runs
        let mut keys: Vec<String> = progress.addresses.keys().cloned().collect();
        keys.sort();

        let total = keys.len();
        let mut completed = progress.processed_count();
        let mut completed_this_run = 0u32;
        let loop_start = Instant::now();

        info!(
            "Starting address scan: {} addresses total, {} already completed",
            total, completed
        );

        for (i, key) in keys.iter().enumerate() {
            let Some(record) = progress.addresses.get(key).cloned() else {
                continue;
            };

            if record.processed {
                debug!("Skipping already processed address {}/{}: {}", i + 1, total, key);
                continue;
            }

            let start_block = if record.creation_block > 0 {
                record.creation_block
            } else {
                self.config.start_block
            };

            info!(
                "Scanning address {}/{} ({} remaining): {} from block {}",
                i + 1,
                total,
                total - completed,
                key,
                start_block
            );

            let filter = [record.address];
            let mut totals = ChunkTotals::default();
            for chunk in BlockChunks::new(start_block, end_block, self.config.block_range) {
                let chunk_totals = self.process_chunk(progress, &filter, chunk).await?;
                totals.logs += chunk_totals.logs;
                totals.duplicates += chunk_totals.duplicates;
            }

            if let Some(entry) = progress.addresses.get_mut(key) {
                entry.processed = true;
                entry.logs_found = totals.logs;
                entry.duplicate_txs = totals.duplicates;
            }
            self.checkpoint(progress);

            completed += 1;
            completed_this_run += 1;
            let remaining = total - completed;
            info!(
                "Address {} complete: {} logs, {} duplicate transactions",
                key, totals.logs, totals.duplicates
            );
            info!(
                "Overall progress: {}/{} ({:.1}%) | Remaining: {} addresses",
                completed,
                total,
                completed as f64 / total as f64 * 100.0,
                remaining
            );

            if remaining > 0 {
                let per_address = loop_start.elapsed() / completed_this_run;
                info!(
                    "Estimated time remaining: {:?} (avg {:?} per address)",
                    per_address * remaining as u32,
                    per_address
                );
            }
        }

        Ok(())
    }

    /// No address filter; checkpoints after every chunk through `sweep_cursor`.
    async fn sweep(&mut self, progress: &mut ScanProgress, end_block: u64) -> Result<()> {
        let start_block = progress.sweep_cursor.unwrap_or(self.config.start_block);
        info!("Sweeping blocks {} to {}", start_block, end_block);

        for chunk in BlockChunks::new(start_block, end_block, self.config.block_range) {
            self.process_chunk(progress, &[], chunk).await?;
            progress.sweep_cursor = Some(chunk.to.saturating_add(1));
            self.checkpoint(progress);
        }

        Ok(())
    }

    async fn process_chunk(
        &mut self,
        progress: &mut ScanProgress,
        filter: &[Address],
        chunk: BlockChunk,
    ) -> Result<ChunkTotals> {
        if self.config.log_level.is_debug() {
            inspect::dump_chunk(&self.explorer, chunk).await;
        }

        debug!("Scanning blocks {} to {}", chunk.from, chunk.to);

        let api_start = Instant::now();
        let result = scan_chunk(&self.explorer, self.config.event_topic, chunk, filter).await;
        let api_time = api_start.elapsed();
        self.stats.record(api_time);

        let mut totals = ChunkTotals::default();
        match result {
            Ok(outcome) => {
                totals.logs = outcome.log_count as u64;
                progress.total_logs += totals.logs;

                for group in &outcome.duplicates {
                    self.record_duplicate(progress, group).await?;
                    totals.duplicates += 1;
                }

                debug!(
                    "Blocks {}-{}: {} logs, {} duplicate txs (avg API: {:?})",
                    chunk.from,
                    chunk.to,
                    totals.logs,
                    totals.duplicates,
                    self.stats.average()
                );
            }
            Err(e) => {
                error!(
                    "Error fetching logs for blocks {}-{}: {:#}",
                    chunk.from, chunk.to, e
                );
            }
        }

        sleep(chunk_delay(api_time, self.config.rate_limit)).await;
        Ok(totals)
    }

    async fn record_duplicate(
        &mut self,
        progress: &mut ScanProgress,
        group: &DuplicateGroup,
    ) -> Result<()> {
        progress.duplicate_txs += 1;

        debug!(
            "Duplicate found: transaction {:#x} has {} matching events",
            group.transaction_hash,
            group.events.len()
        );
        for (i, event) in group.events.iter().enumerate() {
            debug!(
                "  Event {}: block={}, address={:#x}",
                i + 1,
                event.block_number,
                event.address
            );
        }

        let sender = match self.explorer.transaction_sender(&group.transaction_hash).await {
            Ok(sender) => Some(sender),
            Err(e) => {
                error!(
                    "Error getting transaction details for {:#x}: {:#}",
                    group.transaction_hash, e
                );
                None
            }
        };

        let row = DuplicateTransaction::new(
            self.config.network.explorer_url,
            &group.transaction_hash,
            sender.as_ref(),
            group.block_number,
        );
        self.writer.append(&row)?;
        progress.processed_txs += 1;

        sleep(self.config.rate_limit).await;
        Ok(())
    }

    fn checkpoint(&self, progress: &mut ScanProgress) {
        if let Err(e) = self.store.save(progress) {
            error!("Could not save progress: {:#}", e);
        }
    }
}
