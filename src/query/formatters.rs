use crate::progress::{ContractRecord, ScanProgress};
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }
}

fn status(record: &ContractRecord) -> &'static str {
    if record.processed {
        "completed"
    } else {
        "pending"
    }
}

fn sorted_records(progress: &ScanProgress) -> Vec<&ContractRecord> {
    let mut records: Vec<_> = progress.addresses.values().collect();
    records.sort_by_key(|r| r.key());
    records
}

fn scan_json(path: &Path, progress: &ScanProgress, details: bool) -> serde_json::Value {
    let addresses: Vec<_> = sorted_records(progress)
        .into_iter()
        .map(|r| {
            let mut entry = json!({
                "address": r.key(),
                "status": status(r),
                "creation_block": r.creation_block,
                "logs_found": r.logs_found,
                "duplicate_txs": r.duplicate_txs,
            });
            if details {
                entry["creation_tx"] = json!(format!("{:#x}", r.creation_tx));
            }
            entry
        })
        .collect();

    json!({
        "scan_id": progress.scan_id,
        "network": progress.network,
        "event_topic": format!("{:#x}", progress.event_topic),
        "start_block": progress.start_block,
        "end_block": progress.end_block,
        "target_addresses": progress.addresses.len(),
        "completed_addresses": progress.processed_count(),
        "sweep_cursor": progress.sweep_cursor,
        "total_logs": progress.total_logs,
        "duplicate_txs": progress.duplicate_txs,
        "processed_txs": progress.processed_txs,
        "last_updated": progress.last_updated.to_rfc3339(),
        "progress_file": path.display().to_string(),
        "addresses": addresses,
    })
}

pub fn format_scans(scans: &[(PathBuf, ScanProgress)], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_scans_table(scans),
        OutputFormat::Json => {
            let all: Vec<_> = scans
                .iter()
                .map(|(path, progress)| scan_json(path, progress, false))
                .collect();
            serde_json::to_string_pretty(&all).unwrap_or_else(|_| "[]".to_string())
        }
    }
}

fn format_scans_table(scans: &[(PathBuf, ScanProgress)]) -> String {
    if scans.is_empty() {
        return "No active scans found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            "Scan ID",
            "Network",
            "Event Topic",
            "Addresses",
            "Logs",
            "Duplicate Txs",
            "Processed Txs",
            "Last Updated",
        ]);

    for (_, progress) in scans {
        table.add_row(vec![
            Cell::new(&progress.scan_id),
            Cell::new(&progress.network),
            Cell::new(short_hash(&format!("{:#x}", progress.event_topic))),
            Cell::new(format!(
                "{}/{}",
                progress.processed_count(),
                progress.addresses.len()
            )),
            Cell::new(progress.total_logs),
            Cell::new(progress.duplicate_txs),
            Cell::new(progress.processed_txs),
            Cell::new(progress.last_updated.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }

    format!("Found {} active scan(s):\n{}", scans.len(), table)
}

pub fn format_scan_details(path: &Path, progress: &ScanProgress, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&scan_json(path, progress, true))
            .unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Table => {
            let mut summary = Table::new();
            summary
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec!["Metric", "Value"]);

            let end_block = progress
                .end_block
                .map_or("latest".to_string(), |b| b.to_string());
            let rows: Vec<(&str, String)> = vec![
                ("Scan ID", progress.scan_id.clone()),
                ("Network", progress.network.clone()),
                ("Event Topic", format!("{:#x}", progress.event_topic)),
                ("Block Range", format!("{} - {}", progress.start_block, end_block)),
                ("Target Addresses", progress.addresses.len().to_string()),
                ("Completed Addresses", progress.processed_count().to_string()),
                ("Total Logs Found", progress.total_logs.to_string()),
                ("Duplicate Transactions", progress.duplicate_txs.to_string()),
                ("Processed Transactions", progress.processed_txs.to_string()),
                (
                    "Last Updated",
                    progress
                        .last_updated
                        .format("%Y-%m-%d %H:%M:%S UTC")
                        .to_string(),
                ),
                ("Progress File", path.display().to_string()),
            ];
            for (metric, value) in rows {
                summary.add_row(vec![Cell::new(metric), Cell::new(value)]);
            }
            if let Some(cursor) = progress.sweep_cursor {
                summary.add_row(vec![Cell::new("Sweep Cursor"), Cell::new(cursor)]);
            }

            if progress.addresses.is_empty() {
                return summary.to_string();
            }

            let mut addresses = Table::new();
            addresses
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    "Address",
                    "Status",
                    "Creation Block",
                    "Creation Tx",
                    "Logs",
                    "Duplicate Txs",
                ]);
            for record in sorted_records(progress) {
                addresses.add_row(vec![
                    Cell::new(record.key()),
                    Cell::new(status(record)),
                    Cell::new(record.creation_block),
                    Cell::new(short_hash(&format!("{:#x}", record.creation_tx))),
                    Cell::new(record.logs_found),
                    Cell::new(record.duplicate_txs),
                ]);
            }

            format!("{summary}\n\nAddress Details:\n{addresses}")
        }
    }
}

fn short_hash(hash: &str) -> String {
    if hash.len() <= 12 {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..6], &hash[hash.len() - 4..])
}
