use crate::progress::ProgressStore;
use crate::query::formatters::{OutputFormat, format_scan_details, format_scans};
use crate::scan_id::ScanId;
use anyhow::Result;
use std::time::Duration;

pub fn cmd_list(store: &ProgressStore, format: &OutputFormat) -> Result<()> {
    let scans = store.list()?;
    println!("{}", format_scans(&scans, format));
    Ok(())
}

/// Accepts a full scan id or any unambiguous-enough prefix of one.
fn resolve_id(store: &ProgressStore, id_or_prefix: &str) -> Result<ScanId> {
    store
        .find_by_prefix(id_or_prefix)?
        .ok_or_else(|| anyhow::anyhow!("Scan ID {} not found", id_or_prefix))
}

pub fn cmd_show(store: &ProgressStore, id_or_prefix: &str, format: &OutputFormat) -> Result<()> {
    let scan_id = resolve_id(store, id_or_prefix)?;
    let progress = store
        .load(&scan_id)
        .ok_or_else(|| anyhow::anyhow!("Scan ID {} has no readable progress", scan_id))?;

    println!(
        "{}",
        format_scan_details(&store.path_for(&scan_id), &progress, format)
    );
    Ok(())
}

pub fn cmd_delete(store: &ProgressStore, id_or_prefix: &str) -> Result<()> {
    let scan_id = resolve_id(store, id_or_prefix)?;
    if store.remove(&scan_id)? {
        println!(
            "Removed scan {} (file: {})",
            scan_id,
            store.path_for(&scan_id).display()
        );
    } else {
        println!("Scan ID {} not found.", scan_id);
    }
    Ok(())
}

/// Age threshold for `cleanup`, saturating for absurdly large hour counts.
pub fn cleanup_age(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

pub fn cmd_cleanup(store: &ProgressStore, older_than: Duration) -> Result<()> {
    let removed = store.remove_older_than(older_than)?;

    if removed.is_empty() {
        println!(
            "No scan progress files older than {} hours found.",
            older_than.as_secs() / 3600
        );
    } else {
        for path in &removed {
            println!("Removed old scan progress file: {}", path.display());
        }
        println!("Cleaned up {} old scan progress file(s).", removed.len());
    }
    Ok(())
}
