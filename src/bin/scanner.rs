use anyhow::Result;
use upgrade_scanner::config::Config;
use upgrade_scanner::explorer::BlockscoutClient;
use upgrade_scanner::logging;
use upgrade_scanner::scanner::Scanner;
use upgrade_scanner::writer::ResultWriter;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    logging::init(config.log_level);

    info!(
        "Starting proxy upgrade scanner with log level {:?}",
        config.log_level
    );
    info!("Network: {} ({})", config.network.name, config.network.blockscout_url);
    info!(
        "Target addresses: {}, block range {}, rate limit {:?}",
        config.target_addresses.len(),
        config.block_range,
        config.rate_limit
    );

    let writer = ResultWriter::open(&config.output_file)?;
    info!("Writing results to {}", config.output_file.display());

    let client = BlockscoutClient::new(config.network.blockscout_url)?;
    info!("Explorer client ready for {}", client.base_url());

    let mut scanner = Scanner::new(client, config, writer);

    match scanner.run().await {
        Ok(summary) => {
            println!("=== Scan Complete (ID: {}) ===", summary.scan_id);
            println!("Total time: {:?}", summary.elapsed);
            println!("Total logs found: {}", summary.progress.total_logs);
            println!(
                "Total transactions with 2+ matching events: {}",
                summary.progress.duplicate_txs
            );
            println!("Rows written: {}", summary.progress.processed_txs);
            println!(
                "Total API calls: {} (avg {:?})",
                summary.api_calls, summary.avg_api_time
            );
            Ok(())
        }
        Err(e) => {
            error!("Scanner error: {:#}", e);
            Err(e)
        }
    }
}
