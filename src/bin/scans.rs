use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use upgrade_scanner::progress::ProgressStore;
use upgrade_scanner::query::commands::{cleanup_age, cmd_cleanup, cmd_delete, cmd_list, cmd_show};
use upgrade_scanner::query::formatters::OutputFormat;

#[derive(Parser)]
#[command(name = "scans")]
#[command(about = "Inspect and manage saved scan progress", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    /// Directory holding scan_progress_*.json files
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    List,
    Show {
        scan_id: String,
    },
    Delete {
        scan_id: String,
    },
    Cleanup {
        #[arg(long, default_value = "168")]
        older_than_hours: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());
    let store = ProgressStore::new(cli.dir);

    match cli.command {
        Commands::List => cmd_list(&store, &format)?,
        Commands::Show { scan_id } => cmd_show(&store, &scan_id, &format)?,
        Commands::Delete { scan_id } => cmd_delete(&store, &scan_id)?,
        Commands::Cleanup { older_than_hours } => cmd_cleanup(&store, cleanup_age(older_than_hours))?,
    }

    Ok(())
}
