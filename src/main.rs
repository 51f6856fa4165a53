//! Command-line surface: feed in, snapshot directory out.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;

use gtfs_store::feed::{ingest_feed_path, ingest_feed_zip, FeedStores};
use gtfs_store::ingest::{ingest_rows, IngestOptions};
use gtfs_store::snapshot;
use gtfs_store::{MemoryStore, Table};

#[derive(Parser)]
#[command(name = "gtfs-store", about = "GTFS feeds as sorted key/value documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a feed (zip, directory, or piped bytes) into snapshot files
    Ingest {
        /// Feed archive or directory; `-` reads zip bytes from stdin
        input: String,
        /// Snapshot directory; existing snapshots are merged, not replaced
        #[arg(short, long, default_value = "gtfs-snapshots")]
        output: PathBuf,
        /// Ingest a single table. The value names the table when input is
        /// piped or has an unrecognizable file name
        #[arg(short, long)]
        partial: Option<String>,
        /// Documents per store write
        #[arg(long, default_value_t = gtfs_store::ingest::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
}

async fn ingest_partial(
    input: &str,
    table_name: Option<&str>,
    output: &PathBuf,
    options: &IngestOptions,
) -> anyhow::Result<()> {
    // The table comes from the explicit flag value, or the file name.
    let table = match table_name {
        Some(name) => Table::from_name(name)?,
        None if input != "-" => Table::from_name(input)?,
        None => bail!("piped input needs an explicit table name, e.g. --partial stops"),
    };

    let store = MemoryStore::new();
    let snapshot_file = snapshot::snapshot_path(output, table);
    let options = IngestOptions {
        merge_snapshot: Some(snapshot_file.clone()),
        ..options.clone()
    };

    let report = if input == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        ingest_rows(table, bytes.as_slice(), &store, &options).await?
    } else {
        let file = std::fs::File::open(input).with_context(|| format!("opening {input}"))?;
        ingest_rows(table, file, &store, &options).await?
    };

    tokio::fs::create_dir_all(output).await?;
    snapshot::export_snapshot_file(&store, &snapshot_file).await?;
    info!(
        "{}: {} rows written to {}",
        report.table,
        report.written,
        snapshot_file.display()
    );
    Ok(())
}

async fn ingest_whole_feed(
    input: &str,
    output: &PathBuf,
    options: &IngestOptions,
) -> anyhow::Result<()> {
    // Merge semantics: start from whatever the snapshot directory already
    // holds, apply the feed on top, write everything back.
    let stores = if output.is_dir() {
        FeedStores::from_snapshot_dir(output).await?
    } else {
        FeedStores::new()
    };

    let reports = if input == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        ingest_feed_zip(&bytes, &stores, options).await?
    } else {
        ingest_feed_path(input.as_ref(), &stores, options).await?
    };

    if reports.is_empty() {
        bail!("{input} contains no recognizable GTFS tables");
    }
    stores.export_snapshot_dir(output).await?;
    info!("wrote {} table snapshots to {}", reports.len(), output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest {
            input,
            output,
            partial,
            batch_size,
        } => {
            let options = IngestOptions {
                batch_size,
                merge_snapshot: None,
            };
            if partial.is_some() || input.ends_with(".txt") {
                ingest_partial(&input, partial.as_deref(), &output, &options).await
            } else {
                ingest_whole_feed(&input, &output, &options).await
            }
        }
    }
}
