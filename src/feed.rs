//! Whole-feed ingest: a zip archive or a directory of `.txt` tables.
//!
//! Exactly the thirteen table file names are recognized; anything else in
//! the archive is skipped. Tables ingest concurrently — their key
//! namespaces never overlap — while rows within one table stay in arrival
//! order.

use std::io::Read;
use std::path::Path;

use futures::future::try_join_all;
use log::{debug, info};

use crate::error::Error;
use crate::ingest::{ingest_rows, IngestOptions, IngestReport};
use crate::snapshot;
use crate::store::{DocumentStore, MemoryStore};
use crate::tables::{Table, ALL_TABLES};

/// One in-memory store per table.
#[derive(Debug, Default)]
pub struct FeedStores {
    pub agency: MemoryStore,
    pub stops: MemoryStore,
    pub routes: MemoryStore,
    pub trips: MemoryStore,
    pub stop_times: MemoryStore,
    pub calendar: MemoryStore,
    pub calendar_dates: MemoryStore,
    pub fare_attributes: MemoryStore,
    pub fare_rules: MemoryStore,
    pub shapes: MemoryStore,
    pub frequencies: MemoryStore,
    pub transfers: MemoryStore,
    pub feed_info: MemoryStore,
}

impl FeedStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, table: Table) -> &MemoryStore {
        match table {
            Table::Agency => &self.agency,
            Table::Stops => &self.stops,
            Table::Routes => &self.routes,
            Table::Trips => &self.trips,
            Table::StopTimes => &self.stop_times,
            Table::Calendar => &self.calendar,
            Table::CalendarDates => &self.calendar_dates,
            Table::FareAttributes => &self.fare_attributes,
            Table::FareRules => &self.fare_rules,
            Table::Shapes => &self.shapes,
            Table::Frequencies => &self.frequencies,
            Table::Transfers => &self.transfers,
            Table::FeedInfo => &self.feed_info,
        }
    }

    /// Bootstraps a read replica from a snapshot directory. Missing files
    /// are empty tables.
    pub async fn from_snapshot_dir(dir: &Path) -> Result<Self, Error> {
        let stores = Self::new();
        try_join_all(ALL_TABLES.map(|table| {
            let path = snapshot::snapshot_path(dir, table);
            let store = stores.store(table);
            async move { snapshot::import_snapshot_file_if_exists(store, &path).await }
        }))
        .await?;
        Ok(stores)
    }

    /// Exports every table to `{table}.ndjson` files under `dir`.
    pub async fn export_snapshot_dir(&self, dir: &Path) -> Result<(), Error> {
        tokio::fs::create_dir_all(dir).await?;
        try_join_all(ALL_TABLES.map(|table| {
            let path = snapshot::snapshot_path(dir, table);
            let store = self.store(table);
            async move { snapshot::export_snapshot_file(store, &path).await }
        }))
        .await?;
        Ok(())
    }
}

/// The recognized tables of a feed, with each table's raw bytes.
fn collect_zip_tables(bytes: &[u8]) -> Result<Vec<(Table, Vec<u8>)>, Error> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let mut found = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let table = match Table::from_name(entry.name()) {
            Ok(table) => table,
            Err(_) => {
                debug!("skipping archive entry {}", entry.name());
                continue;
            }
        };
        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents)?;
        found.push((table, contents));
    }
    Ok(found)
}

fn collect_dir_tables(dir: &Path) -> Result<Vec<(Table, Vec<u8>)>, Error> {
    let mut found = Vec::new();
    for table in ALL_TABLES {
        let path = dir.join(table.file_name());
        if path.is_file() {
            found.push((table, std::fs::read(&path)?));
        }
    }
    Ok(found)
}

async fn ingest_tables(
    tables: Vec<(Table, Vec<u8>)>,
    stores: &FeedStores,
    options: &IngestOptions,
) -> Result<Vec<IngestReport>, Error> {
    let reports = try_join_all(tables.into_iter().map(|(table, bytes)| async move {
        ingest_rows(table, bytes.as_slice(), stores.store(table), options).await
    }))
    .await?;
    info!(
        "feed ingest finished: {} tables, {} rows",
        reports.len(),
        reports.iter().map(|r| r.rows).sum::<usize>()
    );
    Ok(reports)
}

/// Ingests a feed given as a directory path or a `.zip` file path.
pub async fn ingest_feed_path(
    path: &Path,
    stores: &FeedStores,
    options: &IngestOptions,
) -> Result<Vec<IngestReport>, Error> {
    let tables = if path.is_dir() {
        collect_dir_tables(path)?
    } else {
        collect_zip_tables(&std::fs::read(path)?)?
    };
    ingest_tables(tables, stores, options).await
}

/// Ingests a feed handed over as in-memory zip bytes (piped input).
pub async fn ingest_feed_zip(
    bytes: &[u8],
    stores: &FeedStores,
    options: &IngestOptions,
) -> Result<Vec<IngestReport>, Error> {
    ingest_tables(collect_zip_tables(bytes)?, stores, options).await
}
