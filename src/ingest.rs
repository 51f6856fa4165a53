//! Ingest pipeline: a table's byte stream becomes documents in a store.
//!
//! Rows are consumed strictly in arrival order and written in batches;
//! the destination keeps codec order, not arrival order. Tables are
//! independent, so callers may run one ingest per table concurrently (see
//! [`crate::feed`]). A per-document write failure is counted and logged but
//! does not abort the table; an unreadable stream or an unkeyable row does.

use std::io::Read;
use std::path::PathBuf;

use log::{info, warn};

use crate::error::Error;
use crate::store::DocumentStore;
use crate::tables::Table;
use crate::transform::Row;

/// Documents per `bulk_write`.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub batch_size: usize,
    /// Snapshot to load into the destination before applying new rows, so
    /// repeated ingestion updates instead of replacing. Missing file means
    /// a fresh start.
    pub merge_snapshot: Option<PathBuf>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            merge_snapshot: None,
        }
    }
}

/// What one table's ingest did.
#[derive(Debug, Clone, Copy)]
pub struct IngestReport {
    pub table: Table,
    pub rows: usize,
    pub written: usize,
    pub failed: usize,
}

/// Iterator over a table's data rows as field maps, column names taken
/// verbatim from the header row. Tolerates a UTF-8 byte order mark and
/// ragged rows; surplus values without a column name are dropped.
pub struct RowReader<R: Read> {
    reader: csv::Reader<ReadChain<R>>,
    headers: csv::StringRecord,
    record: csv::StringRecord,
    file_name: String,
}

type ReadChain<R> = std::io::Chain<std::io::Cursor<Vec<u8>>, R>;

impl<R: Read> RowReader<R> {
    pub fn new(table: Table, mut input: R) -> Result<Self, Error> {
        let file_name = table.file_name();

        // A leading BOM would otherwise glue itself onto the first header.
        let mut bom = [0u8; 3];
        let mut seen = 0;
        while seen < 3 {
            match input.read(&mut bom[seen..]) {
                Ok(0) => break,
                Ok(n) => seen += n,
                Err(e) => {
                    return Err(Error::NamedFileIO {
                        file_name,
                        source: Box::new(e),
                    })
                }
            }
        }
        let replay = if bom[..seen] == [0xef, 0xbb, 0xbf] {
            Vec::new()
        } else {
            bom[..seen].to_vec()
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Fields)
            .from_reader(std::io::Cursor::new(replay).chain(input));
        let headers = reader
            .headers()
            .map_err(|e| Error::Csv {
                file_name: file_name.clone(),
                source: e,
            })?
            .clone();

        Ok(RowReader {
            reader,
            headers,
            record: csv::StringRecord::new(),
            file_name,
        })
    }

    /// Next data row, or `None` at end of stream.
    pub fn next_row(&mut self) -> Result<Option<Row>, Error> {
        let more = self
            .reader
            .read_record(&mut self.record)
            .map_err(|e| Error::Csv {
                file_name: self.file_name.clone(),
                source: e,
            })?;
        if !more {
            return Ok(None);
        }
        let row = self
            .headers
            .iter()
            .zip(self.record.iter())
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();
        Ok(Some(row))
    }
}

/// Ingests one table from a byte stream into `store`.
pub async fn ingest_rows<R, S>(
    table: Table,
    input: R,
    store: &S,
    options: &IngestOptions,
) -> Result<IngestReport, Error>
where
    R: Read,
    S: DocumentStore + ?Sized,
{
    if let Some(snapshot) = &options.merge_snapshot {
        crate::snapshot::import_snapshot_file_if_exists(store, snapshot).await?;
    }

    let mut rows = RowReader::new(table, input)?;
    let mut report = IngestReport {
        table,
        rows: 0,
        written: 0,
        failed: 0,
    };
    let mut batch = Vec::with_capacity(options.batch_size);

    loop {
        let row = rows.next_row()?;
        let done = row.is_none();
        if let Some(row) = row {
            report.rows += 1;
            batch.push(table.transform(row)?);
        }
        if batch.len() >= options.batch_size || (done && !batch.is_empty()) {
            let outcomes = store.bulk_write(std::mem::take(&mut batch)).await?;
            for outcome in outcomes {
                if let Some(error) = &outcome.error {
                    warn!("{table}: write of {:?} failed: {error}", outcome.key);
                    report.failed += 1;
                } else {
                    report.written += 1;
                }
            }
        }
        if done {
            break;
        }
    }

    info!(
        "{table}: ingested {} rows ({} written, {} failed)",
        report.rows, report.written, report.failed
    );
    Ok(report)
}
