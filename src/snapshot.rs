//! Snapshot persistence: one table, one line-delimited JSON file.
//!
//! Snapshots serve two jobs: merge mode during ingest (load the previous
//! state, apply new rows on top) and bootstrapping a read-only copy of the
//! data somewhere else. Documents export in ascending key order; import
//! order is irrelevant since keys carry the order.

use std::path::{Path, PathBuf};

use log::info;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::error::Error;
use crate::ingest::DEFAULT_BATCH_SIZE;
use crate::store::{DocumentStore, ScanOptions};
use crate::tables::Table;

/// `{table}.ndjson` inside a snapshot directory.
pub fn snapshot_path(dir: &Path, table: Table) -> PathBuf {
    dir.join(format!("{}.ndjson", table.name()))
}

/// Writes every document of `store` to `output`, one JSON document per line.
pub async fn export_snapshot<S, W>(store: &S, output: W) -> Result<usize, Error>
where
    S: DocumentStore + ?Sized,
    W: AsyncWrite + Unpin,
{
    let rows = store.scan(ScanOptions::all(true)).await?;
    let mut output = BufWriter::new(output);
    let mut exported = 0;
    for row in rows {
        if let Some(doc) = row.doc {
            output.write_all(serde_json::to_string(&doc)?.as_bytes()).await?;
            output.write_all(b"\n").await?;
            exported += 1;
        }
    }
    output.flush().await?;
    Ok(exported)
}

/// Loads a line-delimited document stream into `store`. Blank lines are
/// skipped; a line that is not valid JSON fails the import.
pub async fn import_snapshot<S, R>(store: &S, input: R) -> Result<usize, Error>
where
    S: DocumentStore + ?Sized,
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut batch: Vec<Value> = Vec::with_capacity(DEFAULT_BATCH_SIZE);
    let mut imported = 0;
    let mut line_no = 0;

    loop {
        let line = lines.next_line().await?;
        let done = line.is_none();
        if let Some(line) = line {
            line_no += 1;
            if !line.trim().is_empty() {
                let doc = serde_json::from_str(&line).map_err(|source| Error::SnapshotLine {
                    line: line_no,
                    source,
                })?;
                batch.push(doc);
            }
        }
        if batch.len() >= DEFAULT_BATCH_SIZE || (done && !batch.is_empty()) {
            imported += batch.len();
            store.bulk_write(std::mem::take(&mut batch)).await?;
        }
        if done {
            return Ok(imported);
        }
    }
}

/// Exports one table's snapshot file.
pub async fn export_snapshot_file<S>(store: &S, path: &Path) -> Result<usize, Error>
where
    S: DocumentStore + ?Sized,
{
    let file = tokio::fs::File::create(path).await?;
    let exported = export_snapshot(store, file).await?;
    info!("exported {exported} documents to {}", path.display());
    Ok(exported)
}

/// Imports one table's snapshot file.
pub async fn import_snapshot_file<S>(store: &S, path: &Path) -> Result<usize, Error>
where
    S: DocumentStore + ?Sized,
{
    let file = tokio::fs::File::open(path).await?;
    import_snapshot(store, file).await
}

/// Merge-mode helper: absent snapshot means a fresh start, not an error.
pub async fn import_snapshot_file_if_exists<S>(store: &S, path: &Path) -> Result<usize, Error>
where
    S: DocumentStore + ?Sized,
{
    match tokio::fs::File::open(path).await {
        Ok(file) => import_snapshot(store, file).await,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn export_import_round_trip() {
        let store = MemoryStore::new();
        store
            .bulk_write(vec![
                json!({ "key": "route/10", "route_id": "10" }),
                json!({ "key": "route/2", "route_id": "2" }),
            ])
            .await
            .unwrap();

        let mut bytes = Vec::new();
        let exported = export_snapshot(&store, &mut bytes).await.unwrap();
        assert_eq!(exported, 2);
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        // Ascending key order.
        assert!(text.lines().next().unwrap().contains("route/10"));

        let replica = MemoryStore::new();
        let imported = import_snapshot(&replica, bytes.as_slice()).await.unwrap();
        assert_eq!(imported, 2);
        assert_eq!(
            replica.get("route/2").await.unwrap(),
            store.get("route/2").await.unwrap()
        );
    }

    #[tokio::test]
    async fn malformed_line_is_an_error() {
        let store = MemoryStore::new();
        let bytes = b"{\"key\":\"a\"}\nnot json\n";
        let err = import_snapshot(&store, bytes.as_slice()).await.unwrap_err();
        assert!(matches!(err, Error::SnapshotLine { line: 2, .. }));
    }

    #[tokio::test]
    async fn snapshot_files_round_trip_in_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path(), Table::Routes);
        assert!(path.ends_with("routes.ndjson"));

        let store = MemoryStore::new();
        store
            .bulk_write(vec![json!({ "key": "route/10", "route_id": "10" })])
            .await
            .unwrap();
        export_snapshot_file(&store, &path).await.unwrap();

        let replica = MemoryStore::new();
        import_snapshot_file(&replica, &path).await.unwrap();
        assert_eq!(replica.len().await, 1);

        let missing = snapshot_path(dir.path(), Table::Shapes);
        assert_eq!(
            import_snapshot_file_if_exists(&replica, &missing)
                .await
                .unwrap(),
            0
        );
    }
}
