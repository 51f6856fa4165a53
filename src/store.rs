//! The sorted document store the pipeline writes to and the query layer
//! reads from.
//!
//! The store is an explicit interface injected at construction time; the
//! crate never reaches for a global backend. One store instance holds one
//! table. [`MemoryStore`] is the bundled implementation: a `BTreeMap`
//! behind an async lock, giving atomic single-key writes, read-your-own-
//! writes consistency and range scans in key order. Nothing is guaranteed
//! about a scan racing a concurrent ingest of the same table.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Error;

/// Bounds and shape of a range scan. `end` is inclusive, so a closed window
/// such as an exception date range is expressed directly.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub start: Option<String>,
    pub end: Option<String>,
    /// Fetch bodies, not just keys.
    pub include_docs: bool,
    pub limit: Option<usize>,
    pub skip: usize,
    pub descending: bool,
    /// Fetch exactly these keys, in request order, skipping absent ones.
    /// Overrides the range bounds.
    pub keys: Option<Vec<String>>,
}

impl ScanOptions {
    /// Scan of every key starting with `prefix`, in ascending key order.
    pub fn prefix(prefix: &str, include_docs: bool) -> Self {
        let (start, end) = crate::keys::prefix_range(prefix);
        ScanOptions {
            start: Some(start),
            end: Some(end),
            include_docs,
            ..Default::default()
        }
    }

    /// Scan of the whole table.
    pub fn all(include_docs: bool) -> Self {
        ScanOptions {
            include_docs,
            ..Default::default()
        }
    }

    /// Explicit-keys fetch with bodies.
    pub fn explicit(keys: Vec<String>) -> Self {
        ScanOptions {
            include_docs: true,
            keys: Some(keys),
            ..Default::default()
        }
    }
}

/// One row of a scan result. The body is present iff `include_docs` was set.
#[derive(Debug, Clone)]
pub struct ScanRow {
    pub key: String,
    pub doc: Option<Value>,
}

/// Per-document outcome of a bulk write.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub key: String,
    pub error: Option<String>,
}

impl WriteOutcome {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A sorted document store for one table. Writes are upserts keyed by the
/// document's `"key"` field; reads come back in key order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches one document or fails with [`Error::NotFound`].
    async fn get(&self, key: &str) -> Result<Value, Error>;

    /// Ordered range or explicit-keys scan.
    async fn scan(&self, options: ScanOptions) -> Result<Vec<ScanRow>, Error>;

    /// Upserts a batch. One outcome per input document, in input order.
    async fn bulk_write(&self, docs: Vec<Value>) -> Result<Vec<WriteOutcome>, Error>;
}

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held. Test and reporting helper.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn doc_key(doc: &Value) -> Option<String> {
    doc.get("key")?.as_str().map(str::to_owned)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Value, Error> {
        self.docs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_owned()))
    }

    async fn scan(&self, options: ScanOptions) -> Result<Vec<ScanRow>, Error> {
        let docs = self.docs.read().await;

        if let Some(keys) = &options.keys {
            let rows = keys
                .iter()
                .filter_map(|key| {
                    docs.get(key).map(|doc| ScanRow {
                        key: key.clone(),
                        doc: options.include_docs.then(|| doc.clone()),
                    })
                })
                .collect();
            return Ok(rows);
        }

        let lower = match &options.start {
            Some(start) => Bound::Included(start.clone()),
            None => Bound::Unbounded,
        };
        let upper = match &options.end {
            Some(end) => Bound::Included(end.clone()),
            None => Bound::Unbounded,
        };
        // An inverted window is an empty result, not a panic.
        if let (Bound::Included(start), Bound::Included(end)) = (&lower, &upper) {
            if start > end {
                return Ok(Vec::new());
            }
        }

        let in_range = docs.range((lower, upper)).map(|(key, doc)| ScanRow {
            key: key.clone(),
            doc: options.include_docs.then(|| doc.clone()),
        });

        let limit = options.limit.unwrap_or(usize::MAX);
        let rows = if options.descending {
            in_range.rev().skip(options.skip).take(limit).collect()
        } else {
            in_range.skip(options.skip).take(limit).collect()
        };
        Ok(rows)
    }

    async fn bulk_write(&self, batch: Vec<Value>) -> Result<Vec<WriteOutcome>, Error> {
        let mut docs = self.docs.write().await;
        let outcomes = batch
            .into_iter()
            .map(|doc| match doc_key(&doc) {
                Some(key) => {
                    docs.insert(key.clone(), doc);
                    WriteOutcome { key, error: None }
                }
                None => WriteOutcome {
                    key: String::new(),
                    error: Some("document has no key".to_owned()),
                },
            })
            .collect();
        Ok(outcomes)
    }
}

/// Fetches and deserializes one document.
pub async fn get_doc<T, S>(store: &S, key: &str) -> Result<T, Error>
where
    T: DeserializeOwned,
    S: DocumentStore + ?Sized,
{
    Ok(serde_json::from_value(store.get(key).await?)?)
}

/// Deserializes the bodies of a scan, skipping rows without one.
pub fn rows_into_docs<T: DeserializeOwned>(rows: Vec<ScanRow>) -> Result<Vec<T>, Error> {
    rows.into_iter()
        .filter_map(|row| row.doc)
        .map(|doc| serde_json::from_value(doc).map_err(Error::from))
        .collect()
}
