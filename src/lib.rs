/*! Transit schedules as sorted key/value documents.

A [GTFS](https://gtfs.org/) feed is a collection of CSV tables with
relationships through shared identifiers. This crate ingests the thirteen
tables into a sorted document store, one JSON document per row, keyed by a
composite, lexicographically sortable string — and then answers the
relational questions (a trip's schedule, a route's trips, the nearest stop)
with nothing but prefix and range scans over those keys. No secondary
indexes exist anywhere.

## Design decisions

### Keys carry the structure

`time/{trip_id}/{stop_sequence}/{stop_id}` puts a trip's whole schedule in
one contiguous key range, already ordered, because the sequence segment is
fixed-width zero-padded. `stop/{stop_id}/[{lon},{lat}]` makes bulk
geospatial listing a key-only scan. [`keys`] holds every codec and its
round-trip guarantees.

### The store is injected

Everything reads and writes through the [`store::DocumentStore`] trait;
[`store::MemoryStore`] is the bundled sorted implementation. One store
instance holds one table.

### Forgiving coercion

Ingest never rejects a row over a bad numeric field: the value becomes a
sentinel and the row flows through ([`transform`]). Blank fields are
absent, and unknown columns ride along untouched.

### Snapshots are plain lines

A table exports as `{table}.ndjson`, one document per line ([`snapshot`]),
which is both the merge-mode input for repeated ingests and the bootstrap
format for read replicas.
*/

pub mod documents;
pub mod error;
pub mod feed;
pub mod geocode;
pub mod ingest;
pub mod keys;
pub mod query;
pub mod serde_support;
pub mod snapshot;
pub mod store;
pub mod tables;
pub mod transform;

pub use error::Error;
pub use feed::FeedStores;
pub use ingest::{IngestOptions, IngestReport};
pub use store::{DocumentStore, MemoryStore};
pub use tables::{Table, ALL_TABLES};
