//! Agency lookup.

use crate::documents::Agency;
use crate::error::Error;
use crate::store::{get_doc, DocumentStore, ScanOptions};

/// Fetches an agency by id, or — with no id — the first agency in the
/// table. Most feeds carry a single agency without an `agency_id`, keyed by
/// name instead, and this returns it.
pub async fn get_agency<S>(agencies: &S, id: Option<&str>) -> Result<Agency, Error>
where
    S: DocumentStore + ?Sized,
{
    if let Some(id) = id {
        return get_doc(agencies, id).await;
    }

    let mut rows = agencies
        .scan(ScanOptions {
            limit: Some(1),
            ..ScanOptions::all(true)
        })
        .await?;
    let first = rows
        .pop()
        .and_then(|row| row.doc)
        .ok_or_else(|| Error::NotFound("agency".to_owned()))?;
    Ok(serde_json::from_value(first)?)
}
