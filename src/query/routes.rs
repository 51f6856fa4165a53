//! Route reads, including the stop-to-routes connectivity join.

use futures::future::try_join_all;
use rustc_hash::FxHashSet;

use crate::documents::Route;
use crate::error::Error;
use crate::keys::{RouteKey, StopTimeKey, TripKey};
use crate::store::{get_doc, rows_into_docs, DocumentStore, ScanOptions};

/// Fetches a route by id.
pub async fn get_route<S>(routes: &S, route_id: &str) -> Result<Route, Error>
where
    S: DocumentStore + ?Sized,
{
    let key = RouteKey {
        route_id: route_id.to_owned(),
    }
    .encode();
    get_doc(routes, &key).await
}

/// Every route in the table, in key order.
pub async fn list_routes<S>(routes: &S) -> Result<Vec<Route>, Error>
where
    S: DocumentStore + ?Sized,
{
    let rows = routes.scan(ScanOptions::all(true)).await?;
    rows_into_docs(rows)
}

/// Every route with at least one trip calling at `stop_id`.
///
/// There is no index from stops to routes, so this is a two-stage scan
/// joined in memory: stop-time keys yield the trip ids touching the stop,
/// trip keys yield the route ids owning those trips, and the matched
/// routes are fetched concurrently. Route order follows the trip table's
/// key order, deduplicated.
pub async fn connected_routes<ST, T, R>(
    stop_times: &ST,
    trips: &T,
    routes: &R,
    stop_id: &str,
) -> Result<Vec<Route>, Error>
where
    ST: DocumentStore + ?Sized,
    T: DocumentStore + ?Sized,
    R: DocumentStore + ?Sized,
{
    let time_rows = stop_times
        .scan(ScanOptions::prefix(StopTimeKey::table_prefix(), false))
        .await?;
    let trip_ids: FxHashSet<String> = time_rows
        .into_iter()
        .filter_map(|row| StopTimeKey::decode(&row.key).ok())
        .filter(|decoded| decoded.stop_id == stop_id)
        .map(|decoded| decoded.trip_id)
        .collect();

    let trip_rows = trips
        .scan(ScanOptions::prefix(TripKey::table_prefix(), false))
        .await?;
    let mut seen = FxHashSet::default();
    let mut route_ids = Vec::new();
    for row in trip_rows {
        let decoded = TripKey::decode(&row.key)?;
        if trip_ids.contains(&decoded.trip_id) && seen.insert(decoded.route_id.clone()) {
            route_ids.push(decoded.route_id);
        }
    }

    try_join_all(route_ids.iter().map(|route_id| get_route(routes, route_id))).await
}
