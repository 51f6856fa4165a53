//! Trip reads: lookups, per-route listings and time-range relationships.

use futures::future::try_join_all;
use futures::try_join;

use crate::documents::Trip;
use crate::error::Error;
use crate::keys::TripKey;
use crate::query::stop_times::get_trip_schedule;
use crate::store::{get_doc, rows_into_docs, DocumentStore, ScanOptions};

/// Span of a trip's schedule in seconds past midnight: earliest arrival to
/// latest departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: u32,
    pub end: u32,
}

impl TimeRange {
    pub fn contains(&self, now: u32) -> bool {
        self.start <= now && now <= self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Fetches a trip by `trip_id`, which is not the document key on its own.
///
/// With a known `route_id` the key is built directly. Without one, this is
/// the slow path: a key-only scan of the whole table, decoding every key
/// until the trip id matches. Pass the route whenever it is known.
pub async fn get_trip<S>(trips: &S, trip_id: &str, route_id: Option<&str>) -> Result<Trip, Error>
where
    S: DocumentStore + ?Sized,
{
    if let Some(route_id) = route_id {
        let key = TripKey {
            route_id: route_id.to_owned(),
            trip_id: trip_id.to_owned(),
        }
        .encode();
        return get_doc(trips, &key).await;
    }

    let rows = trips
        .scan(ScanOptions::prefix(TripKey::table_prefix(), false))
        .await?;
    let key = rows
        .into_iter()
        .find(|row| {
            TripKey::decode(&row.key)
                .map(|decoded| decoded.trip_id == trip_id)
                .unwrap_or(false)
        })
        .map(|row| row.key)
        .ok_or_else(|| Error::NotFound(format!("trip {trip_id}")))?;
    get_doc(trips, &key).await
}

/// The trip's rider-facing name: short name, else headsign, else empty.
pub fn trip_name(trip: &Trip) -> &str {
    trip.trip_short_name
        .as_deref()
        .or(trip.trip_headsign.as_deref())
        .unwrap_or("")
}

/// Every trip that is a child of a route, in ascending key order.
pub async fn all_trips_for_route<S>(trips: &S, route_id: &str) -> Result<Vec<Trip>, Error>
where
    S: DocumentStore + ?Sized,
{
    let rows = trips
        .scan(ScanOptions::prefix(&TripKey::route_prefix(route_id), true))
        .await?;
    rows_into_docs(rows)
}

/// The schedule span of a trip, or `None` when the schedule is empty.
pub async fn trip_times<S>(stop_times: &S, trip_id: &str) -> Result<Option<TimeRange>, Error>
where
    S: DocumentStore + ?Sized,
{
    let schedule = get_trip_schedule(stop_times, trip_id).await?;
    if schedule.is_empty() {
        return Ok(None);
    }
    let start = schedule.iter().map(|t| t.arrival_time).min().unwrap_or(0);
    let end = schedule.iter().map(|t| t.departure_time).max().unwrap_or(0);
    Ok(Some(TimeRange { start, end }))
}

/// The trip of a route currently underway at `now`.
///
/// With no active trip, the route's first trip in key order is returned;
/// with several active, the one that started earliest wins.
pub async fn current_trip<T, S>(
    trips: &T,
    stop_times: &S,
    route_id: &str,
    now: u32,
) -> Result<Trip, Error>
where
    T: DocumentStore + ?Sized,
    S: DocumentStore + ?Sized,
{
    let rows = trips
        .scan(ScanOptions::prefix(&TripKey::route_prefix(route_id), false))
        .await?;
    if rows.is_empty() {
        return Err(Error::NotFound(format!("trips of route {route_id}")));
    }

    let ranges = try_join_all(rows.iter().map(|row| async move {
        let decoded = TripKey::decode(&row.key)?;
        let range = trip_times(stop_times, &decoded.trip_id).await?;
        Ok::<_, Error>((row.key.clone(), range))
    }))
    .await?;

    let active = ranges
        .iter()
        .filter_map(|(key, range)| {
            range
                .filter(|range| range.contains(now))
                .map(|range| (key, range))
        })
        .min_by_key(|(_, range)| range.start);

    let key = match active {
        Some((key, _)) => key.clone(),
        None => rows[0].key.clone(),
    };
    get_doc(trips, &key).await
}

/// The trips of the same route immediately before and after a trip.
#[derive(Debug, Clone, Default)]
pub struct SiblingTrips {
    pub previous: Option<Trip>,
    pub following: Option<Trip>,
}

/// Partitions the other trips of the route into those ending before this
/// trip starts and those starting after it ends; trips overlapping the
/// target's range are discarded. Returns the latest of the former and the
/// earliest of the latter.
pub async fn sibling_trips<T, S>(
    trips: &T,
    stop_times: &S,
    trip: &Trip,
) -> Result<SiblingTrips, Error>
where
    T: DocumentStore + ?Sized,
    S: DocumentStore + ?Sized,
{
    let (target, others) = try_join!(
        trip_times(stop_times, &trip.trip_id),
        all_trips_for_route(trips, &trip.route_id),
    )?;

    // Nothing to compare against without a schedule of our own.
    let target = match target {
        Some(range) => range,
        None => return Ok(SiblingTrips::default()),
    };

    let ranged = try_join_all(
        others
            .into_iter()
            .filter(|other| other.key != trip.key)
            .map(|other| async move {
                let range = trip_times(stop_times, &other.trip_id).await?;
                Ok::<_, Error>((other, range))
            }),
    )
    .await?;

    let mut previous: Option<(Trip, TimeRange)> = None;
    let mut following: Option<(Trip, TimeRange)> = None;
    for (other, range) in ranged {
        let range = match range {
            Some(range) => range,
            None => continue,
        };
        if target.overlaps(&range) {
            continue;
        }
        if range.end < target.start {
            if previous.as_ref().map(|(_, r)| range.end > r.end).unwrap_or(true) {
                previous = Some((other, range));
            }
        } else if following
            .as_ref()
            .map(|(_, r)| range.start < r.start)
            .unwrap_or(true)
        {
            following = Some((other, range));
        }
    }

    Ok(SiblingTrips {
        previous: previous.map(|(trip, _)| trip),
        following: following.map(|(trip, _)| trip),
    })
}
