//! Stop-time reads: trip schedules, per-stop lookups and next-stop logic.
//!
//! A trip's schedule is one prefix scan and arrives already ordered,
//! because the key embeds the zero-padded stop sequence.

use futures::try_join;

use crate::documents::StopTime;
use crate::error::Error;
use crate::keys::{StopTimeKey, TripKey};
use crate::store::{get_doc, rows_into_docs, DocumentStore, ScanOptions};

/// Fetches one stop time by its full identity.
pub async fn get_stop_time<S>(
    stop_times: &S,
    trip_id: &str,
    stop_id: &str,
    stop_sequence: u32,
) -> Result<StopTime, Error>
where
    S: DocumentStore + ?Sized,
{
    let key = StopTimeKey {
        trip_id: trip_id.to_owned(),
        stop_sequence,
        stop_id: stop_id.to_owned(),
    }
    .encode();
    get_doc(stop_times, &key).await
}

/// Every stop time of a trip, in sequence order.
pub async fn get_trip_schedule<S>(stop_times: &S, trip_id: &str) -> Result<Vec<StopTime>, Error>
where
    S: DocumentStore + ?Sized,
{
    let rows = stop_times
        .scan(ScanOptions::prefix(&StopTimeKey::trip_prefix(trip_id), true))
        .await?;
    rows_into_docs(rows)
}

/// Every stop time that calls at a stop.
///
/// The stop id is the last key segment, not a prefix, so this walks every
/// key in the table and filters on the decoded id before fetching bodies.
/// O(n) over the table by design — the keys carry no index for this axis.
pub async fn stop_times_for_stop<S>(stop_times: &S, stop_id: &str) -> Result<Vec<StopTime>, Error>
where
    S: DocumentStore + ?Sized,
{
    let rows = stop_times
        .scan(ScanOptions::prefix(StopTimeKey::table_prefix(), false))
        .await?;
    let wanted: Vec<String> = rows
        .into_iter()
        .filter(|row| {
            StopTimeKey::decode(&row.key)
                .map(|decoded| decoded.stop_id == stop_id)
                .unwrap_or(false)
        })
        .map(|row| row.key)
        .collect();

    let rows = stop_times.scan(ScanOptions::explicit(wanted)).await?;
    rows_into_docs(rows)
}

/// First and last stop of a trip's schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstAndLast {
    pub first: StopTime,
    pub last: StopTime,
}

/// Derives the schedule's endpoint keys from a key-only scan, then fetches
/// just those two documents. Empty schedules and endpoints that have been
/// deleted since the scan both surface as [`Error::NotFound`].
pub async fn first_and_last_stop<S>(stop_times: &S, trip_id: &str) -> Result<FirstAndLast, Error>
where
    S: DocumentStore + ?Sized,
{
    let rows = stop_times
        .scan(ScanOptions::prefix(&StopTimeKey::trip_prefix(trip_id), false))
        .await?;

    let first_key = match rows.first() {
        Some(row) => row.key.clone(),
        None => return Err(Error::NotFound(format!("schedule of trip {trip_id}"))),
    };
    let last_key = rows.last().map(|row| row.key.clone()).unwrap_or_default();

    let (first, last) = try_join!(
        get_doc::<StopTime, S>(stop_times, &first_key),
        get_doc::<StopTime, S>(stop_times, &last_key),
    )?;
    Ok(FirstAndLast { first, last })
}

/// The stop time with the earliest arrival at or after `now` (seconds past
/// midnight). When nothing qualifies — the service day is over — the first
/// element of the input is returned instead; an empty input yields `None`.
pub fn next_stop_from_list(schedule: &[StopTime], now: u32) -> Option<&StopTime> {
    let upcoming = schedule
        .iter()
        .filter(|time| time.arrival_time >= now)
        .min_by_key(|time| time.arrival_time);
    upcoming.or_else(|| schedule.first())
}

/// Next stop a trip will reach.
pub async fn next_stop_of_trip<S>(
    stop_times: &S,
    trip_id: &str,
    now: u32,
) -> Result<Option<StopTime>, Error>
where
    S: DocumentStore + ?Sized,
{
    let schedule = get_trip_schedule(stop_times, trip_id).await?;
    Ok(next_stop_from_list(&schedule, now).cloned())
}

/// Next stop any trip of a route will reach. Schedules of all the route's
/// trips are gathered concurrently and combined.
pub async fn next_stop_of_route<S, T>(
    trips: &T,
    stop_times: &S,
    route_id: &str,
    now: u32,
) -> Result<Option<StopTime>, Error>
where
    S: DocumentStore + ?Sized,
    T: DocumentStore + ?Sized,
{
    let trip_rows = trips
        .scan(ScanOptions::prefix(&TripKey::route_prefix(route_id), false))
        .await?;
    let trip_ids: Vec<String> = trip_rows
        .iter()
        .map(|row| TripKey::decode(&row.key).map(|key| key.trip_id))
        .collect::<Result<_, _>>()?;

    let schedules = futures::future::try_join_all(
        trip_ids
            .iter()
            .map(|trip_id| get_trip_schedule(stop_times, trip_id)),
    )
    .await?;
    let combined: Vec<StopTime> = schedules.into_iter().flatten().collect();
    Ok(next_stop_from_list(&combined, now).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest_rows, IngestOptions};
    use crate::serde_support::parse_time;
    use crate::store::MemoryStore;
    use crate::tables::Table;

    async fn schedule_store() -> MemoryStore {
        let store = MemoryStore::new();
        // Twelve stops on t1 to force multi-digit sequences; t2 is short.
        let mut csv = String::from("trip_id,arrival_time,departure_time,stop_id,stop_sequence\n");
        for seq in 1..=12u32 {
            let hour = 7 + (seq - 1) / 4;
            let minute = ((seq - 1) % 4) * 15;
            csv.push_str(&format!(
                "t1,{h:02}:{m:02}:00,{h:02}:{m:02}:30,s{seq},{seq}\n",
                h = hour,
                m = minute
            ));
        }
        csv.push_str("t2,08:00:00,08:00:30,s1,1\n");
        csv.push_str("t2,08:30:00,08:30:30,s5,2\n");
        ingest_rows(Table::StopTimes, csv.as_bytes(), &store, &IngestOptions::default())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn schedule_comes_back_in_sequence_order() {
        let store = schedule_store().await;
        let schedule = get_trip_schedule(&store, "t1").await.unwrap();
        assert_eq!(schedule.len(), 12);
        let sequences: Vec<u32> = schedule.iter().map(|t| t.stop_sequence).collect();
        // 10 after 9, not after 1: padding keeps numeric order.
        assert_eq!(sequences, (1..=12).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn stop_times_for_a_stop_crosses_trips() {
        let store = schedule_store().await;
        let times = stop_times_for_stop(&store, "s5").await.unwrap();
        assert_eq!(times.len(), 2);
        assert!(times.iter().any(|t| t.trip_id == "t1"));
        assert!(times.iter().any(|t| t.trip_id == "t2"));
    }

    #[tokio::test]
    async fn first_and_last_fetch_only_endpoints() {
        let store = schedule_store().await;
        let endpoints = first_and_last_stop(&store, "t1").await.unwrap();
        assert_eq!(endpoints.first.stop_id, "s1");
        assert_eq!(endpoints.last.stop_id, "s12");

        assert!(first_and_last_stop(&store, "ghost")
            .await
            .unwrap_err()
            .is_not_found());
    }

    fn bare_stop_time(arrival: &str, stop_id: &str) -> StopTime {
        StopTime {
            key: format!("time/t/0000000001/{stop_id}"),
            trip_id: "t".into(),
            arrival_time: parse_time(arrival).unwrap(),
            departure_time: parse_time(arrival).unwrap(),
            stop_id: stop_id.into(),
            stop_sequence: 1,
            stop_headsign: None,
            pickup_type: None,
            drop_off_type: None,
            shape_dist_traveled: None,
            timepoint: None,
            extension: Default::default(),
        }
    }

    #[test]
    fn next_stop_picks_earliest_at_or_after_now() {
        let schedule = vec![
            bare_stop_time("08:00:00", "a"),
            bare_stop_time("09:00:00", "b"),
            bare_stop_time("10:00:00", "c"),
        ];
        let now = parse_time("09:30:00").unwrap();
        assert_eq!(next_stop_from_list(&schedule, now).unwrap().stop_id, "c");

        // Past the last arrival the first element is the answer, not an error.
        let late = parse_time("23:00:00").unwrap();
        assert_eq!(next_stop_from_list(&schedule, late).unwrap().stop_id, "a");

        assert!(next_stop_from_list(&[], now).is_none());
    }

    #[tokio::test]
    async fn next_stop_of_route_spans_all_trips() {
        let stop_times = schedule_store().await;
        let trips = MemoryStore::new();
        let csv = "route_id,service_id,trip_id\n10,wk,t1\n10,wk,t2\n";
        ingest_rows(Table::Trips, csv.as_bytes(), &trips, &IngestOptions::default())
            .await
            .unwrap();

        let now = parse_time("08:20:00").unwrap();
        let next = next_stop_of_route(&trips, &stop_times, "10", now)
            .await
            .unwrap()
            .unwrap();
        // Earliest arrival at or after 08:20 across both trips is 08:30.
        assert_eq!(next.arrival_time, parse_time("08:30:00").unwrap());
    }
}
