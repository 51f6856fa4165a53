//! Derived schedule tables: the trip×stop matrix of a route and the
//! route×weekday grouping of a stop.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use rustc_hash::FxHashMap;

use crate::documents::{Stop, StopTime, Trip};
use crate::error::Error;
use crate::keys::TripKey;
use crate::query::calendar::{get_days, ALL_WEEKDAYS};
use crate::query::stop_times::{get_trip_schedule, stop_times_for_stop};
use crate::query::stops::get_stop;
use crate::query::Weekday;
use crate::store::{get_doc, rows_into_docs, DocumentStore, ScanOptions};

/// One row of a route's schedule table: a trip and its cell per stop
/// column. `start` is the row's earliest arrival, computed once and kept
/// for the sort.
#[derive(Debug, Clone)]
pub struct RouteTableRow {
    pub trip_id: String,
    pub start: Option<u32>,
    /// Aligned with [`RouteScheduleTable::stops`]; `None` marks a stop this
    /// trip skips.
    pub cells: Vec<Option<StopTime>>,
}

/// A route's timetable: columns are the union of stops any of its trips
/// visits, rows are trips sorted by their first arrival.
#[derive(Debug, Clone)]
pub struct RouteScheduleTable {
    pub stops: Vec<Stop>,
    pub rows: Vec<RouteTableRow>,
}

/// Builds the trip×stop matrix for a route, optionally keeping only trips
/// in one direction (read from the trip documents).
pub async fn route_schedule_table<T, ST, SP>(
    trips: &T,
    stop_times: &ST,
    stops: &SP,
    route_id: &str,
    direction_id: Option<bool>,
) -> Result<RouteScheduleTable, Error>
where
    T: DocumentStore + ?Sized,
    ST: DocumentStore + ?Sized,
    SP: DocumentStore + ?Sized,
{
    let rows = trips
        .scan(ScanOptions::prefix(&TripKey::route_prefix(route_id), true))
        .await?;
    let mut route_trips: Vec<Trip> = rows_into_docs(rows)?;
    if let Some(direction) = direction_id {
        route_trips.retain(|trip| trip.direction_id == Some(direction));
    }

    let schedules = try_join_all(
        route_trips
            .iter()
            .map(|trip| get_trip_schedule(stop_times, &trip.trip_id)),
    )
    .await?;

    // Columns in order of first appearance across the route's schedules.
    let mut stop_order: Vec<String> = Vec::new();
    let mut schedule_maps: Vec<FxHashMap<String, StopTime>> = Vec::with_capacity(schedules.len());
    for schedule in schedules {
        let mut by_stop = FxHashMap::default();
        for time in schedule {
            if !stop_order.contains(&time.stop_id) {
                stop_order.push(time.stop_id.clone());
            }
            by_stop.insert(time.stop_id.clone(), time);
        }
        schedule_maps.push(by_stop);
    }

    let stop_docs = try_join_all(stop_order.iter().map(|stop_id| get_stop(stops, stop_id))).await?;

    let mut table_rows: Vec<RouteTableRow> = route_trips
        .into_iter()
        .zip(schedule_maps)
        .map(|(trip, mut by_stop)| {
            let cells: Vec<Option<StopTime>> = stop_order
                .iter()
                .map(|stop_id| by_stop.remove(stop_id))
                .collect();
            let start = cells
                .iter()
                .flatten()
                .map(|time| time.arrival_time)
                .min();
            RouteTableRow {
                trip_id: trip.trip_id,
                start,
                cells,
            }
        })
        .collect();

    // Rows without any stop time sink to the bottom.
    table_rows.sort_by_key(|row| row.start.unwrap_or(u32::MAX));

    Ok(RouteScheduleTable {
        stops: stop_docs,
        rows: table_rows,
    })
}

/// Index into the schedule arena of a [`StopScheduleTable`]. Two weekdays
/// carrying the same handle share one schedule, detectably so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(usize);

/// A stop's stop times grouped by route, one entry per distinct weekday
/// schedule.
pub type StopScheduleEntry = BTreeMap<String, Vec<StopTime>>;

/// A stop's timetable keyed by weekday. Weekdays with content-equal
/// schedules share a single arena entry, so duplication is visible by
/// comparing handles instead of deep-comparing lists.
#[derive(Debug, Clone)]
pub struct StopScheduleTable {
    schedules: Vec<StopScheduleEntry>,
    by_day: BTreeMap<Weekday, ScheduleHandle>,
}

impl StopScheduleTable {
    /// The handle for a weekday, when any service runs that day.
    pub fn handle(&self, day: Weekday) -> Option<ScheduleHandle> {
        self.by_day.get(&day).copied()
    }

    /// The schedule behind a weekday's handle.
    pub fn entry(&self, day: Weekday) -> Option<&StopScheduleEntry> {
        self.handle(day).map(|handle| &self.schedules[handle.0])
    }

    /// Number of distinct schedules across the week.
    pub fn distinct_schedules(&self) -> usize {
        self.schedules.len()
    }

    pub fn days(&self) -> impl Iterator<Item = Weekday> + '_ {
        self.by_day.keys().copied()
    }
}

/// Builds the route×weekday table for one stop.
///
/// Stop times are grouped by owning trip, trips by the weekdays their
/// calendar is active on. Weekdays whose trip lists are identical share a
/// handle into the schedule arena rather than duplicating the entry.
pub async fn stop_schedule_table<T, ST, C>(
    trips: &T,
    stop_times: &ST,
    calendars: &C,
    stop_id: &str,
) -> Result<StopScheduleTable, Error>
where
    T: DocumentStore + ?Sized,
    ST: DocumentStore + ?Sized,
    C: DocumentStore + ?Sized,
{
    let times = stop_times_for_stop(stop_times, stop_id).await?;

    // Group the stop's times by owning trip, trips in sorted id order so
    // the derived lists are deterministic.
    let mut times_by_trip: BTreeMap<String, Vec<StopTime>> = BTreeMap::new();
    for time in times {
        times_by_trip
            .entry(time.trip_id.clone())
            .or_default()
            .push(time);
    }

    // One key scan resolves trip ids to their document keys and routes.
    let trip_rows = trips
        .scan(ScanOptions::prefix(TripKey::table_prefix(), false))
        .await?;
    let mut key_by_trip: FxHashMap<String, String> = FxHashMap::default();
    for row in trip_rows {
        let decoded = TripKey::decode(&row.key)?;
        if times_by_trip.contains_key(&decoded.trip_id) {
            key_by_trip.insert(decoded.trip_id, row.key);
        }
    }

    let trip_docs: Vec<Trip> = try_join_all(times_by_trip.keys().map(|trip_id| {
        let key = key_by_trip.get(trip_id).cloned();
        async move {
            match key {
                Some(key) => get_doc(trips, &key).await,
                None => Err(Error::NotFound(format!("trip {trip_id}"))),
            }
        }
    }))
    .await?;

    let day_sets = try_join_all(
        trip_docs
            .iter()
            .map(|trip| get_days(calendars, &trip.service_id)),
    )
    .await?;

    let mut trips_in_day: BTreeMap<Weekday, Vec<String>> = BTreeMap::new();
    let mut route_by_trip: FxHashMap<String, String> = FxHashMap::default();
    for (trip, days) in trip_docs.iter().zip(day_sets) {
        route_by_trip.insert(trip.trip_id.clone(), trip.route_id.clone());
        for day in days {
            trips_in_day
                .entry(day)
                .or_default()
                .push(trip.trip_id.clone());
        }
    }

    // Content-equal trip lists collapse onto one arena entry.
    let mut schedules: Vec<StopScheduleEntry> = Vec::new();
    let mut grouped: Vec<(Vec<String>, ScheduleHandle)> = Vec::new();
    let mut by_day = BTreeMap::new();
    for day in ALL_WEEKDAYS {
        let list = match trips_in_day.get(&day) {
            Some(list) => list,
            None => continue,
        };
        let handle = match grouped.iter().find(|(seen, _)| seen == list) {
            Some((_, handle)) => *handle,
            None => {
                let mut entry = StopScheduleEntry::new();
                for trip_id in list {
                    let route_id = route_by_trip[trip_id].clone();
                    entry
                        .entry(route_id)
                        .or_default()
                        .extend(times_by_trip[trip_id].iter().cloned());
                }
                schedules.push(entry);
                let handle = ScheduleHandle(schedules.len() - 1);
                grouped.push((list.clone(), handle));
                handle
            }
        };
        by_day.insert(day, handle);
    }

    Ok(StopScheduleTable { schedules, by_day })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest_rows, IngestOptions};
    use crate::serde_support::parse_time;
    use crate::store::MemoryStore;
    use crate::tables::Table;

    async fn seeded(table: Table, csv: &str) -> MemoryStore {
        let store = MemoryStore::new();
        ingest_rows(table, csv.as_bytes(), &store, &IngestOptions::default())
            .await
            .unwrap();
        store
    }

    async fn route_fixture() -> (MemoryStore, MemoryStore, MemoryStore) {
        let trips = seeded(
            Table::Trips,
            "route_id,service_id,trip_id,direction_id\n\
             10,wk,east,0\n\
             10,wk,west,1\n\
             10,wk,express,0\n",
        )
        .await;
        // express leaves first and skips the middle stop.
        let stop_times = seeded(
            Table::StopTimes,
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             east,09:00:00,09:01:00,a,1\n\
             east,09:10:00,09:11:00,b,2\n\
             east,09:20:00,09:21:00,c,3\n\
             express,08:00:00,08:01:00,a,1\n\
             express,08:12:00,08:13:00,c,2\n\
             west,10:00:00,10:01:00,c,1\n\
             west,10:20:00,10:21:00,a,3\n",
        )
        .await;
        let stops = seeded(
            Table::Stops,
            "stop_id,stop_name,stop_lat,stop_lon\n\
             a,Alpha,19.7,-155.1\n\
             b,Bravo,19.8,-155.2\n\
             c,Charlie,19.9,-155.3\n",
        )
        .await;
        (trips, stop_times, stops)
    }

    #[tokio::test]
    async fn route_table_rows_sort_by_start_and_skip_cells() {
        let (trips, stop_times, stops) = route_fixture().await;
        let table = route_schedule_table(&trips, &stop_times, &stops, "10", None)
            .await
            .unwrap();

        let trip_order: Vec<_> = table.rows.iter().map(|r| r.trip_id.as_str()).collect();
        assert_eq!(trip_order, ["express", "east", "west"]);
        assert_eq!(table.rows[0].start, Some(parse_time("08:00:00").unwrap()));

        // Columns are the union of visited stops; express skips b.
        let stop_ids: Vec<_> = table.stops.iter().map(|s| s.stop_id.as_str()).collect();
        assert_eq!(stop_ids.len(), 3);
        let b_column = stop_ids.iter().position(|id| *id == "b").unwrap();
        assert!(table.rows[0].cells[b_column].is_none());
        assert!(table.rows[1].cells[b_column].is_some());
    }

    #[tokio::test]
    async fn route_table_direction_filter() {
        let (trips, stop_times, stops) = route_fixture().await;
        let eastbound = route_schedule_table(&trips, &stop_times, &stops, "10", Some(false))
            .await
            .unwrap();
        let trip_order: Vec<_> = eastbound.rows.iter().map(|r| r.trip_id.as_str()).collect();
        assert_eq!(trip_order, ["express", "east"]);

        let westbound = route_schedule_table(&trips, &stop_times, &stops, "10", Some(true))
            .await
            .unwrap();
        assert_eq!(westbound.rows.len(), 1);
        assert_eq!(westbound.rows[0].trip_id, "west");
    }

    #[tokio::test]
    async fn identical_weekday_schedules_share_a_handle() {
        let trips = seeded(
            Table::Trips,
            "route_id,service_id,trip_id\n\
             10,weekday,wk-trip\n\
             10,weekend,sat-trip\n",
        )
        .await;
        let stop_times = seeded(
            Table::StopTimes,
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             wk-trip,09:00:00,09:01:00,here,4\n\
             sat-trip,11:00:00,11:01:00,here,2\n",
        )
        .await;
        let calendars = seeded(
            Table::Calendar,
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday\n\
             weekday,1,1,1,1,1,0,0\n\
             weekend,0,0,0,0,0,1,0\n",
        )
        .await;

        let table = stop_schedule_table(&trips, &stop_times, &calendars, "here")
            .await
            .unwrap();

        // Monday through Friday run the same single trip: one shared handle.
        let monday = table.handle(Weekday::Monday).unwrap();
        let friday = table.handle(Weekday::Friday).unwrap();
        assert_eq!(monday, friday);
        let saturday = table.handle(Weekday::Saturday).unwrap();
        assert_ne!(monday, saturday);
        assert!(table.handle(Weekday::Sunday).is_none());
        assert_eq!(table.distinct_schedules(), 2);

        let weekday_entry = table.entry(Weekday::Wednesday).unwrap();
        let times = &weekday_entry["10"];
        assert_eq!(times.len(), 1);
        assert_eq!(times[0].trip_id, "wk-trip");
        let saturday_entry = table.entry(Weekday::Saturday).unwrap();
        assert_eq!(saturday_entry["10"][0].trip_id, "sat-trip");
    }
}
