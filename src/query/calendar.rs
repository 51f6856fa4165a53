//! Service-calendar evaluation: active weekday sets, their human-readable
//! descriptions, and upcoming calendar exceptions.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::documents::{Calendar, CalendarDate};
use crate::error::Error;
use crate::keys::ExceptionKey;
use crate::serde_support::format_date;
use crate::store::{get_doc, rows_into_docs, DocumentStore, ScanOptions};

/// Weekday numbering used throughout the schedule views: Sunday is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Sunday,
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
];

impl Weekday {
    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }
}

/// The set of weekdays a calendar entry is active on.
pub async fn get_days<S>(calendars: &S, service_id: &str) -> Result<BTreeSet<Weekday>, Error>
where
    S: DocumentStore + ?Sized,
{
    let cal: Calendar = get_doc(calendars, service_id).await?;
    let mut days = BTreeSet::new();
    let flags = [
        (cal.sunday, Weekday::Sunday),
        (cal.monday, Weekday::Monday),
        (cal.tuesday, Weekday::Tuesday),
        (cal.wednesday, Weekday::Wednesday),
        (cal.thursday, Weekday::Thursday),
        (cal.friday, Weekday::Friday),
        (cal.saturday, Weekday::Saturday),
    ];
    for (active, day) in flags {
        if active {
            days.insert(day);
        }
    }
    Ok(days)
}

/// Describes a weekday set the way a printed timetable would.
///
/// All seven days: `Daily`. One day: `Monday Only`. A run with no gaps in
/// the numerically sorted set: `Monday - Friday`. Anything else joins the
/// days with ` & `. An empty set is the caller's bug and reads `Never`.
pub fn describe_days(days: &BTreeSet<Weekday>) -> String {
    if days.is_empty() {
        return "Never".to_owned();
    }
    if days.len() >= 7 {
        return "Daily".to_owned();
    }

    let sorted: Vec<Weekday> = days.iter().copied().collect();
    if let [only] = sorted.as_slice() {
        return format!("{} Only", only.name());
    }

    // Contiguity is judged on the sorted set, never on insertion order.
    let uninterrupted = sorted
        .windows(2)
        .all(|pair| pair[1].index() == pair[0].index() + 1);
    if uninterrupted {
        let first = sorted[0];
        let last = sorted[sorted.len() - 1];
        return format!("{} - {}", first.name(), last.name());
    }

    sorted
        .iter()
        .map(|day| day.name())
        .collect::<Vec<_>>()
        .join(" & ")
}

/// Calendar exceptions for `service_id` falling inside the closed window
/// `[today, today + duration]`, via a single range scan.
pub async fn upcoming_exceptions<S>(
    exceptions: &S,
    service_id: &str,
    duration: Duration,
    today: NaiveDate,
) -> Result<Vec<CalendarDate>, Error>
where
    S: DocumentStore + ?Sized,
{
    let prefix = ExceptionKey::service_prefix(service_id);
    let start = format!("{prefix}{}", format_date(today));
    let end = format!("{prefix}{}", format_date(today + duration));
    let rows = exceptions
        .scan(ScanOptions {
            start: Some(start),
            end: Some(end),
            include_docs: true,
            ..Default::default()
        })
        .await?;
    rows_into_docs(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest_rows, IngestOptions};
    use crate::store::MemoryStore;
    use crate::tables::Table;

    fn day_set(days: &[Weekday]) -> BTreeSet<Weekday> {
        days.iter().copied().collect()
    }

    #[test]
    fn describes_day_sets() {
        use Weekday::*;
        assert_eq!(describe_days(&day_set(&ALL_WEEKDAYS)), "Daily");
        assert_eq!(describe_days(&day_set(&[Wednesday])), "Wednesday Only");
        assert_eq!(
            describe_days(&day_set(&[Monday, Tuesday, Wednesday, Thursday, Friday])),
            "Monday - Friday"
        );
        assert_eq!(describe_days(&day_set(&[Sunday, Saturday])), "Sunday & Saturday");
        assert_eq!(
            describe_days(&day_set(&[Monday, Wednesday, Friday])),
            "Monday & Wednesday & Friday"
        );
        // Insertion order must not matter; only numeric order does.
        let mut reversed = BTreeSet::new();
        reversed.insert(Weekday::Thursday);
        reversed.insert(Weekday::Tuesday);
        reversed.insert(Weekday::Wednesday);
        assert_eq!(describe_days(&reversed), "Tuesday - Thursday");
    }

    async fn calendar_store() -> MemoryStore {
        let store = MemoryStore::new();
        let csv = "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
                   wk,1,1,1,1,1,0,0,20260101,20261231\n";
        ingest_rows(Table::Calendar, csv.as_bytes(), &store, &IngestOptions::default())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn weekday_set_of_a_calendar() {
        let store = calendar_store().await;
        let days = get_days(&store, "wk").await.unwrap();
        assert_eq!(days.len(), 5);
        assert!(days.contains(&Weekday::Monday));
        assert!(!days.contains(&Weekday::Saturday));
        assert_eq!(describe_days(&days), "Monday - Friday");
        assert!(get_days(&store, "absent").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn exception_window_is_closed() {
        let store = MemoryStore::new();
        let csv = "service_id,date,exception_type\n\
                   wk,20260101,2\n\
                   wk,20260315,1\n\
                   wk,20260410,2\n\
                   other,20260316,1\n";
        ingest_rows(Table::CalendarDates, csv.as_bytes(), &store, &IngestOptions::default())
            .await
            .unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let upcoming = upcoming_exceptions(&store, "wk", Duration::days(26), today)
            .await
            .unwrap();
        let dates: Vec<_> = upcoming.iter().map(|e| format_date(e.date)).collect();
        // Both window endpoints are included; other services are not.
        assert_eq!(dates, ["20260315", "20260410"]);
    }
}
