//! The closed set of the thirteen GTFS tables.
//!
//! Every table is a variant of [`Table`]; each variant knows its canonical
//! name, its source file name, and its transform. Nothing in the crate
//! dispatches on bare table-name strings past this boundary.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::Error;
use crate::transform::{self, Row};

/// One of the thirteen entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Agency,
    Stops,
    Routes,
    Trips,
    StopTimes,
    Calendar,
    CalendarDates,
    FareAttributes,
    FareRules,
    Shapes,
    Frequencies,
    Transfers,
    FeedInfo,
}

/// Canonical ingest order. Parents precede children so a freshly ingested
/// feed is immediately navigable, though nothing depends on this order.
pub const ALL_TABLES: [Table; 13] = [
    Table::Agency,
    Table::Stops,
    Table::Routes,
    Table::Trips,
    Table::StopTimes,
    Table::Calendar,
    Table::CalendarDates,
    Table::FareAttributes,
    Table::FareRules,
    Table::Shapes,
    Table::Frequencies,
    Table::Transfers,
    Table::FeedInfo,
];

impl Table {
    /// Canonical table name, identical to the source file stem.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Agency => "agency",
            Table::Stops => "stops",
            Table::Routes => "routes",
            Table::Trips => "trips",
            Table::StopTimes => "stop_times",
            Table::Calendar => "calendar",
            Table::CalendarDates => "calendar_dates",
            Table::FareAttributes => "fare_attributes",
            Table::FareRules => "fare_rules",
            Table::Shapes => "shapes",
            Table::Frequencies => "frequencies",
            Table::Transfers => "transfers",
            Table::FeedInfo => "feed_info",
        }
    }

    /// File name inside a feed archive or directory, e.g. `stops.txt`.
    pub fn file_name(&self) -> String {
        format!("{}.txt", self.name())
    }

    /// Resolves a table from its name, its file name, or a path ending in
    /// its file name. Anything else is [`Error::UnrecognizedEntity`].
    pub fn from_name(name: &str) -> Result<Table, Error> {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let stem = base.strip_suffix(".txt").unwrap_or(base);
        for table in ALL_TABLES {
            if table.name() == stem {
                return Ok(table);
            }
        }
        Err(Error::UnrecognizedEntity(name.to_owned()))
    }

    /// Applies this table's transform rule: derives the key, coerces the
    /// declared fields and returns the finished document.
    pub fn transform(&self, row: Row) -> Result<Value, Error> {
        match self {
            Table::Agency => transform::agency(row),
            Table::Stops => transform::stop(row),
            Table::Routes => transform::route(row),
            Table::Trips => transform::trip(row),
            Table::StopTimes => transform::stop_time(row),
            Table::Calendar => transform::calendar(row),
            Table::CalendarDates => transform::calendar_date(row),
            Table::FareAttributes => transform::fare_attribute(row),
            Table::FareRules => transform::fare_rule(row),
            Table::Shapes => transform::shape_point(row),
            Table::Frequencies => transform::frequency(row),
            Table::Transfers => transform::transfer(row),
            Table::FeedInfo => transform::feed_info(row),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::from_name(s)
    }
}
