//! Codec registry: the bidirectional mapping between structured identity
//! fields and the single sortable string key of each document.
//!
//! Keys are ordered templates of segments joined by `/`. Segment order is
//! scan order: all children of one parent (a trip's stop times, a shape's
//! points, a route's trips) share an unbroken prefix, so one range scan
//! retrieves exactly that child set. Numeric segments are fixed-width
//! zero-padded so lexicographic order equals numeric order.
//!
//! The round-trip law holds for every codec here: `encode(decode(k)) == k`
//! for well-formed keys and `decode(encode(fields)) == fields`. Ids that
//! contain the `/` delimiter are not representable; decoding rejects keys
//! whose segment count does not match the template.

use chrono::NaiveDate;

use crate::error::Error;
use crate::serde_support::{format_date, format_time, parse_date, parse_time};

/// Width of zero-padded sequence segments. Covers the full `u32` range.
pub const SEQUENCE_WIDTH: usize = 10;

/// Sorts above any character that can appear in a key, closing a prefix
/// scan the way `\u{ffff}` closes one in UTF-16 stores.
pub const HIGH_FENCE: char = '\u{10FFFF}';

/// Bounds for a scan over every key starting with `prefix`.
pub fn prefix_range(prefix: &str) -> (String, String) {
    (prefix.to_owned(), format!("{prefix}{HIGH_FENCE}"))
}

fn pad_sequence(sequence: u32) -> String {
    format!("{sequence:0width$}", width = SEQUENCE_WIDTH)
}

fn parse_sequence(segment: &str, key: &str, expected: &'static str) -> Result<u32, Error> {
    segment.parse().map_err(|_| Error::MalformedKey {
        key: key.to_owned(),
        expected,
    })
}

fn split_exact<'a, const N: usize>(
    key: &'a str,
    head: &str,
    expected: &'static str,
) -> Result<[&'a str; N], Error> {
    let malformed = || Error::MalformedKey {
        key: key.to_owned(),
        expected,
    };
    let mut parts = key.split('/');
    if parts.next() != Some(head) {
        return Err(malformed());
    }
    let mut out = [""; N];
    for slot in out.iter_mut() {
        *slot = parts.next().ok_or_else(malformed)?;
    }
    if parts.next().is_some() {
        return Err(malformed());
    }
    Ok(out)
}

/// `trip/{route_id}/{trip_id}` — groups a route's trips contiguously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripKey {
    pub route_id: String,
    pub trip_id: String,
}

impl TripKey {
    pub fn encode(&self) -> String {
        format!("trip/{}/{}", self.route_id, self.trip_id)
    }

    pub fn decode(key: &str) -> Result<Self, Error> {
        let [route_id, trip_id] = split_exact(key, "trip", "trip")?;
        Ok(Self {
            route_id: route_id.to_owned(),
            trip_id: trip_id.to_owned(),
        })
    }

    /// Prefix shared by every trip of one route.
    pub fn route_prefix(route_id: &str) -> String {
        format!("trip/{route_id}/")
    }

    /// Prefix shared by the whole table.
    pub fn table_prefix() -> &'static str {
        "trip/"
    }
}

/// `time/{trip_id}/{stop_sequence}/{stop_id}` — groups a trip's stop times
/// contiguously, in sequence order by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTimeKey {
    pub trip_id: String,
    pub stop_sequence: u32,
    pub stop_id: String,
}

impl StopTimeKey {
    pub fn encode(&self) -> String {
        format!(
            "time/{}/{}/{}",
            self.trip_id,
            pad_sequence(self.stop_sequence),
            self.stop_id
        )
    }

    pub fn decode(key: &str) -> Result<Self, Error> {
        let [trip_id, sequence, stop_id] = split_exact(key, "time", "stop_time")?;
        Ok(Self {
            trip_id: trip_id.to_owned(),
            stop_sequence: parse_sequence(sequence, key, "stop_time")?,
            stop_id: stop_id.to_owned(),
        })
    }

    /// Prefix shared by one trip's schedule.
    pub fn trip_prefix(trip_id: &str) -> String {
        format!("time/{trip_id}/")
    }

    pub fn table_prefix() -> &'static str {
        "time/"
    }
}

/// `shape/{shape_id}/{shape_pt_sequence}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapePointKey {
    pub shape_id: String,
    pub shape_pt_sequence: u32,
}

impl ShapePointKey {
    pub fn encode(&self) -> String {
        format!("shape/{}/{}", self.shape_id, pad_sequence(self.shape_pt_sequence))
    }

    pub fn decode(key: &str) -> Result<Self, Error> {
        let [shape_id, sequence] = split_exact(key, "shape", "shape_point")?;
        Ok(Self {
            shape_id: shape_id.to_owned(),
            shape_pt_sequence: parse_sequence(sequence, key, "shape_point")?,
        })
    }

    pub fn shape_prefix(shape_id: &str) -> String {
        format!("shape/{shape_id}/")
    }
}

/// `frequency/{trip_id}/{start_time}/{end_time}`, times as zero-padded
/// `HH:MM:SS` so one trip's windows sort by start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyKey {
    pub trip_id: String,
    pub start_time: u32,
    pub end_time: u32,
}

impl FrequencyKey {
    pub fn encode(&self) -> String {
        format!(
            "frequency/{}/{}/{}",
            self.trip_id,
            format_time(self.start_time),
            format_time(self.end_time)
        )
    }

    pub fn decode(key: &str) -> Result<Self, Error> {
        let [trip_id, start, end] = split_exact(key, "frequency", "frequency")?;
        let malformed = |_| Error::MalformedKey {
            key: key.to_owned(),
            expected: "frequency",
        };
        Ok(Self {
            trip_id: trip_id.to_owned(),
            start_time: parse_time(start).map_err(malformed)?,
            end_time: parse_time(end).map_err(malformed)?,
        })
    }

    pub fn trip_prefix(trip_id: &str) -> String {
        format!("frequency/{trip_id}/")
    }
}

/// `transfer/{from_stop_id}/{to_stop_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferKey {
    pub from_stop_id: String,
    pub to_stop_id: String,
}

impl TransferKey {
    pub fn encode(&self) -> String {
        format!("transfer/{}/{}", self.from_stop_id, self.to_stop_id)
    }

    pub fn decode(key: &str) -> Result<Self, Error> {
        let [from, to] = split_exact(key, "transfer", "transfer")?;
        Ok(Self {
            from_stop_id: from.to_owned(),
            to_stop_id: to.to_owned(),
        })
    }

    /// Prefix shared by every transfer leaving one stop.
    pub fn from_prefix(from_stop_id: &str) -> String {
        format!("transfer/{from_stop_id}/")
    }
}

/// `exception/{service_id}/{date}` with the date in fixed-width `YYYYMMDD`,
/// so a date window is a single range scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionKey<'a> {
    pub service_id: &'a str,
    pub date: NaiveDate,
}

/// Owned form of a decoded exception key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedExceptionKey {
    pub service_id: String,
    pub date: NaiveDate,
}

impl ExceptionKey<'_> {
    pub fn encode(&self) -> String {
        format!("exception/{}/{}", self.service_id, format_date(self.date))
    }

    pub fn decode(key: &str) -> Result<DecodedExceptionKey, Error> {
        let [service_id, date] = split_exact(key, "exception", "exception")?;
        let date = parse_date(date).map_err(|_| Error::MalformedKey {
            key: key.to_owned(),
            expected: "exception",
        })?;
        Ok(DecodedExceptionKey {
            service_id: service_id.to_owned(),
            date,
        })
    }

    pub fn service_prefix(service_id: &str) -> String {
        format!("exception/{service_id}/")
    }
}

/// `stop/{stop_id}/[{lon},{lat}]` — identity plus location in one key, so
/// bulk geospatial listing never fetches document bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct StopKey {
    pub stop_id: String,
    pub lon: f64,
    pub lat: f64,
}

impl StopKey {
    pub fn encode(&self) -> String {
        format!("stop/{}/[{},{}]", self.stop_id, self.lon, self.lat)
    }

    pub fn decode(key: &str) -> Result<Self, Error> {
        let malformed = || Error::MalformedKey {
            key: key.to_owned(),
            expected: "stop",
        };
        let [stop_id, position] = split_exact(key, "stop", "stop")?;
        let position = position
            .strip_prefix('[')
            .and_then(|p| p.strip_suffix(']'))
            .ok_or_else(malformed)?;
        let (lon, lat) = position.split_once(',').ok_or_else(malformed)?;
        Ok(Self {
            stop_id: stop_id.to_owned(),
            lon: lon.parse().map_err(|_| malformed())?,
            lat: lat.parse().map_err(|_| malformed())?,
        })
    }

    /// Prefix locating a stop when only its id is known.
    pub fn stop_prefix(stop_id: &str) -> String {
        format!("stop/{stop_id}/")
    }

    pub fn table_prefix() -> &'static str {
        "stop/"
    }
}

/// `route/{route_id}` — prefixed to keep route keys out of the way of any
/// other single-field identity sharing a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteKey {
    pub route_id: String,
}

impl RouteKey {
    pub fn encode(&self) -> String {
        format!("route/{}", self.route_id)
    }

    pub fn decode(key: &str) -> Result<Self, Error> {
        let [route_id] = split_exact(key, "route", "route")?;
        Ok(Self {
            route_id: route_id.to_owned(),
        })
    }
}

/// `rule/{fare_id}/{route_id},{origin_id},{destination_id},{contains_id}`
/// — a fare's rules group under the fare, with the optional match fields
/// (absent ones empty) disambiguating rules of one fare.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FareRuleKey {
    pub fare_id: String,
    pub route_id: Option<String>,
    pub origin_id: Option<String>,
    pub destination_id: Option<String>,
    pub contains_id: Option<String>,
}

impl FareRuleKey {
    pub fn encode(&self) -> String {
        let part = |field: &Option<String>| field.clone().unwrap_or_default();
        format!(
            "rule/{}/{},{},{},{}",
            self.fare_id,
            part(&self.route_id),
            part(&self.origin_id),
            part(&self.destination_id),
            part(&self.contains_id)
        )
    }

    pub fn decode(key: &str) -> Result<Self, Error> {
        let malformed = || Error::MalformedKey {
            key: key.to_owned(),
            expected: "fare_rule",
        };
        let [fare_id, matches] = split_exact(key, "rule", "fare_rule")?;
        let mut parts = matches.split(',');
        let mut next = || -> Result<Option<String>, Error> {
            let part = parts.next().ok_or_else(malformed)?;
            Ok(if part.is_empty() {
                None
            } else {
                Some(part.to_owned())
            })
        };
        let decoded = Self {
            fare_id: fare_id.to_owned(),
            route_id: next()?,
            origin_id: next()?,
            destination_id: next()?,
            contains_id: next()?,
        };
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(decoded)
    }

    pub fn fare_prefix(fare_id: &str) -> String {
        format!("rule/{fare_id}/")
    }
}
