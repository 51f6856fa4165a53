//! Per-table transform rules: a raw field map becomes a typed document with
//! a derived key.
//!
//! Coercion is deliberately forgiving. A declared numeric field that fails
//! to parse is stored as a sentinel ([`INVALID_INT`], NaN, or
//! [`INVALID_SEQUENCE`]) with a `warn!`, never rejected; blank fields are
//! dropped; columns outside the declared set ride along in the document's
//! extension map. The one hard failure besides an unrecognized table is a
//! calendar-exception date that cannot be parsed, because the date is a key
//! segment and an unsortable key would corrupt the exception window scans.

use std::collections::HashMap;

use chrono::NaiveDate;
use log::warn;
use serde_json::Value;

use crate::documents::*;
use crate::error::Error;
use crate::keys::{
    ExceptionKey, FareRuleKey, FrequencyKey, RouteKey, ShapePointKey, StopKey, StopTimeKey,
    TransferKey, TripKey,
};
use crate::serde_support::{parse_date, parse_time};

/// One data row, column names taken verbatim from the table header.
pub type Row = HashMap<String, String>;

fn take(row: &mut Row, name: &str) -> Option<String> {
    row.remove(name).filter(|value| !value.is_empty())
}

fn take_or_default(row: &mut Row, name: &str) -> String {
    take(row, name).unwrap_or_default()
}

/// Whatever the entity rule did not claim is preserved verbatim,
/// minus blanks.
fn leftover(row: Row) -> Extension {
    row.into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
}

fn req_int(table: &str, field: &str, value: Option<String>) -> i64 {
    match value {
        None => INVALID_INT,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{table}: {field} value {raw:?} is not an integer, storing sentinel");
            INVALID_INT
        }),
    }
}

fn opt_int(table: &str, field: &str, value: Option<String>) -> Option<i64> {
    value.map(|raw| req_int(table, field, Some(raw)))
}

fn req_float(table: &str, field: &str, value: Option<String>) -> f64 {
    match value {
        None => f64::NAN,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{table}: {field} value {raw:?} is not a number, storing sentinel");
            f64::NAN
        }),
    }
}

fn opt_float(table: &str, field: &str, value: Option<String>) -> Option<f64> {
    value.map(|raw| req_float(table, field, Some(raw)))
}

fn req_sequence(table: &str, field: &str, value: Option<String>) -> u32 {
    match value {
        None => INVALID_SEQUENCE,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{table}: {field} value {raw:?} is not a sequence number, storing sentinel");
            INVALID_SEQUENCE
        }),
    }
}

fn req_time(table: &str, field: &str, value: Option<String>) -> u32 {
    match value {
        None => INVALID_SEQUENCE,
        Some(raw) => parse_time(&raw).unwrap_or_else(|_| {
            warn!("{table}: {field} value {raw:?} is not a HH:MM:SS time, storing sentinel");
            INVALID_SEQUENCE
        }),
    }
}

/// `1` is true, everything else false.
fn coerce_bool(raw: &str) -> bool {
    raw == "1"
}

fn opt_bool(value: Option<String>) -> Option<bool> {
    value.map(|raw| coerce_bool(&raw))
}

/// An unparsable date falls back to the extension map under its column name.
fn opt_date(table: &str, field: &str, value: Option<String>, ext: &mut Row) -> Option<NaiveDate> {
    let raw = value?;
    match parse_date(&raw) {
        Ok(date) => Some(date),
        Err(_) => {
            warn!("{table}: {field} value {raw:?} is not a YYYYMMDD date, keeping it verbatim");
            ext.insert(field.to_owned(), raw);
            None
        }
    }
}

pub(crate) fn agency(mut row: Row) -> Result<Value, Error> {
    let agency_id = take(&mut row, "agency_id");
    let agency_name = take_or_default(&mut row, "agency_name");
    // Single-agency feeds commonly omit agency_id; the name keys them.
    let key = agency_id.clone().unwrap_or_else(|| agency_name.clone());
    let doc = Agency {
        key,
        agency_id,
        agency_name,
        agency_url: take_or_default(&mut row, "agency_url"),
        agency_timezone: take_or_default(&mut row, "agency_timezone"),
        agency_lang: take(&mut row, "agency_lang"),
        agency_phone: take(&mut row, "agency_phone"),
        agency_fare_url: take(&mut row, "agency_fare_url"),
        agency_email: take(&mut row, "agency_email"),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn stop(mut row: Row) -> Result<Value, Error> {
    let stop_id = take_or_default(&mut row, "stop_id");
    let stop_lat = req_float("stops", "stop_lat", take(&mut row, "stop_lat"));
    let stop_lon = req_float("stops", "stop_lon", take(&mut row, "stop_lon"));
    let key = StopKey {
        stop_id: stop_id.clone(),
        lon: stop_lon,
        lat: stop_lat,
    }
    .encode();
    let doc = Stop {
        key,
        stop_id,
        stop_code: take(&mut row, "stop_code"),
        stop_name: take_or_default(&mut row, "stop_name"),
        stop_desc: take(&mut row, "stop_desc"),
        stop_lat,
        stop_lon,
        zone_id: take(&mut row, "zone_id"),
        stop_url: take(&mut row, "stop_url"),
        location_type: opt_int("stops", "location_type", take(&mut row, "location_type")),
        parent_station: take(&mut row, "parent_station"),
        stop_timezone: take(&mut row, "stop_timezone"),
        wheelchair_boarding: opt_int(
            "stops",
            "wheelchair_boarding",
            take(&mut row, "wheelchair_boarding"),
        ),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn route(mut row: Row) -> Result<Value, Error> {
    let route_id = take_or_default(&mut row, "route_id");
    let doc = Route {
        key: RouteKey {
            route_id: route_id.clone(),
        }
        .encode(),
        route_id,
        agency_id: take(&mut row, "agency_id"),
        route_short_name: take_or_default(&mut row, "route_short_name"),
        route_long_name: take_or_default(&mut row, "route_long_name"),
        route_desc: take(&mut row, "route_desc"),
        route_type: req_int("routes", "route_type", take(&mut row, "route_type")),
        route_url: take(&mut row, "route_url"),
        route_color: take(&mut row, "route_color"),
        route_text_color: take(&mut row, "route_text_color"),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn trip(mut row: Row) -> Result<Value, Error> {
    let route_id = take_or_default(&mut row, "route_id");
    let trip_id = take_or_default(&mut row, "trip_id");
    let key = TripKey {
        route_id: route_id.clone(),
        trip_id: trip_id.clone(),
    }
    .encode();
    let doc = Trip {
        key,
        route_id,
        service_id: take_or_default(&mut row, "service_id"),
        trip_id,
        trip_headsign: take(&mut row, "trip_headsign"),
        trip_short_name: take(&mut row, "trip_short_name"),
        direction_id: opt_bool(take(&mut row, "direction_id")),
        block_id: take(&mut row, "block_id"),
        shape_id: take(&mut row, "shape_id"),
        wheelchair_accessible: opt_int(
            "trips",
            "wheelchair_accessible",
            take(&mut row, "wheelchair_accessible"),
        ),
        bikes_allowed: opt_int("trips", "bikes_allowed", take(&mut row, "bikes_allowed")),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn stop_time(mut row: Row) -> Result<Value, Error> {
    let trip_id = take_or_default(&mut row, "trip_id");
    let stop_id = take_or_default(&mut row, "stop_id");
    let stop_sequence = req_sequence("stop_times", "stop_sequence", take(&mut row, "stop_sequence"));
    let key = StopTimeKey {
        trip_id: trip_id.clone(),
        stop_sequence,
        stop_id: stop_id.clone(),
    }
    .encode();
    let doc = StopTime {
        key,
        trip_id,
        arrival_time: req_time("stop_times", "arrival_time", take(&mut row, "arrival_time")),
        departure_time: req_time(
            "stop_times",
            "departure_time",
            take(&mut row, "departure_time"),
        ),
        stop_id,
        stop_sequence,
        stop_headsign: take(&mut row, "stop_headsign"),
        pickup_type: opt_int("stop_times", "pickup_type", take(&mut row, "pickup_type")),
        drop_off_type: opt_int(
            "stop_times",
            "drop_off_type",
            take(&mut row, "drop_off_type"),
        ),
        shape_dist_traveled: opt_float(
            "stop_times",
            "shape_dist_traveled",
            take(&mut row, "shape_dist_traveled"),
        ),
        timepoint: opt_bool(take(&mut row, "timepoint")),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn calendar(mut row: Row) -> Result<Value, Error> {
    let service_id = take_or_default(&mut row, "service_id");
    let mut day = |name: &str| take(&mut row, name).map(|raw| coerce_bool(&raw)).unwrap_or(false);
    let (monday, tuesday, wednesday, thursday, friday, saturday, sunday) = (
        day("monday"),
        day("tuesday"),
        day("wednesday"),
        day("thursday"),
        day("friday"),
        day("saturday"),
        day("sunday"),
    );
    let mut extra = Row::new();
    let start_date = opt_date("calendar", "start_date", take(&mut row, "start_date"), &mut extra);
    let end_date = opt_date("calendar", "end_date", take(&mut row, "end_date"), &mut extra);
    row.extend(extra);
    let doc = Calendar {
        key: service_id.clone(),
        service_id,
        monday,
        tuesday,
        wednesday,
        thursday,
        friday,
        saturday,
        sunday,
        start_date,
        end_date,
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn calendar_date(mut row: Row) -> Result<Value, Error> {
    let service_id = take_or_default(&mut row, "service_id");
    let raw_date = take_or_default(&mut row, "date");
    // The date is a key segment; there is no sortable sentinel for it.
    let date = parse_date(&raw_date)?;
    let key = ExceptionKey {
        service_id: &service_id,
        date,
    }
    .encode();
    let doc = CalendarDate {
        key,
        service_id,
        date,
        exception_type: req_int(
            "calendar_dates",
            "exception_type",
            take(&mut row, "exception_type"),
        ),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn fare_attribute(mut row: Row) -> Result<Value, Error> {
    let fare_id = take_or_default(&mut row, "fare_id");
    let doc = FareAttribute {
        key: fare_id.clone(),
        fare_id,
        price: take_or_default(&mut row, "price"),
        currency_type: take_or_default(&mut row, "currency_type"),
        payment_method: req_int(
            "fare_attributes",
            "payment_method",
            take(&mut row, "payment_method"),
        ),
        transfers: opt_int("fare_attributes", "transfers", take(&mut row, "transfers")),
        transfer_duration: opt_float(
            "fare_attributes",
            "transfer_duration",
            take(&mut row, "transfer_duration"),
        ),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn fare_rule(mut row: Row) -> Result<Value, Error> {
    let fare_id = take_or_default(&mut row, "fare_id");
    let route_id = take(&mut row, "route_id");
    let origin_id = take(&mut row, "origin_id");
    let destination_id = take(&mut row, "destination_id");
    let contains_id = take(&mut row, "contains_id");
    let key = FareRuleKey {
        fare_id: fare_id.clone(),
        route_id: route_id.clone(),
        origin_id: origin_id.clone(),
        destination_id: destination_id.clone(),
        contains_id: contains_id.clone(),
    }
    .encode();
    let doc = FareRule {
        key,
        fare_id,
        route_id,
        origin_id,
        destination_id,
        contains_id,
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn shape_point(mut row: Row) -> Result<Value, Error> {
    let shape_id = take_or_default(&mut row, "shape_id");
    let shape_pt_sequence = req_sequence(
        "shapes",
        "shape_pt_sequence",
        take(&mut row, "shape_pt_sequence"),
    );
    let key = ShapePointKey {
        shape_id: shape_id.clone(),
        shape_pt_sequence,
    }
    .encode();
    let doc = ShapePoint {
        key,
        shape_id,
        shape_pt_lat: req_float("shapes", "shape_pt_lat", take(&mut row, "shape_pt_lat")),
        shape_pt_lon: req_float("shapes", "shape_pt_lon", take(&mut row, "shape_pt_lon")),
        shape_pt_sequence,
        shape_dist_traveled: opt_float(
            "shapes",
            "shape_dist_traveled",
            take(&mut row, "shape_dist_traveled"),
        ),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn frequency(mut row: Row) -> Result<Value, Error> {
    let trip_id = take_or_default(&mut row, "trip_id");
    let start_time = req_time("frequencies", "start_time", take(&mut row, "start_time"));
    let end_time = req_time("frequencies", "end_time", take(&mut row, "end_time"));
    let key = FrequencyKey {
        trip_id: trip_id.clone(),
        start_time,
        end_time,
    }
    .encode();
    let doc = Frequency {
        key,
        trip_id,
        start_time,
        end_time,
        headway_secs: req_float("frequencies", "headway_secs", take(&mut row, "headway_secs")),
        exact_times: opt_bool(take(&mut row, "exact_times")),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn transfer(mut row: Row) -> Result<Value, Error> {
    let from_stop_id = take_or_default(&mut row, "from_stop_id");
    let to_stop_id = take_or_default(&mut row, "to_stop_id");
    let key = TransferKey {
        from_stop_id: from_stop_id.clone(),
        to_stop_id: to_stop_id.clone(),
    }
    .encode();
    let doc = Transfer {
        key,
        from_stop_id,
        to_stop_id,
        transfer_type: req_int("transfers", "transfer_type", take(&mut row, "transfer_type")),
        min_transfer_time: opt_float(
            "transfers",
            "min_transfer_time",
            take(&mut row, "min_transfer_time"),
        ),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

pub(crate) fn feed_info(mut row: Row) -> Result<Value, Error> {
    let feed_publisher_name = take_or_default(&mut row, "feed_publisher_name");
    let mut extra = Row::new();
    let feed_start_date = opt_date(
        "feed_info",
        "feed_start_date",
        take(&mut row, "feed_start_date"),
        &mut extra,
    );
    let feed_end_date = opt_date(
        "feed_info",
        "feed_end_date",
        take(&mut row, "feed_end_date"),
        &mut extra,
    );
    row.extend(extra);
    let doc = FeedInfo {
        key: feed_publisher_name.clone(),
        feed_publisher_name,
        feed_publisher_url: take_or_default(&mut row, "feed_publisher_url"),
        feed_lang: take_or_default(&mut row, "feed_lang"),
        feed_start_date,
        feed_end_date,
        feed_version: take(&mut row, "feed_version"),
        extension: leftover(row),
    };
    Ok(serde_json::to_value(doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Table;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn agency_without_id_is_keyed_by_name() {
        let doc = Table::Agency
            .transform(row(&[
                ("agency_name", "Hele-On Bus"),
                ("agency_url", "http://heleonbus.org"),
                ("agency_timezone", "Pacific/Honolulu"),
            ]))
            .unwrap();
        assert_eq!(doc["key"], "Hele-On Bus");
        assert_eq!(doc["agency_name"], "Hele-On Bus");
        assert_eq!(doc["agency_url"], "http://heleonbus.org");
        assert_eq!(doc["agency_timezone"], "Pacific/Honolulu");
        assert!(doc.get("agency_id").is_none());
    }

    #[test]
    fn agency_id_wins_over_name() {
        let doc = Table::Agency
            .transform(row(&[("agency_id", "HOB"), ("agency_name", "Hele-On Bus")]))
            .unwrap();
        assert_eq!(doc["key"], "HOB");
    }

    #[test]
    fn stop_key_embeds_coordinates() {
        let doc = Table::Stops
            .transform(row(&[
                ("stop_id", "bd"),
                ("stop_name", "Banyan Drive"),
                ("stop_lat", "19.727129"),
                ("stop_lon", "-155.067175"),
            ]))
            .unwrap();
        assert_eq!(doc["key"], "stop/bd/[-155.067175,19.727129]");
        assert_eq!(doc["stop_lat"], 19.727129);
        assert_eq!(doc["stop_lon"], -155.067175);
    }

    #[test]
    fn invalid_numeric_field_becomes_sentinel() {
        let doc = Table::Routes
            .transform(row(&[("route_id", "10"), ("route_type", "bus")]))
            .unwrap();
        assert_eq!(doc["key"], "route/10");
        assert_eq!(doc["route_type"], INVALID_INT);
    }

    #[test]
    fn stop_time_key_is_trip_then_padded_sequence() {
        let doc = Table::StopTimes
            .transform(row(&[
                ("trip_id", "t1"),
                ("stop_id", "bd"),
                ("stop_sequence", "12"),
                ("arrival_time", "08:00:00"),
                ("departure_time", "08:01:00"),
            ]))
            .unwrap();
        assert_eq!(doc["key"], "time/t1/0000000012/bd");
        assert_eq!(doc["arrival_time"], "08:00:00");
        assert_eq!(doc["stop_sequence"], 12);
    }

    #[test]
    fn blank_fields_are_absent() {
        let doc = Table::Trips
            .transform(row(&[
                ("route_id", "10"),
                ("trip_id", "t1"),
                ("service_id", "wk"),
                ("trip_headsign", ""),
                ("block_id", ""),
            ]))
            .unwrap();
        assert!(doc.get("trip_headsign").is_none());
        assert!(doc.get("block_id").is_none());
    }

    #[test]
    fn unknown_columns_ride_along() {
        let doc = Table::Stops
            .transform(row(&[
                ("stop_id", "bd"),
                ("stop_lat", "19.7"),
                ("stop_lon", "-155.0"),
                ("tts_stop_name", "Banyan Drive"),
            ]))
            .unwrap();
        assert_eq!(doc["tts_stop_name"], "Banyan Drive");
    }

    #[test]
    fn fare_transfers_comes_from_its_own_column() {
        let doc = Table::FareAttributes
            .transform(row(&[
                ("fare_id", "adult"),
                ("price", "2.50"),
                ("currency_type", "USD"),
                ("payment_method", "0"),
                ("transfers", "2"),
            ]))
            .unwrap();
        assert_eq!(doc["payment_method"], 0);
        assert_eq!(doc["transfers"], 2);

        // Blank means unlimited, not a copy of payment_method.
        let unlimited = Table::FareAttributes
            .transform(row(&[
                ("fare_id", "day"),
                ("payment_method", "1"),
                ("transfers", ""),
            ]))
            .unwrap();
        assert!(unlimited.get("transfers").is_none());
    }

    #[test]
    fn calendar_days_and_dates() {
        let doc = Table::Calendar
            .transform(row(&[
                ("service_id", "wk"),
                ("monday", "1"),
                ("tuesday", "1"),
                ("wednesday", "0"),
                ("start_date", "20260101"),
                ("end_date", "20261231"),
            ]))
            .unwrap();
        assert_eq!(doc["key"], "wk");
        assert_eq!(doc["monday"], true);
        assert_eq!(doc["wednesday"], false);
        assert_eq!(doc["start_date"], "20260101");
    }

    #[test]
    fn exception_date_must_parse() {
        let err = Table::CalendarDates
            .transform(row(&[("service_id", "wk"), ("date", "not-a-date")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDate(_)));

        let doc = Table::CalendarDates
            .transform(row(&[
                ("service_id", "wk"),
                ("date", "20260704"),
                ("exception_type", "2"),
            ]))
            .unwrap();
        assert_eq!(doc["key"], "exception/wk/20260704");
        assert_eq!(doc["exception_type"], 2);
    }
}
