//! The thirteen document types, one per GTFS table.
//!
//! Documents stay close to their tabular representation: declared fields are
//! typed, blank fields are absent, and columns this crate does not know about
//! are preserved verbatim in the flattened `extension` map so they survive
//! the round trip through the store and snapshots.
//!
//! Every document carries its derived `key`, the store identifier produced
//! by the codecs in [`crate::keys`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::serde_support::{
    deserialize_date, deserialize_lossy_float, deserialize_option_date, deserialize_time,
    serialize_date, serialize_option_date, serialize_time,
};

/// Sentinel stored when a declared integer field fails to parse.
/// Coercion failures are deliberately non-fatal; see the transform rules.
pub const INVALID_INT: i64 = i64::MIN;

/// Sentinel stored when a declared sequence or time-of-day field fails to
/// parse. Sorts after every valid value.
pub const INVALID_SEQUENCE: u32 = u32::MAX;

/// Extra columns carried through unchanged. Sorted for deterministic output.
/// An empty map flattens to no fields at all.
pub type Extension = BTreeMap<String, String>;

/// A transit operator. Keyed by `agency_id`, falling back to `agency_name`
/// for the common single-agency feed that omits the id column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,
    pub agency_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub agency_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub agency_timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_fare_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_email: Option<String>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// A physical stop or station. The key embeds `[lon,lat]` so listings can
/// read position without fetching the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub key: String,
    pub stop_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_code: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stop_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_desc: Option<String>,
    #[serde(deserialize_with = "deserialize_lossy_float")]
    pub stop_lat: f64,
    #[serde(deserialize_with = "deserialize_lossy_float")]
    pub stop_lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheelchair_boarding: Option<i64>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// A line riders recognize, keyed `route/{route_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub key: String,
    pub route_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub route_short_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub route_long_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_desc: Option<String>,
    pub route_type: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_text_color: Option<String>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// One vehicle run along a route, keyed `trip/{route_id}/{trip_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub key: String,
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_headsign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_id: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheelchair_accessible: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bikes_allowed: Option<i64>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// One scheduled call of a trip at a stop. Keyed by trip then zero-padded
/// sequence, so a trip's schedule scans out already ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTime {
    pub key: String,
    pub trip_id: String,
    #[serde(
        deserialize_with = "deserialize_time",
        serialize_with = "serialize_time"
    )]
    pub arrival_time: u32,
    #[serde(
        deserialize_with = "deserialize_time",
        serialize_with = "serialize_time"
    )]
    pub departure_time: u32,
    pub stop_id: String,
    pub stop_sequence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_headsign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_off_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_dist_traveled: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timepoint: Option<bool>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// Weekly service pattern, keyed by raw `service_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub key: String,
    pub service_id: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_option_date",
        serialize_with = "serialize_option_date"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_option_date",
        serialize_with = "serialize_option_date"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// Service added (1) or removed (2) on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDate {
    pub key: String,
    pub service_id: String,
    #[serde(
        deserialize_with = "deserialize_date",
        serialize_with = "serialize_date"
    )]
    pub date: NaiveDate,
    pub exception_type: i64,
    #[serde(flatten)]
    pub extension: Extension,
}

/// Fare pricing, keyed by raw `fare_id`. The price stays textual; currencies
/// disagree about decimal places and the value is display-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareAttribute {
    pub key: String,
    pub fare_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub price: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub currency_type: String,
    pub payment_method: i64,
    /// Permitted transfer count; absent means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfers: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_duration: Option<f64>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// Which itineraries a fare applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareRule {
    pub key: String,
    pub fare_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_id: Option<String>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// One vertex of a route geometry, keyed by shape then padded sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePoint {
    pub key: String,
    pub shape_id: String,
    #[serde(deserialize_with = "deserialize_lossy_float")]
    pub shape_pt_lat: f64,
    #[serde(deserialize_with = "deserialize_lossy_float")]
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_dist_traveled: Option<f64>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// Headway-based service over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frequency {
    pub key: String,
    pub trip_id: String,
    #[serde(
        deserialize_with = "deserialize_time",
        serialize_with = "serialize_time"
    )]
    pub start_time: u32,
    #[serde(
        deserialize_with = "deserialize_time",
        serialize_with = "serialize_time"
    )]
    pub end_time: u32,
    #[serde(deserialize_with = "deserialize_lossy_float")]
    pub headway_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_times: Option<bool>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// Connection quality between a pair of stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub key: String,
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub transfer_type: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_transfer_time: Option<f64>,
    #[serde(flatten)]
    pub extension: Extension,
}

/// Publisher metadata, keyed by `feed_publisher_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedInfo {
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feed_publisher_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feed_publisher_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feed_lang: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_option_date",
        serialize_with = "serialize_option_date"
    )]
    pub feed_start_date: Option<NaiveDate>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_option_date",
        serialize_with = "serialize_option_date"
    )]
    pub feed_end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_version: Option<String>,
    #[serde(flatten)]
    pub extension: Extension,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stop_round_trips_with_extension_fields() {
        let doc = json!({
            "key": "stop/bd/[-155.067175,19.727129]",
            "stop_id": "bd",
            "stop_name": "Banyan Drive",
            "stop_lat": 19.727129,
            "stop_lon": -155.067175,
            "tts_stop_name": "Banyan Drive"
        });
        let stop: Stop = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(stop.stop_id, "bd");
        assert_eq!(stop.extension["tts_stop_name"], "Banyan Drive");
        assert!(stop.stop_desc.is_none());

        let back = serde_json::to_value(&stop).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn invalid_coordinate_survives_the_json_round_trip_as_nan() {
        let stop = Stop {
            key: "stop/x/[NaN,NaN]".into(),
            stop_id: "x".into(),
            stop_code: None,
            stop_name: String::new(),
            stop_desc: None,
            stop_lat: f64::NAN,
            stop_lon: f64::NAN,
            zone_id: None,
            stop_url: None,
            location_type: None,
            parent_station: None,
            stop_timezone: None,
            wheelchair_boarding: None,
            extension: Extension::new(),
        };
        let doc = serde_json::to_value(&stop).unwrap();
        // JSON has no NaN; the sentinel is carried as null.
        assert!(doc["stop_lat"].is_null());
        let back: Stop = serde_json::from_value(doc).unwrap();
        assert!(back.stop_lat.is_nan());
    }

    #[test]
    fn stop_time_times_serialize_as_clock_text() {
        let doc = json!({
            "key": "time/t1/0000000002/bd",
            "trip_id": "t1",
            "arrival_time": "08:00:00",
            "departure_time": "25:30:00",
            "stop_id": "bd",
            "stop_sequence": 2
        });
        let time: StopTime = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(time.arrival_time, 8 * 3600);
        assert_eq!(time.departure_time, 25 * 3600 + 1800);
        assert_eq!(serde_json::to_value(&time).unwrap(), doc);
    }
}
