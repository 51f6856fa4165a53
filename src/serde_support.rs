//! (De)serialization helpers for the GTFS text formats: `YYYYMMDD` dates,
//! `HH:MM:SS` times of day (hours may exceed 24), and floats that keep a NaN
//! sentinel across a JSON round trip.

use chrono::NaiveDate;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::Serializer;

use crate::error::Error;

/// Parses a `YYYYMMDD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| Error::InvalidDate(s.to_owned()))
}

/// Formats a date back to its fixed-width sortable `YYYYMMDD` form.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_date(&s).map_err(de::Error::custom)
}

pub fn serialize_date<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_date(*date))
}

pub fn deserialize_option_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_date(&s).map(Some).map_err(de::Error::custom),
        None => Ok(None),
    }
}

pub fn serialize_option_date<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match date {
        None => serializer.serialize_none(),
        Some(d) => serialize_date(d, serializer),
    }
}

fn parse_time_impl(h: &str, m: &str, s: &str) -> Result<u32, std::num::ParseIntError> {
    let hours: u32 = h.parse()?;
    let minutes: u32 = m.parse()?;
    let seconds: u32 = s.parse()?;
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Parses an `H:MM:SS` or `HH:MM:SS` time of day into seconds past midnight.
/// Times past `24:00:00` are valid; they belong to the previous service day.
pub fn parse_time(s: &str) -> Result<u32, Error> {
    let len = s.len();
    if len < 7 {
        return Err(Error::InvalidTime(s.to_owned()));
    }
    let sec = &s[len - 2..];
    let min = &s[len - 5..len - 3];
    let hour = &s[..len - 6];
    parse_time_impl(hour, min, sec).map_err(|_| Error::InvalidTime(s.to_owned()))
}

/// Formats seconds past midnight as zero-padded `HH:MM:SS`, which sorts
/// lexicographically in time order for all service times under 100 hours.
pub fn format_time(time: u32) -> String {
    format!("{:02}:{:02}:{:02}", time / 3600, time % 3600 / 60, time % 60)
}

pub fn deserialize_time<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_time(&s).map_err(de::Error::custom)
}

pub fn serialize_time<S>(time: &u32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_time(*time))
}

pub fn deserialize_option_time<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(t) => parse_time(&t).map(Some).map_err(de::Error::custom),
    }
}

pub fn serialize_option_time<S>(time: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match time {
        None => serializer.serialize_none(),
        Some(t) => serialize_time(t, serializer),
    }
}

/// JSON has no NaN, so the invalid-number sentinel serializes as `null`.
/// Reading it back restores NaN instead of failing on the mandatory field.
pub fn deserialize_lossy_float<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_round_trip() {
        assert_eq!(parse_time("08:00:00").unwrap(), 8 * 3600);
        assert_eq!(parse_time("8:00:30").unwrap(), 8 * 3600 + 30);
        assert_eq!(parse_time("25:01:00").unwrap(), 25 * 3600 + 60);
        assert_eq!(format_time(parse_time("09:30:15").unwrap()), "09:30:15");
        assert!(parse_time("9:00").is_err());
        assert!(parse_time("ab:cd:ef").is_err());
    }

    #[test]
    fn date_round_trip() {
        let d = parse_date("20260807").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 8, 7).unwrap());
        assert_eq!(format_date(d), "20260807");
        assert!(parse_date("2026-08-07").is_err());
    }
}
