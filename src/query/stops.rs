//! Stop reads: lookups, nearest-stop search and bulk GeoJSON listing.
//!
//! Stop keys embed `[lon,lat]`, so every operation here that only needs
//! identity and position works off a key-only scan and never fetches
//! document bodies.

use geo_types::{Point, Rect};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use log::error;

use crate::documents::Stop;
use crate::error::Error;
use crate::geocode::ReverseGeocoder;
use crate::keys::StopKey;
use crate::store::{get_doc, DocumentStore, ScanOptions};

/// Fetches a stop when only its id is known: the id is a key prefix, the
/// coordinates complete the key, so this is a prefix scan of length one.
pub async fn get_stop<S>(stops: &S, stop_id: &str) -> Result<Stop, Error>
where
    S: DocumentStore + ?Sized,
{
    let mut rows = stops
        .scan(ScanOptions {
            limit: Some(1),
            ..ScanOptions::prefix(&StopKey::stop_prefix(stop_id), true)
        })
        .await?;
    let doc = rows
        .pop()
        .and_then(|row| row.doc)
        .ok_or_else(|| Error::NotFound(format!("stop {stop_id}")))?;
    Ok(serde_json::from_value(doc)?)
}

/// The stop closest to `position` by squared Euclidean distance over raw
/// degrees, brute-forced over a key-only scan of the whole table. Ties go
/// to the first stop encountered in key order. With `max_distance` set,
/// a minimum whose *squared* distance exceeds it yields `None`.
pub async fn nearest_stop<S>(
    stops: &S,
    position: Point<f64>,
    max_distance: Option<f64>,
) -> Result<Option<Stop>, Error>
where
    S: DocumentStore + ?Sized,
{
    let rows = stops
        .scan(ScanOptions::prefix(StopKey::table_prefix(), false))
        .await?;

    let mut best: Option<(String, f64)> = None;
    for row in rows {
        let decoded = StopKey::decode(&row.key)?;
        let dx = decoded.lon - position.x();
        let dy = decoded.lat - position.y();
        let distance = dx * dx + dy * dy;
        // Strict comparison keeps the first-encountered stop on ties.
        if best.as_ref().map(|(_, d)| distance < *d).unwrap_or(true) {
            best = Some((row.key, distance));
        }
    }

    let (key, distance) = match best {
        Some(found) => found,
        None => return Ok(None),
    };
    if let Some(max) = max_distance {
        if distance > max {
            return Ok(None);
        }
    }
    Ok(Some(get_doc(stops, &key).await?))
}

/// Every stop as a GeoJSON point collection, read from keys alone.
/// `bounds`, when given, keeps only stops inside the rectangle.
pub async fn all_stops_as_geojson<S>(
    stops: &S,
    bounds: Option<Rect<f64>>,
) -> Result<FeatureCollection, Error>
where
    S: DocumentStore + ?Sized,
{
    let rows = stops
        .scan(ScanOptions::prefix(StopKey::table_prefix(), false))
        .await?;

    let mut features = Vec::with_capacity(rows.len());
    for row in rows {
        let decoded = StopKey::decode(&row.key)?;
        if let Some(bounds) = &bounds {
            let inside = decoded.lon >= bounds.min().x
                && decoded.lon <= bounds.max().x
                && decoded.lat >= bounds.min().y
                && decoded.lat <= bounds.max().y;
            if !inside {
                continue;
            }
        }
        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(GeoJsonValue::Point(vec![
                decoded.lon,
                decoded.lat,
            ]))),
            id: Some(Id::String(decoded.stop_id)),
            properties: None,
            foreign_members: None,
        });
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// The formatted address of a stop. A geocoder failure is logged and comes
/// back as an empty string, never as an error.
pub async fn stop_address<S, G>(stops: &S, geocoder: &G, stop_id: &str) -> Result<String, Error>
where
    S: DocumentStore + ?Sized,
    G: ReverseGeocoder + ?Sized,
{
    let stop = get_stop(stops, stop_id).await?;
    match geocoder.reverse_geocode(stop.stop_lat, stop.stop_lon).await {
        Ok(address) => Ok(address),
        Err(e) => {
            error!("address lookup for stop {stop_id} failed: {e}");
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest_rows, IngestOptions};
    use crate::store::MemoryStore;
    use crate::tables::Table;
    use async_trait::async_trait;
    use geo_types::Coord;

    async fn stops_store() -> MemoryStore {
        let store = MemoryStore::new();
        let csv = "stop_id,stop_name,stop_lat,stop_lon\n\
                   origin,Origin,0,0\n\
                   corner,Corner,1,1\n";
        ingest_rows(Table::Stops, csv.as_bytes(), &store, &IngestOptions::default())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn nearest_by_squared_distance() {
        let store = stops_store().await;
        let nearest = nearest_stop(&store, Point::new(0.1, 0.1), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(nearest.stop_id, "origin");

        // Squared distance 0.02 exceeds the 0.01 ceiling.
        let capped = nearest_stop(&store, Point::new(0.1, 0.1), Some(0.01))
            .await
            .unwrap();
        assert!(capped.is_none());

        let empty = MemoryStore::new();
        assert!(nearest_stop(&empty, Point::new(0.0, 0.0), None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn geojson_listing_reads_keys_only() {
        let store = stops_store().await;
        let collection = all_stops_as_geojson(&store, None).await.unwrap();
        assert_eq!(collection.features.len(), 2);
        let ids: Vec<_> = collection
            .features
            .iter()
            .map(|f| f.id.clone().unwrap())
            .collect();
        assert!(ids.contains(&Id::String("origin".into())));

        let bounds = Rect::new(Coord { x: 0.5, y: 0.5 }, Coord { x: 1.5, y: 1.5 });
        let filtered = all_stops_as_geojson(&store, Some(bounds)).await.unwrap();
        assert_eq!(filtered.features.len(), 1);
        assert_eq!(filtered.features[0].id, Some(Id::String("corner".into())));
    }

    #[tokio::test]
    async fn stop_lookup_by_id_prefix() {
        let store = stops_store().await;
        let stop = get_stop(&store, "corner").await.unwrap();
        assert_eq!(stop.stop_name, "Corner");
        assert!(get_stop(&store, "ghost").await.unwrap_err().is_not_found());
    }

    struct FailingGeocoder;

    #[async_trait]
    impl ReverseGeocoder for FailingGeocoder {
        async fn reverse_geocode(&self, _lat: f64, _lng: f64) -> Result<String, Error> {
            Err(Error::ExternalServiceFailure("unreachable".into()))
        }
    }

    struct FixedGeocoder;

    #[async_trait]
    impl ReverseGeocoder for FixedGeocoder {
        async fn reverse_geocode(&self, _lat: f64, _lng: f64) -> Result<String, Error> {
            Ok("688 Kanoelehua Ave, Hilo, HI".to_owned())
        }
    }

    #[tokio::test]
    async fn address_failures_become_empty_strings() {
        let store = stops_store().await;
        let address = stop_address(&store, &FixedGeocoder, "origin").await.unwrap();
        assert_eq!(address, "688 Kanoelehua Ave, Hilo, HI");

        let fallback = stop_address(&store, &FailingGeocoder, "origin").await.unwrap();
        assert_eq!(fallback, "");

        // The stop itself missing is still a real error.
        assert!(stop_address(&store, &FixedGeocoder, "ghost")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
