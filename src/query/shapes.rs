//! Shape reads and GeoJSON line assembly.

use geojson::feature::Id;
use geojson::{Feature, Geometry, Value as GeoJsonValue};

use crate::documents::ShapePoint;
use crate::error::Error;
use crate::keys::ShapePointKey;
use crate::store::{get_doc, rows_into_docs, DocumentStore, ScanOptions};

/// Fetches one point of a shape.
pub async fn get_shape_point<S>(
    shapes: &S,
    shape_id: &str,
    shape_pt_sequence: u32,
) -> Result<ShapePoint, Error>
where
    S: DocumentStore + ?Sized,
{
    let key = ShapePointKey {
        shape_id: shape_id.to_owned(),
        shape_pt_sequence,
    }
    .encode();
    get_doc(shapes, &key).await
}

/// Every point of a shape, in sequence order by key construction.
pub async fn get_all_points<S>(shapes: &S, shape_id: &str) -> Result<Vec<ShapePoint>, Error>
where
    S: DocumentStore + ?Sized,
{
    let rows = shapes
        .scan(ScanOptions::prefix(
            &ShapePointKey::shape_prefix(shape_id),
            true,
        ))
        .await?;
    rows_into_docs(rows)
}

/// Assembles an ordered point list into a GeoJSON LineString feature. The
/// input should be one shape's points in sequence order, as produced by
/// [`get_all_points`]; the feature id is the shape id.
pub fn shape_as_geojson(points: &[ShapePoint]) -> Feature {
    let coordinates = points
        .iter()
        .map(|point| vec![point.shape_pt_lon, point.shape_pt_lat])
        .collect();
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::LineString(coordinates))),
        id: points
            .first()
            .map(|point| Id::String(point.shape_id.clone())),
        properties: None,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest_rows, IngestOptions};
    use crate::store::MemoryStore;
    use crate::tables::Table;

    async fn shapes_store() -> MemoryStore {
        let store = MemoryStore::new();
        // Eleven points so sequence 10 would sort wrong without padding.
        let mut csv = String::from("shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n");
        for seq in 1..=11u32 {
            csv.push_str(&format!("coast,{},{},{seq}\n", 19.0 + seq as f64 / 4.0, -155.0));
        }
        csv.push_str("inland,20.0,-155.5,1\n");
        ingest_rows(Table::Shapes, csv.as_bytes(), &store, &IngestOptions::default())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn points_come_back_in_sequence_order() {
        let store = shapes_store().await;
        let points = get_all_points(&store, "coast").await.unwrap();
        assert_eq!(points.len(), 11);
        let sequences: Vec<u32> = points.iter().map(|p| p.shape_pt_sequence).collect();
        assert_eq!(sequences, (1..=11).collect::<Vec<u32>>());

        let point = get_shape_point(&store, "coast", 10).await.unwrap();
        assert_eq!(point.shape_pt_sequence, 10);
    }

    #[tokio::test]
    async fn line_feature_carries_the_shape_id() {
        let store = shapes_store().await;
        let points = get_all_points(&store, "coast").await.unwrap();
        let feature = shape_as_geojson(&points);
        assert_eq!(feature.id, Some(Id::String("coast".into())));
        match feature.geometry.unwrap().value {
            GeoJsonValue::LineString(coords) => {
                assert_eq!(coords.len(), 11);
                assert_eq!(coords[0], vec![-155.0, 19.25]);
            }
            other => panic!("expected a line string, got {other:?}"),
        }
    }
}
