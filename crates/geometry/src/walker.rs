use formats::{FeatureCollection, GeoPoint};

/// One ring of one polygon of one feature.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RingRef<'a> {
    pub feature_index: usize,
    /// Index within a MultiPolygon; always 0 for a Polygon.
    pub polygon_index: usize,
    /// 0 is the outer boundary, the rest are holes.
    pub ring_index: usize,
    pub points: &'a [GeoPoint],
}

impl RingRef<'_> {
    pub fn is_hole(&self) -> bool {
        self.ring_index > 0
    }
}

/// Every ring of every Polygon / MultiPolygon feature, in feature, polygon,
/// ring order. Holes come out as ordinary rings. Other geometry kinds and
/// null geometries yield nothing.
pub fn polygon_rings(collection: &FeatureCollection) -> impl Iterator<Item = RingRef<'_>> + '_ {
    collection
        .features
        .iter()
        .enumerate()
        .filter_map(|(feature_index, feature)| {
            feature
                .geometry
                .as_ref()
                .map(|geometry| (feature_index, geometry.polygons()))
        })
        .flat_map(|(feature_index, polygons)| {
            polygons
                .iter()
                .enumerate()
                .flat_map(move |(polygon_index, rings)| {
                    rings
                        .iter()
                        .enumerate()
                        .map(move |(ring_index, ring)| RingRef {
                            feature_index,
                            polygon_index,
                            ring_index,
                            points: ring.as_slice(),
                        })
                })
        })
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub features: usize,
    /// Features without polygonal geometry.
    pub skipped_features: usize,
    pub rings: usize,
    /// Inner rings; they are built like any other ring.
    pub holes: usize,
}

impl WalkSummary {
    pub fn of(collection: &FeatureCollection) -> Self {
        let polygonal = collection.polygonal_feature_count();
        let mut summary = Self {
            features: collection.features.len(),
            skipped_features: collection.features.len() - polygonal,
            ..Self::default()
        };
        for ring in polygon_rings(collection) {
            summary.rings += 1;
            summary.holes += usize::from(ring.is_hole());
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::{WalkSummary, polygon_rings};
    use formats::FeatureCollection;
    use pretty_assertions::assert_eq;

    fn collection() -> FeatureCollection {
        FeatureCollection::from_geojson_str(
            r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] } },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "Polygon", "coordinates": [
                      [[0, 0], [4, 0], [4, 4], [0, 4]],
                      [[1, 1], [2, 1], [2, 2]]
                  ] } },
                { "type": "Feature", "properties": {}, "geometry": null },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "MultiPolygon", "coordinates": [
                      [[[10, 10], [11, 10], [11, 11]]],
                      [[[20, 20], [21, 20], [21, 21], [20, 21]]]
                  ] } }
            ]
        }"#,
        )
        .expect("parse collection")
    }

    #[test]
    fn walks_in_feature_polygon_ring_order() {
        let fc = collection();
        let order: Vec<(usize, usize, usize, usize)> = polygon_rings(&fc)
            .map(|r| (r.feature_index, r.polygon_index, r.ring_index, r.points.len()))
            .collect();
        assert_eq!(
            order,
            vec![(1, 0, 0, 4), (1, 0, 1, 3), (3, 0, 0, 3), (3, 1, 0, 4)]
        );
    }

    #[test]
    fn holes_are_yielded_as_rings() {
        let fc = collection();
        let holes = polygon_rings(&fc).filter(|r| r.is_hole()).count();
        assert_eq!(holes, 1);
    }

    #[test]
    fn summary_counts_skipped_features() {
        let summary = WalkSummary::of(&collection());
        assert_eq!(
            summary,
            WalkSummary {
                features: 4,
                skipped_features: 2,
                rings: 4,
                holes: 1,
            }
        );
    }

    #[test]
    fn empty_collection_yields_nothing() {
        let fc = FeatureCollection::default();
        assert_eq!(polygon_rings(&fc).count(), 0);
    }
}
