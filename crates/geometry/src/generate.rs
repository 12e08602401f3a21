use formats::FeatureCollection;
use serde::Serialize;
use tracing::debug;

use crate::merge::{BatchMerger, MergedBuffer};
use crate::mesh::Topology;
use crate::options::GenerationOptions;
use crate::ring::RingBuilder;
use crate::walker::{WalkSummary, polygon_rings};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationStats {
    pub features: usize,
    pub skipped_features: usize,
    pub rings: usize,
    /// Inner rings among `rings`, built as standalone shapes.
    pub hole_rings: usize,
    /// Positions replaced by the origin because they could not be projected.
    pub projection_fallbacks: usize,
    pub shape_vertices: usize,
    pub outline_vertices: usize,
}

/// Output of one run. A kind is `Some` iff it was requested, even when no
/// ring contributed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedGeometry {
    pub shape: Option<MergedBuffer>,
    pub outline: Option<MergedBuffer>,
    pub stats: GenerationStats,
}

/// Builds the merged shape and outline buffers for every polygon ring of
/// `collection`, projected around `center` (`[lon_deg, lat_deg]`).
pub fn generate_geometry(
    collection: &FeatureCollection,
    center: [f64; 2],
    options: &GenerationOptions,
) -> GeneratedGeometry {
    let builder = RingBuilder::new(options.projection(center), options);
    let mut shape = options
        .need_shape_geometry
        .then(|| BatchMerger::new(Topology::Triangles));
    let mut outline = options
        .need_line_geometry
        .then(|| BatchMerger::new(Topology::LineSegments));

    let walk = WalkSummary::of(collection);
    let mut stats = GenerationStats {
        features: walk.features,
        skipped_features: walk.skipped_features,
        rings: walk.rings,
        hole_rings: walk.holes,
        ..GenerationStats::default()
    };

    for ring in polygon_rings(collection) {
        let meshes = builder.build(ring.points);
        stats.projection_fallbacks += meshes.fallbacks;

        if let (Some(merger), Some(mesh)) = (shape.as_mut(), meshes.shape) {
            merger.push(mesh);
        }
        if let (Some(merger), Some(mesh)) = (outline.as_mut(), meshes.outline) {
            merger.push(mesh);
        }
    }

    let shape = shape.map(BatchMerger::finish);
    let outline = outline.map(BatchMerger::finish);
    stats.shape_vertices = shape.as_ref().map_or(0, MergedBuffer::vertex_count);
    stats.outline_vertices = outline.as_ref().map_or(0, MergedBuffer::vertex_count);

    debug!(
        features = stats.features,
        skipped = stats.skipped_features,
        rings = stats.rings,
        holes = stats.hole_rings,
        fallbacks = stats.projection_fallbacks,
        shape_vertices = stats.shape_vertices,
        outline_vertices = stats.outline_vertices,
        "generated geometry"
    );

    GeneratedGeometry {
        shape,
        outline,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::{GeneratedGeometry, generate_geometry};
    use crate::options::GenerationOptions;
    use formats::FeatureCollection;
    use pretty_assertions::assert_eq;

    const SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Polygon",
                            "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1]]] } }
        ]
    }"#;

    fn parse(payload: &str) -> FeatureCollection {
        FeatureCollection::from_geojson_str(payload).expect("parse collection")
    }

    fn polygon_feature(ring: &str) -> String {
        format!(
            r#"{{ "type": "Feature", "properties": {{}},
                 "geometry": {{ "type": "Polygon", "coordinates": [{ring}] }} }}"#
        )
    }

    fn collection_of(features: &[String]) -> FeatureCollection {
        parse(&format!(
            r#"{{ "type": "FeatureCollection", "features": [{}] }}"#,
            features.join(",")
        ))
    }

    #[test]
    fn single_square_with_defaults() {
        let opts = GenerationOptions::default();
        let out = generate_geometry(&parse(SQUARE), [0.0, 0.0], &opts);

        let shape = out.shape.expect("shape requested");
        assert!(shape.bounding_sphere.radius > 0.0);
        let max_z = shape.positions().map(|p| p[2]).fold(f32::MIN, f32::max);
        assert!((max_z as f64 - opts.extrude_depth).abs() < 1e-6);
        let min_z = shape.positions().map(|p| p[2]).fold(f32::MAX, f32::min);
        assert_eq!(min_z, 0.0);

        let outline = out.outline.expect("outline requested");
        assert_eq!(outline.vertex_count(), 8);
        assert!(
            outline
                .positions()
                .all(|p| (p[2] as f64 - opts.line_height()).abs() < 1e-6)
        );

        assert_eq!(out.stats.rings, 1);
        assert_eq!(out.stats.outline_vertices, 8);
        assert_eq!(out.stats.shape_vertices, shape.vertex_count());
    }

    #[test]
    fn multipolygon_merge_is_additive() {
        let a = "[[0, 0], [1, 0], [1, 1], [0, 1]]";
        let b = "[[5, 5], [7, 5], [6, 8]]";
        let multi = parse(&format!(
            r#"{{ "type": "FeatureCollection", "features": [
                {{ "type": "Feature", "properties": {{}},
                   "geometry": {{ "type": "MultiPolygon", "coordinates": [[{a}], [{b}]] }} }}
            ] }}"#
        ));
        let opts = GenerationOptions::default();
        let center = [3.0, 3.0];

        let merged = generate_geometry(&multi, center, &opts);
        let only_a = generate_geometry(&collection_of(&[polygon_feature(a)]), center, &opts);
        let only_b = generate_geometry(&collection_of(&[polygon_feature(b)]), center, &opts);

        let count = |g: &GeneratedGeometry| g.shape.as_ref().map_or(0, |s| s.vertex_count());
        assert_eq!(count(&merged), count(&only_a) + count(&only_b));

        let shape = merged.shape.expect("shape");
        let first = only_a.shape.expect("shape a");
        let second = only_b.shape.expect("shape b");
        assert_eq!(shape.ranges.len(), 2);
        assert_eq!(shape.mesh_positions(0), Some(first.positions.as_slice()));
        assert_eq!(shape.mesh_positions(1), Some(second.positions.as_slice()));
    }

    #[test]
    fn disabled_kinds_are_absent_and_do_not_affect_the_other() {
        let fc = parse(SQUARE);
        let both = generate_geometry(&fc, [0.0, 0.0], &GenerationOptions::default());

        let no_lines = GenerationOptions {
            need_line_geometry: false,
            ..GenerationOptions::default()
        };
        let out = generate_geometry(&fc, [0.0, 0.0], &no_lines);
        assert!(out.outline.is_none());
        assert_eq!(
            out.shape.as_ref().map(|s| &s.positions),
            both.shape.as_ref().map(|s| &s.positions)
        );

        let no_shape = GenerationOptions {
            need_shape_geometry: false,
            ..GenerationOptions::default()
        };
        let out = generate_geometry(&fc, [0.0, 0.0], &no_shape);
        assert!(out.shape.is_none());
        assert_eq!(
            out.outline.as_ref().map(|s| &s.positions),
            both.outline.as_ref().map(|s| &s.positions)
        );
    }

    #[test]
    fn unsupported_features_contribute_nothing() {
        let point = r#"{ "type": "Feature", "properties": {},
                         "geometry": { "type": "Point", "coordinates": [0.5, 0.5] } }"#;
        let with_point = collection_of(&[
            point.to_string(),
            polygon_feature("[[0, 0], [1, 0], [1, 1], [0, 1]]"),
        ]);
        let opts = GenerationOptions::default();
        let out = generate_geometry(&with_point, [0.0, 0.0], &opts);
        let plain = generate_geometry(&parse(SQUARE), [0.0, 0.0], &opts);

        assert_eq!(out.stats.skipped_features, 1);
        assert_eq!(out.stats.shape_vertices, plain.stats.shape_vertices);
        assert_eq!(out.stats.outline_vertices, plain.stats.outline_vertices);
    }

    #[test]
    fn pole_coordinate_falls_back_to_origin() {
        let fc = collection_of(&[polygon_feature(
            "[[10, 10], [11, 10], [11, -90], [10, 11]]",
        )]);
        let opts = GenerationOptions::default();
        let out = generate_geometry(&fc, [0.0, 0.0], &opts);

        assert_eq!(out.stats.rings, 1);
        assert_eq!(out.stats.projection_fallbacks, 1);

        let outline = out.outline.expect("outline requested");
        assert_eq!(outline.vertex_count(), 8);
        let h = opts.line_height() as f32;
        // Segment 1 ends at the pole point, segment 2 starts there.
        assert_eq!(outline.position(3), Some([0.0, 0.0, h]));
        assert_eq!(outline.position(4), Some([0.0, 0.0, h]));
        assert!(outline.positions().all(|p| p.iter().all(|c| c.is_finite())));

        let shape = out.shape.expect("shape requested");
        assert!(!shape.is_empty());
        assert!(shape.positions().all(|p| p.iter().all(|c| c.is_finite())));
        assert!(shape.bounding_sphere.radius.is_finite());
    }

    #[test]
    fn holes_are_counted_and_built_as_rings() {
        let fc = collection_of(&[polygon_feature(
            "[[0, 0], [4, 0], [4, 4], [0, 4]], [[1, 1], [2, 1], [2, 2]]",
        )]);
        let out = generate_geometry(&fc, [2.0, 2.0], &GenerationOptions::default());
        assert_eq!(out.stats.rings, 2);
        assert_eq!(out.stats.hole_rings, 1);
        assert_eq!(out.outline.map(|o| o.ranges.len()), Some(2));
    }

    #[test]
    fn empty_collection_yields_empty_requested_buffers() {
        let fc = FeatureCollection::default();
        let out = generate_geometry(&fc, [0.0, 0.0], &GenerationOptions::default());
        let shape = out.shape.expect("shape requested");
        let outline = out.outline.expect("outline requested");
        assert!(shape.is_empty() && outline.is_empty());
        assert_eq!(shape.bounding_sphere.radius, 0.0);
        assert_eq!(out.stats.rings, 0);
    }
}
