//! Per-ring mesh construction.
//!
//! Every ring is projected once into the planar frame used by the renderer
//! (Mercator, y flipped to point north-up) and then turned into an extruded
//! prism, a closed list of line segments, or both.

use earcutr::earcut;
use formats::GeoPoint;
use foundation::math::{MercatorProjection, Vec2, Vec3};
use tracing::debug;

use crate::mesh::{Mesh, Topology};
use crate::options::GenerationOptions;

/// A ring in renderer space: one point per source position, same order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarRing {
    pub points: Vec<Vec2>,
    /// Positions the projection could not handle; they sit at the origin.
    pub fallbacks: usize,
}

impl PlanarRing {
    pub fn project(ring: &[GeoPoint], projection: &MercatorProjection) -> Self {
        let mut fallbacks = 0;
        let points = ring
            .iter()
            .map(|p| match projection.try_project(p.lon_deg, p.lat_deg) {
                Some(v) => Vec2::new(v.x, -v.y),
                None => {
                    fallbacks += 1;
                    Vec2::ZERO
                }
            })
            .collect();
        Self { points, fallbacks }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Meshes built from one ring. A kind that was not requested is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RingMeshes {
    pub shape: Option<Mesh>,
    pub outline: Option<Mesh>,
    pub fallbacks: usize,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RingBuilder {
    projection: MercatorProjection,
    extrude_depth: f64,
    line_height: f64,
    need_shape: bool,
    need_outline: bool,
}

impl RingBuilder {
    pub fn new(projection: MercatorProjection, options: &GenerationOptions) -> Self {
        Self {
            projection,
            extrude_depth: options.extrude_depth,
            line_height: options.line_height(),
            need_shape: options.need_shape_geometry,
            need_outline: options.need_line_geometry,
        }
    }

    pub fn project(&self, ring: &[GeoPoint]) -> PlanarRing {
        PlanarRing::project(ring, &self.projection)
    }

    pub fn build_filled(&self, ring: &[GeoPoint]) -> Mesh {
        extrude(&self.project(ring).points, self.extrude_depth)
    }

    pub fn build_outline(&self, ring: &[GeoPoint]) -> Mesh {
        outline(&self.project(ring).points, self.line_height)
    }

    /// Projects the ring once and builds every requested kind from it.
    pub fn build(&self, ring: &[GeoPoint]) -> RingMeshes {
        let planar = self.project(ring);
        RingMeshes {
            shape: self
                .need_shape
                .then(|| extrude(&planar.points, self.extrude_depth)),
            outline: self
                .need_outline
                .then(|| outline(&planar.points, self.line_height)),
            fallbacks: planar.fallbacks,
        }
    }
}

/// Sweeps the closed contour through `z = 0..depth`.
///
/// Output is a non-indexed triangle list: bottom cap, top cap, then one quad
/// per contour edge. Contours with fewer than two distinct points give an
/// empty mesh. Collinear contours give walls without caps.
///
/// Texture coordinates are in world units: caps use `(x, y)`, walls use the
/// edge's dominant planar axis for `u` and `1 - z` for `v`.
pub fn extrude(points: &[Vec2], depth: f64) -> Mesh {
    let mut contour = dedup_contour(points);
    if contour.len() < 2 {
        return Mesh::empty(Topology::Triangles);
    }
    if signed_area(&contour) < 0.0 {
        contour.reverse();
    }

    let caps = triangulate(&contour);
    let m = contour.len();
    let mut mesh = Mesh::with_capacity(Topology::Triangles, caps.len() * 6 + m * 6);

    let z0 = 0.0_f32;
    let z1 = depth as f32;
    let at = |p: Vec2, z: f32| [p.x as f32, p.y as f32, z];
    let cap_uv = |p: Vec2| [p.x as f32, p.y as f32];

    for &[a, b, c] in &caps {
        let down = [0.0, 0.0, -1.0];
        for i in [a, c, b] {
            mesh.push_vertex(at(contour[i], z0), down, cap_uv(contour[i]));
        }
    }
    for &[a, b, c] in &caps {
        let up = [0.0, 0.0, 1.0];
        for i in [a, b, c] {
            mesh.push_vertex(at(contour[i], z1), up, cap_uv(contour[i]));
        }
    }

    for i in 0..m {
        let p0 = contour[i];
        let p1 = contour[(i + 1) % m];
        // Outward for a counter-clockwise contour.
        let n = Vec3::new(p1.y - p0.y, p0.x - p1.x, 0.0)
            .normalize()
            .to_f32();
        let along_x = (p0.y - p1.y).abs() < (p0.x - p1.x).abs();
        let wall_uv = |p: Vec2, z: f32| {
            let u = if along_x { p.x } else { p.y };
            [u as f32, 1.0 - z]
        };

        for (p, z) in [(p0, z0), (p1, z0), (p1, z1), (p0, z0), (p1, z1), (p0, z1)] {
            mesh.push_vertex(at(p, z), n, wall_uv(p, z));
        }
    }

    mesh
}

/// One segment per consecutive pair, including last -> first, all at height
/// `z`. Exactly `2 * n` vertices for `n >= 2` points; no vertex is shared.
pub fn outline(points: &[Vec2], z: f64) -> Mesh {
    let n = points.len();
    if n < 2 {
        return Mesh::empty(Topology::LineSegments);
    }

    let z = z as f32;
    let mut mesh = Mesh::with_capacity(Topology::LineSegments, n * 2);
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        mesh.positions
            .extend_from_slice(&[a.x as f32, a.y as f32, z, b.x as f32, b.y as f32, z]);
    }
    mesh
}

/// Drops consecutive duplicates and a trailing copy of the first point.
fn dedup_contour(points: &[Vec2]) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if out
            .last()
            .is_some_and(|&last| last.distance_squared(p) <= f64::EPSILON)
        {
            continue;
        }
        out.push(p);
    }
    while out.len() > 1 && out[0].distance_squared(out[out.len() - 1]) <= f64::EPSILON {
        out.pop();
    }
    out
}

/// Positive for counter-clockwise contours (y up).
fn signed_area(contour: &[Vec2]) -> f64 {
    let n = contour.len();
    let twice: f64 = (0..n)
        .map(|i| contour[i].perp_dot(contour[(i + 1) % n]))
        .sum();
    twice * 0.5
}

/// Cap triangles as index triples into `contour`, each counter-clockwise.
fn triangulate(contour: &[Vec2]) -> Vec<[usize; 3]> {
    if contour.len() < 3 {
        return Vec::new();
    }

    let mut coords: Vec<f64> = Vec::with_capacity(contour.len() * 2);
    for p in contour {
        coords.push(p.x);
        coords.push(p.y);
    }

    let indices = match earcut(&coords, &[], 2) {
        Ok(ix) => ix,
        Err(_) => {
            debug!(points = contour.len(), "cap triangulation failed, emitting walls only");
            return Vec::new();
        }
    };

    indices
        .chunks_exact(3)
        .map(|t| {
            let (a, b, c) = (t[0], t[1], t[2]);
            let turn = (contour[b] - contour[a]).perp_dot(contour[c] - contour[a]);
            if turn < 0.0 { [a, c, b] } else { [a, b, c] }
        })
        .collect()
}
