use std::ops::Range;

use foundation::math::Vec3;
use foundation::{Aabb3, BoundingSphere, BufferId};
use tracing::warn;

use crate::mesh::{Mesh, Topology};

/// One contiguous vertex buffer built from many per-ring meshes.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedBuffer {
    pub id: BufferId,
    pub topology: Topology,
    /// xyz triplets.
    pub positions: Vec<f32>,
    /// Present only if every merged mesh had normals.
    pub normals: Option<Vec<f32>>,
    /// uv pairs; present only if every merged mesh had them.
    pub uvs: Option<Vec<f32>>,
    /// Vertex range contributed by each pushed mesh, in push order.
    pub ranges: Vec<Range<usize>>,
    pub bounding_box: Option<Aabb3>,
    pub bounding_sphere: BoundingSphere,
}

impl MergedBuffer {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, index: usize) -> Option<[f32; 3]> {
        let p = self.positions.get(index * 3..index * 3 + 3)?;
        Some([p[0], p[1], p[2]])
    }

    pub fn positions(&self) -> impl Iterator<Item = [f32; 3]> + Clone + '_ {
        self.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    /// Vertices contributed by the `index`-th merged mesh.
    pub fn mesh_positions(&self, index: usize) -> Option<&[f32]> {
        let range = self.ranges.get(index)?;
        self.positions.get(range.start * 3..range.end * 3)
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn normal_bytes(&self) -> Option<&[u8]> {
        self.normals.as_deref().map(bytemuck::cast_slice)
    }

    pub fn uv_bytes(&self) -> Option<&[u8]> {
        self.uvs.as_deref().map(bytemuck::cast_slice)
    }
}

/// Appends meshes into one buffer. Each pushed mesh is copied and dropped
/// right away, so only the growing buffer stays alive.
#[derive(Debug)]
pub struct BatchMerger {
    topology: Topology,
    positions: Vec<f32>,
    normals: Option<Vec<f32>>,
    uvs: Option<Vec<f32>>,
    ranges: Vec<Range<usize>>,
}

impl BatchMerger {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            positions: Vec::new(),
            normals: Some(Vec::new()),
            uvs: Some(Vec::new()),
            ranges: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Meshes of another topology are dropped with a warning. They still get
    /// an (empty) range so `ranges[i]` stays the i-th pushed mesh.
    pub fn push(&mut self, mesh: Mesh) {
        let start = self.vertex_count();
        if mesh.topology != self.topology {
            warn!(
                expected = self.topology.as_str(),
                got = mesh.topology.as_str(),
                "skipping mesh with mismatched topology"
            );
            self.ranges.push(start..start);
            return;
        }

        let vertices = mesh.vertex_count();
        self.positions.extend_from_slice(&mesh.positions);
        append_attribute(&mut self.normals, mesh.normals.as_deref(), vertices * 3);
        append_attribute(&mut self.uvs, mesh.uvs.as_deref(), vertices * 2);
        self.ranges.push(start..self.vertex_count());
    }

    pub fn finish(self) -> MergedBuffer {
        let points = self
            .positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0] as f64, p[1] as f64, p[2] as f64));
        let bounding_box = Aabb3::from_points(points.clone());
        let bounding_sphere = match bounding_box {
            Some(aabb) => BoundingSphere::enclosing(aabb, points),
            None => BoundingSphere::EMPTY,
        };
        // A buffer without any mesh has nothing to light or texture.
        let (normals, uvs) = if self.ranges.is_empty() {
            (None, None)
        } else {
            (self.normals, self.uvs)
        };

        MergedBuffer {
            id: BufferId::next(),
            topology: self.topology,
            positions: self.positions,
            normals,
            uvs,
            ranges: self.ranges,
            bounding_box,
            bounding_sphere,
        }
    }
}

/// Drops the accumulated attribute as soon as one mesh lacks it.
fn append_attribute(acc: &mut Option<Vec<f32>>, values: Option<&[f32]>, expected_len: usize) {
    match (acc.as_mut(), values) {
        (Some(out), Some(v)) if v.len() == expected_len => out.extend_from_slice(v),
        _ => *acc = None,
    }
}

pub fn merge(topology: Topology, meshes: impl IntoIterator<Item = Mesh>) -> MergedBuffer {
    let mut merger = BatchMerger::new(topology);
    for mesh in meshes {
        merger.push(mesh);
    }
    merger.finish()
}
