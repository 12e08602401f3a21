#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Every three vertices form a triangle.
    Triangles,
    /// Every two vertices form an independent line segment.
    LineSegments,
}

impl Topology {
    pub fn as_str(self) -> &'static str {
        match self {
            Topology::Triangles => "triangles",
            Topology::LineSegments => "line_segments",
        }
    }
}

/// Non-indexed per-ring mesh. Lives only until it is pushed into a
/// [`crate::BatchMerger`].
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub topology: Topology,
    /// xyz triplets.
    pub positions: Vec<f32>,
    /// xyz triplets parallel to `positions`, if the mesh is lit.
    pub normals: Option<Vec<f32>>,
    /// uv pairs parallel to `positions`, if the mesh is textured.
    pub uvs: Option<Vec<f32>>,
}

impl Mesh {
    pub fn empty(topology: Topology) -> Self {
        Self::with_capacity(topology, 0)
    }

    /// Triangle meshes carry normals and uvs, line meshes only positions.
    pub fn with_capacity(topology: Topology, vertices: usize) -> Self {
        let surface = topology == Topology::Triangles;
        Self {
            topology,
            positions: Vec::with_capacity(vertices * 3),
            normals: surface.then(|| Vec::with_capacity(vertices * 3)),
            uvs: surface.then(|| Vec::with_capacity(vertices * 2)),
        }
    }

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

    pub(crate) fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) {
        self.positions.extend_from_slice(&position);
        if let Some(normals) = self.normals.as_mut() {
            normals.extend_from_slice(&normal);
        }
        if let Some(uvs) = self.uvs.as_mut() {
            uvs.extend_from_slice(&uv);
        }
    }
}
