//! Writes generated buffers to disk.
//!
//! Each attribute goes to its own raw `f32` file in native byte order
//! (xyz triplets for positions and normals, uv pairs for uvs) and a
//! `meshes.json` manifest describes them.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use foundation::BoundingSphere;
use geometry::{GenerationOptions, GenerationStats, MergedBuffer};
use runtime::{GenerationRequest, GenerationResult};
use serde::Serialize;

pub const MANIFEST_FILE_NAME: &str = "meshes.json";

#[derive(Debug)]
pub enum ExportError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io { path, source } => write!(f, "write {}: {source}", path.display()),
            ExportError::Json(e) => write!(f, "json: {e}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io { source, .. } => Some(source),
            ExportError::Json(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshManifest {
    pub source: String,
    pub center: [f64; 2],
    pub options: GenerationOptions,
    pub byte_order: &'static str,
    pub stats: GenerationStats,
    pub buffers: Vec<BufferEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferEntry {
    pub name: &'static str,
    pub id: u64,
    pub topology: &'static str,
    pub vertex_count: usize,
    /// Number of per-ring meshes merged into the buffer.
    pub mesh_count: usize,
    pub bounding_sphere: SphereEntry,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SphereEntry {
    pub center: [f64; 3],
    pub radius: f64,
}

impl From<BoundingSphere> for SphereEntry {
    fn from(s: BoundingSphere) -> Self {
        Self {
            center: [s.center.x, s.center.y, s.center.z],
            radius: s.radius,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub attribute: &'static str,
    pub path: String,
    pub bytes: usize,
    pub content_hash: String,
}

/// Writes every buffer present in `result` plus the manifest into `out_dir`.
pub fn write_outputs(
    out_dir: &Path,
    request: &GenerationRequest,
    result: &GenerationResult,
) -> Result<MeshManifest, ExportError> {
    fs::create_dir_all(out_dir).map_err(|source| ExportError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut buffers = Vec::new();
    for (name, buffer) in [("shape", &result.shape), ("outline", &result.outline)] {
        if let Some(buffer) = buffer {
            buffers.push(write_buffer(out_dir, name, buffer)?);
        }
    }

    let manifest = MeshManifest {
        source: request.locator.clone(),
        center: request.center,
        options: request.options,
        byte_order: if cfg!(target_endian = "little") {
            "little"
        } else {
            "big"
        },
        stats: result.stats,
        buffers,
    };

    let manifest_path = out_dir.join(MANIFEST_FILE_NAME);
    let payload = serde_json::to_string_pretty(&manifest).map_err(ExportError::Json)?;
    fs::write(&manifest_path, payload).map_err(|source| ExportError::Io {
        path: manifest_path,
        source,
    })?;

    Ok(manifest)
}

fn write_buffer(
    out_dir: &Path,
    name: &'static str,
    buffer: &Arc<MergedBuffer>,
) -> Result<BufferEntry, ExportError> {
    let mut files = vec![write_attribute(
        out_dir,
        name,
        "position",
        buffer.position_bytes(),
    )?];
    if let Some(normals) = buffer.normal_bytes() {
        files.push(write_attribute(out_dir, name, "normal", normals)?);
    }
    if let Some(uvs) = buffer.uv_bytes() {
        files.push(write_attribute(out_dir, name, "uv", uvs)?);
    }

    Ok(BufferEntry {
        name,
        id: buffer.id.get(),
        topology: buffer.topology.as_str(),
        vertex_count: buffer.vertex_count(),
        mesh_count: buffer.ranges.len(),
        bounding_sphere: buffer.bounding_sphere.into(),
        files,
    })
}

fn write_attribute(
    out_dir: &Path,
    name: &str,
    attribute: &'static str,
    bytes: &[u8],
) -> Result<FileEntry, ExportError> {
    let file_name = format!("{name}.{attribute}s.bin");
    let path = out_dir.join(&file_name);
    let io_err = |source| ExportError::Io {
        path: path.clone(),
        source,
    };

    let file = fs::File::create(&path).map_err(io_err)?;
    let mut writer = HashingWriter::new(file);
    writer.write_all(bytes).map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    Ok(FileEntry {
        attribute,
        path: file_name,
        bytes: bytes.len(),
        content_hash: writer.finalize_hex(),
    })
}

struct HashingWriter<W> {
    inner: W,
    hasher: blake3::Hasher,
}

impl<W> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
        }
    }

    fn finalize_hex(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

impl<W: std::io::Write> std::io::Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
