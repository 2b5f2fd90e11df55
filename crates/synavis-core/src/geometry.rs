//! Geometry buffers and the reception state

use crate::error::{Result, SynavisError};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Tangent direction plus handedness flag
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Tangent {
    pub direction: Vec3,
    /// Non-zero when the bitangent is flipped
    pub flip: u32,
}

impl Tangent {
    pub fn new(direction: Vec3, flipped: bool) -> Self {
        Self {
            direction,
            flip: flipped as u32,
        }
    }

    pub fn flipped(&self) -> bool {
        self.flip != 0
    }
}

/// One of the arrays that make up a mesh payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayKind {
    Points,
    Normals,
    Triangles,
    TexCoords,
    Tangents,
    Scalars,
}

impl ArrayKind {
    /// Bytes per element on the wire
    pub fn element_size(&self) -> usize {
        match self {
            ArrayKind::Points | ArrayKind::Normals => std::mem::size_of::<Vec3>(),
            ArrayKind::Triangles => std::mem::size_of::<i32>(),
            ArrayKind::TexCoords => std::mem::size_of::<Vec2>(),
            ArrayKind::Tangents => std::mem::size_of::<Tangent>(),
            ArrayKind::Scalars => std::mem::size_of::<f32>(),
        }
    }

    /// Field name used by direct-mode envelopes
    pub fn field_name(&self) -> &'static str {
        match self {
            ArrayKind::Points => "points",
            ArrayKind::Normals => "normals",
            ArrayKind::Triangles => "triangles",
            ArrayKind::TexCoords => "texcoords",
            ArrayKind::Tangents => "tangents",
            ArrayKind::Scalars => "scalars",
        }
    }

    /// Destination names accepted by the legacy `buffer` command
    pub fn from_buffer_name(name: &str) -> Option<Self> {
        match name {
            "points" => Some(ArrayKind::Points),
            "normals" => Some(ArrayKind::Normals),
            "triangles" => Some(ArrayKind::Triangles),
            "uvs" => Some(ArrayKind::TexCoords),
            _ => None,
        }
    }
}

/// Reinterpret little-endian bytes as typed elements
///
/// The byte length must be an exact multiple of the element size.
pub fn cast_elements<T: Pod>(kind: ArrayKind, bytes: &[u8]) -> Result<Vec<T>> {
    let size = std::mem::size_of::<T>();
    debug_assert_eq!(size, kind.element_size());
    if bytes.len() % size != 0 {
        return Err(SynavisError::MalformedValue(format!(
            "{}: {} bytes is not a multiple of the {}-byte element size",
            kind.field_name(),
            bytes.len(),
            size
        )));
    }
    Ok(bytes
        .chunks_exact(size)
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect())
}

/// Scalar bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarRange {
    pub min: f32,
    pub max: f32,
}

/// Decode scalars and their bounds in a single pass
///
/// NaN elements are stored but never become a bound.
pub fn decode_scalars(bytes: &[u8]) -> Result<(Vec<f32>, Option<ScalarRange>)> {
    let size = ArrayKind::Scalars.element_size();
    if bytes.len() % size != 0 {
        return Err(SynavisError::MalformedValue(format!(
            "scalars: {} bytes is not a multiple of {}",
            bytes.len(),
            size
        )));
    }

    let mut values = Vec::with_capacity(bytes.len() / size);
    let mut range: Option<ScalarRange> = None;
    for chunk in bytes.chunks_exact(size) {
        let value: f32 = bytemuck::pod_read_unaligned(chunk);
        values.push(value);
        if value.is_nan() {
            continue;
        }
        range = Some(match range {
            None => ScalarRange {
                min: value,
                max: value,
            },
            Some(r) => ScalarRange {
                min: r.min.min(value),
                max: r.max.max(value),
            },
        });
    }
    Ok((values, range))
}

/// Tangent for a vertex without one: normal × up, normalized, not flipped
pub fn synthesize_tangent(normal: Vec3) -> Tangent {
    Tangent::new(normal.cross(Vec3::Z).normalize_or_zero(), false)
}

/// Complete or in-progress mesh arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffer {
    pub points: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<i32>,
    pub uvs: Vec<Vec2>,
    pub tangents: Vec<Tangent>,
    pub scalars: Vec<f32>,
    pub scalar_range: Option<ScalarRange>,
}

impl GeometryBuffer {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.triangles.is_empty()
    }

    /// Fill tangents from normals, one per point
    pub fn synthesize_tangents(&mut self) -> Result<()> {
        if self.normals.len() < self.points.len() {
            return Err(SynavisError::MalformedValue(format!(
                "cannot synthesize tangents: {} normals for {} points",
                self.normals.len(),
                self.points.len()
            )));
        }
        self.tangents = self.normals[..self.points.len()]
            .iter()
            .map(|n| synthesize_tangent(*n))
            .collect();
        Ok(())
    }
}

/// Chunked-reception state; advances strictly in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceptionState {
    #[default]
    Idle,
    AwaitingHeader,
    ReceivingPoints,
    ReceivingNormals,
    ReceivingTriangles,
    ReceivingTexCoords,
}

impl ReceptionState {
    /// Array filled in this state
    pub fn array(&self) -> Option<ArrayKind> {
        match self {
            ReceptionState::ReceivingPoints => Some(ArrayKind::Points),
            ReceptionState::ReceivingNormals => Some(ArrayKind::Normals),
            ReceptionState::ReceivingTriangles => Some(ArrayKind::Triangles),
            ReceptionState::ReceivingTexCoords => Some(ArrayKind::TexCoords),
            ReceptionState::Idle | ReceptionState::AwaitingHeader => None,
        }
    }

    /// State after the current array completes
    pub fn next(&self) -> ReceptionState {
        match self {
            ReceptionState::Idle => ReceptionState::Idle,
            ReceptionState::AwaitingHeader => ReceptionState::ReceivingPoints,
            ReceptionState::ReceivingPoints => ReceptionState::ReceivingNormals,
            ReceptionState::ReceivingNormals => ReceptionState::ReceivingTriangles,
            ReceptionState::ReceivingTriangles => ReceptionState::ReceivingTexCoords,
            ReceptionState::ReceivingTexCoords => ReceptionState::Idle,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReceptionState::Idle => "idle",
            ReceptionState::AwaitingHeader => "awaiting_header",
            ReceptionState::ReceivingPoints => "receiving_points",
            ReceptionState::ReceivingNormals => "receiving_normals",
            ReceptionState::ReceivingTriangles => "receiving_triangles",
            ReceptionState::ReceivingTexCoords => "receiving_texcoords",
        }
    }
}
