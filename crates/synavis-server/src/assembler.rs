//! Geometry stream assembler
//!
//! Chunked mode receives the mesh arrays as raw frames after a header; direct
//! mode decodes a whole mesh from one envelope of base64 strings.

use crate::config::DEFAULT_MAX_GEOMETRY_BYTES;
use crate::protocol::DirectGeometry;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use synavis_core::geometry::{cast_elements, decode_scalars};
use synavis_core::{ArrayKind, GeometryBuffer, ReceptionState, Result, SynavisError};
use tracing::{debug, warn};

/// Array counts announced before chunked data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryHeader {
    pub points: usize,
    /// Number of triangle indices
    pub triangles: usize,
}

/// A finished chunked reception
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledMesh {
    pub name: Option<String>,
    pub geometry: GeometryBuffer,
}

/// Outcome of one raw frame
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkProgress {
    Receiving {
        state: ReceptionState,
        received: usize,
        expected: usize,
    },
    Complete(AssembledMesh),
}

#[derive(Debug, Default)]
struct Staged {
    bytes: Vec<u8>,
    capacity: usize,
}

impl Staged {
    fn remaining(&self) -> usize {
        self.capacity - self.bytes.len()
    }
}

/// Chunked reception state machine, one per session
#[derive(Debug)]
pub struct GeometryAssembler {
    state: ReceptionState,
    name: Option<String>,
    /// Points, normals, triangles, texcoords
    staged: [Staged; 4],
    /// Most bytes one header may declare
    limit: usize,
}

impl Default for GeometryAssembler {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_GEOMETRY_BYTES)
    }
}

impl GeometryAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            state: ReceptionState::Idle,
            name: None,
            staged: Default::default(),
            limit,
        }
    }

    pub fn state(&self) -> ReceptionState {
        self.state
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether a reception is open
    pub fn is_active(&self) -> bool {
        self.state != ReceptionState::Idle
    }

    /// Open a reception, abandoning one in flight
    pub fn begin(&mut self, name: Option<String>) {
        if self.is_active() {
            warn!("Abandoning geometry reception in state {}", self.state.name());
        }
        self.reset();
        self.name = name;
        self.state = ReceptionState::AwaitingHeader;
    }

    /// Byte sizes of the four arrays a header declares
    ///
    /// Fails when a size overflows or the total exceeds the limit.
    pub fn capacities(&self, header: GeometryHeader) -> Result<[usize; 4]> {
        if header.points == 0 {
            return Err(SynavisError::MalformedValue("geometry header with no points".into()));
        }
        let counts = [
            (header.points, ArrayKind::Points),
            (header.points, ArrayKind::Normals),
            (header.triangles, ArrayKind::Triangles),
            (header.points, ArrayKind::TexCoords),
        ];
        let mut capacities = [0; 4];
        let mut total: usize = 0;
        for (capacity, (count, kind)) in capacities.iter_mut().zip(counts) {
            *capacity = count
                .checked_mul(kind.element_size())
                .ok_or_else(|| too_large(header, self.limit))?;
            total = total
                .checked_add(*capacity)
                .ok_or_else(|| too_large(header, self.limit))?;
        }
        if total > self.limit {
            return Err(too_large(header, self.limit));
        }
        Ok(capacities)
    }

    /// Size the destination arrays and start receiving points
    ///
    /// Staging grows with the received frames rather than the declared sizes.
    pub fn apply_header(&mut self, header: GeometryHeader) -> Result<ReceptionState> {
        if self.state != ReceptionState::AwaitingHeader {
            return Err(SynavisError::UnexpectedData(format!(
                "geometry header in state {}",
                self.state.name()
            )));
        }
        let capacities = self.capacities(header)?;
        for (slot, capacity) in self.staged.iter_mut().zip(capacities) {
            *slot = Staged {
                bytes: Vec::new(),
                capacity,
            };
        }
        self.state = ReceptionState::ReceivingPoints;
        self.skip_full();
        debug!(
            "Geometry header: {} points, {} indices",
            header.points, header.triangles
        );
        Ok(self.state)
    }

    /// Append one raw frame
    ///
    /// A frame may fill the rest of one array and continue into the next.
    /// Frames outside a reception, or larger than what is still expected,
    /// are rejected without touching the buffers.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<ChunkProgress> {
        let Some(current) = slot(self.state) else {
            return Err(SynavisError::UnexpectedData(format!(
                "{} bytes of raw data in state {}",
                bytes.len(),
                self.state.name()
            )));
        };
        let remaining: usize = self.staged[current..].iter().map(Staged::remaining).sum();
        if bytes.len() > remaining {
            return Err(SynavisError::UnexpectedData(format!(
                "frame of {} bytes exceeds the {} bytes still expected",
                bytes.len(),
                remaining
            )));
        }

        let mut rest = bytes;
        while !rest.is_empty() {
            let Some(index) = slot(self.state) else {
                break;
            };
            let staged = &mut self.staged[index];
            let take = staged.remaining().min(rest.len());
            staged.bytes.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            self.skip_full();
        }

        if self.state == ReceptionState::Idle {
            return Ok(ChunkProgress::Complete(self.assemble(true)?));
        }

        let staged = slot(self.state).map(|i| &self.staged[i]);
        Ok(ChunkProgress::Receiving {
            state: self.state,
            received: staged.map_or(0, |s| s.bytes.len()),
            expected: staged.map_or(0, |s| s.capacity),
        })
    }

    /// Complete early with the whole elements received so far
    pub fn finalize(&mut self) -> Result<AssembledMesh> {
        if slot(self.state).is_none() {
            return Err(SynavisError::UnexpectedData(format!(
                "nothing to finalize in state {}",
                self.state.name()
            )));
        }
        self.assemble(false)
    }

    /// Back to Idle from any state
    pub fn reset(&mut self) {
        self.state = ReceptionState::Idle;
        self.name = None;
        self.staged = Default::default();
    }

    /// Advance past every array that is already full
    fn skip_full(&mut self) {
        while let Some(index) = slot(self.state) {
            if self.staged[index].remaining() > 0 {
                break;
            }
            self.state = self.state.next();
        }
    }

    /// Build the mesh from the staged bytes and return to Idle
    fn assemble(&mut self, complete: bool) -> Result<AssembledMesh> {
        let name = self.name.take();
        let [points, normals, triangles, uvs] = std::mem::take(&mut self.staged);
        self.reset();
        let mut buffer = GeometryBuffer {
            points: cast_elements(ArrayKind::Points, whole(&points.bytes, ArrayKind::Points))?,
            normals: cast_elements(ArrayKind::Normals, whole(&normals.bytes, ArrayKind::Normals))?,
            triangles: cast_elements(
                ArrayKind::Triangles,
                whole(&triangles.bytes, ArrayKind::Triangles),
            )?,
            uvs: cast_elements(ArrayKind::TexCoords, whole(&uvs.bytes, ArrayKind::TexCoords))?,
            ..Default::default()
        };
        if complete || buffer.normals.len() >= buffer.points.len() {
            buffer.synthesize_tangents()?;
        }
        Ok(AssembledMesh {
            name,
            geometry: buffer,
        })
    }
}

fn too_large(header: GeometryHeader, limit: usize) -> SynavisError {
    SynavisError::MalformedValue(format!(
        "geometry header of {} points and {} indices exceeds the {} byte limit",
        header.points, header.triangles, limit
    ))
}

fn slot(state: ReceptionState) -> Option<usize> {
    match state.array()? {
        ArrayKind::Points => Some(0),
        ArrayKind::Normals => Some(1),
        ArrayKind::Triangles => Some(2),
        ArrayKind::TexCoords => Some(3),
        _ => None,
    }
}

fn whole(bytes: &[u8], kind: ArrayKind) -> &[u8] {
    let size = kind.element_size();
    &bytes[..bytes.len() / size * size]
}

/// Decode a direct-mode mesh
///
/// Byte lengths must be exact multiples of the element size. Missing or empty
/// tangents are synthesized from the normals.
pub fn decode_direct(geometry: &DirectGeometry) -> Result<GeometryBuffer> {
    let mut buffer = GeometryBuffer {
        points: cast_elements(ArrayKind::Points, &decode_array(ArrayKind::Points, &geometry.points)?)?,
        normals: cast_elements(
            ArrayKind::Normals,
            &decode_array(ArrayKind::Normals, &geometry.normals)?,
        )?,
        triangles: cast_elements(
            ArrayKind::Triangles,
            &decode_array(ArrayKind::Triangles, &geometry.triangles)?,
        )?,
        uvs: cast_elements(
            ArrayKind::TexCoords,
            &decode_array(ArrayKind::TexCoords, &geometry.texcoords)?,
        )?,
        ..Default::default()
    };

    match present(&geometry.tangents) {
        Some(encoded) => {
            buffer.tangents =
                cast_elements(ArrayKind::Tangents, &decode_array(ArrayKind::Tangents, encoded)?)?
        }
        None => buffer.synthesize_tangents()?,
    }

    if let Some(encoded) = present(&geometry.scalars) {
        let (scalars, range) = decode_scalars(&decode_array(ArrayKind::Scalars, encoded)?)?;
        buffer.scalars = scalars;
        buffer.scalar_range = range;
    }
    Ok(buffer)
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn decode_array(kind: ArrayKind, encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| SynavisError::MalformedValue(format!("{}: invalid base64: {}", kind.field_name(), e)))
}
