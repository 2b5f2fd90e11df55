//! Legacy `buffer` streaming
//!
//! Older clients open one named destination array at a time, stream raw
//! frames into it and close it again. Closed arrays are staged until
//! `finalize` turns them into a mesh.

use crate::config::DEFAULT_MAX_GEOMETRY_BYTES;
use synavis_core::geometry::cast_elements;
use synavis_core::{ArrayKind, GeometryBuffer, Result, SynavisError};
use tracing::debug;

#[derive(Debug)]
struct OpenBuffer {
    name: String,
    kind: ArrayKind,
    size: usize,
    bytes: Vec<u8>,
}

/// Bytes received against the declared size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transit {
    pub received: usize,
    pub size: usize,
}

#[derive(Debug)]
pub struct LegacyBuffers {
    open: Option<OpenBuffer>,
    staged: GeometryBuffer,
    /// Largest size one buffer may declare
    limit: usize,
}

impl Default for LegacyBuffers {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_GEOMETRY_BYTES)
    }
}

impl LegacyBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            open: None,
            staged: GeometryBuffer::default(),
            limit,
        }
    }

    /// Name of the destination currently open
    pub fn open_name(&self) -> Option<&str> {
        self.open.as_ref().map(|b| b.name.as_str())
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Open a destination array of `size` bytes
    ///
    /// The array grows with the received frames; `size` is only a bound.
    pub fn start(&mut self, name: &str, size: usize) -> Result<()> {
        if let Some(open) = &self.open {
            return Err(SynavisError::UnexpectedData(format!(
                "buffer '{}' is still open",
                open.name
            )));
        }
        let kind = ArrayKind::from_buffer_name(name)
            .ok_or_else(|| SynavisError::NotFound(format!("buffer destination '{name}'")))?;
        if size > self.limit {
            return Err(SynavisError::MalformedValue(format!(
                "{name}: size {size} exceeds the {} byte limit",
                self.limit
            )));
        }
        if size % kind.element_size() != 0 {
            return Err(SynavisError::MalformedValue(format!(
                "{name}: size {size} is not a multiple of {}",
                kind.element_size()
            )));
        }
        self.open = Some(OpenBuffer {
            name: name.to_string(),
            kind,
            size,
            bytes: Vec::new(),
        });
        Ok(())
    }

    /// Append one raw frame to the open array
    pub fn append(&mut self, bytes: &[u8]) -> Result<(String, Transit)> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| SynavisError::UnexpectedData("no buffer is open".into()))?;
        if open.bytes.len() + bytes.len() > open.size {
            return Err(SynavisError::UnexpectedData(format!(
                "{}: {} more bytes would exceed the declared {}",
                open.name,
                bytes.len(),
                open.size
            )));
        }
        open.bytes.extend_from_slice(bytes);
        debug!("Buffer {}: {}/{} bytes", open.name, open.bytes.len(), open.size);
        Ok((
            open.name.clone(),
            Transit {
                received: open.bytes.len(),
                size: open.size,
            },
        ))
    }

    /// Close the open array and stage its elements
    pub fn stop(&mut self, name: &str) -> Result<()> {
        let open = match &self.open {
            Some(open) if open.name == name => open,
            Some(open) => {
                return Err(SynavisError::UnexpectedData(format!(
                    "stop for '{}' while '{}' is open",
                    name, open.name
                )));
            }
            None => return Err(SynavisError::NotFound(format!("open buffer '{name}'"))),
        };

        match open.kind {
            ArrayKind::Points => self.staged.points = cast_elements(open.kind, &open.bytes)?,
            ArrayKind::Normals => self.staged.normals = cast_elements(open.kind, &open.bytes)?,
            ArrayKind::Triangles => self.staged.triangles = cast_elements(open.kind, &open.bytes)?,
            ArrayKind::TexCoords => self.staged.uvs = cast_elements(open.kind, &open.bytes)?,
            ArrayKind::Tangents | ArrayKind::Scalars => {
                return Err(SynavisError::NotFound(format!("buffer destination '{name}'")));
            }
        }
        self.open = None;
        Ok(())
    }

    /// Take the staged arrays, synthesizing tangents when normals allow
    pub fn take_staged(&mut self) -> Result<GeometryBuffer> {
        if self.is_open() || self.staged.points.is_empty() {
            return Err(SynavisError::UnexpectedData(
                "no complete legacy buffers to build".into(),
            ));
        }
        let mut buffer = std::mem::take(&mut self.staged);
        if buffer.normals.len() >= buffer.points.len() {
            buffer.synthesize_tangents()?;
        }
        Ok(buffer)
    }

    pub fn reset(&mut self) {
        self.open = None;
        self.staged.clear();
    }
}
