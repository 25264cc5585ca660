//! Vertex Layout Generator
//!
//! Produces the wgpu vertex buffer layouts for a [`Geometry`]: slot 0 is the
//! interleaved vertex stream, followed by one per-instance slot for each
//! extra buffer, in insertion order.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::{PrismError, Result};
use crate::resources::bindable::Bindable;
use crate::resources::geometry::{Geometry, Vertex};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnedVertexBufferDesc {
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: SmallVec<[wgpu::VertexAttribute; 3]>,
}

impl OwnedVertexBufferDesc {
    #[must_use]
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// Layout of the interleaved position/normal/uv stream.
#[must_use]
pub fn base_vertex_layout() -> OwnedVertexBufferDesc {
    OwnedVertexBufferDesc {
        array_stride: Vertex::STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: SmallVec::from_slice(&Vertex::ATTRIBUTES),
    }
}

/// Builds and validates the vertex layouts for `geometry`.
pub fn generate_vertex_layout(geometry: &Geometry) -> Result<Vec<OwnedVertexBufferDesc>> {
    let mut layouts = Vec::with_capacity(1 + geometry.instance_buffers().len());
    layouts.push(base_vertex_layout());

    for handle in geometry.instance_buffers() {
        let res = handle.read();
        let label = res.label().to_string();
        let buffer = res.as_buffer().ok_or_else(|| {
            PrismError::VertexLayoutMismatch(format!("instance buffer '{label}' is not a data buffer"))
        })?;
        buffer.require_usage(wgpu::BufferUsages::VERTEX)?;
        let attr = buffer.vertex_attribute().ok_or_else(|| {
            PrismError::VertexLayoutMismatch(format!(
                "instance buffer '{label}' has no vertex attribute"
            ))
        })?;

        let mut attributes = SmallVec::new();
        attributes.push(wgpu::VertexAttribute {
            format: attr.format,
            offset: attr.offset,
            shader_location: attr.shader_location,
        });
        layouts.push(OwnedVertexBufferDesc {
            array_stride: attr.stride,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes,
        });
    }

    validate_vertex_layouts(&layouts)?;
    Ok(layouts)
}

/// Every attribute across all buffers needs its own shader location, and each
/// attribute must fit inside its stride.
pub fn validate_vertex_layouts(layouts: &[OwnedVertexBufferDesc]) -> Result<()> {
    let mut seen: FxHashMap<u32, usize> = FxHashMap::default();
    for (slot, layout) in layouts.iter().enumerate() {
        for attr in &layout.attributes {
            if let Some(prev) = seen.insert(attr.shader_location, slot) {
                return Err(PrismError::VertexLayoutMismatch(format!(
                    "@location({}) used by vertex buffers {prev} and {slot}",
                    attr.shader_location
                )));
            }
            if attr.offset + attr.format.size() > layout.array_stride {
                return Err(PrismError::VertexLayoutMismatch(format!(
                    "@location({}) at offset {} overruns stride {}",
                    attr.shader_location, attr.offset, layout.array_stride
                )));
            }
        }
    }
    Ok(())
}
