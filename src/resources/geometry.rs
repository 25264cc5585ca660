use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::errors::{PrismError, Result};
use crate::resources::bindable::{Bindable, ResourceHandle};
use crate::resources::primitives;

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(0);

/// Interleaved vertex: `float32x4` position, `float32x3` normal, `float32x2` uv.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Byte stride of one interleaved vertex.
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x4,
        1 => Float32x3,
        2 => Float32x2,
    ];

    #[inline]
    #[must_use]
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            normal,
            uv,
        }
    }
}

/// GPU side of a geometry, created on first render.
#[derive(Debug)]
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_format: wgpu::IndexFormat,
    pub index_count: u32,
}

/// Indexed triangle geometry, optionally extended with per-instance buffers.
///
/// Every extra buffer must be a [`DataBuffer`](crate::resources::DataBuffer)
/// created with `VERTEX` usage and a
/// [`VertexAttributeInfo`](crate::resources::VertexAttributeInfo); it becomes
/// one vertex buffer slot stepped per instance, after the interleaved one.
#[derive(Debug)]
pub struct Geometry {
    id: u64,
    pub label: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    instance_buffers: Vec<ResourceHandle>,
    gpu: Option<GpuGeometry>,
}

impl Geometry {
    #[must_use]
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            label: "Geometry".to_string(),
            vertices,
            indices,
            instance_buffers: Vec::new(),
            gpu: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Adds a per-instance buffer. Its attribute location must not collide
    /// with 0..=2 or with another instance buffer.
    #[must_use]
    pub fn with_instance_buffer(mut self, buffer: ResourceHandle) -> Self {
        self.instance_buffers.push(buffer);
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// A geometry without triangles draws nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// `Uint16` while every vertex fits in 16 bits, `Uint32` otherwise.
    #[must_use]
    pub fn index_format(&self) -> wgpu::IndexFormat {
        if self.vertices.len() <= usize::from(u16::MAX) + 1 {
            wgpu::IndexFormat::Uint16
        } else {
            wgpu::IndexFormat::Uint32
        }
    }

    /// Checks that every index names an existing vertex.
    pub fn validate(&self) -> Result<()> {
        let count = self.vertices.len();
        match self.indices.iter().find(|&&i| i as usize >= count) {
            Some(&index) => Err(PrismError::InvalidGeometry(format!(
                "'{}': index {index} out of range for {count} vertices",
                self.label
            ))),
            None => Ok(()),
        }
    }

    #[inline]
    #[must_use]
    pub fn instance_buffers(&self) -> &[ResourceHandle] {
        &self.instance_buffers
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    #[inline]
    #[must_use]
    pub fn gpu(&self) -> Option<&GpuGeometry> {
        self.gpu.as_ref()
    }

    /// Center of the vertex positions' bounding box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for v in &self.vertices {
            let p = Vec3::new(v.position[0], v.position[1], v.position[2]);
            min = min.min(p);
            max = max.max(p);
        }
        if self.vertices.is_empty() {
            Vec3::ZERO
        } else {
            (min + max) * 0.5
        }
    }

    /// Creates the vertex and index buffers and initializes the instance buffers.
    pub fn initialize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        if self.gpu.is_none() {
            self.validate()?;
            let index_format = self.index_format();
            let index_bytes: Vec<u8> = match index_format {
                wgpu::IndexFormat::Uint16 => {
                    let narrow: Vec<u16> = self.indices.iter().map(|&i| i as u16).collect();
                    bytemuck::cast_slice(&narrow).to_vec()
                }
                wgpu::IndexFormat::Uint32 => bytemuck::cast_slice(&self.indices).to_vec(),
            };
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vertex buffer"),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("index buffer"),
                contents: &index_bytes,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            });
            log::debug!(
                "Geometry '{}' uploaded: {} vertices, {} indices ({index_format:?}), {} instance buffers",
                self.label,
                self.vertices.len(),
                self.indices.len(),
                self.instance_buffers.len()
            );
            self.gpu = Some(GpuGeometry {
                vertex_buffer,
                index_buffer,
                index_format,
                index_count: self.index_count(),
            });
        }
        self.prepare_instance_buffers(device, queue)
    }

    /// Keeps the instance buffers current. Compute passes may also write them
    /// directly on the GPU.
    pub fn prepare_instance_buffers(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        for handle in &self.instance_buffers {
            let mut res = handle.write();
            if !res.is_initialized() || res.needs_update() {
                res.prepare(device, queue)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Primitive shortcuts
    // ========================================================================

    #[must_use]
    pub fn new_box(width: f32, height: f32, depth: f32) -> Self {
        primitives::create_box(width, height, depth)
    }

    #[must_use]
    pub fn new_sphere(radius: f32) -> Self {
        primitives::create_sphere(&primitives::SphereOptions {
            radius,
            ..Default::default()
        })
    }

    #[must_use]
    pub fn new_plane(width: f32, height: f32) -> Self {
        primitives::create_plane(&primitives::PlaneOptions {
            width,
            height,
            ..Default::default()
        })
    }
}
