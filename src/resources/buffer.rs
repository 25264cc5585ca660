use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::errors::{PrismError, Result};
use crate::resources::bindable::{Bindable, BindingView, ResourceState, not_initialized};

// 全局 Buffer ID 生成器
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// How a data buffer is seen from a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferBinding {
    Uniform,
    /// `var<storage, read_write>`
    Storage,
    /// `var<storage, read>`
    ReadOnlyStorage,
}

/// Per-instance vertex attribute carried by a buffer used for instancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeInfo {
    pub shader_location: u32,
    pub offset: u64,
    pub stride: u64,
    pub format: wgpu::VertexFormat,
}

/// CPU 端数据 + GPU Buffer
///
/// The payload is padded to a multiple of 4 bytes, the copy alignment wgpu
/// requires for `write_buffer`; `len` keeps the unpadded byte length. Usage flags are taken as given; nothing is
/// inferred from how the buffer is later bound.
#[derive(Debug)]
pub struct DataBuffer {
    id: u64,
    label: String,
    data: Vec<u8>,
    len: usize,
    usage: wgpu::BufferUsages,
    binding: Option<BufferBinding>,
    vertex_attribute: Option<VertexAttributeInfo>,
    state: ResourceState<wgpu::Buffer>,
}

impl DataBuffer {
    #[must_use]
    pub fn new<T: Pod>(data: &[T], usage: wgpu::BufferUsages, label: Option<&str>) -> Self {
        Self::from_bytes(bytemuck::cast_slice(data), usage, label)
    }

    #[must_use]
    pub fn from_bytes(data: &[u8], usage: wgpu::BufferUsages, label: Option<&str>) -> Self {
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            label: label.unwrap_or("Buffer").to_string(),
            data: pad_to_copy_alignment(data.to_vec()),
            len: data.len(),
            usage,
            binding: None,
            vertex_attribute: None,
            state: ResourceState::Uninitialized,
        }
    }

    /// A zero-filled buffer of `size` bytes.
    #[must_use]
    pub fn zeroed(size: usize, usage: wgpu::BufferUsages, label: Option<&str>) -> Self {
        Self::from_bytes(&vec![0u8; size], usage, label)
    }

    /// A uniform buffer holding one `Pod` value.
    #[must_use]
    pub fn uniform<T: Pod>(value: &T, label: Option<&str>) -> Self {
        Self::new(
            std::slice::from_ref(value),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            label,
        )
        .with_binding(BufferBinding::Uniform)
    }

    /// A read-write storage buffer that can also be read back and fed to the
    /// vertex stage.
    #[must_use]
    pub fn storage<T: Pod>(data: &[T], label: Option<&str>) -> Self {
        Self::new(
            data,
            wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            label,
        )
        .with_binding(BufferBinding::Storage)
    }

    // ========================================================================
    // Typed uniforms
    // ========================================================================

    #[must_use]
    pub fn float(value: f32, label: Option<&str>) -> Self {
        Self::uniform(&value, label)
    }

    #[must_use]
    pub fn vec3(value: Vec3, label: Option<&str>) -> Self {
        Self::uniform(&value.to_array(), label)
    }

    #[must_use]
    pub fn vec4(value: Vec4, label: Option<&str>) -> Self {
        Self::uniform(&value.to_array(), label)
    }

    #[must_use]
    pub fn mat4(value: Mat4, label: Option<&str>) -> Self {
        Self::uniform(&value.to_cols_array(), label)
    }

    pub fn set_float(&mut self, value: f32) -> Result<()> {
        self.write(&[value])
    }

    pub fn set_vec3(&mut self, value: Vec3) -> Result<()> {
        self.write(&value.to_array())
    }

    pub fn set_vec4(&mut self, value: Vec4) -> Result<()> {
        self.write(&value.to_array())
    }

    pub fn set_mat4(&mut self, value: Mat4) -> Result<()> {
        self.write(&value.to_cols_array())
    }

    // ========================================================================
    // Builders
    // ========================================================================

    #[must_use]
    pub fn with_binding(mut self, binding: BufferBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    #[must_use]
    pub fn with_vertex_attribute(mut self, attribute: VertexAttributeInfo) -> Self {
        self.vertex_attribute = Some(attribute);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn usage(&self) -> wgpu::BufferUsages {
        self.usage
    }

    #[inline]
    #[must_use]
    pub fn binding(&self) -> Option<BufferBinding> {
        self.binding
    }

    #[inline]
    #[must_use]
    pub fn vertex_attribute(&self) -> Option<VertexAttributeInfo> {
        self.vertex_attribute
    }

    /// Byte size of the (padded) payload and of the GPU allocation.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Byte length of the payload as written, before padding.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// CPU-side copy of the payload reinterpreted as `T`, without padding.
    #[must_use]
    pub fn read_as<T: Pod>(&self) -> Vec<T> {
        bytemuck::pod_collect_to_vec(&self.data[..whole_elements::<T>(self.len)])
    }

    /// The GPU buffer, once initialized.
    #[inline]
    #[must_use]
    pub fn gpu_buffer(&self) -> Option<&wgpu::Buffer> {
        self.state.handle()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Replaces the whole payload.
    ///
    /// Once the GPU buffer exists its size is fixed, so the new payload must
    /// pad to the same byte length.
    pub fn write<T: Pod>(&mut self, data: &[T]) -> Result<()> {
        let raw: &[u8] = bytemuck::cast_slice(data);
        let len = raw.len();
        let bytes = pad_to_copy_alignment(raw.to_vec());
        if self.state.is_initialized() && bytes.len() != self.data.len() {
            return Err(PrismError::PayloadSizeMismatch {
                label: self.label.clone(),
                expected: self.data.len(),
                actual: bytes.len(),
            });
        }
        self.data = bytes;
        self.len = len;
        self.state.mark_dirty();
        Ok(())
    }

    /// Overwrites part of the payload starting at `offset` bytes.
    pub fn write_at<T: Pod>(&mut self, offset: usize, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let end = offset + bytes.len();
        if end > self.data.len() {
            return Err(PrismError::PayloadSizeMismatch {
                label: self.label.clone(),
                expected: self.data.len(),
                actual: end,
            });
        }
        self.data[offset..end].copy_from_slice(bytes);
        self.len = self.len.max(end);
        self.state.mark_dirty();
        Ok(())
    }

    /// Fails unless every flag in `required` was requested at construction.
    pub(crate) fn require_usage(&self, required: wgpu::BufferUsages) -> Result<()> {
        if self.usage.contains(required) {
            Ok(())
        } else {
            Err(PrismError::MissingUsage {
                label: self.label.clone(),
                required,
            })
        }
    }
}

impl Bindable for DataBuffer {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    fn needs_update(&self) -> bool {
        self.state.needs_update()
    }

    fn initialize(&mut self, device: &wgpu::Device, _queue: &wgpu::Queue) -> Result<()> {
        if self.state.is_initialized() {
            return Ok(());
        }
        // mapped_at_creation 上传初始数据
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&self.label),
            contents: &self.data,
            usage: self.usage,
        });
        log::debug!("Buffer '{}' allocated ({} bytes)", self.label, self.data.len());
        self.state = ResourceState::Ready(buffer);
        Ok(())
    }

    fn update(&mut self, queue: &wgpu::Queue) -> Result<()> {
        if !self.state.needs_update() {
            return Ok(());
        }
        self.require_usage(wgpu::BufferUsages::COPY_DST)?;
        let buffer = self.state.handle().ok_or_else(|| not_initialized(&self.label))?;
        queue.write_buffer(buffer, 0, &self.data);
        self.state.mark_clean();
        Ok(())
    }

    fn resource(&self) -> Result<BindingView> {
        self.state
            .handle()
            .cloned()
            .map(BindingView::Buffer)
            .ok_or_else(|| not_initialized(&self.label))
    }
}

/// Byte length of the whole `T`s that fit in `len` bytes.
pub(crate) fn whole_elements<T>(len: usize) -> usize {
    let size = std::mem::size_of::<T>().max(1);
    len / size * size
}

fn pad_to_copy_alignment(mut bytes: Vec<u8>) -> Vec<u8> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let padded = bytes.len().div_ceil(align) * align;
    bytes.resize(padded.max(align), 0);
    bytes
}

// ============================================================================
// Structured layouts
// ============================================================================

/// Scalar and vector field types of a structured buffer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Float,
    Int,
    Uint,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl FieldType {
    #[must_use]
    pub const fn size(self) -> u64 {
        match self {
            Self::Float | Self::Int | Self::Uint => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
            Self::Mat4 => 64,
        }
    }

    /// Matching vertex format, when the field can feed a vertex attribute.
    #[must_use]
    pub const fn vertex_format(self) -> Option<wgpu::VertexFormat> {
        match self {
            Self::Float => Some(wgpu::VertexFormat::Float32),
            Self::Int => Some(wgpu::VertexFormat::Sint32),
            Self::Uint => Some(wgpu::VertexFormat::Uint32),
            Self::Vec2 => Some(wgpu::VertexFormat::Float32x2),
            Self::Vec3 => Some(wgpu::VertexFormat::Float32x3),
            Self::Vec4 => Some(wgpu::VertexFormat::Float32x4),
            Self::Mat4 => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StructField {
    name: String,
    ty: FieldType,
    count: u32,
}

/// Tightly packed element layout for structured storage buffers.
///
/// Fields are laid out in insertion order with no implicit padding; the
/// shader-side struct must be declared to match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructLayout {
    fields: Vec<StructField>,
}

impl StructLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field. `count` > 1 declares a fixed-size array.
    #[must_use]
    pub fn field(mut self, name: &str, ty: FieldType, count: u32) -> Self {
        self.fields.push(StructField {
            name: name.to_string(),
            ty,
            count: count.max(1),
        });
        self
    }

    /// Byte size of one element.
    #[must_use]
    pub fn stride(&self) -> u64 {
        self.fields
            .iter()
            .map(|f| f.ty.size() * u64::from(f.count))
            .sum()
    }

    /// Byte offset of `name` within one element.
    #[must_use]
    pub fn offset_of(&self, name: &str) -> Option<u64> {
        let mut offset = 0;
        for f in &self.fields {
            if f.name == name {
                return Some(offset);
            }
            offset += f.ty.size() * u64::from(f.count);
        }
        None
    }

    /// Builds the per-instance attribute for one field of this layout.
    #[must_use]
    pub fn vertex_attribute(&self, name: &str, shader_location: u32) -> Option<VertexAttributeInfo> {
        let field = self.fields.iter().find(|f| f.name == name)?;
        Some(VertexAttributeInfo {
            shader_location,
            offset: self.offset_of(name)?,
            stride: self.stride(),
            format: field.ty.vertex_format()?,
        })
    }

    /// A zeroed read-write storage buffer holding `count` elements.
    #[must_use]
    pub fn create_buffer(&self, count: usize, label: Option<&str>) -> DataBuffer {
        let size = self.stride() as usize * count;
        DataBuffer::zeroed(
            size,
            wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            label,
        )
        .with_binding(BufferBinding::Storage)
    }
}
