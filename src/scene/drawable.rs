use glam::Mat4;

use crate::errors::Result;
use crate::renderer::core::group::ResourceGroup;
use crate::renderer::pipeline::{MaterialHandle, OwnedVertexBufferDesc, generate_vertex_layout};
use crate::resources::bindable::ResourceHandle;
use crate::resources::buffer::DataBuffer;
use crate::resources::geometry::Geometry;
use crate::scene::write_mat4;

/// Geometry + material attached to a scene node.
///
/// The transform group (bound at group 1) carries:
///
/// | binding | value                                   |
/// |---------|-----------------------------------------|
/// | 0       | model (local) matrix                    |
/// | 1       | world matrix                            |
/// | 2       | normal matrix `transpose(inverse(view × world))` |
#[derive(Debug)]
pub struct Drawable {
    pub geometry: Geometry,
    pub material: MaterialHandle,
    pub instance_count: u32,

    model_buffer: ResourceHandle,
    world_buffer: ResourceHandle,
    normal_buffer: ResourceHandle,
    group: ResourceGroup,

    vertex_layouts: Option<Vec<OwnedVertexBufferDesc>>,
}

impl Drawable {
    #[must_use]
    pub fn new(geometry: Geometry, material: MaterialHandle) -> Self {
        let model_buffer = DataBuffer::mat4(Mat4::IDENTITY, Some("Model Matrix")).into_handle();
        let world_buffer = DataBuffer::mat4(Mat4::IDENTITY, Some("World Matrix")).into_handle();
        let normal_buffer = DataBuffer::mat4(Mat4::IDENTITY, Some("Normal Matrix")).into_handle();

        let group = ResourceGroup::new("Transform")
            .with(0, wgpu::ShaderStages::VERTEX, ResourceHandle::clone(&model_buffer))
            .with(1, wgpu::ShaderStages::VERTEX, ResourceHandle::clone(&world_buffer))
            .with(2, wgpu::ShaderStages::VERTEX, ResourceHandle::clone(&normal_buffer));

        Self {
            geometry,
            material,
            instance_count: 1,
            model_buffer,
            world_buffer,
            normal_buffer,
            group,
            vertex_layouts: None,
        }
    }

    #[must_use]
    pub fn with_instances(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }

    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.material.read().is_transparent()
    }

    /// Writes this frame's model/world/normal matrices.
    pub fn update_matrices(&mut self, model: Mat4, world: Mat4, view: Mat4) -> Result<()> {
        let normal = (view * world).inverse().transpose();
        write_mat4(&self.model_buffer, model)?;
        write_mat4(&self.world_buffer, world)?;
        write_mat4(&self.normal_buffer, normal)
    }

    /// Vertex layouts for the geometry, computed once.
    pub fn vertex_layouts(&mut self) -> Result<&[OwnedVertexBufferDesc]> {
        let layouts = match self.vertex_layouts.take() {
            Some(layouts) => layouts,
            None => generate_vertex_layout(&self.geometry)?,
        };
        Ok(self.vertex_layouts.insert(layouts).as_slice())
    }

    #[inline]
    #[must_use]
    pub fn group(&self) -> &ResourceGroup {
        &self.group
    }

    #[inline]
    pub fn group_mut(&mut self) -> &mut ResourceGroup {
        &mut self.group
    }

    #[inline]
    #[must_use]
    pub fn normal_buffer(&self) -> &ResourceHandle {
        &self.normal_buffer
    }
}
