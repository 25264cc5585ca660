use std::borrow::Cow;

use glam::{Mat4, Vec3};
use uuid::Uuid;

use crate::errors::Result;
use crate::renderer::core::group::ResourceGroup;
use crate::resources::bindable::ResourceHandle;
use crate::resources::buffer::DataBuffer;
use crate::scene::transform::Transform;
use crate::scene::write_mat4;

/// Perspective camera.
///
/// The camera is not part of the node hierarchy; its [`Transform`] is its
/// world transform. Its resource group (bound at group 2) carries:
///
/// | binding | value                    |
/// |---------|--------------------------|
/// | 0       | view matrix              |
/// | 1       | projection matrix        |
/// | 2       | camera world matrix      |
#[derive(Debug)]
pub struct Camera {
    pub uuid: Uuid,
    pub name: Cow<'static, str>,

    // === 投影属性 ===
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub transform: Transform,

    // 缓存的矩阵 renderer只读
    pub(crate) view_matrix: Mat4,
    pub(crate) projection_matrix: Mat4,

    view_buffer: ResourceHandle,
    projection_buffer: ResourceHandle,
    world_buffer: ResourceHandle,
    group: ResourceGroup,
}

impl Camera {
    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let projection_matrix = Mat4::perspective_rh(fov.to_radians(), aspect, near, far);

        let view_buffer = DataBuffer::mat4(Mat4::IDENTITY, Some("Camera View")).into_handle();
        let projection_buffer = DataBuffer::mat4(projection_matrix, Some("Camera Projection")).into_handle();
        let world_buffer = DataBuffer::mat4(Mat4::IDENTITY, Some("Camera World")).into_handle();

        let stages = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let group = ResourceGroup::new("Camera")
            .with(0, stages, ResourceHandle::clone(&view_buffer))
            .with(1, stages, ResourceHandle::clone(&projection_buffer))
            .with(2, stages, ResourceHandle::clone(&world_buffer));

        Self {
            uuid: Uuid::new_v4(),
            name: Cow::Borrowed("Camera"),
            fov,
            aspect,
            near,
            far,
            transform: Transform::new(),
            view_matrix: Mat4::IDENTITY,
            projection_matrix,
            view_buffer,
            projection_buffer,
            world_buffer,
            group,
        }
    }

    pub fn update_projection_matrix(&mut self) -> Result<()> {
        // glam 的 perspective_rh 深度范围为 0..1，与 wgpu 一致
        self.projection_matrix =
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far);
        write_mat4(&self.projection_buffer, self.projection_matrix)
    }

    /// Recomposes the transform and sets `view = inverse(world)`.
    pub fn update_view_matrix(&mut self) -> Result<()> {
        // 相机不在层级中，world 始终等于 local
        self.transform.update_local_matrix();
        let world = self.transform.local_matrix;
        self.transform.set_world_matrix(world);
        self.view_matrix = world.inverse();

        write_mat4(&self.view_buffer, self.view_matrix)?;
        write_mat4(&self.world_buffer, world)
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.transform.look_at(target, Vec3::Y);
    }

    pub fn set_aspect(&mut self, aspect: f32) -> Result<()> {
        self.aspect = aspect;
        self.update_projection_matrix()
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_buffer(&self) -> &ResourceHandle {
        &self.view_buffer
    }

    #[inline]
    #[must_use]
    pub fn projection_buffer(&self) -> &ResourceHandle {
        &self.projection_buffer
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_mat4(handle: &ResourceHandle) -> Mat4 {
        let res = handle.read();
        let cols: Vec<f32> = res.as_buffer().map(DataBuffer::read_as::<f32>).unwrap_or_default();
        Mat4::from_cols_slice(&cols)
    }

    #[test]
    fn view_is_inverse_world() {
        let mut cam = Camera::new_perspective(60.0, 1.5, 0.1, 100.0);
        cam.transform.position = Vec3::new(0.0, 2.0, 5.0);
        cam.update_view_matrix().unwrap();

        let expected = Mat4::from_translation(Vec3::new(0.0, 2.0, 5.0)).inverse();
        assert!(cam.view_matrix().abs_diff_eq(expected, 1e-5));
        assert!(read_mat4(cam.view_buffer()).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn projection_follows_aspect() {
        let mut cam = Camera::new_perspective(75.0, 1.0, 0.1, 100.0);
        cam.set_aspect(2.0).unwrap();
        let expected = Mat4::perspective_rh(75f32.to_radians(), 2.0, 0.1, 100.0);
        assert!(read_mat4(cam.projection_buffer()).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn group_has_three_uniforms() {
        let cam = Camera::new_perspective(75.0, 1.0, 0.1, 100.0);
        let entries = cam.group().layout_entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| matches!(
            e.ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                ..
            }
        )));
    }
}
