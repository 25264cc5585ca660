//! 场景图系统模块
//!
//! - Node: 场景节点（父子关系和变换）
//! - Transform: 变换组件（位置、欧拉角旋转、缩放）
//! - Scene: 场景容器
//! - Camera: 透视相机
//! - Drawable: 几何体 + 材质组件
//! - RenderOrder: 不透明/透明绘制排序
//! - TransformSystem: 解耦的变换更新系统

pub mod camera;
pub mod drawable;
pub mod node;
pub mod ordering;
pub mod scene;
pub mod transform;
pub mod transform_system;

// 重新导出常用类型
pub use camera::Camera;
pub use drawable::Drawable;
pub use node::Node;
pub use ordering::RenderOrder;
pub use scene::Scene;
pub use transform::Transform;

use glam::Mat4;
use slotmap::new_key_type;

use crate::errors::Result;
use crate::resources::bindable::ResourceHandle;

new_key_type! {
    pub struct NodeKey;
}

/// Writes a matrix into a uniform buffer handle, marking it dirty.
pub(crate) fn write_mat4(handle: &ResourceHandle, value: Mat4) -> Result<()> {
    match handle.write().as_buffer_mut() {
        Some(buffer) => buffer.set_mat4(value),
        None => Ok(()),
    }
}
