//! 渲染管线模块
//!
//! - Material: 光栅化管线（vertex + fragment）
//! - Compute: 计算管线
//! - vertex: 顶点布局生成与校验
//! - shader_chunks: `#include` 预处理

pub mod compute;
pub mod material;
pub mod shader_chunks;
pub mod vertex;

pub use compute::Compute;
pub use material::{Material, MaterialHandle, MaterialOptions, TargetFormats};
pub use shader_chunks::{ShaderChunks, parse_includes};
pub use vertex::{OwnedVertexBufferDesc, generate_vertex_layout};

use std::sync::Arc;

use crate::errors::{PrismError, Result};

/// Preprocesses and compiles WGSL, surfacing validation errors instead of
/// handing them to the device's uncaptured-error handler.
pub(crate) fn create_shader_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    chunks: Option<&Arc<ShaderChunks>>,
) -> Result<wgpu::ShaderModule> {
    let code = match chunks {
        Some(chunks) => chunks.resolve(source)?,
        None => parse_includes(source)?,
    };

    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(code.into()),
    });
    if let Some(err) = pollster::block_on(scope.pop()) {
        return Err(PrismError::ShaderCompile {
            label: label.to_string(),
            message: err.to_string(),
        });
    }

    log::debug!("Shader module '{label}' compiled");
    Ok(module)
}
