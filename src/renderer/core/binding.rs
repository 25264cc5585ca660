//! GPU 绑定描述与 Layout 推导
//!
//! A [`BindingDescriptor`] ties a slot and a visibility mask to a shared
//! resource. [`derive_layout_entries`] maps an ordered descriptor list to
//! `BindGroupLayoutEntry`s; it only looks at each resource's
//! [`BindingShape`], never at payload values.

use crate::errors::{PrismError, Result};
use crate::resources::bindable::{Bindable, BindingShape, ResourceHandle};
use crate::resources::buffer::BufferBinding;
use crate::resources::texture::TEXTURE_FORMAT;

/// `{slot, visibility, resource}` triple.
#[derive(Debug, Clone)]
pub struct BindingDescriptor {
    pub slot: u32,
    pub visibility: wgpu::ShaderStages,
    pub resource: ResourceHandle,
}

impl BindingDescriptor {
    #[must_use]
    pub fn new(slot: u32, visibility: wgpu::ShaderStages, resource: ResourceHandle) -> Self {
        Self {
            slot,
            visibility,
            resource,
        }
    }

    /// Shape of the bound resource, or `UnbindableResource`.
    pub fn shape(&self) -> Result<BindingShape> {
        let res = self.resource.read();
        res.shape().ok_or_else(|| PrismError::UnbindableResource {
            slot: self.slot,
            label: res.label().to_string(),
            reason: "data buffer has no binding kind (uniform/storage)",
        })
    }
}

/// Layout entry for one binding shape.
#[must_use]
pub fn layout_entry(
    slot: u32,
    visibility: wgpu::ShaderStages,
    shape: BindingShape,
) -> wgpu::BindGroupLayoutEntry {
    let ty = match shape {
        BindingShape::Buffer(binding) => wgpu::BindingType::Buffer {
            ty: match binding {
                BufferBinding::Uniform => wgpu::BufferBindingType::Uniform,
                BufferBinding::Storage => wgpu::BufferBindingType::Storage { read_only: false },
                BufferBinding::ReadOnlyStorage => {
                    wgpu::BufferBindingType::Storage { read_only: true }
                }
            },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        BindingShape::Sampler => {
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
        }
        // External frames are bound as ordinary 2D float textures
        BindingShape::SampledTexture | BindingShape::ExternalTexture => {
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            }
        }
        BindingShape::StorageTexture => wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: TEXTURE_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
    };

    wgpu::BindGroupLayoutEntry {
        binding: slot,
        visibility,
        ty,
        count: None,
    }
}

/// Derives the layout entries for an ordered descriptor list.
///
/// Fails on the first unbindable resource or repeated slot; a skipped entry
/// would silently shift every later binding.
pub fn derive_layout_entries(
    descriptors: &[BindingDescriptor],
) -> Result<Vec<wgpu::BindGroupLayoutEntry>> {
    let mut entries: Vec<wgpu::BindGroupLayoutEntry> = Vec::with_capacity(descriptors.len());
    for desc in descriptors {
        if entries.iter().any(|e| e.binding == desc.slot) {
            return Err(PrismError::DuplicateBinding(desc.slot));
        }
        entries.push(layout_entry(desc.slot, desc.visibility, desc.shape()?));
    }
    Ok(entries)
}
