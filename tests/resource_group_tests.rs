//! Resource group tests
//!
//! Tests for:
//! - Layout entry derivation per resource kind
//! - Unbindable resources and duplicate slots
//! - Bind group caching (GPU; skipped when no adapter is available)

use std::sync::Arc;

use prism::renderer::core::derive_layout_entries;
use prism::resources::{
    BindableResource, DataBuffer, ExternalTexture, LatestFrame, ResourceHandle, SampledTexture,
    Sampler, StorageTexture,
};
use prism::{PrismError, RenderSettings, Renderer, ResourceGroup};

// ============================================================================
// Helper
// ============================================================================

fn uniform() -> ResourceHandle {
    DataBuffer::float(1.0, Some("u")).into_handle()
}

fn external() -> ResourceHandle {
    ExternalTexture::new(LatestFrame::new(), Some("external")).into_handle()
}

fn headless() -> Option<Renderer> {
    let _ = env_logger::builder().is_test(true).try_init();
    match pollster::block_on(Renderer::headless(16, 16, RenderSettings::default())) {
        Ok(renderer) => Some(renderer),
        Err(e) => {
            log::warn!("Skipping GPU test: {e}");
            None
        }
    }
}

// ============================================================================
// Layout derivation
// ============================================================================

#[test]
fn layout_entries_follow_resource_kinds() {
    let fragment = wgpu::ShaderStages::FRAGMENT;
    let group = ResourceGroup::new("all kinds")
        .with(0, wgpu::ShaderStages::VERTEX_FRAGMENT, uniform())
        .with(1, wgpu::ShaderStages::COMPUTE, DataBuffer::storage(&[0u32; 4], None).into_handle())
        .with(2, fragment, Sampler::linear_repeat(None).into_handle())
        .with(3, fragment, SampledTexture::solid(1, 1, [255; 4], None).into_handle())
        .with(4, wgpu::ShaderStages::COMPUTE, StorageTexture::new(4, 4, None).into_handle())
        .with(5, fragment, external());

    let entries = group.layout_entries().unwrap();
    assert_eq!(entries.len(), 6);
    assert_eq!(
        entries.iter().map(|e| e.binding).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4, 5]
    );

    assert!(matches!(
        entries[0].ty,
        wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            ..
        }
    ));
    assert_eq!(entries[0].visibility, wgpu::ShaderStages::VERTEX_FRAGMENT);
    assert!(matches!(
        entries[1].ty,
        wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            ..
        }
    ));
    assert!(matches!(entries[2].ty, wgpu::BindingType::Sampler(_)));
    assert!(matches!(
        entries[3].ty,
        wgpu::BindingType::Texture {
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
            ..
        }
    ));
    assert!(matches!(
        entries[4].ty,
        wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            ..
        }
    ));
    // External frames share the sampled texture shape
    assert_eq!(entries[5].ty, entries[3].ty);
}

#[test]
fn layout_ignores_payload_values() {
    let a = ResourceGroup::new("a").with(0, wgpu::ShaderStages::VERTEX, uniform());
    let b = ResourceGroup::new("b").with(
        0,
        wgpu::ShaderStages::VERTEX,
        DataBuffer::float(-42.0, None).into_handle(),
    );
    assert_eq!(a.layout_entries().unwrap(), b.layout_entries().unwrap());
}

#[test]
fn descriptors_are_kept_in_slot_order() {
    let group = ResourceGroup::new("unordered")
        .with(2, wgpu::ShaderStages::FRAGMENT, uniform())
        .with(0, wgpu::ShaderStages::FRAGMENT, uniform())
        .with(1, wgpu::ShaderStages::FRAGMENT, uniform());

    let slots: Vec<u32> = group.descriptors().iter().map(|d| d.slot).collect();
    assert_eq!(slots, vec![0, 1, 2]);
    assert!(group.resource(1).is_some());
    assert!(group.resource(7).is_none());
}

#[test]
fn vertex_only_buffer_is_unbindable() {
    let vertex_only = BindableResource::from(DataBuffer::new(
        &[0.0f32; 4],
        wgpu::BufferUsages::VERTEX,
        Some("positions"),
    ))
    .into_handle();
    let group = ResourceGroup::new("bad").with(3, wgpu::ShaderStages::VERTEX, vertex_only);

    match group.layout_entries() {
        Err(PrismError::UnbindableResource { slot, label, .. }) => {
            assert_eq!(slot, 3);
            assert_eq!(label, "positions");
        }
        other => panic!("expected UnbindableResource, got {other:?}"),
    }
}

#[test]
fn duplicate_slots_are_rejected() {
    let group = ResourceGroup::new("dup")
        .with(0, wgpu::ShaderStages::FRAGMENT, uniform())
        .with(0, wgpu::ShaderStages::FRAGMENT, uniform());

    assert!(matches!(
        derive_layout_entries(group.descriptors()),
        Err(PrismError::DuplicateBinding(0))
    ));
}

#[test]
fn external_texture_forces_rebuild() {
    let plain = ResourceGroup::new("plain").with(0, wgpu::ShaderStages::FRAGMENT, uniform());
    assert!(!plain.has_external_texture());
    assert!(plain.requires_rebuild(), "nothing cached yet");

    let volatile = ResourceGroup::new("volatile").with(0, wgpu::ShaderStages::FRAGMENT, external());
    assert!(volatile.has_external_texture());
    assert!(volatile.requires_rebuild());
}

// ============================================================================
// Bind group caching (GPU)
// ============================================================================

#[test]
fn bind_group_is_reused_without_external_textures() {
    let Some(renderer) = headless() else { return };
    let (device, queue) = (renderer.device(), renderer.queue());

    let value = uniform();
    let mut group = ResourceGroup::new("cached")
        .with(0, wgpu::ShaderStages::FRAGMENT, Arc::clone(&value))
        .with(1, wgpu::ShaderStages::FRAGMENT, Sampler::linear_repeat(None).into_handle());

    group.get_or_build(device, queue).unwrap();
    assert_eq!(group.bind_group_builds(), 1);
    assert!(!group.requires_rebuild());

    // Payload writes go through update, not a rebuild
    value.write().as_buffer_mut().unwrap().set_float(2.0).unwrap();
    group.get_or_build(device, queue).unwrap();
    group.get_or_build(device, queue).unwrap();
    assert_eq!(group.bind_group_builds(), 1);
    assert!(value.read().as_buffer().unwrap().gpu_buffer().is_some());
}

#[test]
fn bind_group_with_external_texture_rebuilds_every_call() {
    let Some(renderer) = headless() else { return };
    let (device, queue) = (renderer.device(), renderer.queue());

    let frames = LatestFrame::new();
    let mut group = ResourceGroup::new("video").with(
        0,
        wgpu::ShaderStages::FRAGMENT,
        ExternalTexture::new(Arc::<LatestFrame>::clone(&frames), None).into_handle(),
    );

    // No frame pushed yet: the fallback view is bound
    group.get_or_build(device, queue).unwrap();
    group.get_or_build(device, queue).unwrap();
    group.get_or_build(device, queue).unwrap();
    assert_eq!(group.bind_group_builds(), 3);
}

#[test]
fn adding_a_binding_invalidates_the_cache() {
    let Some(renderer) = headless() else { return };
    let (device, queue) = (renderer.device(), renderer.queue());

    let mut group = ResourceGroup::new("grow").with(0, wgpu::ShaderStages::FRAGMENT, uniform());
    group.get_or_build(device, queue).unwrap();

    group.add(1, wgpu::ShaderStages::FRAGMENT, uniform());
    assert!(group.requires_rebuild());
    group.get_or_build(device, queue).unwrap();
    assert_eq!(group.bind_group_builds(), 2);
    assert_eq!(group.layout_entries().unwrap().len(), 2);
}
