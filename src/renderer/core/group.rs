//! Resource groups
//!
//! A [`ResourceGroup`] is the unit bound at one pipeline slot: an ordered list
//! of [`BindingDescriptor`]s, the layout derived from it (built once per group
//! shape), and the cached bind group.

use crate::errors::Result;
use crate::renderer::core::binding::{BindingDescriptor, derive_layout_entries};
use crate::resources::bindable::{Bindable, BindingView, ResourceHandle, ResourceKind};

#[derive(Debug)]
pub struct ResourceGroup {
    label: String,
    descriptors: Vec<BindingDescriptor>,
    layout: Option<wgpu::BindGroupLayout>,
    pipeline_layout: Option<wgpu::PipelineLayout>,
    bind_group: Option<wgpu::BindGroup>,
    builds: u64,
}

impl ResourceGroup {
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            descriptors: Vec::new(),
            layout: None,
            pipeline_layout: None,
            bind_group: None,
            builds: 0,
        }
    }

    /// Builder form of [`add`](Self::add).
    #[must_use]
    pub fn with(mut self, slot: u32, visibility: wgpu::ShaderStages, resource: ResourceHandle) -> Self {
        self.add(slot, visibility, resource);
        self
    }

    /// Adds a binding, keeping descriptors in slot order.
    ///
    /// Changing the group shape drops every cached GPU object.
    pub fn add(&mut self, slot: u32, visibility: wgpu::ShaderStages, resource: ResourceHandle) {
        let at = self.descriptors.partition_point(|d| d.slot <= slot);
        self.descriptors
            .insert(at, BindingDescriptor::new(slot, visibility, resource));
        self.layout = None;
        self.pipeline_layout = None;
        self.bind_group = None;
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn descriptors(&self) -> &[BindingDescriptor] {
        &self.descriptors
    }

    /// Resource bound at `slot`.
    #[must_use]
    pub fn resource(&self, slot: u32) -> Option<&ResourceHandle> {
        self.descriptors
            .iter()
            .find(|d| d.slot == slot)
            .map(|d| &d.resource)
    }

    #[must_use]
    pub fn has_external_texture(&self) -> bool {
        self.descriptors
            .iter()
            .any(|d| d.resource.read().kind() == ResourceKind::ExternalTexture)
    }

    /// True when the next [`get_or_build`](Self::get_or_build) builds a new
    /// bind group.
    #[must_use]
    pub fn requires_rebuild(&self) -> bool {
        self.bind_group.is_none() || self.has_external_texture()
    }

    /// Number of bind groups built so far.
    #[inline]
    #[must_use]
    pub fn bind_group_builds(&self) -> u64 {
        self.builds
    }

    /// Layout entries derived from the current descriptors.
    pub fn layout_entries(&self) -> Result<Vec<wgpu::BindGroupLayoutEntry>> {
        derive_layout_entries(&self.descriptors)
    }

    /// Builds the layout on first call, then returns the cached one.
    pub fn layout(&mut self, device: &wgpu::Device) -> Result<&wgpu::BindGroupLayout> {
        let layout = match self.layout.take() {
            Some(layout) => layout,
            None => {
                let entries = self.layout_entries()?;
                log::debug!("Building layout '{}' ({} entries)", self.label, entries.len());
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&self.label),
                    entries: &entries,
                })
            }
        };
        Ok(&*self.layout.insert(layout))
    }

    /// Pipeline layout with this group alone at index 0 (compute pipelines).
    pub fn pipeline_layout(&mut self, device: &wgpu::Device) -> Result<&wgpu::PipelineLayout> {
        let pipeline_layout = match self.pipeline_layout.take() {
            Some(pipeline_layout) => pipeline_layout,
            None => {
                let label = self.label.clone();
                let layout = self.layout(device)?;
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(&label),
                    bind_group_layouts: &[Some(layout)],
                    immediate_size: 0,
                })
            }
        };
        Ok(&*self.pipeline_layout.insert(pipeline_layout))
    }

    /// Returns the bind group, building it when needed.
    ///
    /// With a cached bind group and no external texture, members are only
    /// initialized/updated and the cached handle is returned. Otherwise every
    /// member is initialized, the layout is ensured and a new bind group is
    /// built and cached.
    pub fn get_or_build(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<wgpu::BindGroup> {
        self.prepare_resources(device, queue)?;

        if !self.requires_rebuild()
            && let Some(bind_group) = &self.bind_group
        {
            return Ok(bind_group.clone());
        }

        let views: Vec<(u32, BindingView)> = self
            .descriptors
            .iter()
            .map(|d| d.resource.read().resource().map(|v| (d.slot, v)))
            .collect::<Result<_>>()?;

        let entries: Vec<wgpu::BindGroupEntry<'_>> = views
            .iter()
            .map(|(slot, view)| wgpu::BindGroupEntry {
                binding: *slot,
                resource: view.as_binding_resource(),
            })
            .collect();

        let label = self.label.clone();
        let layout = self.layout(device)?;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout,
            entries: &entries,
        });

        self.builds += 1;
        log::trace!("Bind group '{}' built (#{})", self.label, self.builds);
        self.bind_group = Some(bind_group.clone());
        Ok(bind_group)
    }

    /// Drives `initialize` / `update` on every member that needs it.
    pub fn prepare_resources(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        for desc in &self.descriptors {
            let needs_work = {
                let res = desc.resource.read();
                !res.is_initialized() || res.needs_update()
            };
            if needs_work {
                desc.resource.write().prepare(device, queue)?;
            }
        }
        Ok(())
    }
}
