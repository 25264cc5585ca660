use crate::errors::Result;
use crate::resources::bindable::{Bindable, BindingView, ResourceState, not_initialized};

/// Texture sampler.
///
/// Sampler state is fixed at construction; `update` has nothing to upload.
#[derive(Debug)]
pub struct Sampler {
    label: String,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub address_mode: wgpu::AddressMode,
    state: ResourceState<wgpu::Sampler>,
}

impl Sampler {
    #[must_use]
    pub fn new(
        mag_filter: wgpu::FilterMode,
        min_filter: wgpu::FilterMode,
        address_mode: wgpu::AddressMode,
        label: Option<&str>,
    ) -> Self {
        Self {
            label: label.unwrap_or("Sampler").to_string(),
            mag_filter,
            min_filter,
            address_mode,
            state: ResourceState::Uninitialized,
        }
    }

    /// Linear filtering, repeat addressing.
    #[must_use]
    pub fn linear_repeat(label: Option<&str>) -> Self {
        Self::new(
            wgpu::FilterMode::Linear,
            wgpu::FilterMode::Linear,
            wgpu::AddressMode::Repeat,
            label,
        )
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::linear_repeat(None)
    }
}

impl Bindable for Sampler {
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
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&self.label),
            address_mode_u: self.address_mode,
            address_mode_v: self.address_mode,
            address_mode_w: self.address_mode,
            mag_filter: self.mag_filter,
            min_filter: self.min_filter,
            ..Default::default()
        });
        self.state = ResourceState::Ready(sampler);
        Ok(())
    }

    fn update(&mut self, _queue: &wgpu::Queue) -> Result<()> {
        self.state.mark_clean();
        Ok(())
    }

    fn resource(&self) -> Result<BindingView> {
        self.state
            .handle()
            .cloned()
            .map(BindingView::Sampler)
            .ok_or_else(|| not_initialized(&self.label))
    }
}
