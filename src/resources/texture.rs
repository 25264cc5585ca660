//! Sampled and storage textures.
//!
//! Both are 2D `Rgba8Unorm`. A [`SampledTexture`] keeps its pixels on the CPU
//! and re-uploads them when dirty; a [`StorageTexture`] is written by shaders
//! only and has no CPU payload.

use crate::errors::{PrismError, Result};
use crate::resources::bindable::{Bindable, BindingView, ResourceState, not_initialized};

pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const BYTES_PER_PIXEL: u32 = 4;

#[derive(Debug)]
pub(crate) struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    fn create(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

// ============================================================================
// SampledTexture
// ============================================================================

#[derive(Debug)]
pub struct SampledTexture {
    label: String,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    state: ResourceState<GpuTexture>,
}

impl SampledTexture {
    /// Creates a texture from tightly packed RGBA8 pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, label: Option<&str>) -> Result<Self> {
        let label = label.unwrap_or("Texture").to_string();
        check_pixel_len(&label, width, height, pixels.len())?;
        Ok(Self {
            label,
            width,
            height,
            pixels,
            state: ResourceState::Uninitialized,
        })
    }

    /// A single-color texture.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], label: Option<&str>) -> Self {
        let pixels = rgba.repeat((width * height) as usize);
        Self {
            label: label.unwrap_or("Texture").to_string(),
            width,
            height,
            pixels,
            state: ResourceState::Uninitialized,
        }
    }

    #[must_use]
    pub fn from_image(image: &image::DynamicImage, label: Option<&str>) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            label: label.unwrap_or("Texture").to_string(),
            width,
            height,
            pixels: rgba.into_raw(),
            state: ResourceState::Uninitialized,
        }
    }

    /// Decodes an encoded image (PNG, JPEG).
    pub fn from_encoded(bytes: &[u8], label: Option<&str>) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&image, label))
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Replaces the pixel payload. The extent never changes.
    pub fn set_pixels(&mut self, pixels: Vec<u8>) -> Result<()> {
        check_pixel_len(&self.label, self.width, self.height, pixels.len())?;
        self.pixels = pixels;
        self.state.mark_dirty();
        Ok(())
    }

    #[must_use]
    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.state.handle().map(|t| &t.texture)
    }

    fn upload(&self, queue: &wgpu::Queue, texture: &wgpu::Texture) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &self.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * BYTES_PER_PIXEL),
                rows_per_image: Some(self.height),
            },
            extent(self.width, self.height),
        );
    }
}

impl Bindable for SampledTexture {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    fn needs_update(&self) -> bool {
        self.state.needs_update()
    }

    fn initialize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        if self.state.is_initialized() {
            return Ok(());
        }
        let gpu = GpuTexture::create(
            device,
            &self.label,
            self.width,
            self.height,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        self.upload(queue, &gpu.texture);
        self.state = ResourceState::Ready(gpu);
        Ok(())
    }

    fn update(&mut self, queue: &wgpu::Queue) -> Result<()> {
        if !self.state.needs_update() {
            return Ok(());
        }
        let gpu = self.state.handle().ok_or_else(|| not_initialized(&self.label))?;
        self.upload(queue, &gpu.texture);
        self.state.mark_clean();
        Ok(())
    }

    fn resource(&self) -> Result<BindingView> {
        self.state
            .handle()
            .map(|t| BindingView::TextureView(t.view.clone()))
            .ok_or_else(|| not_initialized(&self.label))
    }
}

fn check_pixel_len(label: &str, width: u32, height: u32, actual: usize) -> Result<()> {
    let expected = (width * height * BYTES_PER_PIXEL) as usize;
    if actual == expected {
        Ok(())
    } else {
        Err(PrismError::PayloadSizeMismatch {
            label: label.to_string(),
            expected,
            actual,
        })
    }
}

// ============================================================================
// StorageTexture
// ============================================================================

/// Write-only storage texture for compute output.
#[derive(Debug)]
pub struct StorageTexture {
    label: String,
    width: u32,
    height: u32,
    state: ResourceState<GpuTexture>,
}

impl StorageTexture {
    #[must_use]
    pub fn new(width: u32, height: u32, label: Option<&str>) -> Self {
        Self {
            label: label.unwrap_or("StorageTexture").to_string(),
            width,
            height,
            state: ResourceState::Uninitialized,
        }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.state.handle().map(|t| &t.texture)
    }
}

impl Bindable for StorageTexture {
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
        let gpu = GpuTexture::create(
            device,
            &self.label,
            self.width,
            self.height,
            wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        );
        self.state = ResourceState::Ready(gpu);
        Ok(())
    }

    fn update(&mut self, _queue: &wgpu::Queue) -> Result<()> {
        self.state.mark_clean();
        Ok(())
    }

    fn resource(&self) -> Result<BindingView> {
        self.state
            .handle()
            .map(|t| BindingView::TextureView(t.view.clone()))
            .ok_or_else(|| not_initialized(&self.label))
    }
}
