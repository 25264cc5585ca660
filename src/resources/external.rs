//! External (frame-volatile) textures.
//!
//! An external texture does not own its image. Each call to `resource()` asks
//! a [`FrameSource`] for the current frame, so the view can change between
//! frames without the texture being told. Resource groups holding one rebuild
//! their bind group on every use.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::Result;
use crate::resources::bindable::{Bindable, BindingView, ResourceState, not_initialized};
use crate::resources::texture::TEXTURE_FORMAT;

/// Produces the texture view for the current frame.
pub trait FrameSource: Send + Sync {
    /// Returns `None` when no frame is available yet.
    fn current_view(&self) -> Option<wgpu::TextureView>;
}

/// Frame source that always yields the most recently pushed frame.
///
/// A decoder thread, a render-to-texture pass or a capture callback can push
/// frames while the render thread reads them.
#[derive(Debug, Default)]
pub struct LatestFrame {
    frame: Mutex<Option<wgpu::TextureView>>,
}

impl LatestFrame {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, view: wgpu::TextureView) {
        *self.frame.lock() = Some(view);
    }

    pub fn clear(&self) {
        *self.frame.lock() = None;
    }
}

impl FrameSource for LatestFrame {
    fn current_view(&self) -> Option<wgpu::TextureView> {
        self.frame.lock().clone()
    }
}

pub struct ExternalTexture {
    label: String,
    source: Arc<dyn FrameSource>,
    /// 1x1 black view used while the source has no frame
    state: ResourceState<wgpu::TextureView>,
}

impl ExternalTexture {
    #[must_use]
    pub fn new(source: Arc<dyn FrameSource>, label: Option<&str>) -> Self {
        Self {
            label: label.unwrap_or("ExternalTexture").to_string(),
            source,
            state: ResourceState::Uninitialized,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn FrameSource> {
        &self.source
    }
}

impl fmt::Debug for ExternalTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalTexture")
            .field("label", &self.label)
            .field("initialized", &self.state.is_initialized())
            .finish_non_exhaustive()
    }
}

impl Bindable for ExternalTexture {
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
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&self.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[0, 0, 0, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );
        let fallback = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.state = ResourceState::Ready(fallback);
        Ok(())
    }

    fn update(&mut self, _queue: &wgpu::Queue) -> Result<()> {
        self.state.mark_clean();
        Ok(())
    }

    fn resource(&self) -> Result<BindingView> {
        let fallback = self.state.handle().ok_or_else(|| not_initialized(&self.label))?;
        let view = self.source.current_view().unwrap_or_else(|| fallback.clone());
        Ok(BindingView::TextureView(view))
    }
}
