//! wgpu Context
//!
//! The [`WgpuContext`] holds core GPU handles: device, queue and the frame
//! target (a window surface or an offscreen texture), plus the depth and
//! multisample attachments sized to it.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::errors::{PrismError, Result};
use crate::renderer::settings::RenderSettings;

/// Where frames end up.
#[derive(Debug)]
pub enum FrameTarget {
    /// Swapchain presentation.
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    /// Offscreen texture, readable with `COPY_SRC`.
    Offscreen {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

/// Core wgpu context holding GPU handles.
///
/// Depth and MSAA attachments are recreated on resize.
#[derive(Debug)]
pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub target: FrameTarget,

    width: u32,
    height: u32,
    color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub clear_color: wgpu::Color,

    depth_texture_view: wgpu::TextureView,
    msaa_texture_view: Option<wgpu::TextureView>,
}

impl WgpuContext {
    pub async fn new<W>(window: W, settings: &RenderSettings, width: u32, height: u32) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;

        let adapter = Self::request_adapter(&instance, settings, Some(&surface)).await?;
        let (device, queue) = Self::request_device(&adapter, settings).await?;

        let mut config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or(PrismError::SurfaceUnsupported)?;
        config.present_mode = if settings.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        surface.configure(&device, &config);
        log::info!(
            "Surface configured: {}x{} {:?} {:?}",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );

        let color_format = config.format;
        let (w, h) = (config.width, config.height);
        Ok(Self::assemble(
            device,
            queue,
            FrameTarget::Surface { surface, config },
            settings,
            color_format,
            w,
            h,
        ))
    }

    /// Context rendering into an offscreen texture of `settings.headless_format`.
    pub async fn headless(settings: &RenderSettings, width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = Self::request_adapter(&instance, settings, None).await?;
        let (device, queue) = Self::request_device(&adapter, settings).await?;

        let (w, h) = (width.max(1), height.max(1));
        let (texture, view) = Self::create_offscreen_target(&device, settings.headless_format, w, h);
        Ok(Self::assemble(
            device,
            queue,
            FrameTarget::Offscreen { texture, view },
            settings,
            settings.headless_format,
            w,
            h,
        ))
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        settings: &RenderSettings,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<wgpu::Adapter> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| PrismError::AdapterRequestFailed(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?})", info.name, info.backend);
        Ok(adapter)
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        settings: &RenderSettings,
    ) -> Result<(wgpu::Device, wgpu::Queue)> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Prism Device"),
                required_features: settings.required_features,
                required_limits: settings.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;
        log::info!("Device acquired");
        Ok((device, queue))
    }

    fn assemble(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: FrameTarget,
        settings: &RenderSettings,
        color_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let sample_count = settings.msaa_samples();
        let depth_texture_view =
            Self::create_depth_texture(&device, width, height, settings.depth_format, sample_count);
        let msaa_texture_view =
            Self::create_msaa_texture(&device, width, height, color_format, sample_count);

        Self {
            device,
            queue,
            target,
            width,
            height,
            color_format,
            depth_format: settings.depth_format,
            sample_count,
            clear_color: settings.clear_color,
            depth_texture_view,
            msaa_texture_view,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;

        match &mut self.target {
            FrameTarget::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            FrameTarget::Offscreen { texture, view } => {
                let (t, v) = Self::create_offscreen_target(&self.device, self.color_format, width, height);
                *texture = t;
                *view = v;
            }
        }

        self.depth_texture_view = Self::create_depth_texture(
            &self.device,
            width,
            height,
            self.depth_format,
            self.sample_count,
        );
        self.msaa_texture_view =
            Self::create_msaa_texture(&self.device, width, height, self.color_format, self.sample_count);
        log::debug!("Render target resized to {width}x{height}");
    }

    /// Reapplies the current surface configuration after loss.
    pub fn reconfigure(&self) {
        if let FrameTarget::Surface { surface, config } = &self.target {
            surface.configure(&self.device, config);
        }
    }

    fn create_offscreen_target(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    pub fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Multisampled color attachment; `None` when MSAA is off.
    fn create_msaa_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Option<wgpu::TextureView> {
        if sample_count <= 1 {
            return None;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("MSAA Color"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    /// Returns the frame color format.
    #[inline]
    #[must_use]
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    #[inline]
    #[must_use]
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_texture_view
    }

    #[inline]
    #[must_use]
    pub fn msaa_view(&self) -> Option<&wgpu::TextureView> {
        self.msaa_texture_view.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_headless(&self) -> bool {
        matches!(self.target, FrameTarget::Offscreen { .. })
    }

    /// Returns the current target dimensions.
    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
