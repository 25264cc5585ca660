//! Renderer Settings & Render Path Configuration
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use prism::renderer::{RenderPath, RenderSettings};
//!
//! // Forward pipeline with 4× MSAA
//! let settings = RenderSettings {
//!     path: RenderPath::BasicForward { msaa_samples: 4 },
//!     vsync: false,
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

// ---------------------------------------------------------------------------
// RenderPath
// ---------------------------------------------------------------------------

/// Defines the rendering path.
///
/// Only the forward path exists: every drawable is rasterized straight into
/// the frame target (or into a multisampled color target resolved into it).
#[derive(Debug, Clone, PartialEq, Copy, Eq)]
pub enum RenderPath {
    /// Single-pass forward rendering.
    BasicForward {
        /// MSAA sample count. Common values: 1 (off), 2, 4, 8.
        msaa_samples: u32,
    },
}

impl Default for RenderPath {
    #[inline]
    fn default() -> Self {
        Self::BasicForward { msaa_samples: 1 }
    }
}

impl RenderPath {
    /// Returns the effective MSAA sample count for this path.
    #[inline]
    #[must_use]
    pub fn msaa_samples(&self) -> u32 {
        match self {
            Self::BasicForward { msaa_samples } => (*msaa_samples).max(1),
        }
    }
}

// ---------------------------------------------------------------------------
// RenderSettings
// ---------------------------------------------------------------------------

/// Global configuration for renderer initialization.
///
/// | Field              | Description                              | Default            |
/// |--------------------|------------------------------------------|--------------------|
/// | `path`             | Render pipeline path                     | `BasicForward{1}`  |
/// | `vsync`            | Vertical sync enabled                    | `true`             |
/// | `power_preference` | GPU adapter selection strategy           | `HighPerformance`  |
/// | `clear_color`      | Framebuffer clear color                  | Black (0,0,0,1)    |
/// | `required_features`| Required wgpu features                   | Empty              |
/// | `required_limits`  | Required wgpu limits                     | Default            |
/// | `depth_format`     | Depth buffer texture format              | `Depth24Plus`      |
/// | `headless_format`  | Offscreen color format                   | `Rgba8Unorm`       |
/// | `gpu_wait_timeout` | Bound on compute/readback waits          | `None` (forever)   |
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub path: RenderPath,

    /// Caps the frame rate to the display refresh rate.
    pub vsync: bool,

    /// - `HighPerformance`: prefer a discrete GPU
    /// - `LowPower`: prefer an integrated GPU
    pub power_preference: wgpu::PowerPreference,

    pub clear_color: wgpu::Color,

    /// Device creation fails if the adapter lacks any of these.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    pub depth_format: wgpu::TextureFormat,

    /// Color format of the offscreen target used by headless renderers.
    pub headless_format: wgpu::TextureFormat,

    /// Maximum time `compute` and `read_buffer` block on the device.
    /// `None` waits until the GPU finishes.
    pub gpu_wait_timeout: Option<Duration>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            path: RenderPath::default(),
            vsync: true,
            power_preference: wgpu::PowerPreference::HighPerformance,
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            depth_format: wgpu::TextureFormat::Depth24Plus,
            headless_format: wgpu::TextureFormat::Rgba8Unorm,
            gpu_wait_timeout: None,
        }
    }
}

impl RenderSettings {
    #[inline]
    #[must_use]
    pub fn msaa_samples(&self) -> u32 {
        self.path.msaa_samples()
    }

    #[must_use]
    pub fn with_msaa(mut self, samples: u32) -> Self {
        self.path = RenderPath::BasicForward {
            msaa_samples: samples,
        };
        self
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    #[must_use]
    pub fn with_gpu_wait_timeout(mut self, timeout: Duration) -> Self {
        self.gpu_wait_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = RenderSettings::default();
        assert_eq!(s.msaa_samples(), 1);
        assert_eq!(s.depth_format, wgpu::TextureFormat::Depth24Plus);
        assert!(s.gpu_wait_timeout.is_none());
    }

    #[test]
    fn zero_samples_means_off() {
        assert_eq!(RenderSettings::default().with_msaa(0).msaa_samples(), 1);
        assert_eq!(RenderSettings::default().with_msaa(4).msaa_samples(), 4);
    }
}
