#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Prism: a small retained-mode 3D engine on wgpu.
//!
//! Build a [`Scene`] of nodes carrying [`Drawable`]s, point a [`Camera`] at
//! it and hand both to a [`Renderer`]. Compute programs and GPU→CPU
//! readback go through the same renderer.

#[cfg(feature = "winit")]
pub mod controls;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

#[cfg(feature = "winit")]
pub use controls::{Input, OrbitControls};
pub use errors::{PrismError, Result};
pub use renderer::core::{ResourceGroup, WgpuContext};
pub use renderer::pipeline::{Compute, Material, MaterialHandle, MaterialOptions, ShaderChunks};
pub use renderer::{RenderPath, RenderSettings, Renderer};
pub use resources::primitives::*;
pub use resources::{
    Bindable, BindableResource, BufferBinding, DataBuffer, ExternalTexture, FieldType, Geometry,
    LatestFrame, ResourceHandle, SampledTexture, Sampler, StorageTexture, StructLayout, Vertex,
    VertexAttributeInfo,
};
pub use scene::{Camera, Drawable, Node, NodeKey, RenderOrder, Scene, Transform};
