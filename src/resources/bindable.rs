//! Bindable Resources
//!
//! Every GPU-visible object a shader can see through a bind group goes through
//! one contract, [`Bindable`]: lazily `initialize` on first use, re-upload on
//! `update` when a mutator marked it dirty, and hand out a [`BindingView`].
//!
//! The five kinds form a closed set ([`BindableResource`]) so that layout
//! derivation is an exhaustive `match`, not a string comparison.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{PrismError, Result};
use crate::resources::buffer::{BufferBinding, DataBuffer};
use crate::resources::external::ExternalTexture;
use crate::resources::sampler::Sampler;
use crate::resources::texture::{SampledTexture, StorageTexture};

/// Shared, lockable handle to a resource.
///
/// The same handle may sit in any number of resource groups; a setter called
/// through one handle is seen by every group that binds it.
pub type ResourceHandle = Arc<RwLock<BindableResource>>;

/// Resource kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    DataBuffer,
    Sampler,
    SampledTexture,
    StorageTexture,
    ExternalTexture,
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Lifecycle of a device-owned handle.
///
/// `Uninitialized → Ready` happens once in `initialize`. Mutators move
/// `Ready → Dirty`; `update` is the only way back to `Ready`.
#[derive(Debug)]
pub enum ResourceState<H> {
    Uninitialized,
    Ready(H),
    Dirty(H),
}

impl<H> ResourceState<H> {
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }

    #[inline]
    #[must_use]
    pub fn needs_update(&self) -> bool {
        matches!(self, Self::Dirty(_))
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<&H> {
        match self {
            Self::Uninitialized => None,
            Self::Ready(h) | Self::Dirty(h) => Some(h),
        }
    }

    /// `Ready → Dirty`. Uninitialized resources upload their whole payload on
    /// `initialize` anyway, so they stay where they are.
    pub fn mark_dirty(&mut self) {
        *self = match std::mem::replace(self, Self::Uninitialized) {
            Self::Ready(h) => Self::Dirty(h),
            other => other,
        };
    }

    /// `Dirty → Ready`.
    pub fn mark_clean(&mut self) {
        *self = match std::mem::replace(self, Self::Uninitialized) {
            Self::Dirty(h) => Self::Ready(h),
            other => other,
        };
    }
}

impl<H> Default for ResourceState<H> {
    fn default() -> Self {
        Self::Uninitialized
    }
}

// ============================================================================
// Binding view
// ============================================================================

/// What a bind group entry points at.
///
/// wgpu handles are reference counted, so this is an owned, cheap clone.
#[derive(Debug, Clone)]
pub enum BindingView {
    Buffer(wgpu::Buffer),
    Sampler(wgpu::Sampler),
    TextureView(wgpu::TextureView),
}

impl BindingView {
    #[must_use]
    pub fn as_binding_resource(&self) -> wgpu::BindingResource<'_> {
        match self {
            Self::Buffer(buffer) => buffer.as_entire_binding(),
            Self::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
            Self::TextureView(view) => wgpu::BindingResource::TextureView(view),
        }
    }
}

/// Layout-relevant shape of a resource, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingShape {
    Buffer(BufferBinding),
    Sampler,
    SampledTexture,
    StorageTexture,
    ExternalTexture,
}

// ============================================================================
// Contract
// ============================================================================

/// Uniform initialize / update / resource contract shared by all kinds.
pub trait Bindable {
    fn label(&self) -> &str;

    fn is_initialized(&self) -> bool;

    fn needs_update(&self) -> bool;

    /// Allocates the device object and uploads the initial payload.
    /// No-op when already initialized.
    fn initialize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()>;

    /// Re-uploads the payload in place when dirty. Never reallocates.
    fn update(&mut self, queue: &wgpu::Queue) -> Result<()>;

    /// Returns the view to place in a bind group.
    fn resource(&self) -> Result<BindingView>;
}

/// Closed set of bindable resource kinds.
#[derive(Debug)]
pub enum BindableResource {
    DataBuffer(DataBuffer),
    Sampler(Sampler),
    SampledTexture(SampledTexture),
    StorageTexture(StorageTexture),
    ExternalTexture(ExternalTexture),
}

impl BindableResource {
    /// Wraps the resource in a shared handle.
    #[must_use]
    pub fn into_handle(self) -> ResourceHandle {
        Arc::new(RwLock::new(self))
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::DataBuffer(_) => ResourceKind::DataBuffer,
            Self::Sampler(_) => ResourceKind::Sampler,
            Self::SampledTexture(_) => ResourceKind::SampledTexture,
            Self::StorageTexture(_) => ResourceKind::StorageTexture,
            Self::ExternalTexture(_) => ResourceKind::ExternalTexture,
        }
    }

    /// Layout shape, or `None` for a data buffer created without a binding kind
    /// (vertex/index-only buffers).
    #[must_use]
    pub fn shape(&self) -> Option<BindingShape> {
        match self {
            Self::DataBuffer(b) => b.binding().map(BindingShape::Buffer),
            Self::Sampler(_) => Some(BindingShape::Sampler),
            Self::SampledTexture(_) => Some(BindingShape::SampledTexture),
            Self::StorageTexture(_) => Some(BindingShape::StorageTexture),
            Self::ExternalTexture(_) => Some(BindingShape::ExternalTexture),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_buffer(&self) -> Option<&DataBuffer> {
        match self {
            Self::DataBuffer(b) => Some(b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_buffer_mut(&mut self) -> Option<&mut DataBuffer> {
        match self {
            Self::DataBuffer(b) => Some(b),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn Bindable {
        match self {
            Self::DataBuffer(r) => r,
            Self::Sampler(r) => r,
            Self::SampledTexture(r) => r,
            Self::StorageTexture(r) => r,
            Self::ExternalTexture(r) => r,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Bindable {
        match self {
            Self::DataBuffer(r) => r,
            Self::Sampler(r) => r,
            Self::SampledTexture(r) => r,
            Self::StorageTexture(r) => r,
            Self::ExternalTexture(r) => r,
        }
    }

    /// Runs `initialize` or `update`, whichever the state calls for.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        if !self.is_initialized() {
            self.initialize(device, queue)
        } else if self.needs_update() {
            self.update(queue)
        } else {
            Ok(())
        }
    }
}

impl Bindable for BindableResource {
    fn label(&self) -> &str {
        self.inner().label()
    }

    fn is_initialized(&self) -> bool {
        self.inner().is_initialized()
    }

    fn needs_update(&self) -> bool {
        self.inner().needs_update()
    }

    fn initialize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        self.inner_mut().initialize(device, queue)
    }

    fn update(&mut self, queue: &wgpu::Queue) -> Result<()> {
        self.inner_mut().update(queue)
    }

    fn resource(&self) -> Result<BindingView> {
        self.inner().resource()
    }
}

macro_rules! impl_from_kind {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for BindableResource {
                fn from(r: $variant) -> Self {
                    Self::$variant(r)
                }
            }

            impl $variant {
                /// Wraps the resource in a shared [`ResourceHandle`].
                #[must_use]
                pub fn into_handle(self) -> ResourceHandle {
                    BindableResource::from(self).into_handle()
                }
            }
        )*
    };
}

impl_from_kind!(DataBuffer, Sampler, SampledTexture, StorageTexture, ExternalTexture);

/// Shorthand for the not-initialized precondition error.
pub(crate) fn not_initialized(label: &str) -> PrismError {
    PrismError::ResourceNotInitialized(label.to_string())
}
