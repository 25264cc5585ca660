//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`PrismError`] covers all failure modes including:
//! - GPU adapter, device and surface acquisition
//! - Resource group and pipeline configuration errors
//! - Precondition violations (reading a resource before it exists on the GPU)
//! - GPU synchronization during compute and readback
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, PrismError>`.
//!
//! ```rust,ignore
//! use prism::errors::{PrismError, Result};
//!
//! fn build_group() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the Prism engine.
#[derive(Error, Debug)]
pub enum PrismError {
    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create a presentable surface for the window.
    #[error("Failed to create surface: {0}")]
    SurfaceCreateFailed(#[from] wgpu::CreateSurfaceError),

    /// The adapter cannot present to the requested surface.
    #[error("Surface not supported by adapter")]
    SurfaceUnsupported,

    /// A surface-only operation was requested on a headless renderer (or vice versa).
    #[error("Render target mismatch: {0}")]
    NoSurface(&'static str),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A resource was placed in a group but has no binding kind.
    #[error("Resource '{label}' at slot {slot} cannot be bound: {reason}")]
    UnbindableResource {
        /// Binding slot of the offending descriptor
        slot: u32,
        /// Resource label
        label: String,
        /// What is missing
        reason: &'static str,
    },

    /// Two descriptors in one group claim the same slot.
    #[error("Duplicate binding slot {0} in resource group")]
    DuplicateBinding(u32),

    /// `#include <name>` did not match any registered chunk.
    #[error("Can not resolve #include <{0}>")]
    ShaderIncludeUnresolved(String),

    /// A chunk includes itself, directly or transitively.
    #[error("Cyclic #include <{0}>")]
    ShaderIncludeCycle(String),

    /// WGSL failed to parse or validate.
    #[error("Shader '{label}' failed to compile: {message}")]
    ShaderCompile {
        /// Shader label
        label: String,
        /// Validation message from the device
        message: String,
    },

    /// Two vertex attributes claim the same shader location.
    #[error("Vertex layout mismatch: {0}")]
    VertexLayoutMismatch(String),

    /// Index data that references vertices the geometry does not have.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A buffer lacks a usage flag required by the requested operation.
    #[error("Buffer '{label}' is missing usage {required:?}")]
    MissingUsage {
        /// Buffer label
        label: String,
        /// Usage flags the operation needs
        required: wgpu::BufferUsages,
    },

    /// Payload byte length does not match the allocated GPU object.
    #[error("Resource '{label}' expects {expected} bytes, got {actual}")]
    PayloadSizeMismatch {
        /// Resource label
        label: String,
        /// Byte count of the allocation
        expected: usize,
        /// Byte count supplied
        actual: usize,
    },

    // ========================================================================
    // Precondition Violations
    // ========================================================================
    /// The binding view was requested before `initialize`.
    #[error("Resource '{0}' read before initialize")]
    ResourceNotInitialized(String),

    /// A pipeline was used before `initialize`.
    #[error("Pipeline '{0}' used before initialize")]
    PipelineNotInitialized(String),

    // ========================================================================
    // GPU Synchronization Errors
    // ========================================================================
    /// Mapping a staging buffer for read failed.
    #[error("Buffer map failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    /// Waiting on submitted work failed or timed out.
    #[error("GPU wait failed: {0}")]
    GpuWait(String),

    /// The map callback was dropped without reporting.
    #[error("Map callback channel closed")]
    ChannelClosed,

    // ========================================================================
    // Image & Texture Errors
    // ========================================================================
    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecodeError(String),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for PrismError {
    fn from(err: image::ImageError) -> Self {
        PrismError::ImageDecodeError(err.to_string())
    }
}

impl From<wgpu::PollError> for PrismError {
    fn from(err: wgpu::PollError) -> Self {
        PrismError::GpuWait(err.to_string())
    }
}

impl From<flume::RecvError> for PrismError {
    fn from(_: flume::RecvError) -> Self {
        PrismError::ChannelClosed
    }
}

/// Alias for `Result<T, PrismError>`.
pub type Result<T> = std::result::Result<T, PrismError>;
