//! WGPU 核心上下文封装
//!
//! - WgpuContext: device, queue, frame target, depth/MSAA attachments
//! - ResourceGroup: 绑定描述、Layout 推导与 BindGroup 缓存

pub mod binding;
pub mod context;
pub mod group;

pub use binding::{BindingDescriptor, derive_layout_entries, layout_entry};
pub use context::{FrameTarget, WgpuContext};
pub use group::ResourceGroup;
