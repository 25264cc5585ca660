//! 核心资源定义模块
//!
//! 着色器可见的资源与几何数据：
//! - Bindable: 统一的 initialize / update / resource 契约
//! - DataBuffer: uniform / storage / 实例缓冲
//! - Sampler, SampledTexture, StorageTexture, ExternalTexture
//! - Geometry: 交错顶点 + 索引 + 实例缓冲
//! - primitives: 程序化几何体

pub mod bindable;
pub mod buffer;
pub mod external;
pub mod geometry;
pub mod primitives;
pub mod sampler;
pub mod texture;

// 重新导出常用类型
pub use bindable::{
    Bindable, BindableResource, BindingShape, BindingView, ResourceHandle, ResourceKind,
    ResourceState,
};
pub use buffer::{BufferBinding, DataBuffer, FieldType, StructLayout, VertexAttributeInfo};
pub use external::{ExternalTexture, FrameSource, LatestFrame};
pub use geometry::{Geometry, GpuGeometry, Vertex};
pub use sampler::Sampler;
pub use texture::{SampledTexture, StorageTexture, TEXTURE_FORMAT};
