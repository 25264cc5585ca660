//! Render materials
//!
//! A [`Material`] owns a WGSL program, its material resource group (bound at
//! group 0) and the render pipelines built from it. Render state is fixed at
//! construction; to change blending, culling or topology build a new material.
//!
//! Pipeline layout order is fixed and must match the shader:
//!
//! | group | contents                         |
//! |-------|----------------------------------|
//! | 0     | material resources               |
//! | 1     | drawable transforms              |
//! | 2     | camera                           |

use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::errors::{PrismError, Result};
use crate::renderer::core::group::ResourceGroup;
use crate::renderer::pipeline::shader_chunks::ShaderChunks;
use crate::renderer::pipeline::vertex::{OwnedVertexBufferDesc, validate_vertex_layouts};
use crate::renderer::pipeline::create_shader_module;
use crate::resources::bindable::ResourceHandle;

pub type MaterialHandle = Arc<RwLock<Material>>;

/// Render-target formats a pipeline is built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetFormats {
    pub color: wgpu::TextureFormat,
    pub depth: wgpu::TextureFormat,
    pub sample_count: u32,
}

#[derive(Debug, Clone)]
pub struct MaterialOptions {
    /// Alpha-blended, drawn back-to-front after opaque drawables, no depth
    /// writes, no culling.
    pub transparent: bool,
    pub topology: wgpu::PrimitiveTopology,
    /// Face culling for opaque materials.
    pub cull_mode: Option<wgpu::Face>,
    pub depth_compare: wgpu::CompareFunction,
    pub vertex_entry: Cow<'static, str>,
    pub fragment_entry: Cow<'static, str>,
}

impl Default for MaterialOptions {
    fn default() -> Self {
        Self {
            transparent: false,
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: Some(wgpu::Face::Back),
            depth_compare: wgpu::CompareFunction::Less,
            vertex_entry: Cow::Borrowed("vertex_main"),
            fragment_entry: Cow::Borrowed("fragment_main"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    vertex_layouts: Vec<OwnedVertexBufferDesc>,
    targets: TargetFormats,
}

#[derive(Debug)]
struct GpuMaterial {
    module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
}

#[derive(Debug)]
pub struct Material {
    pub uuid: Uuid,
    pub label: String,
    source: String,
    chunks: Option<Arc<ShaderChunks>>,
    options: MaterialOptions,
    group: ResourceGroup,
    gpu: Option<GpuMaterial>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl Material {
    #[must_use]
    pub fn new(source: impl Into<String>, options: MaterialOptions) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            label: "Material".to_string(),
            source: source.into(),
            chunks: None,
            options,
            group: ResourceGroup::new("Material"),
            gpu: None,
            pipelines: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn opaque(source: impl Into<String>) -> Self {
        Self::new(source, MaterialOptions::default())
    }

    #[must_use]
    pub fn transparent(source: impl Into<String>) -> Self {
        Self::new(
            source,
            MaterialOptions {
                transparent: true,
                ..Default::default()
            },
        )
    }

    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Adds a binding to the material group (group 0).
    #[must_use]
    pub fn with_binding(mut self, slot: u32, visibility: wgpu::ShaderStages, resource: ResourceHandle) -> Self {
        self.group.add(slot, visibility, resource);
        self
    }

    /// Resolves `#include`s against `chunks` instead of the built-in table.
    #[must_use]
    pub fn with_chunks(mut self, chunks: Arc<ShaderChunks>) -> Self {
        self.chunks = Some(chunks);
        self
    }

    #[must_use]
    pub fn into_handle(self) -> MaterialHandle {
        Arc::new(RwLock::new(self))
    }

    // ========================================================================
    // Render state
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.options.transparent
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &MaterialOptions {
        &self.options
    }

    #[must_use]
    pub fn blend_state(&self) -> wgpu::BlendState {
        if self.options.transparent {
            wgpu::BlendState::ALPHA_BLENDING
        } else {
            wgpu::BlendState::REPLACE
        }
    }

    #[must_use]
    pub fn cull_mode(&self) -> Option<wgpu::Face> {
        if self.options.transparent {
            None
        } else {
            self.options.cull_mode
        }
    }

    #[must_use]
    pub fn depth_write(&self) -> bool {
        !self.options.transparent
    }

    // ========================================================================
    // Resources
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn group(&self) -> &ResourceGroup {
        &self.group
    }

    #[inline]
    pub fn group_mut(&mut self) -> &mut ResourceGroup {
        &mut self.group
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Number of distinct render pipelines built from this material.
    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Compiles the shader and composes the pipeline layout
    /// `[material, transform, camera]`. Runs once.
    pub fn initialize(
        &mut self,
        device: &wgpu::Device,
        transform_layout: &wgpu::BindGroupLayout,
        camera_layout: &wgpu::BindGroupLayout,
    ) -> Result<()> {
        if self.gpu.is_some() {
            return Ok(());
        }

        let module = create_shader_module(device, &self.label, &self.source, self.chunks.as_ref())?;
        let material_layout = self.group.layout(device)?;
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&self.label),
            bind_group_layouts: &[Some(material_layout), Some(transform_layout), Some(camera_layout)],
            immediate_size: 0,
        });

        self.gpu = Some(GpuMaterial {
            module,
            pipeline_layout,
        });
        Ok(())
    }

    /// Returns the render pipeline for this vertex layout and target set,
    /// building it on first request.
    pub fn render_pipeline(
        &mut self,
        device: &wgpu::Device,
        vertex_layouts: &[OwnedVertexBufferDesc],
        targets: TargetFormats,
    ) -> Result<wgpu::RenderPipeline> {
        let key = PipelineKey {
            vertex_layouts: vertex_layouts.to_vec(),
            targets,
        };
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline.clone());
        }

        validate_vertex_layouts(vertex_layouts)?;
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| PrismError::PipelineNotInitialized(self.label.clone()))?;

        let buffers: Vec<_> = vertex_layouts.iter().map(OwnedVertexBufferDesc::as_wgpu).collect();
        let color_targets = [Some(wgpu::ColorTargetState {
            format: targets.color,
            blend: Some(self.blend_state()),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&self.label),
            layout: Some(&gpu.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &gpu.module,
                entry_point: Some(&self.options.vertex_entry),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &gpu.module,
                entry_point: Some(&self.options.fragment_entry),
                targets: &color_targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: self.options.topology,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: self.cull_mode(),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: targets.depth,
                depth_write_enabled: Some(self.depth_write()),
                depth_compare: Some(self.options.depth_compare),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: targets.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        log::debug!(
            "Render pipeline '{}' built (transparent: {}, samples: {})",
            self.label,
            self.options.transparent,
            targets.sample_count
        );
        self.pipelines.insert(key, pipeline.clone());
        Ok(pipeline)
    }
}
