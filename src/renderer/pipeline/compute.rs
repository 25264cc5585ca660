//! Compute programs
//!
//! A [`Compute`] is a WGSL program with a single resource group at index 0 and
//! a `main` entry point. The pipeline is built once on first dispatch.

use uuid::Uuid;

use crate::errors::{PrismError, Result};
use crate::renderer::core::group::ResourceGroup;
use crate::renderer::pipeline::create_shader_module;
use crate::resources::bindable::ResourceHandle;

pub const COMPUTE_ENTRY_POINT: &str = "main";

/// Workgroup count used by `Renderer::dispatch_default`.
pub const DEFAULT_WORKGROUPS: [u32; 3] = [64, 1, 1];

#[derive(Debug)]
pub struct Compute {
    pub uuid: Uuid,
    pub label: String,
    source: String,
    group: ResourceGroup,
    pipeline: Option<wgpu::ComputePipeline>,
}

impl Compute {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            label: "Compute".to_string(),
            source: source.into(),
            group: ResourceGroup::new("Compute"),
            pipeline: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Adds a binding at group 0, visible to the compute stage.
    #[must_use]
    pub fn with_binding(mut self, slot: u32, resource: ResourceHandle) -> Self {
        self.group.add(slot, wgpu::ShaderStages::COMPUTE, resource);
        self
    }

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
        self.pipeline.is_some()
    }

    /// Compiles the program and builds the pipeline. Runs once.
    pub fn initialize(&mut self, device: &wgpu::Device) -> Result<()> {
        if self.pipeline.is_some() {
            return Ok(());
        }

        let module = create_shader_module(device, &self.label, &self.source, None)?;
        let label = self.label.clone();
        let layout = self.group.pipeline_layout(device)?;
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&label),
            layout: Some(layout),
            module: &module,
            entry_point: Some(COMPUTE_ENTRY_POINT),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        log::debug!("Compute pipeline '{label}' built");
        self.pipeline = Some(pipeline);
        Ok(())
    }

    pub fn pipeline(&self) -> Result<&wgpu::ComputePipeline> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| PrismError::PipelineNotInitialized(self.label.clone()))
    }
}
