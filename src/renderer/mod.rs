//! Rendering System
//!
//! The [`Renderer`] turns a [`Scene`] and a [`Camera`] into GPU commands:
//!
//! 1. Propagate transforms and finalize the camera
//! 2. Order drawables: opaque in traversal order, transparent back-to-front
//! 3. Extract one [`DrawCall`] per drawable, lazily creating geometry,
//!    pipelines and bind groups
//! 4. Replay the draw calls in a single render pass
//!
//! Compute dispatch and GPU→CPU readback live here too; both block on the
//! device until the work finishes.
//!
//! # Bind group slots
//!
//! | group | owner     | contents                               |
//! |-------|-----------|----------------------------------------|
//! | 0     | Material  | material resources                     |
//! | 1     | Drawable  | model / world / normal matrices        |
//! | 2     | Camera    | view / projection / camera world       |

pub mod core;
pub mod pipeline;
pub mod readback;
pub mod settings;

pub use settings::{RenderPath, RenderSettings};

use std::sync::Arc;

use bytemuck::Pod;
use glam::Mat4;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::errors::{PrismError, Result};
use crate::renderer::core::context::{FrameTarget, WgpuContext};
use crate::renderer::pipeline::compute::DEFAULT_WORKGROUPS;
use crate::renderer::pipeline::{Compute, TargetFormats};
use crate::resources::bindable::ResourceHandle;
use crate::scene::{Camera, NodeKey, RenderOrder, Scene};

/// Everything one `draw_indexed` needs, extracted before the pass opens.
#[derive(Debug)]
struct DrawCall {
    pipeline: wgpu::RenderPipeline,
    bind_groups: [wgpu::BindGroup; 2],
    vertex_buffers: Vec<wgpu::Buffer>,
    index_buffer: wgpu::Buffer,
    index_format: wgpu::IndexFormat,
    index_count: u32,
    instance_count: u32,
}

pub struct Renderer {
    context: WgpuContext,
    settings: RenderSettings,
    order: RenderOrder,
    frame_count: u64,
}

impl Renderer {
    /// Windowed renderer presenting to `window`'s surface.
    pub async fn new<W>(window: W, width: u32, height: u32, settings: RenderSettings) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let context = WgpuContext::new(window, &settings, width, height).await?;
        Ok(Self::with_context(context, settings))
    }

    /// Renderer drawing into an offscreen texture; read it back with
    /// [`read_target_pixels`](Self::read_target_pixels).
    pub async fn headless(width: u32, height: u32, settings: RenderSettings) -> Result<Self> {
        let context = WgpuContext::headless(&settings, width, height).await?;
        Ok(Self::with_context(context, settings))
    }

    fn with_context(context: WgpuContext, settings: RenderSettings) -> Self {
        Self {
            context,
            settings,
            order: RenderOrder::new(),
            frame_count: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &WgpuContext {
        &self.context
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.context.size()
    }

    /// Frames submitted so far.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Formats every material pipeline is built against.
    #[must_use]
    pub fn target_formats(&self) -> TargetFormats {
        TargetFormats {
            color: self.context.color_format(),
            depth: self.context.depth_format,
            sample_count: self.context.sample_count,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    // ========================================================================
    // Render
    // ========================================================================

    /// Renders one frame of `scene` as seen from `camera`.
    ///
    /// A lost or outdated surface is reconfigured and the frame is skipped.
    /// Any failure while preparing a drawable aborts the frame.
    pub fn render(&mut self, scene: &mut Scene, camera: &mut Camera) -> Result<()> {
        // 1. 更新场景矩阵与相机
        scene.update_matrix_world();
        camera.update_view_matrix()?;
        camera.update_projection_matrix()?;

        // 2. 排序
        self.order.prepare(scene, camera.position());
        let keys: Vec<NodeKey> = self.order.ordered().collect();

        // 3. Extract
        let device = &self.context.device;
        let queue = &self.context.queue;
        let targets = self.target_formats();
        let view_matrix = *camera.view_matrix();

        let camera_group = camera.group_mut().get_or_build(device, queue)?;
        let mut draws = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(draw) = prepare_draw(device, queue, scene, key, camera, view_matrix, targets)? {
                draws.push(draw);
            }
        }

        // 4. 获取帧目标
        let surface_frame = match &self.context.target {
            FrameTarget::Surface { surface, .. } => match surface.get_current_texture() {
                wgpu::CurrentSurfaceTexture::Success(frame) | wgpu::CurrentSurfaceTexture::Suboptimal(frame) => Some(frame),
                wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                    log::warn!("Surface lost, reconfiguring");
                    self.context.reconfigure();
                    return Ok(());
                }
                e => {
                    log::error!("Render error: {e:?}");
                    return Ok(());
                }
            },
            FrameTarget::Offscreen { .. } => None,
        };

        let frame_view = match (&surface_frame, &self.context.target) {
            (Some(frame), _) => frame.texture.create_view(&wgpu::TextureViewDescriptor::default()),
            (None, FrameTarget::Offscreen { view, .. }) => view.clone(),
            (None, FrameTarget::Surface { .. }) => return Err(PrismError::NoSurface("surface frame missing")),
        };

        // 5. Execute
        let (color_view, resolve_target, color_store) = match self.context.msaa_view() {
            Some(msaa) => (msaa, Some(&frame_view), wgpu::StoreOp::Discard),
            None => (&frame_view, None, wgpu::StoreOp::Store),
        };

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Forward Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.context.clear_color),
                        store: color_store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.context.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in &draws {
                pass.set_pipeline(&draw.pipeline);
                pass.set_bind_group(0, &draw.bind_groups[0], &[]);
                pass.set_bind_group(1, &draw.bind_groups[1], &[]);
                pass.set_bind_group(2, &camera_group, &[]);
                for (slot, buffer) in draw.vertex_buffers.iter().enumerate() {
                    pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                pass.set_index_buffer(draw.index_buffer.slice(..), draw.index_format);
                pass.draw_indexed(0..draw.index_count, 0, 0..draw.instance_count);
                log::trace!(
                    "draw_indexed({} indices, {} instances)",
                    draw.index_count,
                    draw.instance_count
                );
            }
        }

        self.context.queue.submit(Some(encoder.finish()));
        if let Some(frame) = surface_frame {
            frame.present();
        }
        self.frame_count += 1;
        Ok(())
    }

    // ========================================================================
    // Compute
    // ========================================================================

    /// Dispatches `compute` with `workgroups` and waits for it to finish.
    pub async fn compute(&self, compute: &mut Compute, workgroups: [u32; 3]) -> Result<()> {
        let device = &self.context.device;
        let queue = &self.context.queue;

        compute.initialize(device)?;
        let bind_group = compute.group_mut().get_or_build(device, queue)?;
        let pipeline = compute.pipeline()?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Compute Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&compute.label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let [x, y, z] = workgroups;
            pass.dispatch_workgroups(x, y, z);
        }

        let (tx, rx) = flume::bounded(1);
        let submission = queue.submit(Some(encoder.finish()));
        queue.on_submitted_work_done(move || {
            let _ = tx.send(());
        });
        log::debug!("Compute '{}' dispatched {workgroups:?}", compute.label);

        readback::wait_for_submission(device, Some(submission), self.settings.gpu_wait_timeout)?;
        rx.recv_async().await?;
        Ok(())
    }

    /// [`compute`](Self::compute) with 64×1×1 workgroups.
    pub async fn dispatch_default(&self, compute: &mut Compute) -> Result<()> {
        self.compute(compute, DEFAULT_WORKGROUPS).await
    }

    // ========================================================================
    // Readback
    // ========================================================================

    /// Copies a buffer resource back to the CPU as `T`s.
    ///
    /// The buffer is initialized first if it never reached the GPU.
    pub async fn read_buffer<T: Pod>(&self, handle: &ResourceHandle) -> Result<Vec<T>> {
        {
            let mut res = handle.write();
            res.prepare(&self.context.device, &self.context.queue)?;
        }
        readback::read_buffer(
            &self.context.device,
            &self.context.queue,
            handle,
            self.settings.gpu_wait_timeout,
        )
        .await
    }

    /// Tightly packed pixels of the last rendered frame (headless only), in
    /// `settings.headless_format` byte order.
    pub async fn read_target_pixels(&self) -> Result<Vec<u8>> {
        let FrameTarget::Offscreen { texture, .. } = &self.context.target else {
            return Err(PrismError::NoSurface("pixel readback needs a headless renderer"));
        };
        readback::read_texture_rgba8(
            &self.context.device,
            &self.context.queue,
            texture,
            self.settings.gpu_wait_timeout,
        )
        .await
    }
}

/// Lazily creates everything `key` needs and captures its draw call.
///
/// Nodes without a drawable, or whose geometry has no triangles, yield `None`.
fn prepare_draw(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    scene: &mut Scene,
    key: NodeKey,
    camera: &mut Camera,
    view_matrix: Mat4,
    targets: TargetFormats,
) -> Result<Option<DrawCall>> {
    let Some((node, drawable)) = scene.drawable_bundle_mut(key) else {
        return Ok(None);
    };
    if drawable.geometry.is_empty() {
        log::debug!("Skipping empty geometry '{}'", drawable.geometry.label);
        return Ok(None);
    }
    let model = *node.transform.local_matrix();
    let world = *node.world_matrix();

    // Geometry
    drawable.geometry.initialize(device, queue)?;
    let layouts = drawable.vertex_layouts()?.to_vec();

    // Transform group
    drawable.update_matrices(model, world, view_matrix)?;
    let transform_group = drawable.group_mut().get_or_build(device, queue)?;

    // Material
    let material = Arc::clone(&drawable.material);
    let mut material = material.write();
    if !material.is_initialized() {
        let transform_layout = drawable.group_mut().layout(device)?;
        let camera_layout = camera.group_mut().layout(device)?;
        material.initialize(device, transform_layout, camera_layout)?;
    }
    let pipeline = material.render_pipeline(device, &layouts, targets)?;
    let material_group = material.group_mut().get_or_build(device, queue)?;

    // Vertex buffers: interleaved stream, then instance streams
    let gpu = drawable
        .geometry
        .gpu()
        .ok_or_else(|| PrismError::ResourceNotInitialized(drawable.geometry.label.clone()))?;
    let mut vertex_buffers = Vec::with_capacity(1 + drawable.geometry.instance_buffers().len());
    vertex_buffers.push(gpu.vertex_buffer.clone());
    for handle in drawable.geometry.instance_buffers() {
        let res = handle.read();
        let buffer = res
            .as_buffer()
            .and_then(|b| b.gpu_buffer())
            .ok_or_else(|| PrismError::ResourceNotInitialized(drawable.geometry.label.clone()))?;
        vertex_buffers.push(buffer.clone());
    }

    Ok(Some(DrawCall {
        pipeline,
        bind_groups: [material_group, transform_group],
        vertex_buffers,
        index_buffer: gpu.index_buffer.clone(),
        index_format: gpu.index_format,
        index_count: gpu.index_count,
        instance_count: drawable.instance_count,
    }))
}
