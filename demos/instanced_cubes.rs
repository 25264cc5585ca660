//! A grid of instanced cubes whose offsets are animated by a compute pass.
//!
//! The same storage buffer is written by the compute program and read as a
//! per-instance vertex stream by the material. Drag with the left button to
//! orbit, the right button to pan, and scroll to zoom.

use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use prism::renderer::pipeline::compute::DEFAULT_WORKGROUPS;
use prism::{
    Camera, Compute, DataBuffer, Drawable, FieldType, Geometry, Input, Material, OrbitControls,
    RenderSettings, Renderer, ResourceHandle, Scene, StructLayout,
};

const GRID: u32 = 16;
const COUNT: u32 = GRID * GRID;

const ANIMATE: &str = r"
struct Instance {
    offset: vec4<f32>,
};

@group(0) @binding(0) var<storage, read_write> instances: array<Instance>;
@group(0) @binding(1) var<uniform> time: f32;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i >= arrayLength(&instances)) {
        return;
    }
    let grid = 16u;
    let x = f32(i % grid) - 7.5;
    let z = f32(i / grid) - 7.5;
    let y = sin(time * 2.0 + length(vec2<f32>(x, z)) * 0.6);
    instances[i].offset = vec4<f32>(x * 1.5, y, z * 1.5, 0.0);
}
";

const CUBE: &str = r"
#include <transform_uniforms>
#include <camera_uniforms>

struct Input {
    @location(0) position: vec4<f32>,
    @location(1) normal: vec3<f32>,
    @location(3) offset: vec4<f32>,
};

struct Output {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) height: f32,
};

@vertex
fn vertex_main(in: Input) -> Output {
    var out: Output;
    let world = world_matrix * in.position + vec4<f32>(in.offset.xyz, 0.0);
    out.clip = projection_matrix * view_matrix * world;
    out.normal = (world_matrix * vec4<f32>(in.normal, 0.0)).xyz;
    out.height = in.offset.y;
    return out;
}

@fragment
fn fragment_main(in: Output) -> @location(0) vec4<f32> {
    let light = normalize(vec3<f32>(0.4, 1.0, 0.3));
    let diffuse = max(dot(normalize(in.normal), light), 0.0) * 0.8 + 0.2;
    let base = mix(vec3<f32>(0.2, 0.4, 0.9), vec3<f32>(0.9, 0.5, 0.2), in.height * 0.5 + 0.5);
    return vec4<f32>(base * diffuse, 1.0);
}
";

struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    scene: Scene,
    camera: Camera,
    controls: OrbitControls,
    input: Input,
    animate: Compute,
    time: ResourceHandle,
    start: Instant,
    last_frame: Instant,
}

impl App {
    fn new() -> Self {
        let layout = StructLayout::new().field("offset", FieldType::Vec4, 1);
        let instances = layout
            .create_buffer(COUNT as usize, Some("Instances"))
            .with_vertex_attribute(
                layout
                    .vertex_attribute("offset", 3)
                    .expect("vec4 field feeds a vertex attribute"),
            )
            .into_handle();
        let time = DataBuffer::float(0.0, Some("Time")).into_handle();

        let animate = Compute::new(ANIMATE)
            .with_label("Animate Instances")
            .with_binding(0, instances.clone())
            .with_binding(1, time.clone());

        let mut scene = Scene::new();
        let geometry = Geometry::new_box(1.0, 1.0, 1.0).with_instance_buffer(instances);
        let material = Material::opaque(CUBE).with_label("Instanced Cube").into_handle();
        scene.add_drawable(Drawable::new(geometry, material).with_instances(COUNT));

        let mut camera = Camera::new_perspective(45.0, 16.0 / 9.0, 0.1, 200.0);
        camera.transform.position = Vec3::new(0.0, 18.0, 30.0);
        camera.look_at(Vec3::ZERO);
        let controls = OrbitControls::from_camera(&camera, Vec3::ZERO);

        Self {
            window: None,
            renderer: None,
            scene,
            camera,
            controls,
            input: Input::default(),
            animate,
            time,
            start: Instant::now(),
            last_frame: Instant::now(),
        }
    }

    fn frame(&mut self) -> anyhow::Result<()> {
        let Some(renderer) = &mut self.renderer else {
            return Ok(());
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.controls.update(&mut self.camera, &self.input, dt);
        self.input.end_frame();

        if let Some(buffer) = self.time.write().as_buffer_mut() {
            buffer.set_float(self.start.elapsed().as_secs_f32())?;
        }
        pollster::block_on(renderer.compute(&mut self.animate, DEFAULT_WORKGROUPS))?;
        renderer.render(&mut self.scene, &mut self.camera)?;
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes().with_title("Prism: Instanced Cubes");
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        let settings = RenderSettings::default().with_msaa(4);
        match pollster::block_on(Renderer::new(window.clone(), size.width, size.height, settings)) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                log::error!("Failed to create renderer: {e}");
                event_loop.exit();
                return;
            }
        }
        let _ = self
            .camera
            .set_aspect(size.width as f32 / size.height.max(1) as f32);
        self.input.handle_resize(size.width, size.height);
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.handle_window_event(&event);
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                    let _ = self
                        .camera
                        .set_aspect(size.width as f32 / size.height.max(1) as f32);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.frame() {
                    log::error!("Frame failed: {e}");
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new();
    event_loop.run_app(&mut app)?;
    Ok(())
}
