//! Headless rendering tests
//!
//! Render small scenes into an offscreen target and inspect the pixels.
//! All tests need a GPU adapter and return early without one.

use glam::{Vec3, Vec4};
use prism::renderer::pipeline::MaterialOptions;
use prism::resources::DataBuffer;
use prism::{Camera, Drawable, Geometry, Material, MaterialHandle, RenderSettings, Renderer, Scene};

// ============================================================================
// Helper
// ============================================================================

const SIZE: u32 = 32;

const FLAT_SHADER: &str = r"
#include <vertex_input>
#include <transform_uniforms>
#include <camera_uniforms>

@group(0) @binding(0) var<uniform> color: vec4<f32>;

@vertex
fn vertex_main(in: VertexInput) -> @builtin(position) vec4<f32> {
    return projection_matrix * view_matrix * world_matrix * in.position;
}

@fragment
fn fragment_main() -> @location(0) vec4<f32> {
    return color;
}
";

fn headless(settings: RenderSettings) -> Option<Renderer> {
    let _ = env_logger::builder().is_test(true).try_init();
    match pollster::block_on(Renderer::headless(SIZE, SIZE, settings)) {
        Ok(renderer) => Some(renderer),
        Err(e) => {
            log::warn!("Skipping GPU test: {e}");
            None
        }
    }
}

fn flat_material(color: Vec4, transparent: bool) -> MaterialHandle {
    let options = MaterialOptions {
        transparent,
        cull_mode: None,
        ..Default::default()
    };
    Material::new(FLAT_SHADER, options)
        .with_label("flat")
        .with_binding(
            0,
            wgpu::ShaderStages::FRAGMENT,
            DataBuffer::vec4(color, Some("color")).into_handle(),
        )
        .into_handle()
}

fn camera_at(z: f32) -> Camera {
    let mut camera = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    camera.transform.position = Vec3::new(0.0, 0.0, z);
    camera.look_at(Vec3::ZERO);
    camera
}

fn pixel(pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
    let i = ((y * SIZE + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 2)
}

fn blue_clear() -> RenderSettings {
    RenderSettings::default().with_clear_color(wgpu::Color {
        r: 0.0,
        g: 0.0,
        b: 1.0,
        a: 1.0,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn plane_covers_center_and_leaves_clear_color_at_corners() {
    let Some(mut renderer) = headless(blue_clear()) else { return };

    let mut scene = Scene::new();
    let red = flat_material(Vec4::new(1.0, 0.0, 0.0, 1.0), false);
    scene.add_drawable(Drawable::new(Geometry::new_plane(2.0, 2.0), red));
    let mut camera = camera_at(3.0);

    renderer.render(&mut scene, &mut camera).unwrap();
    let pixels = pollster::block_on(renderer.read_target_pixels()).unwrap();

    assert_eq!(pixels.len(), (SIZE * SIZE * 4) as usize);
    assert!(close(pixel(&pixels, SIZE / 2, SIZE / 2), [255, 0, 0, 255]));
    assert!(close(pixel(&pixels, 0, 0), [0, 0, 255, 255]));
    assert!(close(pixel(&pixels, SIZE - 1, SIZE - 1), [0, 0, 255, 255]));
    assert_eq!(renderer.frame_count(), 1);
}

#[test]
fn multisampled_render_resolves_into_target() {
    let Some(mut renderer) = headless(blue_clear().with_msaa(4)) else { return };

    let mut scene = Scene::new();
    let red = flat_material(Vec4::new(1.0, 0.0, 0.0, 1.0), false);
    scene.add_drawable(Drawable::new(Geometry::new_plane(2.0, 2.0), red));
    let mut camera = camera_at(3.0);

    renderer.render(&mut scene, &mut camera).unwrap();
    let pixels = pollster::block_on(renderer.read_target_pixels()).unwrap();

    assert!(close(pixel(&pixels, SIZE / 2, SIZE / 2), [255, 0, 0, 255]));
    assert!(close(pixel(&pixels, 0, 0), [0, 0, 255, 255]));
}

#[test]
fn nearer_opaque_surface_wins_depth_test() {
    let Some(mut renderer) = headless(blue_clear()) else { return };

    let mut scene = Scene::new();
    // Nearer plane added first so traversal order alone would paint it over
    let near = scene.add_drawable(Drawable::new(
        Geometry::new_plane(2.0, 2.0),
        flat_material(Vec4::new(0.0, 1.0, 0.0, 1.0), false),
    ));
    scene.get_node_mut(near).unwrap().transform.position.z = 1.0;
    scene.add_drawable(Drawable::new(
        Geometry::new_plane(2.0, 2.0),
        flat_material(Vec4::new(1.0, 0.0, 0.0, 1.0), false),
    ));
    let mut camera = camera_at(3.0);

    renderer.render(&mut scene, &mut camera).unwrap();
    let pixels = pollster::block_on(renderer.read_target_pixels()).unwrap();

    assert!(close(pixel(&pixels, SIZE / 2, SIZE / 2), [0, 255, 0, 255]));
}

#[test]
fn transparent_layers_blend_back_to_front() {
    let Some(mut renderer) = headless(blue_clear()) else { return };

    let mut scene = Scene::new();
    // Added near-first; sorting must still draw the far layer first
    let near = scene.add_drawable(Drawable::new(
        Geometry::new_plane(2.0, 2.0),
        flat_material(Vec4::new(0.0, 1.0, 0.0, 0.5), true),
    ));
    scene.get_node_mut(near).unwrap().transform.position.z = 1.0;
    scene.add_drawable(Drawable::new(
        Geometry::new_plane(2.0, 2.0),
        flat_material(Vec4::new(1.0, 0.0, 0.0, 1.0), true),
    ));
    let mut camera = camera_at(3.0);

    renderer.render(&mut scene, &mut camera).unwrap();
    let pixels = pollster::block_on(renderer.read_target_pixels()).unwrap();

    let center = pixel(&pixels, SIZE / 2, SIZE / 2);
    assert!(center[0].abs_diff(128) <= 2, "{center:?}");
    assert!(center[1].abs_diff(128) <= 2, "{center:?}");
    assert!(center[2] <= 2, "{center:?}");
}

#[test]
fn instanced_drawable_renders_every_instance() {
    let Some(mut renderer) = headless(blue_clear()) else { return };

    const INSTANCE_SHADER: &str = r"
#include <transform_uniforms>
#include <camera_uniforms>

struct Input {
    @location(0) position: vec4<f32>,
    @location(3) offset: vec4<f32>,
};

@vertex
fn vertex_main(in: Input) -> @builtin(position) vec4<f32> {
    let world = world_matrix * in.position + vec4<f32>(in.offset.xyz, 0.0);
    return projection_matrix * view_matrix * world;
}

@fragment
fn fragment_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
";

    let layout = prism::StructLayout::new().field("offset", prism::FieldType::Vec4, 1);
    let offsets: [[f32; 4]; 2] = [[-1.5, 0.0, 0.0, 0.0], [1.5, 0.0, 0.0, 0.0]];
    let mut instances = layout.create_buffer(2, Some("offsets"));
    instances.write(&offsets).unwrap();
    let instances = instances
        .with_vertex_attribute(layout.vertex_attribute("offset", 3).unwrap())
        .into_handle();

    let material = Material::new(
        INSTANCE_SHADER,
        MaterialOptions {
            cull_mode: None,
            ..Default::default()
        },
    )
    .into_handle();
    let geometry = Geometry::new_plane(1.0, 1.0).with_instance_buffer(instances);

    let mut scene = Scene::new();
    scene.add_drawable(Drawable::new(geometry, material).with_instances(2));
    let mut camera = camera_at(5.0);

    renderer.render(&mut scene, &mut camera).unwrap();
    let pixels = pollster::block_on(renderer.read_target_pixels()).unwrap();

    // Center is between the two instances
    let white = [255, 255, 255, 255];
    assert!(close(pixel(&pixels, SIZE / 2, SIZE / 2), [0, 0, 255, 255]));
    let row = SIZE / 2;
    let lit: Vec<u32> = (0..SIZE).filter(|&x| close(pixel(&pixels, x, row), white)).collect();
    assert!(lit.iter().any(|&x| x < SIZE / 2));
    assert!(lit.iter().any(|&x| x > SIZE / 2));
}

#[test]
fn invisible_nodes_are_not_drawn() {
    let Some(mut renderer) = headless(blue_clear()) else { return };

    let mut scene = Scene::new();
    let red = flat_material(Vec4::new(1.0, 0.0, 0.0, 1.0), false);
    let key = scene.add_drawable(Drawable::new(Geometry::new_plane(2.0, 2.0), red));
    scene.get_node_mut(key).unwrap().visible = false;
    let mut camera = camera_at(3.0);

    renderer.render(&mut scene, &mut camera).unwrap();
    let pixels = pollster::block_on(renderer.read_target_pixels()).unwrap();

    assert!(close(pixel(&pixels, SIZE / 2, SIZE / 2), [0, 0, 255, 255]));
}

#[test]
fn empty_geometry_is_skipped() {
    let Some(mut renderer) = headless(blue_clear()) else { return };

    let mut scene = Scene::new();
    let red = flat_material(Vec4::new(1.0, 0.0, 0.0, 1.0), false);
    scene.add_drawable(Drawable::new(Geometry::new(vec![], vec![]), red.clone()));
    scene.add_drawable(Drawable::new(Geometry::new_plane(2.0, 2.0), red));
    let mut camera = camera_at(3.0);

    renderer.render(&mut scene, &mut camera).unwrap();
    let pixels = pollster::block_on(renderer.read_target_pixels()).unwrap();

    assert!(close(pixel(&pixels, SIZE / 2, SIZE / 2), [255, 0, 0, 255]));
    assert_eq!(renderer.frame_count(), 1);
}

#[test]
fn dense_plane_draws_with_wide_indices() {
    let Some(mut renderer) = headless(blue_clear()) else { return };

    let geometry = prism::create_plane(&prism::PlaneOptions {
        width: 2.0,
        height: 2.0,
        width_segments: 300,
        height_segments: 300,
    });
    assert_eq!(geometry.index_format(), wgpu::IndexFormat::Uint32);

    let mut scene = Scene::new();
    let red = flat_material(Vec4::new(1.0, 0.0, 0.0, 1.0), false);
    scene.add_drawable(Drawable::new(geometry, red));
    let mut camera = camera_at(3.0);

    renderer.render(&mut scene, &mut camera).unwrap();
    let pixels = pollster::block_on(renderer.read_target_pixels()).unwrap();

    assert!(close(pixel(&pixels, SIZE / 2, SIZE / 2), [255, 0, 0, 255]));
    assert!(close(pixel(&pixels, 0, 0), [0, 0, 255, 255]));
}
