//! Compute dispatch and readback tests
//!
//! All tests need a GPU adapter and return early without one.

use prism::resources::{BufferBinding, DataBuffer};
use prism::{Compute, PrismError, RenderSettings, Renderer};

// ============================================================================
// Helper
// ============================================================================

const DOUBLE_SHADER: &str = r"
@group(0) @binding(0) var<storage, read_write> data: array<u32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x < arrayLength(&data)) {
        data[id.x] = data[id.x] * 2u;
    }
}
";

fn headless() -> Option<Renderer> {
    let _ = env_logger::builder().is_test(true).try_init();
    match pollster::block_on(Renderer::headless(8, 8, RenderSettings::default())) {
        Ok(renderer) => Some(renderer),
        Err(e) => {
            log::warn!("Skipping GPU test: {e}");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn dispatch_doubles_storage_buffer() {
    let Some(renderer) = headless() else { return };

    let input: Vec<u32> = (0..64).collect();
    let data = DataBuffer::storage(&input, Some("data")).into_handle();
    let mut compute = Compute::new(DOUBLE_SHADER)
        .with_label("double")
        .with_binding(0, data.clone());

    pollster::block_on(renderer.compute(&mut compute, [1, 1, 1])).unwrap();
    let output: Vec<u32> = pollster::block_on(renderer.read_buffer(&data)).unwrap();

    let expected: Vec<u32> = input.iter().map(|v| v * 2).collect();
    assert_eq!(output, expected);
    assert!(compute.is_initialized());
}

#[test]
fn repeated_dispatch_reuses_pipeline_and_bind_group() {
    let Some(renderer) = headless() else { return };

    let data = DataBuffer::storage(&[1u32, 2, 3], None).into_handle();
    let mut compute = Compute::new(DOUBLE_SHADER).with_binding(0, data.clone());

    pollster::block_on(renderer.dispatch_default(&mut compute)).unwrap();
    pollster::block_on(renderer.dispatch_default(&mut compute)).unwrap();

    let output: Vec<u32> = pollster::block_on(renderer.read_buffer(&data)).unwrap();
    assert_eq!(output, vec![4, 8, 12]);
    assert_eq!(compute.group().bind_group_builds(), 1);
}

#[test]
fn cpu_writes_are_uploaded_before_dispatch() {
    let Some(renderer) = headless() else { return };

    let data = DataBuffer::storage(&[1u32; 4], None).into_handle();
    let mut compute = Compute::new(DOUBLE_SHADER).with_binding(0, data.clone());
    pollster::block_on(renderer.compute(&mut compute, [1, 1, 1])).unwrap();

    data.write()
        .as_buffer_mut()
        .unwrap()
        .write(&[10u32, 20, 30, 40])
        .unwrap();
    pollster::block_on(renderer.compute(&mut compute, [1, 1, 1])).unwrap();

    let output: Vec<u32> = pollster::block_on(renderer.read_buffer(&data)).unwrap();
    assert_eq!(output, vec![20, 40, 60, 80]);
}

#[test]
fn float_round_trip_within_tolerance() {
    let Some(renderer) = headless() else { return };

    const SCALE_SHADER: &str = r"
@group(0) @binding(0) var<storage, read_write> values: array<f32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x < arrayLength(&values)) {
        values[id.x] = values[id.x] * 0.1 + 0.25;
    }
}
";

    let input: Vec<f32> = (0..100).map(|i| i as f32 * 0.37 - 5.0).collect();
    let data = DataBuffer::storage(&input, Some("floats")).into_handle();
    let mut compute = Compute::new(SCALE_SHADER).with_binding(0, data.clone());

    pollster::block_on(renderer.compute(&mut compute, [2, 1, 1])).unwrap();
    let output: Vec<f32> = pollster::block_on(renderer.read_buffer(&data)).unwrap();

    assert_eq!(output.len(), input.len());
    for (got, x) in output.iter().zip(&input) {
        let expected = x * 0.1 + 0.25;
        assert!((got - expected).abs() < 1e-5, "{got} vs {expected}");
    }
}

#[test]
fn readback_returns_unpadded_elements() {
    let Some(renderer) = headless() else { return };

    let data = DataBuffer::new(
        &[1u16, 2, 3],
        wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        Some("halfwords"),
    )
    .into_handle();

    let output: Vec<u16> = pollster::block_on(renderer.read_buffer(&data)).unwrap();
    assert_eq!(output, vec![1, 2, 3]);
}

#[test]
fn readback_without_copy_src_fails() {
    let Some(renderer) = headless() else { return };

    let data = DataBuffer::new(
        &[0u32; 4],
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        Some("write only"),
    )
    .with_binding(BufferBinding::Storage)
    .into_handle();

    let result = pollster::block_on(renderer.read_buffer::<u32>(&data));
    assert!(matches!(
        result,
        Err(PrismError::MissingUsage { required, .. }) if required == wgpu::BufferUsages::COPY_SRC
    ));
}

#[test]
fn invalid_compute_shader_reports_compile_error() {
    let Some(renderer) = headless() else { return };

    let data = DataBuffer::storage(&[0u32; 4], None).into_handle();
    let mut compute = Compute::new("@compute @workgroup_size(1) fn main() { let x: u32 = ; }")
        .with_binding(0, data);

    let result = pollster::block_on(renderer.dispatch_default(&mut compute));
    assert!(matches!(result, Err(PrismError::ShaderCompile { .. })));
}
