//! Runs a compute program on a storage buffer and prints the result.
//!
//! ```sh
//! cargo run --example compute_readback
//! ```

use prism::{Compute, DataBuffer, RenderSettings, Renderer};

const SQUARE: &str = r"
@group(0) @binding(0) var<storage, read_write> values: array<f32>;
@group(0) @binding(1) var<uniform> scale: f32;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= arrayLength(&values)) {
        return;
    }
    values[id.x] = values[id.x] * values[id.x] * scale;
}
";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    pollster::block_on(async {
        let renderer = Renderer::headless(1, 1, RenderSettings::default()).await?;

        let input: Vec<f32> = (0..256).map(|i| i as f32 * 0.25).collect();
        let values = DataBuffer::storage(&input, Some("values")).into_handle();
        let scale = DataBuffer::float(0.5, Some("scale")).into_handle();

        let mut compute = Compute::new(SQUARE)
            .with_label("square")
            .with_binding(0, values.clone())
            .with_binding(1, scale.clone());

        // 256 elements / 64 per workgroup
        renderer.compute(&mut compute, [4, 1, 1]).await?;
        let output: Vec<f32> = renderer.read_buffer(&values).await?;

        for (i, (a, b)) in input.iter().zip(&output).enumerate().step_by(32) {
            println!("[{i:3}] {a:6.2} -> {b:8.3}");
        }

        // Change the uniform and run again on the squared values
        if let Some(buffer) = scale.write().as_buffer_mut() {
            buffer.set_float(2.0)?;
        }
        renderer.compute(&mut compute, [4, 1, 1]).await?;
        let output: Vec<f32> = renderer.read_buffer(&values).await?;
        println!("second pass, last element: {:?}", output.last());

        anyhow::Ok(())
    })
}
