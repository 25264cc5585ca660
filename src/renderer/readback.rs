//! GPU → CPU readback
//!
//! Copies go through a transient `MAP_READ | COPY_DST` staging buffer; the map
//! callback reports over a flume channel while the device is polled.

use std::time::Duration;

use bytemuck::Pod;

use crate::errors::{PrismError, Result};
use crate::resources::bindable::{Bindable, ResourceHandle};
use crate::resources::buffer::whole_elements;

/// Blocks until `submission` (or all work when `None`) has completed.
pub fn wait_for_submission(
    device: &wgpu::Device,
    submission: Option<wgpu::SubmissionIndex>,
    timeout: Option<Duration>,
) -> Result<()> {
    device.poll(wgpu::PollType::Wait {
        submission_index: submission,
        timeout,
    })?;
    Ok(())
}

/// Copies a buffer resource back to host memory as `T`s.
///
/// The source must carry `COPY_SRC` and already live on the GPU.
pub async fn read_buffer<T: Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    handle: &ResourceHandle,
    timeout: Option<Duration>,
) -> Result<Vec<T>> {
    let (source, size, len, label) = {
        let res = handle.read();
        let label = res.label().to_string();
        let buffer = res.as_buffer().ok_or_else(|| PrismError::UnbindableResource {
            slot: 0,
            label: label.clone(),
            reason: "only data buffers can be read back",
        })?;
        buffer.require_usage(wgpu::BufferUsages::COPY_SRC)?;
        let gpu = buffer
            .gpu_buffer()
            .ok_or_else(|| PrismError::ResourceNotInitialized(label.clone()))?
            .clone();
        (gpu, buffer.size(), buffer.len(), label)
    };

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(&source, 0, &staging, 0, size);
    let submission = queue.submit(Some(encoder.finish()));

    let mut bytes = map_staging(device, &staging, submission, timeout).await?;
    log::debug!("Read back {size} bytes from '{label}'");
    // 去掉对齐填充
    bytes.truncate(whole_elements::<T>(len));
    Ok(bytemuck::pod_collect_to_vec(&bytes))
}

/// Copies an RGBA8 texture into a tightly packed pixel vector.
///
/// Rows are copied with 256-byte alignment and the padding is stripped.
pub async fn read_texture_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let width = texture.width();
    let height = texture.height();
    let row_bytes = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_row = row_bytes.div_ceil(align) * align;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Texture Readback Staging"),
        size: u64::from(padded_row) * u64::from(height),
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Texture Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    let submission = queue.submit(Some(encoder.finish()));

    let padded = map_staging(device, &staging, submission, timeout).await?;
    Ok(strip_row_padding(&padded, row_bytes as usize, padded_row as usize, height as usize))
}

async fn map_staging(
    device: &wgpu::Device,
    staging: &wgpu::Buffer,
    submission: wgpu::SubmissionIndex,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let slice = staging.slice(..);
    let (tx, rx) = flume::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        // 接收端已放弃时忽略
        let _ = tx.send(result);
    });

    // map_async 之后必须先 poll，再 await
    wait_for_submission(device, Some(submission), timeout)?;
    rx.recv_async().await??;

    let bytes = slice.get_mapped_range().to_vec();
    staging.unmap();
    staging.destroy();
    Ok(bytes)
}

fn strip_row_padding(padded: &[u8], row_bytes: usize, padded_row: usize, rows: usize) -> Vec<u8> {
    if row_bytes == padded_row {
        return padded[..row_bytes * rows].to_vec();
    }
    let mut out = Vec::with_capacity(row_bytes * rows);
    for row in padded.chunks_exact(padded_row).take(rows) {
        out.extend_from_slice(&row[..row_bytes]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_is_stripped() {
        // 2 rows of 3 bytes, padded to 4
        let padded = [1, 2, 3, 0, 4, 5, 6, 0];
        assert_eq!(strip_row_padding(&padded, 3, 4, 2), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn aligned_rows_copy_through() {
        let padded = [1, 2, 3, 4];
        assert_eq!(strip_row_padding(&padded, 2, 2, 2), vec![1, 2, 3, 4]);
    }
}
