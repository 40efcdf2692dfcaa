use glam::Vec4;
use irradia_core::{FieldLayout, TextureExtent};
use irradia_gi::ProbeField;

use crate::error::GpuError;
use crate::textures::extent_3d;

/// Bytes per Rgba32Float texel.
const TEXEL_BYTES: u32 = 16;

/// Row pitch of a texture-to-buffer copy, padded to wgpu's alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    (width * TEXEL_BYTES).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Strip row padding from a mapped copy, yielding tightly packed texels in
/// `TextureExtent::flat_index` order.
pub fn unpad_rows(data: &[u8], extent: TextureExtent) -> Vec<Vec4> {
    let row_bytes = (extent.width * TEXEL_BYTES) as usize;
    let pitch = padded_bytes_per_row(extent.width) as usize;
    let rows = (extent.height * extent.layers) as usize;
    let mut texels = Vec::with_capacity(extent.texel_count());
    for row in data.chunks(pitch).take(rows) {
        texels.extend(
            row[..row_bytes]
                .chunks_exact(TEXEL_BYTES as usize)
                .map(|t| Vec4::from_array(bytemuck::pod_read_unaligned(t))),
        );
    }
    texels
}

/// Copy a whole array texture back to the host. Blocks until the GPU is idle.
pub fn read_back_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    extent: TextureExtent,
) -> Result<Vec<Vec4>, GpuError> {
    let pitch = padded_bytes_per_row(extent.width);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("probe-readback-staging"),
        size: pitch as u64 * extent.height as u64 * extent.layers as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("probe-readback-encoder"),
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
                bytes_per_row: Some(pitch),
                rows_per_image: Some(extent.height),
            },
        },
        extent_3d(extent),
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(GpuError::Readback(e.to_string())),
        Err(e) => return Err(GpuError::Readback(e.to_string())),
    }
    let texels = {
        let data = slice.get_mapped_range();
        unpad_rows(&data, extent)
    };
    staging.unmap();
    staging.destroy();
    Ok(texels)
}

/// Read a probe field texture into a host [`ProbeField`].
pub fn read_back_field(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    layout: &FieldLayout,
) -> Result<ProbeField, GpuError> {
    let texels = read_back_texture(device, queue, texture, layout.extent)?;
    ProbeField::from_texels(*layout, texels).map_err(|e| GpuError::Readback(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_row_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(16), 256);
        assert_eq!(padded_bytes_per_row(17), 512);
    }

    #[test]
    fn test_unpad_rows_drops_padding() {
        let extent = TextureExtent::new(2, 2, 2);
        let pitch = padded_bytes_per_row(2) as usize;
        let mut data = vec![0u8; pitch * 4];
        for row in 0..4 {
            for x in 0..2 {
                let value = (row * 2 + x) as f32;
                let texel = [value, value + 0.25, value + 0.5, 1.0];
                let start = row * pitch + x * TEXEL_BYTES as usize;
                data[start..start + 16].copy_from_slice(bytemuck::cast_slice(&texel));
            }
            // Padding bytes must never leak into the result.
            data[row * pitch + 32..(row + 1) * pitch].fill(0xff);
        }

        let texels = unpad_rows(&data, extent);
        assert_eq!(texels.len(), extent.texel_count());
        for (i, texel) in texels.iter().enumerate() {
            assert_eq!(texel.x, i as f32);
            assert_eq!(texel.w, 1.0);
        }
        assert_eq!(texels[extent.flat_index(1, 0, 1)].x, 5.0);
    }
}
