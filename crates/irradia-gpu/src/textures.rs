use std::sync::Arc;

use irradia_core::{FieldKind, GridLayout, TextureExtent};
use irradia_gi::{ResizeOutcome, ResourcePool};

use crate::error::GpuError;
use crate::uniforms::GpuVolumeUniforms;

/// Every probe texture uses this format: RGB + one scalar, or two moments.
pub const PROBE_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// One 2-D array texture plus its array view.
pub struct ProbeTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub extent: TextureExtent,
}

impl ProbeTexture {
    fn new(device: &wgpu::Device, label: &str, extent: TextureExtent, usage: wgpu::TextureUsages) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent_3d(extent),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PROBE_TEXTURE_FORMAT,
            usage,
            view_formats: &[],
        });
        // Explicit D2Array so single-layer grids still bind as arrays.
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        Self {
            texture,
            view,
            extent,
        }
    }
}

pub fn extent_3d(extent: TextureExtent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: extent.layers,
    }
}

/// GPU probe resources for one grid layout.
pub struct GpuProbeTextures {
    pub ray_data: ProbeTexture,
    pub irradiance: ProbeTexture,
    pub distance: ProbeTexture,
    /// Copies of the fields taken before each update; the update kernels
    /// read these while writing the fields.
    pub irradiance_history: ProbeTexture,
    pub distance_history: ProbeTexture,
    pub uniforms: wgpu::Buffer,
}

impl GpuProbeTextures {
    fn new(device: &wgpu::Device, layout: &GridLayout) -> Self {
        let field_usage = wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST;
        let history_usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        let ray_usage = wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC;

        Self {
            ray_data: ProbeTexture::new(device, "probe-ray-data", layout.ray_data, ray_usage),
            irradiance: ProbeTexture::new(
                device,
                FieldKind::Irradiance.label(),
                layout.irradiance.extent,
                field_usage,
            ),
            distance: ProbeTexture::new(
                device,
                FieldKind::Distance.label(),
                layout.distance.extent,
                field_usage,
            ),
            irradiance_history: ProbeTexture::new(
                device,
                "probe-irradiance-history",
                layout.irradiance.extent,
                history_usage,
            ),
            distance_history: ProbeTexture::new(
                device,
                "probe-distance-history",
                layout.distance.extent,
                history_usage,
            ),
            uniforms: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("probe-volume-uniforms"),
                size: std::mem::size_of::<GpuVolumeUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
        }
    }

    pub fn field(&self, kind: FieldKind) -> &ProbeTexture {
        match kind {
            FieldKind::Irradiance => &self.irradiance,
            FieldKind::Distance => &self.distance,
        }
    }

    pub fn history(&self, kind: FieldKind) -> &ProbeTexture {
        match kind {
            FieldKind::Irradiance => &self.irradiance_history,
            FieldKind::Distance => &self.distance_history,
        }
    }

    fn destroy(&self) {
        for probe_texture in [
            &self.ray_data,
            &self.irradiance,
            &self.distance,
            &self.irradiance_history,
            &self.distance_history,
        ] {
            probe_texture.texture.destroy();
        }
        self.uniforms.destroy();
    }
}

/// Lazily created probe textures. New textures are zero-filled by wgpu.
pub struct GpuResourcePool {
    device: Arc<wgpu::Device>,
    layout: Option<GridLayout>,
    textures: Option<GpuProbeTextures>,
}

impl GpuResourcePool {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            layout: None,
            textures: None,
        }
    }

    pub fn textures(&self) -> Result<&GpuProbeTextures, GpuError> {
        self.textures
            .as_ref()
            .ok_or(GpuError::ResourceNotReady("probe textures"))
    }
}

impl ResourcePool for GpuResourcePool {
    fn resize_if_needed(&mut self, layout: &GridLayout) -> ResizeOutcome {
        let outcome = match &self.layout {
            Some(current) if current == layout && self.textures.is_some() => {
                return ResizeOutcome::Unchanged
            }
            Some(_) => ResizeOutcome::Recreated,
            None => ResizeOutcome::Created,
        };
        if let Some(old) = self.textures.take() {
            old.destroy();
        }
        self.textures = Some(GpuProbeTextures::new(&self.device, layout));
        self.layout = Some(*layout);
        log::info!(
            "Created probe textures: rays {}x{}x{}, irradiance {}x{}x{}, distance {}x{}x{} ({:?})",
            layout.ray_data.width,
            layout.ray_data.height,
            layout.ray_data.layers,
            layout.irradiance.extent.width,
            layout.irradiance.extent.height,
            layout.irradiance.extent.layers,
            layout.distance.extent.width,
            layout.distance.extent.height,
            layout.distance.extent.layers,
            outcome
        );
        outcome
    }

    fn release(&mut self) {
        if let Some(textures) = self.textures.take() {
            textures.destroy();
            log::info!("Released probe textures");
        }
        self.layout = None;
    }

    fn is_ready(&self) -> bool {
        self.textures.is_some()
    }

    fn layout(&self) -> Option<&GridLayout> {
        self.layout.as_ref()
    }
}
