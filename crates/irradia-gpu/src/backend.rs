use std::sync::Arc;

use glam::Vec3;
use irradia_core::{FieldKind, GridLayout};
use irradia_gi::{
    BoxScene, CycleParams, GiError, ProbeBackend, ProbeField, RayDataBuffer, RayRecord,
    ResourcePool,
};

use crate::error::GpuError;
use crate::passes::{trace_workgroups, update_workgroups, ProbeKernels};
use crate::readback::{read_back_field, read_back_texture};
use crate::scene::GpuBoxScene;
use crate::textures::{extent_3d, GpuProbeTextures, GpuResourcePool};
use crate::uniforms::GpuVolumeUniforms;

/// Runs the probe stages as wgpu compute passes.
///
/// Every stage submits its own command buffer. Queue order keeps trace,
/// update and the next cycle's trace serialized, so the fields written by an
/// update are the ones the next trace and any shading pass read.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    kernels: ProbeKernels,
    scene: GpuBoxScene,
    pool: GpuResourcePool,
    published_cycle: Option<u64>,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, scene: BoxScene) -> Self {
        let kernels = ProbeKernels::new(&device);
        Self {
            scene: GpuBoxScene::new(device.clone(), queue.clone(), scene),
            pool: GpuResourcePool::new(device.clone()),
            device,
            queue,
            kernels,
            published_cycle: None,
        }
    }

    /// Create a backend on the system's preferred adapter.
    pub fn with_default_device(scene: BoxScene) -> Result<Self, GpuError> {
        let (device, queue) = crate::device::request_device("irradia-probes")?;
        Ok(Self::new(Arc::new(device), Arc::new(queue), scene))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn scene(&self) -> &BoxScene {
        self.scene.scene()
    }

    /// True when the scene's GPU buffers are current.
    pub fn scene_uploaded(&self) -> bool {
        self.scene.is_uploaded()
    }

    /// Edit the scene. The GPU copy is dropped until the next build.
    pub fn scene_mut(&mut self) -> &mut BoxScene {
        self.scene.scene_mut()
    }

    /// Cycle of the most recently published fields.
    pub fn published_cycle(&self) -> Option<u64> {
        self.published_cycle
    }

    /// Probe textures for binding in a shading pass.
    pub fn textures(&self) -> Result<&GpuProbeTextures, GpuError> {
        self.pool.textures()
    }

    /// Copy one field back to the host.
    pub fn read_back(&self, kind: FieldKind) -> Result<ProbeField, GpuError> {
        let layout = self
            .pool
            .layout()
            .ok_or(GpuError::ResourceNotReady("probe textures"))?;
        let textures = self.pool.textures()?;
        read_back_field(
            &self.device,
            &self.queue,
            &textures.field(kind).texture,
            layout.field(kind),
        )
    }

    /// Copy the last traced ray data back to the host.
    pub fn read_back_rays(&self) -> Result<RayDataBuffer, GpuError> {
        let layout = self
            .pool
            .layout()
            .ok_or(GpuError::ResourceNotReady("probe textures"))?;
        let textures = self.pool.textures()?;
        let texels =
            read_back_texture(&self.device, &self.queue, &textures.ray_data.texture, layout.ray_data)?;
        let mut rays = RayDataBuffer::new(layout);
        for (record, texel) in rays.records_mut().iter_mut().zip(texels) {
            *record = RayRecord::new(Vec3::new(texel.x, texel.y, texel.z), texel.w);
        }
        Ok(rays)
    }

    /// Resources for a stage, checked against the layout the stage expects.
    fn ready_textures(&self, params: &CycleParams<'_>) -> Result<&GpuProbeTextures, GiError> {
        let expected = params.desc.layout();
        let actual = self
            .pool
            .layout()
            .ok_or(GiError::ResourceNotReady("probe textures"))?;
        if *actual != expected {
            return Err(GiError::LayoutMismatch {
                expected: Box::new(expected),
                actual: Box::new(*actual),
            });
        }
        Ok(self.pool.textures()?)
    }

    fn write_uniforms(&self, textures: &GpuProbeTextures, params: &CycleParams<'_>) {
        let uniforms = GpuVolumeUniforms::from_params(params);
        self.queue
            .write_buffer(&textures.uniforms, 0, bytemuck::bytes_of(&uniforms));
    }

    fn encode_field_update(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        textures: &GpuProbeTextures,
        layout: &GridLayout,
        kind: FieldKind,
    ) {
        let field = textures.field(kind);
        let history = textures.history(kind);

        // The kernel blends against a snapshot; a texture cannot be bound
        // for sampling and storage in the same pass.
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &field.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &history.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            extent_3d(field.extent),
        );

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("probe-update-bind-group"),
            layout: &self.kernels.update_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: textures.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures.ray_data.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&history.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&field.view),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kind.label()),
            timestamp_writes: None,
        });
        pass.set_pipeline(self.kernels.update_pipeline(kind));
        pass.set_bind_group(0, &bind_group, &[]);
        let [x, y, z] = update_workgroups(layout.probe_counts);
        pass.dispatch_workgroups(x, y, z);
    }
}

impl ProbeBackend for WgpuBackend {
    type Pool = GpuResourcePool;

    fn pool(&self) -> &GpuResourcePool {
        &self.pool
    }

    fn pool_mut(&mut self) -> &mut GpuResourcePool {
        &mut self.pool
    }

    fn build_acceleration_structure(&mut self) -> Result<(), GiError> {
        self.scene.build(&self.kernels.scene_layout);
        Ok(())
    }

    fn dispatch_trace(&mut self, params: &CycleParams<'_>) -> Result<(), GiError> {
        let scene = self
            .scene
            .buffers()
            .ok_or(GiError::AccelerationStructureStale)?;
        let textures = self.ready_textures(params)?;
        self.write_uniforms(textures, params);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("probe-trace-bind-group"),
            layout: &self.kernels.trace_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: textures.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures.ray_data.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&textures.irradiance.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&textures.distance.view),
                },
            ],
        });

        let desc = params.desc;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("probe-trace-encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("probe-trace-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.kernels.trace);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_bind_group(1, &scene.bind_group, &[]);
            let [x, y, z] = trace_workgroups(
                desc.probe_num_rays,
                desc.probes_per_layer(),
                desc.probe_counts.y,
            );
            pass.dispatch_workgroups(x, y, z);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn dispatch_update(&mut self, params: &CycleParams<'_>) -> Result<(), GiError> {
        let textures = self.ready_textures(params)?;
        self.write_uniforms(textures, params);
        let layout = params.desc.layout();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("probe-update-encoder"),
            });
        for kind in FieldKind::ALL {
            self.encode_field_update(&mut encoder, textures, &layout, kind);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn publish_fields(&mut self, params: &CycleParams<'_>) -> Result<(), GiError> {
        self.ready_textures(params)?;
        self.published_cycle = Some(params.cycle);
        log::trace!("Published probe fields for cycle {}", params.cycle);
        Ok(())
    }

    fn release(&mut self) {
        self.pool.release();
        self.scene.release();
        self.published_cycle = None;
    }
}
