use irradia_gi::CycleParams;

/// Per-cycle volume uniforms (144 bytes, matches `VolumeUniforms` in
/// probes/common.wgsl). Every `vec3` is followed by a scalar so the layout
/// needs no explicit padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVolumeUniforms {
    pub origin: [f32; 3],
    pub num_rays: u32,
    pub spacing: [f32; 3],
    pub hysteresis: f32,
    pub counts: [u32; 3],
    /// 1 when hits add last cycle's irradiance.
    pub indirect_bounce: u32,
    /// Quaternion `(x, y, z, w)`.
    pub rotation: [f32; 4],
    /// Unit direction towards the light.
    pub light_direction: [f32; 3],
    pub max_ray_distance: f32,
    /// Light color times intensity.
    pub light_radiance: [f32; 3],
    pub normal_bias: f32,
    /// Sky zenith color times intensity.
    pub sky_zenith: [f32; 3],
    pub view_bias: f32,
    pub sky_horizon: [f32; 3],
    pub encoding_gamma: f32,
    pub distance_exponent: f32,
    pub irradiance_texels: u32,
    pub distance_texels: u32,
    pub cycle: u32,
}

impl GpuVolumeUniforms {
    pub fn from_params(params: &CycleParams<'_>) -> Self {
        let desc = params.desc;
        let sky = params.sky;
        Self {
            origin: desc.origin.to_array(),
            num_rays: desc.probe_num_rays,
            spacing: desc.probe_spacing.to_array(),
            hysteresis: desc.probe_hysteresis,
            counts: desc.probe_counts.to_array(),
            indirect_bounce: desc.probe_indirect_bounce as u32,
            rotation: params.rotation.to_array(),
            light_direction: params.light.direction.normalize_or_zero().to_array(),
            max_ray_distance: desc.probe_max_ray_distance,
            light_radiance: params.light.radiance().to_array(),
            normal_bias: desc.probe_normal_bias,
            sky_zenith: (sky.zenith * sky.intensity).to_array(),
            view_bias: desc.probe_view_bias,
            sky_horizon: (sky.horizon * sky.intensity).to_array(),
            encoding_gamma: desc.probe_irradiance_encoding_gamma,
            distance_exponent: desc.probe_distance_exponent,
            irradiance_texels: desc.probe_num_irradiance_interior_texels,
            distance_texels: desc.probe_num_distance_interior_texels,
            cycle: params.cycle as u32,
        }
    }
}
