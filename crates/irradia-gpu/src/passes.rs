use glam::UVec3;
use irradia_core::constants::{
    COINCIDENT_PROBE_DISTANCE, GOLDEN_RATIO_FRACT, MIN_VISIBILITY_WEIGHT, MIN_WEIGHT_SUM,
};
use irradia_core::FieldKind;
use irradia_gi::scene::RAY_T_MIN;
use irradia_gi::tracer::SHADOW_RAY_BIAS;

use crate::textures::PROBE_TEXTURE_FORMAT;

/// Rays per trace workgroup along X.
pub const TRACE_WORKGROUP_SIZE: u32 = 32;

/// Update workgroups are square; each strides over one probe block.
pub const UPDATE_WORKGROUP_SIZE: u32 = 8;

/// Fixed traversal stack depth in the trace kernel. Median splits keep the
/// tree depth near log2(boxes), far below this.
pub const BVH_STACK_SIZE: u32 = 32;

/// WGSL constants shared with the host code.
pub fn constants_preamble() -> String {
    format!(
        "const PI: f32 = {:?};\n\
         const GOLDEN_RATIO_FRACT: f32 = {:?};\n\
         const MIN_WEIGHT_SUM: f32 = {:?};\n\
         const MIN_VISIBILITY_WEIGHT: f32 = {:?};\n\
         const COINCIDENT_PROBE_DISTANCE: f32 = {:?};\n\
         const RAY_T_MIN: f32 = {:?};\n\
         const SHADOW_RAY_BIAS: f32 = {:?};\n\
         const BVH_STACK_SIZE: u32 = {}u;\n\
         const TRACE_WORKGROUP_SIZE: u32 = {}u;\n\
         const UPDATE_WORKGROUP_SIZE: u32 = {}u;\n",
        std::f32::consts::PI,
        GOLDEN_RATIO_FRACT,
        MIN_WEIGHT_SUM,
        MIN_VISIBILITY_WEIGHT,
        COINCIDENT_PROBE_DISTANCE,
        RAY_T_MIN,
        SHADOW_RAY_BIAS,
        BVH_STACK_SIZE,
        TRACE_WORKGROUP_SIZE,
        UPDATE_WORKGROUP_SIZE,
    )
}

pub fn trace_shader_source() -> String {
    let preamble = constants_preamble();
    let common_wgsl = include_str!("../../../shaders/probes/common.wgsl");
    let trace_wgsl = include_str!("../../../shaders/probes/trace.wgsl");
    format!("{preamble}\n{common_wgsl}\n{trace_wgsl}")
}

pub fn update_shader_source() -> String {
    let preamble = constants_preamble();
    let common_wgsl = include_str!("../../../shaders/probes/common.wgsl");
    let update_wgsl = include_str!("../../../shaders/probes/update.wgsl");
    format!("{preamble}\n{common_wgsl}\n{update_wgsl}")
}

/// Workgroups for the trace kernel: one invocation per ray slot, probe row
/// and probe layer.
pub fn trace_workgroups(num_rays: u32, rows: u32, layers: u32) -> [u32; 3] {
    [num_rays.div_ceil(TRACE_WORKGROUP_SIZE), rows, layers]
}

/// Workgroups for one field update: one per probe, `(X, Z, Y)`.
pub fn update_workgroups(probe_counts: UVec3) -> [u32; 3] {
    [probe_counts.x, probe_counts.z, probe_counts.y]
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_buffer_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn sampled_array_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2Array,
            multisampled: false,
        },
        count: None,
    }
}

fn storage_array_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: PROBE_TEXTURE_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2Array,
        },
        count: None,
    }
}

/// Trace group 0: uniforms, ray data (write), previous irradiance and
/// distance (read).
pub fn create_trace_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("probe-trace-bind-group-layout"),
        entries: &[
            uniform_entry(0),
            storage_array_entry(1),
            sampled_array_entry(2),
            sampled_array_entry(3),
        ],
    })
}

/// Trace group 1: scene boxes, BVH nodes, box order, scene info.
pub fn create_scene_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("probe-scene-bind-group-layout"),
        entries: &[
            storage_buffer_entry(0),
            storage_buffer_entry(1),
            storage_buffer_entry(2),
            uniform_entry(3),
        ],
    })
}

/// Update group 0: uniforms, ray data (read), field history (read), field
/// (write).
pub fn create_update_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("probe-update-bind-group-layout"),
        entries: &[
            uniform_entry(0),
            sampled_array_entry(1),
            sampled_array_entry(2),
            storage_array_entry(3),
        ],
    })
}

fn create_compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    module: &wgpu::ShaderModule,
    entry_point: &str,
) -> wgpu::ComputePipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        module,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

/// Every probe compute pipeline plus the layouts they bind through.
pub struct ProbeKernels {
    pub trace_layout: wgpu::BindGroupLayout,
    pub scene_layout: wgpu::BindGroupLayout,
    pub update_layout: wgpu::BindGroupLayout,
    pub trace: wgpu::ComputePipeline,
    pub update_irradiance: wgpu::ComputePipeline,
    pub update_distance: wgpu::ComputePipeline,
}

impl ProbeKernels {
    pub fn new(device: &wgpu::Device) -> Self {
        let trace_layout = create_trace_layout(device);
        let scene_layout = create_scene_layout(device);
        let update_layout = create_update_layout(device);

        let trace_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("probe-trace-shader"),
            source: wgpu::ShaderSource::Wgsl(trace_shader_source().into()),
        });
        let update_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("probe-update-shader"),
            source: wgpu::ShaderSource::Wgsl(update_shader_source().into()),
        });

        let trace = create_compute_pipeline(
            device,
            "probe-trace-pipeline",
            &[&trace_layout, &scene_layout],
            &trace_module,
            "trace",
        );
        let update_irradiance = create_compute_pipeline(
            device,
            "probe-update-irradiance-pipeline",
            &[&update_layout],
            &update_module,
            "update_irradiance",
        );
        let update_distance = create_compute_pipeline(
            device,
            "probe-update-distance-pipeline",
            &[&update_layout],
            &update_module,
            "update_distance",
        );

        Self {
            trace_layout,
            scene_layout,
            update_layout,
            trace,
            update_irradiance,
            update_distance,
        }
    }

    pub fn update_pipeline(&self, kind: FieldKind) -> &wgpu::ComputePipeline {
        match kind {
            FieldKind::Irradiance => &self.update_irradiance,
            FieldKind::Distance => &self.update_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irradia_core::VolumeDesc;

    #[test]
    fn test_preamble_declares_every_constant() {
        let preamble = constants_preamble();
        for name in [
            "PI",
            "GOLDEN_RATIO_FRACT",
            "MIN_WEIGHT_SUM",
            "MIN_VISIBILITY_WEIGHT",
            "COINCIDENT_PROBE_DISTANCE",
            "RAY_T_MIN",
            "SHADOW_RAY_BIAS",
            "BVH_STACK_SIZE",
            "TRACE_WORKGROUP_SIZE",
            "UPDATE_WORKGROUP_SIZE",
        ] {
            assert!(
                preamble.contains(&format!("const {name}:")),
                "missing {name}"
            );
        }
        // Float literals keep a decimal point or exponent so WGSL parses f32.
        assert!(preamble.contains("const MIN_WEIGHT_SUM: f32 = 1e-6;"));
        assert!(preamble.contains("const BVH_STACK_SIZE: u32 = 32u;"));
    }

    #[test]
    fn test_shader_sources_contain_entry_points() {
        let trace = trace_shader_source();
        assert!(trace.contains("fn trace("));
        assert!(trace.contains("struct VolumeUniforms"));
        let update = update_shader_source();
        assert!(update.contains("fn update_irradiance("));
        assert!(update.contains("fn update_distance("));
    }

    #[test]
    fn test_trace_workgroups_cover_every_ray() {
        assert_eq!(trace_workgroups(144, 12, 3), [5, 12, 3]);
        assert_eq!(trace_workgroups(32, 1, 1), [1, 1, 1]);
        assert_eq!(trace_workgroups(33, 4, 2), [2, 4, 2]);
    }

    #[test]
    fn test_update_workgroups_one_per_probe() {
        let desc = VolumeDesc {
            probe_counts: UVec3::new(3, 2, 5),
            ..VolumeDesc::default()
        };
        assert_eq!(update_workgroups(desc.layout().probe_counts), [3, 5, 2]);
    }

    #[cfg(feature = "gpu_tests")]
    #[test]
    fn test_kernels_compile() {
        let (device, _queue) = crate::device::request_device("kernel-test").expect("GPU device");
        let _kernels = ProbeKernels::new(&device);
    }
}
