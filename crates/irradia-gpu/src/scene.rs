use std::sync::Arc;

use bytemuck::Zeroable;
use irradia_gi::{AccelerationStructure, BoxScene, BvhNode, SceneBox};

/// Box record uploaded to the trace kernel (64 bytes, matches `SceneBox` in
/// probes/trace.wgsl).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuSceneBox {
    pub min: [f32; 3],
    pub _pad0: f32,
    pub max: [f32; 3],
    pub _pad1: f32,
    pub albedo: [f32; 3],
    pub _pad2: f32,
    pub emission: [f32; 3],
    pub _pad3: f32,
}

impl From<&SceneBox> for GpuSceneBox {
    fn from(b: &SceneBox) -> Self {
        Self {
            min: b.min.to_array(),
            _pad0: 0.0,
            max: b.max.to_array(),
            _pad1: 0.0,
            albedo: b.albedo.to_array(),
            _pad2: 0.0,
            emission: b.emission.to_array(),
            _pad3: 0.0,
        }
    }
}

/// BVH node record (48 bytes). `count == 0` marks an interior node whose
/// left child is `first`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuBvhNode {
    pub min: [f32; 3],
    pub first: u32,
    pub max: [f32; 3],
    pub count: u32,
    pub right: u32,
    pub _pad: [u32; 3],
}

impl From<&BvhNode> for GpuBvhNode {
    fn from(node: &BvhNode) -> Self {
        Self {
            min: node.min.to_array(),
            first: node.first,
            max: node.max.to_array(),
            count: node.count,
            right: node.right,
            _pad: [0; 3],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuSceneInfo {
    pub node_count: u32,
    pub box_count: u32,
    pub _pad0: u32,
    pub _pad1: u32,
}

/// Host-side arrays in upload order. Storage bindings cannot be empty, so
/// an empty scene still uploads one zeroed record per array.
pub struct SceneUpload {
    pub info: GpuSceneInfo,
    pub boxes: Vec<GpuSceneBox>,
    pub nodes: Vec<GpuBvhNode>,
    pub box_order: Vec<u32>,
}

impl SceneUpload {
    pub fn from_scene(scene: &BoxScene) -> Self {
        let mut boxes: Vec<GpuSceneBox> = scene.boxes().iter().map(GpuSceneBox::from).collect();
        let mut nodes: Vec<GpuBvhNode> = scene.nodes().iter().map(GpuBvhNode::from).collect();
        let mut box_order = scene.box_order().to_vec();
        let info = GpuSceneInfo {
            node_count: nodes.len() as u32,
            box_count: boxes.len() as u32,
            _pad0: 0,
            _pad1: 0,
        };
        if boxes.is_empty() {
            boxes.push(GpuSceneBox::zeroed());
        }
        if nodes.is_empty() {
            nodes.push(GpuBvhNode::zeroed());
        }
        if box_order.is_empty() {
            box_order.push(0);
        }
        Self {
            info,
            boxes,
            nodes,
            box_order,
        }
    }
}

/// Scene buffers plus the bind group the trace kernel reads them through.
pub struct GpuSceneBuffers {
    pub boxes: wgpu::Buffer,
    pub nodes: wgpu::Buffer,
    pub box_order: wgpu::Buffer,
    pub info: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl GpuSceneBuffers {
    fn destroy(&self) {
        self.boxes.destroy();
        self.nodes.destroy();
        self.box_order.destroy();
        self.info.destroy();
    }
}

/// A `BoxScene` mirrored into GPU storage buffers.
///
/// Building the host BVH re-uploads it. Any mutable access drops the upload,
/// so a trace against an edited but unbuilt scene fails instead of reading
/// stale buffers.
pub struct GpuBoxScene {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    scene: BoxScene,
    buffers: Option<GpuSceneBuffers>,
}

impl GpuBoxScene {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, scene: BoxScene) -> Self {
        Self {
            device,
            queue,
            scene,
            buffers: None,
        }
    }

    pub fn scene(&self) -> &BoxScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut BoxScene {
        if let Some(buffers) = self.buffers.take() {
            buffers.destroy();
        }
        &mut self.scene
    }

    /// True when the uploaded buffers reflect the current scene.
    pub fn is_uploaded(&self) -> bool {
        self.buffers.is_some() && self.scene.is_built()
    }

    pub fn buffers(&self) -> Option<&GpuSceneBuffers> {
        if self.scene.is_built() {
            self.buffers.as_ref()
        } else {
            None
        }
    }

    /// Build the host BVH if needed and upload it.
    pub fn build(&mut self, layout: &wgpu::BindGroupLayout) {
        if self.is_uploaded() {
            return;
        }
        if !self.scene.is_built() {
            self.scene.build();
        }
        if let Some(old) = self.buffers.take() {
            old.destroy();
        }

        let upload = SceneUpload::from_scene(&self.scene);
        let boxes = self.storage_buffer("probe-scene-boxes", bytemuck::cast_slice(&upload.boxes));
        let nodes = self.storage_buffer("probe-scene-nodes", bytemuck::cast_slice(&upload.nodes));
        let box_order =
            self.storage_buffer("probe-scene-box-order", bytemuck::cast_slice(&upload.box_order));
        let info = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("probe-scene-info"),
            size: std::mem::size_of::<GpuSceneInfo>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&info, 0, bytemuck::bytes_of(&upload.info));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("probe-scene-bind-group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: boxes.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: nodes.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: box_order.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: info.as_entire_binding(),
                },
            ],
        });

        log::debug!(
            "Uploaded probe scene: {} boxes, {} BVH nodes",
            upload.info.box_count,
            upload.info.node_count
        );
        self.buffers = Some(GpuSceneBuffers {
            boxes,
            nodes,
            box_order,
            info,
            bind_group,
        });
    }

    fn storage_buffer(&self, label: &str, bytes: &[u8]) -> wgpu::Buffer {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: bytes.len() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&buffer, 0, bytes);
        buffer
    }

    pub fn release(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            buffers.destroy();
        }
    }
}
