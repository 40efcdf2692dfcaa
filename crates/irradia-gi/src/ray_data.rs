use glam::{UVec3, Vec3};
use irradia_core::{GridLayout, TextureExtent};

/// One traced ray: RGB radiance plus hit distance. 16 bytes, the same
/// layout as an `Rgba32Float` texel of the GPU ray-data texture.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RayRecord {
    pub radiance: [f32; 3],
    pub distance: f32,
}

impl RayRecord {
    pub fn new(radiance: Vec3, distance: f32) -> Self {
        Self {
            radiance: radiance.to_array(),
            distance,
        }
    }

    pub fn radiance(&self) -> Vec3 {
        Vec3::from_array(self.radiance)
    }
}

/// Scratch ray results for one cycle.
///
/// Stored as a 2-D array: column = ray slot, row = probe index within its
/// XZ layer (`x + z*X`), layer = probe Y. Fully overwritten every cycle.
#[derive(Debug, Clone)]
pub struct RayDataBuffer {
    layout: GridLayout,
    extent: TextureExtent,
    records: Vec<RayRecord>,
}

impl RayDataBuffer {
    pub fn new(layout: &GridLayout) -> Self {
        let extent = layout.ray_data;
        Self {
            layout: *layout,
            extent,
            records: vec![RayRecord::default(); extent.texel_count()],
        }
    }

    /// Layout the buffer was sized for.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn extent(&self) -> TextureExtent {
        self.extent
    }

    pub fn num_rays(&self) -> u32 {
        self.extent.width
    }

    fn index(&self, ray: u32, layer_row: u32, layer: u32) -> usize {
        self.extent.flat_index(ray, layer_row, layer)
    }

    pub fn get(&self, ray: u32, layer_row: u32, layer: u32) -> RayRecord {
        self.records[self.index(ray, layer_row, layer)]
    }

    pub fn set(&mut self, ray: u32, layer_row: u32, layer: u32, record: RayRecord) {
        let index = self.index(ray, layer_row, layer);
        self.records[index] = record;
    }

    /// All rays of the probe at `coords`, in slot order.
    pub fn probe_rays(&self, coords: UVec3, probe_counts: UVec3) -> &[RayRecord] {
        let row = coords.x + coords.z * probe_counts.x;
        let start = self.index(0, row, coords.y);
        &self.records[start..start + self.extent.width as usize]
    }

    /// Flat records; consecutive runs of `num_rays` belong to one probe,
    /// in probe-index order (X, then Z, then Y).
    pub fn records_mut(&mut self) -> &mut [RayRecord] {
        &mut self.records
    }

    pub fn records(&self) -> &[RayRecord] {
        &self.records
    }
}
