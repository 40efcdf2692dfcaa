use glam::UVec3;

use crate::constants::PROBE_BORDER_TEXELS;

/// Probe coordinate in grid space, `[0, counts)` on each axis.
pub type ProbeCoord = UVec3;

/// Which of the two persistent probe fields a resource or kernel refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Encoded RGB irradiance.
    Irradiance,
    /// Mean and mean-squared hit distance.
    Distance,
}

impl FieldKind {
    pub const ALL: [FieldKind; 2] = [FieldKind::Irradiance, FieldKind::Distance];

    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Irradiance => "probe-irradiance",
            FieldKind::Distance => "probe-distance",
        }
    }
}

/// Size of a 2-D array resource: `width x height` texels, `layers` slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureExtent {
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

impl TextureExtent {
    pub fn new(width: u32, height: u32, layers: u32) -> Self {
        Self {
            width,
            height,
            layers,
        }
    }

    /// Total texel count across all layers.
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.layers as usize
    }

    /// Flat index of texel `(x, y)` in `layer`, row-major within a layer.
    pub fn flat_index(&self, x: u32, y: u32, layer: u32) -> usize {
        debug_assert!(x < self.width && y < self.height && layer < self.layers);
        (layer as usize * self.height as usize + y as usize) * self.width as usize + x as usize
    }
}

/// Octahedral block geometry of one probe field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldLayout {
    pub kind: FieldKind,
    /// Interior texels per side, without the border.
    pub interior_texels: u32,
    pub extent: TextureExtent,
}

impl FieldLayout {
    /// Texels per side of a probe block, border included.
    pub fn block_texels(&self) -> u32 {
        self.interior_texels + 2 * PROBE_BORDER_TEXELS
    }
}

/// Every resource extent a probe volume needs. Two volumes with equal
/// layouts can share resources without reallocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridLayout {
    pub probe_counts: UVec3,
    pub num_rays: u32,
    /// `[ray][x + z*X][y]`
    pub ray_data: TextureExtent,
    pub irradiance: FieldLayout,
    pub distance: FieldLayout,
}

impl GridLayout {
    pub fn field(&self, kind: FieldKind) -> &FieldLayout {
        match kind {
            FieldKind::Irradiance => &self.irradiance,
            FieldKind::Distance => &self.distance,
        }
    }
}
