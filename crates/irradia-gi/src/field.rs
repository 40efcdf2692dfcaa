use glam::{UVec2, UVec3, Vec2, Vec4};
use irradia_core::octahedral::{border_source_texel, octahedral_to_block_coord};
use irradia_core::{FieldKind, FieldLayout};

use crate::error::GiError;

/// Copy border texels of one padded block from the interior texels they
/// mirror. `block` is `(n + 2)^2` texels, row-major.
pub fn fill_block_border(block: &mut [Vec4], interior_texels: u32) {
    let side = interior_texels + 2;
    debug_assert_eq!(block.len(), (side * side) as usize);
    for y in 0..side {
        for x in 0..side {
            if let Some(source) = border_source_texel(UVec2::new(x, y), interior_texels) {
                block[(y * side + x) as usize] = block[(source.y * side + source.x) as usize];
            }
        }
    }
}

/// A probe field texture held on the host: one padded texel block per probe,
/// blocks tiled `X` wide and `Z` tall in layer `Y`.
///
/// Irradiance texels hold encoded RGB in `xyz`; distance texels hold
/// `(mean, mean²)` in `xy`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeField {
    layout: FieldLayout,
    texels: Vec<Vec4>,
}

impl ProbeField {
    /// A zero-initialised field.
    pub fn new(layout: FieldLayout) -> Self {
        Self {
            layout,
            texels: vec![Vec4::ZERO; layout.extent.texel_count()],
        }
    }

    /// Wrap texels read back from elsewhere (e.g. a GPU texture).
    pub fn from_texels(layout: FieldLayout, texels: Vec<Vec4>) -> Result<Self, GiError> {
        if texels.len() != layout.extent.texel_count() {
            return Err(GiError::Backend(format!(
                "{} holds {} texels, expected {}",
                layout.kind.label(),
                texels.len(),
                layout.extent.texel_count()
            )));
        }
        Ok(Self { layout, texels })
    }

    pub fn kind(&self) -> FieldKind {
        self.layout.kind
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn interior_texels(&self) -> u32 {
        self.layout.interior_texels
    }

    pub fn block_texels(&self) -> u32 {
        self.layout.block_texels()
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Top-left texel of the probe's block within its layer.
    pub fn block_origin(&self, coords: UVec3) -> UVec2 {
        let side = self.block_texels();
        UVec2::new(coords.x * side, coords.z * side)
    }

    fn index(&self, coords: UVec3, local: UVec2) -> usize {
        let origin = self.block_origin(coords) + local;
        self.layout.extent.flat_index(origin.x, origin.y, coords.y)
    }

    /// Texel at `local` (`[0, n + 2)` per axis) of the probe's block.
    pub fn texel(&self, coords: UVec3, local: UVec2) -> Vec4 {
        self.texels[self.index(coords, local)]
    }

    pub fn set_texel(&mut self, coords: UVec3, local: UVec2, value: Vec4) {
        let index = self.index(coords, local);
        self.texels[index] = value;
    }

    /// Copy of the probe's padded block, row-major.
    pub fn read_block(&self, coords: UVec3) -> Vec<Vec4> {
        let side = self.block_texels();
        let mut block = Vec::with_capacity((side * side) as usize);
        for y in 0..side {
            let start = self.index(coords, UVec2::new(0, y));
            block.extend_from_slice(&self.texels[start..start + side as usize]);
        }
        block
    }

    pub fn write_block(&mut self, coords: UVec3, block: &[Vec4]) {
        let side = self.block_texels() as usize;
        debug_assert_eq!(block.len(), side * side);
        for (y, row) in block.chunks_exact(side).enumerate() {
            let start = self.index(coords, UVec2::new(0, y as u32));
            self.texels[start..start + side].copy_from_slice(row);
        }
    }

    /// Refresh the border of one probe's block from its interior.
    pub fn update_border(&mut self, coords: UVec3) {
        let mut block = self.read_block(coords);
        fill_block_border(&mut block, self.interior_texels());
        self.write_block(coords, &block);
    }

    /// Bilinear sample of the probe's block at octahedral coordinates `uv`.
    ///
    /// Filtering may read border texels but never a neighbouring block.
    pub fn sample_block(&self, coords: UVec3, uv: Vec2) -> Vec4 {
        let n = self.interior_texels();
        let p = octahedral_to_block_coord(uv.clamp(Vec2::NEG_ONE, Vec2::ONE), n) - Vec2::splat(0.5);
        let base = p.floor().max(Vec2::ZERO);
        let f = (p - base).clamp(Vec2::ZERO, Vec2::ONE);
        let i0 = base.as_uvec2().min(UVec2::splat(n));
        let i1 = (i0 + UVec2::ONE).min(UVec2::splat(n + 1));

        let t00 = self.texel(coords, i0);
        let t10 = self.texel(coords, UVec2::new(i1.x, i0.y));
        let t01 = self.texel(coords, UVec2::new(i0.x, i1.y));
        let t11 = self.texel(coords, i1);
        let top = t00 * (1.0 - f.x) + t10 * f.x;
        let bottom = t01 * (1.0 - f.x) + t11 * f.x;
        top * (1.0 - f.y) + bottom * f.y
    }
}
