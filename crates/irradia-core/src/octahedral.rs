//! Octahedral direction <-> square mapping used by the probe texel blocks.
//!
//! A probe block is `n + 2` texels square: `n x n` interior texels that map
//! the whole sphere, plus a one-texel border that duplicates interior texels
//! across the octahedral fold lines so hardware bilinear filtering never
//! reads across seams.

use glam::{UVec2, Vec2, Vec3};

use crate::math::sign_not_zero;

/// Map a unit direction to octahedral coordinates in `[-1, 1]^2`.
pub fn octahedral_encode(direction: Vec3) -> Vec2 {
    let l1 = direction.x.abs() + direction.y.abs() + direction.z.abs();
    let mut uv = Vec2::new(direction.x, direction.y) / l1;
    if direction.z < 0.0 {
        uv = (Vec2::ONE - Vec2::new(uv.y, uv.x).abs()) * sign_not_zero(uv);
    }
    uv
}

/// Map octahedral coordinates in `[-1, 1]^2` back to a unit direction.
pub fn octahedral_decode(uv: Vec2) -> Vec3 {
    let mut direction = Vec3::new(uv.x, uv.y, 1.0 - uv.x.abs() - uv.y.abs());
    if direction.z < 0.0 {
        let folded =
            (Vec2::ONE - Vec2::new(direction.y, direction.x).abs()) * sign_not_zero(uv);
        direction.x = folded.x;
        direction.y = folded.y;
    }
    direction.normalize()
}

/// Octahedral coordinates at the center of interior texel `texel`
/// (`[0, n)` on each axis, border excluded).
pub fn interior_texel_to_octahedral(texel: UVec2, interior_texels: u32) -> Vec2 {
    let n = interior_texels as f32;
    ((texel.as_vec2() + Vec2::splat(0.5)) / n) * 2.0 - Vec2::ONE
}

/// Direction represented by interior texel `texel`.
pub fn interior_texel_direction(texel: UVec2, interior_texels: u32) -> Vec3 {
    octahedral_decode(interior_texel_to_octahedral(texel, interior_texels))
}

/// Continuous texel coordinate of `uv` inside a padded probe block, with
/// texel `(i, j)` covering `[i, i + 1) x [j, j + 1)`. The interior occupies
/// `[1, n + 1)`.
pub fn octahedral_to_block_coord(uv: Vec2, interior_texels: u32) -> Vec2 {
    let n = interior_texels as f32;
    Vec2::ONE + (uv * 0.5 + Vec2::splat(0.5)) * n
}

/// For a texel of a padded block (`[0, n + 2)` on each axis), return the
/// interior texel whose value it must mirror, or `None` for interior texels.
///
/// Rows and columns are flipped across the fold; the four corners copy the
/// diagonally opposite interior corner.
pub fn border_source_texel(texel: UVec2, interior_texels: u32) -> Option<UVec2> {
    let n = interior_texels;
    let last = n + 1;
    let on_x_edge = texel.x == 0 || texel.x == last;
    let on_y_edge = texel.y == 0 || texel.y == last;

    match (on_x_edge, on_y_edge) {
        (false, false) => None,
        (true, true) => Some(UVec2::new(
            if texel.x == 0 { n } else { 1 },
            if texel.y == 0 { n } else { 1 },
        )),
        // Top or bottom row: mirror horizontally, step one texel inward.
        (false, true) => Some(UVec2::new(
            last - texel.x,
            if texel.y == 0 { 1 } else { n },
        )),
        // Left or right column: mirror vertically, step one texel inward.
        (true, false) => Some(UVec2::new(
            if texel.x == 0 { 1 } else { n },
            last - texel.y,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_directions() -> Vec<Vec3> {
        let mut dirs = vec![
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
        ];
        for i in 0..64 {
            let t = i as f32 * 0.7;
            dirs.push(Vec3::new(t.cos(), (t * 1.3).sin(), (t * 0.4).cos() - 0.3).normalize());
        }
        dirs
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for dir in test_directions() {
            let back = octahedral_decode(octahedral_encode(dir));
            assert!(back.dot(dir) > 0.9999, "{dir} -> {back}");
        }
    }

    #[test]
    fn test_encode_stays_in_square() {
        for dir in test_directions() {
            let uv = octahedral_encode(dir);
            assert!(uv.abs().max_element() <= 1.0 + 1e-6, "{uv}");
        }
    }

    #[test]
    fn test_pole_mapping() {
        assert!(octahedral_encode(Vec3::Z).length() < 1e-6);
        assert!(octahedral_encode(Vec3::NEG_Z).abs().min_element() > 0.999);
    }

    #[test]
    fn test_interior_texel_centers() {
        let uv = interior_texel_to_octahedral(UVec2::new(0, 0), 4);
        assert!((uv - Vec2::new(-0.75, -0.75)).length() < 1e-6);
        let uv = interior_texel_to_octahedral(UVec2::new(3, 3), 4);
        assert!((uv - Vec2::new(0.75, 0.75)).length() < 1e-6);
    }

    #[test]
    fn test_block_coord_matches_texel_center() {
        let n = 6;
        for x in 0..n {
            for y in 0..n {
                let texel = UVec2::new(x, y);
                let coord = octahedral_to_block_coord(interior_texel_to_octahedral(texel, n), n);
                let expected = (texel + UVec2::ONE).as_vec2() + Vec2::splat(0.5);
                assert!((coord - expected).length() < 1e-5);
            }
        }
    }

    #[test]
    fn test_border_rows_and_columns_mirror() {
        let n = 4;
        assert_eq!(border_source_texel(UVec2::new(2, 2), n), None);
        // Top row, flipped horizontally.
        assert_eq!(border_source_texel(UVec2::new(1, 0), n), Some(UVec2::new(4, 1)));
        assert_eq!(border_source_texel(UVec2::new(4, 0), n), Some(UVec2::new(1, 1)));
        // Bottom row.
        assert_eq!(border_source_texel(UVec2::new(2, 5), n), Some(UVec2::new(3, 4)));
        // Left and right columns, flipped vertically.
        assert_eq!(border_source_texel(UVec2::new(0, 1), n), Some(UVec2::new(1, 4)));
        assert_eq!(border_source_texel(UVec2::new(5, 3), n), Some(UVec2::new(4, 2)));
    }

    #[test]
    fn test_border_corners_copy_opposite_corner() {
        let n = 4;
        assert_eq!(border_source_texel(UVec2::new(0, 0), n), Some(UVec2::new(4, 4)));
        assert_eq!(border_source_texel(UVec2::new(5, 0), n), Some(UVec2::new(1, 4)));
        assert_eq!(border_source_texel(UVec2::new(0, 5), n), Some(UVec2::new(4, 1)));
        assert_eq!(border_source_texel(UVec2::new(5, 5), n), Some(UVec2::new(1, 1)));
    }

    #[test]
    fn test_border_texel_matches_neighbor_direction() {
        // A border texel continues the sphere across the fold: its source
        // direction must be closer to the adjacent interior texel than to
        // the texel it was mirrored from on the opposite side.
        let n = 8;
        let border = UVec2::new(3, 0);
        let source = border_source_texel(border, n).unwrap_or(UVec2::ZERO);
        let adjacent = UVec2::new(3, 1);
        let source_dir = interior_texel_direction(source - UVec2::ONE, n);
        let adjacent_dir = interior_texel_direction(adjacent - UVec2::ONE, n);
        assert!(source_dir.dot(adjacent_dir) > 0.5);
    }
}
