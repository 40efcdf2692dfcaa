use glam::{Mat4, Vec3};
use irradia_core::VolumeDesc;

/// Which kind of view is being rendered. Probe debug geometry is only drawn
/// for authoring views, never in the shipped game view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Game,
    Scene,
    Editor,
}

impl ViewKind {
    pub fn shows_probes(self) -> bool {
        !matches!(self, ViewKind::Game)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl DebugVertex {
    pub fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }
}

/// One instance transform per probe, in probe-index order, scaled by
/// `probe_visualization_scale`. Empty for views that hide probes.
pub fn probe_instance_matrices(desc: &VolumeDesc, view: ViewKind) -> Vec<Mat4> {
    if !view.shows_probes() {
        return Vec::new();
    }
    (0..desc.probe_count())
        .map(|index| {
            desc.world_matrix_from_coords(desc.coords_from_index(index), desc.probe_visualization_scale)
        })
        .collect()
}

/// Line-list crosses marking each probe (3 axes x 2 verts per probe).
pub fn probe_debug_lines(desc: &VolumeDesc, view: ViewKind) -> Vec<DebugVertex> {
    if !view.shows_probes() {
        return Vec::new();
    }
    let half = desc.probe_visualization_scale * 0.5;
    let axes = [
        (Vec3::X * half.x, [1.0, 0.3, 0.3, 0.8]),
        (Vec3::Y * half.y, [0.3, 1.0, 0.3, 0.8]),
        (Vec3::Z * half.z, [0.3, 0.3, 1.0, 0.8]),
    ];

    let mut verts = Vec::with_capacity(desc.probe_count() as usize * 6);
    for index in 0..desc.probe_count() {
        let center = desc.world_position_from_coords(desc.coords_from_index(index));
        for (offset, color) in axes {
            verts.push(DebugVertex::new((center - offset).to_array(), color));
            verts.push(DebugVertex::new((center + offset).to_array(), color));
        }
    }
    verts
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    fn desc() -> VolumeDesc {
        VolumeDesc {
            probe_counts: UVec3::new(3, 2, 2),
            probe_spacing: Vec3::splat(4.0),
            probe_visualization_scale: Vec3::splat(0.5),
            ..VolumeDesc::default()
        }
    }

    #[test]
    fn test_game_view_draws_nothing() {
        let desc = desc();
        assert!(probe_instance_matrices(&desc, ViewKind::Game).is_empty());
        assert!(probe_debug_lines(&desc, ViewKind::Game).is_empty());
    }

    #[test]
    fn test_instance_per_probe_at_probe_position() {
        let desc = desc();
        for view in [ViewKind::Scene, ViewKind::Editor] {
            let matrices = probe_instance_matrices(&desc, view);
            assert_eq!(matrices.len(), 12);
            for (index, matrix) in matrices.iter().enumerate() {
                let coords = desc.coords_from_index(index as u32);
                let (scale, _, translation) = matrix.to_scale_rotation_translation();
                assert!((translation - desc.world_position_from_coords(coords)).length() < 1e-5);
                assert!((scale - Vec3::splat(0.5)).length() < 1e-5);
            }
        }
    }

    #[test]
    fn test_debug_lines_are_centered_on_probes() {
        let desc = desc();
        let verts = probe_debug_lines(&desc, ViewKind::Editor);
        assert_eq!(verts.len(), 72);
        for (index, pair) in verts.chunks_exact(2).enumerate() {
            let probe = desc.coords_from_index((index / 3) as u32);
            let mid = (Vec3::from_array(pair[0].position) + Vec3::from_array(pair[1].position)) * 0.5;
            assert!((mid - desc.world_position_from_coords(probe)).length() < 1e-5);
        }
    }
}
