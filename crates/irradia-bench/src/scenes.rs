use glam::{UVec3, Vec3};
use irradia_core::{DirectionalLight, SkyModel, VolumeConfig, VolumeDesc};
use irradia_gi::{BoxScene, SceneBox};

/// Configuration for a single benchmark scene.
pub struct SceneConfig {
    pub name: &'static str,
    pub probe_counts: UVec3,
    pub probe_num_rays: u32,
    /// Boxes along each horizontal axis of the pillar field; 0 for none.
    pub pillars_per_side: u32,
}

/// Return the standard suite of benchmark scenes, smallest grid first.
pub fn standard_scenes() -> Vec<SceneConfig> {
    vec![
        SceneConfig {
            name: "room-4x3x4",
            probe_counts: UVec3::new(4, 3, 4),
            probe_num_rays: 144,
            pillars_per_side: 0,
        },
        SceneConfig {
            name: "room-8x4x8",
            probe_counts: UVec3::new(8, 4, 8),
            probe_num_rays: 144,
            pillars_per_side: 0,
        },
        SceneConfig {
            name: "pillars-8x4x8",
            probe_counts: UVec3::new(8, 4, 8),
            probe_num_rays: 144,
            pillars_per_side: 6,
        },
        SceneConfig {
            name: "pillars-16x4x16",
            probe_counts: UVec3::new(16, 4, 16),
            probe_num_rays: 256,
            pillars_per_side: 12,
        },
    ]
}

/// Half extent of the closed room every scene is built in.
const ROOM_HALF_EXTENT: f32 = 10.0;
const ROOM_HALF_HEIGHT: f32 = 4.0;
const WALL_THICKNESS: f32 = 0.5;

/// A closed room with a red left wall, a green right wall, an emissive
/// ceiling panel and an optional grid of pillars.
pub fn build_scene(config: &SceneConfig) -> BoxScene {
    let (w, h, t) = (ROOM_HALF_EXTENT, ROOM_HALF_HEIGHT, WALL_THICKNESS);
    let white = Vec3::splat(0.75);
    let mut boxes = vec![
        // Floor and ceiling.
        SceneBox::new(Vec3::new(-w, -h - t, -w), Vec3::new(w, -h, w), white),
        SceneBox::new(Vec3::new(-w, h, -w), Vec3::new(w, h + t, w), white),
        // Walls.
        SceneBox::new(Vec3::new(-w - t, -h, -w), Vec3::new(-w, h, w), Vec3::new(0.7, 0.1, 0.1)),
        SceneBox::new(Vec3::new(w, -h, -w), Vec3::new(w + t, h, w), Vec3::new(0.1, 0.7, 0.1)),
        SceneBox::new(Vec3::new(-w, -h, -w - t), Vec3::new(w, h, -w), white),
        SceneBox::new(Vec3::new(-w, -h, w), Vec3::new(w, h, w + t), white),
        // Light panel just below the ceiling.
        SceneBox::new(Vec3::new(-2.0, h - 0.1, -2.0), Vec3::new(2.0, h, 2.0), Vec3::ZERO)
            .with_emission(Vec3::splat(8.0)),
    ];

    let n = config.pillars_per_side;
    if n > 0 {
        let step = 2.0 * w / n as f32;
        for i in 0..n {
            for k in 0..n {
                let cx = -w + step * (i as f32 + 0.5);
                let cz = -w + step * (k as f32 + 0.5);
                let half = step * 0.15;
                boxes.push(SceneBox::new(
                    Vec3::new(cx - half, -h, cz - half),
                    Vec3::new(cx + half, h * 0.5, cz + half),
                    white,
                ));
            }
        }
    }

    BoxScene::from_boxes(boxes)
}

/// Volume covering the room's interior.
pub fn volume_config(config: &SceneConfig) -> VolumeConfig {
    let counts = config.probe_counts.as_vec3();
    let interior = Vec3::new(ROOM_HALF_EXTENT, ROOM_HALF_HEIGHT, ROOM_HALF_EXTENT) * 1.8;
    VolumeConfig {
        volume: VolumeDesc {
            origin: Vec3::ZERO,
            probe_spacing: interior / (counts - Vec3::ONE).max(Vec3::ONE),
            probe_counts: config.probe_counts,
            probe_num_rays: config.probe_num_rays,
            probe_max_ray_distance: 4.0 * ROOM_HALF_EXTENT,
            ..VolumeDesc::default()
        },
        light: DirectionalLight::new(Vec3::new(0.4, 1.0, 0.3), Vec3::ONE, 2.0),
        sky: SkyModel::default(),
        rotation_seed: Some(0x5eed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irradia_gi::AccelerationStructure;

    #[test]
    fn test_standard_scenes_are_valid() {
        for config in standard_scenes() {
            let volume = volume_config(&config);
            volume.volume.validate().expect("valid volume");
            let scene = build_scene(&config);
            assert!(scene.is_built());
            assert_eq!(
                scene.boxes().len() as u32,
                7 + config.pillars_per_side * config.pillars_per_side
            );
        }
    }

    #[test]
    fn test_probes_stay_inside_room() {
        let config = &standard_scenes()[1];
        let desc = volume_config(config).volume;
        for index in 0..desc.probe_count() {
            let p = desc.world_position_from_coords(desc.coords_from_index(index));
            assert!(p.x.abs() < ROOM_HALF_EXTENT && p.z.abs() < ROOM_HALF_EXTENT);
            assert!(p.y.abs() < ROOM_HALF_HEIGHT);
        }
    }
}
