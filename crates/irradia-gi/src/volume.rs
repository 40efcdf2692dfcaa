use glam::Quat;
use irradia_core::{DirectionalLight, RandomRotationGenerator, SkyModel, VolumeConfig, VolumeDesc};

use crate::backend::{CycleParams, ProbeBackend};
use crate::error::GiError;
use crate::resources::{ResizeOutcome, ResourcePool};
use crate::stages::{Stage, StageSchedule};

/// Summary of one completed update cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub rotation: Quat,
    pub resize: ResizeOutcome,
}

/// Owns a probe volume's configuration and drives its backend through
/// trace, update and apply once per call to [`ProbeVolume::update`].
///
/// The descriptor is immutable during a cycle; the rotation is drawn here
/// and nowhere else.
pub struct ProbeVolume<B: ProbeBackend> {
    desc: VolumeDesc,
    light: DirectionalLight,
    sky: SkyModel,
    rotations: RandomRotationGenerator,
    schedule: StageSchedule,
    backend: B,
    cycle: u64,
    skipped_cycles: u64,
}

impl<B: ProbeBackend> ProbeVolume<B> {
    pub fn new(config: VolumeConfig, backend: B) -> Result<Self, GiError> {
        config.volume.validate()?;
        let rotations = match config.rotation_seed {
            Some(seed) => RandomRotationGenerator::from_seed(seed),
            None => RandomRotationGenerator::from_entropy(),
        };
        log::info!(
            "Probe volume: {} probes, {} rays per probe",
            config.volume.probe_count(),
            config.volume.probe_num_rays
        );
        Ok(Self {
            desc: config.volume,
            light: config.light,
            sky: config.sky,
            rotations,
            schedule: StageSchedule::new(),
            backend,
            cycle: 0,
            skipped_cycles: 0,
        })
    }

    pub fn desc(&self) -> &VolumeDesc {
        &self.desc
    }

    /// Replace the descriptor. Resources follow on the next cycle.
    pub fn set_desc(&mut self, desc: VolumeDesc) -> Result<(), GiError> {
        desc.validate()?;
        self.desc = desc;
        Ok(())
    }

    pub fn set_light(&mut self, light: DirectionalLight) {
        self.light = light;
    }

    pub fn set_sky(&mut self, sky: SkyModel) {
        self.sky = sky;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Cycles completed so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn skipped_cycles(&self) -> u64 {
        self.skipped_cycles
    }

    /// Run one full cycle. On error nothing is published and the fields
    /// keep their previous contents.
    pub fn update(&mut self) -> Result<CycleReport, GiError> {
        match self.run_cycle() {
            Ok(report) => {
                self.cycle += 1;
                log::debug!(
                    "Probe cycle {} done (resources {:?})",
                    report.cycle,
                    report.resize
                );
                Ok(report)
            }
            Err(e) => {
                self.schedule.abort();
                self.skipped_cycles += 1;
                log::warn!("Skipping probe cycle {}: {}", self.cycle, e);
                Err(e)
            }
        }
    }

    fn run_cycle(&mut self) -> Result<CycleReport, GiError> {
        let resize = self.backend.pool_mut().resize_if_needed(&self.desc.layout());
        if resize == ResizeOutcome::Recreated {
            log::info!("Probe grid layout changed; fields restart from zero");
        }
        self.backend.build_acceleration_structure()?;

        let rotation = self.rotations.next_rotation();
        let params = CycleParams {
            desc: &self.desc,
            rotation,
            light: &self.light,
            sky: &self.sky,
            cycle: self.cycle,
        };

        for stage in Stage::ORDER {
            self.schedule.begin(stage)?;
            match stage {
                Stage::Trace => self.backend.dispatch_trace(&params)?,
                Stage::Update => self.backend.dispatch_update(&params)?,
                Stage::Apply => self.backend.publish_fields(&params)?,
            }
            self.schedule.complete(stage);
        }

        Ok(CycleReport {
            cycle: self.cycle,
            rotation,
            resize,
        })
    }

    /// Release backend resources, published fields included. The next
    /// cycle recreates them.
    pub fn release(&mut self) {
        self.backend.release();
        self.schedule.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::scene::{AccelerationStructure, BoxScene, SceneBox};
    use glam::{UVec3, Vec3};
    use irradia_core::math::encode_irradiance;
    use irradia_core::GridLayout;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Build,
        Trace(Quat),
        Update(Quat),
        Publish(u64),
    }

    #[derive(Default)]
    struct FakePool {
        layout: Option<GridLayout>,
    }

    impl ResourcePool for FakePool {
        fn resize_if_needed(&mut self, layout: &GridLayout) -> ResizeOutcome {
            let outcome = match self.layout {
                Some(current) if current == *layout => ResizeOutcome::Unchanged,
                Some(_) => ResizeOutcome::Recreated,
                None => ResizeOutcome::Created,
            };
            self.layout = Some(*layout);
            outcome
        }

        fn release(&mut self) {
            self.layout = None;
        }

        fn is_ready(&self) -> bool {
            self.layout.is_some()
        }

        fn layout(&self) -> Option<&GridLayout> {
            self.layout.as_ref()
        }
    }

    #[derive(Default)]
    struct RecordingBackend {
        pool: FakePool,
        calls: Vec<Call>,
        fail_update: bool,
    }

    impl ProbeBackend for RecordingBackend {
        type Pool = FakePool;

        fn pool(&self) -> &FakePool {
            &self.pool
        }

        fn pool_mut(&mut self) -> &mut FakePool {
            &mut self.pool
        }

        fn build_acceleration_structure(&mut self) -> Result<(), GiError> {
            self.calls.push(Call::Build);
            Ok(())
        }

        fn dispatch_trace(&mut self, params: &CycleParams<'_>) -> Result<(), GiError> {
            assert_eq!(self.pool.layout, Some(params.desc.layout()));
            self.calls.push(Call::Trace(params.rotation));
            Ok(())
        }

        fn dispatch_update(&mut self, params: &CycleParams<'_>) -> Result<(), GiError> {
            if self.fail_update {
                return Err(GiError::Backend("device lost".into()));
            }
            self.calls.push(Call::Update(params.rotation));
            Ok(())
        }

        fn publish_fields(&mut self, params: &CycleParams<'_>) -> Result<(), GiError> {
            self.calls.push(Call::Publish(params.cycle));
            Ok(())
        }
    }

    fn config(seed: u64) -> VolumeConfig {
        VolumeConfig {
            volume: VolumeDesc {
                probe_counts: UVec3::new(2, 1, 2),
                probe_num_rays: 8,
                ..VolumeDesc::default()
            },
            rotation_seed: Some(seed),
            ..VolumeConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config(1);
        config.volume.probe_num_rays = 0;
        let result = ProbeVolume::new(config, RecordingBackend::default());
        assert!(matches!(result, Err(GiError::Config(_))));
    }

    #[test]
    fn test_stages_run_in_order_with_one_rotation() {
        let mut volume = ProbeVolume::new(config(3), RecordingBackend::default()).expect("valid");
        let first = volume.update().expect("cycle");
        let second = volume.update().expect("cycle");
        assert_eq!(first.resize, ResizeOutcome::Created);
        assert_eq!(second.resize, ResizeOutcome::Unchanged);
        assert_ne!(first.rotation, second.rotation);

        let calls = &volume.backend().calls;
        assert_eq!(
            calls[..4],
            [
                Call::Build,
                Call::Trace(first.rotation),
                Call::Update(first.rotation),
                Call::Publish(0),
            ]
        );
        assert_eq!(calls[7], Call::Publish(1));
        assert_eq!(volume.cycle(), 2);
    }

    #[test]
    fn test_same_seed_same_rotations() {
        let mut a = ProbeVolume::new(config(11), RecordingBackend::default()).expect("valid");
        let mut b = ProbeVolume::new(config(11), RecordingBackend::default()).expect("valid");
        for _ in 0..3 {
            assert_eq!(a.update().expect("cycle").rotation, b.update().expect("cycle").rotation);
        }
    }

    #[test]
    fn test_failed_stage_skips_cycle() {
        let backend = RecordingBackend {
            fail_update: true,
            ..RecordingBackend::default()
        };
        let mut volume = ProbeVolume::new(config(5), backend).expect("valid");
        assert_eq!(volume.update(), Err(GiError::Backend("device lost".into())));
        assert_eq!(volume.cycle(), 0);
        assert_eq!(volume.skipped_cycles(), 1);
        assert!(!volume.backend().calls.iter().any(|c| matches!(c, Call::Publish(_))));

        // Recovers once the backend does.
        volume.backend_mut().fail_update = false;
        let report = volume.update().expect("cycle");
        assert_eq!(report.cycle, 0);
        assert_eq!(volume.cycle(), 1);
    }

    #[test]
    fn test_desc_change_recreates_resources() {
        let mut volume = ProbeVolume::new(config(2), RecordingBackend::default()).expect("valid");
        volume.update().expect("cycle");
        let mut desc = volume.desc().clone();
        desc.probe_counts = UVec3::new(3, 1, 3);
        volume.set_desc(desc).expect("valid");
        assert_eq!(volume.update().expect("cycle").resize, ResizeOutcome::Recreated);

        let mut bad = volume.desc().clone();
        bad.probe_hysteresis = 2.0;
        assert!(volume.set_desc(bad).is_err());
        assert_eq!(volume.desc().probe_counts, UVec3::new(3, 1, 3));
    }

    #[test]
    fn test_all_miss_grid_matches_encoded_sky() {
        let sky_color = Vec3::new(0.6, 0.8, 1.0);
        let config = VolumeConfig {
            volume: VolumeDesc {
                origin: Vec3::ZERO,
                probe_spacing: Vec3::splat(10.0),
                probe_counts: UVec3::new(2, 1, 2),
                probe_num_rays: 1,
                probe_hysteresis: 0.0,
                ..VolumeDesc::default()
            },
            light: DirectionalLight::off(),
            sky: irradia_core::SkyModel::uniform(sky_color),
            rotation_seed: Some(42),
        };
        let desc = config.volume.clone();
        let mut volume =
            ProbeVolume::new(config, CpuBackend::new(BoxScene::new())).expect("valid");
        volume.update().expect("cycle");

        let published = volume.backend().published().expect("published");
        let encoded = encode_irradiance(sky_color, desc.probe_irradiance_encoding_gamma);
        for texel in published.irradiance.texels() {
            assert!((texel.truncate() - encoded).abs().max_element() < 1e-5, "{texel}");
        }
        for texel in published.distance.texels() {
            assert!((texel.x - desc.probe_max_ray_distance).abs() < 1e-3, "{texel}");
        }
    }

    #[test]
    fn test_release_drops_published_fields() {
        let mut volume =
            ProbeVolume::new(config(9), CpuBackend::new(BoxScene::new())).expect("valid");
        volume.update().expect("cycle");
        assert!(volume.backend().sampler(volume.desc()).is_ok());

        volume.release();
        assert!(!volume.backend().pool().is_ready());
        assert!(volume.backend().published().is_none());
        assert!(volume.backend().sampler(volume.desc()).is_err());

        let report = volume.update().expect("cycle");
        assert_eq!(report.resize, ResizeOutcome::Created);
        assert!(volume.backend().published().is_some());
    }

    #[test]
    fn test_scene_edits_are_rebuilt_before_tracing() {
        let mut volume =
            ProbeVolume::new(config(8), CpuBackend::new(BoxScene::new())).expect("valid");
        volume.update().expect("cycle");
        volume
            .backend_mut()
            .scene_mut()
            .add_box(SceneBox::new(Vec3::splat(-50.0), Vec3::new(50.0, -5.0, 50.0), Vec3::ONE));
        volume.update().expect("cycle");
        assert!(volume.backend().scene().is_built());

        let sampler = volume.backend().sampler(volume.desc()).expect("published");
        let irradiance = sampler.sample(&crate::sampler::ShadingPoint {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            view_dir: Vec3::NEG_Y,
        });
        assert!(irradiance.is_finite());
    }
}
