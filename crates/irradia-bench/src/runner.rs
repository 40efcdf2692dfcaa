use std::time::Instant;

use irradia_gi::{CpuBackend, GiError, ProbeBackend, ProbeVolume};
use irradia_gpu::WgpuBackend;

use crate::scenes::{self, SceneConfig};

/// Timing data for a single benchmark run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub backend: String,
    pub probe_count: u32,
    pub rays_per_cycle: u64,
    pub box_count: u32,
    pub cycle_count: u32,
    pub timings: TimingSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Cpu,
    Gpu,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Cpu => "cpu",
            BackendKind::Gpu => "gpu",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cpu" => Some(BackendKind::Cpu),
            "gpu" => Some(BackendKind::Gpu),
            _ => None,
        }
    }
}

/// Runs full probe update cycles and times each one.
pub struct BenchmarkRunner {
    backend: BackendKind,
    cycle_count: u32,
}

impl BenchmarkRunner {
    pub fn new(backend: BackendKind, cycle_count: u32) -> Self {
        Self {
            backend,
            cycle_count,
        }
    }

    /// Run a single benchmark scene and return timing results.
    pub fn run_scene(&self, config: &SceneConfig) -> Result<BenchmarkResult, GiError> {
        let volume_config = scenes::volume_config(config);
        let desc = volume_config.volume.clone();
        let scene = scenes::build_scene(config);
        let box_count = scene.boxes().len() as u32;
        log::info!(
            "Running scene '{}' on {} ({} probes, {} boxes)...",
            config.name,
            self.backend.name(),
            desc.probe_count(),
            box_count
        );

        let frame_times = match self.backend {
            BackendKind::Cpu => {
                let mut volume = ProbeVolume::new(volume_config, CpuBackend::new(scene))?;
                time_cycles(&mut volume, self.cycle_count, |_| {})?
            }
            BackendKind::Gpu => {
                let backend = WgpuBackend::with_default_device(scene)?;
                let mut volume = ProbeVolume::new(volume_config, backend)?;
                time_cycles(&mut volume, self.cycle_count, |backend| {
                    backend.device().poll(wgpu::Maintain::Wait);
                })?
            }
        };

        let timings = compute_timings(&frame_times);
        log::info!(
            "  Done: mean={:.2}ms, p95={:.2}ms, p99={:.2}ms",
            timings.mean_ms,
            timings.p95_ms,
            timings.p99_ms
        );

        Ok(BenchmarkResult {
            scene_name: config.name.to_string(),
            backend: self.backend.name().to_string(),
            probe_count: desc.probe_count(),
            rays_per_cycle: desc.probe_count() as u64 * desc.probe_num_rays as u64,
            box_count,
            cycle_count: self.cycle_count,
            timings,
        })
    }
}

/// Time `cycles` updates. `sync` blocks until the backend's work is done so
/// asynchronous backends are measured end to end.
fn time_cycles<B: ProbeBackend>(
    volume: &mut ProbeVolume<B>,
    cycles: u32,
    sync: impl Fn(&B),
) -> Result<Vec<f64>, GiError> {
    // First cycle allocates resources and builds the BVH.
    volume.update()?;
    sync(volume.backend());

    let mut frame_times = Vec::with_capacity(cycles as usize);
    for _ in 0..cycles {
        let frame_start = Instant::now();
        volume.update()?;
        sync(volume.backend());
        frame_times.push(frame_start.elapsed().as_secs_f64() * 1000.0);
    }
    if volume.skipped_cycles() > 0 {
        log::warn!("  {} cycles were skipped", volume.skipped_cycles());
    }
    Ok(frame_times)
}

/// Compute timing statistics from a list of frame times in milliseconds.
pub fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let p95_idx = ((n as f64) * 0.95).ceil() as usize;
    let p99_idx = ((n as f64) * 0.99).ceil() as usize;

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: sorted[p95_idx.min(n - 1)],
        p99_ms: sorted[p99_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_timings_empty() {
        let t = compute_timings(&[]);
        assert_eq!(t.mean_ms, 0.0);
        assert_eq!(t.max_ms, 0.0);
    }

    #[test]
    fn test_compute_timings_statistics() {
        let times: Vec<f64> = (1..=100).rev().map(f64::from).collect();
        let t = compute_timings(&times);
        assert!((t.mean_ms - 50.5).abs() < 1e-9);
        assert!((t.median_ms - 50.5).abs() < 1e-9);
        assert_eq!(t.min_ms, 1.0);
        assert_eq!(t.max_ms, 100.0);
        assert!(t.p95_ms >= 95.0 && t.p95_ms <= 96.0);
        assert!(t.p99_ms >= 99.0 && t.p99_ms <= 100.0);
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(BackendKind::parse("cpu"), Some(BackendKind::Cpu));
        assert_eq!(BackendKind::parse("gpu"), Some(BackendKind::Gpu));
        assert_eq!(BackendKind::parse("vulkan"), None);
    }

    #[test]
    fn test_cpu_run_reports_every_cycle() {
        let config = SceneConfig {
            name: "tiny",
            probe_counts: glam::UVec3::new(2, 2, 2),
            probe_num_rays: 16,
            pillars_per_side: 1,
        };
        let result = BenchmarkRunner::new(BackendKind::Cpu, 3)
            .run_scene(&config)
            .expect("bench run");
        assert_eq!(result.cycle_count, 3);
        assert_eq!(result.probe_count, 8);
        assert_eq!(result.rays_per_cycle, 128);
        assert_eq!(result.box_count, 8);
        assert!(result.timings.min_ms <= result.timings.max_ms);
    }
}
