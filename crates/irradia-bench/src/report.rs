use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete baseline containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// Load a baseline from a JSON file. Returns None if the file doesn't exist.
pub fn load_baseline(path: &Path) -> Option<Baseline> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

pub fn save_baseline(path: &Path, baseline: &Baseline) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(baseline).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Traced rays per second over a mean cycle, in millions.
pub fn mrays_per_second(result: &BenchmarkResult) -> Option<f64> {
    if result.timings.mean_ms <= 0.0 {
        return None;
    }
    Some(result.rays_per_cycle as f64 / (result.timings.mean_ms * 1e3))
}

/// Mean cost of one probe's trace and update, in microseconds.
pub fn us_per_probe(result: &BenchmarkResult) -> Option<f64> {
    if result.probe_count == 0 {
        return None;
    }
    Some(result.timings.mean_ms * 1e3 / result.probe_count as f64)
}

/// A scene whose ray throughput fell below its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub scene_name: String,
    pub backend: String,
    pub baseline_mrays: f64,
    pub current_mrays: f64,
}

impl Regression {
    /// Throughput lost relative to the baseline, in percent.
    pub fn drop_pct(&self) -> f64 {
        (self.baseline_mrays - self.current_mrays) / self.baseline_mrays * 100.0
    }
}

/// Compare ray throughput against a baseline. Scenes are matched on name and
/// backend. A baseline traced with a different grid or ray count measures a
/// different workload and is skipped.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<Regression> {
    let mut regressions = Vec::new();

    for result in current {
        let Some(base) = baseline
            .results
            .iter()
            .find(|b| b.scene_name == result.scene_name && b.backend == result.backend)
        else {
            continue;
        };
        if base.probe_count != result.probe_count || base.rays_per_cycle != result.rays_per_cycle {
            log::warn!(
                "Scene '{}' ({}): baseline traced {} rays over {} probes, now {} over {}; not compared",
                result.scene_name,
                result.backend,
                base.rays_per_cycle,
                base.probe_count,
                result.rays_per_cycle,
                result.probe_count
            );
            continue;
        }
        let (Some(baseline_mrays), Some(current_mrays)) =
            (mrays_per_second(base), mrays_per_second(result))
        else {
            continue;
        };
        let regression = Regression {
            scene_name: result.scene_name.clone(),
            backend: result.backend.clone(),
            baseline_mrays,
            current_mrays,
        };
        if regression.drop_pct() > threshold_pct {
            regressions.push(regression);
        }
    }

    regressions
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    }
}

/// Format results as a markdown summary table.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Backend | Probes | Rays/cycle | Boxes | Mrays/s | us/probe | Mean (ms) | Median (ms) | P95 (ms) | P99 (ms) | Max (ms) |\n");
    out.push_str("|-------|---------|--------|------------|-------|---------|----------|-----------|-------------|----------|----------|----------|\n");

    for r in results {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
            r.scene_name,
            r.backend,
            r.probe_count,
            r.rays_per_cycle,
            r.box_count,
            format_optional(mrays_per_second(r)),
            format_optional(us_per_probe(r)),
            r.timings.mean_ms,
            r.timings.median_ms,
            r.timings.p95_ms,
            r.timings.p99_ms,
            r.timings.max_ms,
        ));
    }

    out
}

pub fn format_comparison(regressions: &[Regression], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "Ray throughput within {:.0}% of baseline on every scene.\n",
            threshold_pct
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "THROUGHPUT REGRESSIONS (>{:.0}% fewer rays/s):\n",
        threshold_pct
    ));
    for r in regressions {
        out.push_str(&format!(
            "  - {} ({}): {:.2} -> {:.2} Mrays/s (-{:.1}%)\n",
            r.scene_name,
            r.backend,
            r.baseline_mrays,
            r.current_mrays,
            r.drop_pct()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::compute_timings;

    fn result(name: &str, backend: &str, mean: f64) -> BenchmarkResult {
        BenchmarkResult {
            scene_name: name.to_string(),
            backend: backend.to_string(),
            probe_count: 48,
            rays_per_cycle: 48 * 144,
            box_count: 7,
            cycle_count: 1,
            timings: compute_timings(&[mean]),
        }
    }

    #[test]
    fn test_throughput_from_mean_cycle() {
        let r = result("room", "cpu", 2.0);
        // 6912 rays in 2 ms.
        assert!((mrays_per_second(&r).expect("timed") - 3.456).abs() < 1e-9);
        assert!((us_per_probe(&r).expect("probes") - 2000.0 / 48.0).abs() < 1e-9);
        assert_eq!(mrays_per_second(&result("room", "cpu", 0.0)), None);
    }

    #[test]
    fn test_compare_flags_throughput_drops_per_backend() {
        let baseline = Baseline {
            timestamp: "t".into(),
            results: vec![result("room", "cpu", 10.0), result("room", "gpu", 1.0)],
        };
        let current = vec![result("room", "cpu", 10.5), result("room", "gpu", 2.0)];
        let regressions = compare(&current, &baseline, 10.0);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].scene_name, "room");
        assert_eq!(regressions[0].backend, "gpu");
        assert!((regressions[0].drop_pct() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_skips_changed_workload() {
        let mut base = result("pillars", "cpu", 1.0);
        base.rays_per_cycle = 48 * 64;
        let baseline = Baseline {
            timestamp: "t".into(),
            results: vec![base],
        };
        let current = vec![result("pillars", "cpu", 5.0)];
        assert!(compare(&current, &baseline, 10.0).is_empty());
    }

    #[test]
    fn test_baseline_round_trips_through_json() {
        let dir = std::env::temp_dir().join(format!("irradia-bench-{}", std::process::id()));
        let path = dir.join("baseline.json");
        let baseline = Baseline {
            timestamp: "bench-1".into(),
            results: vec![result("pillars", "cpu", 3.5)],
        };
        save_baseline(&path, &baseline).expect("save");
        let loaded = load_baseline(&path).expect("load");
        assert_eq!(loaded.results.len(), 1);
        assert_eq!(loaded.results[0].scene_name, "pillars");
        assert_eq!(loaded.results[0].rays_per_cycle, 48 * 144);
        assert_eq!(loaded.results[0].timings.mean_ms, 3.5);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_markdown_reports_throughput() {
        let table = format_markdown(&[result("a", "cpu", 1.0), result("b", "gpu", 0.0)]);
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("| a | cpu | 48 | 6912 | 7 | 6.91 | 20.83 |"));
        assert!(table.contains("| b | gpu | 48 | 6912 | 7 | - | 0.00 |"));
    }

    #[test]
    fn test_comparison_names_backend_and_rates() {
        let regression = Regression {
            scene_name: "room".into(),
            backend: "gpu".into(),
            baseline_mrays: 4.0,
            current_mrays: 3.0,
        };
        let text = format_comparison(&[regression], 10.0);
        assert!(text.contains("room (gpu): 4.00 -> 3.00 Mrays/s (-25.0%)"));
        assert!(format_comparison(&[], 10.0).contains("within 10%"));
    }
}
