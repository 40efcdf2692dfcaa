use std::path::PathBuf;
use std::process;

use irradia_bench::report;
use irradia_bench::runner::{BackendKind, BenchmarkRunner};
use irradia_bench::scenes;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut baseline_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut regression_threshold = 10.0f64;
    let mut cycle_count = 60u32;
    let mut backend = BackendKind::Cpu;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--baseline" => {
                i += 1;
                baseline_path = Some(PathBuf::from(arg_value(&args, i)));
            }
            "--output" => {
                i += 1;
                output_path = Some(PathBuf::from(arg_value(&args, i)));
            }
            "--regression-threshold" => {
                i += 1;
                regression_threshold = arg_value(&args, i)
                    .parse()
                    .expect("invalid --regression-threshold value");
            }
            "--cycles" => {
                i += 1;
                cycle_count = arg_value(&args, i).parse().expect("invalid --cycles value");
            }
            "--backend" => {
                i += 1;
                backend = BackendKind::parse(arg_value(&args, i)).expect("--backend must be cpu or gpu");
            }
            "--help" | "-h" => {
                eprintln!("Usage: bench-runner [OPTIONS]");
                eprintln!("  --baseline <path>              Load baseline JSON for comparison");
                eprintln!("  --output <path>                Save current results as JSON baseline");
                eprintln!(
                    "  --regression-threshold <pct>   Allowed drop in rays/s vs baseline (default: 10)"
                );
                eprintln!("  --cycles <n>                   Update cycles per scene (default: 60)");
                eprintln!("  --backend <cpu|gpu>            Probe backend (default: cpu)");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let runner = BenchmarkRunner::new(backend, cycle_count);

    let mut results = Vec::new();
    for config in &scenes::standard_scenes() {
        match runner.run_scene(config) {
            Ok(result) => results.push(result),
            Err(e) => {
                log::error!("Scene '{}' failed: {e}", config.name);
                process::exit(1);
            }
        }
    }

    println!("\n## Probe Update Benchmark\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let baseline = report::Baseline {
            timestamp: format!("bench-{}", process::id()),
            results: results.clone(),
        };
        report::save_baseline(path, &baseline).expect("failed to save baseline");
        log::info!("Saved baseline to {}", path.display());
    }

    if let Some(ref path) = baseline_path {
        if let Some(baseline) = report::load_baseline(path) {
            let regressions = report::compare(&results, &baseline, regression_threshold);
            println!(
                "{}",
                report::format_comparison(&regressions, regression_threshold)
            );
            if !regressions.is_empty() {
                eprintln!(
                    "ERROR: {} regressions detected, exiting with code 1",
                    regressions.len()
                );
                process::exit(1);
            }
        } else {
            log::warn!("Baseline file not found: {}", path.display());
        }
    }

    log::info!("Benchmark complete.");
}

/// The value following a flag, or exit if the flag ended the line.
fn arg_value(args: &[String], i: usize) -> &str {
    match args.get(i) {
        Some(v) => v,
        None => {
            eprintln!("Missing value for {}", args[i - 1]);
            process::exit(1);
        }
    }
}
