use std::thread;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use bugplat_bench::config::BenchConfig;
use bugplat_bench::worker::{BenchTotals, run_worker};
use bugplat_platformer::config::EnvConfig;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = BenchConfig::load();
    config.validate();

    let env_config = EnvConfig::load(config.preset);
    if let Err(e) = env_config.validate() {
        tracing::error!("Invalid environment config: {e}");
        std::process::exit(1);
    }

    tracing::info!(
        preset = %env_config.preset,
        workers = config.workers,
        envs = config.total_envs(),
        steps_per_env = config.steps_per_env,
        seed = config.seed,
        "Bug Platformer bench starting"
    );

    let start = Instant::now();
    let mut handles = Vec::with_capacity(config.workers);
    for worker in 0..config.workers {
        let bench = config.clone();
        let env_cfg = env_config.clone();
        let spawned = thread::Builder::new()
            .name(format!("bench-worker-{worker}"))
            .spawn(move || run_worker(worker, &bench, env_cfg));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                tracing::error!(worker, "Failed to spawn worker thread: {e}");
                std::process::exit(1);
            },
        }
    }

    let mut totals = BenchTotals::default();
    let mut failed = 0usize;
    for handle in handles {
        match handle.join() {
            Ok(Ok(report)) => totals.absorb(&report),
            Ok(Err(e)) => {
                tracing::error!("Worker failed: {e}");
                failed += 1;
            },
            Err(_) => {
                tracing::error!("Worker thread panicked");
                failed += 1;
            },
        }
    }
    let wall = start.elapsed();

    tracing::info!(
        steps = totals.steps,
        terminations = totals.terminations,
        truncations = totals.truncations,
        elapsed_ms = wall.as_millis() as u64,
        steps_per_sec = totals.steps_per_sec(wall).round(),
        "Bench complete"
    );

    if failed > 0 {
        std::process::exit(1);
    }
}
