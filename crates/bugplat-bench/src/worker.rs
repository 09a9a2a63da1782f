use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bugplat_core::EnvError;
use bugplat_platformer::config::EnvConfig;
use bugplat_platformer::vec_env::VecEnv;

use crate::config::BenchConfig;

/// What one worker thread did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerReport {
    pub worker: usize,
    pub steps: u64,
    pub terminations: u64,
    pub truncations: u64,
    pub elapsed: Duration,
}

/// Drive `envs_per_worker` environments with a uniformly random policy.
///
/// Worker `w` resets its batch from seed `seed + w * envs_per_worker` and
/// seeds its policy RNG with `seed + w`, so a run is reproducible for a
/// fixed config.
pub fn run_worker(
    worker: usize,
    bench: &BenchConfig,
    env_config: EnvConfig,
) -> Result<WorkerReport, EnvError> {
    let mut venv = VecEnv::new(bench.envs_per_worker, env_config)?;
    let base_seed = bench
        .seed
        .wrapping_add((worker as u64).wrapping_mul(bench.envs_per_worker as u64));
    venv.reset_all(Some(base_seed));

    let mut rng = StdRng::seed_from_u64(bench.seed.wrapping_add(worker as u64));
    let mut actions = vec![[0i64; 2]; venv.num_envs()];
    let mut report = WorkerReport {
        worker,
        ..Default::default()
    };

    let start = Instant::now();
    for _ in 0..bench.steps_per_env {
        for action in actions.iter_mut() {
            *action = [rng.random_range(0..3), rng.random_range(0..2)];
        }
        for step in venv.step(&actions)? {
            report.steps += 1;
            if step.terminated {
                report.terminations += 1;
            }
            if step.truncated {
                report.truncations += 1;
            }
        }
    }
    report.elapsed = start.elapsed();
    venv.close();

    tracing::debug!(
        worker,
        steps = report.steps,
        terminations = report.terminations,
        truncations = report.truncations,
        "worker finished in {:?}",
        report.elapsed
    );
    Ok(report)
}

/// Sum of all worker reports.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BenchTotals {
    pub steps: u64,
    pub terminations: u64,
    pub truncations: u64,
}

impl BenchTotals {
    pub fn absorb(&mut self, report: &WorkerReport) {
        self.steps += report.steps;
        self.terminations += report.terminations;
        self.truncations += report.truncations;
    }

    pub fn steps_per_sec(&self, wall: Duration) -> f64 {
        let secs = wall.as_secs_f64();
        if secs > 0.0 {
            self.steps as f64 / secs
        } else {
            0.0
        }
    }
}
