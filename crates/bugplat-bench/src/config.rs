use serde::{Deserialize, Serialize};

use bugplat_platformer::level::LevelPreset;

/// Benchmark run parameters, loaded from `bugplat-bench.toml` with
/// `BUGPLAT_BENCH_*` environment overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub preset: LevelPreset,
    /// OS threads, each owning its own batch of environments.
    pub workers: usize,
    pub envs_per_worker: usize,
    /// Steps taken by every environment.
    pub steps_per_env: u64,
    /// Base seed for environment resets and the random policy.
    pub seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            preset: LevelPreset::V0,
            workers: 4,
            envs_per_worker: 8,
            steps_per_env: 10_000,
            seed: 0,
        }
    }
}

impl BenchConfig {
    /// Load from `bugplat-bench.toml`, falling back to defaults, then apply
    /// environment variable overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("bugplat-bench.toml") {
            Ok(content) => match toml::from_str::<BenchConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from bugplat-bench.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse bugplat-bench.toml: {e}, using defaults");
                    BenchConfig::default()
                },
            },
            Err(_) => {
                tracing::debug!("No bugplat-bench.toml found, using defaults");
                BenchConfig::default()
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `BUGPLAT_BENCH_*` overrides read through `var`. Unparseable
    /// values are ignored.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("BUGPLAT_BENCH_WORKERS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.workers = n;
        }
        if let Some(val) = var("BUGPLAT_BENCH_ENVS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.envs_per_worker = n;
        }
        if let Some(val) = var("BUGPLAT_BENCH_STEPS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.steps_per_env = n;
        }
        if let Some(val) = var("BUGPLAT_BENCH_SEED")
            && let Ok(n) = val.parse::<u64>()
        {
            self.seed = n;
        }
        if let Some(val) = var("BUGPLAT_BENCH_PRESET") {
            match val.parse::<LevelPreset>() {
                Ok(preset) => self.preset = preset,
                Err(e) => tracing::warn!("Ignoring BUGPLAT_BENCH_PRESET: {e}"),
            }
        }
    }

    /// First problem with this config, if any.
    pub fn check(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be > 0".to_string());
        }
        if self.envs_per_worker == 0 {
            return Err("envs_per_worker must be > 0".to_string());
        }
        if self.steps_per_env == 0 {
            return Err("steps_per_env must be > 0".to_string());
        }
        let total_steps = self
            .workers
            .checked_mul(self.envs_per_worker)
            .and_then(|envs| u64::try_from(envs).ok())
            .and_then(|envs| envs.checked_mul(self.steps_per_env));
        if total_steps.is_none() {
            return Err(format!(
                "{} workers x {} envs x {} steps overflows",
                self.workers, self.envs_per_worker, self.steps_per_env
            ));
        }
        Ok(())
    }

    /// Exit the process if the config is unusable.
    pub fn validate(&self) {
        if let Err(msg) = self.check() {
            tracing::error!(config = ?self, "Invalid bench config: {msg}");
            std::process::exit(1);
        }
    }

    pub fn total_envs(&self) -> usize {
        self.workers.saturating_mul(self.envs_per_worker)
    }
}
