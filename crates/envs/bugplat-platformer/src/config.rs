use serde::{Deserialize, Serialize};

use bugplat_core::EnvError;

use crate::level::{LevelGeometry, LevelPreset};
use crate::physics::PlayerBody;

/// Simulation timestep (seconds per step).
pub const DT: f32 = 0.02;
/// Gravity acceleration (units/s^2, downward).
pub const GRAVITY: f32 = -30.0;
/// Horizontal move speed.
pub const MOVE_SPEED: f32 = 4.0;
/// Jump initial velocity.
pub const JUMP_SPEED: f32 = 12.0;
/// Step limit before truncation.
pub const MAX_STEPS: u32 = 1000;
/// Player box is square.
pub const PLAYER_SIZE: f32 = 0.6;
/// Half-extent of the goal region around the flag, on each axis.
pub const GOAL_RADIUS: f32 = 0.5;

/// Integration constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    pub dt: f32,
    pub gravity: f32,
    pub move_speed: f32,
    pub jump_speed: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            dt: DT,
            gravity: GRAVITY,
            move_speed: MOVE_SPEED,
            jump_speed: JUMP_SPEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpConfig {
    /// Steps a jump locks out further jumps for.
    pub cooldown_max: u32,
}

/// Trailing-window penalty for lack of horizontal progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagnationConfig {
    /// Number of x-positions kept.
    pub window: usize,
    /// Minimum x spread over a full window before the penalty applies.
    pub threshold: f32,
    pub penalty: f32,
}

/// Reward shaping weights. Penalties are stored as positive magnitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Progress toward the flag is divided by this.
    pub progress_divisor: f32,
    /// Height gained in a step is divided by this.
    pub ascent_divisor: f32,
    pub step_penalty: f32,
    /// Charged every step the jump button is held.
    pub jump_held_penalty: f32,
    pub idle_penalty: f32,
    /// When false the idle penalty is skipped while a jump is in flight.
    pub idle_while_airborne: bool,
    /// Landings with `|height_gained|` inside this band are penalized.
    pub landing_band: f32,
    pub landing_penalty: f32,
    pub landing_bonus: f32,
    pub goal_bonus: f32,
    /// Weight of the remaining-steps bonus on reaching the flag.
    pub speed_factor: f32,
    pub stagnation: Option<StagnationConfig>,
}

/// Full per-instance configuration. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    pub preset: LevelPreset,
    pub max_steps: u32,
    pub goal_radius: f32,
    pub physics: PhysicsConfig,
    pub player: PlayerBody,
    pub jump: JumpConfig,
    pub reward: RewardConfig,
    pub level: LevelGeometry,
}

impl LevelPreset {
    /// Complete configuration for this preset.
    pub fn config(&self) -> EnvConfig {
        let player = match self {
            LevelPreset::V0 => PlayerBody::full_height(PLAYER_SIZE, PLAYER_SIZE),
            LevelPreset::V1 => PlayerBody::foot_band(PLAYER_SIZE, PLAYER_SIZE),
        };
        let (cooldown_max, reward) = match self {
            LevelPreset::V0 => (
                60,
                RewardConfig {
                    ascent_divisor: 5.0,
                    jump_held_penalty: 0.02,
                    idle_while_airborne: false,
                    landing_penalty: 1.0,
                    stagnation: None,
                    ..RewardConfig::base()
                },
            ),
            LevelPreset::V1 => (
                40,
                RewardConfig {
                    ascent_divisor: 10.0,
                    jump_held_penalty: 0.01,
                    idle_while_airborne: true,
                    landing_penalty: 0.4,
                    stagnation: Some(StagnationConfig {
                        window: 100,
                        threshold: 2.0,
                        penalty: 0.03,
                    }),
                    ..RewardConfig::base()
                },
            ),
        };

        EnvConfig {
            preset: *self,
            max_steps: MAX_STEPS,
            goal_radius: GOAL_RADIUS,
            physics: PhysicsConfig::default(),
            level: self.geometry(&player),
            player,
            jump: JumpConfig { cooldown_max },
            reward,
        }
    }
}

impl RewardConfig {
    /// Weights both presets share; preset-specific fields are overridden.
    fn base() -> Self {
        Self {
            progress_divisor: 5.0,
            ascent_divisor: 5.0,
            step_penalty: 0.01,
            jump_held_penalty: 0.02,
            idle_penalty: 0.05,
            idle_while_airborne: false,
            landing_band: 0.2,
            landing_penalty: 1.0,
            landing_bonus: 0.2,
            goal_bonus: 10.0,
            speed_factor: 0.1,
            stagnation: None,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        LevelPreset::default().config()
    }
}

impl EnvConfig {
    /// Load a full config from the TOML file named by `BUGPLAT_ENV_CONFIG`
    /// (default `config/bugplat.toml`). Falls back to `preset` if the file is
    /// missing or unparseable.
    pub fn load(preset: LevelPreset) -> Self {
        let path = std::env::var("BUGPLAT_ENV_CONFIG")
            .unwrap_or_else(|_| "config/bugplat.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<EnvConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(preset = %cfg.preset, "Loaded environment config from {path}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using {preset} defaults");
                    preset.config()
                },
            },
            Err(_) => preset.config(),
        }
    }

    /// Check the invariants the simulation relies on.
    pub fn validate(&self) -> Result<(), EnvError> {
        let fail = |msg: String| Err(EnvError::InvalidConfig(msg));

        if !positive(self.physics.dt) {
            return fail(format!("physics.dt must be > 0, got {}", self.physics.dt));
        }
        if self.max_steps == 0 {
            return fail("max_steps must be > 0".to_string());
        }
        if self.jump.cooldown_max == 0 {
            return fail("jump.cooldown_max must be > 0".to_string());
        }
        if !(positive(self.player.width) && positive(self.player.height)) {
            return fail("player width and height must be > 0".to_string());
        }
        if !positive(self.player.hitbox_height) || self.player.hitbox_height > self.player.height {
            return fail(format!(
                "player.hitbox_height must be in (0, {}], got {}",
                self.player.height, self.player.hitbox_height
            ));
        }
        let wall = &self.level.wall;
        if !(positive(wall.width) && positive(wall.height)) {
            return fail("wall width and height must be > 0".to_string());
        }
        if !(wall.gap_min < wall.gap_max && wall.gap_max <= wall.height) {
            return fail(format!(
                "wall gap must satisfy gap_min < gap_max <= height, got [{}, {}] with height {}",
                wall.gap_min, wall.gap_max, wall.height
            ));
        }
        for (i, p) in self.level.platforms.iter().enumerate() {
            if p.x_left >= p.x_right {
                return fail(format!("platform {i} has x_left >= x_right"));
            }
        }
        if self.reward.progress_divisor == 0.0 || self.reward.ascent_divisor == 0.0 {
            return fail("reward divisors must be non-zero".to_string());
        }
        if let Some(stag) = &self.reward.stagnation
            && stag.window == 0
        {
            return fail("reward.stagnation.window must be > 0".to_string());
        }
        Ok(())
    }
}

fn positive(v: f32) -> bool {
    v > 0.0
}
