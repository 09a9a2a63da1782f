use bugplat_core::BoxSpace;

use crate::config::EnvConfig;
use crate::physics::{JumpState, PlayerState, is_grounded};

pub const OBS_DIM: usize = 8;

/// `[x, y, vx, vy, cooldown_frac, dx_to_flag, dx_to_wall, grounded]`
pub type Observation = [f32; OBS_DIM];

const COOLDOWN_SLOT: usize = 4;
const GROUNDED_SLOT: usize = 7;

/// Build the observation for the current state.
pub fn encode_observation(
    player: &PlayerState,
    jump: &JumpState,
    config: &EnvConfig,
) -> Observation {
    let level = &config.level;
    let cooldown_frac = jump.cooldown as f32 / config.jump.cooldown_max as f32;
    let grounded = is_grounded(player.x, player.y, level, &config.player);
    [
        player.x,
        player.y,
        player.vx,
        player.vy,
        cooldown_frac,
        level.flag_x - player.x,
        level.wall.x - player.x,
        if grounded { 1.0 } else { 0.0 },
    ]
}

/// Unbounded except the cooldown fraction and grounded flag, both in `[0, 1]`.
pub fn observation_space() -> BoxSpace {
    let mut low = vec![f32::NEG_INFINITY; OBS_DIM];
    let mut high = vec![f32::INFINITY; OBS_DIM];
    for slot in [COOLDOWN_SLOT, GROUNDED_SLOT] {
        low[slot] = 0.0;
        high[slot] = 1.0;
    }
    BoxSpace { low, high }
}
