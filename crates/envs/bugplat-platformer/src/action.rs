use serde::{Deserialize, Serialize};

use bugplat_core::{EnvError, MultiDiscrete};

use crate::config::EnvConfig;
use crate::physics::{JUMP_VY_THRESHOLD, JumpState, PlayerState, is_grounded};

/// Horizontal intent for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Movement {
    #[default]
    None,
    Left,
    Right,
}

impl Movement {
    pub fn direction(&self) -> f32 {
        match self {
            Movement::None => 0.0,
            Movement::Left => -1.0,
            Movement::Right => 1.0,
        }
    }
}

/// One decoded agent action: movement plus the jump button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub movement: Movement,
    pub jump: bool,
}

impl Action {
    /// The raw action space: `[movement in 0..3, jump in 0..2]`.
    pub fn space() -> MultiDiscrete {
        MultiDiscrete::new(vec![3, 2])
    }

    /// Decode a raw `[movement, jump]` pair.
    pub fn decode(raw: &[i64]) -> Result<Action, EnvError> {
        Self::space().check(raw)?;
        let movement = match raw[0] {
            1 => Movement::Left,
            2 => Movement::Right,
            _ => Movement::None,
        };
        Ok(Action {
            movement,
            jump: raw[1] == 1,
        })
    }
}

/// Apply an action's velocity changes and jump trigger.
///
/// Horizontal velocity is overwritten every step. A jump fires only on the
/// rising edge of the button, while not moving upward, with the cooldown
/// expired, and while grounded. Returns whether a jump fired.
pub fn apply_action(
    action: Action,
    player: &mut PlayerState,
    jump: &mut JumpState,
    config: &EnvConfig,
) -> bool {
    let rising_edge = action.jump && !jump.prev_jump_pressed;
    player.vx = action.movement.direction() * config.physics.move_speed;

    let triggered = rising_edge
        && player.vy < JUMP_VY_THRESHOLD
        && jump.cooldown == 0
        && is_grounded(player.x, player.y, &config.level, &config.player);
    if triggered {
        jump.y_before_jump = player.y;
        jump.is_jumping = true;
        jump.cooldown = config.jump.cooldown_max;
        player.vy = config.physics.jump_speed;
    }

    jump.prev_jump_pressed = action.jump;
    triggered
}
