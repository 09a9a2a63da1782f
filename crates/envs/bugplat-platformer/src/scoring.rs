use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::{EnvConfig, RewardConfig};
use crate::physics::{GROUND_EPSILON, JumpState, PlayerState, is_grounded};

/// Trailing window of x positions for the stagnation penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionHistory {
    capacity: usize,
    xs: VecDeque<f32>,
}

impl PositionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            xs: VecDeque::with_capacity(capacity),
        }
    }

    /// Append `x`, evicting the oldest entry once full.
    pub fn push(&mut self, x: f32) {
        if self.xs.len() == self.capacity {
            self.xs.pop_front();
        }
        self.xs.push_back(x);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.xs.len() == self.capacity
    }

    /// `max - min` over the window, or 0 when empty.
    pub fn span(&self) -> f32 {
        let mut iter = self.xs.iter().copied();
        let Some(first) = iter.next() else {
            return 0.0;
        };
        let (min, max) = iter.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
        max - min
    }
}

/// What happened during one step, as seen by the reward function.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    /// State at the start of the step.
    pub before: PlayerState,
    /// State after collision resolution.
    pub after: PlayerState,
    pub jump_held: bool,
    /// Step count including this step.
    pub step_count: u32,
    pub reached_goal: bool,
}

/// Per-term reward for a single step. Penalties are negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub jump_held: f32,
    pub progress: f32,
    pub ascent: f32,
    pub step: f32,
    pub idle: f32,
    pub landing: f32,
    pub stagnation: f32,
    pub goal: f32,
}

impl RewardBreakdown {
    /// Sum of all terms, accumulated in a fixed order.
    pub fn total(&self) -> f32 {
        let mut reward = 0.0f32;
        reward += self.jump_held;
        reward += self.progress;
        reward += self.ascent;
        reward += self.step;
        reward += self.idle;
        reward += self.landing;
        reward += self.stagnation;
        reward += self.goal;
        reward
    }
}

/// Score one step.
///
/// Clears `jump.is_jumping` when a landing is scored and records the new x
/// in `history` when the stagnation term is enabled.
pub fn shape_reward(
    t: &Transition,
    jump: &mut JumpState,
    history: Option<&mut PositionHistory>,
    config: &EnvConfig,
) -> RewardBreakdown {
    let w = &config.reward;
    let level = &config.level;
    let mut r = RewardBreakdown::default();

    if t.jump_held {
        r.jump_held = -w.jump_held_penalty;
    }

    let dist_before = (level.flag_x - t.before.x).abs();
    let dist_after = (level.flag_x - t.after.x).abs();
    r.progress = (dist_before - dist_after) / w.progress_divisor;

    let climbed = t.after.y - t.before.y;
    if climbed > 0.0 {
        r.ascent = climbed / w.ascent_divisor;
    }

    r.step = -w.step_penalty;

    if t.after.vx.abs() < GROUND_EPSILON && (w.idle_while_airborne || !jump.is_jumping) {
        r.idle = -w.idle_penalty;
    }

    if jump.is_jumping
        && t.after.vy.abs() < GROUND_EPSILON
        && is_grounded(t.after.x, t.after.y, level, &config.player)
    {
        r.landing = landing_reward(t.after.y - jump.y_before_jump, w);
        jump.is_jumping = false;
    }

    if let (Some(stag), Some(history)) = (&w.stagnation, history) {
        history.push(t.after.x);
        if history.is_full() && history.span() < stag.threshold {
            r.stagnation = -stag.penalty;
        }
    }

    if t.reached_goal {
        let remaining = config.max_steps.saturating_sub(t.step_count) as f32;
        r.goal = w.goal_bonus + w.speed_factor * remaining;
    }

    r
}

/// Landing outcome by height gained since takeoff. Dropping more than the
/// band is free, staying level is penalized, climbing earns a bonus.
fn landing_reward(height_gained: f32, w: &RewardConfig) -> f32 {
    if height_gained < -w.landing_band {
        0.0
    } else if height_gained < w.landing_band {
        -w.landing_penalty
    } else {
        w.landing_bonus
    }
}
