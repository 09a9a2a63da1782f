use serde::{Deserialize, Serialize};

use crate::config::PhysicsConfig;
use crate::level::LevelGeometry;

/// Tolerance for "standing on a surface" checks.
pub const GROUND_EPSILON: f32 = 0.001;
/// A jump can only start while vertical velocity is below this.
pub const JUMP_VY_THRESHOLD: f32 = 0.001;
/// The v1 foot band is this fraction of the player's height.
const FOOT_BAND_DIVISOR: f32 = 6.0;

/// Player box dimensions. Position is the bottom-center of the box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerBody {
    pub width: f32,
    pub height: f32,
    /// Height of the slice (from the feet up) that collides with the wall.
    pub hitbox_height: f32,
}

impl PlayerBody {
    /// Whole body collides with the wall.
    pub fn full_height(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            hitbox_height: height,
        }
    }

    /// Only a thin band at the feet collides with the wall.
    pub fn foot_band(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            hitbox_height: height / FOOT_BAND_DIVISOR,
        }
    }

    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }
}

/// Kinematic state of the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl PlayerState {
    pub fn at_rest(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
        }
    }

    /// `[x, y, vx, vy]`, the layout external tooling reads.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x, self.y, self.vx, self.vy]
    }
}

/// Jump bookkeeping carried across steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JumpState {
    /// Set on takeoff, cleared when the landing outcome is scored.
    pub is_jumping: bool,
    /// Steps until another jump may start.
    pub cooldown: u32,
    /// Jump bit of the previous action, for edge detection.
    pub prev_jump_pressed: bool,
    pub y_before_jump: f32,
}

impl JumpState {
    pub fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }
}

/// Apply gravity, then move by the (updated) velocity.
pub fn integrate(player: &PlayerState, physics: &PhysicsConfig) -> PlayerState {
    let vy = player.vy + physics.gravity * physics.dt;
    PlayerState {
        x: player.x + player.vx * physics.dt,
        y: player.y + vy * physics.dt,
        vx: player.vx,
        vy,
    }
}

/// Correct a proposed state against ground, platforms, and the wall.
///
/// `prev` is the state at the start of the step. Surfaces are resolved in a
/// fixed order: ground clamp, platform landing (first platform in list order
/// wins), then the wall. The wall ignores horizontal motion when `prev.y`
/// lies in the bug gap.
pub fn resolve_collisions(
    prev: &PlayerState,
    proposed: PlayerState,
    level: &LevelGeometry,
    body: &PlayerBody,
) -> PlayerState {
    let mut next = proposed;
    let half_w = body.half_width();

    // Ground
    if next.y < level.ground_y {
        next.y = level.ground_y;
        next.vy = 0.0;
    }

    // Platforms: only while falling, only when crossing the surface downward
    if next.vy < 0.0 {
        let left = next.x - half_w;
        let right = next.x + half_w;
        for platform in &level.platforms {
            let top = platform.surface(level.platform_thickness);
            if prev.y >= top && next.y <= top && platform.overlaps(left, right) {
                next.y = top;
                next.vy = 0.0;
                break;
            }
        }
    }

    // Wall
    let wall = &level.wall;
    let wall_left = wall.left();
    let wall_right = wall.right();
    let hitbox_bottom = next.y;
    let hitbox_top = next.y + body.hitbox_height;

    let overlaps_vertically = hitbox_bottom < wall.height && hitbox_top > 0.0;
    let overlaps_horizontally = next.x + half_w > wall_left && next.x - half_w < wall_right;

    if overlaps_vertically && overlaps_horizontally {
        if wall.gap_contains(prev.y) {
            // Phase-through: horizontal motion is left alone
            if hitbox_bottom <= wall.gap_min {
                next.y = wall.gap_min;
                next.vy = 0.0;
            } else if hitbox_top >= wall.gap_max {
                next.y = wall.gap_max - body.hitbox_height;
            }
        } else if prev.y >= wall.height {
            // Came down onto the wall top
            if hitbox_bottom <= wall.height {
                next.y = wall.height;
                next.vy = 0.0;
            }
        } else if prev.x < wall.x {
            next.x = wall_left - half_w;
            next.vx = 0.0;
        } else {
            next.x = wall_right + half_w;
            next.vx = 0.0;
        }
    }

    next
}

/// Whether a player with feet at `(x, y)` stands on a surface.
///
/// The wall top and the gap's lower lip count at any `x`.
pub fn is_grounded(x: f32, y: f32, level: &LevelGeometry, body: &PlayerBody) -> bool {
    let near = |surface: f32| (y - surface).abs() < GROUND_EPSILON;

    if near(level.ground_y) {
        return true;
    }

    let half_w = body.half_width();
    let on_platform = level.platforms.iter().any(|p| {
        near(p.surface(level.platform_thickness)) && p.overlaps(x - half_w, x + half_w)
    });
    if on_platform {
        return true;
    }

    near(level.wall.height) || near(level.wall.gap_min)
}
