use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::physics::PlayerBody;

/// Spawn position shared by both presets.
pub const START_X: f32 = 1.0;
pub const START_Y: f32 = 0.0;
/// Flag (goal) position shared by both presets.
pub const FLAG_X: f32 = 20.0;
pub const FLAG_Y: f32 = 0.0;
/// Vertical thickness added on top of every platform's `y_top`.
pub const PLATFORM_THICKNESS: f32 = 0.2;
/// Horizontal thickness of the wall.
pub const WALL_WIDTH: f32 = 0.6;

/// A one-way platform, only solid when landed on from above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub x_left: f32,
    pub x_right: f32,
    pub y_top: f32,
}

impl Platform {
    pub const fn new(x_left: f32, x_right: f32, y_top: f32) -> Self {
        Self {
            x_left,
            x_right,
            y_top,
        }
    }

    /// Height the player's feet rest at when standing on this platform.
    pub fn surface(&self, thickness: f32) -> f32 {
        self.y_top + thickness
    }

    /// Strict overlap of `[left, right]` with the platform's span.
    pub fn overlaps(&self, left: f32, right: f32) -> bool {
        right > self.x_left && left < self.x_right
    }
}

/// The wall between spawn and flag, including its phase-through band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    /// Horizontal center.
    pub x: f32,
    pub width: f32,
    pub height: f32,
    /// Lower bound of the bug gap (standable lip).
    pub gap_min: f32,
    /// Upper bound of the bug gap.
    pub gap_max: f32,
}

impl Wall {
    pub fn left(&self) -> f32 {
        self.x - self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Whether `y` lies inside the closed gap band.
    pub fn gap_contains(&self, y: f32) -> bool {
        self.gap_min <= y && y <= self.gap_max
    }
}

/// Immutable layout of one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelGeometry {
    pub ground_y: f32,
    pub start_x: f32,
    pub start_y: f32,
    pub flag_x: f32,
    pub flag_y: f32,
    pub platform_thickness: f32,
    pub wall: Wall,
    /// Scanned in order during landing; the first hit wins.
    pub platforms: Vec<Platform>,
}

/// Named level presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelPreset {
    /// Short full-height wall, wide gap near the ground.
    #[default]
    V0,
    /// Taller wall further right, thin foot hitbox, narrow gap high up.
    V1,
}

impl LevelPreset {
    pub const ALL: [LevelPreset; 2] = [LevelPreset::V0, LevelPreset::V1];

    pub fn name(&self) -> &'static str {
        match self {
            LevelPreset::V0 => "v0",
            LevelPreset::V1 => "v1",
        }
    }

    /// Build this preset's geometry. The v1 gap height is sized from the
    /// player's hitbox, so the body is an input.
    pub fn geometry(&self, body: &PlayerBody) -> LevelGeometry {
        let (wall, platforms) = match self {
            LevelPreset::V0 => (
                Wall {
                    x: 10.0,
                    width: WALL_WIDTH,
                    height: 7.0,
                    gap_min: 1.0,
                    gap_max: 3.0,
                },
                vec![
                    Platform::new(4.0, 8.5, 1.5),
                    Platform::new(6.0, 9.0, 3.0),
                    Platform::new(5.0, 6.5, 4.5),
                    Platform::new(7.0, 10.0, 6.0),
                ],
            ),
            LevelPreset::V1 => {
                let gap_min = 5.5;
                (
                    Wall {
                        x: 14.0,
                        width: WALL_WIDTH,
                        height: 8.5,
                        gap_min,
                        gap_max: gap_min + body.hitbox_height * 3.0,
                    },
                    vec![
                        Platform::new(9.0, 12.5, 1.5),
                        Platform::new(6.0, 9.5, 3.0),
                        Platform::new(8.5, 12.0, 4.5),
                        Platform::new(5.5, 10.5, 6.0),
                        Platform::new(9.5, 13.5, 7.5),
                    ],
                )
            },
        };

        LevelGeometry {
            ground_y: 0.0,
            start_x: START_X,
            start_y: START_Y,
            flag_x: FLAG_X,
            flag_y: FLAG_Y,
            platform_thickness: PLATFORM_THICKNESS,
            wall,
            platforms,
        }
    }
}

impl FromStr for LevelPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v0" => Ok(LevelPreset::V0),
            "v1" => Ok(LevelPreset::V1),
            other => Err(format!("unknown level preset '{other}' (expected v0 or v1)")),
        }
    }
}

impl std::fmt::Display for LevelPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
