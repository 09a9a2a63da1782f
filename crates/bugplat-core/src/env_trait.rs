use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EnvError;

/// Auxiliary per-step data. The core environments always return it empty;
/// wrappers such as vectorized runners may add entries.
pub type Info = HashMap<String, serde_json::Value>;

/// Core trait that every Bug Platformer environment implements.
///
/// Training loops, renderers, and analysis tools only ever talk to an
/// environment through this interface.
pub trait Environment: Send {
    type Observation: Clone + std::fmt::Debug + PartialEq;

    /// Static description of the observation and action spaces.
    fn metadata(&self) -> EnvMetadata;

    /// Start a new episode. Always legal, from any state.
    fn reset(&mut self, seed: Option<u64>) -> (Self::Observation, Info);

    /// Advance the episode by one step.
    ///
    /// `action` is the raw multi-discrete encoding, one integer per
    /// sub-action. Stepping a finished episode is an error, not a no-op.
    fn step(&mut self, action: &[i64]) -> Result<Step<Self::Observation>, EnvError>;

    /// Release external resources. Environments that own none keep the default.
    fn close(&mut self) {}

    /// Encode all mutable per-episode state.
    fn serialize_state(&self) -> Result<Vec<u8>, EnvError>;

    /// Restore state previously produced by `serialize_state`.
    fn apply_state(&mut self, state: &[u8]) -> Result<(), EnvError>;

    /// Whether the current episode has terminated or truncated.
    fn is_episode_over(&self) -> bool;
}

/// Result of a single `step()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step<Obs> {
    pub observation: Obs,
    pub reward: f32,
    /// Episode ended by reaching the goal.
    pub terminated: bool,
    /// Episode ended by hitting the step limit.
    pub truncated: bool,
    pub info: Info,
}

impl<Obs> Step<Obs> {
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Environment description for tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvMetadata {
    pub name: String,
    pub description: String,
    pub observation_space: BoxSpace,
    pub action_space: MultiDiscrete,
    pub max_episode_steps: u32,
}

/// Continuous observation space with per-dimension bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl BoxSpace {
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    pub fn contains(&self, obs: &[f32]) -> bool {
        obs.len() == self.dim()
            && obs
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }
}

/// Product of independent discrete sub-actions; `nvec[i]` is the number of
/// choices for sub-action `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiDiscrete {
    pub nvec: Vec<u32>,
}

impl MultiDiscrete {
    pub fn new(nvec: Vec<u32>) -> Self {
        Self { nvec }
    }

    /// Check a raw action against the space, describing the first violation.
    pub fn check(&self, action: &[i64]) -> Result<(), EnvError> {
        if action.len() != self.nvec.len() {
            return Err(EnvError::InvalidAction(format!(
                "expected {} components, got {}",
                self.nvec.len(),
                action.len()
            )));
        }
        for (i, (&a, &n)) in action.iter().zip(&self.nvec).enumerate() {
            if a < 0 || a >= i64::from(n) {
                return Err(EnvError::InvalidAction(format!(
                    "component {i} = {a} outside [0, {n})"
                )));
            }
        }
        Ok(())
    }
}
