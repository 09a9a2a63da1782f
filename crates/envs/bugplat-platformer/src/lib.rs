pub mod action;
pub mod config;
pub mod level;
pub mod observation;
pub mod physics;
pub mod scoring;
pub mod vec_env;

use serde::{Deserialize, Serialize};

use bugplat_core::{EnvError, EnvMetadata, Environment, Info, Step};

use action::{Action, apply_action};
use config::EnvConfig;
use level::LevelPreset;
use observation::{Observation, encode_observation, observation_space};
use physics::{JumpState, PlayerState, integrate, is_grounded, resolve_collisions};
use scoring::{PositionHistory, RewardBreakdown, Transition, shape_reward};

/// Where the current episode is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodePhase {
    /// Reset done, no step taken yet.
    #[default]
    Ready,
    Running,
    /// Reached the flag.
    Terminated,
    /// Hit the step limit.
    Truncated,
}

impl EpisodePhase {
    pub fn is_over(&self) -> bool {
        matches!(self, EpisodePhase::Terminated | EpisodePhase::Truncated)
    }
}

/// All mutable per-episode state. This is exactly what a snapshot holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    pub player: PlayerState,
    pub jump: JumpState,
    pub step_count: u32,
    /// Present only when the stagnation term is enabled.
    pub recent_x: Option<PositionHistory>,
    pub phase: EpisodePhase,
    /// Seed passed to the last `reset`. The dynamics never read it.
    pub seed: Option<u64>,
}

impl EpisodeState {
    fn initial(config: &EnvConfig, seed: Option<u64>) -> Self {
        let level = &config.level;
        let recent_x = config.reward.stagnation.as_ref().map(|stag| {
            let mut history = PositionHistory::new(stag.window);
            history.push(level.start_x);
            history
        });
        Self {
            player: PlayerState::at_rest(level.start_x, level.start_y),
            jump: JumpState::default(),
            step_count: 0,
            recent_x,
            phase: EpisodePhase::Ready,
            seed,
        }
    }
}

/// The Bug Platformer environment: one independent simulation instance.
pub struct BugPlatformEnv {
    config: EnvConfig,
    state: EpisodeState,
    last_reward: Option<RewardBreakdown>,
}

impl BugPlatformEnv {
    /// Build an instance from a config, rejecting inconsistent geometry or
    /// weights.
    pub fn new(config: EnvConfig) -> Result<Self, EnvError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    pub fn from_preset(preset: LevelPreset) -> Self {
        Self::with_config(preset.config())
    }

    fn with_config(config: EnvConfig) -> Self {
        let state = EpisodeState::initial(&config, None);
        Self {
            config,
            state,
            last_reward: None,
        }
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn state(&self) -> &EpisodeState {
        &self.state
    }

    /// Kinematic state; `to_array()` gives the `[x, y, vx, vy]` layout.
    pub fn player(&self) -> &PlayerState {
        &self.state.player
    }

    pub fn phase(&self) -> EpisodePhase {
        self.state.phase
    }

    pub fn step_count(&self) -> u32 {
        self.state.step_count
    }

    /// Per-term reward of the most recent step, cleared on reset.
    pub fn last_reward(&self) -> Option<&RewardBreakdown> {
        self.last_reward.as_ref()
    }

    pub fn observe(&self) -> Observation {
        encode_observation(&self.state.player, &self.state.jump, &self.config)
    }

    pub fn is_grounded(&self) -> bool {
        let p = &self.state.player;
        is_grounded(p.x, p.y, &self.config.level, &self.config.player)
    }

    /// Advance one step with an already-decoded action.
    pub fn step_action(&mut self, action: Action) -> Result<Step<Observation>, EnvError> {
        if self.state.phase.is_over() {
            tracing::warn!(
                phase = ?self.state.phase,
                steps = self.state.step_count,
                "step() on a finished episode"
            );
            return Err(EnvError::EpisodeOver);
        }

        let config = &self.config;
        let state = &mut self.state;

        state.jump.tick_cooldown();
        state.step_count += 1;

        let before = state.player;
        let mut commanded = before;
        apply_action(action, &mut commanded, &mut state.jump, config);
        let proposed = integrate(&commanded, &config.physics);
        let after = resolve_collisions(&before, proposed, &config.level, &config.player);

        let transition = Transition {
            before,
            after,
            jump_held: action.jump,
            step_count: state.step_count,
            reached_goal: reached_goal(&after, config),
        };
        let breakdown = shape_reward(&transition, &mut state.jump, state.recent_x.as_mut(), config);
        state.player = after;

        let terminated = transition.reached_goal;
        let truncated = !terminated && state.step_count >= config.max_steps;
        state.phase = if terminated {
            EpisodePhase::Terminated
        } else if truncated {
            EpisodePhase::Truncated
        } else {
            EpisodePhase::Running
        };
        if state.phase.is_over() {
            tracing::debug!(
                steps = state.step_count,
                terminated,
                x = after.x,
                y = after.y,
                "episode finished"
            );
        }

        let reward = breakdown.total();
        self.last_reward = Some(breakdown);
        Ok(Step {
            observation: self.observe(),
            reward,
            terminated,
            truncated,
            info: Info::new(),
        })
    }
}

/// Feet within `goal_radius` of the flag on both axes.
fn reached_goal(player: &PlayerState, config: &EnvConfig) -> bool {
    let level = &config.level;
    let r = config.goal_radius;
    (player.x - level.flag_x).abs() < r && (player.y - level.flag_y).abs() < r
}

/// Reject decoded state that this config could never have produced.
fn check_snapshot(state: &EpisodeState, config: &EnvConfig) -> Result<(), EnvError> {
    let fail = |msg: String| Err(EnvError::Snapshot(msg));

    match (&state.recent_x, &config.reward.stagnation) {
        (None, None) => {},
        (Some(history), Some(stag)) => {
            if history.capacity() != stag.window {
                return fail(format!(
                    "position history capacity {} does not match window {}",
                    history.capacity(),
                    stag.window
                ));
            }
            if history.len() > history.capacity() {
                return fail(format!(
                    "position history holds {} entries, capacity {}",
                    history.len(),
                    history.capacity()
                ));
            }
        },
        _ => {
            return fail(format!(
                "position history does not match the {} preset",
                config.preset
            ));
        },
    }
    if state.jump.cooldown > config.jump.cooldown_max {
        return fail(format!(
            "jump cooldown {} exceeds cooldown_max {}",
            state.jump.cooldown, config.jump.cooldown_max
        ));
    }
    if state.step_count > config.max_steps {
        return fail(format!(
            "step_count {} exceeds max_steps {}",
            state.step_count, config.max_steps
        ));
    }
    Ok(())
}

impl Default for BugPlatformEnv {
    fn default() -> Self {
        Self::from_preset(LevelPreset::default())
    }
}

impl Environment for BugPlatformEnv {
    type Observation = Observation;

    fn metadata(&self) -> EnvMetadata {
        EnvMetadata {
            name: format!("BugPlatform-{}", self.config.preset),
            description: "2D platformer with a phase-through gap in the wall".to_string(),
            observation_space: observation_space(),
            action_space: Action::space(),
            max_episode_steps: self.config.max_steps,
        }
    }

    fn reset(&mut self, seed: Option<u64>) -> (Observation, Info) {
        self.state = EpisodeState::initial(&self.config, seed);
        self.last_reward = None;
        (self.observe(), Info::new())
    }

    fn step(&mut self, action: &[i64]) -> Result<Step<Observation>, EnvError> {
        let action = Action::decode(action).inspect_err(|e| {
            tracing::warn!("rejected action: {e}");
        })?;
        self.step_action(action)
    }

    fn serialize_state(&self) -> Result<Vec<u8>, EnvError> {
        rmp_serde::to_vec(&self.state).map_err(|e| EnvError::Snapshot(e.to_string()))
    }

    fn apply_state(&mut self, state: &[u8]) -> Result<(), EnvError> {
        let decoded: EpisodeState =
            rmp_serde::from_slice(state).map_err(|e| EnvError::Snapshot(e.to_string()))?;
        check_snapshot(&decoded, &self.config)?;
        self.state = decoded;
        self.last_reward = None;
        Ok(())
    }

    fn is_episode_over(&self) -> bool {
        self.state.phase.is_over()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugplat_core::test_helpers;

    const IDLE: [i64; 2] = [0, 0];
    const RIGHT: [i64; 2] = [2, 0];
    const JUMP: [i64; 2] = [0, 1];

    fn env(preset: LevelPreset) -> BugPlatformEnv {
        let mut env = BugPlatformEnv::from_preset(preset);
        env.reset(Some(0));
        env
    }

    fn place(env: &mut BugPlatformEnv, x: f32, y: f32) {
        env.state.player = PlayerState::at_rest(x, y);
    }

    #[test]
    fn reset_observation_v0() {
        let mut env = BugPlatformEnv::from_preset(LevelPreset::V0);
        let (obs, info) = env.reset(Some(3));
        assert_eq!(obs, [1.0, 0.0, 0.0, 0.0, 0.0, 19.0, 9.0, 1.0]);
        assert!(info.is_empty());
        assert_eq!(env.phase(), EpisodePhase::Ready);
        assert_eq!(env.state().seed, Some(3));
    }

    #[test]
    fn fresh_env_steps_without_reset() {
        let mut env = BugPlatformEnv::default();
        assert!(env.step(&IDLE).is_ok());
        assert_eq!(env.phase(), EpisodePhase::Running);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut cfg = LevelPreset::V0.config();
        cfg.physics.dt = 0.0;
        assert!(matches!(
            BugPlatformEnv::new(cfg),
            Err(EnvError::InvalidConfig(_))
        ));
        assert!(BugPlatformEnv::new(LevelPreset::V1.config()).is_ok());
    }

    #[test]
    fn idle_step_reward() {
        let mut env = env(LevelPreset::V0);
        let step = env.step(&IDLE).unwrap();
        assert_eq!(step.reward, -0.01f32 + -0.05f32);
        assert_eq!(step.observation[1], 0.0, "ground clamp holds the player");
        assert!(!step.terminated && !step.truncated);
    }

    #[test]
    fn v1_stagnation_kicks_in_when_window_fills() {
        let mut env = env(LevelPreset::V1);
        let steps = test_helpers::run_steps(&mut env, &IDLE, 99);
        assert_eq!(steps.len(), 99);
        // The reset position occupies one slot, so step 99 fills the window
        assert!((steps[97].reward - -0.06).abs() < 1e-6);
        assert!((steps[98].reward - -0.09).abs() < 1e-6);
        assert_eq!(env.last_reward().map(|r| r.stagnation), Some(-0.03));
    }

    #[test]
    fn jump_is_edge_triggered() {
        let mut env = env(LevelPreset::V0);
        let steps = test_helpers::run_steps(&mut env, &JUMP, 10);
        assert!((steps[0].observation[3] - 11.4).abs() < 1e-5);
        // Held button: cooldown counts down from 60 after the single trigger
        assert_eq!(env.state().jump.cooldown, 51);
        assert!((steps[9].observation[4] - 51.0 / 60.0).abs() < 1e-6);
        assert!(steps.iter().all(|s| s.observation[3] < 12.0));
    }

    #[test]
    fn jump_in_place_is_penalized_on_landing() {
        let mut env = env(LevelPreset::V0);
        env.step(&JUMP).unwrap();
        assert!(env.state().jump.is_jumping);

        let mut landings = Vec::new();
        for _ in 0..100 {
            let step = env.step(&IDLE).unwrap();
            if let Some(r) = env.last_reward()
                && r.landing != 0.0
            {
                landings.push((r.landing, step.reward));
            }
        }
        assert_eq!(landings.len(), 1, "exactly one landing is scored");
        let (landing, reward) = landings[0];
        assert_eq!(landing, -1.0);
        assert!((reward - -1.01).abs() < 1e-5, "idle skipped on landing frame");
        assert!(!env.state().jump.is_jumping);
        assert_eq!(env.player().y, 0.0);
    }

    #[test]
    fn walking_to_flag_terminates() {
        let mut env = env(LevelPreset::V0);
        place(&mut env, 15.0, 0.0);
        let steps = test_helpers::run_steps(&mut env, &RIGHT, 200);
        let last = steps.last().unwrap();
        assert!(last.terminated);
        assert!(!last.truncated);
        assert!(last.reward >= 10.0);
        assert_eq!(env.phase(), EpisodePhase::Terminated);
        assert!(env.last_reward().unwrap().goal > 10.0);
    }

    #[test]
    fn idle_episode_truncates_at_limit() {
        let mut env = env(LevelPreset::V0);
        let steps = test_helpers::run_steps(&mut env, &IDLE, 1000);
        assert_eq!(steps.len(), 1000);
        assert!(steps[..999].iter().all(|s| !s.truncated));
        let last = &steps[999];
        assert!(last.truncated && !last.terminated);
        assert_eq!(env.step_count(), 1000);
        assert_eq!(env.step(&IDLE).err(), Some(EnvError::EpisodeOver));
    }

    #[test]
    fn goal_on_final_step_is_termination() {
        let mut env = env(LevelPreset::V0);
        env.state.step_count = 999;
        place(&mut env, 19.45, 0.0);
        let step = env.step(&RIGHT).unwrap();
        assert!(step.terminated);
        assert!(!step.truncated, "termination wins over truncation");
    }

    #[test]
    fn bug_gap_exploit_crosses_wall() {
        let mut env = env(LevelPreset::V0);
        place(&mut env, 9.0, 2.0);
        let _ = test_helpers::run_steps(&mut env, &RIGHT, 30);
        let p = env.player();
        assert!(p.x > 10.6, "passed through the wall, x={}", p.x);
        assert_eq!(p.vx, 4.0);
    }

    #[test]
    fn wall_blocks_at_floor_level() {
        let mut env = env(LevelPreset::V0);
        place(&mut env, 9.0, 0.0);
        let _ = test_helpers::run_steps(&mut env, &RIGHT, 30);
        let p = env.player();
        assert!((p.x - 9.4).abs() < 1e-5, "stopped at the wall face, x={}", p.x);
        assert_eq!(p.vx, 0.0);
    }

    #[test]
    fn invalid_action_leaves_phase_untouched() {
        let mut env = env(LevelPreset::V1);
        assert!(matches!(env.step(&[2, 5]), Err(EnvError::InvalidAction(_))));
        assert_eq!(env.phase(), EpisodePhase::Ready);
        assert_eq!(env.step_count(), 0);
    }

    #[test]
    fn metadata_describes_spaces() {
        let meta = BugPlatformEnv::from_preset(LevelPreset::V1).metadata();
        assert_eq!(meta.name, "BugPlatform-v1");
        assert_eq!(meta.action_space.nvec, vec![3, 2]);
        assert_eq!(meta.observation_space.dim(), 8);
        assert_eq!(meta.max_episode_steps, 1000);
    }

    #[test]
    fn snapshot_restores_mid_episode() {
        let mut env = env(LevelPreset::V1);
        let _ = test_helpers::run_steps(&mut env, &RIGHT, 25);
        let snap = env.serialize_state().unwrap();
        let saved = env.state().clone();
        let expected = env.step(&JUMP).unwrap();

        let mut other = BugPlatformEnv::from_preset(LevelPreset::V1);
        other.apply_state(&snap).unwrap();
        assert_eq!(other.state(), &saved);
        assert_eq!(other.step(&JUMP).unwrap(), expected);
    }

    #[test]
    fn snapshot_rejects_garbage_and_wrong_preset() {
        let mut env = env(LevelPreset::V0);
        assert!(matches!(
            env.apply_state(&[0xc1, 0x00]),
            Err(EnvError::Snapshot(_))
        ));
        let v1_snap = BugPlatformEnv::from_preset(LevelPreset::V1)
            .serialize_state()
            .unwrap();
        assert!(matches!(
            env.apply_state(&v1_snap),
            Err(EnvError::Snapshot(_))
        ));
    }

    fn v1_snapshot_with(edit: impl FnOnce(&mut EpisodeState)) -> Vec<u8> {
        let mut state = env(LevelPreset::V1).state().clone();
        edit(&mut state);
        rmp_serde::to_vec(&state).unwrap()
    }

    #[test]
    fn snapshot_rejects_wrong_history_capacity() {
        let snap = v1_snapshot_with(|s| {
            let mut history = PositionHistory::new(3);
            history.push(1.0);
            s.recent_x = Some(history);
        });
        let mut env = env(LevelPreset::V1);
        assert!(matches!(env.apply_state(&snap), Err(EnvError::Snapshot(_))));
        assert_eq!(env.state().recent_x.as_ref().map(|h| h.capacity()), Some(100));
    }

    #[test]
    fn snapshot_rejects_overfull_history() {
        // Serialized form of PositionHistory is (capacity, xs)
        let state = env(LevelPreset::V1).state().clone();
        let overfull = (100usize, vec![1.0f32; 101]);
        let snap = rmp_serde::to_vec(&(
            state.player,
            state.jump,
            state.step_count,
            Some(overfull),
            state.phase,
            state.seed,
        ))
        .unwrap();
        let mut env = env(LevelPreset::V1);
        assert!(matches!(env.apply_state(&snap), Err(EnvError::Snapshot(_))));
    }

    #[test]
    fn snapshot_rejects_cooldown_above_max() {
        let snap = v1_snapshot_with(|s| s.jump.cooldown = 500);
        let mut env = env(LevelPreset::V1);
        assert!(matches!(env.apply_state(&snap), Err(EnvError::Snapshot(_))));
        assert_eq!(env.observe()[4], 0.0);

        let at_max = v1_snapshot_with(|s| s.jump.cooldown = 40);
        assert!(env.apply_state(&at_max).is_ok());
        assert_eq!(env.observe()[4], 1.0);
    }

    #[test]
    fn snapshot_rejects_step_count_past_limit() {
        let snap = v1_snapshot_with(|s| s.step_count = 5000);
        let mut env = env(LevelPreset::V1);
        assert!(matches!(env.apply_state(&snap), Err(EnvError::Snapshot(_))));
        assert_eq!(env.step_count(), 0);
    }

    #[test]
    fn player_array_and_grounded_accessors() {
        let mut env = env(LevelPreset::V0);
        assert_eq!(env.player().to_array(), [1.0, 0.0, 0.0, 0.0]);
        assert!(env.is_grounded());

        env.step(&JUMP).unwrap();
        let [x, y, vx, vy] = env.player().to_array();
        assert_eq!((x, vx), (1.0, 0.0));
        assert!(y > 0.2 && vy > 11.0);
        assert!(!env.is_grounded());
    }

    // ================================================================
    // Environment contract tests
    // ================================================================

    #[test]
    fn contract_reset_starts_open_episode() {
        for preset in LevelPreset::ALL {
            let mut env = BugPlatformEnv::from_preset(preset);
            test_helpers::contract_reset_starts_open_episode(&mut env);
        }
    }

    #[test]
    fn contract_reset_is_repeatable() {
        for preset in LevelPreset::ALL {
            let mut env = BugPlatformEnv::from_preset(preset);
            test_helpers::contract_reset_is_repeatable(&mut env, &RIGHT);
        }
    }

    #[test]
    fn contract_step_changes_state() {
        let mut env = BugPlatformEnv::default();
        test_helpers::contract_step_changes_state(&mut env, &RIGHT);
    }

    #[test]
    fn contract_episode_eventually_ends() {
        for preset in LevelPreset::ALL {
            let mut env = BugPlatformEnv::from_preset(preset);
            test_helpers::contract_episode_eventually_ends(&mut env, &IDLE, 1000);
        }
    }

    #[test]
    fn contract_step_after_end_rejected() {
        let mut env = BugPlatformEnv::default();
        test_helpers::contract_step_after_end_rejected(&mut env, &IDLE, 1000);
    }

    #[test]
    fn contract_invalid_action_rejected() {
        let mut env = BugPlatformEnv::default();
        test_helpers::contract_invalid_action_rejected(&mut env, &[3, 0]);
        test_helpers::contract_invalid_action_rejected(&mut env, &[1]);
    }

    #[test]
    fn contract_state_roundtrip_preserves() {
        for preset in LevelPreset::ALL {
            let mut env = BugPlatformEnv::from_preset(preset);
            test_helpers::contract_state_roundtrip_preserves(&mut env, &JUMP);
        }
    }

    // ================================================================
    // Property-based tests (proptest)
    // ================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn action_seq() -> impl Strategy<Value = Vec<[i64; 2]>> {
            proptest::collection::vec((0i64..3, 0i64..2).prop_map(|(m, j)| [m, j]), 1..400)
        }

        fn preset() -> impl Strategy<Value = LevelPreset> {
            prop_oneof![Just(LevelPreset::V0), Just(LevelPreset::V1)]
        }

        proptest! {
            #[test]
            fn player_never_below_ground(preset in preset(), actions in action_seq()) {
                let mut env = BugPlatformEnv::from_preset(preset);
                env.reset(None);
                for action in &actions {
                    let step = env.step(action).unwrap();
                    prop_assert!(step.observation[1] >= 0.0, "y={}", step.observation[1]);
                    if step.is_done() {
                        env.reset(None);
                    }
                }
            }

            #[test]
            fn same_actions_same_trajectory(
                preset in preset(),
                seed in any::<u64>(),
                actions in action_seq(),
            ) {
                let mut a = BugPlatformEnv::from_preset(preset);
                let mut b = BugPlatformEnv::from_preset(preset);
                a.reset(Some(seed));
                b.reset(Some(seed));
                for action in &actions {
                    let sa = a.step(action).unwrap();
                    let sb = b.step(action).unwrap();
                    prop_assert_eq!(sa.reward.to_bits(), sb.reward.to_bits());
                    prop_assert_eq!(
                        sa.observation.map(f32::to_bits),
                        sb.observation.map(f32::to_bits)
                    );
                    prop_assert_eq!(sa.is_done(), sb.is_done());
                    if sa.is_done() {
                        a.reset(Some(seed));
                        b.reset(Some(seed));
                    }
                }
            }

            #[test]
            fn at_most_one_end_flag(preset in preset(), actions in action_seq()) {
                let mut env = BugPlatformEnv::from_preset(preset);
                for action in &actions {
                    let step = env.step(action).unwrap();
                    prop_assert!(!(step.terminated && step.truncated));
                    if step.is_done() {
                        env.reset(None);
                    }
                }
            }
        }
    }
}
