pub mod env_trait;
pub mod error;

pub use env_trait::{BoxSpace, EnvMetadata, Environment, Info, MultiDiscrete, Step};
pub use error::EnvError;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::env_trait::{Environment, Step};
    use crate::error::EnvError;

    /// Step `n` times with the same action, stopping early if the episode ends.
    pub fn run_steps<E: Environment>(
        env: &mut E,
        action: &[i64],
        n: usize,
    ) -> Vec<Step<E::Observation>> {
        let mut steps = Vec::with_capacity(n);
        for _ in 0..n {
            match env.step(action) {
                Ok(step) => {
                    let done = step.is_done();
                    steps.push(step);
                    if done {
                        break;
                    }
                },
                Err(e) => panic!("step failed mid-episode: {e}"),
            }
        }
        steps
    }

    /// Assert that the environment's serialized state differs from `before`.
    pub fn assert_env_state_changed<E: Environment>(env: &E, before: &[u8]) {
        let after = env
            .serialize_state()
            .expect("serialize_state must succeed");
        assert_ne!(
            before,
            &after[..],
            "Environment state should have changed after operation"
        );
    }

    // ================================================================
    // Environment Trait Contract Tests
    // ================================================================
    // Generic checks every Environment implementation must pass. Env crates
    // call these from their own #[cfg(test)] modules with a concrete
    // instance and a valid action.

    /// reset() returns an empty info map and leaves the episode open.
    pub fn contract_reset_starts_open_episode<E: Environment>(env: &mut E) {
        let (_, info) = env.reset(Some(0));
        assert!(info.is_empty(), "reset() info must be empty");
        assert!(
            !env.is_episode_over(),
            "Episode must not be over right after reset()"
        );
    }

    /// Two resets with the same seed produce identical observations and state.
    pub fn contract_reset_is_repeatable<E: Environment>(env: &mut E, action: &[i64]) {
        let (obs_a, _) = env.reset(Some(7));
        let state_a = env.serialize_state().expect("serialize_state");
        let _ = run_steps(env, action, 5);
        let (obs_b, _) = env.reset(Some(7));
        let state_b = env.serialize_state().expect("serialize_state");
        assert_eq!(obs_a, obs_b, "reset() observation must be repeatable");
        assert_eq!(state_a, state_b, "reset() state must be repeatable");
    }

    /// step() with a valid action must change the serialized state.
    pub fn contract_step_changes_state<E: Environment>(env: &mut E, action: &[i64]) {
        env.reset(None);
        let before = env.serialize_state().expect("serialize_state");
        let step = env.step(action).expect("valid action must step");
        assert!(step.info.is_empty(), "step() info must be empty");
        assert_env_state_changed(env, &before);
    }

    /// Stepping enough times must end the episode with exactly one flag set.
    pub fn contract_episode_eventually_ends<E: Environment>(
        env: &mut E,
        action: &[i64],
        max_steps: usize,
    ) {
        env.reset(None);
        let steps = run_steps(env, action, max_steps);
        let last = steps.last().expect("at least one step");
        assert!(
            last.is_done(),
            "Episode must end within {max_steps} steps"
        );
        assert!(
            !(last.terminated && last.truncated),
            "At most one of terminated/truncated may be set"
        );
        assert!(
            steps[..steps.len() - 1].iter().all(|s| !s.is_done()),
            "Only the final step may report done"
        );
        assert!(env.is_episode_over());
    }

    /// step() after the episode ended must be rejected until reset().
    pub fn contract_step_after_end_rejected<E: Environment>(
        env: &mut E,
        action: &[i64],
        max_steps: usize,
    ) {
        env.reset(None);
        let _ = run_steps(env, action, max_steps);
        assert!(env.is_episode_over(), "Episode must have ended");
        assert_eq!(
            env.step(action).err(),
            Some(EnvError::EpisodeOver),
            "step() after the end must return EpisodeOver"
        );
        env.reset(None);
        assert!(env.step(action).is_ok(), "step() after reset() must succeed");
    }

    /// Out-of-range actions are rejected without touching state.
    pub fn contract_invalid_action_rejected<E: Environment>(env: &mut E, invalid: &[i64]) {
        env.reset(None);
        let before = env.serialize_state().expect("serialize_state");
        assert!(
            matches!(env.step(invalid), Err(EnvError::InvalidAction(_))),
            "Invalid action must be rejected"
        );
        let after = env.serialize_state().expect("serialize_state");
        assert_eq!(before, after, "Rejected action must not change state");
    }

    /// serialize_state → apply_state roundtrip must be stable.
    pub fn contract_state_roundtrip_preserves<E: Environment>(env: &mut E, action: &[i64]) {
        env.reset(None);
        let _ = run_steps(env, action, 3);
        let state_a = env.serialize_state().expect("serialize_state");
        env.apply_state(&state_a).expect("apply_state");
        let state_b = env.serialize_state().expect("serialize_state");
        assert_eq!(
            state_a, state_b,
            "State must be stable after serialize→apply→serialize roundtrip"
        );
    }
}
