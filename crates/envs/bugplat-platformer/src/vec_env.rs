use bugplat_core::{EnvError, Environment, Info, Step};

use crate::BugPlatformEnv;
use crate::action::Action;
use crate::config::EnvConfig;
use crate::observation::Observation;

/// Info key holding the last observation of an episode that was auto-reset.
pub const TERMINAL_OBSERVATION: &str = "terminal_observation";

/// N independent environments stepped in lockstep.
///
/// An instance whose episode ends is reset in the same call; the returned
/// observation is the new episode's first, and the final one is kept in the
/// step's info under [`TERMINAL_OBSERVATION`].
pub struct VecEnv {
    envs: Vec<BugPlatformEnv>,
}

impl VecEnv {
    pub fn new(num_envs: usize, config: EnvConfig) -> Result<Self, EnvError> {
        if num_envs == 0 {
            return Err(EnvError::InvalidConfig(
                "VecEnv needs at least one environment".to_string(),
            ));
        }
        config.validate()?;
        let envs = (0..num_envs)
            .map(|_| BugPlatformEnv::new(config.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { envs })
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    pub fn envs(&self) -> &[BugPlatformEnv] {
        &self.envs
    }

    /// Reset every instance. Instance `i` gets seed `base_seed + i`.
    pub fn reset_all(&mut self, base_seed: Option<u64>) -> Vec<Observation> {
        self.envs
            .iter_mut()
            .enumerate()
            .map(|(i, env)| {
                let seed = base_seed.map(|s| s.wrapping_add(i as u64));
                env.reset(seed).0
            })
            .collect()
    }

    /// Step every instance with its own action. All actions are checked
    /// before any instance moves.
    pub fn step(&mut self, actions: &[[i64; 2]]) -> Result<Vec<Step<Observation>>, EnvError> {
        if actions.len() != self.envs.len() {
            return Err(EnvError::InvalidAction(format!(
                "expected {} actions, got {}",
                self.envs.len(),
                actions.len()
            )));
        }
        let decoded = actions
            .iter()
            .map(|raw| Action::decode(&raw[..]))
            .collect::<Result<Vec<_>, _>>()?;

        let mut steps = Vec::with_capacity(self.envs.len());
        for (env, action) in self.envs.iter_mut().zip(decoded) {
            let mut step = env.step_action(action)?;
            if step.is_done() {
                let (first_obs, _) = env.reset(None);
                let terminal = std::mem::replace(&mut step.observation, first_obs);
                step.info = terminal_info(&terminal);
            }
            steps.push(step);
        }
        Ok(steps)
    }

    pub fn close(&mut self) {
        for env in &mut self.envs {
            env.close();
        }
    }
}

fn terminal_info(obs: &Observation) -> Info {
    let mut info = Info::new();
    info.insert(
        TERMINAL_OBSERVATION.to_string(),
        serde_json::Value::from(obs.to_vec()),
    );
    info
}
