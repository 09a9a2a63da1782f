/// Contract violations and configuration problems surfaced by environments.
///
/// The simulation itself has no recoverable runtime failures; every variant
/// here is a caller mistake or a bad input file.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvError {
    /// `step()` was called after the episode terminated or truncated,
    /// without an intervening `reset()`.
    EpisodeOver,
    /// Action outside the declared action space.
    InvalidAction(String),
    /// Configuration failed validation.
    InvalidConfig(String),
    /// State snapshot could not be encoded or decoded.
    Snapshot(String),
}

impl std::fmt::Display for EnvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EpisodeOver => {
                write!(f, "step() called on a finished episode; call reset() first")
            },
            Self::InvalidAction(m) => write!(f, "invalid action: {m}"),
            Self::InvalidConfig(m) => write!(f, "invalid config: {m}"),
            Self::Snapshot(m) => write!(f, "state snapshot error: {m}"),
        }
    }
}

impl std::error::Error for EnvError {}
