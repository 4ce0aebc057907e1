//! Error taxonomy for the simulation engine.
//!
//! Per-agent anomalies (`WorldBounds`, `NumericInstability`, `Capacity`) are
//! recovered where they occur and never abort a run. `Config` is raised before
//! any engine exists, and `EngineFatal` halts the tick loop and carries the
//! step index at which the world stopped being trustworthy.

use cogverse_data::AgentId;
use thiserror::Error;

/// Main error type for simulation operations.
#[derive(Error, Debug)]
pub enum SimError {
    /// Malformed or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Placement outside representable space
    #[error("Position ({x}, {y}) cannot be placed in a {width}x{height} world")]
    WorldBounds {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },

    /// Non-finite physics or cognition output for a single agent
    #[error("Agent {agent} produced a non-finite {quantity}")]
    NumericInstability {
        agent: AgentId,
        quantity: &'static str,
    },

    /// Reproduction attempted at the population cap
    #[error("Population cap of {max_agents} reached")]
    Capacity { max_agents: usize },

    /// Unrecoverable internal-state corruption
    #[error("Engine fault at step {step}: {cause}")]
    EngineFatal { step: u64, cause: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<SimError>,
    },
}

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new engine fault at the given step.
    #[must_use]
    pub fn fatal<S: Into<String>>(step: u64, cause: S) -> Self {
        Self::EngineFatal {
            step,
            cause: cause.into(),
        }
    }

    /// Creates a new numeric instability error.
    #[must_use]
    pub fn unstable(agent: AgentId, quantity: &'static str) -> Self {
        Self::NumericInstability { agent, quantity }
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error must stop the run rather than be contained.
    pub fn is_fatal(&self) -> bool {
        match self {
            SimError::Config(_) | SimError::EngineFatal { .. } => true,
            SimError::WorldBounds { .. }
            | SimError::NumericInstability { .. }
            | SimError::Capacity { .. } => false,
            SimError::Context { source, .. } => source.is_fatal(),
        }
    }

    /// Step index of an engine fault, looking through context wrappers.
    pub fn step(&self) -> Option<u64> {
        match self {
            SimError::EngineFatal { step, .. } => Some(*step),
            SimError::Context { source, .. } => source.step(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for SimError {
    fn from(err: anyhow::Error) -> Self {
        SimError::Config(format!("{err:#}"))
    }
}

impl From<toml::de::Error> for SimError {
    fn from(err: toml::de::Error) -> Self {
        SimError::Config(err.to_string())
    }
}
