use cogverse_core::config::AppConfig;
use cogverse_core::metrics::Metrics;
use cogverse_core::physics::{EntropyLedger, PhysicsReport};
use cogverse_core::snapshot::AgentSnapshot;
use cogverse_core::society::CultureRegistry;
use cogverse_core::space::SpatialWorld;
use cogverse_core::time::TimeManager;
use cogverse_data::Signal;
use cogverse_observer::EmergenceObserver;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

pub mod commit;
pub mod finalize;
pub mod init;
pub mod state;
pub mod update;

pub use commit::{CommitOutcome, PendingBirth, PendingDeath};
pub use state::{AgentComponents, Intent};
pub use update::TickOutcome;

/// Frozen, borrowed view of the world handed to the parallel phase.
pub struct SystemContext<'a> {
    pub config: &'a AppConfig,
    pub space: &'a SpatialWorld,
    pub snapshots: &'a [AgentSnapshot],
    pub tick: u64,
    pub world_seed: u64,
}

/// The simulation engine: agent registry, space, culture and observers.
///
/// Agents live in a `hecs` registry and are always visited in ascending id
/// order. Between ticks every live agent is in bounds and no dead agent
/// remains in the registry.
pub struct World {
    pub config: AppConfig,
    pub seed: u64,
    pub ecs: hecs::World,
    pub space: SpatialWorld,
    pub culture: CultureRegistry,
    pub observer: EmergenceObserver,
    pub time: TimeManager,
    pub metrics: Arc<Metrics>,
    pub entropy: EntropyLedger,
    pub last_physics: PhysicsReport,
    pub rng: ChaCha8Rng,
    next_agent_id: u64,
    snapshots: Vec<AgentSnapshot>,
    total_interactions: u64,
    last_births: usize,
    last_deaths: usize,
    last_signals: Vec<Signal>,
}

impl World {
    /// Index of the tick that the next call to [`World::step`] runs.
    pub fn tick(&self) -> u64 {
        self.time.step_count()
    }

    pub fn total_interactions(&self) -> u64 {
        self.total_interactions
    }

    pub fn last_signals(&self) -> &[Signal] {
        &self.last_signals
    }
}
