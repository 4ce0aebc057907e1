use crate::model::world::World;
use cogverse_core::config::AppConfig;
use cogverse_core::error::{Result, SimError};
use cogverse_core::lifecycle::{self, AgentRecord};
use cogverse_core::metrics::Metrics;
use cogverse_core::physics::{EntropyLedger, PhysicsReport};
use cogverse_core::society::CultureRegistry;
use cogverse_core::space::SpatialWorld;
use cogverse_core::time::TimeManager;
use cogverse_data::{AgentId, Vec2};
use cogverse_observer::EmergenceObserver;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

impl World {
    /// Validates `config`, then seeds resources and founder agents.
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_metrics(config, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(config: AppConfig, metrics: Arc<Metrics>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SimError::config(e.to_string()))?;

        let seed = config.world.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut space = SpatialWorld::new(&config.world);
        space.generate_environment(config.world.obstacle_density, &mut rng);

        let resource_count =
            (config.world.width() * config.world.height() * config.world.resource_density).floor()
                as usize;
        for _ in 0..resource_count {
            space.place_resource(&mut rng);
        }

        let mut world = Self {
            seed,
            ecs: hecs::World::new(),
            space,
            culture: CultureRegistry::new(),
            observer: EmergenceObserver::new(&config.society.emergence, &config.observer),
            time: TimeManager::new(&config.time),
            metrics,
            entropy: EntropyLedger::default(),
            last_physics: PhysicsReport::default(),
            rng,
            next_agent_id: 0,
            snapshots: Vec::new(),
            total_interactions: 0,
            last_births: 0,
            last_deaths: 0,
            last_signals: Vec::new(),
            config,
        };

        for _ in 0..world.config.world.initial_agents {
            let position = world.space.free_position(&mut world.rng);
            world.spawn_founder(position)?;
        }

        tracing::info!(
            seed,
            agents = world.config.world.initial_agents,
            resources = resource_count,
            obstacles = world.space.obstacle_count(),
            width = world.space.width(),
            height = world.space.height(),
            "World initialized"
        );
        Ok(world)
    }

    pub(crate) fn allocate_id(&mut self) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        id
    }

    /// Adds a founder with a random genome at `position`, wrapped or clamped
    /// into the world.
    pub fn spawn_founder(&mut self, position: Vec2) -> Result<AgentId> {
        let position = self.space.try_place(position)?;
        let id = self.allocate_id();
        let tick = self.tick();
        let record =
            lifecycle::create_agent_with_rng(id, position, tick, &self.config, &mut self.rng);
        self.ecs.spawn(record.into_components());
        Ok(id)
    }

    /// Adds a prepared agent under a fresh id. The record's own id is replaced.
    pub fn spawn_record(&mut self, mut record: AgentRecord) -> Result<AgentId> {
        record.position.0 = self.space.try_place(record.position.0)?;
        let id = self.allocate_id();
        record.identity.id = id;
        self.ecs.spawn(record.into_components());
        Ok(id)
    }
}
