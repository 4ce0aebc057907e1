use cogverse_lib::model::config::AppConfig;
use cogverse_lib::model::lifecycle::{self, AgentRecord};
use cogverse_lib::model::world::World;
use cogverse_data::{BoundaryPolicy, Vec2, Velocity};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[allow(dead_code)]
pub struct WorldBuilder {
    config: AppConfig,
    agents: Vec<AgentBuilder>,
    resources: Vec<(Vec2, f64)>,
}

#[allow(dead_code)]
impl WorldBuilder {
    /// An empty, seeded world: no founders and no resources unless added.
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.world.initial_agents = 0;
        config.world.resource_density = 0.0;
        config.world.obstacle_density = 0.0;
        config.world.seed = Some(42);
        Self {
            config,
            agents: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.world.seed = Some(seed);
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.config.world.size = [width, height];
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.config.world.boundary_type = boundary;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_agent(mut self, agent: AgentBuilder) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn with_resource(mut self, x: f64, y: f64, value: f64) -> Self {
        self.resources.push((Vec2::new(x, y), value));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build(self) -> World {
        let mut world = World::new(self.config).expect("Failed to create world in test builder");
        for (position, value) in self.resources {
            world
                .space
                .insert_resource(position, value, 0.0)
                .expect("resource inside the world");
        }
        for agent in self.agents {
            let record = agent.build(&world.config);
            world.spawn_record(record).expect("agent inside the world");
        }
        world
    }
}

#[allow(dead_code)]
pub struct AgentBuilder {
    position: Vec2,
    velocity: Vec2,
    energy: Option<f64>,
    genome_seed: u64,
}

#[allow(dead_code)]
impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            position: Vec2::new(10.0, 10.0),
            velocity: Vec2::ZERO,
            energy: None,
            genome_seed: 1,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    pub fn moving(mut self, vx: f64, vy: f64) -> Self {
        self.velocity = Vec2::new(vx, vy);
        self
    }

    pub fn energy(mut self, amount: f64) -> Self {
        self.energy = Some(amount);
        self
    }

    pub fn genome_seed(mut self, seed: u64) -> Self {
        self.genome_seed = seed;
        self
    }

    pub fn build(self, config: &AppConfig) -> AgentRecord {
        let mut rng = ChaCha8Rng::seed_from_u64(self.genome_seed);
        let mut record = lifecycle::create_agent_with_rng(
            cogverse_data::AgentId(0),
            self.position,
            0,
            config,
            &mut rng,
        );
        record.velocity = Velocity(self.velocity);
        if let Some(energy) = self.energy {
            record.vitals.energy = energy;
        }
        record
    }
}
