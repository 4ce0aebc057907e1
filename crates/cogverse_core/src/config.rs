//! Configuration management for simulation parameters.
//!
//! This module provides strongly-typed configuration structures that map to
//! a TOML file. The configuration is built once at startup, validated, and
//! then passed by reference into every component; nothing mutates it while
//! the engine runs.
//!
//! ## Configuration Hierarchy
//!
//! 1. Default values (hardcoded in `Default` impls) or a named [`Preset`]
//! 2. User TOML, merged key by key (recursively for nested tables)
//!
//! Unknown keys are rejected.
//!
//! ## Example
//!
//! ```toml
//! [world]
//! size = [50, 50]
//! initial_agents = 10
//! boundary_type = "reflective"
//!
//! [agents.behavior]
//! reproduction_threshold = 90
//! ```

use crate::error::{Result, SimError};
use cogverse_data::{Activation, BoundaryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Number of network output channels the decision layer reads.
pub const ACTION_CHANNELS: usize = 8;

/// World geometry, population limits and resource layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WorldConfig {
    pub size: [u32; 2],
    pub max_agents: usize,
    pub initial_agents: usize,
    pub resource_density: f64,
    pub interaction_radius: f64,
    pub boundary_type: BoundaryPolicy,
    pub seed: Option<u64>,
    pub perception_radius: f64,
    /// Scale applied to every resource's own regrowth rate.
    pub resource_regeneration: f64,
    /// Share of unit cells that are impassable.
    pub obstacle_density: f64,
    /// Ticks per day/night cycle.
    pub day_cycle: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: [100, 100],
            max_agents: 50,
            initial_agents: 20,
            resource_density: 0.1,
            interaction_radius: 5.0,
            boundary_type: BoundaryPolicy::Toroidal,
            seed: None,
            perception_radius: 10.0,
            resource_regeneration: 1.0,
            obstacle_density: 0.05,
            day_cycle: 1000,
        }
    }
}

impl WorldConfig {
    #[inline]
    pub fn width(&self) -> f64 {
        f64::from(self.size[0])
    }

    #[inline]
    pub fn height(&self) -> f64 {
        f64::from(self.size[1])
    }
}

/// Kinematics constants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PhysicsConfig {
    pub gravity: f64,
    pub friction: f64,
    pub energy_conservation: bool,
    pub entropy_increase: bool,
    pub max_speed: f64,
    pub collision_detection: bool,
    pub agent_radius: f64,
    /// Thrust an agent produces at full intensity.
    pub max_force: f64,
    /// Share of relative kinetic energy lost per collision when energy is not conserved.
    pub dissipation: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.0,
            friction: 0.1,
            energy_conservation: true,
            entropy_increase: true,
            max_speed: 2.0,
            collision_detection: true,
            agent_radius: 1.0,
            max_force: 5.0,
            dissipation: 0.1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimeConfig {
    pub dt: f64,
    pub max_steps: u64,
    pub real_time: bool,
    pub target_fps: u32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            max_steps: 10_000,
            real_time: false,
            target_fps: 60,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NeuralNetworkConfig {
    pub input_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub output_size: usize,
    pub activation: Activation,
    pub learning_rate: f64,
}

impl Default for NeuralNetworkConfig {
    fn default() -> Self {
        Self {
            input_size: 20,
            hidden_sizes: vec![32, 16],
            output_size: ACTION_CHANNELS,
            activation: Activation::Tanh,
            learning_rate: 0.01,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    pub capacity: usize,
    /// Per-tick retention factor applied to working-memory strength.
    pub decay_rate: f64,
    pub consolidation: bool,
    pub working_capacity: usize,
    pub consolidation_interval: u64,
    /// Accesses a working trace needs before it is promoted.
    pub consolidation_threshold: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            decay_rate: 0.99,
            consolidation: true,
            working_capacity: 10,
            consolidation_interval: 10,
            consolidation_threshold: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BehaviorConfig {
    pub mutation_rate: f64,
    pub reproduction_threshold: f64,
    /// Fraction of max energy burned per unit of simulated time at rest.
    pub energy_decay: f64,
    pub social_tendency: f64,
    pub initial_energy: f64,
    pub max_energy: f64,
    /// Share of the parent's energy handed to a child.
    pub offspring_energy_share: f64,
    pub reproduction_enabled: bool,
    /// Consecutive hungry ticks an agent survives.
    pub starvation_timeout: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.1,
            reproduction_threshold: 80.0,
            energy_decay: 0.02,
            social_tendency: 0.5,
            initial_energy: 100.0,
            max_energy: 150.0,
            offspring_energy_share: 0.4,
            reproduction_enabled: true,
            starvation_timeout: 300,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct AgentsConfig {
    pub neural_network: NeuralNetworkConfig,
    pub memory: MemoryConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommunicationConfig {
    pub enabled: bool,
    pub range: f64,
    /// Symbols per message.
    pub bandwidth: usize,
    pub noise_level: f64,
    /// Extra activity charged to a broadcasting agent.
    pub cost: f64,
}

impl Default for CommunicationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            range: 10.0,
            bandwidth: 8,
            noise_level: 0.05,
            cost: 0.5,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CultureConfig {
    pub enabled: bool,
    /// Chance per agent per tick of inventing a new root trait.
    pub mutation_rate: f64,
    pub transmission_rate: f64,
    /// Chance that a transmitted copy branches into a new lineage.
    pub innovation_rate: f64,
}

impl Default for CultureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mutation_rate: 0.01,
            transmission_rate: 0.8,
            innovation_rate: 0.05,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EmergenceConfig {
    pub detection_threshold: f64,
    /// Samples kept in the rolling window.
    pub pattern_window: usize,
    pub novelty_threshold: f64,
}

impl Default for EmergenceConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 0.7,
            pattern_window: 100,
            novelty_threshold: 0.5,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SocietyConfig {
    pub communication: CommunicationConfig,
    pub culture: CultureConfig,
    pub emergence: EmergenceConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConsciousnessMetricsConfig {
    pub self_awareness: bool,
    pub creativity: bool,
    pub abstraction: bool,
    pub theory_of_mind: bool,
}

impl Default for ConsciousnessMetricsConfig {
    fn default() -> Self {
        Self {
            self_awareness: true,
            creativity: true,
            abstraction: true,
            theory_of_mind: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataCollectionConfig {
    pub enabled: bool,
    /// Ticks between emergence samples.
    pub interval: u64,
}

impl Default for DataCollectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ObserverConfig {
    /// Raised signals kept in the observer's event history.
    pub max_events: usize,
    pub consciousness_metrics: ConsciousnessMetricsConfig,
    pub data_collection: DataCollectionConfig,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            consciousness_metrics: ConsciousnessMetricsConfig::default(),
            data_collection: DataCollectionConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub physics: PhysicsConfig,
    pub time: TimeConfig,
    pub agents: AgentsConfig,
    pub society: SocietyConfig,
    pub observer: ObserverConfig,
}

/// Named starting points for a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Minimal,
    Standard,
    LargeScale,
    ConsciousnessFocus,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Minimal,
        Preset::Standard,
        Preset::LargeScale,
        Preset::ConsciousnessFocus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Minimal => "minimal",
            Preset::Standard => "standard",
            Preset::LargeScale => "large_scale",
            Preset::ConsciousnessFocus => "consciousness_focus",
        }
    }

    #[must_use]
    pub fn config(self) -> AppConfig {
        let mut config = AppConfig::default();
        match self {
            Preset::Minimal => {
                config.world.max_agents = 10;
                config.world.initial_agents = 10;
                config.world.size = [50, 50];
                config.time.max_steps = 500;
                config.agents.neural_network.hidden_sizes = vec![16];
            }
            Preset::Standard => {}
            Preset::LargeScale => {
                config.world.max_agents = 200;
                config.world.size = [200, 200];
                config.time.max_steps = 50_000;
                config.agents.neural_network.hidden_sizes = vec![64, 32, 16];
            }
            Preset::ConsciousnessFocus => {
                config.agents.neural_network.hidden_sizes = vec![64, 32];
                config.agents.memory.capacity = 200;
                config.observer.consciousness_metrics = ConsciousnessMetricsConfig::default();
            }
        }
        config
    }
}

impl FromStr for Preset {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s.trim().to_lowercase().replace('-', "_"))
            .ok_or_else(|| SimError::config(format!("unknown preset '{s}'")))
    }
}

/// Overlays `overlay` onto `base`, recursing into tables so that only the
/// keys present in the overlay replace the base values.
pub fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        // World validation
        anyhow::ensure!(
            self.world.size[0] > 0 && self.world.size[1] > 0,
            "World size must be positive"
        );
        anyhow::ensure!(self.world.max_agents > 0, "max_agents must be positive");
        anyhow::ensure!(
            self.world.initial_agents <= self.world.max_agents,
            "initial_agents ({}) exceeds max_agents ({})",
            self.world.initial_agents,
            self.world.max_agents
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.world.resource_density),
            "resource_density must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.world.interaction_radius > 0.0,
            "interaction_radius must be positive"
        );
        anyhow::ensure!(
            self.world.perception_radius > 0.0,
            "perception_radius must be positive"
        );
        anyhow::ensure!(
            self.world.resource_regeneration >= 0.0,
            "resource_regeneration must be non-negative"
        );
        anyhow::ensure!(
            (0.0..=0.5).contains(&self.world.obstacle_density),
            "obstacle_density must be in [0.0, 0.5]"
        );
        anyhow::ensure!(self.world.day_cycle > 0, "day_cycle must be positive");

        // Physics validation
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.physics.friction),
            "friction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(self.physics.max_speed > 0.0, "max_speed must be positive");
        anyhow::ensure!(
            self.physics.agent_radius > 0.0,
            "agent_radius must be positive"
        );
        anyhow::ensure!(self.physics.max_force >= 0.0, "max_force must be non-negative");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.physics.dissipation),
            "dissipation must be in [0.0, 1.0]"
        );
        anyhow::ensure!(self.physics.gravity.is_finite(), "gravity must be finite");

        // Time validation
        anyhow::ensure!(
            self.time.dt > 0.0 && self.time.dt.is_finite(),
            "dt must be positive"
        );
        anyhow::ensure!(self.time.target_fps > 0, "target_fps must be positive");

        // Agent validation
        let nn = &self.agents.neural_network;
        anyhow::ensure!(nn.input_size > 0, "input_size must be positive");
        anyhow::ensure!(
            nn.output_size >= ACTION_CHANNELS,
            "output_size must be at least {ACTION_CHANNELS}"
        );
        anyhow::ensure!(
            nn.hidden_sizes.iter().all(|&h| h > 0),
            "hidden layer sizes must be positive"
        );
        anyhow::ensure!(nn.learning_rate >= 0.0, "learning_rate must be non-negative");

        let memory = &self.agents.memory;
        anyhow::ensure!(memory.capacity > 0, "memory capacity must be positive");
        anyhow::ensure!(
            memory.working_capacity > 0,
            "working memory capacity must be positive"
        );
        anyhow::ensure!(
            memory.decay_rate > 0.0 && memory.decay_rate <= 1.0,
            "memory decay_rate must be in (0.0, 1.0]"
        );
        anyhow::ensure!(
            memory.consolidation_interval > 0,
            "consolidation_interval must be positive"
        );

        let behavior = &self.agents.behavior;
        anyhow::ensure!(
            (0.0..=1.0).contains(&behavior.mutation_rate),
            "mutation_rate must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            behavior.reproduction_threshold > 0.0,
            "reproduction_threshold must be positive"
        );
        anyhow::ensure!(behavior.energy_decay >= 0.0, "energy_decay must be non-negative");
        anyhow::ensure!(
            (0.0..=1.0).contains(&behavior.social_tendency),
            "social_tendency must be in [0.0, 1.0]"
        );
        anyhow::ensure!(behavior.max_energy > 0.0, "max_energy must be positive");
        anyhow::ensure!(
            behavior.initial_energy > 0.0 && behavior.initial_energy <= behavior.max_energy,
            "initial_energy must be in (0.0, max_energy]"
        );
        anyhow::ensure!(
            behavior.offspring_energy_share > 0.0 && behavior.offspring_energy_share < 1.0,
            "offspring_energy_share must be in (0.0, 1.0)"
        );

        // Society validation
        let comm = &self.society.communication;
        anyhow::ensure!(comm.range >= 0.0, "communication range must be non-negative");
        anyhow::ensure!(comm.bandwidth > 0, "communication bandwidth must be positive");
        anyhow::ensure!(comm.noise_level >= 0.0, "noise_level must be non-negative");
        anyhow::ensure!(comm.cost >= 0.0, "communication cost must be non-negative");

        let culture = &self.society.culture;
        for (name, rate) in [
            ("culture mutation_rate", culture.mutation_rate),
            ("transmission_rate", culture.transmission_rate),
            ("innovation_rate", culture.innovation_rate),
        ] {
            anyhow::ensure!((0.0..=1.0).contains(&rate), "{name} must be in [0.0, 1.0]");
        }

        let emergence = &self.society.emergence;
        anyhow::ensure!(
            emergence.pattern_window >= 2,
            "pattern_window must hold at least 2 samples"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&emergence.detection_threshold),
            "detection_threshold must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&emergence.novelty_threshold),
            "novelty_threshold must be in [0.0, 1.0]"
        );

        anyhow::ensure!(
            self.observer.data_collection.interval > 0,
            "data collection interval must be positive"
        );

        Ok(())
    }

    /// Parses user TOML over the defaults and validates the result.
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::from_toml_with_base(content, &AppConfig::default())
    }

    /// Parses user TOML over `base`, key by key, and validates the result.
    pub fn from_toml_with_base(content: &str, base: &AppConfig) -> Result<Self> {
        let overlay: toml::Value = toml::from_str(content)?;
        let mut merged = toml::Value::try_from(base)
            .map_err(|e| SimError::config(format!("cannot serialize base config: {e}")))?;
        merge_values(&mut merged, overlay);
        let config: AppConfig = merged.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration file over `base`.
    pub fn load(path: &Path, base: &AppConfig) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SimError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_with_base(&content, base)
            .map_err(|e| e.with_context(format!("loading {}", path.display())))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SimError::config(format!("cannot serialize config: {e}")))
    }

    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.world).as_bytes());
        hasher.update(format!("{:?}", self.physics).as_bytes());
        hasher.update(format!("{:?}", self.time).as_bytes());
        hasher.update(format!("{:?}", self.agents).as_bytes());
        hasher.update(format!("{:?}", self.society).as_bytes());
        hasher.update(format!("{:?}", self.observer).as_bytes());
        hex::encode(hasher.finalize())
    }
}
