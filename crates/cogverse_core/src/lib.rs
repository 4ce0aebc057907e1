//! # Cogverse Core
//!
//! The deterministic building blocks of the simulation:
//! - configuration, validation and presets
//! - the bounded 2D space with its terrain, climate, resources and proximity
//!   index
//! - kinematics, collisions and the entropy ledger
//! - feed-forward brains, memory, perception and decisions
//! - the energy economy, reproduction and mortality
//! - communication and cultural transmission
//! - time management, status reports, metrics and logging
//!
//! The tick pipeline that ties these together lives in the `cogverse` root
//! package.
//!
//! ## Example
//!
//! ```
//! use cogverse_core::brain::BrainLogic;
//! use cogverse_core::config::NeuralNetworkConfig;
//! use cogverse_data::Brain;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let brain = Brain::new_random_with_rng(&NeuralNetworkConfig::default(), &mut rng);
//!
//! let activations = brain.forward(&[0.5; 20]);
//! assert_eq!(activations.outputs.len(), 8);
//! ```

/// Feed-forward networks, learning and mutation
pub mod brain;
/// Perception and decision making
pub mod cognition;
/// Configuration management for simulation parameters
pub mod config;
/// Energy, health, feeding, reproduction and mortality
pub mod economy;
/// Terrain obstacles and climate
pub mod environment;
pub mod error;
/// Agent construction for founders and offspring
pub mod lifecycle;
/// Working, long-term and spatial memory
pub mod memory;
/// Run counters and logging setup
pub mod metrics;
pub mod physics;
/// Deterministic per-agent random streams
pub mod rng;
/// Communication and culture
pub mod society;
/// Frozen agent views and status reports
pub mod snapshot;
pub mod space;
/// Spatial hashing for proximity queries
pub mod spatial_hash;
pub mod time;

pub use brain::BrainLogic;
pub use config::{AppConfig, Preset};
pub use error::{Result, SimError};
pub use memory::MemoryLogic;
pub use metrics::{init_logging, Metrics};
pub use snapshot::{AgentSnapshot, StatusReport};
pub use space::SpatialWorld;
pub use time::TimeManager;
