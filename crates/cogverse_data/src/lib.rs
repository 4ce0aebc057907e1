//! # Cogverse Data
//!
//! Plain data shared by the simulation crates: agent components, genomes,
//! memory records, resources, cultural traits and emergence samples.
//!
//! Nothing in here owns behavior beyond small accessors; the logic that moves
//! these values forward lives in `cogverse_core`.

pub mod data;

pub use data::agent::{AgentId, Identity, Position, SocialState, Velocity, Vitals};
pub use data::genome::{Activation, BehaviorTraits, Brain, Genome, Layer};
pub use data::geometry::Vec2;
pub use data::memory::{
    LongTermItem, MemoryState, MemorySummary, MemoryTrace, Observation, ObservationKind,
    SpatialMemory,
};
pub use data::world::{
    ActionKind, BoundaryPolicy, CulturalTrait, EmergenceSample, Message, Resource, ResourceId,
    Signal, TraitId,
};
