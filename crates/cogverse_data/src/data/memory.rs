use super::geometry::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObservationKind {
    Resource,
    Agent,
    Message,
    Feeding,
    Cooperation,
    Offspring,
}

/// Something an agent perceived or experienced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObservationKind,
    pub position: Vec2,
    /// Salience in [-1, 1]; the sign carries the emotional valence.
    pub value: f64,
    pub tick: u64,
}

/// Working-memory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryTrace {
    pub observation: Observation,
    pub strength: f64,
    pub accesses: u32,
    pub consolidated: bool,
}

/// Long-term store entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermItem {
    pub observation: Observation,
    pub importance: f64,
    pub accesses: u32,
}

/// A remembered location and how valuable it seemed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialMemory {
    pub kind: ObservationKind,
    pub position: Vec2,
    pub value: f64,
    pub tick: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub working: VecDeque<MemoryTrace>,
    pub long_term: Vec<LongTermItem>,
    pub spatial: Vec<SpatialMemory>,
}

/// Normalized features of a memory state, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub working_fill: f64,
    pub long_term_fill: f64,
    pub mean_importance: f64,
    pub spatial_coverage: f64,
}
