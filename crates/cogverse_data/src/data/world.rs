use super::agent::AgentId;
use super::geometry::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How the world edges treat agents that cross them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Coordinates wrap modulo the world size.
    #[default]
    Toroidal,
    /// The velocity component normal to the edge is negated on contact.
    Reflective,
    /// Positions are clamped and the velocity on that axis is zeroed.
    Absorbing,
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoundaryPolicy::Toroidal => "toroidal",
            BoundaryPolicy::Reflective => "reflective",
            BoundaryPolicy::Absorbing => "absorbing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u64);

/// A consumable, regrowing resource patch. Owned by the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub position: Vec2,
    pub value: f64,
    pub max_value: f64,
    /// Value regained per unit of simulated time.
    pub regeneration_rate: f64,
}

impl Resource {
    /// Removes up to `requested` from the patch and returns what was taken.
    pub fn consume(&mut self, requested: f64) -> f64 {
        let taken = requested.max(0.0).min(self.value.max(0.0));
        self.value -= taken;
        taken
    }

    pub fn regenerate(&mut self, dt: f64, scale: f64) {
        if self.value < self.max_value {
            self.value = (self.value + self.regeneration_rate * scale * dt).min(self.max_value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraitId(pub u64);

/// A transmissible unit of learned behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CulturalTrait {
    pub id: TraitId,
    pub origin: AgentId,
    /// Trait this one branched from, if it arose as a mutated copy.
    pub parent: Option<TraitId>,
    /// Number of branchings between this trait and its root.
    pub lineage_depth: u32,
    pub transmissions: u64,
    /// Behavioral bias in [-1, 1] applied to social drives.
    pub expression: f64,
    pub created_tick: u64,
}

/// A quantized broadcast as received, after noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: AgentId,
    pub sender_position: Vec2,
    pub symbols: Vec<f32>,
}

/// Dominant primitive an agent chose in a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ActionKind {
    #[default]
    Move,
    Eat,
    Communicate,
    Reproduce,
    Cooperate,
    Rest,
    Explore,
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::Move,
        ActionKind::Eat,
        ActionKind::Communicate,
        ActionKind::Reproduce,
        ActionKind::Cooperate,
        ActionKind::Rest,
        ActionKind::Explore,
    ];

    /// Network output channel that drives this action, if any.
    pub fn output_channel(self) -> Option<usize> {
        match self {
            ActionKind::Move => None,
            ActionKind::Eat => Some(2),
            ActionKind::Communicate => Some(3),
            ActionKind::Reproduce => Some(4),
            ActionKind::Cooperate => Some(5),
            ActionKind::Rest => Some(6),
            ActionKind::Explore => Some(7),
        }
    }
}

/// Population-level proxies watched by the emergence observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    SelfAwareness,
    Creativity,
    Abstraction,
    TheoryOfMind,
}

impl Signal {
    pub const ALL: [Signal; 4] = [
        Signal::SelfAwareness,
        Signal::Creativity,
        Signal::Abstraction,
        Signal::TheoryOfMind,
    ];
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::SelfAwareness => "self_awareness",
            Signal::Creativity => "creativity",
            Signal::Abstraction => "abstraction",
            Signal::TheoryOfMind => "theory_of_mind",
        };
        f.write_str(name)
    }
}

/// One aggregate observation of the population.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmergenceSample {
    pub tick: u64,
    pub population: usize,
    pub mean_complexity: f64,
    pub mean_energy: f64,
    /// Normalized diversity of behavior and brain complexity, in [0, 1].
    pub diversity: f64,
    /// Mean long-term memory salience, in [0, 1].
    pub memory_salience: f64,
    /// Share of known cultural traits that are mutated branches, in [0, 1].
    pub cultural_innovation: f64,
    /// Mean absolute network weight, clamped to [0, 1].
    pub abstraction: f64,
    /// Share of agents with at least one social interaction.
    pub social_reach: f64,
    /// Signals raised when this sample was taken.
    pub signals: BTreeSet<Signal>,
}
