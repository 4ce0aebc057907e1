use super::geometry::Vec2;
use super::world::{ActionKind, Message, TraitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique, monotonically assigned agent identifier.
///
/// Ids are never reused within a run, so ordering by id is ordering by birth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Identity and ancestry of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: AgentId,
    pub parent: Option<AgentId>,
    pub generation: u32,
    pub birth_tick: u64,
}

/// World position of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position(pub Vec2);

/// Velocity of an agent in world units per unit of simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

/// Energy, health and age bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vitals {
    pub energy: f64,
    pub max_energy: f64,
    pub health: f64,
    pub max_health: f64,
    /// Age in ticks.
    pub age: u64,
    /// Consecutive ticks spent below the hunger line.
    pub ticks_starving: u64,
    /// Set when physics or cognition produced non-finite values.
    pub faulted: bool,
}

impl Vitals {
    pub fn new(energy: f64, max_energy: f64) -> Self {
        Self {
            energy,
            max_energy,
            health: 100.0,
            max_health: 100.0,
            age: 0,
            ticks_starving: 0,
            faulted: false,
        }
    }

    #[inline]
    pub fn energy_ratio(&self) -> f64 {
        if self.max_energy > 0.0 {
            (self.energy / self.max_energy).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    #[inline]
    pub fn health_ratio(&self) -> f64 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Social bookkeeping: counters, learned culture and the message inbox.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialState {
    pub social_interactions: u64,
    pub offspring: u64,
    /// Cultural traits this agent has learned, by id. The traits themselves
    /// live in the world's registry.
    pub known_traits: BTreeSet<TraitId>,
    /// Messages received during the previous tick.
    pub inbox: Vec<Message>,
    pub last_action: ActionKind,
    pub resources_consumed: f64,
    pub distance_travelled: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_ratio_is_clamped() {
        let mut vitals = Vitals::new(200.0, 150.0);
        assert_eq!(vitals.energy_ratio(), 1.0);
        vitals.energy = -5.0;
        assert_eq!(vitals.energy_ratio(), 0.0);
    }

    #[test]
    fn test_agent_id_ordering_follows_value() {
        assert!(AgentId(3) < AgentId(10));
        assert_eq!(AgentId(7).to_string(), "agent-7");
    }
}
