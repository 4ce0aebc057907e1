use crate::physics::EntropyLedger;
use cogverse_data::{AgentId, Signal, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frozen per-tick view of one agent, read by every parallel phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub energy: f64,
    pub max_energy: f64,
    pub health: f64,
    pub max_health: f64,
    pub age: u64,
    pub generation: u32,
    pub offspring: u64,
    pub social_interactions: u64,
    /// Mean expression of the agent's cultural traits, 0 when it knows none.
    pub culture_expression: f64,
}

impl AgentSnapshot {
    pub fn energy_ratio(&self) -> f64 {
        if self.max_energy <= 0.0 {
            0.0
        } else {
            (self.energy / self.max_energy).clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Range {
    /// Zeroes for an empty input.
    pub fn of<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            min,
            max,
            mean: sum / count as f64,
        }
    }
}

/// Point-in-time status of a run, printed by the runner and serialized with
/// `--json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusReport {
    pub tick: u64,
    pub time: f64,
    pub population: usize,
    pub age: Range,
    pub energy: Range,
    pub health: Range,
    pub total_offspring: u64,
    pub max_offspring: u64,
    /// Agent with the most social interactions and its count.
    pub most_social: Option<(AgentId, u64)>,
    /// Oldest agent and its age in ticks.
    pub oldest: Option<(AgentId, u64)>,
    pub resource_count: usize,
    pub resource_value: f64,
    /// Mean temperature over the climate grid.
    pub temperature: f64,
    pub births: usize,
    pub deaths: usize,
    pub total_interactions: u64,
    pub known_traits: usize,
    pub entropy: EntropyLedger,
    pub signals: Vec<Signal>,
}

impl StatusReport {
    /// Fills the population statistics from the agent view. Ties pick the
    /// lowest id.
    pub fn with_agents(mut self, agents: &[AgentSnapshot]) -> Self {
        self.population = agents.len();
        self.age = Range::of(agents.iter().map(|a| a.age as f64));
        self.energy = Range::of(agents.iter().map(|a| a.energy));
        self.health = Range::of(agents.iter().map(|a| a.health));
        self.total_offspring = agents.iter().map(|a| a.offspring).sum();
        self.max_offspring = agents.iter().map(|a| a.offspring).max().unwrap_or(0);
        self.most_social = agents
            .iter()
            .map(|a| (a.id, a.social_interactions))
            .reduce(|best, next| if next.1 > best.1 { next } else { best });
        self.oldest = agents
            .iter()
            .map(|a| (a.id, a.age))
            .reduce(|best, next| if next.1 > best.1 { next } else { best });
        self
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "tick {} (t={:.1}) population {} (+{} / -{})",
            self.tick, self.time, self.population, self.births, self.deaths
        )?;
        writeln!(
            f,
            "  energy {:.1}..{:.1} (mean {:.1})  health {:.1}..{:.1} (mean {:.1})  age max {:.0}",
            self.energy.min,
            self.energy.max,
            self.energy.mean,
            self.health.min,
            self.health.max,
            self.health.mean,
            self.age.max
        )?;
        writeln!(
            f,
            "  offspring {} (max {})  interactions {}  traits {}",
            self.total_offspring, self.max_offspring, self.total_interactions, self.known_traits
        )?;
        if let Some((id, count)) = self.most_social {
            writeln!(f, "  most social {id} ({count})")?;
        }
        if let Some((id, age)) = self.oldest {
            writeln!(f, "  oldest {id} ({age} ticks)")?;
        }
        write!(
            f,
            "  resources {} ({:.1})  temperature {:.1}  entropy {:.3}",
            self.resource_count,
            self.resource_value,
            self.temperature,
            self.entropy.spatial_entropy
        )?;
        if !self.signals.is_empty() {
            let names: Vec<String> = self.signals.iter().map(ToString::to_string).collect();
            write!(f, "  signals [{}]", names.join(", "))?;
        }
        Ok(())
    }
}
