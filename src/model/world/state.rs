use crate::model::world::World;
use cogverse_core::cognition::{Decision, Percept};
use cogverse_core::snapshot::{AgentSnapshot, StatusReport};
use cogverse_data::{
    AgentId, Genome, Identity, MemoryState, Position, SocialState, Velocity, Vitals,
};

pub type AgentComponents<'a> = (
    &'a Identity,
    &'a Position,
    &'a Velocity,
    &'a Vitals,
    &'a SocialState,
);

/// One agent's output of the parallel phase.
#[derive(Debug, Clone)]
pub struct Intent {
    pub handle: hecs::Entity,
    pub percept: Percept,
    pub decision: Decision,
}

impl World {
    /// Live agent handles in ascending id order.
    pub fn sorted_handles(&self) -> Vec<hecs::Entity> {
        let mut data: Vec<_> = self
            .ecs
            .query::<&Identity>()
            .iter()
            .map(|(h, i)| (h, i.id))
            .collect();
        data.sort_by_key(|d| d.1);
        data.into_iter().map(|d| d.0).collect()
    }

    pub fn population(&self) -> usize {
        self.ecs.query::<&Identity>().iter().count()
    }

    /// Current view of every live agent, sorted by id.
    pub fn agent_snapshots(&self) -> Vec<AgentSnapshot> {
        let mut snapshots: Vec<AgentSnapshot> = self
            .ecs
            .query::<AgentComponents>()
            .iter()
            .map(|(_, (identity, position, velocity, vitals, social))| AgentSnapshot {
                id: identity.id,
                position: position.0,
                velocity: velocity.0,
                energy: vitals.energy,
                max_energy: vitals.max_energy,
                health: vitals.health,
                max_health: vitals.max_health,
                age: vitals.age,
                generation: identity.generation,
                offspring: social.offspring,
                social_interactions: social.social_interactions,
                culture_expression: self.culture.expression_mean(&social.known_traits),
            })
            .collect();
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }

    pub(crate) fn capture_snapshots(&mut self) {
        self.snapshots = self.agent_snapshots();
    }

    pub(crate) fn frozen_snapshots(&self) -> &[AgentSnapshot] {
        &self.snapshots
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agent_snapshots().into_iter().map(|s| s.id).collect()
    }

    pub fn genome(&self, id: AgentId) -> Option<Genome> {
        self.find(id)
            .and_then(|h| self.ecs.get::<&Genome>(h).ok().map(|g| (*g).clone()))
    }

    pub fn memory(&self, id: AgentId) -> Option<MemoryState> {
        self.find(id)
            .and_then(|h| self.ecs.get::<&MemoryState>(h).ok().map(|m| (*m).clone()))
    }

    pub fn social(&self, id: AgentId) -> Option<SocialState> {
        self.find(id)
            .and_then(|h| self.ecs.get::<&SocialState>(h).ok().map(|s| (*s).clone()))
    }

    fn find(&self, id: AgentId) -> Option<hecs::Entity> {
        self.ecs
            .query::<&Identity>()
            .iter()
            .find(|(_, i)| i.id == id)
            .map(|(h, _)| h)
    }

    /// The reporting contract of a run, as of the last completed tick.
    pub fn status(&self) -> StatusReport {
        let agents = self.agent_snapshots();
        StatusReport {
            tick: self.tick(),
            time: self.time.current_time(),
            resource_count: self.space.resources().len(),
            resource_value: self.space.total_resource_value(),
            temperature: self.space.mean_temperature(),
            births: self.last_births,
            deaths: self.last_deaths,
            total_interactions: self.total_interactions,
            known_traits: self.culture.len(),
            entropy: self.entropy,
            signals: self.last_signals.clone(),
            ..StatusReport::default()
        }
        .with_agents(&agents)
    }
}
