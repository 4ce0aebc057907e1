use crate::brain::BrainLogic;
use crate::config::AppConfig;
use crate::economy::Offspring;
use cogverse_data::{
    AgentId, BehaviorTraits, Brain, Genome, Identity, MemoryState, Position, SocialState, TraitId,
    Vec2, Velocity, Vitals,
};
use rand::Rng;
use std::collections::BTreeSet;

/// Every component of one agent, ready to be spawned into the registry.
#[derive(Debug, Clone)]
pub struct AgentRecord {
    pub identity: Identity,
    pub position: Position,
    pub velocity: Velocity,
    pub vitals: Vitals,
    pub genome: Genome,
    pub memory: MemoryState,
    pub social: SocialState,
}

impl AgentRecord {
    pub fn into_components(
        self,
    ) -> (
        Identity,
        Position,
        Velocity,
        Vitals,
        Genome,
        MemoryState,
        SocialState,
    ) {
        (
            self.identity,
            self.position,
            self.velocity,
            self.vitals,
            self.genome,
            self.memory,
            self.social,
        )
    }
}

pub fn random_genome<R: Rng>(config: &AppConfig, rng: &mut R) -> Genome {
    let traits = BehaviorTraits::from_array([
        rng.gen_range(0.0..1.0),
        rng.gen_range(0.0..1.0),
        rng.gen_range(0.0..1.0),
        rng.gen_range(0.0..1.0),
    ]);
    Genome {
        brain: Brain::new_random_with_rng(&config.agents.neural_network, rng),
        traits,
    }
}

/// A founder agent with a random genome.
pub fn create_agent_with_rng<R: Rng>(
    id: AgentId,
    position: Vec2,
    tick: u64,
    config: &AppConfig,
    rng: &mut R,
) -> AgentRecord {
    let behavior = &config.agents.behavior;
    AgentRecord {
        identity: Identity {
            id,
            parent: None,
            generation: 0,
            birth_tick: tick,
        },
        position: Position(position),
        velocity: Velocity(Vec2::ZERO),
        vitals: Vitals::new(behavior.initial_energy.min(behavior.max_energy), behavior.max_energy),
        genome: random_genome(config, rng),
        memory: MemoryState::default(),
        social: SocialState::default(),
    }
}

/// The agent built from a reproduction outcome.
pub fn create_child(
    id: AgentId,
    parent: &Identity,
    offspring: Offspring,
    known_traits: BTreeSet<TraitId>,
    tick: u64,
    config: &AppConfig,
) -> AgentRecord {
    AgentRecord {
        identity: Identity {
            id,
            parent: Some(parent.id),
            generation: parent.generation + 1,
            birth_tick: tick,
        },
        position: Position(offspring.position),
        velocity: Velocity(Vec2::ZERO),
        vitals: Vitals::new(offspring.energy, config.agents.behavior.max_energy),
        genome: offspring.genome,
        memory: MemoryState::default(),
        social: SocialState {
            known_traits,
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_founder_uses_configured_energy() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = AppConfig::default();
        let agent = create_agent_with_rng(AgentId(7), Vec2::new(1.0, 2.0), 0, &config, &mut rng);
        assert_eq!(agent.identity.id, AgentId(7));
        assert_eq!(agent.vitals.energy, 100.0);
        assert_eq!(agent.vitals.max_energy, 150.0);
        assert_eq!(agent.genome.brain.input_size(), config.agents.neural_network.input_size);
    }

    #[test]
    fn test_child_records_ancestry() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let config = AppConfig::default();
        let parent = create_agent_with_rng(AgentId(1), Vec2::ZERO, 0, &config, &mut rng);
        let offspring = Offspring {
            genome: parent.genome.clone(),
            position: Vec2::new(3.0, 3.0),
            energy: 40.0,
        };
        let child =
            create_child(AgentId(9), &parent.identity, offspring, BTreeSet::new(), 12, &config);
        assert_eq!(child.identity.parent, Some(AgentId(1)));
        assert_eq!(child.identity.generation, 1);
        assert_eq!(child.identity.birth_tick, 12);
        assert_eq!(child.vitals.energy, 40.0);
    }
}
