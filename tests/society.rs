mod common;

use common::{AgentBuilder, WorldBuilder};

fn crowded(seed: u64) -> cogverse_lib::World {
    WorldBuilder::new()
        .with_seed(seed)
        .with_size(20, 20)
        .with_config(|c| {
            c.world.initial_agents = 20;
            c.world.max_agents = 20;
            c.world.resource_density = 0.1;
            c.agents.behavior.reproduction_enabled = false;
            c.society.communication.range = 15.0;
        })
        .build()
}

#[test]
fn test_crowded_agents_talk() {
    let mut world = crowded(5);
    for _ in 0..60 {
        world.step().unwrap();
    }
    assert!(world.total_interactions() > 0);
    assert!(world.agent_snapshots().iter().any(|a| a.social_interactions > 0));
}

#[test]
fn test_every_delivery_counts_for_both_ends() {
    let mut world = crowded(6);
    for _ in 0..40 {
        world.step().unwrap();
    }
    assert_eq!(world.population(), 20, "nobody should die this early");
    let per_agent: u64 = world
        .agent_snapshots()
        .iter()
        .map(|a| a.social_interactions)
        .sum();
    assert_eq!(per_agent, 2 * world.total_interactions());
}

#[test]
fn test_known_traits_are_registered() {
    let mut world = WorldBuilder::new()
        .with_seed(12)
        .with_size(25, 25)
        .with_config(|c| {
            c.world.initial_agents = 15;
            c.world.max_agents = 30;
            c.society.culture.innovation_rate = 0.05;
        })
        .build();
    for _ in 0..150 {
        world.step().unwrap();
    }
    for id in world.agent_ids() {
        let social = world.social(id).unwrap();
        for known in &social.known_traits {
            assert!(world.culture.get(*known).is_some(), "{id} knows unregistered {known:?}");
        }
    }
    assert_eq!(world.status().known_traits, world.culture.len());
}

#[test]
fn test_traits_die_with_their_last_holder() {
    let mut world = WorldBuilder::new()
        .with_agent(AgentBuilder::new().at(5.0, 5.0).energy(0.1))
        .with_agent(AgentBuilder::new().at(60.0, 60.0).energy(100.0))
        .with_config(|c| {
            c.society.communication.enabled = false;
            c.society.culture.mutation_rate = 1.0;
            c.agents.behavior.reproduction_enabled = false;
        })
        .build();

    let outcome = world.step().unwrap();
    assert_eq!(outcome.deaths, 1);
    let survivor = world.agent_ids()[0];
    let known = world.social(survivor).unwrap().known_traits.clone();
    assert_eq!(known.len(), 1);
    assert_eq!(world.culture.len(), 1);
    assert!(world.culture.iter().all(|t| known.contains(&t.id)));
}
