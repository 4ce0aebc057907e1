mod common;

use common::{AgentBuilder, WorldBuilder};

#[test]
fn test_population_books_balance_every_tick() {
    let mut world = WorldBuilder::new()
        .with_seed(2024)
        .with_config(|c| {
            c.world.size = [40, 40];
            c.world.initial_agents = 20;
            c.world.max_agents = 30;
            c.world.resource_density = 0.2;
            c.agents.behavior.reproduction_threshold = 60.0;
        })
        .build();

    for _ in 0..300 {
        let before = world.population();
        let outcome = world.step().unwrap();
        assert_eq!(outcome.population, before + outcome.births - outcome.deaths);
        assert_eq!(outcome.population, world.population());
        assert!(outcome.population <= 30);
    }
}

#[test]
fn test_population_never_exceeds_cap() {
    let mut world = WorldBuilder::new()
        .with_seed(5)
        .with_config(|c| {
            c.world.size = [20, 20];
            c.world.initial_agents = 10;
            c.world.max_agents = 10;
            c.world.resource_density = 0.5;
            c.agents.behavior.reproduction_threshold = 1.0;
        })
        .build();

    for _ in 0..100 {
        world.step().unwrap();
        assert!(world.population() <= 10);
    }
}

#[test]
fn test_dead_agents_leave_the_registry() {
    let mut world = WorldBuilder::new()
        .with_agent(AgentBuilder::new().at(5.0, 5.0).energy(0.1))
        .with_agent(AgentBuilder::new().at(50.0, 50.0).energy(100.0))
        .build();

    let outcome = world.step().unwrap();
    assert_eq!(outcome.deaths, 1);
    assert_eq!(world.population(), 1);
    let ids = world.agent_ids();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].0, 1);
    assert!(world.genome(cogverse_data::AgentId(0)).is_none());
}

#[test]
fn test_ids_are_never_reused() {
    let mut world = WorldBuilder::new()
        .with_seed(77)
        .with_config(|c| {
            c.world.initial_agents = 15;
            c.world.max_agents = 40;
            c.world.resource_density = 0.3;
            c.agents.behavior.reproduction_threshold = 50.0;
        })
        .build();

    let mut highest = world.agent_ids().last().map(|id| id.0);
    for _ in 0..200 {
        let before = world.agent_ids();
        world.step().unwrap();
        for id in world.agent_ids() {
            if !before.contains(&id) {
                assert!(Some(id.0) > highest, "id {} reused", id.0);
                highest = Some(id.0);
            }
        }
    }
}

#[test]
fn test_non_finite_agent_is_zeroed_and_removed() {
    let mut world = WorldBuilder::new()
        .with_agent(AgentBuilder::new().at(20.0, 20.0).moving(f64::NAN, 0.0))
        .with_agent(AgentBuilder::new().at(60.0, 60.0).energy(100.0))
        .build();

    let outcome = world.step().unwrap();
    assert_eq!(outcome.deaths, 1);
    assert_eq!(world.population(), 1);
    assert_eq!(world.agent_ids(), vec![cogverse_data::AgentId(1)]);
    assert!(world.metrics.numeric_faults() >= 1);
    assert!(world.last_physics.kinetic_before.is_finite());

    world.run(5).unwrap();
    for snapshot in world.agent_snapshots() {
        assert!(snapshot.position.is_finite());
        assert!(snapshot.velocity.is_finite());
    }
}
