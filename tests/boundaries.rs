mod common;

use common::{AgentBuilder, WorldBuilder};
use cogverse_core::config::{PhysicsConfig, WorldConfig};
use cogverse_core::physics::{advance, Kinematics};
use cogverse_core::space::SpatialWorld;
use cogverse_data::{AgentId, BoundaryPolicy, Vec2};
use proptest::prelude::*;

const WIDTH: u32 = 80;
const HEIGHT: u32 = 60;

fn space(boundary: BoundaryPolicy) -> SpatialWorld {
    SpatialWorld::new(&WorldConfig {
        size: [WIDTH, HEIGHT],
        boundary_type: boundary,
        ..Default::default()
    })
}

/// No friction and no speed cap, so one step is a pure displacement.
fn free_flight() -> PhysicsConfig {
    PhysicsConfig {
        friction: 0.0,
        max_speed: 1_000.0,
        gravity: 0.0,
        ..Default::default()
    }
}

fn body(x: f64, y: f64, vx: f64, vy: f64) -> Kinematics {
    Kinematics {
        position: Vec2::new(x, y),
        velocity: Vec2::new(vx, vy),
    }
}

fn drift(space: &SpatialWorld, start: Kinematics, dt: f64) -> Kinematics {
    let (next, _) = advance(AgentId(1), start, Vec2::ZERO, &free_flight(), space, dt).unwrap();
    next
}

proptest! {
    #[test]
    fn toroidal_positions_wrap_modulo_the_world(
        x in 0.0f64..80.0,
        y in 0.0f64..60.0,
        vx in -200.0f64..200.0,
        vy in -200.0f64..200.0,
        dt in 0.01f64..1.0,
    ) {
        let space = space(BoundaryPolicy::Toroidal);
        let next = drift(&space, body(x, y, vx, vy), dt);

        let w = f64::from(WIDTH);
        let h = f64::from(HEIGHT);
        prop_assert!((0.0..w).contains(&next.position.x));
        prop_assert!((0.0..h).contains(&next.position.y));

        let ex = (x + vx * dt).rem_euclid(w);
        let ey = (y + vy * dt).rem_euclid(h);
        let dx = (next.position.x - ex).abs();
        let dy = (next.position.y - ey).abs();
        prop_assert!(dx < 1e-9 || (w - dx) < 1e-9, "x {} vs {}", next.position.x, ex);
        prop_assert!(dy < 1e-9 || (h - dy) < 1e-9, "y {} vs {}", next.position.y, ey);
        prop_assert_eq!(next.velocity, Vec2::new(vx, vy));
    }

    #[test]
    fn reflective_edges_keep_bodies_inside(
        x in 0.0f64..80.0,
        y in 0.0f64..60.0,
        vx in -50.0f64..50.0,
        vy in -50.0f64..50.0,
    ) {
        let space = space(BoundaryPolicy::Reflective);
        let next = drift(&space, body(x, y, vx, vy), 1.0);
        prop_assert!(space.contains(next.position));
        prop_assert!((next.velocity.x.abs() - vx.abs()).abs() < 1e-9);
        prop_assert!((next.velocity.y.abs() - vy.abs()).abs() < 1e-9);
    }

    #[test]
    fn absorbing_edges_clamp_and_stop(
        x in 0.0f64..80.0,
        y in 0.0f64..60.0,
        vx in -200.0f64..200.0,
        vy in -200.0f64..200.0,
    ) {
        let space = space(BoundaryPolicy::Absorbing);
        let next = drift(&space, body(x, y, vx, vy), 1.0);
        prop_assert!(space.contains(next.position));
        let crossed_x = !(0.0..=f64::from(WIDTH)).contains(&(x + vx));
        if crossed_x {
            prop_assert_eq!(next.velocity.x, 0.0);
        } else {
            prop_assert_eq!(next.velocity.x, vx);
        }
    }
}

#[test]
fn test_reflective_wall_negates_normal_velocity() {
    let space = space(BoundaryPolicy::Reflective);
    let (next, _) = advance(
        AgentId(1),
        body(79.0, 30.0, 3.0, 1.0),
        Vec2::ZERO,
        &free_flight(),
        &space,
        1.0,
    )
    .unwrap();
    assert!((next.position.x - 78.0).abs() < 1e-9);
    assert_eq!(next.velocity, Vec2::new(-3.0, 1.0));
}

#[test]
fn test_agents_stay_inside_every_boundary_policy() {
    for boundary in [
        BoundaryPolicy::Toroidal,
        BoundaryPolicy::Reflective,
        BoundaryPolicy::Absorbing,
    ] {
        let mut world = WorldBuilder::new()
            .with_seed(19)
            .with_size(WIDTH, HEIGHT)
            .with_boundary(boundary)
            .with_config(|c| {
                c.world.initial_agents = 15;
                c.world.resource_density = 0.05;
            })
            .build();
        for _ in 0..100 {
            world.step().unwrap();
            for agent in world.agent_snapshots() {
                assert!(
                    world.space.contains(agent.position),
                    "{boundary:?} let {} escape to {:?}",
                    agent.id,
                    agent.position
                );
            }
        }
    }
}

#[test]
fn test_kinetic_energy_is_fully_accounted() {
    let mut world = WorldBuilder::new()
        .with_seed(77)
        .with_size(40, 40)
        .with_config(|c| {
            c.physics.energy_conservation = true;
            c.physics.collision_detection = false;
        })
        .with_agent(AgentBuilder::new().at(5.0, 5.0).moving(1.5, 0.0).genome_seed(1))
        .with_agent(AgentBuilder::new().at(20.0, 20.0).moving(-1.0, 1.0).genome_seed(2))
        .with_agent(AgentBuilder::new().at(35.0, 8.0).moving(0.0, -1.8).genome_seed(3))
        .build();

    for _ in 0..50 {
        world.step().unwrap();
        let report = world.last_physics;
        let scale = 1.0 + report.kinetic_before.abs() + report.work.abs();
        assert!(
            report.imbalance().abs() < 1e-9 * scale,
            "unexplained kinetic energy {}",
            report.imbalance()
        );
        assert_eq!(report.collisions, 0);
    }
}

#[test]
fn test_agents_never_enter_obstacles() {
    for boundary in [BoundaryPolicy::Toroidal, BoundaryPolicy::Absorbing] {
        let mut world = WorldBuilder::new()
            .with_seed(31)
            .with_size(WIDTH, HEIGHT)
            .with_boundary(boundary)
            .with_config(|c| {
                c.world.initial_agents = 20;
                c.world.max_agents = 40;
                c.world.resource_density = 0.05;
                c.world.obstacle_density = 0.2;
            })
            .build();
        assert!(world.space.obstacle_count() > 0);
        for _ in 0..100 {
            world.step().unwrap();
            for agent in world.agent_snapshots() {
                assert!(
                    world.space.is_position_valid(agent.position),
                    "{boundary:?} put {} on an obstacle at {:?}",
                    agent.id,
                    agent.position
                );
            }
        }
    }
}
