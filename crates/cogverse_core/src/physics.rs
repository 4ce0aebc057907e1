//! Kinematics: force integration, friction, speed caps, collisions and the
//! entropy ledger.
//!
//! All bodies have unit mass, so kinetic energy is `|v|^2 / 2` and momentum is
//! the velocity itself.

use crate::config::PhysicsConfig;
use crate::error::{Result, SimError};
use crate::space::SpatialWorld;
use crate::spatial_hash::SpatialHash;
use cogverse_data::{AgentId, Vec2};
use serde::{Deserialize, Serialize};

/// Grid resolution used for the spatial entropy measure.
pub const ENTROPY_GRID: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
}

#[inline]
pub fn kinetic_energy(velocity: Vec2) -> f64 {
    0.5 * velocity.length_squared()
}

/// Energy flows of a single body during one integration step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepEnergy {
    /// Kinetic energy added by thrust and gravity.
    pub work: f64,
    pub friction_loss: f64,
    /// Kinetic energy removed by the speed cap.
    pub cap_loss: f64,
    /// Kinetic energy removed by an absorbing or reflective edge or an obstacle.
    pub boundary_loss: f64,
}

/// Advances one body by a fixed step `dt`.
///
/// `velocity += force * dt`, then `velocity *= 1 - friction`, then the speed
/// cap, then `position += velocity * dt` and the boundary policy. A body that
/// would end on an obstacle stays where it was and stops. A step that yields
/// non-finite values is reported as [`SimError::NumericInstability`] and
/// leaves the caller to zero the body.
pub fn advance(
    agent: AgentId,
    kinematics: Kinematics,
    force: Vec2,
    config: &PhysicsConfig,
    space: &SpatialWorld,
    dt: f64,
) -> Result<(Kinematics, StepEnergy)> {
    let mut energy = StepEnergy::default();
    let start = kinetic_energy(kinematics.velocity);

    let total_force = force + Vec2::new(0.0, config.gravity);
    let mut velocity = kinematics.velocity + total_force * dt;
    let pushed = kinetic_energy(velocity);
    energy.work = pushed - start;

    velocity = velocity * (1.0 - config.friction);
    let slowed = kinetic_energy(velocity);
    energy.friction_loss = pushed - slowed;

    velocity = velocity.clamp_length(config.max_speed);
    let capped = kinetic_energy(velocity);
    energy.cap_loss = slowed - capped;

    let mut position = kinematics.position + velocity * dt;
    if !position.is_finite() || !velocity.is_finite() {
        return Err(SimError::unstable(agent, "kinematics"));
    }
    space.apply_boundary(&mut position, &mut velocity);
    if space.is_obstacle(position) {
        position = kinematics.position;
        velocity = Vec2::ZERO;
    }
    energy.boundary_loss = capped - kinetic_energy(velocity);

    Ok((Kinematics { position, velocity }, energy))
}

/// Outcome of collision resolution over a set of bodies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollisionReport {
    pub collisions: usize,
    pub dissipated: f64,
}

/// Resolves pairwise overlaps between bodies closer than `contact_distance`.
///
/// Pairs are visited in ascending index order. Overlapping bodies are pushed
/// apart by half the overlap each; approaching bodies exchange the normal
/// component of their relative velocity, with restitution
/// `sqrt(1 - dissipation)` when energy is not conserved. Momentum is conserved
/// either way.
pub fn resolve_collisions(
    bodies: &mut [Kinematics],
    contact_distance: f64,
    config: &PhysicsConfig,
    space: &SpatialWorld,
) -> CollisionReport {
    let mut report = CollisionReport::default();
    if bodies.len() < 2 || contact_distance <= 0.0 {
        return report;
    }

    let restitution = if config.energy_conservation {
        1.0
    } else {
        (1.0 - config.dissipation).max(0.0).sqrt()
    };

    let mut index = SpatialHash::new(
        contact_distance.max(1.0),
        space.width(),
        space.height(),
        space.boundary() == cogverse_data::BoundaryPolicy::Toroidal,
    );
    let positions: Vec<Vec2> = bodies.iter().map(|b| b.position).collect();
    index.build_parallel(&positions);

    let mut candidates = Vec::new();
    for i in 0..bodies.len() {
        index.query_into(positions[i], contact_distance, &mut candidates);
        for &j in candidates.iter().filter(|&&j| j > i) {
            let offset = space.delta(bodies[i].position, bodies[j].position);
            let distance = offset.length();
            if distance >= contact_distance {
                continue;
            }
            let normal = if distance > f64::EPSILON {
                offset * (1.0 / distance)
            } else {
                Vec2::new(1.0, 0.0)
            };

            let overlap = contact_distance - distance;
            let mut pi = bodies[i].position - normal * (overlap * 0.5);
            let mut pj = bodies[j].position + normal * (overlap * 0.5);
            space.apply_boundary(&mut pi, &mut bodies[i].velocity);
            space.apply_boundary(&mut pj, &mut bodies[j].velocity);
            if !space.is_obstacle(pi) {
                bodies[i].position = pi;
            }
            if !space.is_obstacle(pj) {
                bodies[j].position = pj;
            }

            let approach = (bodies[i].velocity - bodies[j].velocity).dot(normal);
            report.collisions += 1;
            if approach <= 0.0 {
                continue;
            }
            let impulse = (1.0 + restitution) * approach * 0.5;
            bodies[i].velocity -= normal * impulse;
            bodies[j].velocity += normal * impulse;
            report.dissipated += 0.25 * (1.0 - restitution * restitution) * approach * approach;
        }
    }
    report
}

/// Aggregate energy bookkeeping for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhysicsReport {
    pub kinetic_before: f64,
    pub kinetic_after: f64,
    pub work: f64,
    pub friction_loss: f64,
    pub cap_loss: f64,
    pub boundary_loss: f64,
    pub collision_dissipation: f64,
    pub collisions: usize,
}

impl PhysicsReport {
    pub fn absorb_step(&mut self, energy: &StepEnergy) {
        self.work += energy.work;
        self.friction_loss += energy.friction_loss;
        self.cap_loss += energy.cap_loss;
        self.boundary_loss += energy.boundary_loss;
    }

    /// Kinetic energy left unexplained by the recorded flows.
    pub fn imbalance(&self) -> f64 {
        self.kinetic_before + self.work
            - self.friction_loss
            - self.cap_loss
            - self.boundary_loss
            - self.collision_dissipation
            - self.kinetic_after
    }
}

/// Running entropy bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EntropyLedger {
    /// Cumulative kinetic energy turned into heat (friction and collisions).
    pub dissipated: f64,
    /// Normalized Shannon entropy of agent positions over a coarse grid.
    pub spatial_entropy: f64,
    /// Standard deviation of agent speeds.
    pub kinetic_spread: f64,
}

impl EntropyLedger {
    pub fn record(&mut self, report: &PhysicsReport) {
        self.dissipated += report.friction_loss + report.collision_dissipation;
    }

    pub fn observe(&mut self, bodies: &[Kinematics], width: f64, height: f64) {
        self.spatial_entropy = spatial_entropy(bodies, width, height);
        self.kinetic_spread = speed_spread(bodies);
    }
}

/// Shannon entropy of occupancy over a `ENTROPY_GRID`² grid, normalized to [0, 1].
pub fn spatial_entropy(bodies: &[Kinematics], width: f64, height: f64) -> f64 {
    if bodies.is_empty() || width <= 0.0 || height <= 0.0 {
        return 0.0;
    }
    let mut counts = [0usize; ENTROPY_GRID * ENTROPY_GRID];
    for body in bodies {
        let cx = ((body.position.x / width * ENTROPY_GRID as f64) as usize).min(ENTROPY_GRID - 1);
        let cy = ((body.position.y / height * ENTROPY_GRID as f64) as usize).min(ENTROPY_GRID - 1);
        counts[cy * ENTROPY_GRID + cx] += 1;
    }
    let total = bodies.len() as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum();
    entropy / ((ENTROPY_GRID * ENTROPY_GRID) as f64).ln()
}

fn speed_spread(bodies: &[Kinematics]) -> f64 {
    if bodies.is_empty() {
        return 0.0;
    }
    let n = bodies.len() as f64;
    let speeds: Vec<f64> = bodies.iter().map(|b| b.velocity.length()).collect();
    let mean = speeds.iter().sum::<f64>() / n;
    (speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use cogverse_data::BoundaryPolicy;

    fn space(boundary: BoundaryPolicy) -> SpatialWorld {
        SpatialWorld::new(&WorldConfig {
            size: [100, 100],
            boundary_type: boundary,
            ..Default::default()
        })
    }

    fn body(x: f64, y: f64, vx: f64, vy: f64) -> Kinematics {
        Kinematics {
            position: Vec2::new(x, y),
            velocity: Vec2::new(vx, vy),
        }
    }

    #[test]
    fn test_advance_applies_friction_then_moves() {
        let config = PhysicsConfig::default();
        let s = space(BoundaryPolicy::Toroidal);
        let (k, e) = advance(AgentId(1), body(10.0, 10.0, 1.0, 0.0), Vec2::ZERO, &config, &s, 0.1)
            .unwrap();
        assert!((k.velocity.x - 0.9).abs() < 1e-12);
        assert!((k.position.x - 10.09).abs() < 1e-12);
        assert!((e.friction_loss - (0.5 - 0.405)).abs() < 1e-12);
        assert_eq!(e.work, 0.0);
    }

    #[test]
    fn test_advance_caps_speed() {
        let config = PhysicsConfig::default();
        let s = space(BoundaryPolicy::Toroidal);
        let (k, e) = advance(
            AgentId(1),
            body(10.0, 10.0, 0.0, 0.0),
            Vec2::new(1000.0, 0.0),
            &config,
            &s,
            0.1,
        )
        .unwrap();
        assert!((k.velocity.length() - config.max_speed).abs() < 1e-9);
        assert!(e.cap_loss > 0.0);
    }

    #[test]
    fn test_advance_applies_gravity() {
        let config = PhysicsConfig {
            gravity: 1.0,
            friction: 0.0,
            ..Default::default()
        };
        let s = space(BoundaryPolicy::Toroidal);
        let (k, _) = advance(AgentId(1), body(10.0, 10.0, 0.0, 0.0), Vec2::ZERO, &config, &s, 0.5)
            .unwrap();
        assert!((k.velocity.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_advance_wraps_past_right_edge() {
        let config = PhysicsConfig {
            friction: 0.0,
            ..Default::default()
        };
        let s = space(BoundaryPolicy::Toroidal);
        let (k, _) = advance(AgentId(1), body(99.9, 50.0, 2.0, 0.0), Vec2::ZERO, &config, &s, 1.0)
            .unwrap();
        assert!((k.position.x - 1.9).abs() < 1e-9);
        assert_eq!(k.velocity.x, 2.0);
    }

    #[test]
    fn test_advance_stops_at_an_obstacle() {
        let config = PhysicsConfig {
            friction: 0.0,
            ..Default::default()
        };
        let mut s = space(BoundaryPolicy::Toroidal);
        s.block_cell(Vec2::new(11.5, 10.5));
        let start = body(10.5, 10.5, 2.0, 0.0);
        let (k, e) = advance(AgentId(1), start, Vec2::ZERO, &config, &s, 0.5).unwrap();
        assert_eq!(k.position, start.position);
        assert_eq!(k.velocity, Vec2::ZERO);
        assert!((e.boundary_loss - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_advance_reports_non_finite() {
        let config = PhysicsConfig::default();
        let s = space(BoundaryPolicy::Toroidal);
        let err = advance(
            AgentId(4),
            body(10.0, 10.0, f64::NAN, 0.0),
            Vec2::ZERO,
            &config,
            &s,
            0.1,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::NumericInstability { .. }));
    }

    #[test]
    fn test_elastic_collision_conserves_momentum_and_energy() {
        let config = PhysicsConfig::default();
        let s = space(BoundaryPolicy::Toroidal);
        let mut bodies = vec![body(10.0, 10.0, 1.0, 0.0), body(11.5, 10.0, -1.0, 0.0)];
        let momentum_before = bodies[0].velocity + bodies[1].velocity;
        let ke_before: f64 = bodies.iter().map(|b| kinetic_energy(b.velocity)).sum();

        let report = resolve_collisions(&mut bodies, 2.0, &config, &s);

        let momentum_after = bodies[0].velocity + bodies[1].velocity;
        let ke_after: f64 = bodies.iter().map(|b| kinetic_energy(b.velocity)).sum();
        assert_eq!(report.collisions, 1);
        assert!((momentum_before - momentum_after).length() < 1e-12);
        assert!((ke_before - ke_after).abs() < 1e-12);
        assert_eq!(report.dissipated, 0.0);
        assert!(bodies[0].velocity.x < 0.0);
        assert!(s.distance(bodies[0].position, bodies[1].position) >= 2.0 - 1e-9);
    }

    #[test]
    fn test_inelastic_collision_dissipates_recorded_energy() {
        let config = PhysicsConfig {
            energy_conservation: false,
            dissipation: 0.5,
            ..Default::default()
        };
        let s = space(BoundaryPolicy::Toroidal);
        let mut bodies = vec![body(10.0, 10.0, 1.0, 0.0), body(11.0, 10.0, -1.0, 0.0)];
        let ke_before: f64 = bodies.iter().map(|b| kinetic_energy(b.velocity)).sum();
        let report = resolve_collisions(&mut bodies, 2.0, &config, &s);
        let ke_after: f64 = bodies.iter().map(|b| kinetic_energy(b.velocity)).sum();
        assert!(report.dissipated > 0.0);
        assert!((ke_before - ke_after - report.dissipated).abs() < 1e-9);
        let momentum = bodies[0].velocity + bodies[1].velocity;
        assert!(momentum.length() < 1e-12);
    }

    #[test]
    fn test_separating_bodies_keep_velocity() {
        let config = PhysicsConfig::default();
        let s = space(BoundaryPolicy::Toroidal);
        let mut bodies = vec![body(10.0, 10.0, -1.0, 0.0), body(11.0, 10.0, 1.0, 0.0)];
        resolve_collisions(&mut bodies, 2.0, &config, &s);
        assert_eq!(bodies[0].velocity.x, -1.0);
        assert_eq!(bodies[1].velocity.x, 1.0);
    }

    #[test]
    fn test_collision_across_toroidal_edge() {
        let config = PhysicsConfig::default();
        let s = space(BoundaryPolicy::Toroidal);
        let mut bodies = vec![body(0.2, 50.0, -1.0, 0.0), body(99.6, 50.0, 1.0, 0.0)];
        let report = resolve_collisions(&mut bodies, 2.0, &config, &s);
        assert_eq!(report.collisions, 1);
        assert!(bodies[0].velocity.x > 0.0);
    }

    #[test]
    fn test_spatial_entropy_bounds() {
        let clustered: Vec<Kinematics> = (0..10).map(|_| body(5.0, 5.0, 0.0, 0.0)).collect();
        assert_eq!(spatial_entropy(&clustered, 100.0, 100.0), 0.0);

        let spread: Vec<Kinematics> = (0..100)
            .map(|i| body((i % 10) as f64 * 10.0 + 5.0, (i / 10) as f64 * 10.0 + 5.0, 0.0, 0.0))
            .collect();
        assert!((spatial_entropy(&spread, 100.0, 100.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_imbalance_is_zero_for_recorded_flows() {
        let config = PhysicsConfig::default();
        let s = space(BoundaryPolicy::Absorbing);
        let start = body(99.5, 50.0, 2.0, 1.0);
        let mut report = PhysicsReport {
            kinetic_before: kinetic_energy(start.velocity),
            ..Default::default()
        };
        let (k, e) = advance(AgentId(1), start, Vec2::new(3.0, 0.0), &config, &s, 1.0).unwrap();
        report.absorb_step(&e);
        report.kinetic_after = kinetic_energy(k.velocity);
        assert!(report.imbalance().abs() < 1e-9);
        assert!(report.boundary_loss > 0.0);
    }
}
