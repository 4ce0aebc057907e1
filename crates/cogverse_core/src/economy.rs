//! Energy and health accounting, feeding, cooperation, reproduction and
//! mortality.

use crate::brain::mutation::offspring_genome;
use crate::config::{AppConfig, BehaviorConfig};
use crate::error::{Result, SimError};
use crate::space::SpatialWorld;
use cogverse_data::{Genome, ResourceId, Vec2, Vitals};
use rand::Rng;
use std::fmt;

/// Below this energy an agent is hungry: health drains and starvation counts.
pub const HUNGER_ENERGY: f64 = 20.0;
/// Above this energy health regenerates.
pub const WELL_FED_ENERGY: f64 = 80.0;
pub const HEALTH_DRAIN: f64 = 1.0;
pub const HEALTH_REGEN: f64 = 0.5;
pub const REST_HEAL: f64 = 2.0;
/// Simulated time after which aging hurts.
pub const AGING_ONSET: f64 = 200.0;
pub const AGING_RATE: f64 = 0.01;
/// Below this survival factor the local environment wears health down.
pub const EXPOSURE_THRESHOLD: f64 = 0.5;

pub const FEED_REACH: f64 = 1.5;
pub const FEED_BITE: f64 = 20.0;
pub const FEED_EFFICIENCY: f64 = 0.8;

pub const COOPERATION_MIN_ENERGY: f64 = 30.0;
pub const COOPERATION_MAX_SHARE: f64 = 10.0;
pub const COOPERATION_FRACTION: f64 = 0.1;

/// Children land within this offset of the parent on each axis.
pub const OFFSPRING_SPREAD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Exhaustion,
    Injury,
    Starvation,
    Fault,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeathCause::Exhaustion => "exhaustion",
            DeathCause::Injury => "injury",
            DeathCause::Starvation => "starvation",
            DeathCause::Fault => "numeric fault",
        };
        f.write_str(name)
    }
}

/// Activity multiplier on the resting metabolic cost.
pub fn activity_level(
    speed: f64,
    max_speed: f64,
    communicated: bool,
    communication_cost: f64,
) -> f64 {
    let motion = if max_speed > 0.0 {
        (speed / max_speed).clamp(0.0, 1.0)
    } else {
        0.0
    };
    1.0 + motion + if communicated { communication_cost } else { 0.0 }
}

/// Debits `energy_decay * max_energy * dt * activity` and returns the cost.
pub fn apply_energy_decay(
    vitals: &mut Vitals,
    activity: f64,
    behavior: &BehaviorConfig,
    dt: f64,
) -> f64 {
    let cost = (behavior.energy_decay * vitals.max_energy * dt * activity).max(0.0);
    vitals.energy = (vitals.energy - cost).max(0.0);
    cost
}

/// Hunger drain, exposure, well-fed regeneration, resting and aging. Also
/// advances the starvation counter.
///
/// `survival` is the local environment's survival factor; below
/// [`EXPOSURE_THRESHOLD`] it drains up to [`HEALTH_DRAIN`] more.
pub fn update_health(vitals: &mut Vitals, resting: bool, survival: f64, dt: f64) {
    let mut delta = 0.0;
    if vitals.energy < HUNGER_ENERGY {
        delta -= HEALTH_DRAIN;
        vitals.ticks_starving += 1;
    } else {
        vitals.ticks_starving = 0;
    }
    if survival < EXPOSURE_THRESHOLD {
        delta -= HEALTH_DRAIN * (EXPOSURE_THRESHOLD - survival.max(0.0)) / EXPOSURE_THRESHOLD;
    }
    if vitals.energy > WELL_FED_ENERGY {
        delta += HEALTH_REGEN;
    }
    if resting {
        delta += REST_HEAL;
    }
    let age_time = vitals.age as f64 * dt;
    if age_time > AGING_ONSET {
        delta -= (age_time - AGING_ONSET) * AGING_RATE;
    }
    vitals.health = (vitals.health + delta * dt).clamp(0.0, vitals.max_health);
}

/// Eats from `resource` and returns the amount taken from it.
pub fn feed(vitals: &mut Vitals, space: &mut SpatialWorld, resource: ResourceId) -> f64 {
    let headroom = (vitals.max_energy - vitals.energy).max(0.0);
    if headroom <= 0.0 {
        return 0.0;
    }
    let bite = FEED_BITE.min(headroom / FEED_EFFICIENCY);
    let taken = space.consume_resource(resource, bite);
    vitals.energy = (vitals.energy + taken * FEED_EFFICIENCY).min(vitals.max_energy);
    taken
}

/// Energy a cooperating agent gives away, if it can afford to.
pub fn cooperation_share(energy: f64) -> Option<f64> {
    (energy > COOPERATION_MIN_ENERGY)
        .then(|| COOPERATION_MAX_SHARE.min(energy * COOPERATION_FRACTION))
}

pub fn check_mortality(vitals: &Vitals, behavior: &BehaviorConfig) -> Option<DeathCause> {
    if vitals.faulted {
        Some(DeathCause::Fault)
    } else if vitals.energy <= 0.0 {
        Some(DeathCause::Exhaustion)
    } else if vitals.health <= 0.0 {
        Some(DeathCause::Injury)
    } else if vitals.ticks_starving > behavior.starvation_timeout {
        Some(DeathCause::Starvation)
    } else {
        None
    }
}

/// A child produced by reproduction, before it gets an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Offspring {
    pub genome: Genome,
    pub position: Vec2,
    pub energy: f64,
}

/// Splits the parent's energy into a mutated child placed near it.
///
/// Returns `Ok(None)` when reproduction is disabled or the parent is below
/// the threshold, and [`SimError::Capacity`] when the world is full.
pub fn attempt_reproduction<R: Rng>(
    parent: &mut Vitals,
    genome: &Genome,
    position: Vec2,
    population: usize,
    space: &SpatialWorld,
    config: &AppConfig,
    rng: &mut R,
) -> Result<Option<Offspring>> {
    let behavior = &config.agents.behavior;
    if !behavior.reproduction_enabled || parent.energy < behavior.reproduction_threshold {
        return Ok(None);
    }
    if population >= config.world.max_agents {
        return Err(SimError::Capacity {
            max_agents: config.world.max_agents,
        });
    }

    let child_energy = parent.energy * behavior.offspring_energy_share;
    parent.energy -= child_energy;

    let offset = Vec2::new(
        rng.gen_range(-OFFSPRING_SPREAD..=OFFSPRING_SPREAD),
        rng.gen_range(-OFFSPRING_SPREAD..=OFFSPRING_SPREAD),
    );
    let mut landing = space.wrap_or_clamp(position + offset);
    if space.is_obstacle(landing) {
        landing = position;
    }
    Ok(Some(Offspring {
        genome: offspring_genome(genome, behavior.mutation_rate, rng),
        position: landing,
        energy: child_energy,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::BrainLogic;
    use cogverse_data::{BehaviorTraits, Brain};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn genome(rng: &mut ChaCha8Rng) -> Genome {
        Genome {
            brain: Brain::new_random_with_rng(&Default::default(), rng),
            traits: BehaviorTraits::default(),
        }
    }

    #[test]
    fn test_decay_scales_with_activity() {
        let behavior = BehaviorConfig::default();
        let mut resting = Vitals::new(100.0, 150.0);
        let mut busy = Vitals::new(100.0, 150.0);
        let idle = activity_level(0.0, 2.0, false, 0.5);
        let active = activity_level(2.0, 2.0, true, 0.5);
        let idle_cost = apply_energy_decay(&mut resting, idle, &behavior, 0.1);
        let busy_cost = apply_energy_decay(&mut busy, active, &behavior, 0.1);
        assert!((idle_cost - 0.3).abs() < 1e-12);
        assert!((busy_cost - 0.75).abs() < 1e-12);
        assert!(busy.energy < resting.energy);
    }

    #[test]
    fn test_decay_never_goes_negative() {
        let mut v = Vitals::new(0.1, 150.0);
        apply_energy_decay(&mut v, 3.0, &BehaviorConfig::default(), 1.0);
        assert_eq!(v.energy, 0.0);
        assert_eq!(check_mortality(&v, &BehaviorConfig::default()), Some(DeathCause::Exhaustion));
    }

    #[test]
    fn test_hunger_drains_health_and_counts_starvation() {
        let mut v = Vitals::new(10.0, 150.0);
        update_health(&mut v, false, 1.0, 1.0);
        assert_eq!(v.health, 99.0);
        assert_eq!(v.ticks_starving, 1);
        v.energy = 50.0;
        update_health(&mut v, true, 1.0, 1.0);
        assert_eq!(v.health, 100.0);
        assert_eq!(v.ticks_starving, 0);
    }

    #[test]
    fn test_starvation_timeout_is_fatal() {
        let behavior = BehaviorConfig {
            starvation_timeout: 2,
            ..Default::default()
        };
        let mut v = Vitals::new(10.0, 150.0);
        for _ in 0..2 {
            update_health(&mut v, false, 1.0, 0.1);
        }
        assert_eq!(check_mortality(&v, &behavior), None);
        update_health(&mut v, false, 1.0, 0.1);
        assert_eq!(check_mortality(&v, &behavior), Some(DeathCause::Starvation));
    }

    #[test]
    fn test_exposure_drains_health_in_harsh_places() {
        let mut v = Vitals::new(50.0, 150.0);
        update_health(&mut v, false, 0.6, 1.0);
        assert_eq!(v.health, 100.0);
        update_health(&mut v, false, 0.25, 1.0);
        assert!((v.health - 99.5).abs() < 1e-12);
        update_health(&mut v, false, 0.0, 1.0);
        assert!((v.health - 98.5).abs() < 1e-12);
        assert_eq!(v.ticks_starving, 0);
    }

    #[test]
    fn test_aging_penalty() {
        let mut v = Vitals::new(50.0, 150.0);
        v.age = 3000;
        update_health(&mut v, false, 1.0, 0.1);
        assert!((v.health - 99.9).abs() < 1e-9);
    }

    #[test]
    fn test_feed_is_bounded_by_resource_and_headroom() {
        let mut space = SpatialWorld::new(&Default::default());
        let id = space.insert_resource(Vec2::new(5.0, 5.0), 10.0, 0.1).unwrap();
        let mut v = Vitals::new(50.0, 150.0);
        assert_eq!(feed(&mut v, &mut space, id), 10.0);
        assert!((v.energy - 58.0).abs() < 1e-12);
        assert_eq!(feed(&mut v, &mut space, id), 0.0);

        let id = space.insert_resource(Vec2::new(6.0, 5.0), 100.0, 0.1).unwrap();
        let mut full = Vitals::new(146.0, 150.0);
        let taken = feed(&mut full, &mut space, id);
        assert!((taken - 5.0).abs() < 1e-12);
        assert!((full.energy - 150.0).abs() < 1e-12);
    }

    #[test]
    fn test_cooperation_share() {
        assert_eq!(cooperation_share(30.0), None);
        assert_eq!(cooperation_share(50.0), Some(5.0));
        assert_eq!(cooperation_share(140.0), Some(10.0));
    }

    #[test]
    fn test_reproduction_at_threshold_conserves_energy() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let config = AppConfig::default();
        let space = SpatialWorld::new(&config.world);
        let parent_genome = genome(&mut rng);
        let mut parent = Vitals::new(80.0, 150.0);

        let child = attempt_reproduction(
            &mut parent,
            &parent_genome,
            Vec2::new(50.0, 50.0),
            10,
            &space,
            &config,
            &mut rng,
        )
        .unwrap()
        .unwrap();

        assert_eq!(parent.energy + child.energy, 80.0);
        assert_eq!(child.energy, 32.0);
        let spread = space.distance(child.position, Vec2::new(50.0, 50.0));
        assert!(spread <= OFFSPRING_SPREAD * 2f64.sqrt());
        assert_eq!(child.genome.brain.connection_count(), parent_genome.brain.connection_count());
    }

    #[test]
    fn test_reproduction_refused_below_threshold_or_at_capacity() {
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let config = AppConfig::default();
        let space = SpatialWorld::new(&config.world);
        let g = genome(&mut rng);

        let mut weak = Vitals::new(79.9, 150.0);
        let none = attempt_reproduction(&mut weak, &g, Vec2::ZERO, 1, &space, &config, &mut rng);
        assert!(matches!(none, Ok(None)));
        assert_eq!(weak.energy, 79.9);

        let mut strong = Vitals::new(120.0, 150.0);
        let full = attempt_reproduction(&mut strong, &g, Vec2::ZERO, 50, &space, &config, &mut rng);
        assert!(matches!(full, Err(SimError::Capacity { max_agents: 50 })));
        assert_eq!(strong.energy, 120.0);
    }

    #[test]
    fn test_child_near_edge_is_wrapped() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let config = AppConfig::default();
        let space = SpatialWorld::new(&config.world);
        let g = genome(&mut rng);
        for _ in 0..20 {
            let mut parent = Vitals::new(100.0, 150.0);
            let edge = Vec2::new(0.5, 99.5);
            let child = attempt_reproduction(&mut parent, &g, edge, 1, &space, &config, &mut rng)
                .unwrap()
                .unwrap();
            assert!(space.contains(child.position));
        }
    }

    #[test]
    fn test_child_never_lands_on_an_obstacle() {
        let mut rng = ChaCha8Rng::seed_from_u64(24);
        let config = AppConfig::default();
        let mut space = SpatialWorld::new(&config.world);
        for x in 47..54 {
            for y in 47..54 {
                if (x, y) != (50, 50) {
                    space.block_cell(Vec2::new(x as f64, y as f64));
                }
            }
        }
        let g = genome(&mut rng);
        let home = Vec2::new(50.5, 50.5);
        for _ in 0..20 {
            let mut parent = Vitals::new(100.0, 150.0);
            let child = attempt_reproduction(&mut parent, &g, home, 1, &space, &config, &mut rng)
                .unwrap()
                .unwrap();
            assert!(!space.is_obstacle(child.position));
            assert_eq!((child.position.x.floor(), child.position.y.floor()), (50.0, 50.0));
        }
    }
}
