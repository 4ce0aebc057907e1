//! Perception and decision making.
//!
//! Both phases are pure functions of the frozen pre-tick view plus the
//! agent's own genome and memory, so they run in parallel. Anything an agent
//! wants to change (memory records, movement, intents) is returned and
//! applied later in the commit phase.

use crate::brain::{Activations, BrainLogic};
use crate::config::AppConfig;
use crate::memory::MemoryLogic;
use crate::snapshot::AgentSnapshot;
use crate::space::{SpatialWorld, RESOURCE_MAX_VALUE};
use cogverse_data::{
    ActionKind, AgentId, BehaviorTraits, Genome, MemoryState, Message, Observation,
    ObservationKind, ResourceId, Vec2,
};
use rand::Rng;

/// Length of the sensory vector before it is fitted to the network input.
pub const SENSORY_FEATURES: usize = 23;
/// Output channels above this fire their action.
pub const INTENT_THRESHOLD: f32 = 0.5;
/// Resting needs a stronger signal than other actions.
pub const REST_THRESHOLD: f32 = 0.7;
/// Below this energy ratio the innate feeding drive overrides the network.
pub const HUNGER_LINE: f64 = 0.75;
/// Below this health ratio an agent backs away from its nearest neighbour.
pub const SAFETY_LINE: f64 = 0.5;

/// Frozen world state shared by every agent's perception in one tick.
pub struct PerceptionContext<'a> {
    pub space: &'a SpatialWorld,
    /// Sorted by id; the index of an agent here is its slot in the space index.
    pub agents: &'a [AgentSnapshot],
    pub config: &'a AppConfig,
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeenResource {
    pub id: ResourceId,
    pub direction: Vec2,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeenAgent {
    pub id: AgentId,
    pub direction: Vec2,
    pub distance: f64,
    pub energy_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Percept {
    pub features: Vec<f32>,
    pub nearest_resource: Option<SeenResource>,
    pub nearest_agent: Option<SeenAgent>,
    /// Offset to the most valuable remembered resource location.
    pub remembered_food: Option<Vec2>,
    pub neighbor_count: usize,
    pub health_ratio: f64,
    /// Survival factor of the local environment.
    pub environment: f64,
    /// Records for the agent's memory, applied at commit.
    pub observations: Vec<Observation>,
}

impl Percept {
    /// Nothing seen.
    pub fn blank() -> Self {
        Self {
            features: vec![0.0; SENSORY_FEATURES],
            nearest_resource: None,
            nearest_agent: None,
            remembered_food: None,
            neighbor_count: 0,
            health_ratio: 0.0,
            environment: 0.0,
            observations: Vec::new(),
        }
    }
}

/// What an agent intends to do this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Desired heading scaled by intensity; length at most 1.
    pub steering: Vec2,
    pub consume: bool,
    pub communicate: bool,
    pub reproduce: bool,
    pub cooperate: bool,
    pub rest: bool,
    pub explore: bool,
    /// Dominant action for bookkeeping and learning.
    pub action: ActionKind,
    pub activations: Activations,
}

impl Decision {
    /// Everything off; used for agents whose state is no longer finite.
    pub fn idle() -> Self {
        Self {
            steering: Vec2::ZERO,
            consume: false,
            communicate: false,
            reproduce: false,
            cooperate: false,
            rest: true,
            explore: false,
            action: ActionKind::Rest,
            activations: Activations::default(),
        }
    }
}

fn ratio(n: usize, full: f64) -> f32 {
    (n as f64 / full).min(1.0) as f32
}

/// Builds the sensory vector for the agent at `slot`.
pub fn perceive<R: Rng>(
    slot: usize,
    memory: &MemoryState,
    inbox: &[Message],
    traits: &BehaviorTraits,
    ctx: &PerceptionContext<'_>,
    rng: &mut R,
) -> Percept {
    let me = &ctx.agents[slot];
    let space = ctx.space;
    let radius = ctx.config.world.perception_radius;
    let memory_config = &ctx.config.agents.memory;

    let nearest_agent = space
        .agent_slots_within(me.position, radius)
        .into_iter()
        .filter(|&s| s != slot)
        .filter_map(|s| {
            let other = ctx.agents.get(s)?;
            let offset = space.delta(me.position, other.position);
            Some(SeenAgent {
                id: other.id,
                direction: offset.normalized(),
                distance: offset.length(),
                energy_ratio: other.energy_ratio(),
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
    let neighbor_count = space
        .agent_slots_within(me.position, radius)
        .len()
        .saturating_sub(1);

    let visible_resources = space
        .resources_within(me.position, radius)
        .into_iter()
        .filter(|id| space.resource(*id).is_some_and(|r| r.value > 0.0))
        .count();
    let nearest_resource = space
        .nearest_resource(me.position, radius)
        .and_then(|(id, distance)| {
            let r = space.resource(id)?;
            Some(SeenResource {
                id,
                direction: space.delta(me.position, r.position).normalized(),
                distance,
            })
        });

    let remembered_food = memory
        .best_location(ObservationKind::Resource)
        .map(|place| space.delta(me.position, place.position));

    let summary = memory.summary(memory_config);
    let inbox_signal = if inbox.is_empty() {
        0.0
    } else {
        inbox
            .iter()
            .map(|m| m.symbols.first().copied().unwrap_or(0.0))
            .sum::<f32>()
            / inbox.len() as f32
    };

    let (res_dist, res_dir) = nearest_resource
        .map_or((1.0, Vec2::ZERO), |r| ((r.distance / radius).min(1.0), r.direction));
    let (agent_dist, agent_dir, agent_energy) = nearest_agent.map_or((1.0, Vec2::ZERO, 0.0), |a| {
        ((a.distance / radius).min(1.0), a.direction, a.energy_ratio)
    });
    let social = (traits.sociability + ctx.config.agents.behavior.social_tendency) * 0.5;
    let health_ratio = (me.health / me.max_health.max(f64::EPSILON)).clamp(0.0, 1.0);
    let environment = space.environment_at(me.position).survival_factor();

    let features = vec![
        (me.position.x / space.width()) as f32,
        (me.position.y / space.height()) as f32,
        me.energy_ratio() as f32,
        health_ratio as f32,
        ratio(me.age as usize, 1000.0),
        ratio(neighbor_count, 10.0),
        ratio(visible_resources, 10.0),
        res_dist as f32,
        res_dir.x as f32,
        res_dir.y as f32,
        agent_dist as f32,
        agent_dir.x as f32,
        agent_dir.y as f32,
        agent_energy as f32,
        summary.working_fill as f32,
        summary.mean_importance as f32,
        summary.long_term_fill as f32,
        summary.spatial_coverage as f32,
        environment as f32,
        inbox_signal,
        // Constant per agent; a 20-wide input layer drops it with the noise.
        social as f32,
        rng.gen_range(-1.0f32..1.0),
        rng.gen_range(-1.0f32..1.0),
    ];
    debug_assert_eq!(features.len(), SENSORY_FEATURES);

    let mut observations = Vec::new();
    if let Some(seen) = nearest_resource {
        if let Some(r) = space.resource(seen.id) {
            observations.push(Observation {
                kind: ObservationKind::Resource,
                position: r.position,
                value: (r.value / RESOURCE_MAX_VALUE).clamp(0.0, 1.0),
                tick: ctx.tick,
            });
        }
    }
    if let Some(seen) = nearest_agent {
        if let Some(other) = ctx.agents.iter().find(|a| a.id == seen.id) {
            observations.push(Observation {
                kind: ObservationKind::Agent,
                position: other.position,
                value: seen.energy_ratio * 2.0 - 1.0,
                tick: ctx.tick,
            });
        }
    }
    if let Some(message) = inbox.last() {
        observations.push(Observation {
            kind: ObservationKind::Message,
            position: message.sender_position,
            value: f64::from(message.symbols.first().copied().unwrap_or(0.0)).clamp(-1.0, 1.0),
            tick: ctx.tick,
        });
    }

    Percept {
        features,
        nearest_resource,
        nearest_agent,
        remembered_food,
        neighbor_count,
        health_ratio,
        environment,
        observations,
    }
}

/// Runs the brain and blends in innate drives.
///
/// `culture_expression` is the mean expression of the agent's known cultural
/// traits; it raises the cooperation and communication drives.
pub fn decide<R: Rng>(
    genome: &Genome,
    percept: &Percept,
    energy_ratio: f64,
    culture_expression: f64,
    config: &AppConfig,
    rng: &mut R,
) -> Decision {
    let activations = genome.brain.forward(&percept.features);
    let out = |i: usize| activations.outputs.get(i).copied().unwrap_or(0.0);
    let traits = &genome.traits;

    let mut steering = Vec2::new(
        f64::from(out(0)) * 2.0 - 1.0,
        f64::from(out(1)) * 2.0 - 1.0,
    );

    let hunger = (1.0 - energy_ratio).clamp(0.0, 1.0);
    let food = percept
        .nearest_resource
        .map(|r| r.direction)
        .or_else(|| percept.remembered_food.map(Vec2::normalized));
    if let Some(direction) = food {
        steering = steering * (1.0 - hunger) + direction * hunger;
    }

    let danger = ((SAFETY_LINE - percept.health_ratio) / SAFETY_LINE).clamp(0.0, 1.0);
    if let Some(other) = percept.nearest_agent.filter(|_| danger > 0.0) {
        steering = steering * (1.0 - danger) - other.direction * danger;
    }

    let explore = out(7) > INTENT_THRESHOLD;
    if explore {
        let jitter = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        steering += jitter * (traits.curiosity * 0.5 + traits.exploration * 0.5);
    }

    let rest = out(6) > REST_THRESHOLD;
    if rest {
        steering = Vec2::ZERO;
    }

    let social_drive = (config.agents.behavior.social_tendency - 0.5) * 0.2
        + (traits.sociability - 0.5) * 0.2
        + culture_expression * 0.2;
    let cooperative_drive = (traits.cooperation - 0.5) * 0.2 + culture_expression * 0.2;

    let consume = out(2) > INTENT_THRESHOLD || energy_ratio < HUNGER_LINE;
    let communicate = f64::from(out(3)) + social_drive > f64::from(INTENT_THRESHOLD);
    let reproduce = out(4) > INTENT_THRESHOLD;
    let cooperate = f64::from(out(5)) + cooperative_drive > f64::from(INTENT_THRESHOLD);

    let action = ActionKind::ALL
        .iter()
        .filter_map(|kind| kind.output_channel().map(|c| (*kind, out(c))))
        .filter(|(_, v)| *v > INTENT_THRESHOLD)
        .fold(None, |best: Option<(ActionKind, f32)>, cand| match best {
            Some(b) if b.1 >= cand.1 => Some(b),
            _ => Some(cand),
        })
        .map_or(ActionKind::Move, |(kind, _)| kind);

    Decision {
        steering: steering.clamp_length(1.0),
        consume,
        communicate,
        reproduce,
        cooperate,
        rest,
        explore,
        action,
        activations,
    }
}
