//! Communication channel and cultural transmission.

use crate::config::{CommunicationConfig, CultureConfig};
use crate::space::SpatialWorld;
use cogverse_data::{AgentId, CulturalTrait, Message, TraitId, Vec2};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

/// Quantization levels of a message symbol.
pub const SYMBOL_LEVELS: u32 = 16;
/// Largest expression change of a branched trait.
pub const BRANCH_DRIFT: f64 = 0.1;

fn quantize(value: f32) -> f32 {
    let steps = (SYMBOL_LEVELS - 1) as f32;
    let unit = (value.clamp(-1.0, 1.0) + 1.0) * 0.5;
    (unit * steps).round() / steps * 2.0 - 1.0
}

/// Builds a message payload: energy ratio, food direction, then the raw
/// network outputs, quantized and truncated to `bandwidth` symbols.
pub fn encode_payload(
    energy_ratio: f64,
    food_direction: Vec2,
    outputs: &[f32],
    bandwidth: usize,
) -> Vec<f32> {
    [
        (energy_ratio * 2.0 - 1.0) as f32,
        food_direction.x as f32,
        food_direction.y as f32,
    ]
    .into_iter()
    .chain(outputs.iter().map(|o| o * 2.0 - 1.0))
    .take(bandwidth)
    .map(quantize)
    .collect()
}

/// What a receiver hears: the payload with additive noise in
/// `[-noise_level, noise_level]` drawn from the receiver's stream.
pub fn receive<R: Rng>(
    sender: AgentId,
    sender_position: Vec2,
    payload: &[f32],
    noise_level: f64,
    rng: &mut R,
) -> Message {
    let noise = noise_level.max(0.0) as f32;
    let symbols = payload
        .iter()
        .map(|s| {
            if noise > 0.0 {
                s + rng.gen_range(-noise..=noise)
            } else {
                *s
            }
        })
        .collect();
    Message {
        sender,
        sender_position,
        symbols,
    }
}

/// Slots of the agents within `communication.range` of the sender, ascending.
/// Each of them receives the payload through [`receive`].
pub fn broadcast(
    sender_slot: usize,
    sender_position: Vec2,
    space: &SpatialWorld,
    config: &CommunicationConfig,
) -> Vec<usize> {
    if !config.enabled || config.bandwidth == 0 {
        return Vec::new();
    }
    space
        .agent_slots_within(sender_position, config.range)
        .into_iter()
        .filter(|&s| s != sender_slot)
        .collect()
}

/// Cultural traits at least one agent knew at the last prune.
#[derive(Debug, Clone, Default)]
pub struct CultureRegistry {
    traits: BTreeMap<TraitId, CulturalTrait>,
    next_id: u64,
}

impl CultureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    pub fn get(&self, id: TraitId) -> Option<&CulturalTrait> {
        self.traits.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CulturalTrait> {
        self.traits.values()
    }

    fn next_id(&mut self) -> TraitId {
        let id = TraitId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Creates a new root trait.
    pub fn invent<R: Rng>(&mut self, origin: AgentId, tick: u64, rng: &mut R) -> TraitId {
        let id = self.next_id();
        self.traits.insert(
            id,
            CulturalTrait {
                id,
                origin,
                parent: None,
                lineage_depth: 0,
                transmissions: 0,
                expression: rng.gen_range(0.0..1.0),
                created_tick: tick,
            },
        );
        id
    }

    /// Creates a variant of `parent` one lineage step deeper.
    pub fn branch<R: Rng>(
        &mut self,
        parent: TraitId,
        origin: AgentId,
        tick: u64,
        rng: &mut R,
    ) -> Option<TraitId> {
        let (depth, expression) = {
            let p = self.traits.get(&parent)?;
            (p.lineage_depth, p.expression)
        };
        let id = self.next_id();
        let drift = rng.gen_range(-BRANCH_DRIFT..=BRANCH_DRIFT);
        self.traits.insert(
            id,
            CulturalTrait {
                id,
                origin,
                parent: Some(parent),
                lineage_depth: depth + 1,
                transmissions: 0,
                expression: (expression + drift).clamp(0.0, 1.0),
                created_tick: tick,
            },
        );
        Some(id)
    }

    pub fn record_transmission(&mut self, id: TraitId) {
        if let Some(t) = self.traits.get_mut(&id) {
            t.transmissions += 1;
        }
    }

    /// Mean expression over `known`, 0 for none.
    pub fn expression_mean(&self, known: &BTreeSet<TraitId>) -> f64 {
        let values: Vec<f64> = known
            .iter()
            .filter_map(|id| self.traits.get(id).map(|t| t.expression))
            .collect();
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }

    /// Share of traits that branched from another trait.
    pub fn innovation_share(&self) -> f64 {
        if self.traits.is_empty() {
            return 0.0;
        }
        let branched = self.traits.values().filter(|t| t.parent.is_some()).count();
        branched as f64 / self.traits.len() as f64
    }

    pub fn total_transmissions(&self) -> u64 {
        self.traits.values().map(|t| t.transmissions).sum()
    }

    /// Drops every trait outside `known` and returns how many went.
    pub fn retain_known(&mut self, known: &BTreeSet<TraitId>) -> usize {
        let before = self.traits.len();
        self.traits.retain(|id, _| known.contains(id));
        before - self.traits.len()
    }
}

/// Oldest traits are forgotten first once an agent knows more than this.
pub const MAX_KNOWN_TRAITS: usize = 64;

fn forget_oldest(known: &mut BTreeSet<TraitId>) {
    while known.len() > MAX_KNOWN_TRAITS {
        known.pop_first();
    }
}

/// Offers every trait the source knows and the target does not. Returns the
/// number of traits the target adopted.
pub fn transmit_culture<R: Rng>(
    source_known: &BTreeSet<TraitId>,
    target: AgentId,
    target_known: &mut BTreeSet<TraitId>,
    registry: &mut CultureRegistry,
    config: &CultureConfig,
    tick: u64,
    rng: &mut R,
) -> usize {
    if !config.enabled {
        return 0;
    }
    let offered: Vec<TraitId> = source_known.difference(target_known).copied().collect();
    let mut adopted = 0;
    for id in offered {
        if !rng.gen_bool(config.transmission_rate.clamp(0.0, 1.0)) {
            continue;
        }
        registry.record_transmission(id);
        let learned = if rng.gen_bool(config.innovation_rate.clamp(0.0, 1.0)) {
            registry.branch(id, target, tick, rng).unwrap_or(id)
        } else {
            id
        };
        target_known.insert(learned);
        adopted += 1;
    }
    forget_oldest(target_known);
    adopted
}

/// Spontaneous invention of a root trait.
pub fn maybe_invent<R: Rng>(
    agent: AgentId,
    known: &mut BTreeSet<TraitId>,
    registry: &mut CultureRegistry,
    config: &CultureConfig,
    tick: u64,
    rng: &mut R,
) -> Option<TraitId> {
    if !config.enabled || !rng.gen_bool(config.mutation_rate.clamp(0.0, 1.0)) {
        return None;
    }
    let id = registry.invent(agent, tick, rng);
    known.insert(id);
    forget_oldest(known);
    Some(id)
}

/// Traits a child learns from its parent at birth.
pub fn inherit_traits<R: Rng>(
    parent_known: &BTreeSet<TraitId>,
    config: &CultureConfig,
    rng: &mut R,
) -> BTreeSet<TraitId> {
    if !config.enabled {
        return BTreeSet::new();
    }
    parent_known
        .iter()
        .copied()
        .filter(|_| rng.gen_bool(config.transmission_rate.clamp(0.0, 1.0)))
        .collect()
}
