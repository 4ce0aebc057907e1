//! Working, long-term and spatial memory.

use crate::config::MemoryConfig;
use cogverse_data::{
    LongTermItem, MemoryState, MemorySummary, MemoryTrace, Observation, ObservationKind,
    SpatialMemory, Vec2,
};

/// Observations of the same kind closer than this are the same memory.
pub const SIMILARITY_RADIUS: f64 = 2.0;
/// Working traces and long-term items below this are forgotten.
pub const FORGET_THRESHOLD: f64 = 0.1;

fn similar(a: &Observation, kind: ObservationKind, position: Vec2) -> bool {
    a.kind == kind && (a.position - position).length() < SIMILARITY_RADIUS
}

fn by_descending(a: f64, b: f64) -> std::cmp::Ordering {
    b.total_cmp(&a)
}

pub trait MemoryLogic {
    /// Records an observation in working memory and, for valued places, in
    /// the spatial map.
    fn remember(&mut self, observation: Observation, config: &MemoryConfig);
    /// Per-tick strength decay of working traces.
    fn decay(&mut self, config: &MemoryConfig);
    /// Promotes frequently accessed traces and ages the long-term store.
    fn consolidate(&mut self, config: &MemoryConfig);
    fn remember_location(
        &mut self,
        kind: ObservationKind,
        position: Vec2,
        value: f64,
        tick: u64,
        config: &MemoryConfig,
    );
    /// Marks a remembered place as less valuable, e.g. after finding it empty.
    fn devalue_location(&mut self, kind: ObservationKind, position: Vec2, factor: f64);
    fn best_location(&self, kind: ObservationKind) -> Option<&SpatialMemory>;
    fn summary(&self, config: &MemoryConfig) -> MemorySummary;
}

impl MemoryLogic for MemoryState {
    fn remember(&mut self, observation: Observation, config: &MemoryConfig) {
        if matches!(
            observation.kind,
            ObservationKind::Resource | ObservationKind::Feeding
        ) && observation.value > 0.0
        {
            self.remember_location(
                ObservationKind::Resource,
                observation.position,
                observation.value,
                observation.tick,
                config,
            );
        }

        if let Some(trace) = self
            .working
            .iter_mut()
            .find(|t| similar(&t.observation, observation.kind, observation.position))
        {
            trace.accesses = trace.accesses.saturating_add(1);
            trace.strength = 1.0;
            trace.observation = observation;
            return;
        }

        if config.working_capacity == 0 {
            return;
        }
        while self.working.len() >= config.working_capacity {
            let weakest = self
                .working
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.strength.total_cmp(&b.strength))
                .map(|(i, _)| i);
            match weakest {
                Some(i) => {
                    self.working.remove(i);
                }
                None => break,
            }
        }
        self.working.push_back(MemoryTrace {
            observation,
            strength: 1.0,
            accesses: 0,
            consolidated: false,
        });
    }

    fn decay(&mut self, config: &MemoryConfig) {
        for trace in &mut self.working {
            trace.strength *= config.decay_rate;
        }
        self.working.retain(|t| t.strength >= FORGET_THRESHOLD);
    }

    fn consolidate(&mut self, config: &MemoryConfig) {
        if !config.consolidation {
            return;
        }
        for item in &mut self.long_term {
            item.importance *= config.decay_rate;
        }
        self.long_term.retain(|i| i.importance >= FORGET_THRESHOLD);

        for trace in &mut self.working {
            if trace.accesses < config.consolidation_threshold {
                continue;
            }
            let importance =
                (trace.strength * (0.5 + 0.5 * trace.observation.value.abs())).clamp(0.0, 1.0);
            let obs = &trace.observation;
            match self
                .long_term
                .iter_mut()
                .find(|i| similar(&i.observation, obs.kind, obs.position))
            {
                Some(item) => {
                    item.importance = (item.importance + importance * 0.5).min(1.0);
                    item.accesses = item.accesses.saturating_add(trace.accesses);
                    item.observation = obs.clone();
                }
                None => self.long_term.push(LongTermItem {
                    observation: obs.clone(),
                    importance,
                    accesses: trace.accesses,
                }),
            }
            trace.consolidated = true;
            trace.accesses = 0;
        }

        if self.long_term.len() > config.capacity {
            self.long_term
                .sort_by(|a, b| by_descending(a.importance, b.importance));
            self.long_term.truncate(config.capacity);
        }
    }

    fn remember_location(
        &mut self,
        kind: ObservationKind,
        position: Vec2,
        value: f64,
        tick: u64,
        config: &MemoryConfig,
    ) {
        if let Some(place) = self
            .spatial
            .iter_mut()
            .find(|p| p.kind == kind && (p.position - position).length() < SIMILARITY_RADIUS)
        {
            place.position = position;
            place.value = value;
            place.tick = tick;
            return;
        }
        self.spatial.push(SpatialMemory {
            kind,
            position,
            value,
            tick,
        });
        if self.spatial.len() > config.capacity {
            self.spatial.sort_by(|a, b| by_descending(a.value, b.value));
            self.spatial.truncate(config.capacity);
        }
    }

    fn devalue_location(&mut self, kind: ObservationKind, position: Vec2, factor: f64) {
        for place in self
            .spatial
            .iter_mut()
            .filter(|p| p.kind == kind && (p.position - position).length() < SIMILARITY_RADIUS)
        {
            place.value *= factor;
        }
        self.spatial.retain(|p| p.value > 0.0);
    }

    fn best_location(&self, kind: ObservationKind) -> Option<&SpatialMemory> {
        self.spatial
            .iter()
            .filter(|p| p.kind == kind && p.value > 0.0)
            .max_by(|a, b| a.value.total_cmp(&b.value))
    }

    fn summary(&self, config: &MemoryConfig) -> MemorySummary {
        let ratio = |n: usize, cap: usize| {
            if cap == 0 {
                0.0
            } else {
                (n as f64 / cap as f64).min(1.0)
            }
        };
        let mean_importance = if self.long_term.is_empty() {
            0.0
        } else {
            self.long_term.iter().map(|i| i.importance).sum::<f64>() / self.long_term.len() as f64
        };
        MemorySummary {
            working_fill: ratio(self.working.len(), config.working_capacity),
            long_term_fill: ratio(self.long_term.len(), config.capacity),
            mean_importance,
            spatial_coverage: ratio(self.spatial.len(), config.capacity),
        }
    }
}
