use crate::model::world::{Intent, SystemContext, World};
use cogverse_core::cognition::{self, Decision, Percept, PerceptionContext};
use cogverse_core::error::Result;
use cogverse_core::rng::{agent_rng, Stream};
use cogverse_data::{Genome, Identity, MemoryState, SocialState};
use rayon::prelude::*;
use std::time::Instant;

/// What one tick changed in the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    pub tick: u64,
    pub births: usize,
    pub deaths: usize,
    pub population: usize,
}

impl World {
    /// Runs one tick: frozen perception and decisions in parallel, then the
    /// serialized commit, then removals and births.
    ///
    /// Per-agent anomalies are resolved inside the tick. An `EngineFatal`
    /// error means the registry can no longer be trusted and the run must
    /// stop.
    pub fn step(&mut self) -> Result<TickOutcome> {
        let start = Instant::now();
        let tick = self.tick();

        self.capture_snapshots();
        let positions: Vec<_> = self
            .frozen_snapshots()
            .iter()
            .map(|s| (s.id, s.position))
            .collect();
        self.space.index_agents(&positions);
        self.space.reindex_resources();

        let intents = {
            let ctx = SystemContext {
                config: &self.config,
                space: &self.space,
                snapshots: &self.snapshots,
                tick,
                world_seed: self.seed,
            };
            perceive_and_decide(&self.ecs, &ctx)
        };

        let population_before = intents.len();
        let outcome = self.commit(&intents)?;
        let (births, deaths) = self.finalize_tick(outcome, population_before)?;

        self.space
            .regenerate_resources(self.time.dt(), self.config.world.resource_regeneration);
        self.space
            .update_environment(tick, self.time.dt(), &mut self.rng);
        self.observe(tick);

        let population = self.population();
        let elapsed = start.elapsed();
        self.metrics.record_tick(
            elapsed,
            population,
            self.space.resources().len(),
            births,
            deaths,
        );
        self.time.record_tick_duration(elapsed);
        self.time.step();

        Ok(TickOutcome {
            tick,
            births,
            deaths,
            population,
        })
    }

    /// Runs `steps` ticks, stopping at the first fatal error.
    pub fn run(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }
}

/// Perception and decision for every agent, in ascending id order.
///
/// Reads only the frozen snapshot, the current space index and each agent's
/// own components, so the result does not depend on scheduling.
pub(crate) fn perceive_and_decide(ecs: &hecs::World, ctx: &SystemContext<'_>) -> Vec<Intent> {
    let mut query = ecs.query::<(&Identity, &Genome, &MemoryState, &SocialState)>();
    let mut components: Vec<_> = query.iter().collect();
    components.sort_by_key(|(_, (identity, ..))| identity.id);

    let perception = PerceptionContext {
        space: ctx.space,
        agents: ctx.snapshots,
        config: ctx.config,
        tick: ctx.tick,
    };

    components
        .par_iter()
        .enumerate()
        .map(|(slot, (handle, (identity, genome, memory, social)))| {
            let mut rng = agent_rng(ctx.world_seed, ctx.tick, identity.id, Stream::Perception);
            let me = &ctx.snapshots[slot];
            if !me.position.is_finite() || !me.velocity.is_finite() {
                return Intent {
                    handle: *handle,
                    percept: Percept::blank(),
                    decision: Decision::idle(),
                };
            }
            let percept = cognition::perceive(
                slot,
                memory,
                &social.inbox,
                &genome.traits,
                &perception,
                &mut rng,
            );
            let decision = cognition::decide(
                genome,
                &percept,
                me.energy_ratio(),
                me.culture_expression,
                ctx.config,
                &mut rng,
            );
            Intent {
                handle: *handle,
                percept,
                decision,
            }
        })
        .collect()
}
