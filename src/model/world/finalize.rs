use crate::model::world::commit::{CommitOutcome, PendingBirth, PendingDeath};
use crate::model::world::World;
use cogverse_core::brain::BrainLogic;
use cogverse_core::error::{Result, SimError};
use cogverse_core::lifecycle;
use cogverse_core::memory::MemoryLogic;
use cogverse_data::{Genome, Identity, MemoryState, SocialState, TraitId, Vitals};
use std::collections::BTreeSet;
use cogverse_observer::{summarize, AgentObservation};

impl World {
    /// Removes the dead, spawns the newborn and checks the population books.
    pub(crate) fn finalize_tick(
        &mut self,
        outcome: CommitOutcome,
        population_before: usize,
    ) -> Result<(usize, usize)> {
        let tick = self.tick();
        let deaths = self.process_deaths(&outcome.deaths)?;
        let births = self.process_births(outcome.births);

        let population = self.population();
        let expected = (population_before + births).checked_sub(deaths);
        if expected != Some(population) {
            tracing::error!(
                tick,
                population_before,
                births,
                deaths,
                population,
                "Population accounting mismatch"
            );
            return Err(SimError::fatal(
                tick,
                format!(
                    "population {population} after {population_before} - {deaths} + {births}"
                ),
            ));
        }
        if population > self.config.world.max_agents {
            tracing::error!(tick, population, "Population cap exceeded");
            return Err(SimError::fatal(
                tick,
                format!(
                    "population {population} exceeds cap {}",
                    self.config.world.max_agents
                ),
            ));
        }
        if population == 0 && population_before > 0 {
            tracing::info!(tick, "Population extinct");
        }

        if deaths > 0 {
            self.prune_culture();
        }

        self.last_births = births;
        self.last_deaths = deaths;
        Ok((births, deaths))
    }

    /// Forgets cultural traits no living agent still knows.
    pub(crate) fn prune_culture(&mut self) {
        let living: BTreeSet<TraitId> = self
            .ecs
            .query::<&SocialState>()
            .iter()
            .flat_map(|(_, social)| social.known_traits.iter().copied())
            .collect();
        let dropped = self.culture.retain_known(&living);
        if dropped > 0 {
            tracing::debug!(dropped, remaining = self.culture.len(), "Culture pruned");
        }
    }

    pub(crate) fn process_deaths(&mut self, deaths: &[PendingDeath]) -> Result<usize> {
        let tick = self.tick();
        for death in deaths {
            self.ecs.despawn(death.handle).map_err(|_| {
                SimError::fatal(tick, format!("{} vanished before removal", death.id))
            })?;
            tracing::debug!(
                agent = %death.id,
                age = death.age,
                cause = %death.cause,
                tick,
                "Agent died"
            );
        }
        Ok(deaths.len())
    }

    /// Spawns children under fresh ids, in the order their parents decided.
    pub(crate) fn process_births(&mut self, births: Vec<PendingBirth>) -> usize {
        let tick = self.tick();
        let count = births.len();
        for birth in births {
            let id = self.allocate_id();
            tracing::debug!(
                agent = %id,
                parent = %birth.parent.id,
                generation = birth.parent.generation + 1,
                tick,
                "Agent born"
            );
            let record = lifecycle::create_child(
                id,
                &birth.parent,
                birth.offspring,
                birth.known_traits,
                tick,
                &self.config,
            );
            self.ecs.spawn(record.into_components());
        }
        count
    }

    /// Feeds the emergence observer when a sample is due.
    pub(crate) fn observe(&mut self, tick: u64) {
        if !self.observer.should_sample(tick) {
            return;
        }
        let memory_config = &self.config.agents.memory;
        let mut rows: Vec<_> = self
            .ecs
            .query::<(&Identity, &Genome, &Vitals, &MemoryState, &SocialState)>()
            .iter()
            .map(|(_, (identity, genome, vitals, memory, social))| {
                (
                    identity.id,
                    AgentObservation {
                        action: social.last_action,
                        complexity: genome.brain.complexity(),
                        mean_abs_weight: genome.brain.mean_abs_weight(),
                        energy_ratio: vitals.energy_ratio(),
                        memory: memory.summary(memory_config),
                        social_interactions: social.social_interactions,
                    },
                )
            })
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        let agents: Vec<AgentObservation> = rows.into_iter().map(|(_, row)| row).collect();

        let sample = summarize(tick, &agents, self.culture.innovation_share());
        self.last_signals = self.observer.sample(sample).into_iter().collect();
    }
}
