//! The serialized commit phase of a tick.
//!
//! Every mutation of the registry and the space happens here, in ascending
//! agent id order, after all decisions of the tick are known. Neighbor
//! lookups use the positions frozen at the start of the tick.

use crate::model::world::{Intent, World};
use cogverse_core::brain::BrainLogic;
use cogverse_core::economy::{self, DeathCause, Offspring, FEED_BITE, FEED_REACH};
use cogverse_core::error::{Result, SimError};
use cogverse_core::memory::MemoryLogic;
use cogverse_core::physics::{self, kinetic_energy, Kinematics, PhysicsReport};
use cogverse_core::rng::{agent_rng, Stream};
use cogverse_core::society;
use cogverse_data::{
    AgentId, Genome, Identity, MemoryState, Message, Observation, ObservationKind, Position,
    SocialState, TraitId, Vec2, Velocity, Vitals,
};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

/// A child waiting for an id, spawned after removals.
#[derive(Debug, Clone)]
pub struct PendingBirth {
    pub parent: Identity,
    pub offspring: Offspring,
    pub known_traits: BTreeSet<TraitId>,
}

/// An agent marked for removal at the end of the tick.
#[derive(Debug, Clone, Copy)]
pub struct PendingDeath {
    pub handle: hecs::Entity,
    pub id: AgentId,
    pub age: u64,
    pub cause: DeathCause,
}

#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    pub births: Vec<PendingBirth>,
    pub deaths: Vec<PendingDeath>,
}

/// Mutable copy of one agent's components for the duration of the commit.
struct AgentState {
    handle: hecs::Entity,
    identity: Identity,
    kinematics: Kinematics,
    vitals: Vitals,
    memory: MemoryState,
    social: SocialState,
    start_energy: f64,
    communicated: bool,
}

fn stream_rng(
    cache: &mut Option<ChaCha8Rng>,
    seed: u64,
    tick: u64,
    agent: AgentId,
    stream: Stream,
) -> &mut ChaCha8Rng {
    cache.get_or_insert_with(|| agent_rng(seed, tick, agent, stream))
}

impl World {
    /// Applies every intent of the tick. Births and deaths are returned, not
    /// applied.
    pub(crate) fn commit(&mut self, intents: &[Intent]) -> Result<CommitOutcome> {
        let tick = self.tick();
        let mut agents = self.load_states(intents)?;
        let mut culture_rngs: Vec<Option<ChaCha8Rng>> = vec![None; agents.len()];

        self.commit_physics(intents, &mut agents);
        self.commit_memory(intents, &mut agents, tick);
        self.commit_feeding(intents, &mut agents, tick);
        self.commit_communication(intents, &mut agents, &mut culture_rngs, tick);
        self.commit_cooperation(intents, &mut agents, tick);
        self.commit_invention(&mut agents, &mut culture_rngs, tick);
        self.commit_metabolism(intents, &mut agents);

        let mut outcome = CommitOutcome::default();
        self.commit_reproduction(intents, &mut agents, &mut outcome, tick)?;

        let behavior = &self.config.agents.behavior;
        for agent in &agents {
            if let Some(cause) = economy::check_mortality(&agent.vitals, behavior) {
                outcome.deaths.push(PendingDeath {
                    handle: agent.handle,
                    id: agent.identity.id,
                    age: agent.vitals.age,
                    cause,
                });
            }
        }

        self.commit_learning(intents, &agents);
        self.store_states(agents, tick)?;
        Ok(outcome)
    }

    fn load_states(&mut self, intents: &[Intent]) -> Result<Vec<AgentState>> {
        let tick = self.tick();
        let mut agents = Vec::with_capacity(intents.len());
        for intent in intents {
            let (identity, position, velocity, vitals, memory, social) = self
                .ecs
                .query_one_mut::<(
                    &Identity,
                    &Position,
                    &Velocity,
                    &Vitals,
                    &mut MemoryState,
                    &mut SocialState,
                )>(intent.handle)
                .map_err(|_| SimError::fatal(tick, "agent vanished between decide and commit"))?;
            agents.push(AgentState {
                handle: intent.handle,
                identity: identity.clone(),
                kinematics: Kinematics {
                    position: position.0,
                    velocity: velocity.0,
                },
                vitals: vitals.clone(),
                memory: std::mem::take(memory),
                social: std::mem::take(social),
                start_energy: vitals.energy,
                communicated: false,
            });
        }
        Ok(agents)
    }

    fn store_states(&mut self, agents: Vec<AgentState>, tick: u64) -> Result<()> {
        for agent in agents {
            let (position, velocity, vitals, memory, social) = self
                .ecs
                .query_one_mut::<(
                    &mut Position,
                    &mut Velocity,
                    &mut Vitals,
                    &mut MemoryState,
                    &mut SocialState,
                )>(agent.handle)
                .map_err(|_| SimError::fatal(tick, "agent vanished during commit"))?;
            position.0 = agent.kinematics.position;
            velocity.0 = agent.kinematics.velocity;
            *vitals = agent.vitals;
            *memory = agent.memory;
            *social = agent.social;
        }
        Ok(())
    }

    fn commit_physics(&mut self, intents: &[Intent], agents: &mut [AgentState]) {
        let config = &self.config.physics;
        let dt = self.time.dt();
        // A body that is already non-finite carries no countable energy.
        let finite_energy = |v: Vec2| Some(kinetic_energy(v)).filter(|e| e.is_finite());
        let mut report = PhysicsReport {
            kinetic_before: agents
                .iter()
                .filter_map(|a| finite_energy(a.kinematics.velocity))
                .sum(),
            ..PhysicsReport::default()
        };

        let mut bodies = Vec::with_capacity(agents.len());
        for (agent, intent) in agents.iter_mut().zip(intents) {
            let force = intent.decision.steering * config.max_force;
            let body = match physics::advance(
                agent.identity.id,
                agent.kinematics,
                force,
                config,
                &self.space,
                dt,
            ) {
                Ok((body, energy)) => {
                    report.absorb_step(&energy);
                    body
                }
                Err(e) => {
                    tracing::warn!(agent = %agent.identity.id, error = %e, "Kinematics zeroed");
                    self.metrics.record_fault();
                    agent.vitals.faulted = true;
                    report.boundary_loss +=
                        finite_energy(agent.kinematics.velocity).unwrap_or(0.0);
                    let position = agent.kinematics.position;
                    Kinematics {
                        position: if position.is_finite() { position } else { Vec2::ZERO },
                        velocity: Vec2::ZERO,
                    }
                }
            };
            bodies.push(body);
        }

        if config.collision_detection {
            let contact = (2.0 * config.agent_radius).min(self.config.world.interaction_radius);
            let collisions = physics::resolve_collisions(&mut bodies, contact, config, &self.space);
            report.collisions = collisions.collisions;
            report.collision_dissipation = collisions.dissipated;
        }
        report.kinetic_after = bodies.iter().map(|b| kinetic_energy(b.velocity)).sum();

        for (agent, body) in agents.iter_mut().zip(&bodies) {
            agent.social.distance_travelled +=
                self.space.distance(agent.kinematics.position, body.position);
            agent.kinematics = *body;
        }

        if config.entropy_increase {
            self.entropy.record(&report);
            self.entropy
                .observe(&bodies, self.space.width(), self.space.height());
        }
        self.last_physics = report;
    }

    fn commit_memory(&self, intents: &[Intent], agents: &mut [AgentState], tick: u64) {
        let config = &self.config.agents.memory;
        let consolidate =
            config.consolidation_interval > 0 && tick % config.consolidation_interval == 0;
        for (agent, intent) in agents.iter_mut().zip(intents) {
            agent.memory.decay(config);
            for observation in &intent.percept.observations {
                agent.memory.remember(observation.clone(), config);
            }
            if consolidate {
                agent.memory.consolidate(config);
            }
        }
    }

    /// Contention for a resource goes to the lowest id.
    fn commit_feeding(&mut self, intents: &[Intent], agents: &mut [AgentState], tick: u64) {
        let memory_config = &self.config.agents.memory;
        for (agent, intent) in agents.iter_mut().zip(intents) {
            if !intent.decision.consume || agent.vitals.faulted {
                continue;
            }
            let position = agent.kinematics.position;
            let Some((resource, _)) = self.space.nearest_resource(position, FEED_REACH) else {
                continue;
            };
            let Some(place) = self.space.resource(resource).map(|r| r.position) else {
                continue;
            };
            let taken = economy::feed(&mut agent.vitals, &mut self.space, resource);
            if taken > 0.0 {
                agent.social.resources_consumed += taken;
                agent.memory.remember(
                    Observation {
                        kind: ObservationKind::Feeding,
                        position: place,
                        value: (taken / FEED_BITE).clamp(0.0, 1.0),
                        tick,
                    },
                    memory_config,
                );
            } else {
                agent
                    .memory
                    .devalue_location(ObservationKind::Resource, place, 0.5);
            }
        }
    }

    /// Delivers broadcasts from frozen positions. Messages land in the
    /// receivers' inboxes for the next tick.
    fn commit_communication(
        &mut self,
        intents: &[Intent],
        agents: &mut [AgentState],
        culture_rngs: &mut [Option<ChaCha8Rng>],
        tick: u64,
    ) {
        let comm = &self.config.society.communication;
        if !comm.enabled || comm.bandwidth == 0 {
            for agent in agents.iter_mut() {
                agent.social.inbox.clear();
            }
            return;
        }

        let mut inboxes: Vec<Vec<Message>> = vec![Vec::new(); agents.len()];
        let mut society_rngs: Vec<Option<ChaCha8Rng>> = vec![None; agents.len()];
        for sender in 0..agents.len() {
            if !intents[sender].decision.communicate || agents[sender].vitals.faulted {
                continue;
            }
            agents[sender].communicated = true;

            let frozen = &self.snapshots[sender];
            let food_direction = intents[sender]
                .percept
                .nearest_resource
                .map_or(Vec2::ZERO, |r| r.direction);
            let payload = society::encode_payload(
                frozen.energy_ratio(),
                food_direction,
                &intents[sender].decision.activations.outputs,
                comm.bandwidth,
            );
            // Lent out for the broadcast; the sender never receives its own.
            let sender_known = std::mem::take(&mut agents[sender].social.known_traits);

            let mut delivered = 0u64;
            for receiver_slot in society::broadcast(sender, frozen.position, &self.space, comm) {
                let Some(receiver) = agents.get_mut(receiver_slot) else {
                    continue;
                };
                let receiver_id = receiver.identity.id;
                let rng = stream_rng(
                    &mut society_rngs[receiver_slot],
                    self.seed,
                    tick,
                    receiver_id,
                    Stream::Society,
                );
                inboxes[receiver_slot].push(society::receive(
                    frozen.id,
                    frozen.position,
                    &payload,
                    comm.noise_level,
                    rng,
                ));
                receiver.social.social_interactions += 1;

                let rng = stream_rng(
                    &mut culture_rngs[receiver_slot],
                    self.seed,
                    tick,
                    receiver_id,
                    Stream::Culture,
                );
                society::transmit_culture(
                    &sender_known,
                    receiver_id,
                    &mut receiver.social.known_traits,
                    &mut self.culture,
                    &self.config.society.culture,
                    tick,
                    rng,
                );
                delivered += 1;
            }
            agents[sender].social.known_traits = sender_known;
            agents[sender].social.social_interactions += delivered;
            self.total_interactions += delivered;
        }

        for (agent, inbox) in agents.iter_mut().zip(inboxes) {
            agent.social.inbox = inbox;
        }
    }

    /// Cooperating agents give part of their energy to their nearest
    /// neighbor inside the interaction radius.
    fn commit_cooperation(&mut self, intents: &[Intent], agents: &mut [AgentState], tick: u64) {
        let radius = self.config.world.interaction_radius;
        let memory_config = &self.config.agents.memory;
        for donor in 0..agents.len() {
            if !intents[donor].decision.cooperate || agents[donor].vitals.faulted {
                continue;
            }
            let Some(share) = economy::cooperation_share(agents[donor].vitals.energy) else {
                continue;
            };
            let origin = self.snapshots[donor].position;
            let partner = self
                .space
                .agent_slots_within(origin, radius)
                .into_iter()
                .filter(|&slot| slot != donor && slot < agents.len())
                .map(|slot| (slot, self.space.distance(origin, self.snapshots[slot].position)))
                .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
                .map(|(slot, _)| slot);
            let Some(partner) = partner else {
                continue;
            };

            let recipient = &agents[partner].vitals;
            let given = share.min((recipient.max_energy - recipient.energy).max(0.0));
            if given <= 0.0 {
                continue;
            }
            agents[donor].vitals.energy -= given;
            agents[partner].vitals.energy += given;

            let partner_position = self.snapshots[partner].position;
            agents[partner].memory.remember(
                Observation {
                    kind: ObservationKind::Cooperation,
                    position: origin,
                    value: (given / FEED_BITE).clamp(0.0, 1.0),
                    tick,
                },
                memory_config,
            );
            agents[donor].memory.remember(
                Observation {
                    kind: ObservationKind::Cooperation,
                    position: partner_position,
                    value: 0.1,
                    tick,
                },
                memory_config,
            );
            self.metrics.increment_counter("cooperation_transfers");
        }
    }

    fn commit_invention(
        &mut self,
        agents: &mut [AgentState],
        culture_rngs: &mut [Option<ChaCha8Rng>],
        tick: u64,
    ) {
        for (agent, cache) in agents.iter_mut().zip(culture_rngs.iter_mut()) {
            let id = agent.identity.id;
            let rng = stream_rng(cache, self.seed, tick, id, Stream::Culture);
            if let Some(trait_id) = society::maybe_invent(
                id,
                &mut agent.social.known_traits,
                &mut self.culture,
                &self.config.society.culture,
                tick,
                rng,
            ) {
                tracing::debug!(
                    agent = %id,
                    trait_id = trait_id.0,
                    tick,
                    "Cultural trait invented"
                );
            }
        }
    }

    fn commit_metabolism(&self, intents: &[Intent], agents: &mut [AgentState]) {
        let behavior = &self.config.agents.behavior;
        let max_speed = self.config.physics.max_speed;
        let cost = self.config.society.communication.cost;
        let dt = self.time.dt();
        for (agent, intent) in agents.iter_mut().zip(intents) {
            let activity = economy::activity_level(
                agent.kinematics.velocity.length(),
                max_speed,
                agent.communicated,
                cost,
            );
            economy::apply_energy_decay(&mut agent.vitals, activity, behavior, dt);
            let survival = self
                .space
                .environment_at(agent.kinematics.position)
                .survival_factor();
            economy::update_health(&mut agent.vitals, intent.decision.rest, survival, dt);
            agent.vitals.age += 1;
            agent.social.last_action = intent.decision.action;
        }
    }

    /// Reproduction sees the population including births earlier in the
    /// same tick, so the cap holds after the tick.
    fn commit_reproduction(
        &mut self,
        intents: &[Intent],
        agents: &mut [AgentState],
        outcome: &mut CommitOutcome,
        tick: u64,
    ) -> Result<()> {
        let alive = agents.len();
        for (agent, intent) in agents.iter_mut().zip(intents) {
            if !intent.decision.reproduce || agent.vitals.faulted {
                continue;
            }
            let genome = self
                .ecs
                .get::<&Genome>(agent.handle)
                .map_err(|_| SimError::fatal(tick, "agent lost its genome"))?;
            let mut rng = agent_rng(self.seed, tick, agent.identity.id, Stream::Reproduction);
            match economy::attempt_reproduction(
                &mut agent.vitals,
                &genome,
                agent.kinematics.position,
                alive + outcome.births.len(),
                &self.space,
                &self.config,
                &mut rng,
            ) {
                Ok(Some(offspring)) => {
                    let known_traits = society::inherit_traits(
                        &agent.social.known_traits,
                        &self.config.society.culture,
                        &mut rng,
                    );
                    agent.social.offspring += 1;
                    outcome.births.push(PendingBirth {
                        parent: agent.identity.clone(),
                        offspring,
                        known_traits,
                    });
                }
                Ok(None) => {}
                Err(e) if !e.is_fatal() => {
                    self.metrics.increment_counter("capacity_rejections");
                    tracing::debug!(
                        agent = %agent.identity.id,
                        error = %e,
                        "Reproduction rejected"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Nudges the weights behind each surviving agent's dominant action by the
    /// normalized energy change of the tick.
    fn commit_learning(&mut self, intents: &[Intent], agents: &[AgentState]) {
        let learning_rate = self.config.agents.neural_network.learning_rate as f32;
        if learning_rate == 0.0 {
            return;
        }
        for (agent, intent) in agents.iter().zip(intents) {
            let Some(channel) = intent.decision.action.output_channel() else {
                continue;
            };
            if agent.vitals.faulted || agent.vitals.max_energy <= 0.0 {
                continue;
            }
            let gained = agent.vitals.energy - agent.start_energy;
            let reward = (gained / agent.vitals.max_energy) as f32;
            if let Ok(genome) = self.ecs.query_one_mut::<&mut Genome>(agent.handle) {
                genome
                    .brain
                    .reinforce(&intent.decision.activations, channel, reward, learning_rate);
            }
        }
    }
}
