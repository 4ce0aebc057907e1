//! The bounded 2D space: boundary policy, terrain, climate, resource
//! placement and proximity queries.
//!
//! Agents themselves live in the engine's registry; the space only keeps a
//! per-tick index of their positions, rebuilt from the frozen pre-tick view,
//! so every query in a tick sees the same layout.

use crate::config::WorldConfig;
use crate::environment::{Climate, Conditions, Terrain};
use crate::error::{Result, SimError};
use crate::spatial_hash::SpatialHash;
use cogverse_data::{AgentId, BoundaryPolicy, Resource, ResourceId, Vec2};
use rand::Rng;
use std::collections::BTreeMap;

/// Initial resource value range.
pub const RESOURCE_VALUE_RANGE: (f64, f64) = (20.0, 100.0);
pub const RESOURCE_MAX_VALUE: f64 = 100.0;
/// Per-resource regrowth rate range, per unit of simulated time.
pub const RESOURCE_REGEN_RANGE: (f64, f64) = (0.05, 0.2);
/// Draws made when looking for an open spot before settling for any spot.
pub const PLACEMENT_ATTEMPTS: usize = 32;

/// Something found by a proximity query. Agents sort before resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Neighbor {
    Agent(AgentId),
    Resource(ResourceId),
}

#[derive(Debug, Clone)]
pub struct SpatialWorld {
    width: f64,
    height: f64,
    boundary: BoundaryPolicy,
    terrain: Terrain,
    climate: Climate,
    resources: BTreeMap<ResourceId, Resource>,
    next_resource_id: u64,
    agent_ids: Vec<AgentId>,
    agent_index: SpatialHash,
    resource_ids: Vec<ResourceId>,
    resource_index: SpatialHash,
    resources_dirty: bool,
}

impl SpatialWorld {
    pub fn new(config: &WorldConfig) -> Self {
        let width = config.width();
        let height = config.height();
        let wrap = config.boundary_type == BoundaryPolicy::Toroidal;
        let cell = config.interaction_radius.max(1.0);
        Self {
            width,
            height,
            boundary: config.boundary_type,
            terrain: Terrain::open(width, height),
            climate: Climate::mild(width, height, config.day_cycle),
            resources: BTreeMap::new(),
            next_resource_id: 0,
            agent_ids: Vec::new(),
            agent_index: SpatialHash::new(cell, width, height, wrap),
            resource_ids: Vec::new(),
            resource_index: SpatialHash::new(cell, width, height, wrap),
            resources_dirty: false,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    /// Scatters obstacles and local climate variation. Call before placing
    /// anything.
    pub fn generate_environment<R: Rng>(&mut self, obstacle_density: f64, rng: &mut R) {
        self.terrain.scatter(obstacle_density, rng);
        self.climate.vary(rng);
        tracing::debug!(
            obstacles = self.terrain.blocked_count(),
            "Environment generated"
        );
    }

    pub fn update_environment<R: Rng>(&mut self, tick: u64, dt: f64, rng: &mut R) {
        self.climate.update(tick, dt, rng);
    }

    pub fn is_obstacle(&self, position: Vec2) -> bool {
        self.terrain.is_blocked(position)
    }

    /// Inside the world and not on an obstacle.
    pub fn is_position_valid(&self, position: Vec2) -> bool {
        self.contains(position) && !self.is_obstacle(position)
    }

    pub fn block_cell(&mut self, position: Vec2) {
        self.terrain.block(position);
    }

    pub fn obstacle_count(&self) -> usize {
        self.terrain.blocked_count()
    }

    /// Local conditions; positions outside the world get [`Conditions::HARSH`].
    pub fn environment_at(&self, position: Vec2) -> Conditions {
        self.climate.at(position, self.width, self.height)
    }

    pub fn mean_temperature(&self) -> f64 {
        self.climate.mean_temperature()
    }

    /// Maps a position into the world according to the boundary policy.
    ///
    /// Toroidal worlds wrap modulo the size into `[0, size)`; reflective worlds
    /// mirror the overshoot back inside; absorbing worlds clamp.
    pub fn wrap_or_clamp(&self, position: Vec2) -> Vec2 {
        let mut p = position;
        let mut v = Vec2::ZERO;
        self.apply_boundary(&mut p, &mut v);
        p
    }

    /// Applies the boundary policy to a position and the matching velocity.
    pub fn apply_boundary(&self, position: &mut Vec2, velocity: &mut Vec2) {
        match self.boundary {
            BoundaryPolicy::Toroidal => {
                position.x = wrap_axis(position.x, self.width);
                position.y = wrap_axis(position.y, self.height);
            }
            BoundaryPolicy::Reflective => {
                reflect_axis(&mut position.x, &mut velocity.x, self.width);
                reflect_axis(&mut position.y, &mut velocity.y, self.height);
            }
            BoundaryPolicy::Absorbing => {
                absorb_axis(&mut position.x, &mut velocity.x, self.width);
                absorb_axis(&mut position.y, &mut velocity.y, self.height);
            }
        }
    }

    /// Places a position in the world, failing only when it is not finite.
    pub fn try_place(&self, position: Vec2) -> Result<Vec2> {
        if !position.is_finite() {
            return Err(SimError::WorldBounds {
                x: position.x,
                y: position.y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.wrap_or_clamp(position))
    }

    pub fn contains(&self, position: Vec2) -> bool {
        position.is_finite()
            && (0.0..=self.width).contains(&position.x)
            && (0.0..=self.height).contains(&position.y)
    }

    /// Shortest offset from `from` to `to` under the boundary policy.
    #[inline]
    pub fn delta(&self, from: Vec2, to: Vec2) -> Vec2 {
        self.agent_index.delta(from, to)
    }

    #[inline]
    pub fn distance(&self, a: Vec2, b: Vec2) -> f64 {
        self.delta(a, b).length()
    }

    pub fn random_position<R: Rng>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.gen_range(0.0..self.width),
            rng.gen_range(0.0..self.height),
        )
    }

    /// A random position off the obstacles, if one turns up within
    /// [`PLACEMENT_ATTEMPTS`] draws; otherwise the last draw.
    pub fn free_position<R: Rng>(&self, rng: &mut R) -> Vec2 {
        let mut position = self.random_position(rng);
        for _ in 1..PLACEMENT_ATTEMPTS {
            if self.is_position_valid(position) {
                break;
            }
            position = self.random_position(rng);
        }
        position
    }

    /// Drops a fresh resource at a random open position.
    pub fn place_resource<R: Rng>(&mut self, rng: &mut R) -> ResourceId {
        let position = self.free_position(rng);
        let value = rng.gen_range(RESOURCE_VALUE_RANGE.0..RESOURCE_VALUE_RANGE.1);
        let regeneration_rate = rng.gen_range(RESOURCE_REGEN_RANGE.0..RESOURCE_REGEN_RANGE.1);
        self.push_resource(position, value, regeneration_rate)
    }

    /// Adds a resource at a given position.
    pub fn insert_resource(
        &mut self,
        position: Vec2,
        value: f64,
        regeneration_rate: f64,
    ) -> Result<ResourceId> {
        let position = self.try_place(position)?;
        Ok(self.push_resource(position, value, regeneration_rate))
    }

    fn push_resource(&mut self, position: Vec2, value: f64, regeneration_rate: f64) -> ResourceId {
        let id = ResourceId(self.next_resource_id);
        self.next_resource_id += 1;
        self.resources.insert(
            id,
            Resource {
                id,
                position,
                value: value.clamp(0.0, RESOURCE_MAX_VALUE),
                max_value: RESOURCE_MAX_VALUE,
                regeneration_rate,
            },
        );
        self.resources_dirty = true;
        id
    }

    /// Removes up to `amount` from a resource and returns what was taken.
    pub fn consume_resource(&mut self, id: ResourceId, amount: f64) -> f64 {
        self.resources
            .get_mut(&id)
            .map_or(0.0, |resource| resource.consume(amount))
    }

    pub fn regenerate_resources(&mut self, dt: f64, scale: f64) {
        for resource in self.resources.values_mut() {
            resource.regenerate(dt, scale);
        }
    }

    pub fn resources(&self) -> &BTreeMap<ResourceId, Resource> {
        &self.resources
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn total_resource_value(&self) -> f64 {
        self.resources.values().map(|r| r.value).sum()
    }

    /// Rebuilds the agent index. `agents` must be sorted by id.
    pub fn index_agents(&mut self, agents: &[(AgentId, Vec2)]) {
        self.agent_ids.clear();
        self.agent_ids.extend(agents.iter().map(|(id, _)| *id));
        let positions: Vec<Vec2> = agents.iter().map(|(_, p)| *p).collect();
        self.agent_index.build_parallel(&positions);
    }

    /// Rebuilds the resource index if resources were added since the last build.
    pub fn reindex_resources(&mut self) {
        if !self.resources_dirty {
            return;
        }
        self.resource_ids = self.resources.keys().copied().collect();
        let positions: Vec<Vec2> = self.resources.values().map(|r| r.position).collect();
        self.resource_index.build_parallel(&positions);
        self.resources_dirty = false;
    }

    /// Indexed agents within `radius`, as positions in the slice last passed
    /// to [`index_agents`](Self::index_agents), ascending.
    pub fn agent_slots_within(&self, position: Vec2, radius: f64) -> Vec<usize> {
        let mut slots = Vec::new();
        self.agent_index.query_into(position, radius, &mut slots);
        slots
    }

    pub fn resources_within(&self, position: Vec2, radius: f64) -> Vec<ResourceId> {
        let mut slots = Vec::new();
        self.resource_index.query_into(position, radius, &mut slots);
        slots
            .into_iter()
            .filter_map(|slot| self.resource_ids.get(slot).copied())
            .filter(|id| self.resources.contains_key(id))
            .collect()
    }

    /// Every agent and resource within `radius` of `position`, sorted.
    pub fn neighbors_within(&self, position: Vec2, radius: f64) -> Vec<Neighbor> {
        let mut found: Vec<Neighbor> = self
            .agent_slots_within(position, radius)
            .into_iter()
            .filter_map(|slot| self.agent_ids.get(slot).map(|id| Neighbor::Agent(*id)))
            .collect();
        found.extend(
            self.resources_within(position, radius)
                .into_iter()
                .map(Neighbor::Resource),
        );
        found.sort_unstable();
        found
    }

    /// Nearest resource with value left, within `radius`.
    pub fn nearest_resource(&self, position: Vec2, radius: f64) -> Option<(ResourceId, f64)> {
        self.resources_within(position, radius)
            .into_iter()
            .filter_map(|id| {
                let r = self.resources.get(&id)?;
                (r.value > 0.0).then(|| (id, self.distance(position, r.position)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }
}

fn wrap_axis(value: f64, size: f64) -> f64 {
    let wrapped = value.rem_euclid(size);
    if wrapped >= size {
        0.0
    } else {
        wrapped
    }
}

fn reflect_axis(value: &mut f64, velocity: &mut f64, size: f64) {
    if *value < 0.0 {
        *value = -*value;
        *velocity = -*velocity;
    } else if *value > size {
        *value = 2.0 * size - *value;
        *velocity = -*velocity;
    }
    *value = value.clamp(0.0, size);
}

fn absorb_axis(value: &mut f64, velocity: &mut f64, size: f64) {
    if *value < 0.0 || *value > size {
        *value = value.clamp(0.0, size);
        *velocity = 0.0;
    }
}
