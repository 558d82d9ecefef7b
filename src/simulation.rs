use std::collections::HashMap;

use ::rand::SeedableRng;
use macroquad::prelude::Vec3;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::AgentId;
use crate::config::{self, FlockConfig};
use crate::environment::{EnvironmentQuery, Scene};
use crate::flock::FlockRegistry;
use crate::spatial_hash::{BruteForce, NeighborQuery, SpatialHash};
use crate::steering::{self, NeighborState, SteeringForces};

/// Which agent states a step reads while updating the flock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOrder {
    /// Later agents see the already-updated state of earlier ones.
    #[default]
    InPlace,
    /// Every agent reads the states from the start of the step.
    Snapshot,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborStrategy {
    BruteForce,
    #[default]
    SpatialHash,
}

impl NeighborStrategy {
    pub fn build(self, cell_size: f32) -> Box<dyn NeighborQuery> {
        match self {
            NeighborStrategy::BruteForce => Box::new(BruteForce::new()),
            NeighborStrategy::SpatialHash => Box::new(SpatialHash::new(cell_size)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NeighborStrategy::BruteForce => "Brute force",
            NeighborStrategy::SpatialHash => "Spatial hash",
        }
    }
}

pub struct SimState<E = Scene> {
    pub flock: FlockRegistry,
    pub environment: E,
    pub update_order: UpdateOrder,
    neighbor_strategy: NeighborStrategy,
    neighbor_index: Box<dyn NeighborQuery>,
    index_cell_size: f32,
    pub rng: ChaCha8Rng,
    pub seed: u64,
    pub tick_count: u64,
    pub paused: bool,
    pub speed_multiplier: f32,
    pub show_probes: bool,
    last_forces: HashMap<AgentId, SteeringForces>,

    // Per-step scratch, kept to avoid reallocating every tick.
    order: Vec<u32>,
    positions: Vec<Vec3>,
    frozen: Vec<NeighborState>,
    candidates: Vec<usize>,
}

impl SimState<Scene> {
    /// Default config, a generated scene, and `agent_count` agents spread inside the boundary.
    pub fn new(agent_count: usize, seed: u64) -> Self {
        Self::with_config(FlockConfig::default(), agent_count, seed)
    }

    /// Like [`SimState::new`] with a caller-supplied config. Invalid fields are clamped.
    pub fn with_config(config: FlockConfig, agent_count: usize, seed: u64) -> Self {
        let config = config.sanitized();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let environment = Scene::generate(&config.boundary, seed, &mut rng);
        let spawn = config.boundary.shrunk(config.boundary_margin);

        let mut flock = FlockRegistry::default();
        if let Err(err) = flock.set_config(config) {
            warn!(%err, "sanitized config still invalid, using defaults");
        }
        flock.populate(agent_count.min(config::MAX_AGENT_COUNT), &spawn, &mut rng);

        let mut state = Self::with_environment(flock, environment, seed);
        state.rng = rng;
        info!(agents = state.flock.len(), seed, "simulation created");
        state
    }
}

impl<E> SimState<E> {
    pub fn with_environment(flock: FlockRegistry, environment: E, seed: u64) -> Self {
        let strategy = NeighborStrategy::default();
        let cell_size = index_cell_size(flock.config());
        Self {
            flock,
            environment,
            update_order: UpdateOrder::default(),
            neighbor_strategy: strategy,
            neighbor_index: strategy.build(cell_size),
            index_cell_size: cell_size,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            tick_count: 0,
            paused: false,
            speed_multiplier: 1.0,
            show_probes: false,
            last_forces: HashMap::new(),
            order: Vec::new(),
            positions: Vec::new(),
            frozen: Vec::new(),
            candidates: Vec::new(),
        }
    }

    pub fn neighbor_strategy(&self) -> NeighborStrategy {
        self.neighbor_strategy
    }

    pub fn set_neighbor_strategy(&mut self, strategy: NeighborStrategy) {
        if strategy == self.neighbor_strategy {
            return;
        }
        self.neighbor_strategy = strategy;
        self.rebuild_neighbor_index();
        debug!(?strategy, "neighbor strategy changed");
    }

    fn rebuild_neighbor_index(&mut self) {
        self.index_cell_size = index_cell_size(self.flock.config());
        self.neighbor_index = self.neighbor_strategy.build(self.index_cell_size);
    }

    /// Forces computed for `id` during the most recent step.
    pub fn last_forces(&self, id: AgentId) -> Option<&SteeringForces> {
        self.last_forces.get(&id)
    }
}

impl<E: EnvironmentQuery> SimState<E> {
    /// Advance by the fixed timestep.
    pub fn tick(&mut self) {
        self.step(config::FIXED_DT);
    }

    /// Advance every agent by `dt` seconds, in registry order.
    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            warn!(dt, "step ignored: dt must be finite and positive");
            return;
        }
        self.tick_count += 1;
        self.last_forces.clear();

        self.order.clear();
        self.order.extend_from_slice(self.flock.arena().order());
        if self.order.is_empty() {
            return;
        }

        let cfg = self.flock.config().clone();
        if index_cell_size(&cfg) != self.index_cell_size {
            self.rebuild_neighbor_index();
            debug!(cell_size = self.index_cell_size, "neighbor grid resized");
        }

        self.positions.clear();
        self.frozen.clear();
        for (rank, (_, agent)) in self.flock.all_agents().enumerate() {
            self.positions.push(agent.position);
            self.frozen.push(NeighborState {
                rank,
                position: agent.position,
                velocity: agent.velocity,
            });
        }
        self.neighbor_index.rebuild(&self.positions);

        // Under in-place updates an earlier agent may have moved up to max_speed * dt
        // since the index was built.
        let search_radius = match self.update_order {
            UpdateOrder::InPlace => cfg.neighbor_radius + cfg.max_speed * dt,
            UpdateOrder::Snapshot => cfg.neighbor_radius,
        };

        for rank in 0..self.order.len() {
            let slot = self.order[rank] as usize;
            let Some(mut agent) = self.flock.arena().get_by_index(slot).cloned() else {
                continue;
            };

            let candidates = &mut self.candidates;
            candidates.clear();
            self.neighbor_index
                .for_each_candidate(agent.position, search_radius, &mut |r| candidates.push(r));
            // Grid buckets come back in cell order; sum in rank order so every index
            // produces the same floating-point result.
            candidates.sort_unstable();

            let forces = {
                let arena = self.flock.arena();
                let order = &self.order;
                let frozen = &self.frozen;
                let mode = self.update_order;
                let neighbors = self.candidates.iter().filter_map(|&r| match mode {
                    UpdateOrder::Snapshot => frozen.get(r).copied(),
                    UpdateOrder::InPlace => {
                        let other = arena.get_by_index(*order.get(r)? as usize)?;
                        Some(NeighborState {
                            rank: r,
                            position: other.position,
                            velocity: other.velocity,
                        })
                    }
                });
                steering::compute_forces(&agent, rank, neighbors, &cfg, &self.environment)
            };

            steering::integrate(&mut agent, &forces, &cfg, dt);
            if let Some(slot_agent) = self.flock.arena_mut().get_mut_by_index(slot) {
                *slot_agent = agent;
            }
            if let Some(id) = self.flock.arena().id_at(slot) {
                self.last_forces.insert(id, forces);
            }
        }
    }
}

fn index_cell_size(cfg: &FlockConfig) -> f32 {
    cfg.neighbor_radius.max(config::SPATIAL_CELL_SIZE * 0.25)
}
