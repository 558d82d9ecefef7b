use ::rand::Rng;
use macroquad::prelude::vec3;
use tracing::{debug, warn};

use crate::agent::{Agent, AgentArena, AgentId};
use crate::config::{self, Bounds, FlockConfig};
use crate::error::ConfigError;
use crate::math::normalize_or;

/// The set of agents that steer together under one shared configuration.
pub struct FlockRegistry {
    config: FlockConfig,
    arena: AgentArena,
}

impl Default for FlockRegistry {
    fn default() -> Self {
        Self {
            config: FlockConfig::default(),
            arena: AgentArena::new(0),
        }
    }
}

impl FlockRegistry {
    pub fn new(config: FlockConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            arena: AgentArena::new(config::INITIAL_AGENT_COUNT),
        })
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    /// Replace the configuration. On error the previous configuration stays in effect.
    pub fn set_config(&mut self, config: FlockConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config != self.config {
            debug!(?config, "flock config replaced");
        }
        self.config = config;
        Ok(())
    }

    /// Edit a copy of the configuration and apply it if it validates.
    pub fn update_config(
        &mut self,
        edit: impl FnOnce(&mut FlockConfig),
    ) -> Result<(), ConfigError> {
        let mut next = self.config.clone();
        edit(&mut next);
        self.set_config(next)
    }

    /// Register an agent. It takes part in the next step.
    pub fn add_agent(&mut self, agent: Agent) -> AgentId {
        self.arena.spawn(agent)
    }

    /// Unregister an agent. Unknown or stale handles are ignored.
    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        let removed = self.arena.despawn(id);
        if !removed {
            warn!(?id, "remove_agent: no such agent");
        }
        removed
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.arena.get_mut(id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.arena.get(id).is_some()
    }

    /// Every registered agent in registration order.
    pub fn all_agents(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.arena.iter()
    }

    pub fn len(&self) -> usize {
        self.arena.count
    }

    pub fn is_empty(&self) -> bool {
        self.arena.count == 0
    }

    pub fn clear(&mut self) {
        self.arena.clear();
    }

    pub(crate) fn arena(&self) -> &AgentArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut AgentArena {
        &mut self.arena
    }

    /// Spawn `count` agents uniformly inside `spawn`, each heading a random
    /// direction at half the configured max speed.
    pub fn populate(&mut self, count: usize, spawn: &Bounds, rng: &mut impl Rng) -> Vec<AgentId> {
        let speed = self.config.max_speed * 0.5;
        let (c, h) = (spawn.center, spawn.half_extents);
        let ids: Vec<AgentId> = (0..count)
            .map(|_| {
                let position = vec3(
                    sample_axis(rng, c.x, h.x),
                    sample_axis(rng, c.y, h.y),
                    sample_axis(rng, c.z, h.z),
                );
                let heading = normalize_or(
                    vec3(
                        rng.gen_range(-1.0..=1.0),
                        rng.gen_range(-1.0..=1.0),
                        rng.gen_range(-1.0..=1.0),
                    ),
                    config::DEFAULT_FORWARD,
                );
                self.add_agent(Agent::new(position, heading * speed))
            })
            .collect();
        debug!(count, total = self.len(), "populated flock");
        ids
    }
}

fn sample_axis(rng: &mut impl Rng, center: f32, half: f32) -> f32 {
    if half > 0.0 {
        rng.gen_range(center - half..=center + half)
    } else {
        center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::rand::SeedableRng;
    use macroquad::prelude::Vec3;
    use rand_chacha::ChaCha8Rng;

    fn positions(flock: &FlockRegistry) -> Vec<Vec3> {
        flock.all_agents().map(|(_, a)| a.position).collect()
    }

    #[test]
    fn new_rejects_invalid_config() {
        let cfg = FlockConfig {
            max_speed: -1.0,
            ..FlockConfig::default()
        };
        assert!(FlockRegistry::new(cfg).is_err());
    }

    #[test]
    fn add_and_remove_keep_registration_order() {
        let mut flock = FlockRegistry::default();
        let a = flock.add_agent(Agent::new(Vec3::ZERO, Vec3::ZERO));
        let b = flock.add_agent(Agent::new(Vec3::X, Vec3::ZERO));
        let c = flock.add_agent(Agent::new(Vec3::Y, Vec3::ZERO));
        assert_eq!(flock.len(), 3);

        assert!(flock.remove_agent(b));
        let ids: Vec<AgentId> = flock.all_agents().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn removing_unknown_agent_is_a_no_op() {
        let mut flock = FlockRegistry::default();
        let a = flock.add_agent(Agent::new(Vec3::ZERO, Vec3::ZERO));
        assert!(flock.remove_agent(a));
        assert!(!flock.remove_agent(a));
        assert!(flock.is_empty());
        assert!(!flock.contains(a));
    }

    #[test]
    fn rejected_config_keeps_previous() {
        let mut flock = FlockRegistry::default();
        let before = flock.config().clone();
        let result = flock.update_config(|c| {
            c.separation_distance = c.neighbor_radius + 1.0;
        });
        assert!(matches!(
            result,
            Err(ConfigError::SeparationExceedsNeighborRadius { .. })
        ));
        assert_eq!(flock.config(), &before);
    }

    #[test]
    fn setting_same_config_twice_matches_once() {
        let mut once = FlockRegistry::default();
        let mut twice = FlockRegistry::default();
        let cfg = FlockConfig {
            cohesion_weight: 2.5,
            ..FlockConfig::default()
        };
        once.set_config(cfg.clone()).unwrap();
        twice.set_config(cfg.clone()).unwrap();
        twice.set_config(cfg).unwrap();
        assert_eq!(once.config(), twice.config());
    }

    #[test]
    fn populate_spawns_inside_bounds_at_half_speed() {
        let mut flock = FlockRegistry::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let spawn = Bounds::new(vec3(1.0, 2.0, 3.0), vec3(4.0, 0.0, 4.0));
        let ids = flock.populate(50, &spawn, &mut rng);
        assert_eq!(ids.len(), 50);

        let half_speed = flock.config().max_speed * 0.5;
        for (_, agent) in flock.all_agents() {
            assert!(spawn.contains(agent.position));
            assert_eq!(agent.position.y, 2.0);
            assert!((agent.speed() - half_speed).abs() < 1e-4);
            assert!((agent.forward.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn populate_is_deterministic_per_seed() {
        let spawn = Bounds::default();
        let mut a = FlockRegistry::default();
        let mut b = FlockRegistry::default();
        a.populate(20, &spawn, &mut ChaCha8Rng::seed_from_u64(3));
        b.populate(20, &spawn, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(positions(&a), positions(&b));
    }
}
