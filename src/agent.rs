use macroquad::prelude::Vec3;

use crate::config;
use crate::math::normalize_or;

/// Stable handle to an agent. The generation field invalidates stale references.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AgentId {
    pub index: u32,
    pub generation: u32,
}

/// One flock member.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    pub position: Vec3,
    pub prev_position: Vec3,
    /// Unit heading used for obstacle probing and orientation.
    pub forward: Vec3,
    pub velocity: Vec3,
    /// Neighbors seen during the last update.
    pub neighbor_count: u32,
}

impl Agent {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            prev_position: position,
            forward: normalize_or(velocity, config::DEFAULT_FORWARD),
            velocity,
            neighbor_count: 0,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Arena-based agent storage with generational indices, a free list, and
/// insertion-ordered iteration.
pub struct AgentArena {
    pub agents: Vec<Option<Agent>>,
    pub generations: Vec<u32>,
    pub free_list: Vec<u32>,
    /// Live slot indices in the order they were spawned.
    order: Vec<u32>,
    pub count: usize,
}

impl AgentArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            agents: vec![None; capacity],
            generations: vec![0; capacity],
            free_list: (0..capacity as u32).rev().collect(),
            order: Vec::with_capacity(capacity),
            count: 0,
        }
    }

    pub fn spawn(&mut self, agent: Agent) -> AgentId {
        let index = if let Some(index) = self.free_list.pop() {
            self.agents[index as usize] = Some(agent);
            index
        } else {
            // Grow the arena
            let index = self.agents.len() as u32;
            self.agents.push(Some(agent));
            self.generations.push(0);
            index
        };
        self.order.push(index);
        self.count += 1;
        AgentId {
            index,
            generation: self.generations[index as usize],
        }
    }

    pub fn despawn(&mut self, id: AgentId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let idx = id.index as usize;
        self.agents[idx] = None;
        self.generations[idx] += 1;
        self.free_list.push(id.index);
        self.order.retain(|&i| i != id.index);
        self.count -= 1;
        true
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        let idx = id.index as usize;
        if idx < self.agents.len() && self.generations[idx] == id.generation {
            self.agents[idx].as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let idx = id.index as usize;
        if idx < self.agents.len() && self.generations[idx] == id.generation {
            self.agents[idx].as_mut()
        } else {
            None
        }
    }

    pub fn get_by_index(&self, index: usize) -> Option<&Agent> {
        self.agents.get(index).and_then(|a| a.as_ref())
    }

    pub fn get_mut_by_index(&mut self, index: usize) -> Option<&mut Agent> {
        self.agents.get_mut(index).and_then(|a| a.as_mut())
    }

    pub fn id_at(&self, index: usize) -> Option<AgentId> {
        self.get_by_index(index).map(|_| AgentId {
            index: index as u32,
            generation: self.generations[index],
        })
    }

    /// Live slot indices in spawn order.
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// Iterate over (id, &Agent) for all live agents, in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.order.iter().filter_map(move |&index| {
            let idx = index as usize;
            self.agents[idx].as_ref().map(|agent| {
                (
                    AgentId {
                        index,
                        generation: self.generations[idx],
                    },
                    agent,
                )
            })
        })
    }

    pub fn clear(&mut self) {
        for index in std::mem::take(&mut self.order) {
            let idx = index as usize;
            self.agents[idx] = None;
            self.generations[idx] += 1;
            self.free_list.push(index);
        }
        self.count = 0;
    }

    pub fn capacity(&self) -> usize {
        self.agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::prelude::vec3;

    fn test_agent(x: f32) -> Agent {
        Agent::new(vec3(x, 0.0, 0.0), Vec3::ZERO)
    }

    #[test]
    fn generational_handles_invalidate_after_despawn() {
        let mut arena = AgentArena::new(1);
        let id_a = arena.spawn(test_agent(0.0));
        assert!(arena.get(id_a).is_some());

        assert!(arena.despawn(id_a));
        assert!(arena.get(id_a).is_none());
        assert!(!arena.despawn(id_a));

        let id_b = arena.spawn(test_agent(1.0));
        assert_eq!(id_a.index, id_b.index);
        assert_ne!(id_a.generation, id_b.generation);
        assert!(arena.get(id_a).is_none());
    }

    #[test]
    fn iteration_follows_spawn_order_across_slot_reuse() {
        let mut arena = AgentArena::new(3);
        let a = arena.spawn(test_agent(0.0));
        let b = arena.spawn(test_agent(1.0));
        let c = arena.spawn(test_agent(2.0));
        arena.despawn(a);
        // Reuses slot of `a` but must iterate last.
        let d = arena.spawn(test_agent(3.0));
        assert_eq!(d.index, a.index);

        let ids: Vec<AgentId> = arena.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![b, c, d]);
        assert_eq!(arena.count, 3);
    }

    #[test]
    fn arena_grows_past_initial_capacity() {
        let mut arena = AgentArena::new(0);
        let id = arena.spawn(test_agent(0.0));
        assert_eq!(id.index, 0);
        assert_eq!(arena.capacity(), 1);
        assert_eq!(arena.id_at(0), Some(id));
    }

    #[test]
    fn clear_invalidates_every_handle() {
        let mut arena = AgentArena::new(2);
        let a = arena.spawn(test_agent(0.0));
        let b = arena.spawn(test_agent(1.0));
        arena.clear();
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_none());
        assert_eq!(arena.iter().count(), 0);
        assert_eq!(arena.count, 0);
    }

    #[test]
    fn new_agent_faces_velocity_or_default_forward() {
        let moving = Agent::new(Vec3::ZERO, vec3(0.0, 0.0, -3.0));
        assert!((moving.forward + Vec3::Z).length() < 1e-5);
        let still = Agent::new(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(still.forward, config::DEFAULT_FORWARD);
    }
}
