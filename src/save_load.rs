use std::path::Path;

use ::rand::SeedableRng;
use macroquad::prelude::Vec3;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::Agent;
use crate::config::FlockConfig;
use crate::environment::Scene;
use crate::error::SnapshotError;
use crate::flock::FlockRegistry;
use crate::math::serde_vec3;
use crate::simulation::{NeighborStrategy, SimState, UpdateOrder};

const SAVE_VERSION: u32 = 1;

#[derive(Clone, Serialize, Deserialize)]
struct SerdAgent {
    #[serde(with = "serde_vec3")]
    position: Vec3,
    #[serde(with = "serde_vec3")]
    prev_position: Vec3,
    #[serde(with = "serde_vec3")]
    forward: Vec3,
    #[serde(with = "serde_vec3")]
    velocity: Vec3,
    neighbor_count: u32,
}

impl From<&Agent> for SerdAgent {
    fn from(a: &Agent) -> Self {
        Self {
            position: a.position,
            prev_position: a.prev_position,
            forward: a.forward,
            velocity: a.velocity,
            neighbor_count: a.neighbor_count,
        }
    }
}

impl From<SerdAgent> for Agent {
    fn from(a: SerdAgent) -> Self {
        Agent {
            position: a.position,
            prev_position: a.prev_position,
            forward: a.forward,
            velocity: a.velocity,
            neighbor_count: a.neighbor_count,
        }
    }
}

/// Everything needed to resume a run. The environment is not stored; a `Scene`
/// is regenerated from the seed on load.
#[derive(Serialize, Deserialize)]
pub struct SaveState {
    version: u32,
    seed: u64,
    tick_count: u64,
    update_order: UpdateOrder,
    neighbor_strategy: NeighborStrategy,
    config: FlockConfig,
    agents: Vec<SerdAgent>,
    rng: ChaCha8Rng,
}

impl SaveState {
    pub fn from_sim<E>(sim: &SimState<E>) -> Self {
        Self {
            version: SAVE_VERSION,
            seed: sim.seed,
            tick_count: sim.tick_count,
            update_order: sim.update_order,
            neighbor_strategy: sim.neighbor_strategy(),
            config: sim.flock.config().clone(),
            agents: sim.flock.all_agents().map(|(_, a)| SerdAgent::from(a)).collect(),
            rng: sim.rng.clone(),
        }
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Rebuild a simulation around `environment`. Agents get fresh handles but keep their order.
    pub fn restore_with<E>(self, environment: E) -> Result<SimState<E>, SnapshotError> {
        let mut flock = FlockRegistry::new(self.config)?;
        for agent in self.agents {
            flock.add_agent(agent.into());
        }

        let mut sim = SimState::with_environment(flock, environment, self.seed);
        sim.tick_count = self.tick_count;
        sim.update_order = self.update_order;
        sim.set_neighbor_strategy(self.neighbor_strategy);
        sim.rng = self.rng;
        Ok(sim)
    }

    /// Restore with the scene the seed generates.
    pub fn restore(self) -> Result<SimState<Scene>, SnapshotError> {
        let mut scene_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let scene = Scene::generate(&self.config.boundary, self.seed, &mut scene_rng);
        self.restore_with(scene)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(SnapshotError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        // The version leads the encoding, so it can be checked before the layout.
        let version: u32 = bincode::deserialize(bytes).map_err(SnapshotError::Decode)?;
        if version != SAVE_VERSION {
            return Err(SnapshotError::Version {
                found: version,
                expected: SAVE_VERSION,
            });
        }
        bincode::deserialize(bytes).map_err(SnapshotError::Decode)
    }
}

pub fn save_to_file<E>(sim: &SimState<E>, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let bytes = SaveState::from_sim(sim).to_bytes()?;
    std::fs::write(path, bytes)?;
    info!(path = %path.display(), agents = sim.flock.len(), tick = sim.tick_count, "snapshot saved");
    Ok(())
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<SimState<Scene>, SnapshotError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let sim = SaveState::from_bytes(&bytes)?.restore()?;
    info!(path = %path.display(), agents = sim.flock.len(), tick = sim.tick_count, "snapshot loaded");
    Ok(sim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::OpenSky;
    use macroquad::prelude::vec3;

    fn temp_file(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("murmuration_{name}_{nanos}.bin"))
    }

    fn positions<E>(sim: &SimState<E>) -> Vec<Vec3> {
        sim.flock.all_agents().map(|(_, a)| a.position).collect()
    }

    #[test]
    fn restored_run_continues_identically() {
        let mut original = SimState::new(40, 5);
        original.update_order = UpdateOrder::Snapshot;
        for _ in 0..20 {
            original.tick();
        }
        let path = temp_file("continue");
        save_to_file(&original, &path).unwrap();
        let mut restored = load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(restored.tick_count, 20);
        assert_eq!(restored.update_order, UpdateOrder::Snapshot);
        assert_eq!(restored.flock.config(), original.flock.config());
        assert_eq!(positions(&restored), positions(&original));

        for _ in 0..20 {
            original.tick();
            restored.tick();
        }
        assert_eq!(positions(&restored), positions(&original));
    }

    #[test]
    fn restore_keeps_registration_order_after_removals() {
        let mut sim = SimState::with_environment(FlockRegistry::default(), OpenSky, 1);
        let a = sim.flock.add_agent(Agent::new(vec3(1.0, 0.0, 0.0), Vec3::ZERO));
        sim.flock.add_agent(Agent::new(vec3(2.0, 0.0, 0.0), Vec3::ZERO));
        sim.flock.remove_agent(a);
        sim.flock.add_agent(Agent::new(vec3(3.0, 0.0, 0.0), Vec3::ZERO));

        let bytes = SaveState::from_sim(&sim).to_bytes().unwrap();
        let restored = SaveState::from_bytes(&bytes)
            .unwrap()
            .restore_with(OpenSky)
            .unwrap();
        assert_eq!(
            positions(&restored),
            vec![vec3(2.0, 0.0, 0.0), vec3(3.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn wrong_version_is_rejected() {
        let sim = SimState::with_environment(FlockRegistry::default(), OpenSky, 1);
        let mut state = SaveState::from_sim(&sim);
        state.version = SAVE_VERSION + 1;
        let bytes = state.to_bytes().unwrap();
        assert!(matches!(
            SaveState::from_bytes(&bytes),
            Err(SnapshotError::Version { found, .. }) if found == SAVE_VERSION + 1
        ));
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let sim = SimState::new(5, 2);
        let bytes = SaveState::from_sim(&sim).to_bytes().unwrap();
        assert!(matches!(
            SaveState::from_bytes(&bytes[..bytes.len() / 2]),
            Err(SnapshotError::Decode(_))
        ));
    }

    #[test]
    fn invalid_config_in_snapshot_is_rejected() {
        let sim = SimState::with_environment(FlockRegistry::default(), OpenSky, 1);
        let mut state = SaveState::from_sim(&sim);
        state.config.max_speed = 0.0;
        assert!(matches!(
            state.restore_with(OpenSky),
            Err(SnapshotError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = temp_file("missing");
        assert!(matches!(load_from_file(&path), Err(SnapshotError::Io(_))));
    }
}
