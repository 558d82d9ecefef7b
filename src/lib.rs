//! Boids-style flocking: agents steer from weighted separation, alignment,
//! cohesion, goal, boundary and obstacle forces, advanced by an explicit `step(dt)`.

pub mod agent;
pub mod audit;
pub mod config;
pub mod environment;
pub mod error;
pub mod flock;
pub mod math;
pub mod reporting;
pub mod save_load;
pub mod simulation;
pub mod spatial_hash;
pub mod stats;
pub mod steering;

pub use agent::{Agent, AgentId};
pub use config::{Bounds, FlockConfig};
pub use environment::{EnvironmentQuery, LayerMask, ProbeHit};
pub use flock::FlockRegistry;
pub use simulation::{NeighborStrategy, SimState, UpdateOrder};
