//! Per-agent steering: six weighted rules, then velocity, position and heading integration.

use macroquad::prelude::Vec3;

use crate::agent::Agent;
use crate::config::{self, FlockConfig};
use crate::environment::EnvironmentQuery;
use crate::math::{
    clamp_magnitude, heading_basis, normalize_or, normalize_or_zero, reflect, rotate_about_axis,
};

/// Another agent as seen by the neighbor scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborState {
    /// Position in registry order; breaks ties between coincident agents.
    pub rank: usize,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Unit direction of each rule from one update (zero when the rule is idle).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SteeringForces {
    pub separation: Vec3,
    pub alignment: Vec3,
    pub cohesion: Vec3,
    pub goal: Vec3,
    pub boundary: Vec3,
    pub obstacle: Vec3,
    pub neighbor_count: u32,
    pub obstacle_hits: u32,
}

impl SteeringForces {
    pub fn weighted_total(&self, cfg: &FlockConfig) -> Vec3 {
        self.separation * cfg.separation_weight
            + self.alignment * cfg.alignment_weight
            + self.cohesion * cfg.cohesion_weight
            + self.goal * cfg.goal_weight
            + self.boundary * cfg.boundary_weight
            + self.obstacle * cfg.obstacle_weight
    }
}

/// Separation, alignment and cohesion from the agents within `neighbor_radius`.
/// Returns (separation, alignment, cohesion, neighbor_count).
pub fn flocking_forces(
    self_rank: usize,
    position: Vec3,
    others: impl IntoIterator<Item = NeighborState>,
    cfg: &FlockConfig,
) -> (Vec3, Vec3, Vec3, u32) {
    let neighbor_radius_sq = cfg.neighbor_radius * cfg.neighbor_radius;
    let separation_distance = cfg.separation_distance.min(cfg.neighbor_radius);

    let mut position_sum = Vec3::ZERO;
    let mut velocity_sum = Vec3::ZERO;
    let mut repulsion = Vec3::ZERO;
    let mut count = 0u32;

    for other in others {
        if other.rank == self_rank {
            continue;
        }
        let offset = position - other.position;
        let dist_sq = offset.length_squared();
        if dist_sq > neighbor_radius_sq {
            continue;
        }

        count += 1;
        position_sum += other.position;
        velocity_sum += other.velocity;

        let dist = dist_sq.sqrt();
        if dist <= separation_distance {
            if dist < config::MIN_SEPARATION_DISTANCE {
                // Coincident: the earlier agent in registry order goes -X, the later +X.
                let side = if self_rank < other.rank { -1.0 } else { 1.0 };
                repulsion += Vec3::X * side * config::MAX_REPULSION;
            } else {
                repulsion += offset / dist_sq;
            }
        }
    }

    if count == 0 {
        return (Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, 0);
    }

    let n = count as f32;
    let cohesion = normalize_or_zero(position_sum / n - position);
    let alignment = normalize_or_zero(velocity_sum / n);
    let separation = normalize_or_zero(repulsion);
    (separation, alignment, cohesion, count)
}

pub fn goal_force(position: Vec3, cfg: &FlockConfig) -> Vec3 {
    match cfg.goal_position {
        Some(goal) => normalize_or_zero(goal - position),
        None => Vec3::ZERO,
    }
}

/// Unit push toward the interior on every axis where `position` is within
/// `boundary_margin` of a face (inclusive).
pub fn boundary_force(position: Vec3, cfg: &FlockConfig) -> Vec3 {
    let min = cfg.boundary.min().to_array();
    let max = cfg.boundary.max().to_array();
    let p = position.to_array();
    let margin = cfg.boundary_margin;

    let mut push = [0.0f32; 3];
    for axis in 0..3 {
        if p[axis] <= min[axis] + margin {
            push[axis] += 1.0;
        }
        if p[axis] >= max[axis] - margin {
            push[axis] -= 1.0;
        }
    }
    normalize_or_zero(Vec3::from_array(push))
}

/// Probe directions: straight ahead, then turned left and right about the heading's up axis.
pub fn probe_directions(forward: Vec3, half_angle: f32) -> [Vec3; 3] {
    let (fwd, up, _) = heading_basis(forward);
    [
        fwd,
        rotate_about_axis(fwd, up, half_angle),
        rotate_about_axis(fwd, up, -half_angle),
    ]
}

/// Sum of `forward` reflected about each probe hit normal, normalized.
/// Returns (force, hit_count).
pub fn obstacle_force<E: EnvironmentQuery + ?Sized>(
    position: Vec3,
    forward: Vec3,
    cfg: &FlockConfig,
    environment: &E,
) -> (Vec3, u32) {
    if cfg.obstacle_weight <= 0.0 || cfg.obstacle_probe_distance <= 0.0 {
        return (Vec3::ZERO, 0);
    }

    let heading = normalize_or(forward, config::DEFAULT_FORWARD);
    let mut sum = Vec3::ZERO;
    let mut hits = 0u32;
    for dir in probe_directions(heading, cfg.obstacle_probe_half_angle) {
        if let Some(hit) = environment.probe_obstacle(
            position,
            dir,
            cfg.obstacle_probe_distance,
            cfg.obstacle_layers,
        ) {
            sum += reflect(heading, hit.normal);
            hits += 1;
        }
    }
    (normalize_or_zero(sum), hits)
}

/// Evaluate every rule for one agent without touching its state.
pub fn compute_forces<E: EnvironmentQuery + ?Sized>(
    agent: &Agent,
    self_rank: usize,
    neighbors: impl IntoIterator<Item = NeighborState>,
    cfg: &FlockConfig,
    environment: &E,
) -> SteeringForces {
    let (separation, alignment, cohesion, neighbor_count) =
        flocking_forces(self_rank, agent.position, neighbors, cfg);
    let (obstacle, obstacle_hits) =
        obstacle_force(agent.position, agent.forward, cfg, environment);

    SteeringForces {
        separation,
        alignment,
        cohesion,
        goal: goal_force(agent.position, cfg),
        boundary: boundary_force(agent.position, cfg),
        obstacle,
        neighbor_count,
        obstacle_hits,
    }
}

/// Turn velocity toward the desired velocity, clamp to `max_speed`, then move
/// and re-orient. `dt` must be positive.
pub fn integrate(agent: &mut Agent, forces: &SteeringForces, cfg: &FlockConfig, dt: f32) {
    let blend = (cfg.turn_rate * dt).clamp(0.0, 1.0);
    let desired = normalize_or_zero(forces.weighted_total(cfg)) * cfg.max_speed;

    let mut velocity = clamp_magnitude(agent.velocity.lerp(desired, blend), cfg.max_speed);
    if !velocity.is_finite() {
        velocity = Vec3::ZERO;
    }

    agent.velocity = velocity;
    agent.prev_position = agent.position;
    agent.position += velocity * dt;
    agent.neighbor_count = forces.neighbor_count;

    let target = normalize_or_zero(velocity);
    if target != Vec3::ZERO {
        agent.forward = normalize_or(agent.forward.lerp(target, blend), target);
    }
}
