use macroquad::prelude::*;

use murmuration::agent::{Agent, AgentId};
use murmuration::config::{Bounds, FlockConfig};
use murmuration::environment::{EnvironmentQuery, ObstacleShape, Scene, TerrainField};
use murmuration::simulation::SimState;
use murmuration::steering;

use crate::camera::{ground, CameraController};

const BG_COLOR: Color = Color::new(0.02, 0.03, 0.08, 1.0);
const AGENT_SIZE: f32 = 0.6;

/// Draw the world and the HUD. `alpha` interpolates between the previous and current tick.
pub fn draw(sim: &SimState<Scene>, camera: &CameraController, alpha: f32) {
    clear_background(BG_COLOR);
    set_camera(&camera.to_macroquad_camera());

    let cfg = sim.flock.config();
    if let Some(terrain) = &sim.environment.terrain {
        draw_terrain(terrain, cfg.boundary.min().y, cfg.boundary.max().y);
    }
    draw_boundary(&cfg.boundary, cfg.boundary_margin);
    draw_obstacles(&sim.environment);

    if let Some(goal) = cfg.goal_position {
        let g = ground(goal);
        draw_circle_lines(g.x, g.y, 1.2, 0.15, Color::new(1.0, 0.85, 0.2, 0.9));
        draw_line(g.x - 0.8, g.y, g.x + 0.8, g.y, 0.1, Color::new(1.0, 0.85, 0.2, 0.9));
        draw_line(g.x, g.y - 0.8, g.x, g.y + 0.8, 0.1, Color::new(1.0, 0.85, 0.2, 0.9));
    }

    let (y_min, y_max) = (cfg.boundary.min().y, cfg.boundary.max().y);
    for (_, agent) in sim.flock.all_agents() {
        let pos = agent.prev_position.lerp(agent.position, alpha);
        draw_agent(pos, agent.forward, altitude_color(pos.y, y_min, y_max));
    }

    if let Some(id) = camera.following {
        draw_selection(sim, id, sim.show_probes);
    } else if sim.show_probes {
        for (_, agent) in sim.flock.all_agents() {
            draw_probes(agent, cfg, &sim.environment);
        }
    }

    set_default_camera();
    draw_hud(sim);
}

fn draw_terrain(terrain: &TerrainField, y_min: f32, y_max: f32) {
    let span = (y_max - y_min).max(1.0e-3);
    let half = terrain.cell_size * 0.5;
    for row in 0..terrain.rows {
        for col in 0..terrain.cols {
            let h = terrain.heights[row * terrain.cols + col];
            let t = ((h - y_min) / span).clamp(0.0, 1.0);
            let color = Color::new(0.05 + t * 0.25, 0.08 + t * 0.3, 0.06 + t * 0.1, 1.0);
            let x = terrain.origin_x + col as f32 * terrain.cell_size;
            let z = terrain.origin_z + row as f32 * terrain.cell_size;
            draw_rectangle(x - half, z - half, terrain.cell_size, terrain.cell_size, color);
        }
    }
}

fn draw_boundary(bounds: &Bounds, margin: f32) {
    let (min, max) = (bounds.min(), bounds.max());
    draw_rectangle_lines(
        min.x,
        min.z,
        max.x - min.x,
        max.z - min.z,
        0.25,
        Color::new(0.35, 0.45, 0.6, 1.0),
    );

    let inner = bounds.shrunk(margin);
    let (imin, imax) = (inner.min(), inner.max());
    draw_rectangle_lines(
        imin.x,
        imin.z,
        imax.x - imin.x,
        imax.z - imin.z,
        0.1,
        Color::new(0.25, 0.3, 0.4, 0.6),
    );
}

fn draw_obstacles(scene: &Scene) {
    for obstacle in &scene.obstacles.obstacles {
        match obstacle.shape {
            ObstacleShape::Sphere { center, radius } => {
                draw_circle(center.x, center.z, radius, Color::new(0.45, 0.35, 0.3, 0.8));
                draw_circle_lines(center.x, center.z, radius, 0.1, Color::new(0.7, 0.55, 0.45, 1.0));
            }
            ObstacleShape::Box(bounds) => {
                let min = bounds.min();
                let size = bounds.half_extents * 2.0;
                draw_rectangle(min.x, min.z, size.x, size.z, Color::new(0.3, 0.32, 0.4, 0.85));
                draw_rectangle_lines(min.x, min.z, size.x, size.z, 0.1, Color::new(0.55, 0.6, 0.75, 1.0));
            }
        }
    }
}

/// Low agents are blue, high agents are warm.
fn altitude_color(y: f32, y_min: f32, y_max: f32) -> Color {
    let t = ((y - y_min) / (y_max - y_min).max(1.0e-3)).clamp(0.0, 1.0);
    Color::new(0.3 + t * 0.7, 0.6 + t * 0.2, 1.0 - t * 0.6, 1.0)
}

fn draw_agent(pos: Vec3, forward: Vec3, color: Color) {
    let p = ground(pos);
    let dir = ground(forward).try_normalize().unwrap_or(Vec2::Y);
    let perp = vec2(-dir.y, dir.x);

    let front = p + dir * AGENT_SIZE * 1.6;
    let back_left = p - dir * AGENT_SIZE * 0.8 + perp * AGENT_SIZE * 0.7;
    let back_right = p - dir * AGENT_SIZE * 0.8 - perp * AGENT_SIZE * 0.7;
    draw_triangle(front, back_left, back_right, color);
}

fn draw_selection(sim: &SimState<Scene>, id: AgentId, show_probes: bool) {
    let Some(agent) = sim.flock.get(id) else {
        return;
    };
    let cfg = sim.flock.config();
    let p = ground(agent.position);
    draw_circle_lines(p.x, p.y, cfg.neighbor_radius, 0.08, Color::new(0.4, 0.8, 1.0, 0.5));
    draw_circle_lines(p.x, p.y, cfg.separation_distance, 0.08, Color::new(1.0, 0.4, 0.4, 0.5));

    let v = ground(agent.velocity);
    draw_line(p.x, p.y, p.x + v.x, p.y + v.y, 0.12, Color::new(1.0, 1.0, 1.0, 0.8));

    if show_probes {
        draw_probes(agent, cfg, &sim.environment);
    }
}

fn draw_probes(agent: &Agent, cfg: &FlockConfig, environment: &Scene) {
    let origin = ground(agent.position);
    for dir in steering::probe_directions(agent.forward, cfg.obstacle_probe_half_angle) {
        let hit = environment.probe_obstacle(
            agent.position,
            dir,
            cfg.obstacle_probe_distance,
            cfg.obstacle_layers,
        );
        let (end, color) = match hit {
            Some(hit) => (ground(hit.point), Color::new(1.0, 0.3, 0.3, 0.7)),
            None => (
                ground(agent.position + dir * cfg.obstacle_probe_distance),
                Color::new(0.5, 0.5, 0.5, 0.25),
            ),
        };
        draw_line(origin.x, origin.y, end.x, end.y, 0.05, color);
    }
}

fn draw_hud(sim: &SimState<Scene>) {
    let tc = Color::new(0.7, 0.75, 0.8, 1.0);
    let sh = Color::new(0.0, 0.0, 0.0, 0.5);

    let lines = [
        format!("FPS: {}", get_fps()),
        format!("Agents: {}", sim.flock.len()),
        format!("Tick: {}", sim.tick_count),
        format!(
            "{:?} | {}",
            sim.update_order,
            sim.neighbor_strategy().label()
        ),
    ];
    for (i, text) in lines.iter().enumerate() {
        let y = 20.0 + i as f32 * 20.0;
        draw_text(text, 11.0, y + 1.0, 18.0, sh);
        draw_text(text, 10.0, y, 18.0, tc);
    }

    if sim.paused {
        let pause_text = "PAUSED (Space to resume)";
        let tw = measure_text(pause_text, None, 24, 1.0).width;
        let x = screen_width() * 0.5 - tw * 0.5;
        draw_text(pause_text, x + 1.0, 31.0, 24.0, sh);
        draw_text(pause_text, x, 30.0, 24.0, Color::new(1.0, 0.8, 0.2, 0.9));
    }
}
