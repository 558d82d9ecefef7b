use egui;
use macroquad::prelude::Vec3;
use tracing::{error, info, warn};

use murmuration::config::{self, FlockConfig};
use murmuration::simulation::{NeighborStrategy, SimState, UpdateOrder};

use super::UiState;

/// Runtime tuning panel. Edits go through `FlockRegistry::set_config`, so a rejected
/// combination leaves the running config untouched.
pub fn draw_settings(ctx: &egui::Context, sim: &mut SimState, ui_state: &mut UiState) {
    egui::Window::new("Settings")
        .default_pos(egui::pos2(980.0, 60.0))
        .default_size(egui::vec2(280.0, 520.0))
        .resizable(true)
        .show(ctx, |ui| {
            let mut cfg = sim.flock.config().clone();

            ui.heading("Weights");
            ui.add(egui::Slider::new(&mut cfg.separation_weight, 0.0..=5.0).text("Separation"));
            ui.add(egui::Slider::new(&mut cfg.alignment_weight, 0.0..=5.0).text("Alignment"));
            ui.add(egui::Slider::new(&mut cfg.cohesion_weight, 0.0..=5.0).text("Cohesion"));
            ui.add(egui::Slider::new(&mut cfg.goal_weight, 0.0..=5.0).text("Goal"));
            ui.add(egui::Slider::new(&mut cfg.boundary_weight, 0.0..=10.0).text("Boundary"));
            ui.add(egui::Slider::new(&mut cfg.obstacle_weight, 0.0..=10.0).text("Obstacle"));

            ui.separator();
            ui.heading("Motion");
            ui.add(egui::Slider::new(&mut cfg.max_speed, 0.1..=20.0).text("Max speed"));
            ui.add(egui::Slider::new(&mut cfg.turn_rate, 0.1..=20.0).text("Turn rate"));
            ui.add(egui::Slider::new(&mut cfg.neighbor_radius, 0.0..=20.0).text("Neighbor radius"));
            let max_sep = cfg.neighbor_radius;
            ui.add(
                egui::Slider::new(&mut cfg.separation_distance, 0.0..=max_sep)
                    .text("Separation dist"),
            );

            ui.separator();
            ui.heading("Environment");
            ui.add(egui::Slider::new(&mut cfg.boundary_margin, 0.0..=20.0).text("Boundary margin"));
            ui.add(
                egui::Slider::new(&mut cfg.obstacle_probe_distance, 0.0..=20.0).text("Probe distance"),
            );
            let mut half_angle_deg = cfg.obstacle_probe_half_angle.to_degrees();
            if ui
                .add(egui::Slider::new(&mut half_angle_deg, 0.0..=90.0).text("Probe half-angle"))
                .changed()
            {
                cfg.obstacle_probe_half_angle = half_angle_deg.to_radians();
            }

            let mut has_goal = cfg.goal_position.is_some();
            if ui.checkbox(&mut has_goal, "Goal (G sets it at the cursor)").changed() {
                cfg.goal_position = has_goal.then_some(cfg.boundary.center);
            }
            if let Some(goal) = cfg.goal_position.as_mut() {
                goal_editor(ui, goal);
            }

            if cfg != *sim.flock.config() {
                if let Err(err) = sim.flock.set_config(cfg) {
                    warn!(%err, "config edit rejected");
                    ui_state.status = Some(err.to_string());
                }
            }

            ui.separator();
            ui.heading("Stepping");
            ui.horizontal(|ui| {
                ui.selectable_value(&mut sim.update_order, UpdateOrder::InPlace, "In place");
                ui.selectable_value(&mut sim.update_order, UpdateOrder::Snapshot, "Snapshot");
            });
            let mut strategy = sim.neighbor_strategy();
            ui.horizontal(|ui| {
                for s in [NeighborStrategy::SpatialHash, NeighborStrategy::BruteForce] {
                    ui.selectable_value(&mut strategy, s, s.label());
                }
            });
            sim.set_neighbor_strategy(strategy);

            ui.separator();
            ui.heading("Flock");
            ui.horizontal(|ui| {
                for count in [10, 50] {
                    if ui.button(format!("Spawn {count}")).clicked() {
                        spawn_agents(sim, count);
                    }
                }
                if ui.button("Clear").clicked() {
                    sim.flock.clear();
                }
            });

            ui.separator();
            ui.heading("Config file");
            ui.text_edit_singleline(&mut ui_state.config_path);
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    let result = sim.flock.config().save_json(&ui_state.config_path);
                    ui_state.status = Some(match result {
                        Ok(()) => {
                            info!(path = %ui_state.config_path, "config saved");
                            format!("Saved {}", ui_state.config_path)
                        }
                        Err(err) => {
                            error!(%err, "config save failed");
                            err.to_string()
                        }
                    });
                }
                if ui.button("Load").clicked() {
                    let result = FlockConfig::load_json(&ui_state.config_path)
                        .map_err(|e| e.to_string())
                        .and_then(|loaded| sim.flock.set_config(loaded).map_err(|e| e.to_string()));
                    ui_state.status = Some(match result {
                        Ok(()) => format!("Loaded {}", ui_state.config_path),
                        Err(err) => {
                            error!(%err, "config load failed");
                            err
                        }
                    });
                }
                if ui.button("Defaults").clicked() {
                    let boundary = sim.flock.config().boundary;
                    let defaults = FlockConfig {
                        boundary,
                        ..FlockConfig::default()
                    };
                    if let Err(err) = sim.flock.set_config(defaults) {
                        ui_state.status = Some(err.to_string());
                    }
                }
            });

            if let Some(status) = &ui_state.status {
                ui.separator();
                ui.label(egui::RichText::new(status).small());
            }
        });
}

fn goal_editor(ui: &mut egui::Ui, goal: &mut Vec3) {
    ui.horizontal(|ui| {
        ui.label("x");
        ui.add(egui::DragValue::new(&mut goal.x).speed(0.25));
        ui.label("y");
        ui.add(egui::DragValue::new(&mut goal.y).speed(0.25));
        ui.label("z");
        ui.add(egui::DragValue::new(&mut goal.z).speed(0.25));
    });
}

fn spawn_agents(sim: &mut SimState, count: usize) {
    let room = config::MAX_AGENT_COUNT.saturating_sub(sim.flock.len());
    let cfg = sim.flock.config();
    let spawn = cfg.boundary.shrunk(cfg.boundary_margin);
    sim.flock.populate(count.min(room), &spawn, &mut sim.rng);
}
