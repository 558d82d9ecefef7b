use egui;
use macroquad::prelude::Vec3;

use murmuration::simulation::SimState;

use crate::camera::CameraController;

pub fn draw_inspector(ctx: &egui::Context, sim: &mut SimState, camera: &mut CameraController) {
    egui::Window::new("Inspector")
        .default_pos(egui::pos2(10.0, 120.0))
        .default_size(egui::vec2(240.0, 320.0))
        .resizable(true)
        .show(ctx, |ui| {
            let Some(id) = camera.following else {
                ui.label("Click an agent to inspect it.");
                return;
            };
            let Some(agent) = sim.flock.get(id).cloned() else {
                camera.following = None;
                return;
            };

            ui.label(format!("Agent {} (gen {})", id.index, id.generation));
            ui.separator();

            ui.collapsing("Motion", |ui| {
                vec_row(ui, "Position", agent.position);
                vec_row(ui, "Velocity", agent.velocity);
                vec_row(ui, "Forward", agent.forward);
                let max_speed = sim.flock.config().max_speed;
                ui.horizontal(|ui| {
                    ui.label("Speed:");
                    let bar = egui::ProgressBar::new((agent.speed() / max_speed).clamp(0.0, 1.0))
                        .text(format!("{:.2}/{:.2}", agent.speed(), max_speed));
                    ui.add(bar);
                });
                ui.label(format!("Neighbors: {}", agent.neighbor_count));
            });

            ui.separator();
            ui.collapsing("Steering (last tick)", |ui| match sim.last_forces(id) {
                Some(forces) => {
                    let cfg = sim.flock.config();
                    let rows = [
                        ("Separation", forces.separation, cfg.separation_weight),
                        ("Alignment", forces.alignment, cfg.alignment_weight),
                        ("Cohesion", forces.cohesion, cfg.cohesion_weight),
                        ("Goal", forces.goal, cfg.goal_weight),
                        ("Boundary", forces.boundary, cfg.boundary_weight),
                        ("Obstacle", forces.obstacle, cfg.obstacle_weight),
                    ];
                    egui::Grid::new("forces_grid").striped(true).show(ui, |ui| {
                        for (name, dir, weight) in rows {
                            ui.label(name);
                            ui.label(format!("x{weight:.2}"));
                            ui.label(format_vec(dir * weight));
                            ui.end_row();
                        }
                    });
                    ui.label(format!("Probe hits: {}", forces.obstacle_hits));
                }
                None => {
                    ui.label("No step since this agent was added.");
                }
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Deselect").clicked() {
                    camera.following = None;
                }
                if ui.button("Remove").clicked() {
                    sim.flock.remove_agent(id);
                    camera.following = None;
                }
            });
        });
}

fn vec_row(ui: &mut egui::Ui, label: &str, v: Vec3) {
    ui.label(format!("{label}: {}", format_vec(v)));
}

fn format_vec(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}
