use egui;

use murmuration::simulation::SimState;
use murmuration::stats::FlockStats;

use super::UiState;

/// Slim status strip + compact controls.
pub fn draw_toolbar(
    ctx: &egui::Context,
    sim: &mut SimState,
    ui_state: &mut UiState,
    stats: &FlockStats,
) {
    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.add_space(3.0);
        ui.horizontal_wrapped(|ui| {
            title_badge(ui, "MURMURATION");

            ui.separator();
            compact_group(ui, "Sim", |ui| {
                let pause_label = if sim.paused { "Play" } else { "Pause" };
                if ui.button(pause_label).clicked() {
                    sim.paused = !sim.paused;
                }
                if ui.button("Step").clicked() {
                    ui_state.step_requested = true;
                }
                if ui.button("Reset").clicked() {
                    ui_state.reset_requested = true;
                }
            });

            compact_group(ui, "Speed", |ui| {
                for speed in [0.25, 1.0, 2.0, 5.0] {
                    speed_button(ui, sim, speed);
                }
            });

            compact_group(ui, "Panels", |ui| {
                ui.toggle_value(&mut ui_state.show_inspector, "Inspector");
                ui.toggle_value(&mut ui_state.show_graphs, "Graphs");
                ui.toggle_value(&mut ui_state.show_settings, "Settings");
                ui.toggle_value(&mut sim.show_probes, "Probes");
            });
        });

        ui.add_space(4.0);
        ui.horizontal_wrapped(|ui| {
            metric_chip(ui, "Agents", format!("{}", sim.flock.len()));
            metric_chip(ui, "Tick", format!("{}", sim.tick_count));
            if let Some(speed) = stats.avg_speed.last() {
                metric_chip(ui, "Avg Speed", format!("{speed:.2}"));
            }
            if let Some(pol) = stats.polarization.last() {
                metric_chip(ui, "Polarization", format!("{pol:.2}"));
            }
            if let Some(n) = stats.avg_neighbors.last() {
                metric_chip(ui, "Neighbors", format!("{n:.1}"));
            }
            metric_chip(ui, "Order", format!("{:?}", sim.update_order));
            metric_chip(ui, "Index", sim.neighbor_strategy().label().to_string());
        });
        ui.add_space(3.0);
    });
}

fn speed_button(ui: &mut egui::Ui, sim: &mut SimState, speed: f32) {
    let label = format!("{speed}x");
    let selected = (sim.speed_multiplier - speed).abs() < 0.01;
    if ui.selectable_label(selected, label).clicked() {
        sim.speed_multiplier = speed;
    }
}

fn title_badge(ui: &mut egui::Ui, label: &str) {
    let text = egui::RichText::new(label)
        .strong()
        .color(egui::Color32::from_rgb(190, 220, 255));
    ui.label(text);
}

fn compact_group(ui: &mut egui::Ui, heading: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    ui.group(|ui| {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(heading)
                    .small()
                    .color(egui::Color32::from_rgb(150, 170, 185)),
            );
            add_contents(ui);
        });
    });
}

fn metric_chip(ui: &mut egui::Ui, key: &str, value: String) {
    let text = egui::RichText::new(format!("{key}: {value}"))
        .small()
        .color(egui::Color32::from_rgb(205, 215, 225));
    ui.group(|ui| {
        ui.label(text);
    });
}
