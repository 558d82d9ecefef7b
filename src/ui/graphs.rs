use egui;

use murmuration::stats::{FlockStats, RingBuffer};

/// Rolling flock metrics.
pub fn draw_graphs(ctx: &egui::Context, stats: &FlockStats) {
    egui::Window::new("Statistics")
        .default_pos(egui::pos2(300.0, 420.0))
        .default_size(egui::vec2(400.0, 300.0))
        .resizable(true)
        .show(ctx, |ui| {
            ui.collapsing("Average Speed", |ui| {
                draw_line_graph(ui, &stats.avg_speed, egui::Color32::from_rgb(100, 200, 255));
            });

            ui.collapsing("Polarization", |ui| {
                draw_line_graph(ui, &stats.polarization, egui::Color32::from_rgb(200, 200, 100));
            });

            ui.collapsing("Average Neighbors", |ui| {
                draw_line_graph(ui, &stats.avg_neighbors, egui::Color32::from_rgb(100, 200, 100));
            });

            ui.collapsing("Spread", |ui| {
                draw_line_graph(ui, &stats.spread, egui::Color32::from_rgb(200, 150, 255));
            });

            ui.collapsing("Agents", |ui| {
                draw_line_graph(ui, &stats.agent_count, egui::Color32::from_rgb(255, 160, 120));
            });
        });
}

fn draw_line_graph(ui: &mut egui::Ui, buffer: &RingBuffer, color: egui::Color32) {
    let size = egui::vec2(ui.available_width(), 80.0);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect;

    painter.rect_filled(rect, 2.0, egui::Color32::from_gray(20));
    draw_line_in_rect(&painter, buffer, rect, color);

    if let Some(val) = buffer.last() {
        painter.text(
            egui::pos2(rect.right() - 4.0, rect.top() + 2.0),
            egui::Align2::RIGHT_TOP,
            format!("{val:.2}"),
            egui::FontId::proportional(10.0),
            egui::Color32::from_gray(200),
        );
    }
}

fn draw_line_in_rect(painter: &egui::Painter, buffer: &RingBuffer, rect: egui::Rect, color: egui::Color32) {
    let len = buffer.len();
    if len < 2 {
        return;
    }

    let samples: Vec<f32> = buffer.iter().collect();
    let max_val = samples.iter().copied().fold(f32::MIN, f32::max);
    let min_val = samples.iter().copied().fold(f32::MAX, f32::min).min(0.0);
    let range = (max_val - min_val).max(1.0e-3);

    let points: Vec<egui::Pos2> = samples
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = rect.left() + (i as f32 / (len - 1) as f32) * rect.width();
            let y = rect.bottom() - ((v - min_val) / range) * rect.height();
            egui::pos2(x, y)
        })
        .collect();

    for pair in points.windows(2) {
        painter.line_segment([pair[0], pair[1]], egui::Stroke::new(1.5, color));
    }
}
