pub mod graphs;
pub mod inspector;
pub mod settings;
pub mod toolbar;

use murmuration::simulation::SimState;
use murmuration::stats::FlockStats;

use crate::camera::CameraController;

/// Tracks which UI panels are open and requests the main loop should act on.
pub struct UiState {
    pub show_inspector: bool,
    pub show_graphs: bool,
    pub show_settings: bool,
    pub step_requested: bool,
    pub reset_requested: bool,
    pub config_path: String,
    /// Last save/load/config outcome, shown in the settings panel.
    pub status: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            show_inspector: true,
            show_graphs: false,
            show_settings: true,
            step_requested: false,
            reset_requested: false,
            config_path: "murmuration_config.json".to_string(),
            status: None,
        }
    }
}

/// Draw all egui UI panels.
pub fn draw_ui(
    sim: &mut SimState,
    camera: &mut CameraController,
    ui_state: &mut UiState,
    stats: &FlockStats,
) {
    egui_macroquad::ui(|ctx| {
        toolbar::draw_toolbar(ctx, sim, ui_state, stats);

        if ui_state.show_inspector {
            inspector::draw_inspector(ctx, sim, camera);
        }

        if ui_state.show_graphs {
            graphs::draw_graphs(ctx, stats);
        }

        if ui_state.show_settings {
            settings::draw_settings(ctx, sim, ui_state);
        }
    });

    egui_macroquad::draw();
}
