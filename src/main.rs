use macroquad::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use murmuration::audit;
use murmuration::config::{self, FlockConfig};
use murmuration::save_load;
use murmuration::simulation::{NeighborStrategy, SimState, UpdateOrder};
use murmuration::stats::FlockStats;

mod camera;
mod renderer;
mod ui;

use camera::{ground, CameraController};
use ui::UiState;

const SAVE_PATH: &str = "murmuration_save.bin";

fn window_conf() -> Conf {
    Conf {
        window_title: "Murmuration - Flocking Simulator".to_string(),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Args {
    agents: usize,
    seed: u64,
    config: Option<String>,
    update_order: UpdateOrder,
    neighbor_strategy: NeighborStrategy,
    audit_ticks: Option<u64>,
    audit_out: String,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            agents: config::INITIAL_AGENT_COUNT,
            seed: config::DEFAULT_SEED,
            config: None,
            update_order: UpdateOrder::InPlace,
            neighbor_strategy: NeighborStrategy::SpatialHash,
            audit_ticks: None,
            audit_out: "murmuration_audit.json".to_string(),
        }
    }
}

impl Args {
    fn parse(mut raw: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut args = Args::default();
        while let Some(flag) = raw.next() {
            match flag.as_str() {
                "--agents" => args.agents = parse_value(&flag, raw.next())?,
                "--seed" => args.seed = parse_value(&flag, raw.next())?,
                "--config" => args.config = Some(require(&flag, raw.next())?),
                "--snapshot" => args.update_order = UpdateOrder::Snapshot,
                "--brute-force" => args.neighbor_strategy = NeighborStrategy::BruteForce,
                "--audit" => args.audit_ticks = Some(parse_value(&flag, raw.next())?),
                "--audit-out" => args.audit_out = require(&flag, raw.next())?,
                other => return Err(format!("unknown argument: {other}")),
            }
        }
        Ok(args)
    }

    fn build_sim(&self) -> SimState {
        let config = match &self.config {
            Some(path) => match FlockConfig::load_json(path) {
                Ok(cfg) => cfg,
                Err(err) => {
                    error!(%err, path = %path, "config load failed, using defaults");
                    FlockConfig::default()
                }
            },
            None => FlockConfig::default(),
        };
        let mut sim = SimState::with_config(config, self.agents, self.seed);
        sim.update_order = self.update_order;
        sim.set_neighbor_strategy(self.neighbor_strategy);
        sim
    }
}

fn require(flag: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!("{flag} needs a value"))
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, String> {
    let value = require(flag, value)?;
    value
        .parse()
        .map_err(|_| format!("invalid value for {flag}: {value}"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            error!("{err}");
            eprintln!(
                "usage: murmuration [--agents N] [--seed S] [--config PATH] [--snapshot] \
                 [--brute-force] [--audit TICKS] [--audit-out PATH]"
            );
            std::process::exit(2);
        }
    };

    if let Some(ticks) = args.audit_ticks {
        let mut sim = args.build_sim();
        let report = audit::run(&mut sim, ticks);
        if let Err(err) = report.write_json(&args.audit_out) {
            error!(%err, path = %args.audit_out, "failed to write audit report");
            std::process::exit(1);
        }
        info!(path = %args.audit_out, status = %report.overall_status, "audit report written");
        std::process::exit(if report.passed() { 0 } else { 1 });
    }

    macroquad::Window::from_config(window_conf(), run_viewer(args));
}

async fn run_viewer(args: Args) {
    let mut sim = args.build_sim();
    let mut camera = CameraController::new(ground(sim.flock.config().boundary.center));
    let mut accumulator = 0.0f64;
    let mut flock_stats = FlockStats::new(config::STATS_HISTORY);
    let mut ui_state = UiState::default();

    loop {
        let frame_time = get_frame_time() as f64;
        accumulator += frame_time.min(0.1);

        let effective_dt = config::FIXED_DT as f64 / sim.speed_multiplier.max(0.01) as f64;
        if !sim.paused {
            while accumulator >= effective_dt {
                sim.tick();
                flock_stats.record(&sim.flock);
                accumulator -= effective_dt;
            }
        } else {
            accumulator = 0.0;
            if std::mem::take(&mut ui_state.step_requested) {
                sim.tick();
                flock_stats.record(&sim.flock);
            }
        }

        if std::mem::take(&mut ui_state.reset_requested) {
            let config = sim.flock.config().clone();
            let (order, strategy) = (sim.update_order, sim.neighbor_strategy());
            sim = SimState::with_config(config, args.agents, sim.seed);
            sim.update_order = order;
            sim.set_neighbor_strategy(strategy);
            flock_stats.clear();
            camera.following = None;
        }

        camera.update(&sim.flock, get_frame_time());

        // Agent selection via left click (only if egui doesn't want the input)
        let mut egui_wants_pointer = false;
        egui_macroquad::cfg(|ctx| {
            egui_wants_pointer = ctx.wants_pointer_input();
        });
        let mut egui_wants_keyboard = false;
        egui_macroquad::cfg(|ctx| {
            egui_wants_keyboard = ctx.wants_keyboard_input();
        });

        let mouse_ground = camera.screen_to_ground(Vec2::from(mouse_position()));
        if !egui_wants_pointer && is_mouse_button_pressed(MouseButton::Left) {
            let pick_radius = 12.0 / camera.smooth_zoom;
            camera.following = camera.pick_agent(mouse_ground, &sim.flock, pick_radius);
        }

        if !egui_wants_keyboard {
            handle_keys(&mut sim, &mut camera, &mut flock_stats, mouse_ground);
        }

        let alpha = if !sim.paused {
            (accumulator / effective_dt) as f32
        } else {
            1.0
        };

        renderer::draw(&sim, &camera, alpha);
        ui::draw_ui(&mut sim, &mut camera, &mut ui_state, &flock_stats);

        next_frame().await;
    }
}

fn handle_keys(
    sim: &mut SimState,
    camera: &mut CameraController,
    flock_stats: &mut FlockStats,
    mouse_ground: Vec2,
) {
    if is_key_pressed(KeyCode::Escape) {
        camera.following = None;
    }

    if is_key_pressed(KeyCode::Space) {
        sim.paused = !sim.paused;
    }

    if is_key_pressed(KeyCode::P) {
        sim.show_probes = !sim.show_probes;
    }

    // Drop the goal at the cursor, at mid height of the boundary.
    if is_key_pressed(KeyCode::G) {
        let y = sim.flock.config().boundary.center.y;
        let goal = vec3(mouse_ground.x, y, mouse_ground.y);
        if let Err(err) = sim.flock.update_config(|c| c.goal_position = Some(goal)) {
            warn!(%err, "goal rejected");
        }
    }

    if is_key_pressed(KeyCode::Delete) || is_key_pressed(KeyCode::Backspace) {
        if let Some(id) = camera.following.take() {
            sim.flock.remove_agent(id);
        }
    }

    // Save/Load (Ctrl+S / Ctrl+L)
    if is_key_down(KeyCode::LeftControl) || is_key_down(KeyCode::RightControl) {
        if is_key_pressed(KeyCode::S) {
            if let Err(err) = save_load::save_to_file(sim, SAVE_PATH) {
                error!(%err, "save failed");
            }
        }
        if is_key_pressed(KeyCode::L) {
            match save_load::load_from_file(SAVE_PATH) {
                Ok(loaded) => {
                    *sim = loaded;
                    *camera = CameraController::new(ground(sim.flock.config().boundary.center));
                    flock_stats.clear();
                }
                Err(err) => error!(%err, "load failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_gives_defaults() {
        assert_eq!(parse(&[]), Ok(Args::default()));
    }

    #[test]
    fn parses_every_flag() {
        let args = parse(&[
            "--agents", "64", "--seed", "9", "--config", "flock.json", "--snapshot",
            "--brute-force", "--audit", "300", "--audit-out", "out.json",
        ])
        .unwrap();
        assert_eq!(args.agents, 64);
        assert_eq!(args.seed, 9);
        assert_eq!(args.config.as_deref(), Some("flock.json"));
        assert_eq!(args.update_order, UpdateOrder::Snapshot);
        assert_eq!(args.neighbor_strategy, NeighborStrategy::BruteForce);
        assert_eq!(args.audit_ticks, Some(300));
        assert_eq!(args.audit_out, "out.json");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["--agents"]).is_err());
        assert!(parse(&["--agents", "many"]).is_err());
        assert!(parse(&["--fly"]).is_err());
    }
}
