// All tunable simulation constants in one place.

use std::path::Path;

use macroquad::prelude::{vec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::environment::LayerMask;
use crate::error::{ConfigError, ConfigFileError};
use crate::math::{serde_opt_vec3, serde_vec3};

// Simulation
pub const FIXED_DT: f32 = 1.0 / 60.0;
pub const DEFAULT_SEED: u64 = 42;
pub const INITIAL_AGENT_COUNT: usize = 200;
pub const MAX_AGENT_COUNT: usize = 2000;

// Steering guards
pub const MIN_SEPARATION_DISTANCE: f32 = 1.0e-3;
pub const MAX_REPULSION: f32 = 1.0 / MIN_SEPARATION_DISTANCE;
pub const DEFAULT_FORWARD: Vec3 = Vec3::Z;

// Flock defaults
pub const DEFAULT_SEPARATION_WEIGHT: f32 = 1.5;
pub const DEFAULT_ALIGNMENT_WEIGHT: f32 = 1.0;
pub const DEFAULT_COHESION_WEIGHT: f32 = 1.0;
pub const DEFAULT_GOAL_WEIGHT: f32 = 0.5;
pub const DEFAULT_BOUNDARY_WEIGHT: f32 = 2.0;
pub const DEFAULT_OBSTACLE_WEIGHT: f32 = 3.0;
pub const DEFAULT_MAX_SPEED: f32 = 6.0;
pub const DEFAULT_TURN_RATE: f32 = 3.0;
pub const DEFAULT_NEIGHBOR_RADIUS: f32 = 5.0;
pub const DEFAULT_SEPARATION_DISTANCE: f32 = 1.5;
pub const DEFAULT_BOUNDARY_HALF_EXTENTS: Vec3 = vec3(40.0, 20.0, 40.0);
pub const DEFAULT_BOUNDARY_MARGIN: f32 = 5.0;
pub const DEFAULT_PROBE_DISTANCE: f32 = 6.0;
pub const DEFAULT_PROBE_HALF_ANGLE: f32 = std::f32::consts::FRAC_PI_6; // 30 degrees

// Spatial hash
pub const SPATIAL_CELL_SIZE: f32 = DEFAULT_NEIGHBOR_RADIUS;

// Terrain
pub const TERRAIN_CELL_SIZE: f32 = 2.0;
pub const TERRAIN_AMPLITUDE: f32 = 8.0;
pub const TERRAIN_NOISE_SCALE: f64 = 3.0;
pub const TERRAIN_MARCH_STEP: f32 = 0.25;
/// Upper bound on samples per terrain probe; longer probes march with coarser steps.
pub const TERRAIN_MAX_MARCH_STEPS: usize = 4096;

// Stats
pub const STATS_HISTORY: usize = 1000;

// Camera
pub const CAMERA_ZOOM_MIN: f32 = 0.5;
pub const CAMERA_ZOOM_MAX: f32 = 40.0;
pub const CAMERA_PAN_SPEED: f32 = 400.0;
pub const CAMERA_ZOOM_SPEED: f32 = 0.1;
pub const CAMERA_SMOOTH_SPEED: f32 = 8.0;

/// Axis-aligned box given by center and half extents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(with = "serde_vec3")]
    pub center: Vec3,
    #[serde(with = "serde_vec3")]
    pub half_extents: Vec3,
}

impl Bounds {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    pub fn contains(&self, p: Vec3) -> bool {
        let d = (p - self.center).abs();
        d.x <= self.half_extents.x && d.y <= self.half_extents.y && d.z <= self.half_extents.z
    }

    /// Same center, each half extent shrunk by `amount` (never below zero).
    pub fn shrunk(&self, amount: f32) -> Self {
        Self {
            center: self.center,
            half_extents: (self.half_extents - Vec3::splat(amount)).max(Vec3::ZERO),
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(Vec3::ZERO, DEFAULT_BOUNDARY_HALF_EXTENTS)
    }
}

/// Flock-wide steering tunables, shared by every agent in a registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    pub goal_weight: f32,
    pub boundary_weight: f32,
    pub obstacle_weight: f32,
    pub max_speed: f32,
    pub turn_rate: f32,
    pub neighbor_radius: f32,
    pub separation_distance: f32,
    #[serde(with = "serde_opt_vec3")]
    pub goal_position: Option<Vec3>,
    pub boundary: Bounds,
    pub boundary_margin: f32,
    pub obstacle_probe_distance: f32,
    pub obstacle_probe_half_angle: f32,
    pub obstacle_layers: LayerMask,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            separation_weight: DEFAULT_SEPARATION_WEIGHT,
            alignment_weight: DEFAULT_ALIGNMENT_WEIGHT,
            cohesion_weight: DEFAULT_COHESION_WEIGHT,
            goal_weight: DEFAULT_GOAL_WEIGHT,
            boundary_weight: DEFAULT_BOUNDARY_WEIGHT,
            obstacle_weight: DEFAULT_OBSTACLE_WEIGHT,
            max_speed: DEFAULT_MAX_SPEED,
            turn_rate: DEFAULT_TURN_RATE,
            neighbor_radius: DEFAULT_NEIGHBOR_RADIUS,
            separation_distance: DEFAULT_SEPARATION_DISTANCE,
            goal_position: None,
            boundary: Bounds::default(),
            boundary_margin: DEFAULT_BOUNDARY_MARGIN,
            obstacle_probe_distance: DEFAULT_PROBE_DISTANCE,
            obstacle_probe_half_angle: DEFAULT_PROBE_HALF_ANGLE,
            obstacle_layers: LayerMask::ALL,
        }
    }
}

impl FlockConfig {
    /// All weights zero. Handy for isolating one steering rule.
    pub fn unweighted() -> Self {
        Self {
            separation_weight: 0.0,
            alignment_weight: 0.0,
            cohesion_weight: 0.0,
            goal_weight: 0.0,
            boundary_weight: 0.0,
            obstacle_weight: 0.0,
            ..Self::default()
        }
    }

    pub fn weights(&self) -> [(&'static str, f32); 6] {
        [
            ("separation_weight", self.separation_weight),
            ("alignment_weight", self.alignment_weight),
            ("cohesion_weight", self.cohesion_weight),
            ("goal_weight", self.goal_weight),
            ("boundary_weight", self.boundary_weight),
            ("obstacle_weight", self.obstacle_weight),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("neighbor_radius", self.neighbor_radius),
            ("separation_distance", self.separation_distance),
            ("boundary_margin", self.boundary_margin),
            ("obstacle_probe_distance", self.obstacle_probe_distance),
            ("boundary.half_extents.x", self.boundary.half_extents.x),
            ("boundary.half_extents.y", self.boundary.half_extents.y),
            ("boundary.half_extents.z", self.boundary.half_extents.z),
        ];
        for (field, value) in self.weights().into_iter().chain(non_negative) {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        for (field, value) in [("max_speed", self.max_speed), ("turn_rate", self.turn_rate)] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        if !self.boundary.center.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "boundary.center",
            });
        }
        if let Some(goal) = self.goal_position {
            if !goal.is_finite() {
                return Err(ConfigError::NonFinite {
                    field: "goal_position",
                });
            }
        }

        if self.separation_distance > self.neighbor_radius {
            return Err(ConfigError::SeparationExceedsNeighborRadius {
                separation: self.separation_distance,
                neighbor: self.neighbor_radius,
            });
        }

        let angle = self.obstacle_probe_half_angle;
        if !angle.is_finite() || !(0.0..=std::f32::consts::FRAC_PI_2).contains(&angle) {
            return Err(ConfigError::ProbeAngleOutOfRange(angle));
        }

        Ok(())
    }

    /// Clamp every field into its valid range; non-finite values fall back to defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let max_speed = clamp_finite(self.max_speed, 1.0e-3, f32::MAX, defaults.max_speed);
        let neighbor_radius =
            clamp_finite(self.neighbor_radius, 0.0, f32::MAX, defaults.neighbor_radius);
        let center = if self.boundary.center.is_finite() {
            self.boundary.center
        } else {
            defaults.boundary.center
        };
        let half = self.boundary.half_extents;
        let half_extents = vec3(
            clamp_finite(half.x, 0.0, f32::MAX, defaults.boundary.half_extents.x),
            clamp_finite(half.y, 0.0, f32::MAX, defaults.boundary.half_extents.y),
            clamp_finite(half.z, 0.0, f32::MAX, defaults.boundary.half_extents.z),
        );

        Self {
            separation_weight: clamp_weight(self.separation_weight),
            alignment_weight: clamp_weight(self.alignment_weight),
            cohesion_weight: clamp_weight(self.cohesion_weight),
            goal_weight: clamp_weight(self.goal_weight),
            boundary_weight: clamp_weight(self.boundary_weight),
            obstacle_weight: clamp_weight(self.obstacle_weight),
            max_speed,
            turn_rate: clamp_finite(self.turn_rate, 1.0e-3, f32::MAX, defaults.turn_rate),
            neighbor_radius,
            separation_distance: clamp_finite(
                self.separation_distance,
                0.0,
                neighbor_radius,
                defaults.separation_distance.min(neighbor_radius),
            ),
            goal_position: self.goal_position.filter(|g| g.is_finite()),
            boundary: Bounds::new(center, half_extents),
            boundary_margin: clamp_finite(
                self.boundary_margin,
                0.0,
                f32::MAX,
                defaults.boundary_margin,
            ),
            obstacle_probe_distance: clamp_finite(
                self.obstacle_probe_distance,
                0.0,
                f32::MAX,
                defaults.obstacle_probe_distance,
            ),
            obstacle_probe_half_angle: clamp_finite(
                self.obstacle_probe_half_angle,
                0.0,
                std::f32::consts::FRAC_PI_2,
                defaults.obstacle_probe_half_angle,
            ),
            obstacle_layers: self.obstacle_layers,
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigFileError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

fn clamp_weight(value: f32) -> f32 {
    clamp_finite(value, 0.0, f32::MAX, 0.0)
}

fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(FlockConfig::default().validate(), Ok(()));
        assert_eq!(FlockConfig::unweighted().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_each_invariant() {
        let cfg = FlockConfig {
            cohesion_weight: -0.1,
            ..FlockConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Negative {
                field: "cohesion_weight",
                ..
            })
        ));

        let cfg = FlockConfig {
            max_speed: 0.0,
            ..FlockConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotPositive {
                field: "max_speed",
                ..
            })
        ));

        let cfg = FlockConfig {
            neighbor_radius: 1.0,
            separation_distance: 2.0,
            ..FlockConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::SeparationExceedsNeighborRadius { .. })
        ));

        let cfg = FlockConfig {
            turn_rate: f32::NAN,
            ..FlockConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonFinite { field: "turn_rate" })
        );

        let cfg = FlockConfig {
            obstacle_probe_half_angle: 2.0,
            ..FlockConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ProbeAngleOutOfRange(2.0)));
    }

    #[test]
    fn sanitized_repairs_bad_values() {
        let bad = FlockConfig {
            separation_weight: -3.0,
            max_speed: -1.0,
            turn_rate: f32::INFINITY,
            neighbor_radius: 2.0,
            separation_distance: 9.0,
            goal_position: Some(vec3(f32::NAN, 0.0, 0.0)),
            obstacle_probe_half_angle: 5.0,
            ..FlockConfig::default()
        };
        let fixed = bad.sanitized();
        assert_eq!(fixed.validate(), Ok(()));
        assert_eq!(fixed.separation_weight, 0.0);
        assert!(fixed.max_speed > 0.0);
        assert_eq!(fixed.turn_rate, DEFAULT_TURN_RATE);
        assert_eq!(fixed.separation_distance, 2.0);
        assert_eq!(fixed.goal_position, None);
        assert_eq!(fixed.obstacle_probe_half_angle, std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn json_round_trip_keeps_vectors_as_arrays() {
        let cfg = FlockConfig {
            goal_position: Some(vec3(10.0, 0.0, -2.0)),
            ..FlockConfig::default()
        };
        let text = serde_json::to_string(&cfg).unwrap();
        assert!(text.contains("\"goal_position\":[10.0,0.0,-2.0]"));

        let back: FlockConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_json_fills_defaults_and_load_validates() {
        let partial: FlockConfig = serde_json::from_str(r#"{ "max_speed": 3.5 }"#).unwrap();
        assert_eq!(partial.max_speed, 3.5);
        assert_eq!(partial.neighbor_radius, DEFAULT_NEIGHBOR_RADIUS);

        let path = std::env::temp_dir().join(format!(
            "murmuration_bad_config_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "turn_rate": -1.0 }"#).unwrap();
        let err = FlockConfig::load_json(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::Invalid(_)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn bounds_contains_and_shrinks() {
        let b = Bounds::new(Vec3::ZERO, vec3(2.0, 2.0, 2.0));
        assert!(b.contains(vec3(2.0, -2.0, 0.0)));
        assert!(!b.contains(vec3(2.1, 0.0, 0.0)));
        assert_eq!(b.shrunk(3.0).half_extents, Vec3::ZERO);
    }
}
