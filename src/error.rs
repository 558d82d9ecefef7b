use thiserror::Error;

/// Rejected flock configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
    #[error("{field} must be non-negative (got {value})")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f32 },
    #[error("separation_distance {separation} exceeds neighbor_radius {neighbor}")]
    SeparationExceedsNeighborRadius { separation: f32, neighbor: f32 },
    #[error("obstacle_probe_half_angle {0} must lie within [0, pi/2]")]
    ProbeAngleOutOfRange(f32),
}

/// Failure while saving or restoring a flock snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encode: {0}")]
    Encode(#[source] bincode::Error),
    #[error("snapshot decode: {0}")]
    Decode(#[source] bincode::Error),
    #[error("unsupported snapshot version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("snapshot carries invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Failure while reading or writing a JSON config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Failure while writing an audit report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report io: {0}")]
    Io(#[from] std::io::Error),
    #[error("report json: {0}")]
    Json(#[from] serde_json::Error),
}
