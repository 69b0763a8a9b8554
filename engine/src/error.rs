use thiserror::Error;

/// Errors raised while creating or addressing bodies in the simulation.
///
/// These are configuration errors: they fail at creation time and never during a tick.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("invalid {shape} shape: {reason}")]
    InvalidShape {
        shape: &'static str,
        reason: String,
    },
    #[error("dynamic body needs a positive, finite mass (got {0})")]
    InvalidMass(f32),
    #[error("body position must be finite (got [{0}, {1}, {2}])")]
    InvalidPosition(f32, f32, f32),
    #[error("no body with this handle exists in the simulation")]
    UnknownBody,
}

/// Errors raised while validating level data.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level `{0}` has no blocks")]
    Empty(String),
    #[error("duplicate element id {0}")]
    DuplicateId(u32),
    #[error("element id {0} is reserved for the player")]
    ReservedId(u32),
    #[error("block size must be positive and finite (got {0})")]
    InvalidBlockSize(f32),
    #[error("two elements occupy cell [{0}, {1}, {2}]")]
    DuplicateCell(i32, i32, i32),
    #[error("spawn cell [{0}, {1}, {2}] is inside a block")]
    SpawnInsideBlock(i32, i32, i32),
    #[error("moving platform {id} has an invalid period {period}")]
    InvalidPlatform { id: u32, period: f32 },
    #[error("failed to parse level data: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
