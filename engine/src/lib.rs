pub mod basis;
pub mod camera;
pub mod config;
pub mod constants;
pub mod error;
pub mod gravity;
pub mod level;
pub mod motion;
pub mod platform;
pub mod shape;
pub mod simulation;
pub mod surface;
pub mod tag;
pub mod world;

pub use basis::{AxisDirection, MovementBasis, Quat, Vec3, compute_basis};
pub use camera::{CameraOrientationController, CameraPose, CameraState};
pub use config::{
    CameraSettings, EngineConfig, GravitySettings, MotionSettings, SimulationSettings,
    SurfaceSettings,
};
pub use error::{ConfigError, LevelError, PhysicsError};
pub use gravity::{GravityChanged, GravityController, GravityObserver, GravityState};
pub use level::{
    BlockDef, ColliderDef, ColliderRole, GridLevel, LevelBounds, LevelDef, LevelGeometryHost,
    PickupDef, PickupKind, SpawnDef, SpawnPoint,
};
pub use motion::{MotionOutcome, MoveInput, PlayerMotionController};
pub use platform::{PlatformMotion, PlatformSet};
pub use shape::ShapeDef;
pub use simulation::{BodyDesc, BodyHandle, RayHit, RigidBodySimulation, TriggerEvent};
pub use surface::{SurfaceContact, SurfaceDetector};
pub use tag::{BodyKind, CollisionGroup, ElementId};
pub use world::{FrameReport, KulaWorld};
