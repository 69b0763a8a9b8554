/*!
Engine settings.

Every tunable lives in one of the per-component settings structs below. Defaults come
from `constants`, so an empty config file (or no file at all) reproduces the stock
game feel. Settings files are RON and may list any subset of fields.

Notes
- Distances are in world units (one block = `BLOCK_SIZE`), time in seconds.
- `validate` rejects values that would make the simulation ill-defined (zero timestep,
  non-positive radius, ...). It does not judge whether a value plays well.
*/

use std::f32::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::{constants::*, error::ConfigError};

/// Settings for [`crate::simulation::RigidBodySimulation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Fixed tick length (seconds).
    pub fixed_dt: f32,
    /// Upper bound on ticks run per `step` call.
    pub max_ticks_per_step: u32,
    /// Largest frame delta accepted by the accumulator (seconds).
    pub max_frame_dt: f32,
    pub max_linear_speed: f32,
    pub max_angular_speed: f32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            fixed_dt: FIXED_TIMESTEP.as_secs_f32(),
            max_ticks_per_step: MAX_TICKS_PER_FRAME,
            max_frame_dt: MAX_FRAME_DELTA_S,
            max_linear_speed: MAX_LINEAR_SPEED,
            max_angular_speed: MAX_ANGULAR_SPEED,
        }
    }
}

/// Settings for [`crate::surface::SurfaceDetector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Probe length as a multiple of the ball radius.
    pub probe_length_factor: f32,
    /// Maximum deviation (radians) of a hit normal from an axis.
    pub axis_tolerance: f32,
    /// Ticks after losing ground during which perpendicular probes run.
    pub edge_wrap_ticks: u32,
    /// Along-up speed above which perpendicular probes are skipped.
    pub wrap_max_rise_speed: f32,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            probe_length_factor: PROBE_LENGTH_FACTOR,
            axis_tolerance: AXIS_TOLERANCE_RAD,
            edge_wrap_ticks: EDGE_WRAP_TICKS,
            wrap_max_rise_speed: EDGE_WRAP_MAX_RISE_SPEED,
        }
    }
}

/// Settings for [`crate::gravity::GravityController`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravitySettings {
    pub magnitude: f32,
    /// Minimum angle (degrees) between contact normal and current up to reorient.
    pub reorient_threshold_deg: f32,
    /// Ticks during which contacts are ignored after a reorientation.
    pub cooldown_ticks: u32,
}

impl Default for GravitySettings {
    fn default() -> Self {
        Self {
            magnitude: GRAVITY_MAGNITUDE,
            reorient_threshold_deg: REORIENT_THRESHOLD_DEG,
            cooldown_ticks: GRAVITY_COOLDOWN_TICKS,
        }
    }
}

/// Settings for [`crate::motion::PlayerMotionController`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    pub radius: f32,
    pub mass: f32,
    pub acceleration: f32,
    pub move_speed: f32,
    pub deceleration: f32,
    pub jump_speed: f32,
    pub grounded_velocity_band: f32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            radius: PLAYER_RADIUS,
            mass: PLAYER_MASS,
            acceleration: MOVE_ACCELERATION,
            move_speed: MOVE_SPEED,
            deceleration: DECELERATION,
            jump_speed: JUMP_SPEED,
            grounded_velocity_band: GROUNDED_VELOCITY_BAND,
        }
    }
}

/// Settings for [`crate::camera::CameraOrientationController`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Fraction of the remaining arc closed per second (clamped to one per frame).
    pub transition_rate: f32,
    pub settle_dot: f32,
    pub antiparallel_dot: f32,
    /// Camera position relative to the player in the camera frame.
    pub offset: [f32; 3],
    /// Look-at point relative to the player in the camera frame.
    pub look_offset: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            transition_rate: CAMERA_TRANSITION_RATE,
            settle_dot: CAMERA_SETTLE_DOT,
            antiparallel_dot: CAMERA_ANTIPARALLEL_DOT,
            offset: CAMERA_OFFSET,
            look_offset: CAMERA_LOOK_OFFSET,
        }
    }
}

/// All engine settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub simulation: SimulationSettings,
    pub surface: SurfaceSettings,
    pub gravity: GravitySettings,
    pub motion: MotionSettings,
    pub camera: CameraSettings,
}

impl EngineConfig {
    /// Parse a RON config and validate it.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that leave the simulation ill-defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, v: f32) -> Result<(), ConfigError> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be positive and finite",
                })
            }
        }

        fn non_negative(field: &'static str, v: f32) -> Result<(), ConfigError> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be non-negative and finite",
                })
            }
        }

        positive("simulation.fixed_dt", self.simulation.fixed_dt)?;
        positive("simulation.max_frame_dt", self.simulation.max_frame_dt)?;
        positive("simulation.max_linear_speed", self.simulation.max_linear_speed)?;
        positive("simulation.max_angular_speed", self.simulation.max_angular_speed)?;
        if self.simulation.max_ticks_per_step == 0 {
            return Err(ConfigError::Invalid {
                field: "simulation.max_ticks_per_step",
                reason: "must be at least 1",
            });
        }

        positive("surface.probe_length_factor", self.surface.probe_length_factor)?;
        if self.surface.probe_length_factor < 1.0 {
            return Err(ConfigError::Invalid {
                field: "surface.probe_length_factor",
                reason: "must reach at least the ball surface (>= 1.0)",
            });
        }

        // Beyond 45 degrees a normal could snap to two axes.
        positive("surface.axis_tolerance", self.surface.axis_tolerance)?;
        if self.surface.axis_tolerance >= FRAC_PI_4 {
            return Err(ConfigError::Invalid {
                field: "surface.axis_tolerance",
                reason: "must be below pi/4",
            });
        }
        non_negative("surface.wrap_max_rise_speed", self.surface.wrap_max_rise_speed)?;

        positive("gravity.magnitude", self.gravity.magnitude)?;
        positive("gravity.reorient_threshold_deg", self.gravity.reorient_threshold_deg)?;
        if self.gravity.reorient_threshold_deg >= 90.0 {
            return Err(ConfigError::Invalid {
                field: "gravity.reorient_threshold_deg",
                reason: "must be below 90",
            });
        }
        positive("motion.radius", self.motion.radius)?;
        positive("motion.mass", self.motion.mass)?;
        positive("motion.acceleration", self.motion.acceleration)?;
        positive("motion.move_speed", self.motion.move_speed)?;
        non_negative("motion.deceleration", self.motion.deceleration)?;
        non_negative("motion.jump_speed", self.motion.jump_speed)?;
        non_negative(
            "motion.grounded_velocity_band",
            self.motion.grounded_velocity_band,
        )?;
        positive("camera.transition_rate", self.camera.transition_rate)?;
        if !(-1.0..0.0).contains(&self.camera.antiparallel_dot) {
            return Err(ConfigError::Invalid {
                field: "camera.antiparallel_dot",
                reason: "must be in [-1, 0)",
            });
        }
        if !(0.0..1.0).contains(&self.camera.settle_dot) {
            return Err(ConfigError::Invalid {
                field: "camera.settle_dot",
                reason: "must be in [0, 1)",
            });
        }

        Ok(())
    }
}
