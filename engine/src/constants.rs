use std::time::Duration;

/// Gravity magnitude in units per second squared (positive value).
///
/// Gravity always has exactly this magnitude; only its axis changes.
pub const GRAVITY_MAGNITUDE: f32 = 9.82;

/// Fixed physics timestep.
///
/// Variable frame time is accumulated and consumed in whole ticks of this size.
pub const FIXED_TIMESTEP: Duration = Duration::from_micros(16_667);

/// Maximum number of physics ticks a single frame may run.
///
/// Anything beyond this is dropped so a long stall does not snowball into ever longer frames.
pub const MAX_TICKS_PER_FRAME: u32 = 5;

/// Largest frame delta accepted by the accumulator (seconds).
pub const MAX_FRAME_DELTA_S: f32 = 0.25;

/// Hard cap on the linear speed of any dynamic body (units per second).
///
/// Only reached after a numerical blow-up (e.g. a spawn overlapping geometry).
pub const MAX_LINEAR_SPEED: f32 = 50.0;

/// Hard cap on the angular speed of any dynamic body (radians per second).
pub const MAX_ANGULAR_SPEED: f32 = 100.0;

/// Edge length of one level block in world units.
///
/// Grid cell `(x, y, z)` has its center at `(x, y, z) * BLOCK_SIZE`.
pub const BLOCK_SIZE: f32 = 1.0;

/// Radius of the player ball.
pub const PLAYER_RADIUS: f32 = 0.35;

/// Mass of the player ball.
pub const PLAYER_MASS: f32 = 1.0;

/// Surface probe length as a multiple of the ball radius.
///
/// Slightly more than one so a resting ball always reaches the face it sits on.
pub const PROBE_LENGTH_FACTOR: f32 = 1.1;

/// Maximum deviation (radians) of a probe normal from the nearest axis for it to count as a face.
pub const AXIS_TOLERANCE_RAD: f32 = 0.05;

/// Number of ticks after the last grounded contact during which the perpendicular probes run.
///
/// This is what lets the ball wrap over a convex edge onto the side face of the block it left.
pub const EDGE_WRAP_TICKS: u32 = 45;

/// Perpendicular probes are skipped while the ball moves away from the surface faster than this.
///
/// Keeps a jump next to a wall from turning into a wall landing.
pub const EDGE_WRAP_MAX_RISE_SPEED: f32 = 0.5;

/// Minimum angle (degrees) between a contact normal and the current up to reorient gravity.
pub const REORIENT_THRESHOLD_DEG: f32 = 10.0;

/// Ticks after a reorientation during which further contact normals are ignored.
pub const GRAVITY_COOLDOWN_TICKS: u32 = 8;

/// Horizontal acceleration from directional input (units per second squared).
pub const MOVE_ACCELERATION: f32 = 14.0;

/// Maximum horizontal speed relative to the supporting surface (units per second).
pub const MOVE_SPEED: f32 = 3.5;

/// Exponential decay rate of horizontal velocity while no input is held (1 / seconds).
pub const DECELERATION: f32 = 4.0;

/// Velocity along up set by a jump (units per second).
pub const JUMP_SPEED: f32 = 5.2;

/// Band around zero of the along-up velocity inside which the player counts as resting.
pub const GROUNDED_VELOCITY_BAND: f32 = 0.5;

/// Fraction rate (1 / seconds) at which the camera up closes the remaining arc to its target.
pub const CAMERA_TRANSITION_RATE: f32 = 7.5;

/// Dot product between current and target up above which the camera counts as settled.
pub const CAMERA_SETTLE_DOT: f32 = 0.999;

/// Dot product below which current and target up are treated as antiparallel.
pub const CAMERA_ANTIPARALLEL_DOT: f32 = -0.9999;

/// Camera offset from the player, expressed in the camera frame (Y = current up, -Z = forward).
pub const CAMERA_OFFSET: [f32; 3] = [0.0, 2.2, 4.0];

/// Point the camera looks at, relative to the player in the camera frame.
pub const CAMERA_LOOK_OFFSET: [f32; 3] = [0.0, 0.6, 0.0];

/// Distance beyond the level bounds after which the player counts as fallen.
pub const DEFAULT_FALL_LIMIT: f32 = 12.0;
