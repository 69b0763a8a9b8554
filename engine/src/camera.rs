/*!
Camera orientation that follows gravity.

The controller keeps a camera frame (a rotation) whose local +Y is the camera's current up.
When gravity changes, the frame is rotated toward the new basis a fraction of the remaining
arc each frame, so the transition is smooth, never overshoots and converges geometrically:

- Up travels along the great arc from `current_up` to `target_up`. The same incremental
  rotation is applied to the whole frame.
- The heading is then twisted about up by the same fraction, toward the target basis
  forward, so that when the camera settles "forward" on screen is the input's forward.
- Antiparallel targets (a floor to ceiling flip) have no unique arc. The rotation axis is
  then the right vector of the basis the camera last followed, or any vector orthogonal to
  up if that one is degenerate.

The controller only observes gravity; it never writes to it or to the player body.
*/

use std::f32::consts::PI;

use nalgebra as na;

use crate::{
    basis::{MovementBasis, Quat, Vec3, any_orthogonal},
    config::CameraSettings,
    gravity::{GravityChanged, GravityObserver},
};

/// Interpolation state of the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraState {
    Settled,
    /// Moving toward the target; `elapsed` is time since the transition started (seconds).
    Transitioning { elapsed: f32 },
}

/// World-space camera placement for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
}

#[derive(Clone, Debug)]
pub struct CameraOrientationController {
    settings: CameraSettings,
    state: CameraState,
    current_up: Vec3,
    target_up: Vec3,
    /// Basis the camera is heading toward (or resting on).
    target_basis: MovementBasis,
    /// Rotation axis for antiparallel transitions.
    fallback_axis: Vec3,
    /// Local +Y is `current_up`; local -Z is the camera heading.
    frame: Quat,
}

impl CameraOrientationController {
    pub fn new(settings: CameraSettings, basis: MovementBasis) -> Self {
        Self {
            settings,
            state: CameraState::Settled,
            current_up: basis.up,
            target_up: basis.up,
            target_basis: basis,
            fallback_axis: basis.right,
            frame: basis.rotation(),
        }
    }

    #[inline]
    pub fn state(&self) -> CameraState {
        self.state
    }

    #[inline]
    pub fn is_transitioning(&self) -> bool {
        matches!(self.state, CameraState::Transitioning { .. })
    }

    #[inline]
    pub fn current_up(&self) -> Vec3 {
        self.current_up
    }

    #[inline]
    pub fn target_up(&self) -> Vec3 {
        self.target_up
    }

    #[inline]
    pub fn frame(&self) -> Quat {
        self.frame
    }

    /// Jump straight to `basis` with no transition (level load, respawn).
    pub fn snap_to(&mut self, basis: MovementBasis) {
        self.state = CameraState::Settled;
        self.current_up = basis.up;
        self.target_up = basis.up;
        self.target_basis = basis;
        self.fallback_axis = basis.right;
        self.frame = basis.rotation();
    }

    /// Point the transition at a new basis. Mid-transition this only swaps the target.
    pub fn retarget(&mut self, basis: MovementBasis) {
        // The basis being left provides the flip axis for a 180 degree change.
        self.fallback_axis = self.target_basis.right;
        self.target_up = basis.up;
        self.target_basis = basis;

        if self.is_transitioning() {
            return;
        }
        if self.current_up.dot(&self.target_up) > self.settings.settle_dot
            && self.remaining_twist().abs() <= self.settle_angle()
        {
            self.settle();
        } else {
            self.state = CameraState::Transitioning { elapsed: 0.0 };
        }
    }

    /// Advance the transition by one frame. Does nothing once settled.
    pub fn update(&mut self, dt: f32) {
        let CameraState::Transitioning { elapsed } = self.state else {
            return;
        };
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let t = (self.settings.transition_rate * dt).min(1.0);
        self.state = CameraState::Transitioning {
            elapsed: elapsed + dt,
        };

        let arc = self.arc_rotation(t);
        self.current_up = (arc * self.current_up).normalize();
        self.frame = arc * self.frame;

        let twist = self.remaining_twist();
        if twist != 0.0 {
            let axis = na::Unit::new_unchecked(self.current_up);
            self.frame = Quat::from_axis_angle(&axis, twist * t) * self.frame;
        }
        self.frame.renormalize();

        if self.current_up.dot(&self.target_up) > self.settings.settle_dot
            && self.remaining_twist().abs() <= self.settle_angle()
        {
            self.settle();
        }
    }

    /// Camera placement around `target` (usually the player center).
    pub fn pose(&self, target: &Vec3) -> CameraPose {
        let offset = Vec3::from(self.settings.offset);
        let look_offset = Vec3::from(self.settings.look_offset);
        CameraPose {
            position: target + self.frame * offset,
            look_at: target + self.frame * look_offset,
            up: self.current_up,
        }
    }

    fn settle(&mut self) {
        self.state = CameraState::Settled;
        self.current_up = self.target_up;
        self.frame = self.target_basis.rotation();
    }

    fn settle_angle(&self) -> f32 {
        self.settings.settle_dot.clamp(-1.0, 1.0).acos()
    }

    /// Rotation covering fraction `t` of the great arc from current to target up.
    fn arc_rotation(&self, t: f32) -> Quat {
        let dot = self.current_up.dot(&self.target_up);
        if dot >= self.settings.antiparallel_dot
            && let Some(q) = Quat::scaled_rotation_between(&self.current_up, &self.target_up, t)
        {
            return q;
        }

        // Antiparallel: pick an axis orthogonal to up, preferring the last basis' right.
        let up = self.current_up;
        let mut axis = self.fallback_axis - up * self.fallback_axis.dot(&up);
        if axis.norm() < 1.0e-3 {
            axis = any_orthogonal(&up);
        }
        let angle = dot.clamp(-1.0, 1.0).acos().max(PI * 0.5);
        Quat::from_axis_angle(&na::Unit::new_normalize(axis), angle * t)
    }

    /// Signed angle about `current_up` from the frame heading to the target heading.
    ///
    /// Zero when either heading is degenerate in the plane orthogonal to up.
    fn remaining_twist(&self) -> f32 {
        let up = self.current_up;
        let flatten = |v: Vec3| v - up * v.dot(&up);

        let heading = flatten(self.frame * -Vec3::z());
        let wanted = flatten(self.target_basis.forward);
        if heading.norm() < 1.0e-3 || wanted.norm() < 1.0e-3 {
            return 0.0;
        }
        let heading = heading.normalize();
        let wanted = wanted.normalize();
        up.dot(&heading.cross(&wanted)).atan2(heading.dot(&wanted))
    }
}

impl GravityObserver for CameraOrientationController {
    fn on_gravity_changed(&mut self, event: &GravityChanged) {
        self.retarget(event.basis);
    }
}
