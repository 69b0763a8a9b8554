/*!
Axis directions and the gravity-relative movement basis.

Everything here is pure math with no hidden state:
- `AxisDirection` names the six directions gravity (and face normals) may take.
- `compute_basis` derives `{forward, right, up}` from an up vector with a fixed
  tie-break, so every caller that sees the same up gets the same frame.
*/

use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;

/// One of the six world axis directions.
///
/// The discriminants are stable and used when logging; do not reorder.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisDirection {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl AxisDirection {
    pub const ALL: [AxisDirection; 6] = [
        AxisDirection::PosX,
        AxisDirection::NegX,
        AxisDirection::PosY,
        AxisDirection::NegY,
        AxisDirection::PosZ,
        AxisDirection::NegZ,
    ];

    /// Unit vector for this direction.
    #[inline]
    pub fn to_vector(self) -> Vec3 {
        match self {
            AxisDirection::PosX => Vec3::x(),
            AxisDirection::NegX => -Vec3::x(),
            AxisDirection::PosY => Vec3::y(),
            AxisDirection::NegY => -Vec3::y(),
            AxisDirection::PosZ => Vec3::z(),
            AxisDirection::NegZ => -Vec3::z(),
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            AxisDirection::PosX => AxisDirection::NegX,
            AxisDirection::NegX => AxisDirection::PosX,
            AxisDirection::PosY => AxisDirection::NegY,
            AxisDirection::NegY => AxisDirection::PosY,
            AxisDirection::PosZ => AxisDirection::NegZ,
            AxisDirection::NegZ => AxisDirection::PosZ,
        }
    }

    /// The axis direction closest to `v`, ignoring its length.
    ///
    /// Returns `None` for zero or non-finite vectors.
    pub fn nearest(v: &Vec3) -> Option<Self> {
        let len = v.norm();
        if !len.is_finite() || len <= f32::EPSILON {
            return None;
        }

        let n = v / len;
        // Strict `>` keeps the first axis in `ALL` order on exact ties.
        let mut best = AxisDirection::PosX;
        let mut best_dot = f32::NEG_INFINITY;
        for axis in Self::ALL {
            let d = axis.to_vector().dot(&n);
            if d > best_dot {
                best = axis;
                best_dot = d;
            }
        }
        Some(best)
    }

    /// Snap `v` to an axis direction if it lies within `tolerance_rad` of one.
    ///
    /// This is the validation used for probe normals: anything further from an axis
    /// (a ramp, a rounded edge) is rejected rather than guessed.
    pub fn snap(v: &Vec3, tolerance_rad: f32) -> Option<Self> {
        let axis = Self::nearest(v)?;
        let cos = axis.to_vector().dot(&v.normalize());
        (cos >= tolerance_rad.max(0.0).cos()).then_some(axis)
    }
}

/// Gravity-relative frame used to interpret directional input.
///
/// Always orthonormal. `right = forward x up` holds for every basis built by
/// [`compute_basis`], which makes `(right, up, -forward)` a right-handed camera frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl MovementBasis {
    /// Rotation whose local axes are `X = right`, `Y = up`, `Z = -forward`.
    ///
    /// The camera uses this as its settled frame, so "forward" on screen is the
    /// same "forward" the input uses.
    pub fn rotation(&self) -> Quat {
        let m = na::Matrix3::from_columns(&[self.right, self.up, -self.forward]);
        Quat::from_rotation_matrix(&na::Rotation3::from_matrix_unchecked(m))
    }

    /// Split `v` into its component along up and the remainder (the "horizontal" part).
    #[inline]
    pub fn split(&self, v: &Vec3) -> (f32, Vec3) {
        let along = v.dot(&self.up);
        (along, v - self.up * along)
    }
}

impl Default for MovementBasis {
    fn default() -> Self {
        compute_basis(&Vec3::y())
    }
}

/// Derive `{forward, right, up}` from `up`.
///
/// Tie-break rule:
/// - `reference = (0,1,0)` unless `|up.y| >= 0.99`, then `(0,0,1)`
/// - `right = normalize(reference x up)`
/// - `forward = normalize(up x right)`
///
/// `up` is normalized first; callers pass unit vectors in practice.
pub fn compute_basis(up: &Vec3) -> MovementBasis {
    let up = up.normalize();
    let reference = if up.y.abs() < 0.99 {
        Vec3::y()
    } else {
        Vec3::z()
    };
    let right = reference.cross(&up).normalize();
    let forward = up.cross(&right).normalize();

    MovementBasis { forward, right, up }
}

/// Any unit vector orthogonal to `v` (which must be non-zero).
pub fn any_orthogonal(v: &Vec3) -> Vec3 {
    let reference = if v.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    v.cross(&reference).normalize()
}
