use rapier3d::prelude::*;

use crate::{basis::Vec3, error::PhysicsError};

/// Collision shapes a body may have.
///
/// Blocks are cuboids, the player is a sphere. Dimensions are in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeDef {
    /// Sphere/ball.
    Sphere { radius: f32 },
    /// Axis-aligned cuboid with given half-extents.
    Cuboid { half_extents: Vec3 },
}

impl ShapeDef {
    /// Cube of edge length `size`.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        ShapeDef::Cuboid {
            half_extents: Vec3::new(h, h, h),
        }
    }

    /// Fails with [`PhysicsError::InvalidShape`] when any dimension is non-positive or non-finite.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        match *self {
            ShapeDef::Sphere { radius } if !valid(radius) => Err(PhysicsError::InvalidShape {
                shape: "sphere",
                reason: format!("radius must be positive, got {radius}"),
            }),
            ShapeDef::Cuboid { half_extents } if !half_extents.iter().all(|&h| valid(h)) => {
                Err(PhysicsError::InvalidShape {
                    shape: "cuboid",
                    reason: format!(
                        "half extents must be positive, got [{}, {}, {}]",
                        half_extents.x, half_extents.y, half_extents.z
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    /// Distance from the center to the surface along the up axis.
    pub fn half_height(&self, up: &Vec3) -> f32 {
        match *self {
            ShapeDef::Sphere { radius } => radius,
            ShapeDef::Cuboid { half_extents } => half_extents.component_mul(up).abs().sum(),
        }
    }
}

/// Start a rapier collider builder for `shape`.
///
/// The collider is attached to its body with identity local transform, so the body pose is the
/// collider pose. Material and group settings are left to the caller.
pub(crate) fn collider_builder(shape: &ShapeDef) -> ColliderBuilder {
    match *shape {
        ShapeDef::Sphere { radius } => ColliderBuilder::ball(radius),
        ShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
    }
}
