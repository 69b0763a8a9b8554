use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::{
    basis::Vec3,
    error::PhysicsError,
    simulation::{BodyHandle, RigidBodySimulation},
};

/// How a level block moves.
///
/// Blocks without motion are static bodies; anything else becomes a kinematic body driven
/// by [`PlatformSet`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum PlatformMotion {
    #[default]
    Fixed,
    /// Ping-pong between the home position and `home + offset` with a cosine ease.
    /// One full round trip takes `period` seconds.
    Linear { offset: [f32; 3], period: f32 },
}

impl PlatformMotion {
    #[inline]
    pub fn is_fixed(&self) -> bool {
        matches!(self, PlatformMotion::Fixed)
    }

    /// `Err(period)` if the motion cannot be evaluated.
    pub fn validate(&self) -> Result<(), f32> {
        match *self {
            PlatformMotion::Fixed => Ok(()),
            PlatformMotion::Linear { offset, period } => {
                if period.is_finite() && period > 0.0 && offset.iter().all(|v| v.is_finite()) {
                    Ok(())
                } else {
                    Err(period)
                }
            }
        }
    }

    /// Displacement from home at `time` seconds.
    ///
    /// The phase is reduced in `f64` so it stays exact over long sessions.
    pub fn offset_at(&self, time: f64) -> Vec3 {
        match *self {
            PlatformMotion::Fixed => Vec3::zeros(),
            PlatformMotion::Linear { offset, period } => {
                let phase = (time / f64::from(period)).rem_euclid(1.0) as f32;
                let s = 0.5 * (1.0 - (TAU * phase).cos());
                Vec3::from(offset) * s
            }
        }
    }
}

#[derive(Clone, Debug)]
struct Platform {
    handle: BodyHandle,
    home: Vec3,
    motion: PlatformMotion,
    velocity: Vec3,
}

/// All moving platforms of a level.
///
/// Each tick, [`PlatformSet::advance`] writes every platform's next kinematic target and
/// records the velocity that move implies. The motion controller reads that velocity for
/// the platform the ball stands on.
#[derive(Clone, Debug, Default)]
pub struct PlatformSet {
    platforms: Vec<Platform>,
    time: f64,
}

impl PlatformSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: BodyHandle, home: Vec3, motion: PlatformMotion) {
        self.platforms.push(Platform {
            handle,
            home,
            motion,
            velocity: Vec3::zeros(),
        });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Seconds of platform time elapsed.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Schedule every platform's position for the end of the next `dt` tick.
    pub fn advance(&mut self, dt: f32, sim: &mut RigidBodySimulation) -> Result<(), PhysicsError> {
        let next_time = self.time + f64::from(dt);
        for p in &mut self.platforms {
            let from = p.motion.offset_at(self.time);
            let to = p.motion.offset_at(next_time);
            p.velocity = if dt > 0.0 { (to - from) / dt } else { Vec3::zeros() };
            sim.set_kinematic_target(p.handle, p.home + to)?;
        }
        self.time = next_time;
        Ok(())
    }

    /// Velocity of `body` over the current tick; zero for anything that is not a platform.
    pub fn velocity_of(&self, body: BodyHandle) -> Vec3 {
        self.platforms
            .iter()
            .find(|p| p.handle == body)
            .map_or_else(Vec3::zeros, |p| p.velocity)
    }
}
