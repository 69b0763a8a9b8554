use log::warn;

use crate::{
    basis::{AxisDirection, MovementBasis, Vec3},
    config::SurfaceSettings,
    simulation::{BodyHandle, RayHit, RigidBodySimulation},
};

/// Result of one surface probe. Recomputed every tick, never stored long-term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceContact {
    pub has_contact: bool,
    /// Outward normal of the supporting face, snapped to an axis. Zero without contact.
    pub normal: Vec3,
    pub axis: Option<AxisDirection>,
    /// Body that was hit.
    pub body: Option<BodyHandle>,
    /// Distance from the ball center to the face along the probe.
    pub distance: f32,
}

impl SurfaceContact {
    pub fn none() -> Self {
        Self {
            has_contact: false,
            normal: Vec3::zeros(),
            axis: None,
            body: None,
            distance: f32::INFINITY,
        }
    }

    fn hit(axis: AxisDirection, body: BodyHandle, distance: f32) -> Self {
        Self {
            has_contact: true,
            normal: axis.to_vector(),
            axis: Some(axis),
            body: Some(body),
            distance,
        }
    }
}

impl Default for SurfaceContact {
    fn default() -> Self {
        Self::none()
    }
}

/// Finds the face the ball is standing on.
///
/// - Primary probe: a ray from the ball center along gravity, `radius * probe_length_factor`
///   long.
/// - Edge wrap: for `edge_wrap_ticks` ticks after the ball rolled off a face, four more rays
///   run perpendicular to gravity. One of them hits the side face of the block it just left.
///   The window only applies while the ball is not rising and its center has dropped below
///   where it was last grounded; a jump closes it.
///
/// In both cases the nearest hit wins and its normal must snap to an axis. The detector
/// never touches gravity.
#[derive(Clone, Debug)]
pub struct SurfaceDetector {
    settings: SurfaceSettings,
    radius: f32,
    /// Ticks since the last grounded contact; `None` if never grounded since the last reset.
    ticks_since_contact: Option<u32>,
    /// Ball center at the last grounded contact.
    grounded_center: Option<Vec3>,
    last: SurfaceContact,
}

impl SurfaceDetector {
    pub fn new(settings: SurfaceSettings, radius: f32) -> Self {
        Self {
            settings,
            radius,
            ticks_since_contact: None,
            grounded_center: None,
            last: SurfaceContact::none(),
        }
    }

    #[inline]
    pub fn probe_length(&self) -> f32 {
        self.radius * self.settings.probe_length_factor
    }

    /// Contact found by the latest [`Self::probe`].
    #[inline]
    pub fn last_contact(&self) -> SurfaceContact {
        self.last
    }

    /// Forget the grounded history, e.g. after a respawn teleport.
    pub fn reset(&mut self) {
        self.cancel_wrap();
        self.last = SurfaceContact::none();
    }

    /// Close the edge-wrap window. Called when the ball leaves the ground by jumping.
    pub fn cancel_wrap(&mut self) {
        self.ticks_since_contact = None;
        self.grounded_center = None;
    }

    /// Probe around `player` using the current gravity-relative `basis`.
    ///
    /// Called once per physics tick, after the step.
    pub fn probe(
        &mut self,
        sim: &RigidBodySimulation,
        player: BodyHandle,
        basis: &MovementBasis,
    ) -> SurfaceContact {
        let contact = self.probe_inner(sim, player, basis);

        if contact.has_contact {
            self.ticks_since_contact = Some(0);
            self.grounded_center = sim.translation(player).ok();
        } else {
            self.ticks_since_contact = self.ticks_since_contact.map(|t| t.saturating_add(1));
        }
        self.last = contact;
        contact
    }

    fn probe_inner(
        &self,
        sim: &RigidBodySimulation,
        player: BodyHandle,
        basis: &MovementBasis,
    ) -> SurfaceContact {
        let (Ok(center), Ok(velocity)) = (sim.translation(player), sim.linvel(player)) else {
            return SurfaceContact::none();
        };
        let len = self.probe_length();

        if let Some(hit) = sim.cast_ray(&center, &-basis.up, len, Some(player)) {
            return self.validate(hit.normal, hit.body, hit.distance);
        }

        if !self.in_wrap_window()
            || velocity.dot(&basis.up) > self.settings.wrap_max_rise_speed
            || !self.dropped_below_ground(&center, basis)
        {
            return SurfaceContact::none();
        }

        // Nearest side hit wins; equal distances keep the first direction.
        let mut best: Option<RayHit> = None;
        for dir in [basis.forward, -basis.forward, basis.right, -basis.right] {
            if let Some(hit) = sim.cast_ray(&center, &dir, len, Some(player))
                && best.as_ref().is_none_or(|b| hit.distance < b.distance)
            {
                best = Some(hit);
            }
        }

        match best {
            Some(hit) => self.validate(hit.normal, hit.body, hit.distance),
            None => SurfaceContact::none(),
        }
    }

    fn in_wrap_window(&self) -> bool {
        self.ticks_since_contact
            .is_some_and(|t| t < self.settings.edge_wrap_ticks)
    }

    /// True once the center is no higher along up than at the last grounded contact.
    fn dropped_below_ground(&self, center: &Vec3, basis: &MovementBasis) -> bool {
        self.grounded_center
            .is_some_and(|g| (center - g).dot(&basis.up) <= 0.0)
    }

    fn validate(&self, normal: Vec3, body: BodyHandle, distance: f32) -> SurfaceContact {
        match AxisDirection::snap(&normal, self.settings.axis_tolerance) {
            Some(axis) => SurfaceContact::hit(axis, body, distance),
            None => {
                warn!(
                    "surface normal {:?} is not axis-aligned (tolerance {} rad), treating as no contact",
                    normal, self.settings.axis_tolerance
                );
                SurfaceContact::none()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        basis::compute_basis,
        config::SimulationSettings,
        shape::ShapeDef,
        simulation::BodyDesc,
        tag::CollisionGroup,
    };

    const R: f32 = 0.35;
    const EDGE_WRAP_WINDOW: u32 = crate::constants::EDGE_WRAP_TICKS;

    struct Rig {
        sim: RigidBodySimulation,
        player: BodyHandle,
        block: BodyHandle,
        detector: SurfaceDetector,
    }

    /// One unit block centered at the origin (top face at y = 0.5) and a weightless ball.
    fn rig(ball_at: Vec3) -> Rig {
        rig_with(ball_at, &[])
    }

    /// Like [`rig`], plus more unit blocks at `extra` centers.
    fn rig_with(ball_at: Vec3, extra: &[Vec3]) -> Rig {
        let mut sim = RigidBodySimulation::new(Vec3::zeros(), SimulationSettings::default());
        let block = sim
            .create_body(&BodyDesc::fixed(ShapeDef::cube(1.0), Vec3::zeros(), 1))
            .unwrap();
        for (i, at) in extra.iter().enumerate() {
            sim.create_body(&BodyDesc::fixed(ShapeDef::cube(1.0), *at, 2 + i as u32))
                .unwrap();
        }
        let player = sim
            .create_body(&BodyDesc::dynamic(
                ShapeDef::Sphere { radius: R },
                ball_at,
                1.0,
                CollisionGroup::Player,
            ))
            .unwrap();
        sim.refresh_queries();
        Rig {
            sim,
            player,
            block,
            detector: SurfaceDetector::new(SurfaceSettings::default(), R),
        }
    }

    fn probe(rig: &mut Rig, up: Vec3) -> SurfaceContact {
        let basis = compute_basis(&up);
        rig.detector.probe(&rig.sim, rig.player, &basis)
    }

    fn move_ball(rig: &mut Rig, to: Vec3) {
        rig.sim.set_translation(rig.player, to).unwrap();
        rig.sim.refresh_queries();
    }

    #[test]
    fn resting_ball_reports_top_face() {
        let mut rig = rig(Vec3::new(0.0, 0.5 + R, 0.0));
        let c = probe(&mut rig, Vec3::y());

        assert!(c.has_contact);
        assert_eq!(c.axis, Some(AxisDirection::PosY));
        assert_eq!(c.body, Some(rig.block));
        assert!((c.distance - R).abs() < 1.0e-4);
    }

    #[test]
    fn probe_follows_current_gravity() {
        // Ball resting against the +X face; with gravity still -Y the probe sees nothing.
        let mut rig = rig(Vec3::new(0.5 + R, 0.0, 0.0));
        assert!(!probe(&mut rig, Vec3::y()).has_contact);

        let c = probe(&mut rig, Vec3::x());
        assert_eq!(c.axis, Some(AxisDirection::PosX));
    }

    #[test]
    fn ball_out_of_reach_has_no_contact() {
        let mut rig = rig(Vec3::new(0.0, 0.5 + R * 1.2, 0.0));
        let c = probe(&mut rig, Vec3::y());
        assert_eq!(c, SurfaceContact::none());
    }

    #[test]
    fn wrap_probe_finds_side_face_after_leaving_the_top() {
        let mut rig = rig(Vec3::new(0.0, 0.5 + R, 0.0));
        assert!(probe(&mut rig, Vec3::y()).has_contact);

        // Over the edge and already below the top face, next to the +Z side.
        move_ball(&mut rig, Vec3::new(0.0, 0.45, 0.5 + R * 0.9));
        let c = probe(&mut rig, Vec3::y());
        assert!(c.has_contact);
        assert_eq!(c.axis, Some(AxisDirection::PosZ));
        assert!((c.normal - Vec3::z()).norm() < 1.0e-6);
    }

    #[test]
    fn wrap_probe_needs_recent_ground_contact() {
        // Never grounded: a side face in reach is ignored.
        let mut rig = rig(Vec3::new(0.0, 0.45, 0.5 + R * 0.9));
        assert!(!probe(&mut rig, Vec3::y()).has_contact);

        // Grounded, then airborne for longer than the window.
        move_ball(&mut rig, Vec3::new(0.0, 0.5 + R, 0.0));
        assert!(probe(&mut rig, Vec3::y()).has_contact);
        move_ball(&mut rig, Vec3::new(0.0, 3.0, 0.0));
        for _ in 0..EDGE_WRAP_WINDOW {
            assert!(!probe(&mut rig, Vec3::y()).has_contact);
        }
        move_ball(&mut rig, Vec3::new(0.0, 0.45, 0.5 + R * 0.9));
        assert!(!probe(&mut rig, Vec3::y()).has_contact);
    }

    #[test]
    fn wrap_probe_skipped_while_rising() {
        let mut rig = rig(Vec3::new(0.0, 0.5 + R, 0.0));
        assert!(probe(&mut rig, Vec3::y()).has_contact);

        move_ball(&mut rig, Vec3::new(0.0, 0.45, 0.5 + R * 0.9));
        rig.sim
            .set_linvel(rig.player, Vec3::new(0.0, 5.0, 0.0))
            .unwrap();
        assert!(!probe(&mut rig, Vec3::y()).has_contact);
    }

    #[test]
    fn wall_beside_a_rising_ball_is_ignored() {
        // A wall block on top of the far half of the floor block; its -Z face is at z = 0.5.
        let wall = Vec3::new(0.0, 1.0, 1.0);
        let against_wall = Vec3::new(0.0, 0.5 + R, 0.5 - R);
        let mut rig = rig_with(against_wall, &[wall]);
        assert_eq!(probe(&mut rig, Vec3::y()).axis, Some(AxisDirection::PosY));

        // Near the top of a hop: the floor is out of reach, the wall is not.
        move_ball(&mut rig, Vec3::new(0.0, 1.2, 0.5 - R));
        assert!(!probe(&mut rig, Vec3::y()).has_contact);
    }

    #[test]
    fn jump_closes_wrap_window() {
        let mut rig = rig(Vec3::new(0.0, 0.5 + R, 0.0));
        assert!(probe(&mut rig, Vec3::y()).has_contact);
        rig.detector.cancel_wrap();

        move_ball(&mut rig, Vec3::new(0.0, 0.45, 0.5 + R * 0.9));
        assert!(!probe(&mut rig, Vec3::y()).has_contact);
    }

    #[test]
    fn reset_clears_wrap_window() {
        let mut rig = rig(Vec3::new(0.0, 0.5 + R, 0.0));
        assert!(probe(&mut rig, Vec3::y()).has_contact);
        rig.detector.reset();
        assert!(!rig.detector.last_contact().has_contact);

        move_ball(&mut rig, Vec3::new(0.0, 0.45, 0.5 + R * 0.9));
        assert!(!probe(&mut rig, Vec3::y()).has_contact);
    }

    #[test]
    fn tilted_face_is_rejected() {
        let rig = rig(Vec3::new(0.0, 0.5 + R, 0.0));

        // A 30 degree normal deviation is far outside the snap tolerance.
        let tilted = Vec3::new(0.5, 0.866, 0.0);
        let c = rig.detector.validate(tilted, rig.block, 0.3);
        assert!(!c.has_contact);

        let nearly_up = Vec3::new(0.01, 1.0, 0.0).normalize();
        let c = rig.detector.validate(nearly_up, rig.block, 0.3);
        assert_eq!(c.axis, Some(AxisDirection::PosY));
    }
}
