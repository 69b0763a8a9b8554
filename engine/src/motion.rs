use crate::{
    basis::{MovementBasis, Vec3},
    config::MotionSettings,
    error::PhysicsError,
    gravity::{GravityChanged, GravityObserver},
    simulation::{BodyHandle, RigidBodySimulation},
    surface::SurfaceContact,
};

/// Player input for one tick: four directions plus jump.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl MoveInput {
    /// Input direction as `(x, z)` with `x` along right and `z` along forward.
    ///
    /// Unit length when non-zero. Opposite keys cancel out.
    pub fn direction(&self) -> (f32, f32) {
        let axis = |pos: bool, neg: bool| (pos as i8 - neg as i8) as f32;
        let x = axis(self.right, self.left);
        let z = axis(self.forward, self.backward);

        let len = (x * x + z * z).sqrt();
        if len > 0.0 { (x / len, z / len) } else { (0.0, 0.0) }
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.direction() != (0.0, 0.0)
    }
}

/// What [`PlayerMotionController::update`] did this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionOutcome {
    /// Force applied to the player for this tick (world space).
    pub force: Vec3,
    pub jumped: bool,
}

/// Turns directional input into forces in the gravity-relative basis.
///
/// The basis is swapped atomically when gravity changes, so "forward" always means the
/// forward of the surface the ball currently stands on.
#[derive(Clone, Debug)]
pub struct PlayerMotionController {
    settings: MotionSettings,
    basis: MovementBasis,
    can_jump: bool,
    /// Jump input of the previous tick, for edge detection.
    jump_held: bool,
}

impl PlayerMotionController {
    pub fn new(settings: MotionSettings, basis: MovementBasis) -> Self {
        Self {
            settings,
            basis,
            can_jump: false,
            jump_held: false,
        }
    }

    #[inline]
    pub fn basis(&self) -> &MovementBasis {
        &self.basis
    }

    #[inline]
    pub fn can_jump(&self) -> bool {
        self.can_jump
    }

    #[inline]
    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    /// Drive the player for the next tick.
    ///
    /// `contact` is the latest probe result and `platform_velocity` the velocity of the
    /// body the player stands on (zero for static ground). Horizontal speed is measured
    /// relative to that platform.
    pub fn update(
        &mut self,
        dt: f32,
        sim: &mut RigidBodySimulation,
        player: BodyHandle,
        input: &MoveInput,
        contact: &SurfaceContact,
        platform_velocity: Vec3,
    ) -> Result<MotionOutcome, PhysicsError> {
        sim.reset_forces(player)?;

        let velocity = sim.linvel(player)?;
        let (along, horizontal) = self.basis.split(&(velocity - platform_velocity));
        self.can_jump =
            contact.has_contact && along.abs() <= self.settings.grounded_velocity_band;

        let mut outcome = MotionOutcome::default();
        let mut new_velocity = velocity;

        let (x, z) = input.direction();
        if x != 0.0 || z != 0.0 {
            if dt > 0.0 {
                let mass = sim.mass(player)?;
                let push = (self.basis.right * x + self.basis.forward * z) * self.settings.acceleration;
                let predicted = horizontal + push * dt;
                let capped = predicted.cap_magnitude(self.settings.move_speed);
                outcome.force = (capped - horizontal) * (mass / dt);
                sim.add_force(player, outcome.force)?;
            }
        } else {
            let keep = (1.0 - self.settings.deceleration * dt).max(0.0);
            let damped = (horizontal * keep).cap_magnitude(self.settings.move_speed);
            new_velocity -= horizontal - damped;
        }

        let jump_pressed = input.jump && !self.jump_held;
        self.jump_held = input.jump;
        if jump_pressed && self.can_jump {
            let up = self.basis.up;
            new_velocity += up * (self.settings.jump_speed - new_velocity.dot(&up) + platform_velocity.dot(&up));
            self.can_jump = false;
            outcome.jumped = true;
        }

        if new_velocity != velocity {
            sim.set_linvel(player, new_velocity)?;
        }
        Ok(outcome)
    }

    /// Forget jump state, e.g. after a respawn.
    pub fn reset(&mut self) {
        self.can_jump = false;
        self.jump_held = false;
    }
}

impl GravityObserver for PlayerMotionController {
    fn on_gravity_changed(&mut self, event: &GravityChanged) {
        self.basis = event.basis;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        basis::{AxisDirection, compute_basis},
        config::SimulationSettings,
        shape::ShapeDef,
        simulation::BodyDesc,
        tag::CollisionGroup,
    };

    const DT: f32 = 1.0 / 60.0;

    fn floating_ball() -> (RigidBodySimulation, BodyHandle) {
        let settings = SimulationSettings {
            fixed_dt: DT,
            ..SimulationSettings::default()
        };
        let mut sim = RigidBodySimulation::new(Vec3::zeros(), settings);
        let ball = sim
            .create_body(&BodyDesc::dynamic(
                ShapeDef::Sphere { radius: 0.35 },
                Vec3::zeros(),
                1.0,
                CollisionGroup::Player,
            ))
            .unwrap();
        (sim, ball)
    }

    fn grounded() -> SurfaceContact {
        SurfaceContact {
            has_contact: true,
            normal: Vec3::y(),
            axis: Some(AxisDirection::PosY),
            body: None,
            distance: 0.35,
        }
    }

    fn controller() -> PlayerMotionController {
        PlayerMotionController::new(MotionSettings::default(), compute_basis(&Vec3::y()))
    }

    fn forward() -> MoveInput {
        MoveInput {
            forward: true,
            ..MoveInput::default()
        }
    }

    #[test]
    fn direction_normalizes_and_cancels() {
        let (x, z) = MoveInput {
            forward: true,
            right: true,
            ..MoveInput::default()
        }
        .direction();
        assert!((x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1.0e-6);
        assert!((z - std::f32::consts::FRAC_1_SQRT_2).abs() < 1.0e-6);

        let both = MoveInput {
            forward: true,
            backward: true,
            ..MoveInput::default()
        };
        assert_eq!(both.direction(), (0.0, 0.0));
        assert!(!both.is_moving());
    }

    #[test]
    fn input_pushes_along_basis_forward() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();

        let out = motion
            .update(DT, &mut sim, ball, &forward(), &grounded(), Vec3::zeros())
            .unwrap();
        let dir = out.force.normalize();
        assert!((dir - motion.basis().forward).norm() < 1.0e-5);
        assert!(out.force.dot(&motion.basis().up).abs() < 1.0e-6);
    }

    #[test]
    fn sustained_input_never_exceeds_move_speed() {
        let steer = |forward, backward, left, right| MoveInput {
            forward,
            backward,
            left,
            right,
            jump: false,
        };
        let inputs = [
            steer(true, false, false, false),
            steer(false, true, false, false),
            steer(false, false, true, false),
            steer(false, false, false, true),
            steer(true, false, true, false),
            steer(true, false, false, true),
            steer(false, true, true, false),
            steer(false, true, false, true),
        ];

        for up in [Vec3::y(), Vec3::x(), -Vec3::z()] {
            for input in &inputs {
                let (mut sim, ball) = floating_ball();
                let mut motion =
                    PlayerMotionController::new(MotionSettings::default(), compute_basis(&up));
                let cap = motion.settings().move_speed;

                let mut top = 0.0f32;
                for _ in 0..240 {
                    motion
                        .update(DT, &mut sim, ball, input, &grounded(), Vec3::zeros())
                        .unwrap();
                    sim.step_fixed();
                    let (_, h) = motion.basis().split(&sim.linvel(ball).unwrap());
                    assert!(h.norm() <= cap + 1.0e-3, "{input:?} up {up:?}: speed {}", h.norm());
                    top = top.max(h.norm());
                }
                assert!((top - cap).abs() < 1.0e-2, "{input:?} up {up:?}: top speed {top}");
            }
        }
    }

    #[test]
    fn no_input_clamps_speed_above_cap() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();
        let cap = motion.settings().move_speed;
        // Fast sideways motion, as left over from falling before a reorientation.
        sim.set_linvel(ball, Vec3::new(0.0, -1.0, 9.0)).unwrap();

        motion
            .update(DT, &mut sim, ball, &MoveInput::default(), &grounded(), Vec3::zeros())
            .unwrap();
        let v = sim.linvel(ball).unwrap();
        assert!((v.z - cap).abs() < 1.0e-5, "v = {v:?}");
        assert!((v.y + 1.0).abs() < 1.0e-6);

        // Already under the cap: plain damping.
        sim.set_linvel(ball, Vec3::new(0.0, 0.0, 1.0)).unwrap();
        motion
            .update(DT, &mut sim, ball, &MoveInput::default(), &grounded(), Vec3::zeros())
            .unwrap();
        let keep = 1.0 - motion.settings().deceleration * DT;
        assert!((sim.linvel(ball).unwrap().z - keep).abs() < 1.0e-5);
    }

    #[test]
    fn cap_leaves_vertical_velocity_alone() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();
        sim.set_linvel(ball, Vec3::new(0.0, -2.0, 0.0)).unwrap();

        motion
            .update(DT, &mut sim, ball, &forward(), &grounded(), Vec3::zeros())
            .unwrap();
        sim.step_fixed();
        assert!((sim.linvel(ball).unwrap().y + 2.0).abs() < 1.0e-5);
    }

    #[test]
    fn no_input_damps_horizontal_only() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();
        sim.set_linvel(ball, Vec3::new(3.0, 1.0, 0.0)).unwrap();

        let out = motion
            .update(DT, &mut sim, ball, &MoveInput::default(), &grounded(), Vec3::zeros())
            .unwrap();
        assert_eq!(out.force, Vec3::zeros());

        let v = sim.linvel(ball).unwrap();
        let keep = 1.0 - motion.settings().deceleration * DT;
        assert!((v.x - 3.0 * keep).abs() < 1.0e-5);
        assert!((v.y - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn opposite_inputs_apply_no_force_only_damping() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();
        sim.set_linvel(ball, Vec3::new(0.0, 0.0, 2.0)).unwrap();

        let input = MoveInput {
            forward: true,
            backward: true,
            ..MoveInput::default()
        };
        let out = motion
            .update(DT, &mut sim, ball, &input, &grounded(), Vec3::zeros())
            .unwrap();
        assert_eq!(out.force, Vec3::zeros());
        assert!(sim.linvel(ball).unwrap().z < 2.0);
    }

    #[test]
    fn damping_is_relative_to_platform() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();
        let platform = Vec3::new(1.0, 0.0, 0.0);
        sim.set_linvel(ball, platform).unwrap();

        motion
            .update(DT, &mut sim, ball, &MoveInput::default(), &grounded(), platform)
            .unwrap();
        assert!((sim.linvel(ball).unwrap() - platform).norm() < 1.0e-6);
    }

    #[test]
    fn jump_sets_up_velocity_on_rising_edge_only() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();
        let jump = MoveInput {
            jump: true,
            ..MoveInput::default()
        };

        let out = motion
            .update(DT, &mut sim, ball, &jump, &grounded(), Vec3::zeros())
            .unwrap();
        assert!(out.jumped);
        assert!(!motion.can_jump());
        let jump_speed = motion.settings().jump_speed;
        assert!((sim.linvel(ball).unwrap().y - jump_speed).abs() < 1.0e-5);

        // Held jump with the ball back at rest and grounded: no repeat.
        sim.set_linvel(ball, Vec3::zeros()).unwrap();
        let out = motion
            .update(DT, &mut sim, ball, &jump, &grounded(), Vec3::zeros())
            .unwrap();
        assert!(!out.jumped);
        assert!(motion.can_jump());
    }

    #[test]
    fn no_double_jump_in_mid_air() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();
        sim.set_linvel(ball, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        let jump = MoveInput {
            jump: true,
            ..MoveInput::default()
        };

        let out = motion
            .update(DT, &mut sim, ball, &jump, &SurfaceContact::none(), Vec3::zeros())
            .unwrap();
        assert!(!out.jumped);
        assert!(!motion.can_jump());
        assert!((sim.linvel(ball).unwrap().y - 2.0).abs() < 1.0e-6);
    }

    #[test]
    fn moving_contact_outside_band_cannot_jump() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();
        sim.set_linvel(ball, Vec3::new(0.0, 3.0, 0.0)).unwrap();

        motion
            .update(DT, &mut sim, ball, &MoveInput::default(), &grounded(), Vec3::zeros())
            .unwrap();
        assert!(!motion.can_jump());
    }

    #[test]
    fn gravity_change_swaps_basis() {
        let (mut sim, ball) = floating_ball();
        let mut motion = controller();
        let basis = compute_basis(&Vec3::x());
        motion.on_gravity_changed(&GravityChanged {
            previous_up: Vec3::y(),
            new_up: Vec3::x(),
            gravity: Vec3::new(-9.82, 0.0, 0.0),
            basis,
        });
        assert_eq!(*motion.basis(), basis);

        let out = motion
            .update(DT, &mut sim, ball, &forward(), &grounded(), Vec3::zeros())
            .unwrap();
        assert!((out.force.normalize() - basis.forward).norm() < 1.0e-5);
    }
}
