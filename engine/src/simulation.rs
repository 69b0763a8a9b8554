//! Rapier-based rigid-body simulation.
//!
//! [`RigidBodySimulation`] owns the whole Rapier world (bodies, colliders, broad/narrow phase,
//! solver state) and exposes the small surface the rest of the engine needs: body creation,
//! body read/write, fixed-step advancement, ray probes and sensor notifications.
//!
//! Design goals
//! - Deterministic: bodies are inserted in caller order (levels sort by id) and every tick uses
//!   the same `dt`, so the same inputs replay the same contacts.
//! - Contained: callers address bodies through [`BodyHandle`] and never touch Rapier sets.
//! - Never propagate NaN: every tick ends with a sanitize pass over dynamic bodies.

use log::{debug, warn};
use rapier3d::na::Point3;
use rapier3d::prelude::*;

use crate::{
    basis::Vec3,
    config::SimulationSettings,
    error::PhysicsError,
    gravity::{GravityChanged, GravityObserver},
    shape::{ShapeDef, collider_builder},
    tag::{
        BodyKind, BodyTag, CollisionGroup, ElementId, pack_tag, try_unpack_group, try_unpack_kind,
        unpack_element_id, validate_tag,
    },
};

/// Handle to a body created by [`RigidBodySimulation::create_body`].
///
/// Every body owns exactly one collider; both handles travel together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    pub(crate) body: RigidBodyHandle,
    pub(crate) collider: ColliderHandle,
}

/// Everything needed to create one body.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyDesc {
    pub shape: ShapeDef,
    /// World-space center.
    pub position: Vec3,
    /// Only used for dynamic bodies; must then be positive.
    pub mass: f32,
    pub kind: BodyKind,
    pub group: CollisionGroup,
    /// Level element this body represents (0 when not applicable).
    pub element: ElementId,
    pub friction: f32,
    pub restitution: f32,
}

impl BodyDesc {
    /// A solid, immovable level block.
    pub fn fixed(shape: ShapeDef, position: Vec3, element: ElementId) -> Self {
        Self {
            shape,
            position,
            mass: 0.0,
            kind: BodyKind::Static,
            group: CollisionGroup::Level,
            element,
            friction: 1.0,
            restitution: 0.0,
        }
    }

    /// A solid block whose position is driven from outside the solver.
    pub fn kinematic(shape: ShapeDef, position: Vec3, element: ElementId) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            ..Self::fixed(shape, position, element)
        }
    }

    /// A sensor that reports overlaps with the player but never collides.
    pub fn trigger(shape: ShapeDef, position: Vec3, element: ElementId) -> Self {
        Self {
            group: CollisionGroup::Trigger,
            ..Self::fixed(shape, position, element)
        }
    }

    /// A solver-integrated body.
    pub fn dynamic(shape: ShapeDef, position: Vec3, mass: f32, group: CollisionGroup) -> Self {
        Self {
            shape,
            position,
            mass,
            kind: BodyKind::Dynamic,
            group,
            element: 0,
            friction: 1.0,
            restitution: 0.0,
        }
    }
}

/// Nearest solid hit of a ray probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub body: BodyHandle,
    /// World-space outward normal of the face that was hit.
    pub normal: Vec3,
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
}

/// Change in overlap between the watched body and a sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEvent {
    Entered { trigger: BodyHandle, element: ElementId },
    Exited { trigger: BodyHandle, element: ElementId },
}

/// Accumulator that turns variable frame deltas into whole fixed ticks.
#[derive(Clone, Debug)]
pub(crate) struct FixedTimestep {
    dt: f32,
    max_ticks: u32,
    max_frame_dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            dt: settings.fixed_dt,
            max_ticks: settings.max_ticks_per_step.max(1),
            max_frame_dt: settings.max_frame_dt,
            accumulator: 0.0,
        }
    }

    /// Add `frame_dt` and return how many ticks are due.
    ///
    /// Negative or non-finite deltas count as zero. If more than `max_ticks` are due, the
    /// excess is dropped and only the sub-tick remainder is kept.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        let frame_dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, self.max_frame_dt)
        } else {
            0.0
        };
        self.accumulator += frame_dt;

        let due = (self.accumulator / self.dt).floor();
        let ticks = (due as u32).min(self.max_ticks);
        self.accumulator -= ticks as f32 * self.dt;

        if self.accumulator >= self.dt {
            debug!(
                "dropping {:.3}s of simulation time after {} ticks",
                self.accumulator - self.accumulator % self.dt,
                ticks
            );
            self.accumulator %= self.dt;
        }

        ticks
    }

    #[inline]
    pub fn dt(&self) -> f32 {
        self.dt
    }
}

/// The physics world.
pub struct RigidBodySimulation {
    gravity: Vec3,
    settings: SimulationSettings,
    timestep: FixedTimestep,
    tick: u64,

    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,

    /// Body whose sensor overlaps are tracked, with the sensors it overlapped last tick.
    trigger_watch: Option<(BodyHandle, Vec<ColliderHandle>)>,
    trigger_events: Vec<TriggerEvent>,
}

impl RigidBodySimulation {
    pub fn new(gravity: Vec3, settings: SimulationSettings) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: settings.fixed_dt,
            ..IntegrationParameters::default()
        };

        Self {
            gravity,
            timestep: FixedTimestep::new(&settings),
            settings,
            tick: 0,
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            trigger_watch: None,
            trigger_events: Vec::new(),
        }
    }

    #[inline]
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Replace world gravity. Takes effect on the next tick; there is no easing.
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
        // Sleeping bodies would otherwise ignore the new pull.
        for (_, rb) in self.bodies.iter_mut() {
            if rb.is_dynamic() {
                rb.wake_up(true);
            }
        }
    }

    #[inline]
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        self.settings.fixed_dt
    }

    /// Number of ticks run since creation.
    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Feed a variable frame delta into the fixed-step accumulator without stepping.
    ///
    /// Returns how many ticks are due; the caller runs them with [`Self::step_fixed`],
    /// interleaving its own per-tick work.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.timestep.advance(frame_dt)
    }

    /// Advance by a variable frame delta, running as many fixed ticks as are due.
    ///
    /// Returns the number of ticks run.
    pub fn step(&mut self, dt: f32) -> u32 {
        let ticks = self.advance(dt);
        for _ in 0..ticks {
            self.step_fixed();
        }
        ticks
    }

    /// Run exactly one fixed tick.
    pub fn step_fixed(&mut self) {
        // Velocities written between ticks are checked before they reach the solver.
        self.sanitize(&[]);
        let snapshot: Vec<(RigidBodyHandle, Vec3)> = self
            .bodies
            .iter()
            .filter(|(_, rb)| rb.is_dynamic())
            .map(|(handle, rb)| (handle, *rb.translation()))
            .collect();

        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );

        self.sanitize(&snapshot);
        self.collect_trigger_events();
        self.tick += 1;
    }

    /// Bring the broad phase up to date without advancing time.
    ///
    /// Ray probes only see colliders the broad phase knows about; call this after creating
    /// bodies if probes must work before the first tick.
    pub fn refresh_queries(&mut self) {
        let mut collision_pipeline = CollisionPipeline::new();
        collision_pipeline.step(
            0.0,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &(),
            &(),
        );
    }

    /// Create a body with a single collider.
    ///
    /// Fails fast on invalid shapes, non-finite positions and non-positive dynamic masses.
    pub fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError> {
        desc.shape.validate()?;
        if !desc.position.iter().all(|v| v.is_finite()) {
            return Err(PhysicsError::InvalidPosition(
                desc.position.x,
                desc.position.y,
                desc.position.z,
            ));
        }

        let builder = match desc.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
            BodyKind::Dynamic => {
                if !(desc.mass.is_finite() && desc.mass > 0.0) {
                    return Err(PhysicsError::InvalidMass(desc.mass));
                }
                RigidBodyBuilder::dynamic().ccd_enabled(true)
            }
        };
        let tag = pack_tag(desc.element, desc.kind, desc.group);
        debug_assert_eq!(validate_tag(tag), Ok(()));
        let rb = builder.translation(desc.position).user_data(tag).build();
        let body = self.bodies.insert(rb);

        let mut collider = collider_builder(&desc.shape)
            .friction(desc.friction)
            .restitution(desc.restitution)
            .collision_groups(interaction_groups(desc.group))
            .sensor(desc.group == CollisionGroup::Trigger);
        if desc.kind == BodyKind::Dynamic {
            collider = collider.mass(desc.mass);
        }
        let collider = self
            .colliders
            .insert_with_parent(collider.build(), body, &mut self.bodies);

        Ok(BodyHandle { body, collider })
    }

    /// Remove a body and its collider. Removing an unknown handle is an error.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.bodies
            .remove(
                handle.body,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .map(|_| ())
            .ok_or(PhysicsError::UnknownBody)?;

        if let Some((watched, overlaps)) = &mut self.trigger_watch {
            if *watched == handle {
                self.trigger_watch = None;
            } else {
                overlaps.retain(|c| *c != handle.collider);
            }
        }
        Ok(())
    }

    fn body(&self, handle: BodyHandle) -> Result<&RigidBody, PhysicsError> {
        self.bodies.get(handle.body).ok_or(PhysicsError::UnknownBody)
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        self.bodies
            .get_mut(handle.body)
            .ok_or(PhysicsError::UnknownBody)
    }

    fn tag(&self, handle: BodyHandle) -> Result<BodyTag, PhysicsError> {
        Ok(self.body(handle)?.user_data)
    }

    pub fn body_kind(&self, handle: BodyHandle) -> Result<BodyKind, PhysicsError> {
        try_unpack_kind(self.tag(handle)?).ok_or(PhysicsError::UnknownBody)
    }

    pub fn collision_group(&self, handle: BodyHandle) -> Result<CollisionGroup, PhysicsError> {
        try_unpack_group(self.tag(handle)?).ok_or(PhysicsError::UnknownBody)
    }

    pub fn element_id(&self, handle: BodyHandle) -> Result<ElementId, PhysicsError> {
        Ok(unpack_element_id(self.tag(handle)?))
    }

    pub fn translation(&self, handle: BodyHandle) -> Result<Vec3, PhysicsError> {
        Ok(*self.body(handle)?.translation())
    }

    /// Teleport a body. Velocities are kept; callers reset them when respawning.
    pub fn set_translation(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(handle)?.set_translation(position, true);
        Ok(())
    }

    pub fn linvel(&self, handle: BodyHandle) -> Result<Vec3, PhysicsError> {
        Ok(*self.body(handle)?.linvel())
    }

    pub fn set_linvel(&mut self, handle: BodyHandle, velocity: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(handle)?.set_linvel(velocity, true);
        Ok(())
    }

    pub fn angvel(&self, handle: BodyHandle) -> Result<Vec3, PhysicsError> {
        Ok(*self.body(handle)?.angvel())
    }

    pub fn set_angvel(&mut self, handle: BodyHandle, velocity: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(handle)?.set_angvel(velocity, true);
        Ok(())
    }

    pub fn mass(&self, handle: BodyHandle) -> Result<f32, PhysicsError> {
        Ok(self.body(handle)?.mass())
    }

    /// Add a world-space force for the next tick. Forces persist until [`Self::reset_forces`].
    pub fn add_force(&mut self, handle: BodyHandle, force: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(handle)?.add_force(force, true);
        Ok(())
    }

    pub fn reset_forces(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.body_mut(handle)?.reset_forces(true);
        Ok(())
    }

    /// Schedule a kinematic body to reach `position` at the end of the next tick.
    ///
    /// The solver derives the body's velocity from the move, so anything resting on it is
    /// carried along by friction.
    pub fn set_kinematic_target(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        if self.body_kind(handle)? != BodyKind::Kinematic {
            return Err(PhysicsError::UnknownBody);
        }
        self.body_mut(handle)?.set_next_kinematic_translation(position);
        Ok(())
    }

    /// Cast a ray against solid, non-dynamic colliders and return the nearest hit.
    ///
    /// Sensors and dynamic bodies are ignored, as is `exclude` (typically the prober itself).
    pub fn cast_ray(
        &self,
        origin: &Vec3,
        direction: &Vec3,
        max_len: f32,
        exclude: Option<BodyHandle>,
    ) -> Option<RayHit> {
        let mut filter = QueryFilter::exclude_dynamic().exclude_sensors();
        if let Some(handle) = exclude {
            filter = filter.exclude_rigid_body(handle.body);
        }

        let query_pipeline = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        );

        let ray = Ray::new(Point3::from(*origin), *direction);
        let (collider, hit) = query_pipeline.cast_ray_and_get_normal(&ray, max_len.max(0.0), true)?;
        let body = self.colliders.get(collider)?.parent()?;

        Some(RayHit {
            body: BodyHandle { body, collider },
            normal: hit.normal,
            distance: hit.time_of_impact,
        })
    }

    /// Track sensor overlaps of `handle`; events are reported by [`Self::drain_trigger_events`].
    pub fn watch_triggers(&mut self, handle: BodyHandle) {
        self.trigger_watch = Some((handle, Vec::new()));
    }

    /// Take the trigger events produced since the last call, in tick order.
    pub fn drain_trigger_events(&mut self) -> Vec<TriggerEvent> {
        std::mem::take(&mut self.trigger_events)
    }

    /// Diff this tick's sensor overlaps of the watched body against last tick's.
    fn collect_trigger_events(&mut self) {
        let Some((watched, previous)) = &mut self.trigger_watch else {
            return;
        };
        let watched = *watched;

        let mut current: Vec<ColliderHandle> = self
            .narrow_phase
            .intersection_pairs_with(watched.collider)
            .filter(|(_, _, intersecting)| *intersecting)
            .map(|(a, b, _)| if a == watched.collider { b } else { a })
            .collect();
        current.sort_by_key(|c| c.into_raw_parts());
        current.dedup();

        let to_event = |collider: ColliderHandle, entered: bool| -> Option<TriggerEvent> {
            let body = self.colliders.get(collider)?.parent()?;
            let element = unpack_element_id(self.bodies.get(body)?.user_data);
            let trigger = BodyHandle { body, collider };
            Some(if entered {
                TriggerEvent::Entered { trigger, element }
            } else {
                TriggerEvent::Exited { trigger, element }
            })
        };

        let mut events: Vec<TriggerEvent> = previous
            .iter()
            .filter(|c| !current.contains(c))
            .filter_map(|&c| to_event(c, false))
            .collect();
        events.extend(
            current
                .iter()
                .filter(|c| !previous.contains(c))
                .filter_map(|&c| to_event(c, true)),
        );

        *previous = current;
        self.trigger_events.extend(events);
    }

    /// Repair dynamic bodies.
    ///
    /// - Non-finite translation: restored to the value in `snapshot`, velocities zeroed.
    /// - Non-finite velocity: zeroed.
    /// - Excessive speed: clamped to the configured maximum.
    ///
    /// With an empty snapshot only velocities are checked.
    fn sanitize(&mut self, snapshot: &[(RigidBodyHandle, Vec3)]) {
        let max_lin = self.settings.max_linear_speed;
        let max_ang = self.settings.max_angular_speed;

        for (handle, rb) in self.bodies.iter_mut() {
            if !rb.is_dynamic() {
                continue;
            }
            let before = snapshot
                .iter()
                .find(|(h, _)| *h == handle)
                .map(|(_, p)| *p);

            if let Some(before) = before
                && !is_finite(rb.translation())
            {
                warn!(
                    "tick {}: non-finite position on {:?}, restoring {:?}",
                    self.tick, handle, before
                );
                rb.set_translation(before, true);
                rb.set_linvel(Vec3::zeros(), true);
                rb.set_angvel(Vec3::zeros(), true);
                continue;
            }

            if let Some(v) = clamp_velocity(rb.linvel(), max_lin) {
                warn!(
                    "tick {}: linear velocity {:?} on {:?} out of range, clamped",
                    self.tick,
                    rb.linvel(),
                    handle
                );
                rb.set_linvel(v, true);
            }
            if let Some(w) = clamp_velocity(rb.angvel(), max_ang) {
                warn!(
                    "tick {}: angular velocity {:?} on {:?} out of range, clamped",
                    self.tick,
                    rb.angvel(),
                    handle
                );
                rb.set_angvel(w, true);
            }
        }
    }

    /// Overwrite a dynamic body's state directly, bypassing all checks.
    ///
    /// Only used to exercise [`Self::sanitize`] in tests.
    #[cfg(test)]
    fn corrupt(&mut self, handle: BodyHandle, linvel: Vec3) {
        if let Some(rb) = self.bodies.get_mut(handle.body) {
            rb.set_linvel(linvel, true);
        }
    }
}

impl GravityObserver for RigidBodySimulation {
    fn on_gravity_changed(&mut self, event: &GravityChanged) {
        self.set_gravity(event.gravity);
    }
}

#[inline]
fn is_finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// The replacement for `v` if it is non-finite or longer than `max`, else `None`.
fn clamp_velocity(v: &Vec3, max: f32) -> Option<Vec3> {
    if !is_finite(v) {
        return Some(Vec3::zeros());
    }
    let speed = v.norm();
    (speed > max).then(|| v * (max / speed))
}

/// Interaction groups per collision layer.
///
/// - Player collides with level geometry and overlaps triggers.
/// - Level geometry collides with the player only; blocks never interact with each other.
/// - Triggers only see the player.
fn interaction_groups(group: CollisionGroup) -> InteractionGroups {
    let (memberships, filter) = match group {
        CollisionGroup::Player => (Group::GROUP_1, Group::GROUP_2 | Group::GROUP_3),
        CollisionGroup::Level => (Group::GROUP_2, Group::GROUP_1),
        CollisionGroup::Trigger => (Group::GROUP_3, Group::GROUP_1),
    };
    InteractionGroups::all()
        .with_memberships(memberships)
        .with_filter(filter)
}
