/*!
One playable level: simulation, player and controllers, stepped in a fixed order.

Per physics tick:
1. platforms write their kinematic targets
2. motion turns input into forces (using the contact found last tick)
3. the simulation steps
4. the surface detector probes along the current gravity
5. the gravity controller reacts to the contact; a change reaches motion, camera and the
   simulation before this tick ends
6. the gravity cooldown counts down

After all ticks of a frame, the camera advances by the frame delta.
*/

use log::info;

use crate::{
    basis::{MovementBasis, Vec3},
    camera::{CameraOrientationController, CameraPose},
    config::EngineConfig,
    error::{LevelError, PhysicsError},
    gravity::{GravityChanged, GravityController, GravityObserver, GravityState},
    level::{ColliderRole, LevelBounds, LevelGeometryHost, PickupKind, SpawnPoint},
    motion::{MoveInput, PlayerMotionController},
    platform::PlatformSet,
    shape::ShapeDef,
    simulation::{BodyDesc, BodyHandle, RigidBodySimulation, TriggerEvent},
    surface::{SurfaceContact, SurfaceDetector},
    tag::{CollisionGroup, ElementId},
};

/// What happened during one [`KulaWorld::update`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Physics ticks run this frame.
    pub ticks: u32,
    pub gravity_changes: Vec<GravityChanged>,
    pub triggers: Vec<TriggerEvent>,
    pub jumped: bool,
}

pub struct KulaWorld {
    sim: RigidBodySimulation,
    player: BodyHandle,
    spawn: SpawnPoint,
    spawn_position: Vec3,
    bounds: LevelBounds,
    fall_limit: f32,
    elements: Vec<(ElementId, BodyHandle)>,
    pickups: Vec<(ElementId, PickupKind)>,
    platforms: PlatformSet,
    surface: SurfaceDetector,
    gravity: GravityController,
    motion: PlayerMotionController,
    camera: CameraOrientationController,
}

impl KulaWorld {
    /// Build the world for `level`: every level collider, the player ball at the spawn,
    /// and gravity pointing away from the spawn's up axis.
    pub fn load(level: &impl LevelGeometryHost, config: EngineConfig) -> Result<Self, LevelError> {
        config.validate()?;
        let EngineConfig {
            simulation,
            surface,
            gravity,
            motion,
            camera,
        } = config;

        let spawn = level.spawn();
        let gravity = GravityController::new(gravity, spawn.up);
        let mut sim = RigidBodySimulation::new(gravity.gravity(), simulation);

        let mut platforms = PlatformSet::new();
        let mut pickups = Vec::new();
        let colliders = level.colliders();
        let mut elements = Vec::with_capacity(colliders.len());
        for def in &colliders {
            let handle = sim.create_body(&def.body_desc())?;
            elements.push((def.id, handle));
            match def.role {
                ColliderRole::Solid => {}
                ColliderRole::Platform(m) if m.is_fixed() => {}
                ColliderRole::Platform(m) => platforms.add(handle, def.position, m),
                ColliderRole::Pickup(kind) => pickups.push((def.id, kind)),
            }
        }

        let ball = ShapeDef::Sphere {
            radius: motion.radius,
        };
        let up = spawn.up.to_vector();
        let spawn_position = spawn.surface + up * ball.half_height(&up);
        let player = sim.create_body(&BodyDesc::dynamic(
            ball,
            spawn_position,
            motion.mass,
            CollisionGroup::Player,
        ))?;
        sim.watch_triggers(player);
        sim.refresh_queries();

        let basis = *gravity.basis();
        info!(
            "level loaded: {} colliders, {} platforms, {} pickups, spawn {:?} up {:?}",
            colliders.len(),
            platforms.len(),
            pickups.len(),
            spawn_position,
            spawn.up
        );

        Ok(Self {
            sim,
            player,
            spawn,
            spawn_position,
            bounds: level.bounds(),
            fall_limit: level.fall_limit(),
            elements,
            pickups,
            platforms,
            surface: SurfaceDetector::new(surface, motion.radius),
            gravity,
            motion: PlayerMotionController::new(motion, basis),
            camera: CameraOrientationController::new(camera, basis),
        })
    }

    /// Advance by one rendered frame.
    pub fn update(&mut self, frame_dt: f32, input: &MoveInput) -> Result<FrameReport, PhysicsError> {
        let mut report = FrameReport {
            ticks: self.sim.advance(frame_dt),
            ..FrameReport::default()
        };
        for _ in 0..report.ticks {
            self.tick(input, &mut report)?;
        }
        self.camera.update(frame_dt);
        Ok(report)
    }

    /// Run exactly one physics tick; the camera is not advanced.
    pub fn tick(&mut self, input: &MoveInput, report: &mut FrameReport) -> Result<(), PhysicsError> {
        let dt = self.sim.fixed_dt();
        self.platforms.advance(dt, &mut self.sim)?;

        let contact = self.surface.last_contact();
        let platform_velocity = contact
            .body
            .map_or_else(Vec3::zeros, |b| self.platforms.velocity_of(b));
        let outcome = self.motion.update(
            dt,
            &mut self.sim,
            self.player,
            input,
            &contact,
            platform_velocity,
        )?;
        report.jumped |= outcome.jumped;
        if outcome.jumped {
            self.surface.cancel_wrap();
        }

        self.sim.step_fixed();
        report.triggers.extend(self.sim.drain_trigger_events());

        let contact = self
            .surface
            .probe(&self.sim, self.player, self.gravity.basis());
        if let Some(event) = self.gravity.on_surface_contact(
            &contact,
            &mut [&mut self.motion, &mut self.camera, &mut self.sim],
        ) {
            report.gravity_changes.push(event);
        }
        self.gravity.tick();
        Ok(())
    }

    /// Put the ball back at the spawn at rest, with spawn gravity and a settled camera.
    pub fn respawn(&mut self) -> Result<(), PhysicsError> {
        self.sim.set_translation(self.player, self.spawn_position)?;
        self.sim.set_linvel(self.player, Vec3::zeros())?;
        self.sim.set_angvel(self.player, Vec3::zeros())?;
        self.sim.reset_forces(self.player)?;

        let event = self.gravity.reset(
            self.spawn.up,
            &mut [&mut self.motion, &mut self.sim],
        );
        self.camera.snap_to(event.basis);
        self.motion.reset();
        self.surface.reset();
        self.sim.refresh_queries();

        info!("player respawned at {:?}", self.spawn_position);
        Ok(())
    }

    /// Register an external observer (UI, sound) for gravity changes.
    pub fn subscribe(&mut self, observer: Box<dyn GravityObserver + Send + Sync>) {
        self.gravity.subscribe(observer);
    }

    #[inline]
    pub fn player(&self) -> BodyHandle {
        self.player
    }

    pub fn player_position(&self) -> Result<Vec3, PhysicsError> {
        self.sim.translation(self.player)
    }

    pub fn player_velocity(&self) -> Result<Vec3, PhysicsError> {
        self.sim.linvel(self.player)
    }

    /// True once the ball is further than the level's fall limit outside its bounds.
    pub fn has_fallen(&self) -> bool {
        self.player_position()
            .map_or(true, |p| self.bounds.distance_outside(&p) > self.fall_limit)
    }

    #[inline]
    pub fn gravity(&self) -> GravityState {
        self.gravity.state()
    }

    #[inline]
    pub fn basis(&self) -> &MovementBasis {
        self.gravity.basis()
    }

    #[inline]
    pub fn contact(&self) -> SurfaceContact {
        self.surface.last_contact()
    }

    #[inline]
    pub fn can_jump(&self) -> bool {
        self.motion.can_jump()
    }

    #[inline]
    pub fn camera(&self) -> &CameraOrientationController {
        &self.camera
    }

    /// Camera placement around the ball; `None` if the player body is gone.
    pub fn camera_pose(&self) -> Option<CameraPose> {
        let target = self.player_position().ok()?;
        Some(self.camera.pose(&target))
    }

    #[inline]
    pub fn bounds(&self) -> &LevelBounds {
        &self.bounds
    }

    pub fn pickup_kind(&self, id: ElementId) -> Option<PickupKind> {
        self.pickups
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, kind)| *kind)
    }

    /// Current center of a level element; `None` for unknown or collected ids.
    pub fn element_position(&self, id: ElementId) -> Option<Vec3> {
        let handle = self.element_handle(id)?;
        self.sim.translation(handle).ok()
    }

    /// Remove a pickup's trigger so it cannot fire again. Returns its kind, or `None` if
    /// `id` is not an uncollected pickup.
    pub fn collect_pickup(&mut self, id: ElementId) -> Result<Option<PickupKind>, PhysicsError> {
        let Some(i) = self.pickups.iter().position(|(pid, _)| *pid == id) else {
            return Ok(None);
        };
        let Some(handle) = self.element_handle(id) else {
            return Ok(None);
        };
        self.sim.remove_body(handle)?;
        self.elements.retain(|(eid, _)| *eid != id);
        let (_, kind) = self.pickups.swap_remove(i);
        info!("collected {kind:?} {id}");
        Ok(Some(kind))
    }

    fn element_handle(&self, id: ElementId) -> Option<BodyHandle> {
        self.elements
            .iter()
            .find(|(eid, _)| *eid == id)
            .map(|(_, h)| *h)
    }

    #[inline]
    pub fn simulation(&self) -> &RigidBodySimulation {
        &self.sim
    }

    /// Direct body access for collaborators such as a behavior system.
    #[inline]
    pub fn simulation_mut(&mut self) -> &mut RigidBodySimulation {
        &mut self.sim
    }
}
