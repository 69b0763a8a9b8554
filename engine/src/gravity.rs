/*!
Authoritative gravity direction and its observers.

`GravityController` is the only writer of the gravity direction. Every change goes through
`set_direction`, which recomputes the movement basis and notifies observers synchronously,
before `set_direction` returns. There is no event queue: an observer notified here sees the
new direction before the next physics tick.

Two kinds of observers exist:
- Core components (motion, camera) are passed in by `&mut` on each call, so the owner of the
  world keeps ordinary ownership of them.
- External collaborators (UI, sound) register once with `subscribe` and are stored boxed.
*/

use log::{debug, info};

use crate::{
    basis::{AxisDirection, MovementBasis, Vec3, compute_basis},
    config::GravitySettings,
    surface::SurfaceContact,
};

/// Current gravity: one of six axes at a fixed magnitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GravityState {
    /// Direction gravity pulls toward.
    pub direction: AxisDirection,
    pub magnitude: f32,
}

impl GravityState {
    /// Gravity as a world-space vector.
    #[inline]
    pub fn vector(&self) -> Vec3 {
        self.direction.to_vector() * self.magnitude
    }

    /// Unit vector opposite gravity.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.direction.opposite().to_vector()
    }

    #[inline]
    pub fn up_axis(&self) -> AxisDirection {
        self.direction.opposite()
    }
}

/// Emitted synchronously whenever the gravity direction changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GravityChanged {
    pub previous_up: Vec3,
    pub new_up: Vec3,
    /// New world gravity vector.
    pub gravity: Vec3,
    /// Basis derived from `new_up`.
    pub basis: MovementBasis,
}

pub trait GravityObserver {
    fn on_gravity_changed(&mut self, event: &GravityChanged);
}

/// Owns the gravity direction, decides when a contact reorients it, and fans out changes.
pub struct GravityController {
    settings: GravitySettings,
    state: GravityState,
    basis: MovementBasis,
    /// Ticks left during which contacts are ignored.
    cooldown: u32,
    subscribers: Vec<Box<dyn GravityObserver + Send + Sync>>,
}

impl GravityController {
    /// Start with gravity pulling toward `-initial_up`.
    pub fn new(settings: GravitySettings, initial_up: AxisDirection) -> Self {
        let state = GravityState {
            direction: initial_up.opposite(),
            magnitude: settings.magnitude,
        };
        Self {
            basis: compute_basis(&state.up()),
            state,
            settings,
            cooldown: 0,
            subscribers: Vec::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> GravityState {
        self.state
    }

    #[inline]
    pub fn gravity(&self) -> Vec3 {
        self.state.vector()
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.state.up()
    }

    #[inline]
    pub fn basis(&self) -> &MovementBasis {
        &self.basis
    }

    /// Ticks left before contacts are considered again.
    #[inline]
    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown
    }

    /// Register an external observer for every future change.
    pub fn subscribe(&mut self, observer: Box<dyn GravityObserver + Send + Sync>) {
        self.subscribers.push(observer);
    }

    /// Count down the debounce window. Call once per physics tick, after contact handling.
    pub fn tick(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    /// React to a surface probe result.
    ///
    /// Reorients when the contact normal differs from the current up by more than the
    /// threshold and no cooldown is running. Without contact nothing ever changes.
    /// Conflicting contacts during the cooldown are dropped; the first reorientation wins.
    pub fn on_surface_contact(
        &mut self,
        contact: &SurfaceContact,
        observers: &mut [&mut dyn GravityObserver],
    ) -> Option<GravityChanged> {
        if !contact.has_contact {
            return None;
        }
        let axis = contact.axis.or_else(|| AxisDirection::nearest(&contact.normal))?;

        let cos = axis.to_vector().dot(&self.up()).clamp(-1.0, 1.0);
        if cos.acos().to_degrees() <= self.settings.reorient_threshold_deg {
            return None;
        }
        if self.cooldown > 0 {
            debug!(
                "ignoring contact normal {:?} during gravity cooldown ({} ticks left)",
                axis, self.cooldown
            );
            return None;
        }

        let event = self.set_direction(axis.opposite(), observers);
        self.cooldown = self.settings.cooldown_ticks;
        event
    }

    /// Point gravity toward `direction` and notify observers.
    ///
    /// Returns `None` (and notifies nobody) if gravity already points that way.
    pub fn set_direction(
        &mut self,
        direction: AxisDirection,
        observers: &mut [&mut dyn GravityObserver],
    ) -> Option<GravityChanged> {
        if direction == self.state.direction {
            return None;
        }

        let previous_up = self.up();
        self.state.direction = direction;
        self.basis = compute_basis(&self.state.up());

        let event = GravityChanged {
            previous_up,
            new_up: self.state.up(),
            gravity: self.state.vector(),
            basis: self.basis,
        };
        info!(
            "gravity reoriented: up {:?} -> {:?}",
            previous_up, event.new_up
        );

        self.notify(&event, observers);
        Some(event)
    }

    /// Set gravity for a (re)spawn: no cooldown, observers always notified.
    pub fn reset(
        &mut self,
        up: AxisDirection,
        observers: &mut [&mut dyn GravityObserver],
    ) -> GravityChanged {
        self.cooldown = 0;
        let previous_up = self.up();
        self.state.direction = up.opposite();
        self.basis = compute_basis(&self.state.up());

        let event = GravityChanged {
            previous_up,
            new_up: self.state.up(),
            gravity: self.state.vector(),
            basis: self.basis,
        };
        self.notify(&event, observers);
        event
    }

    fn notify(&mut self, event: &GravityChanged, observers: &mut [&mut dyn GravityObserver]) {
        for observer in observers.iter_mut() {
            observer.on_gravity_changed(event);
        }
        for subscriber in self.subscribers.iter_mut() {
            subscriber.on_gravity_changed(event);
        }
    }
}
