use crate::{
    color::Color,
    math::{self as m, Vec2},
    physics::collision,
    polygon::Polygon,
};

/// Mass of a body, which can be infinite.
///
/// This stores both a mass value and its inverse, because calculating inverse mass
/// is expensive and needed a lot in physics calculations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mass {
    Finite { mass: f64, inverse: f64 },
    Infinite,
}

impl From<f64> for Mass {
    /// # Panics
    /// Panics if the mass is not strictly positive.
    #[inline]
    fn from(mass: f64) -> Self {
        assert!(mass > 0.0, "Mass must be positive, got {mass}");
        if mass.is_infinite() {
            Mass::Infinite
        } else {
            Mass::Finite {
                mass,
                inverse: 1.0 / mass,
            }
        }
    }
}

impl Mass {
    /// Get the inverse of the mass, which is zero if the mass is infinite.
    #[inline]
    pub fn inv(&self) -> f64 {
        match self {
            Mass::Finite { inverse, .. } => *inverse,
            Mass::Infinite => 0.0,
        }
    }

    /// Get the mass as a plain number, `f64::INFINITY` if infinite.
    #[inline]
    pub fn value(&self) -> f64 {
        match self {
            Mass::Finite { mass, .. } => *mass,
            Mass::Infinite => f64::INFINITY,
        }
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        matches!(self, Mass::Infinite)
    }
}

/// Sprite metadata for renderers. Not used by the physics in any way.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub path: String,
    pub dimensions: Vec2,
}

/// Identifies a tick callback registered on a body, for unregistering it later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickCallbackId(u64);

/// A function run on a body once every time it is integrated, with the timestep.
pub type TickFn<P> = Box<dyn FnMut(&mut Body<P>, f64)>;

/// A rigid body constrained to the plane: a convex polygon with uniform density
/// that accumulates forces and impulses between ticks.
///
/// `P` is the user payload carried by the body, e.g. an enum over the kinds
/// of game object that exist. The body owns it and drops it when the body is destroyed.
pub struct Body<P = ()> {
    shape: Polygon,
    // always equal to shape.centroid(), cached because it's needed constantly
    centroid: Vec2,
    velocity: Vec2,
    mass: Mass,
    rotation: f64,
    bounding_radius: f64,
    pending_force: Vec2,
    pending_impulse: Vec2,
    tick_callbacks: Vec<(TickCallbackId, TickFn<P>)>,
    // callbacks can unregister other callbacks while the list is taken out for running
    unregistered_during_tick: Vec<TickCallbackId>,
    // ids in the taken-out list, empty outside of a tick
    running_ids: Vec<TickCallbackId>,
    next_callback_id: u64,
    removed: bool,
    color: Color,
    payload: Option<P>,
    sprite: Option<Sprite>,
}

impl<P> Body<P> {
    /// Create a body at rest with the given shape in world space.
    ///
    /// # Panics
    /// Panics if a mass given as a number is not positive.
    pub fn new(shape: Polygon, mass: impl Into<Mass>, color: Color) -> Self {
        let centroid = shape.centroid();
        let bounding_radius = shape.bounding_radius(centroid);
        Body {
            shape,
            centroid,
            velocity: Vec2::zero(),
            mass: mass.into(),
            rotation: 0.0,
            bounding_radius,
            pending_force: Vec2::zero(),
            pending_impulse: Vec2::zero(),
            tick_callbacks: Vec::new(),
            unregistered_during_tick: Vec::new(),
            running_ids: Vec::new(),
            next_callback_id: 0,
            removed: false,
            color,
            payload: None,
            sprite: None,
        }
    }

    /// Create a body whose mass is computed from the given density and its shape's area.
    pub fn with_density(shape: Polygon, density: f64, color: Color) -> Self {
        let mass = density * shape.area();
        Self::new(shape, mass, color)
    }

    /// Attach a payload in a builder-like chain.
    pub fn with_payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach sprite metadata in a builder-like chain.
    pub fn with_sprite(mut self, path: impl Into<String>, dimensions: Vec2) -> Self {
        self.sprite = Some(Sprite {
            path: path.into(),
            dimensions,
        });
        self
    }

    /// Set the velocity of the body in a builder-like chain.
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    // accessors

    /// The body's polygon in world space.
    #[inline]
    pub fn shape(&self) -> &Polygon {
        &self.shape
    }

    #[inline]
    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    /// Move the body so that its centroid is at `x`.
    pub fn set_centroid(&mut self, x: Vec2) {
        self.shape.translate(x - self.centroid);
        self.centroid = x;
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    #[inline]
    pub fn set_velocity(&mut self, v: Vec2) {
        self.velocity = v;
    }

    #[inline]
    pub fn mass(&self) -> Mass {
        self.mass
    }

    /// Orientation in radians, counterclockwise, relative to the shape the body was created with.
    #[inline]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Set the absolute orientation of the body, rotating it about its centroid.
    pub fn set_rotation(&mut self, angle: f64) {
        self.shape.rotate(angle - self.rotation, self.centroid);
        self.rotation = angle;
    }

    /// Radius of the smallest circle around the centroid that contains the whole body.
    #[inline]
    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    #[inline]
    pub fn payload(&self) -> Option<&P> {
        self.payload.as_ref()
    }

    #[inline]
    pub fn payload_mut(&mut self) -> Option<&mut P> {
        self.payload.as_mut()
    }

    #[inline]
    pub fn sprite(&self) -> Option<&Sprite> {
        self.sprite.as_ref()
    }

    #[inline]
    pub fn set_sprite(&mut self, sprite: Option<Sprite>) {
        self.sprite = sprite;
    }

    /// Force accumulated since the last tick.
    #[inline]
    pub fn pending_force(&self) -> Vec2 {
        self.pending_force
    }

    /// Impulse accumulated since the last tick.
    #[inline]
    pub fn pending_impulse(&self) -> Vec2 {
        self.pending_impulse
    }

    // forces

    /// Apply a force over the next tick. Forces applied in the same tick add up.
    #[inline]
    pub fn add_force(&mut self, force: Vec2) {
        self.pending_force += force;
    }

    /// Apply an instantaneous change in momentum at the next tick.
    /// Impulses applied in the same tick add up.
    #[inline]
    pub fn add_impulse(&mut self, impulse: Vec2) {
        self.pending_impulse += impulse;
    }

    /// Register a function to run every time this body is ticked.
    /// Callbacks run in the order they were registered.
    pub fn register_tick_callback(
        &mut self,
        f: impl FnMut(&mut Body<P>, f64) + 'static,
    ) -> TickCallbackId {
        let id = TickCallbackId(self.next_callback_id);
        self.next_callback_id += 1;
        self.tick_callbacks.push((id, Box::new(f)));
        id
    }

    /// Unregister a tick callback. Returns false if it wasn't registered.
    ///
    /// If called from within a tick callback, the removal takes effect after the current tick.
    pub fn unregister_tick_callback(&mut self, id: TickCallbackId) -> bool {
        if let Some(idx) = self.tick_callbacks.iter().position(|(cb_id, _)| *cb_id == id) {
            drop(self.tick_callbacks.remove(idx));
            true
        } else if self.running_ids.contains(&id) && !self.unregistered_during_tick.contains(&id) {
            self.unregistered_during_tick.push(id);
            true
        } else {
            false
        }
    }

    /// Number of registered tick callbacks.
    #[inline]
    pub fn tick_callback_count(&self) -> usize {
        self.tick_callbacks.len()
    }

    /// Integrate the body over a timestep of `dt` seconds.
    ///
    /// Velocity is updated from accumulated forces and impulses first,
    /// then tick callbacks run (seeing the new velocity),
    /// then the body is moved by the average of the velocities before and after the update.
    /// Accumulated forces and impulses are always zero afterwards.
    pub fn tick(&mut self, dt: f64) {
        let old_v = self.velocity;
        let inv_mass = self.mass.inv();
        let new_v = if inv_mass == 0.0 {
            // don't let infinite forces make NaNs on immovable bodies
            old_v
        } else {
            old_v + dt * inv_mass * self.pending_force + inv_mass * self.pending_impulse
        };
        self.pending_force = Vec2::zero();
        self.pending_impulse = Vec2::zero();
        self.velocity = new_v;

        self.run_tick_callbacks(dt);

        let movement = dt * 0.5 * (old_v + new_v);
        self.shape.translate(movement);
        self.centroid += movement;
    }

    fn run_tick_callbacks(&mut self, dt: f64) {
        if self.tick_callbacks.is_empty() {
            return;
        }
        let mut running = std::mem::take(&mut self.tick_callbacks);
        self.running_ids = running.iter().map(|(id, _)| *id).collect();
        for (_, f) in &mut running {
            f(self, dt);
        }
        self.running_ids.clear();
        // anything registered during the tick landed in the (now fresh) list
        let unregistered = std::mem::take(&mut self.unregistered_during_tick);
        running.retain(|(id, _)| !unregistered.contains(id));
        self.tick_callbacks.retain(|(id, _)| !unregistered.contains(id));
        running.append(&mut self.tick_callbacks);
        self.tick_callbacks = running;
    }

    // removal

    /// Mark the body for removal. It will be destroyed at the end of the next scene tick,
    /// along with any force creators that act on it.
    #[inline]
    pub fn remove(&mut self) {
        self.removed = true;
    }

    #[inline]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    // queries

    /// Check whether any vertex of the body is within the given bounds (inclusive).
    pub fn is_on_screen(&self, lower: Vec2, upper: Vec2) -> bool {
        self.shape
            .vertices()
            .iter()
            .any(|v| v.x >= lower.x && v.x <= upper.x && v.y >= lower.y && v.y <= upper.y)
    }

    /// Check whether this body overlaps another, using the full polygon test.
    pub fn is_overlapping<Q>(&self, other: &Body<Q>) -> bool {
        collision::find_collision(&self.shape, &other.shape).is_some()
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for Body<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("centroid", &self.centroid)
            .field("velocity", &self.velocity)
            .field("mass", &self.mass)
            .field("rotation", &self.rotation)
            .field("pending_force", &self.pending_force)
            .field("pending_impulse", &self.pending_impulse)
            .field("tick_callbacks", &self.tick_callbacks.len())
            .field("removed", &self.removed)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

/// Compute the impulse on `body1` from a collision with `body2` along `axis`.
/// Apply the negation of the result to `body2`.
///
/// Uses the reduced mass of the two bodies, or the finite one's mass alone
/// if the other is immovable. The impulse is zero if both masses are infinite.
///
/// # Panics
/// Panics if `elasticity` is not within `[0, 1]`.
pub fn calculate_impulse<P, Q>(
    body1: &Body<P>,
    body2: &Body<Q>,
    axis: m::Unit<Vec2>,
    elasticity: f64,
) -> Vec2 {
    assert!(
        (0.0..=1.0).contains(&elasticity),
        "Elasticity must be within [0, 1], got {elasticity}"
    );
    let vel1 = axis.dot(body1.velocity);
    let vel2 = axis.dot(body2.velocity);
    let reduced_mass = match (body1.mass, body2.mass) {
        (Mass::Infinite, Mass::Infinite) => return Vec2::zero(),
        (Mass::Finite { mass, .. }, Mass::Infinite) | (Mass::Infinite, Mass::Finite { mass, .. }) => {
            mass
        }
        (Mass::Finite { mass: m1, .. }, Mass::Finite { mass: m2, .. }) => m1 * m2 / (m1 + m2),
    };
    (reduced_mass * (1.0 + elasticity) * (vel2 - vel1)) * *axis
}
