//! Force creators: things that run every tick before integration
//! and push bodies around by adding forces and impulses.
//!
//! Anything implementing [`ForceCreator`] can be registered with
//! [`Scene::add_force_creator`], including plain closures over a [`BodySet`].
//! The stock creators in this module cover the usual pairwise interactions,
//! and [`create_collision`] wraps any [`CollisionHandler`] so that it runs
//! once per contact between two bodies.

use crate::{
    math::{self as m, Unit, Vec2},
    physics::{
        body::{self, Body},
        collision::{self, ContactState},
    },
    scene::{BodyKey, BodySet, Scene},
};

use itertools::Itertools;

/// Distance below which Newtonian gravity is switched off,
/// so that nearby bodies don't get launched by huge forces.
pub const DEFAULT_MIN_GRAVITY_DISTANCE: f64 = 50.0;

/// Something that applies forces to bodies once every tick.
///
/// Any state needed lives in the implementing type itself,
/// and is dropped when the scene drops the creator.
pub trait ForceCreator<P>: 'static {
    fn apply(&mut self, bodies: &mut BodySet<P>);
}

impl<P, F> ForceCreator<P> for F
where
    F: FnMut(&mut BodySet<P>) + 'static,
{
    #[inline]
    fn apply(&mut self, bodies: &mut BodySet<P>) {
        self(bodies)
    }
}

/// Response to two bodies coming into contact.
///
/// `axis` is the collision axis, pointing from `body1` towards `body2`.
pub trait CollisionHandler<P>: 'static {
    fn handle(&mut self, body1: &mut Body<P>, body2: &mut Body<P>, axis: Unit<Vec2>);
}

impl<P, F> CollisionHandler<P> for F
where
    F: FnMut(&mut Body<P>, &mut Body<P>, Unit<Vec2>) + 'static,
{
    #[inline]
    fn handle(&mut self, body1: &mut Body<P>, body2: &mut Body<P>, axis: Unit<Vec2>) {
        self(body1, body2, axis)
    }
}

//
// stock force creators
//

/// Gravitational attraction `G m1 m2 / r²` between two bodies.
#[derive(Clone, Copy, Debug)]
pub struct NewtonianGravity {
    pub g: f64,
    pub min_distance: f64,
    pub bodies: [BodyKey; 2],
}

impl<P> ForceCreator<P> for NewtonianGravity {
    fn apply(&mut self, bodies: &mut BodySet<P>) {
        let [k1, k2] = self.bodies;
        let Some((body1, body2)) = bodies.get_pair_mut(k1, k2) else {
            return;
        };
        let (mass1, mass2) = (body1.mass(), body2.mass());
        if mass1.is_infinite() || mass2.is_infinite() {
            return;
        }
        let r12 = body2.centroid() - body1.centroid();
        let r = r12.mag();
        if r <= self.min_distance {
            return;
        }
        let force = (self.g * mass1.value() * mass2.value() / (r * r)) * (r12 / r);
        body1.add_force(force);
        body2.add_force(-force);
    }
}

/// A spring with zero rest length pulling two bodies together with force `k r`.
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    pub k: f64,
    pub bodies: [BodyKey; 2],
}

impl<P> ForceCreator<P> for Spring {
    fn apply(&mut self, bodies: &mut BodySet<P>) {
        let [k1, k2] = self.bodies;
        let Some((body1, body2)) = bodies.get_pair_mut(k1, k2) else {
            return;
        };
        let force = self.k * (body2.centroid() - body1.centroid());
        body1.add_force(force);
        body2.add_force(-force);
    }
}

/// Linear drag `-γ v` on a single body.
#[derive(Clone, Copy, Debug)]
pub struct Drag {
    pub gamma: f64,
    pub body: BodyKey,
}

impl<P> ForceCreator<P> for Drag {
    fn apply(&mut self, bodies: &mut BodySet<P>) {
        if let Some(body) = bodies.get_mut(self.body) {
            let force = -self.gamma * body.velocity();
            body.add_force(force);
        }
    }
}

/// Watches a pair of bodies and runs a handler once every time they come into contact.
pub struct CollisionForce<H> {
    pub bodies: [BodyKey; 2],
    pub handler: H,
    state: ContactState,
}

impl<H> CollisionForce<H> {
    pub fn new(body1: BodyKey, body2: BodyKey, handler: H) -> Self {
        CollisionForce {
            bodies: [body1, body2],
            handler,
            state: ContactState::Separated,
        }
    }

    #[inline]
    pub fn state(&self) -> ContactState {
        self.state
    }
}

impl<P, H: CollisionHandler<P>> ForceCreator<P> for CollisionForce<H> {
    fn apply(&mut self, bodies: &mut BodySet<P>) {
        let [k1, k2] = self.bodies;
        let Some((body1, body2)) = bodies.get_pair_mut(k1, k2) else {
            return;
        };

        // cheap bounding circle check before the full polygon test
        let dist = m::distance(body1.centroid(), body2.centroid());
        let coll = if dist > body1.bounding_radius() + body2.bounding_radius() {
            None
        } else {
            collision::find_collision(body1.shape(), body2.shape())
        };

        let was_separated = self.state == ContactState::Separated;
        if self.state.update(coll.is_some()) {
            log::trace!("Contact started between {:?} and {:?}", k1.index(), k2.index());
            if let Some(coll) = coll {
                self.handler.handle(body1, body2, coll.axis);
            }
        } else if !was_separated && self.state == ContactState::Separated {
            log::trace!("Contact ended between {:?} and {:?}", k1.index(), k2.index());
        }
    }
}

//
// stock collision handlers
//

/// Marks both bodies for removal when they touch.
#[derive(Clone, Copy, Debug, Default)]
pub struct DestructiveCollision;

impl<P> CollisionHandler<P> for DestructiveCollision {
    fn handle(&mut self, body1: &mut Body<P>, body2: &mut Body<P>, _axis: Unit<Vec2>) {
        body1.remove();
        body2.remove();
    }
}

/// Bounces the bodies off each other with the given elasticity.
#[derive(Clone, Copy, Debug)]
pub struct PhysicsCollision {
    pub elasticity: f64,
}

impl<P> CollisionHandler<P> for PhysicsCollision {
    fn handle(&mut self, body1: &mut Body<P>, body2: &mut Body<P>, axis: Unit<Vec2>) {
        let impulse = body::calculate_impulse(body1, body2, axis, self.elasticity);
        body1.add_impulse(impulse);
        body2.add_impulse(-impulse);
    }
}

//
// registration helpers
//

/// Attract two bodies with Newtonian gravity.
pub fn create_newtonian_gravity<P: 'static>(
    scene: &mut Scene<P>,
    g: f64,
    body1: BodyKey,
    body2: BodyKey,
) {
    scene.add_force_creator(
        [body1, body2],
        NewtonianGravity {
            g,
            min_distance: DEFAULT_MIN_GRAVITY_DISTANCE,
            bodies: [body1, body2],
        },
    );
}

/// Connect two bodies with a spring of constant `k`.
pub fn create_spring<P: 'static>(scene: &mut Scene<P>, k: f64, body1: BodyKey, body2: BodyKey) {
    scene.add_force_creator(
        [body1, body2],
        Spring {
            k,
            bodies: [body1, body2],
        },
    );
}

/// Slow a body down with linear drag.
///
/// # Panics
/// Panics if `gamma` is not positive.
pub fn create_drag<P: 'static>(scene: &mut Scene<P>, gamma: f64, body: BodyKey) {
    assert!(gamma > 0.0, "Drag coefficient must be positive, got {gamma}");
    scene.add_force_creator([body], Drag { gamma, body });
}

/// Run `handler` every time the two bodies come into contact.
/// It runs once when contact begins and not again until the bodies have separated.
pub fn create_collision<P: 'static>(
    scene: &mut Scene<P>,
    body1: BodyKey,
    body2: BodyKey,
    handler: impl CollisionHandler<P>,
) {
    scene.add_force_creator([body1, body2], CollisionForce::new(body1, body2, handler));
}

/// Remove both bodies when they touch.
pub fn create_destructive_collision<P: 'static>(
    scene: &mut Scene<P>,
    body1: BodyKey,
    body2: BodyKey,
) {
    create_collision(scene, body1, body2, DestructiveCollision);
}

/// Make two bodies bounce off each other.
///
/// # Panics
/// Panics if `elasticity` is not within `[0, 1]`.
pub fn create_physics_collision<P: 'static>(
    scene: &mut Scene<P>,
    elasticity: f64,
    body1: BodyKey,
    body2: BodyKey,
) {
    assert!(
        (0.0..=1.0).contains(&elasticity),
        "Elasticity must be within [0, 1], got {elasticity}"
    );
    create_collision(scene, body1, body2, PhysicsCollision { elasticity });
}

/// Make every pair of the given bodies bounce off each other.
pub fn create_physics_collisions_between<P: 'static>(
    scene: &mut Scene<P>,
    elasticity: f64,
    bodies: &[BodyKey],
) {
    for (&b1, &b2) in bodies.iter().tuple_combinations() {
        create_physics_collision(scene, elasticity, b1, b2);
    }
}
