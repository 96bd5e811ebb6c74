//! The scene: bodies sorted into layers, and the force creators acting on them.
//!
//! A [`Scene`] owns every body in the simulation. Bodies are addressed with
//! [`BodyKey`]s, which stay valid until the body is destroyed.
//! Layers are ordered lists of keys used for draw order and for picking out
//! groups of bodies that interact; layer 0 is by convention not drawn.
//!
//! Each [`tick`][Scene::tick] runs every force creator in registration order,
//! then integrates every body, then destroys bodies that were marked for removal
//! together with all force creators that depend on them.
//!
//! # Example
//! ```
//! # use apexframe::{Body, Color, Polygon, Scene, Vec2, forces};
//! let mut scene: Scene = Scene::new(Vec2::new(100.0, 100.0));
//! let ball = scene.add_body(Body::new(Polygon::circle(1.0, 20), 1.0, Color::WHITE));
//! forces::create_drag(&mut scene, 0.5, ball);
//! scene.body_mut(ball).unwrap().set_velocity(Vec2::new(10.0, 0.0));
//! scene.tick(1.0 / 60.0);
//! assert!(scene.body(ball).unwrap().velocity().x < 10.0);
//! ```

use crate::{
    math::Vec2,
    physics::{forces::ForceCreator, Body},
};

use thunderdome as td;

/// Key type to look up a body stored in a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyKey(td::Index);

impl BodyKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    /// Useful for creating your own mappings from bodies to other things.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

/// Storage for the bodies of a scene, handed to force creators every tick.
pub struct BodySet<P = ()> {
    bodies: td::Arena<Body<P>>,
}

impl<P> Default for BodySet<P> {
    fn default() -> Self {
        BodySet {
            bodies: td::Arena::new(),
        }
    }
}

impl<P> BodySet<P> {
    /// Access a body, if it still exists.
    #[inline]
    pub fn get(&self, key: BodyKey) -> Option<&Body<P>> {
        self.bodies.get(key.0)
    }

    /// Mutably access a body, if it still exists.
    #[inline]
    pub fn get_mut(&mut self, key: BodyKey) -> Option<&mut Body<P>> {
        self.bodies.get_mut(key.0)
    }

    /// Mutably access two different bodies at once.
    /// Returns None if either doesn't exist or both keys are the same.
    pub fn get_pair_mut(
        &mut self,
        key1: BodyKey,
        key2: BodyKey,
    ) -> Option<(&mut Body<P>, &mut Body<P>)> {
        if key1.0.slot() == key2.0.slot() {
            return None;
        }
        match self.bodies.get2_mut(key1.0, key2.0) {
            (Some(b1), Some(b2)) => Some((b1, b2)),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, key: BodyKey) -> bool {
        self.bodies.contains(key.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Iterate over all bodies in storage order (not layer order).
    pub fn iter(&self) -> impl Iterator<Item = (BodyKey, &Body<P>)> {
        self.bodies.iter().map(|(idx, b)| (BodyKey(idx), b))
    }

    fn insert(&mut self, body: Body<P>) -> BodyKey {
        BodyKey(self.bodies.insert(body))
    }

    fn remove(&mut self, key: BodyKey) -> Option<Body<P>> {
        self.bodies.remove(key.0)
    }
}

/// Parameters to construct a [`Scene`] with.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SceneParams {
    /// Width and height of the playing field. Not enforced on bodies,
    /// but available to game logic and renderers.
    pub dimensions: [f64; 2],
    /// Number of layers that exist from the start. More are created on demand.
    pub initial_layers: usize,
    /// Layer that [`Scene::add_body`] puts bodies in.
    pub default_layer: usize,
}

impl Default for SceneParams {
    fn default() -> Self {
        SceneParams {
            dimensions: [1000.0, 500.0],
            initial_layers: 2,
            default_layer: 1,
        }
    }
}

impl SceneParams {
    /// Check that the parameters describe a valid scene.
    pub fn validate(&self) -> Result<(), SceneError> {
        let [w, h] = self.dimensions;
        if !(w > 0.0 && h > 0.0) {
            return Err(SceneError::InvalidDimensions(self.dimensions));
        }
        if self.default_layer >= self.initial_layers {
            return Err(SceneError::DefaultLayerOutOfRange {
                default_layer: self.default_layer,
                initial_layers: self.initial_layers,
            });
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum SceneError {
    #[error("Scene dimensions must be positive, got {0:?}")]
    InvalidDimensions([f64; 2]),
    #[error("Default layer {default_layer} doesn't exist with {initial_layers} initial layers")]
    DefaultLayerOutOfRange {
        default_layer: usize,
        initial_layers: usize,
    },
}

struct Registration<P> {
    creator: Box<dyn ForceCreator<P>>,
    // the creator is dropped as soon as any of these is destroyed
    bodies: Vec<BodyKey>,
}

/// A collection of bodies in layers, plus force creators acting on them.
///
/// `P` is the payload type carried by every body in the scene.
pub struct Scene<P = ()> {
    bodies: BodySet<P>,
    layers: Vec<Vec<BodyKey>>,
    force_creators: Vec<Registration<P>>,
    dimensions: Vec2,
    default_layer: usize,
    paused: bool,
}

impl<P: 'static> Scene<P> {
    /// Create an empty scene with the given dimensions and default layers.
    ///
    /// # Panics
    /// Panics if either dimension is not positive.
    pub fn new(dimensions: Vec2) -> Self {
        let params = SceneParams {
            dimensions: [dimensions.x, dimensions.y],
            ..Default::default()
        };
        match Self::try_with_params(params) {
            Ok(scene) => scene,
            Err(err) => panic!("{err}"),
        }
    }

    /// Create an empty scene from parameters, e.g. loaded from a config file.
    pub fn try_with_params(params: SceneParams) -> Result<Self, SceneError> {
        params.validate()?;
        Ok(Scene {
            bodies: BodySet::default(),
            layers: (0..params.initial_layers).map(|_| Vec::new()).collect(),
            force_creators: Vec::new(),
            dimensions: Vec2::new(params.dimensions[0], params.dimensions[1]),
            default_layer: params.default_layer,
            paused: false,
        })
    }

    // bodies & layers

    /// Add a body to the default layer.
    pub fn add_body(&mut self, body: Body<P>) -> BodyKey {
        self.add_body_in_layer(body, self.default_layer)
    }

    /// Add a body to the given layer, creating layers up to that index if needed.
    pub fn add_body_in_layer(&mut self, body: Body<P>, layer: usize) -> BodyKey {
        if layer >= self.layers.len() {
            log::debug!("Creating layers {}..={layer}", self.layers.len());
            self.layers.resize_with(layer + 1, Vec::new);
        }
        let key = self.bodies.insert(body);
        self.layers[layer].push(key);
        key
    }

    #[inline]
    pub fn body(&self, key: BodyKey) -> Option<&Body<P>> {
        self.bodies.get(key)
    }

    #[inline]
    pub fn body_mut(&mut self, key: BodyKey) -> Option<&mut Body<P>> {
        self.bodies.get_mut(key)
    }

    #[inline]
    pub fn bodies(&self) -> &BodySet<P> {
        &self.bodies
    }

    #[inline]
    pub fn bodies_mut(&mut self) -> &mut BodySet<P> {
        &mut self.bodies
    }

    #[inline]
    pub fn num_bodies(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Keys of the bodies in a layer, in insertion order.
    ///
    /// # Panics
    /// Panics if the layer doesn't exist.
    pub fn layer(&self, idx: usize) -> &[BodyKey] {
        assert!(
            idx < self.layers.len(),
            "Layer {idx} doesn't exist, the scene has {} layers",
            self.layers.len()
        );
        &self.layers[idx]
    }

    /// Iterate over the bodies in a layer, in insertion order.
    ///
    /// # Panics
    /// Panics if the layer doesn't exist.
    pub fn layer_bodies(&self, idx: usize) -> impl Iterator<Item = (BodyKey, &Body<P>)> {
        self.layer(idx)
            .iter()
            .filter_map(move |&key| self.bodies.get(key).map(|b| (key, b)))
    }

    /// Iterate over every body in layer order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyKey, &Body<P>)> {
        self.layers
            .iter()
            .flatten()
            .filter_map(move |&key| self.bodies.get(key).map(|b| (key, b)))
    }

    /// Check whether two bodies in the scene overlap.
    /// False if either of them doesn't exist.
    pub fn are_overlapping(&self, key1: BodyKey, key2: BodyKey) -> bool {
        match (self.bodies.get(key1), self.bodies.get(key2)) {
            (Some(b1), Some(b2)) => b1.is_overlapping(b2),
            _ => false,
        }
    }

    // dimensions

    #[inline]
    pub fn dimensions(&self) -> Vec2 {
        self.dimensions
    }

    /// # Panics
    /// Panics if either dimension is not positive.
    pub fn set_dimensions(&mut self, dimensions: Vec2) {
        assert!(
            dimensions.x > 0.0 && dimensions.y > 0.0,
            "Scene dimensions must be positive, got {dimensions:?}"
        );
        self.dimensions = dimensions;
    }

    // force creators

    /// Register a force creator that runs every tick.
    ///
    /// `bodies` are the bodies the creator acts on. When any of them is destroyed,
    /// the creator is dropped along with any state it owns.
    pub fn add_force_creator(
        &mut self,
        bodies: impl IntoIterator<Item = BodyKey>,
        creator: impl ForceCreator<P>,
    ) {
        self.force_creators.push(Registration {
            creator: Box::new(creator),
            bodies: bodies.into_iter().collect(),
        });
    }

    #[inline]
    pub fn num_force_creators(&self) -> usize {
        self.force_creators.len()
    }

    // simulation

    /// Step the simulation forward by `dt` seconds. Does nothing while paused.
    pub fn tick(&mut self, dt: f64) {
        if self.paused {
            return;
        }

        for reg in &mut self.force_creators {
            reg.creator.apply(&mut self.bodies);
        }

        for &key in self.layers.iter().flatten() {
            if let Some(body) = self.bodies.get_mut(key) {
                body.tick(dt);
            }
        }

        self.destroy_removed();
    }

    /// Destroy bodies marked for removal and every force creator depending on them.
    fn destroy_removed(&mut self) {
        for layer in &mut self.layers {
            let mut body_idx = 0;
            // removal shifts the rest of the layer down, so only advance when keeping
            while body_idx < layer.len() {
                let key = layer[body_idx];
                if !self.bodies.get(key).map_or(true, Body::is_removed) {
                    body_idx += 1;
                    continue;
                }
                layer.remove(body_idx);
                let creators_before = self.force_creators.len();
                self.force_creators
                    .retain(|reg| !reg.bodies.contains(&key));
                log::debug!(
                    "Destroying body {:?} and {} force creators acting on it",
                    key.0,
                    creators_before - self.force_creators.len()
                );
                self.bodies.remove(key);
            }
        }
    }

    #[inline]
    pub fn pause(&mut self) {
        self.paused = true;
    }

    #[inline]
    pub fn resume(&mut self) {
        self.paused = false;
    }

    #[inline]
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{color::Color, polygon::Polygon};
    use std::{cell::RefCell, rc::Rc};

    fn square_at(pos: Vec2) -> Body<u32> {
        let mut shape = Polygon::rectangle(1.0, 1.0);
        shape.translate(pos);
        Body::new(shape, 1.0, Color::WHITE)
    }

    /// Counts how many times it's been dropped.
    struct DropCounter(Rc<RefCell<usize>>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            *self.0.borrow_mut() += 1;
        }
    }

    #[test]
    fn layers_are_created_lazily() {
        let mut scene: Scene<u32> = Scene::new(Vec2::new(10.0, 10.0));
        assert_eq!(scene.num_layers(), 2);
        let a = scene.add_body(square_at(Vec2::zero()));
        let b = scene.add_body_in_layer(square_at(Vec2::zero()), 4);
        let c = scene.add_body_in_layer(square_at(Vec2::zero()), 0);
        assert_eq!(scene.num_layers(), 5);
        assert_eq!(scene.layer(1), &[a]);
        assert_eq!(scene.layer(4), &[b]);
        assert_eq!(scene.layer(0), &[c]);
        assert!(scene.layer(3).is_empty());
        assert_eq!(scene.num_bodies(), 3);
        itertools::assert_equal(scene.iter().map(|(k, _)| k), [c, a, b]);
    }

    #[test]
    #[should_panic]
    fn missing_layer_panics() {
        let scene: Scene = Scene::new(Vec2::new(10.0, 10.0));
        scene.layer(2);
    }

    #[test]
    fn invalid_params() {
        let params = SceneParams {
            dimensions: [0.0, 10.0],
            ..Default::default()
        };
        assert!(matches!(
            Scene::<()>::try_with_params(params),
            Err(SceneError::InvalidDimensions(_))
        ));
        let params = SceneParams {
            initial_layers: 1,
            ..Default::default()
        };
        assert!(matches!(
            Scene::<()>::try_with_params(params),
            Err(SceneError::DefaultLayerOutOfRange { .. })
        ));
    }

    #[test]
    fn custom_default_layer() {
        let params = SceneParams {
            initial_layers: 4,
            default_layer: 3,
            ..Default::default()
        };
        let mut scene = Scene::try_with_params(params).unwrap();
        let key = scene.add_body(square_at(Vec2::zero()));
        assert_eq!(scene.layer(3), &[key]);
    }

    #[cfg(feature = "serde-types")]
    #[test]
    fn params_from_ron() {
        let params: SceneParams =
            ron::from_str("(dimensions: (2000.0, 1000.0), initial_layers: 3)").unwrap();
        assert_eq!(params.dimensions, [2000.0, 1000.0]);
        assert_eq!(params.initial_layers, 3);
        assert_eq!(params.default_layer, 1);
        let scene = Scene::<()>::try_with_params(params).unwrap();
        assert_eq!(scene.dimensions(), Vec2::new(2000.0, 1000.0));
        assert_eq!(scene.num_layers(), 3);
    }

    #[test]
    fn paused_scene_does_not_tick() {
        let mut scene = Scene::new(Vec2::new(10.0, 10.0));
        let key = scene.add_body(square_at(Vec2::zero()).with_velocity(Vec2::new(1.0, 0.0)));
        scene.pause();
        scene.tick(1.0);
        assert_eq!(scene.body(key).unwrap().centroid(), Vec2::zero());
        scene.toggle_pause();
        assert!(!scene.is_paused());
        scene.tick(1.0);
        assert_eq!(scene.body(key).unwrap().centroid(), Vec2::new(1.0, 0.0));
        scene.toggle_pause();
        assert!(scene.is_paused());
        scene.resume();
        assert!(!scene.is_paused());
    }

    #[test]
    fn force_creators_run_in_order_before_integration() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::new(Vec2::new(10.0, 10.0));
        let key = scene.add_body(square_at(Vec2::zero()));
        for i in 0..3 {
            let order = order.clone();
            scene.add_force_creator([key], move |bodies: &mut BodySet<u32>| {
                let body = bodies.get_mut(key).unwrap();
                // integration hasn't happened yet, so forces from earlier creators are pending
                order.borrow_mut().push((i, body.pending_force().x));
                body.add_force(Vec2::new(1.0, 0.0));
            });
        }
        scene.tick(1.0);
        assert_eq!(*order.borrow(), vec![(0, 0.0), (1, 1.0), (2, 2.0)]);
        assert_eq!(scene.body(key).unwrap().velocity(), Vec2::new(3.0, 0.0));
    }

    #[test]
    fn removal_prunes_force_creators_and_drops_payload() {
        let aux_drops = Rc::new(RefCell::new(0));
        let payload_drops = Rc::new(RefCell::new(0));
        let mut scene: Scene<DropCounter> = Scene::new(Vec2::new(10.0, 10.0));
        let body = |x: f64| {
            let mut shape = Polygon::rectangle(1.0, 1.0);
            shape.translate(Vec2::new(x, 0.0));
            Body::new(shape, 1.0, Color::WHITE).with_payload(DropCounter(payload_drops.clone()))
        };
        let a = scene.add_body(body(0.0));
        let b = scene.add_body(body(5.0));
        let c = scene.add_body_in_layer(body(-5.0), 2);

        // one creator depending on both bodies that get removed
        let guard = DropCounter(aux_drops.clone());
        scene.add_force_creator([a, b], move |_: &mut BodySet<DropCounter>| {
            let _ = &guard;
        });
        let guard = DropCounter(aux_drops.clone());
        scene.add_force_creator([b], move |_: &mut BodySet<DropCounter>| {
            let _ = &guard;
        });
        let guard = DropCounter(aux_drops.clone());
        scene.add_force_creator([c], move |_: &mut BodySet<DropCounter>| {
            let _ = &guard;
        });

        scene.body_mut(a).unwrap().remove();
        scene.body_mut(b).unwrap().remove();
        scene.tick(0.1);

        assert_eq!(*aux_drops.borrow(), 2);
        assert_eq!(*payload_drops.borrow(), 2);
        assert_eq!(scene.num_force_creators(), 1);
        assert_eq!(scene.num_bodies(), 1);
        assert!(scene.body(a).is_none());
        assert!(scene.body(b).is_none());
        assert!(scene.layer(1).is_empty());
        assert_eq!(scene.layer(2), &[c]);

        drop(scene);
        assert_eq!(*aux_drops.borrow(), 3);
        assert_eq!(*payload_drops.borrow(), 3);
    }

    #[test]
    fn removed_bodies_are_still_integrated_that_tick() {
        let mut scene = Scene::new(Vec2::new(10.0, 10.0));
        let a = scene.add_body(square_at(Vec2::zero()));
        let b = scene.add_body(square_at(Vec2::new(3.0, 0.0)));
        let seen = Rc::new(RefCell::new(0));
        let s = seen.clone();
        scene
            .body_mut(a)
            .unwrap()
            .register_tick_callback(move |_: &mut Body<u32>, _| *s.borrow_mut() += 1);
        scene.body_mut(a).unwrap().remove();
        scene.tick(0.1);
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(scene.layer(1), &[b]);
        assert!(!scene.bodies().contains(a));
        assert_eq!(scene.bodies().len(), 1);
    }

    #[test]
    fn spawn_without_overlap() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut scene: Scene<u32> = Scene::new(Vec2::new(40.0, 20.0));
        let dims = scene.dimensions();
        let mut spawned = 0;
        for _ in 0..200 {
            let pos = Vec2::new(rng.gen_range(0.0..dims.x), rng.gen_range(0.0..dims.y));
            let candidate = square_at(pos).with_payload(spawned);
            if scene.iter().any(|(_, b)| b.is_overlapping(&candidate)) {
                continue;
            }
            scene.add_body(candidate);
            spawned += 1;
        }
        assert!(spawned > 10);
        assert_eq!(scene.num_bodies(), spawned as usize);
        let keys: Vec<BodyKey> = scene.layer(1).to_vec();
        for (i, &k1) in keys.iter().enumerate() {
            assert!(scene.body(k1).unwrap().is_on_screen(Vec2::zero(), dims));
            for &k2 in &keys[i + 1..] {
                assert!(!scene.are_overlapping(k1, k2));
            }
        }
    }

    #[test]
    fn payload_access_and_overlap_query() {
        let mut scene = Scene::new(Vec2::new(10.0, 10.0));
        let a = scene.add_body(square_at(Vec2::zero()).with_payload(7));
        let b = scene.add_body(square_at(Vec2::new(0.5, 0.5)));
        let c = scene.add_body(square_at(Vec2::new(5.0, 0.0)));
        assert_eq!(scene.body(a).unwrap().payload(), Some(&7));
        *scene.body_mut(a).unwrap().payload_mut().unwrap() += 1;
        assert_eq!(scene.body(a).unwrap().payload(), Some(&8));
        assert_eq!(scene.body(b).unwrap().payload(), None);
        assert!(scene.are_overlapping(a, b));
        assert!(!scene.are_overlapping(a, c));
        assert!(scene.bodies_mut().get_pair_mut(a, a).is_none());
        assert!(scene.bodies_mut().get_pair_mut(a, b).is_some());
    }
}
