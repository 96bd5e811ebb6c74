//! Physics core for a 2D top-down racing game: convex polygon rigid bodies
//! in a layered scene, pushed around by force creators and collision handlers.

pub mod math;
pub use math::{uv, Unit, Vec2};

pub mod color;
pub use color::Color;

pub mod polygon;
pub use polygon::{Polygon, PolygonError};

pub mod physics;
pub use physics::{
    body::{calculate_impulse, Body, Mass, Sprite, TickCallbackId},
    collision::{find_collision, Collision, ContactState},
    forces::{self, CollisionHandler, ForceCreator},
};

pub mod scene;
pub use scene::{BodyKey, BodySet, Scene, SceneError, SceneParams};
