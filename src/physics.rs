//! Rigid bodies, collision detection and the forces acting between bodies.

pub mod body;
pub use body::{calculate_impulse, Body, Mass, Sprite, TickCallbackId};

pub mod collision;
pub use collision::{find_collision, Collision, ContactState};

pub mod forces;
pub use forces::{CollisionHandler, ForceCreator};
