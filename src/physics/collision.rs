//! Narrow-phase collision detection between convex polygons
//! using the separating axis theorem.

use crate::{
    math::{self as m, Unit, Vec2},
    polygon::Polygon,
};

/// An intersection between two shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collision {
    /// Axis of minimum penetration, pointing from the first shape towards the second.
    pub axis: Unit<Vec2>,
    /// Penetration depth along the axis.
    pub depth: f64,
}

/// Contact state of a pair of bodies, tracked across ticks so that
/// a collision response runs once per contact rather than once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ContactState {
    #[default]
    Separated,
    /// Overlapping, and the response for this contact has already run.
    ContactHandled,
}

impl ContactState {
    /// Advance the state machine given whether the pair currently overlaps.
    /// Returns true if this is the start of a new contact.
    #[inline]
    pub fn update(&mut self, overlapping: bool) -> bool {
        match (*self, overlapping) {
            (ContactState::Separated, true) => {
                *self = ContactState::ContactHandled;
                true
            }
            (_, false) => {
                *self = ContactState::Separated;
                false
            }
            (ContactState::ContactHandled, true) => false,
        }
    }
}

/// Checks two convex polygons for intersection.
///
/// The edge normals of both shapes are tested as candidate separating axes.
/// Returns None if any of them separates the shapes,
/// otherwise the axis with the smallest overlap.
/// Shapes that merely touch are considered overlapping with zero depth.
pub fn find_collision(shape1: &Polygon, shape2: &Polygon) -> Option<Collision> {
    let centroid_dist = shape2.centroid() - shape1.centroid();
    let mut best: Option<Collision> = None;
    for edge_owner in [shape1, shape2] {
        for (start, end) in edge_owner.edges() {
            // outward normal of a counterclockwise edge
            let normal = Unit::new_normalize(m::right_normal(end - start));
            let (min1, max1) = shape1.project(*normal);
            let (min2, max2) = shape2.project(*normal);
            if min2 > max1 || min1 > max2 {
                return None;
            }
            let depth = (max2 - min1).min(max1 - min2);
            if best.map_or(true, |b| depth < b.depth) {
                // orient towards shape2
                let axis = if normal.dot(centroid_dist) < 0.0 {
                    -normal
                } else {
                    normal
                };
                best = Some(Collision { axis, depth });
            }
        }
    }
    best
}
