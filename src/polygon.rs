//! Convex polygons stored as world-space vertex lists.
//!
//! Bodies move by mutating their polygon in place rather than
//! keeping a local-space shape plus a transform.
//! This costs `O(vertices)` per translation or rotation,
//! which is fine for the small fixed vertex counts used here.

use crate::math::{self as m, Vec2};
use std::f64::consts::PI;

/// Errors from constructing a [`Polygon`] out of arbitrary vertices.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum PolygonError {
    #[error("A polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("Polygon has zero area")]
    Degenerate,
}

/// An ordered sequence of vertices, wound counterclockwise.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon(Vec<Vec2>);

impl Polygon {
    /// Create a polygon from a list of vertices.
    ///
    /// Clockwise input is reversed so that the polygon is always wound counterclockwise,
    /// which collision detection relies on to get outward edge normals.
    /// Convexity is not checked.
    pub fn new(vertices: impl Into<Vec<Vec2>>) -> Result<Self, PolygonError> {
        let mut vertices = vertices.into();
        if vertices.len() < 3 {
            return Err(PolygonError::TooFewVertices(vertices.len()));
        }
        let signed_area = signed_area(&vertices);
        if signed_area == 0.0 || !signed_area.is_finite() {
            return Err(PolygonError::Degenerate);
        }
        if signed_area < 0.0 {
            vertices.reverse();
        }
        Ok(Polygon(vertices))
    }

    /// An axis-aligned rectangle centered at the origin.
    ///
    /// # Panics
    /// Panics if either dimension is not positive.
    pub fn rectangle(width: f64, height: f64) -> Self {
        assert!(
            width > 0.0 && height > 0.0,
            "Rectangle dimensions must be positive, got {width}x{height}"
        );
        let hw = width / 2.0;
        let hh = height / 2.0;
        Polygon(vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ])
    }

    /// A regular polygon with the given number of points approximating a circle
    /// centered at the origin.
    ///
    /// # Panics
    /// Panics if `radius` is not positive or there are fewer than 3 points.
    pub fn circle(radius: f64, points: usize) -> Self {
        assert!(radius > 0.0, "Circle radius must be positive, got {radius}");
        assert!(points >= 3, "A circle needs at least 3 points");
        let step = 2.0 * PI / points as f64;
        Polygon(
            (0..points)
                .map(|i| m::rotate(Vec2::new(radius, 0.0), step * i as f64))
                .collect(),
        )
    }

    /// An isosceles triangle with its base on the x axis centered at the origin
    /// and its apex at `(0, height)`.
    ///
    /// # Panics
    /// Panics if either dimension is not positive.
    pub fn triangle(width: f64, height: f64) -> Self {
        assert!(
            width > 0.0 && height > 0.0,
            "Triangle dimensions must be positive, got {width}x{height}"
        );
        Polygon(vec![
            Vec2::new(-width / 2.0, 0.0),
            Vec2::new(width / 2.0, 0.0),
            Vec2::new(0.0, height),
        ])
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the edges of the polygon as `(start, end)` vertex pairs,
    /// including the closing edge from the last vertex back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.0.len();
        (0..n).map(move |i| (self.0[i], self.0[(i + 1) % n]))
    }

    /// Area enclosed by the polygon, always non-negative.
    pub fn area(&self) -> f64 {
        signed_area(&self.0).abs()
    }

    /// Area computed with the shoelace formula,
    /// positive for counterclockwise and negative for clockwise winding.
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.0)
    }

    /// Center of mass of the polygon assuming uniform density.
    ///
    /// Divides by the signed area, so the result is correct for either winding.
    pub fn centroid(&self) -> Vec2 {
        let mut c = Vec2::zero();
        for (v1, v2) in self.edges() {
            c += (v1 + v2) * m::cross(v1, v2);
        }
        c / (6.0 * self.signed_area())
    }

    pub fn translate(&mut self, translation: Vec2) {
        for v in &mut self.0 {
            *v += translation;
        }
    }

    /// Rotate every vertex about `pivot` by `angle` radians, counterclockwise.
    pub fn rotate(&mut self, angle: f64, pivot: Vec2) {
        for v in &mut self.0 {
            *v = pivot + m::rotate(*v - pivot, angle);
        }
    }

    /// Distance from `center` to the furthest vertex.
    pub fn bounding_radius(&self, center: Vec2) -> f64 {
        self.0
            .iter()
            .map(|v| m::distance(*v, center))
            .fold(0.0, f64::max)
    }

    /// Minimum and maximum of the vertices projected onto `axis`.
    pub fn project(&self, axis: Vec2) -> (f64, f64) {
        self.0
            .iter()
            .map(|v| v.dot(axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
                (lo.min(d), hi.max(d))
            })
    }
}

fn signed_area(vertices: &[Vec2]) -> f64 {
    let n = vertices.len();
    let twice: f64 = (0..n)
        .map(|i| m::cross(vertices[i], vertices[(i + 1) % n]))
        .sum();
    0.5 * twice
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).mag() < 1e-9
    }

    #[test]
    fn rectangle_area_and_centroid() {
        let mut rect = Polygon::rectangle(4.0, 2.0);
        assert_eq!(rect.area(), 8.0);
        assert!(rect.signed_area() > 0.0);
        assert!(close(rect.centroid(), Vec2::zero()));

        rect.translate(Vec2::new(10.0, -3.0));
        assert_eq!(rect.area(), 8.0);
        assert!(close(rect.centroid(), Vec2::new(10.0, -3.0)));
    }

    #[test]
    fn clockwise_input_is_rewound() {
        let cw = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(2.0, 0.0),
        ];
        assert!(signed_area(&cw) < 0.0);
        let poly = Polygon::new(cw).unwrap();
        assert!(poly.signed_area() > 0.0);
        assert_eq!(poly.area(), 4.0);
        assert!(close(poly.centroid(), Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn centroid_is_independent_of_winding() {
        let ccw = vec![
            Vec2::new(5.0, 5.0),
            Vec2::new(8.0, 5.0),
            Vec2::new(5.0, 8.0),
        ];
        let mut cw = ccw.clone();
        cw.reverse();
        // bypass normalization on purpose
        let a = Polygon(ccw);
        let b = Polygon(cw);
        assert!(close(a.centroid(), Vec2::new(6.0, 6.0)));
        assert!(close(a.centroid(), b.centroid()));
    }

    #[test]
    fn invalid_polygons() {
        assert_eq!(
            Polygon::new(vec![Vec2::zero(), Vec2::unit_x()]),
            Err(PolygonError::TooFewVertices(2))
        );
        assert_eq!(
            Polygon::new(vec![Vec2::zero(), Vec2::unit_x(), Vec2::new(2.0, 0.0)]),
            Err(PolygonError::Degenerate)
        );
    }

    #[test]
    #[should_panic]
    fn zero_width_rectangle_panics() {
        Polygon::rectangle(0.0, 1.0);
    }

    #[test]
    #[should_panic]
    fn negative_radius_circle_panics() {
        Polygon::circle(-1.0, 8);
    }

    #[test]
    #[should_panic]
    fn flat_triangle_panics() {
        Polygon::triangle(2.0, 0.0);
    }

    #[test]
    fn rotate_about_pivot() {
        let mut rect = Polygon::rectangle(2.0, 2.0);
        let pivot = Vec2::new(1.0, 1.0);
        rect.rotate(PI, pivot);
        assert!(close(rect.centroid(), Vec2::new(2.0, 2.0)));
        assert!((rect.area() - 4.0).abs() < 1e-9);
        assert!(rect.signed_area() > 0.0);
    }

    #[test]
    fn circle_approximation() {
        let circle = Polygon::circle(10.0, 30);
        assert_eq!(circle.len(), 30);
        assert!(close(circle.centroid(), Vec2::zero()));
        // regular n-gon area: n/2 r^2 sin(2pi/n)
        let expected = 15.0 * 100.0 * (2.0 * PI / 30.0).sin();
        assert!((circle.area() - expected).abs() < 1e-9);
        assert!((circle.bounding_radius(Vec2::zero()) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn triangle_and_projection() {
        let tri = Polygon::triangle(2.0, 3.0);
        assert!(tri.signed_area() > 0.0);
        assert!(close(tri.centroid(), Vec2::new(0.0, 1.0)));
        assert_eq!(tri.project(Vec2::unit_y()), (0.0, 3.0));
        assert_eq!(tri.project(Vec2::unit_x()), (-1.0, 1.0));
        assert_eq!(tri.edges().count(), 3);
    }
}
