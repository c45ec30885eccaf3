//! Convex polygons and SAT intersection.
//!
//! A polygon keeps its vertices in local space around the origin; global
//! vertices are the local ones rotated by `rotation` (which already includes
//! the shape's rotation offset) and translated by `center`.

use std::f64::consts::PI;

use crate::core::position::WorldPos;

/// Shape families used by buildings, units, bullets and rocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// 16-gon standing in for a circle.
    Circle,
    Hexagon,
    Pentagon,
    Rectangle,
    Triangle,
}

#[derive(Clone, Debug)]
pub struct Polygon {
    vertices: Vec<WorldPos>,
    pub center: WorldPos,
    /// Current rotation in radians, rotation offset included.
    pub rotation: f64,
    rotation_offset: f64,
}

impl Polygon {
    /// Build the local vertex ring for `shape` with the given size.
    pub fn generate(shape: Shape, size: i32, rotation_offset: f64) -> Polygon {
        let size = f64::from(size);
        let vertices = match shape {
            Shape::Circle => regular_ring(16, size + 2.0),
            Shape::Hexagon => regular_ring(6, size),
            Shape::Pentagon => regular_ring(5, size),
            Shape::Triangle => regular_ring(3, size),
            Shape::Rectangle => {
                let half = (size / 2.0) as f32;
                vec![
                    WorldPos::new(-half, -half),
                    WorldPos::new(half, -half),
                    WorldPos::new(half, half),
                    WorldPos::new(-half, half),
                ]
            }
        };
        Polygon {
            vertices,
            center: WorldPos::default(),
            rotation: 0.0,
            rotation_offset,
        }
    }

    pub fn set_center(&mut self, center: WorldPos) {
        self.center = center;
    }

    /// Point the polygon at `angle`; the per-shape offset is folded in here.
    pub fn set_rotation(&mut self, angle: f64) {
        self.rotation = angle + self.rotation_offset;
    }

    /// Local vertices rotated and translated into world space.
    pub fn global_vertices(&self) -> Vec<WorldPos> {
        let (sin, cos) = self.rotation.sin_cos();
        self.vertices
            .iter()
            .map(|v| {
                let x = f64::from(v.x);
                let y = f64::from(v.y);
                WorldPos::new(
                    (x * cos - y * sin) as f32 + self.center.x,
                    (x * sin + y * cos) as f32 + self.center.y,
                )
            })
            .collect()
    }
}

fn regular_ring(sides: usize, radius: f64) -> Vec<WorldPos> {
    let step = 2.0 * PI / sides as f64;
    (0..sides)
        .map(|i| {
            let angle = step * i as f64;
            WorldPos::new(
                (radius * angle.cos()) as f32,
                (radius * angle.sin()) as f32,
            )
        })
        .collect()
}

/// Separating Axis Theorem over both polygons' edge normals. Degenerate
/// (zero-length) axes are skipped; both directions must agree.
pub fn polygons_intersect(a: &Polygon, b: &Polygon) -> bool {
    let va = a.global_vertices();
    let vb = b.global_vertices();
    axes_separate(&va, &vb) && axes_separate(&vb, &va)
}

fn axes_separate(edges_of: &[WorldPos], other: &[WorldPos]) -> bool {
    let n = edges_of.len();
    for i in 0..n {
        let p1 = edges_of[i];
        let p2 = edges_of[(i + 1) % n];
        // Outward normal of the edge.
        let mut axis = WorldPos::new(p2.y - p1.y, p1.x - p2.x);
        let len = f64::from(axis.x * axis.x + axis.y * axis.y).sqrt();
        if len == 0.0 {
            continue;
        }
        axis.x /= len as f32;
        axis.y /= len as f32;

        let (min_a, max_a) = project(edges_of, axis);
        let (min_b, max_b) = project(other, axis);
        if max_a < min_b || max_b < min_a {
            return false;
        }
    }
    true
}

fn project(vertices: &[WorldPos], axis: WorldPos) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in vertices {
        let p = f64::from(v.x * axis.x + v.y * axis.y);
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle_at(x: f32, y: f32, size: i32) -> Polygon {
        let mut p = Polygon::generate(Shape::Circle, size, 0.0);
        p.set_center(WorldPos::new(x, y));
        p
    }

    #[test]
    fn vertex_counts_per_shape() {
        assert_eq!(Polygon::generate(Shape::Circle, 10, 0.0).global_vertices().len(), 16);
        assert_eq!(Polygon::generate(Shape::Hexagon, 10, 0.0).global_vertices().len(), 6);
        assert_eq!(Polygon::generate(Shape::Pentagon, 10, 0.0).global_vertices().len(), 5);
        assert_eq!(Polygon::generate(Shape::Rectangle, 10, 0.0).global_vertices().len(), 4);
        assert_eq!(Polygon::generate(Shape::Triangle, 10, 0.0).global_vertices().len(), 3);
    }

    #[test]
    fn rotation_offset_is_folded_in() {
        let mut p = Polygon::generate(Shape::Rectangle, 10, PI);
        p.set_rotation(1.0);
        assert!((p.rotation - (1.0 + PI)).abs() < 1e-9);
    }

    #[test]
    fn overlapping_circles_intersect() {
        let a = circle_at(0.0, 0.0, 10);
        let b = circle_at(5.0, 0.0, 10);
        assert!(polygons_intersect(&a, &b));
    }

    #[test]
    fn distant_circles_do_not_intersect() {
        let a = circle_at(0.0, 0.0, 10);
        let b = circle_at(100.0, 0.0, 10);
        assert!(!polygons_intersect(&a, &b));
    }

    #[test]
    fn intersection_is_symmetric() {
        let a = circle_at(0.0, 0.0, 12);
        let mut b = Polygon::generate(Shape::Rectangle, 20, 0.0);
        b.set_center(WorldPos::new(15.0, 3.0));
        b.set_rotation(0.7);
        assert_eq!(polygons_intersect(&a, &b), polygons_intersect(&b, &a));
    }

    #[test]
    fn rotated_rectangles_near_miss() {
        let mut a = Polygon::generate(Shape::Rectangle, 20, 0.0);
        a.set_center(WorldPos::new(0.0, 0.0));
        let mut b = Polygon::generate(Shape::Rectangle, 20, 0.0);
        b.set_center(WorldPos::new(30.0, 0.0));
        assert!(!polygons_intersect(&a, &b));
        b.set_center(WorldPos::new(18.0, 0.0));
        assert!(polygons_intersect(&a, &b));
    }

    #[test]
    fn global_vertices_translate_with_center() {
        let p = circle_at(100.0, -50.0, 10);
        for v in p.global_vertices() {
            assert!(v.distance_to(WorldPos::new(100.0, -50.0)) <= 12.0 + 1e-3);
        }
    }
}
