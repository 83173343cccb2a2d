use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::body::BodyType;
use crate::math::Vec2;

/// Collision shape attached to a body. Extents are in body-local space,
/// centered on the body origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    Box { half_w: f32, half_h: f32 },
}

impl Shape {
    /// World-space AABB of the shape at the given pose.
    pub fn world_aabb(&self, position: Vec2, rotation: f32) -> Aabb {
        match *self {
            Shape::Circle { radius } => {
                let r = Vec2::new(radius, radius);
                Aabb::new(position - r, position + r)
            }
            Shape::Box { half_w, half_h } => {
                // Extents of the rotated box projected back onto the axes.
                let (sin, cos) = rotation.sin_cos();
                let hw = half_w * cos.abs() + half_h * sin.abs();
                let hh = half_w * sin.abs() + half_h * cos.abs();
                let h = Vec2::new(hw, hh);
                Aabb::new(position - h, position + h)
            }
        }
    }

    /// World-space corner vertices of a box, counter-clockwise. Empty for
    /// circles.
    pub fn world_vertices(&self, position: Vec2, rotation: f32) -> Vec<Vec2> {
        match *self {
            Shape::Circle { .. } => Vec::new(),
            Shape::Box { half_w, half_h } => [
                Vec2::new(-half_w, -half_h),
                Vec2::new(half_w, -half_h),
                Vec2::new(half_w, half_h),
                Vec2::new(-half_w, half_h),
            ]
            .iter()
            .map(|v| position + v.rotate(rotation))
            .collect(),
        }
    }
}

/// Compute inverse mass, inertia, and inverse inertia for a shape.
/// Static bodies and zero mass get zero inverses.
pub fn mass_properties(shape: &Shape, mass: f32, body_type: BodyType) -> (f32, f32, f32) {
    if body_type == BodyType::Static || mass <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let inv_mass = 1.0 / mass;
    let inertia = match *shape {
        Shape::Circle { radius } => 0.5 * mass * radius * radius,
        // Rectangle: I = m (w^2 + h^2) / 12 with full extents.
        Shape::Box { half_w, half_h } => mass * (half_w * half_w + half_h * half_h) / 3.0,
    };
    let inv_inertia = if inertia > 0.0 { 1.0 / inertia } else { 0.0 };
    (inv_mass, inertia, inv_inertia)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn static_shape_has_zero_inverses() {
        let (inv_m, _, inv_i) =
            mass_properties(&Shape::Circle { radius: 2.0 }, 10.0, BodyType::Static);
        assert_eq!(inv_m, 0.0);
        assert_eq!(inv_i, 0.0);
    }

    #[test]
    fn circle_inertia() {
        let (inv_m, inertia, inv_i) =
            mass_properties(&Shape::Circle { radius: 2.0 }, 4.0, BodyType::Dynamic);
        assert_relative_eq!(inv_m, 0.25);
        assert_relative_eq!(inertia, 8.0);
        assert_relative_eq!(inv_i, 0.125);
    }

    #[test]
    fn box_inertia_matches_rectangle_formula() {
        // m (w^2 + h^2) / 12 with w = 2, h = 4 and m = 6 gives 10.
        let (_, inertia, _) = mass_properties(
            &Shape::Box { half_w: 1.0, half_h: 2.0 },
            6.0,
            BodyType::Dynamic,
        );
        assert_relative_eq!(inertia, 10.0);
    }

    #[test]
    fn rotated_box_aabb_grows() {
        let shape = Shape::Box { half_w: 2.0, half_h: 1.0 };
        let straight = shape.world_aabb(Vec2::ZERO, 0.0);
        let tilted = shape.world_aabb(Vec2::ZERO, std::f32::consts::FRAC_PI_4);
        assert_relative_eq!(straight.max.x, 2.0);
        assert!(tilted.max.y > straight.max.y);
    }
}
